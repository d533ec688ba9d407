//! Bridge - bidirectional calls between host objects and the guest runtime
//!
//! Design: one dispatch entry per direction, payload-tagged callables
//!
//! Architecture:
//! - `handle.rs` - callable wrapper factory (CallableHandle, Payload)
//! - `marshal.rs` - argument and result conversion at the call boundary
//! - `call.rs` - dispatch entries and the guest call primitives
//! - `fault.rs` - guest fault translation into host errors

mod call;
mod fault;
mod handle;
mod marshal;

pub use handle::{CallableHandle, ConversionMode, NativeFn, Payload, MAX_NATIVE_ARITY};

use std::cell::Cell;
use std::rc::Rc;

use crate::guest::{GuestConfig, GuestRuntime};
use crate::logging::debug;

/// Owns the guest runtime and tracks how deep native call regions nest.
///
/// All cross-boundary calls go through a `Bridge`; the guest heap, its root
/// table, and the fault slot live behind it.
pub struct Bridge {
    guest: GuestRuntime,
    reentry: Rc<Cell<u32>>,
}

impl Bridge {
    pub fn new() -> Self {
        Self::with_config(GuestConfig::default())
    }

    pub fn with_config(config: GuestConfig) -> Self {
        debug!(event = "bridge_start", gc_threshold = config.gc_threshold);
        Self {
            guest: GuestRuntime::with_config(config),
            reentry: Rc::new(Cell::new(0)),
        }
    }

    /// Shared view of the guest runtime.
    pub fn guest(&self) -> &GuestRuntime {
        &self.guest
    }

    /// Exclusive view of the guest runtime.
    pub fn guest_mut(&mut self) -> &mut GuestRuntime {
        &mut self.guest
    }

    /// Number of native call regions currently on the stack.
    pub fn reentry_depth(&self) -> u32 {
        self.reentry.get()
    }
}

impl Default for Bridge {
    fn default() -> Self {
        Self::new()
    }
}
