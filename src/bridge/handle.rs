//! Callable wrappers - host function objects that cross the boundary
//!
//! A [`CallableHandle`] is the only way host code obtains something it can
//! invoke through the bridge. The payload is a tagged enum: either a pinned
//! guest function with a conversion mode fixed at creation, or a host-native
//! function pointer with a declared argument list. One payload kind per
//! handle, decided here and immutable afterwards.

use std::rc::Rc;

use crate::error::BridgeError;
use crate::guest::{GuestRuntime, GuestValue, Rooted};
use crate::host::HostRef;
use crate::logging::debug;

use super::Bridge;

/// Highest arity a native wrapper can declare. Guest-backed wrappers are
/// variadic and not bounded by this.
pub const MAX_NATIVE_ARITY: usize = 6;

/// Argument conversion policy, fixed when a guest-backed handle is created.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ConversionMode {
    /// Run every argument through the generic converter.
    AutoConvert,
    /// Box integers directly; refuse finite field elements; pass everything
    /// else through unconverted.
    RawBox,
}

/// Host-native function signature. Bodies receive the bridge and may
/// re-enter the guest; recursion through the bridge is ordinary recursion.
pub type NativeFn = fn(&mut Bridge, &[HostRef]) -> Result<HostRef, BridgeError>;

/// What a handle invokes.
#[derive(Debug, Clone)]
pub enum Payload {
    /// A guest function, pinned for the handle's lifetime.
    Guest { func: Rooted, mode: ConversionMode },
    /// A host-native function with a fixed declared arity.
    Native {
        func: NativeFn,
        arg_names: Vec<String>,
    },
}

/// Host-side function object wrapping either side's callables.
#[derive(Debug, Clone)]
pub struct CallableHandle {
    name: Rc<str>,
    payload: Payload,
}

impl CallableHandle {
    /// Wraps a guest function. The target must be a function value; it is
    /// pinned until the handle (and every clone) is dropped.
    pub fn for_guest(
        guest: &GuestRuntime,
        func: &Rooted,
        mode: ConversionMode,
    ) -> Result<Self, BridgeError> {
        let name = match guest.get(func.get()) {
            GuestValue::Function(f) => Rc::from(f.name()),
            other => {
                return Err(BridgeError::NotCallable {
                    kind: other.kind_name(),
                })
            }
        };
        debug!(event = "wrap_guest", function = &*name, mode = ?mode);
        Ok(Self {
            name,
            payload: Payload::Guest {
                func: func.clone(),
                mode,
            },
        })
    }

    /// Wraps a native function pointer. The declared arity is the number of
    /// argument names and must not exceed [`MAX_NATIVE_ARITY`]; a larger
    /// list fails here, before any handle exists.
    pub fn for_native(func: NativeFn, arg_names: &[&str]) -> Result<Self, BridgeError> {
        if arg_names.len() > MAX_NATIVE_ARITY {
            return Err(BridgeError::Arity {
                arity: arg_names.len(),
            });
        }
        debug!(event = "wrap_native", arity = arg_names.len());
        Ok(Self {
            name: Rc::from(""),
            payload: Payload::Native {
                func,
                arg_names: arg_names.iter().map(|s| s.to_string()).collect(),
            },
        })
    }

    /// The wrapped function's name, when known.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Display name for diagnostics.
    pub fn label(&self) -> &str {
        if self.name.is_empty() {
            "<anonymous>"
        } else {
            &self.name
        }
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    pub fn is_guest(&self) -> bool {
        matches!(self.payload, Payload::Guest { .. })
    }

    pub fn is_native(&self) -> bool {
        matches!(self.payload, Payload::Native { .. })
    }

    /// The conversion mode, for guest-backed handles.
    pub fn mode(&self) -> Option<ConversionMode> {
        match &self.payload {
            Payload::Guest { mode, .. } => Some(*mode),
            Payload::Native { .. } => None,
        }
    }

    /// The declared arity. `None` means variadic (guest-backed handles
    /// accept any argument count).
    pub fn declared_arity(&self) -> Option<usize> {
        match &self.payload {
            Payload::Guest { .. } => None,
            Payload::Native { arg_names, .. } => Some(arg_names.len()),
        }
    }

    /// Declared argument names, for native handles.
    pub fn arg_names(&self) -> Option<&[String]> {
        match &self.payload {
            Payload::Guest { .. } => None,
            Payload::Native { arg_names, .. } => Some(arg_names),
        }
    }
}

impl Bridge {
    /// Wraps a guest function as a host callable with the given conversion
    /// mode. See [`CallableHandle::for_guest`].
    pub fn wrap_guest_function(
        &self,
        func: &Rooted,
        mode: ConversionMode,
    ) -> Result<HostRef, BridgeError> {
        let handle = CallableHandle::for_guest(self.guest(), func, mode)?;
        Ok(HostRef::from_handle(handle))
    }

    /// Wraps a host-native function as a host callable. The declared arity
    /// is `arg_names.len()`. See [`CallableHandle::for_native`].
    pub fn wrap_native_function(
        &self,
        func: NativeFn,
        arg_names: &[&str],
    ) -> Result<HostRef, BridgeError> {
        let handle = CallableHandle::for_native(func, arg_names)?;
        Ok(HostRef::from_handle(handle))
    }
}
