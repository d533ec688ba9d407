//! Guest value universe - everything the guest heap can hold
//!
//! Aggregate values (`List`, `Tuple`) reference their children by slot, so
//! the collector can trace them without walking native structures. A
//! `HostObj` holds a host reference directly; the host side's refcount keeps
//! that value alive for as long as the slot does.

use std::fmt;
use std::rc::Rc;

use crate::bridge::Bridge;
use crate::host::HostRef;

use super::roots::Rooted;
use super::GuestError;

/// Handle to a guest heap slot. Plain index, cheap to copy; only valid while
/// the slot is live (pinned or reachable from a pin).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct GuestRef(pub(crate) u32);

impl GuestRef {
    #[inline]
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// Body signature for guest functions. Bodies receive the bridge so they can
/// re-enter the host, and pinned arguments that outlive any collection the
/// body triggers. Returning `Err` raises a guest fault.
pub type GuestFnBody = dyn Fn(&mut Bridge, &[Rooted]) -> Result<Rooted, GuestError>;

/// A named guest function object.
#[derive(Clone)]
pub struct GuestFn {
    pub(crate) name: Rc<str>,
    pub(crate) body: Rc<GuestFnBody>,
}

impl GuestFn {
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for GuestFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GuestFn").field("name", &self.name).finish()
    }
}

/// A value on the guest heap.
#[derive(Clone, Debug)]
pub enum GuestValue {
    /// The guest's "no value" sentinel.
    Nothing,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    /// Growable ordered collection.
    List(Vec<GuestRef>),
    /// Fixed-size ordered collection; the argument container for calls into
    /// the host.
    Tuple(Vec<GuestRef>),
    Function(GuestFn),
    /// Guest-side box around a host value.
    HostObj(HostRef),
}

impl GuestValue {
    pub fn kind_name(&self) -> &'static str {
        match self {
            GuestValue::Nothing => "nothing",
            GuestValue::Bool(_) => "boolean",
            GuestValue::Int(_) => "integer",
            GuestValue::Float(_) => "float",
            GuestValue::Str(_) => "string",
            GuestValue::List(_) => "list",
            GuestValue::Tuple(_) => "tuple",
            GuestValue::Function(_) => "function",
            GuestValue::HostObj(_) => "host object",
        }
    }
}
