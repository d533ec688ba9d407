//! Host object system - reference-counted immutable values
//!
//! Design: One value enum behind a cheap refcounted handle:
//! - `HostRef` is `Rc`-backed; clone bumps the count, drop releases it
//! - Values are immutable once built, so sharing needs no synchronization
//! - `Foreign` wraps a pinned guest value and releases the pin on drop,
//!   tying the guest collector to host refcounting

use std::fmt;
use std::rc::Rc;

use crate::bridge::CallableHandle;
use crate::guest::{GuestRef, Rooted};

thread_local! {
    static NOTHING: HostRef = HostRef(Rc::new(HostValue::Nothing));
}

/// A finite field element, `value` in the field of the given `order`.
///
/// Carried opaquely by the bridge; raw boxing has no conversion for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ffe {
    pub value: u64,
    pub order: u64,
}

/// Host-side box around a guest value, pinned against the guest collector
/// for the box's lifetime.
pub struct ForeignCell {
    inner: Rooted,
}

impl ForeignCell {
    pub fn new(inner: Rooted) -> Self {
        Self { inner }
    }

    /// The pin backing this box.
    pub fn rooted(&self) -> &Rooted {
        &self.inner
    }

    /// The wrapped guest slot.
    #[inline]
    pub fn target(&self) -> GuestRef {
        self.inner.get()
    }
}

impl fmt::Debug for ForeignCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ForeignCell").field(&self.target()).finish()
    }
}

/// A host value.
#[derive(Debug)]
pub enum HostValue {
    /// The host's "no value" sentinel.
    Nothing,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<HostRef>),
    FiniteField(Ffe),
    Function(CallableHandle),
    Foreign(ForeignCell),
}

impl HostValue {
    pub fn kind_name(&self) -> &'static str {
        match self {
            HostValue::Nothing => "nothing",
            HostValue::Bool(_) => "boolean",
            HostValue::Int(_) => "integer",
            HostValue::Float(_) => "float",
            HostValue::Str(_) => "string",
            HostValue::List(_) => "list",
            HostValue::FiniteField(_) => "finite field element",
            HostValue::Function(_) => "function",
            HostValue::Foreign(_) => "foreign value",
        }
    }
}

// Structural equality for data values; functions never compare equal, and
// foreign boxes compare by the guest slot they wrap.
impl PartialEq for HostValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (HostValue::Nothing, HostValue::Nothing) => true,
            (HostValue::Bool(a), HostValue::Bool(b)) => a == b,
            (HostValue::Int(a), HostValue::Int(b)) => a == b,
            (HostValue::Float(a), HostValue::Float(b)) => a == b,
            (HostValue::Str(a), HostValue::Str(b)) => a == b,
            (HostValue::List(a), HostValue::List(b)) => a == b,
            (HostValue::FiniteField(a), HostValue::FiniteField(b)) => a == b,
            (HostValue::Foreign(a), HostValue::Foreign(b)) => a.target() == b.target(),
            _ => false,
        }
    }
}

/// Reference-counted handle to a host value.
#[derive(Clone)]
pub struct HostRef(Rc<HostValue>);

impl HostRef {
    pub fn new(value: HostValue) -> Self {
        Self(Rc::new(value))
    }

    /// The shared "no value" sentinel.
    pub fn nothing() -> Self {
        NOTHING.with(|n| n.clone())
    }

    pub fn from_bool(value: bool) -> Self {
        Self::new(HostValue::Bool(value))
    }

    pub fn from_int(value: i64) -> Self {
        Self::new(HostValue::Int(value))
    }

    pub fn from_float(value: f64) -> Self {
        Self::new(HostValue::Float(value))
    }

    pub fn from_str(value: impl Into<String>) -> Self {
        Self::new(HostValue::Str(value.into()))
    }

    pub fn from_list(items: Vec<HostRef>) -> Self {
        Self::new(HostValue::List(items))
    }

    pub fn from_ffe(value: u64, order: u64) -> Self {
        Self::new(HostValue::FiniteField(Ffe { value, order }))
    }

    pub fn from_handle(handle: CallableHandle) -> Self {
        Self::new(HostValue::Function(handle))
    }

    pub fn from_foreign(cell: ForeignCell) -> Self {
        Self::new(HostValue::Foreign(cell))
    }

    #[inline]
    pub fn value(&self) -> &HostValue {
        &self.0
    }

    pub fn kind_name(&self) -> &'static str {
        self.0.kind_name()
    }

    /// Current reference count of the underlying value.
    pub fn ref_count(&self) -> usize {
        Rc::strong_count(&self.0)
    }

    /// Identity comparison: do both handles point at the same value?
    pub fn ptr_eq(&self, other: &HostRef) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub fn is_nothing(&self) -> bool {
        matches!(*self.0, HostValue::Nothing)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match *self.0 {
            HostValue::Bool(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match *self.0 {
            HostValue::Int(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match *self.0 {
            HostValue::Float(x) => Some(x),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match &*self.0 {
            HostValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[HostRef]> {
        match &*self.0 {
            HostValue::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_function(&self) -> Option<&CallableHandle> {
        match &*self.0 {
            HostValue::Function(handle) => Some(handle),
            _ => None,
        }
    }

    pub fn as_foreign(&self) -> Option<&ForeignCell> {
        match &*self.0 {
            HostValue::Foreign(cell) => Some(cell),
            _ => None,
        }
    }
}

impl PartialEq for HostRef {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl fmt::Debug for HostRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::guest::{GuestRuntime, GuestValue};

    #[test]
    fn test_constructor_kinds() {
        assert_eq!(HostRef::nothing().kind_name(), "nothing");
        assert_eq!(HostRef::from_bool(true).kind_name(), "boolean");
        assert_eq!(HostRef::from_int(7).kind_name(), "integer");
        assert_eq!(HostRef::from_float(1.5).kind_name(), "float");
        assert_eq!(HostRef::from_str("x").kind_name(), "string");
        assert_eq!(HostRef::from_list(vec![]).kind_name(), "list");
        assert_eq!(HostRef::from_ffe(3, 7).kind_name(), "finite field element");
    }

    #[test]
    fn test_structural_equality() {
        assert_eq!(HostRef::from_int(5), HostRef::from_int(5));
        assert_ne!(HostRef::from_int(5), HostRef::from_int(6));
        assert_ne!(HostRef::from_int(5), HostRef::from_str("5"));

        let a = HostRef::from_list(vec![HostRef::from_int(1), HostRef::from_str("two")]);
        let b = HostRef::from_list(vec![HostRef::from_int(1), HostRef::from_str("two")]);
        assert_eq!(a, b);
    }

    #[test]
    fn test_ref_count_tracks_clones() {
        let value = HostRef::from_int(42);
        assert_eq!(value.ref_count(), 1);

        let shared = value.clone();
        assert_eq!(value.ref_count(), 2);
        assert!(value.ptr_eq(&shared));

        drop(shared);
        assert_eq!(value.ref_count(), 1);
    }

    #[test]
    fn test_nothing_is_shared() {
        let a = HostRef::nothing();
        let b = HostRef::nothing();
        assert!(a.ptr_eq(&b));
        assert!(a.is_nothing());
    }

    #[test]
    fn test_foreign_cell_pins_guest_slot() {
        let mut guest = GuestRuntime::new();
        let rooted = guest.alloc(GuestValue::Int(9));
        let target = rooted.get();

        let cell = ForeignCell::new(rooted);
        assert_eq!(cell.target(), target);
        assert!(guest.is_pinned(target));

        drop(cell);
        assert!(!guest.is_pinned(target));
    }

    #[test]
    fn test_accessors() {
        assert_eq!(HostRef::from_int(3).as_int(), Some(3));
        assert_eq!(HostRef::from_int(3).as_bool(), None);
        assert_eq!(HostRef::from_str("hi").as_str(), Some("hi"));
        assert_eq!(HostRef::from_bool(false).as_bool(), Some(false));
        let list = HostRef::from_list(vec![HostRef::from_int(1)]);
        assert_eq!(list.as_list().map(|items| items.len()), Some(1));
    }
}
