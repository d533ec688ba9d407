//! Value conversion between host and guest representations
//!
//! Design: Structural conversion for primitives and sequences, opaque
//! wrapping for everything else. Both directions are total: a value with no
//! structural image crosses as a box for the other side (`HostObj` going
//! in, `Foreign` coming out), and a wrapper meeting its own side again is
//! unwrapped rather than wrapped twice.
//!
//! Conversion allocates on the guest heap and may therefore trigger a guest
//! collection; intermediates are pinned before any further allocation.

use crate::guest::{GuestRef, GuestRuntime, GuestValue, Rooted};
use crate::host::{ForeignCell, HostRef, HostValue};
use crate::logging::trace;

/// Converts a host value into a pinned guest value.
pub fn host_to_guest(guest: &mut GuestRuntime, value: &HostRef) -> Rooted {
    trace!(
        event = "convert",
        direction = "host_to_guest",
        kind = value.kind_name(),
    );
    match value.value() {
        HostValue::Nothing => guest.root(guest.nothing()),
        HostValue::Bool(b) => guest.alloc(GuestValue::Bool(*b)),
        HostValue::Int(n) => guest.alloc(GuestValue::Int(*n)),
        HostValue::Float(x) => guest.alloc(GuestValue::Float(*x)),
        HostValue::Str(s) => guest.alloc(GuestValue::Str(s.clone())),
        HostValue::List(items) => {
            // Children stay pinned until the list itself is allocated and
            // holds them.
            let children: Vec<Rooted> = items
                .iter()
                .map(|item| host_to_guest(guest, item))
                .collect();
            let refs: Vec<GuestRef> = children.iter().map(Rooted::get).collect();
            guest.alloc(GuestValue::List(refs))
        }
        // A host box around a guest value unwraps to that value.
        HostValue::Foreign(cell) => cell.rooted().clone(),
        // Functions and finite field elements have no structural image on
        // the guest side; they cross as opaque host boxes.
        HostValue::FiniteField(_) | HostValue::Function(_) => {
            guest.alloc(GuestValue::HostObj(value.clone()))
        }
    }
}

/// Converts a guest value into a host value.
pub fn guest_to_host(guest: &GuestRuntime, value: GuestRef) -> HostRef {
    trace!(
        event = "convert",
        direction = "guest_to_host",
        kind = guest.kind_name(value),
    );
    match guest.get(value) {
        GuestValue::Nothing => HostRef::nothing(),
        GuestValue::Bool(b) => HostRef::from_bool(*b),
        GuestValue::Int(n) => HostRef::from_int(*n),
        GuestValue::Float(x) => HostRef::from_float(*x),
        GuestValue::Str(s) => HostRef::from_str(s.clone()),
        GuestValue::List(items) | GuestValue::Tuple(items) => {
            let converted = items.iter().map(|r| guest_to_host(guest, *r)).collect();
            HostRef::from_list(converted)
        }
        // A guest box around a host value unwraps to that value.
        GuestValue::HostObj(h) => h.clone(),
        GuestValue::Function(_) => HostRef::from_foreign(ForeignCell::new(guest.root(value))),
    }
}
