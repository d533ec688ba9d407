//! Argument marshaling - per-mode conversion at the call boundary
//!
//! Inbound (host to guest), the mode chosen at wrap time decides the policy:
//! `AutoConvert` hands every argument to the generic converter; `RawBox`
//! does the minimum boxing that keeps a value usable on the guest side and
//! refuses kinds it cannot represent. Outbound, results are never converted
//! structurally: a guest box around a host value unwraps, anything else is
//! boxed for the host, and the guest's `nothing` maps to the host sentinel.

use crate::convert;
use crate::error::BridgeError;
use crate::guest::{GuestRuntime, GuestValue, Rooted};
use crate::host::{ForeignCell, HostRef, HostValue};

use super::handle::ConversionMode;

/// Converts one inbound argument, returning it pinned for the call.
pub(crate) fn convert_in(
    guest: &mut GuestRuntime,
    value: &HostRef,
    mode: ConversionMode,
) -> Result<Rooted, BridgeError> {
    match mode {
        ConversionMode::AutoConvert => Ok(convert::host_to_guest(guest, value)),
        ConversionMode::RawBox => raw_box(guest, value),
    }
}

/// Raw boxing: integers are boxed as guest integers, finite field elements
/// are refused by name, host boxes unwrap, and every other kind crosses as
/// an opaque host box with no structural conversion.
fn raw_box(guest: &mut GuestRuntime, value: &HostRef) -> Result<Rooted, BridgeError> {
    match value.value() {
        HostValue::Int(n) => Ok(guest.alloc(GuestValue::Int(*n))),
        HostValue::FiniteField(_) => Err(BridgeError::Unconvertible {
            kind: value.kind_name(),
        }),
        HostValue::Foreign(cell) => Ok(cell.rooted().clone()),
        _ => Ok(guest.alloc(GuestValue::HostObj(value.clone()))),
    }
}

/// Converts a call result for the host: unwrap host boxes, map `nothing` to
/// the host sentinel, box everything else with the result pin moved into
/// the wrapper.
pub(crate) fn convert_out(guest: &GuestRuntime, result: Rooted) -> HostRef {
    match guest.get(result.get()) {
        GuestValue::Nothing => HostRef::nothing(),
        GuestValue::HostObj(inner) => inner.clone(),
        _ => HostRef::from_foreign(ForeignCell::new(result)),
    }
}
