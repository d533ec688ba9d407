//! Guest fault translation - where guest exceptions become host errors
//!
//! Every invocation that crossed into the guest passes through here before
//! its result is touched. A pending fault is taken (clearing guest state, so
//! the next call starts clean) and surfaced as a host error carrying the
//! guest's message and frames. Skipping this checkpoint after a guest call
//! is a correctness bug: a fault left pending would be misattributed to a
//! later, innocent call.

use crate::error::BridgeError;
use crate::guest::{GuestRuntime, Rooted};
use crate::logging::debug;

/// Checks the pending-fault slot, translating and clearing any fault.
pub(crate) fn check_guest(guest: &mut GuestRuntime) -> Result<(), BridgeError> {
    if let Some(fault) = guest.take_fault() {
        debug!(
            event = "fault_translated",
            message = %fault.message,
            frames = fault.backtrace.len(),
        );
        return Err(BridgeError::GuestFault {
            message: fault.message,
            backtrace: fault.backtrace,
        });
    }
    Ok(())
}

/// Completes a guest invocation: the fault check runs first, then the
/// outcome is unwrapped. A missing result without a pending fault would
/// mean the guest broke its own calling convention; it is reported rather
/// than papered over.
pub(crate) fn finish_call(
    guest: &mut GuestRuntime,
    outcome: Option<Rooted>,
) -> Result<Rooted, BridgeError> {
    check_guest(guest)?;
    match outcome {
        Some(value) => Ok(value),
        None => Err(BridgeError::GuestFault {
            message: "guest call produced no result".to_string(),
            backtrace: Vec::new(),
        }),
    }
}
