//! Trestle - bidirectional call bridge between a refcounted host object
//! system and a garbage-collected guest runtime
//!
//! Host code wraps guest functions (any arity) and host-native function
//! pointers (arity 0 to 6) as callable handles, then invokes them through
//! one dispatch entry. Guest code calls back into the host with a tuple of
//! arguments. Values crossing the boundary are converted or boxed according
//! to the handle's conversion mode; guest exceptions surface as host errors
//! with the guest backtrace attached; pins keep guest values alive across
//! collections for exactly as long as a host handle exists.

pub mod bridge;
pub mod convert;
pub mod error;
pub mod guest;
pub mod host;
pub mod logging;

// Re-export commonly used items
pub use bridge::{Bridge, CallableHandle, ConversionMode, NativeFn, Payload, MAX_NATIVE_ARITY};
pub use error::BridgeError;
pub use guest::{
    GuestConfig, GuestError, GuestFault, GuestRef, GuestRuntime, GuestStats, GuestValue, Rooted,
};
pub use host::{Ffe, ForeignCell, HostRef, HostValue};

/// Initializes logging from the environment. Safe to call more than once;
/// only the first call installs a subscriber.
pub fn init() {
    logging::init();
}
