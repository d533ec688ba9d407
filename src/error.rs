//! Error taxonomy for the call bridge
//!
//! Every failure that can cross the runtime boundary surfaces as a
//! [`BridgeError`] at the call site. Nothing is retried or swallowed; a
//! `GuestFault` always leaves the guest's pending-fault slot clear.

use thiserror::Error;

/// Errors produced by bridge operations in either call direction.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// A native function was wrapped with an unsupported argument count.
    /// Raised at construction time, never at call time.
    #[error("only 0 to 6 arguments are supported, got {arity}")]
    Arity { arity: usize },

    /// A fixed-arity native wrapper was invoked with the wrong number of
    /// arguments.
    #[error("expected {expected} arguments, got {got}")]
    ArityMismatch { expected: usize, got: usize },

    /// Raw boxing has no conversion for this host value kind.
    #[error("no raw conversion implemented for {kind} values")]
    Unconvertible { kind: &'static str },

    /// The guest runtime recorded an unhandled fault during a call. The
    /// backtrace lists guest frames innermost first, when available.
    #[error("guest call failed: {message}")]
    GuestFault {
        message: String,
        backtrace: Vec<String>,
    },

    /// A cross-boundary argument container had the wrong shape.
    #[error("argument container must be a {expected}, got {got}")]
    ArgumentShape {
        expected: &'static str,
        got: &'static str,
    },

    /// A value that is not a function object was invoked.
    #[error("value of kind {kind} is not callable")]
    NotCallable { kind: &'static str },

    /// Failure raised by a host-native function body.
    #[error("{message}")]
    Host { message: String },
}

impl BridgeError {
    /// Shorthand for host-native function bodies reporting a failure.
    pub fn host(message: impl Into<String>) -> Self {
        BridgeError::Host {
            message: message.into(),
        }
    }
}
