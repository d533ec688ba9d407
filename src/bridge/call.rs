//! Call dispatch and invocation in both directions
//!
//! Host to guest: a single slice-based entry routes by payload, converts
//! arguments under the handle's mode, and invokes through the guest call
//! primitives. Arguments ride in `SmallVec` buffers, so calls up to six
//! arguments never touch the heap for bookkeeping. Guest to host: a guest
//! tuple is unpacked, converted, and dispatched by its length through the
//! same entry.

use smallvec::{smallvec, SmallVec};
use std::cell::Cell;
use std::rc::Rc;

use crate::error::BridgeError;
use crate::guest::{GuestError, GuestRef, GuestValue, Rooted};
use crate::host::{HostRef, HostValue};
use crate::logging::{debug, trace};
use crate::convert;

use super::handle::{ConversionMode, NativeFn, Payload};
use super::{fault, marshal, Bridge};

/// Pinned-argument buffer; inline up to the fixed-arity bound.
pub(crate) type ArgBuf = SmallVec<[Rooted; 6]>;

/// Decrements the reentry depth when a native call region ends, on every
/// exit path.
struct ReentryGuard<'a> {
    depth: &'a Cell<u32>,
}

impl<'a> ReentryGuard<'a> {
    fn enter(depth: &'a Cell<u32>) -> Self {
        depth.set(depth.get() + 1);
        Self { depth }
    }
}

impl Drop for ReentryGuard<'_> {
    fn drop(&mut self) {
        self.depth.set(self.depth.get() - 1);
    }
}

impl Bridge {
    /// Invokes a host callable with positional arguments.
    ///
    /// The single dispatch entry for every arity: guest-backed handles
    /// accept any argument count, native handles require their declared
    /// arity. Results follow the boundary rules (host boxes unwrap, other
    /// guest values come back boxed, guest `nothing` maps to the host
    /// sentinel).
    pub fn call(&mut self, func: &HostRef, args: &[HostRef]) -> Result<HostRef, BridgeError> {
        let handle = match func.value() {
            HostValue::Function(handle) => handle,
            other => {
                return Err(BridgeError::NotCallable {
                    kind: other.kind_name(),
                })
            }
        };
        debug!(
            event = "call_dispatch",
            function = handle.label(),
            argc = args.len(),
        );
        match handle.payload() {
            Payload::Guest { func: target, mode } => {
                self.call_guest_converted(target, *mode, args)
            }
            Payload::Native { func, arg_names } => {
                self.call_native(*func, arg_names.len(), args)
            }
        }
    }

    /// Invokes a host callable with arguments aggregated in a host list,
    /// reading exactly `len` elements in order. The overflow-friendly entry
    /// for callers holding an argument collection.
    pub fn call_list(&mut self, func: &HostRef, args: &HostRef) -> Result<HostRef, BridgeError> {
        let items = match args.value() {
            HostValue::List(items) => items,
            other => {
                return Err(BridgeError::ArgumentShape {
                    expected: "list",
                    got: other.kind_name(),
                })
            }
        };
        self.call(func, items)
    }

    /// Entry point for the guest side calling a host function. `args` must
    /// be a guest tuple; its length selects the dispatch, its elements are
    /// converted by the generic converter. A host result converts back to
    /// the guest, with "no value" becoming the guest `nothing`.
    pub fn call_host(&mut self, func: &HostRef, args: GuestRef) -> Result<Rooted, BridgeError> {
        let elements: SmallVec<[GuestRef; 6]> = match self.guest.get(args) {
            GuestValue::Tuple(items) => items.iter().copied().collect(),
            other => {
                return Err(BridgeError::ArgumentShape {
                    expected: "tuple",
                    got: other.kind_name(),
                })
            }
        };
        let handle = match func.value() {
            HostValue::Function(handle) => handle,
            other => {
                return Err(BridgeError::NotCallable {
                    kind: other.kind_name(),
                })
            }
        };
        debug!(
            event = "host_call",
            function = handle.label(),
            argc = elements.len(),
        );

        let mut host_args: SmallVec<[HostRef; 6]> = SmallVec::with_capacity(elements.len());
        for r in &elements {
            host_args.push(convert::guest_to_host(&self.guest, *r));
        }

        let result = self.call(func, &host_args)?;
        Ok(convert::host_to_guest(&mut self.guest, &result))
    }

    // ------------------------------------------------------------------
    // Guest call primitives
    // ------------------------------------------------------------------
    //
    // The 0 to 3 argument calls are direct; 4+ goes through the generic
    // variadic primitive. This mirrors the guest runtime's own fast paths;
    // every arity produces identical results. All primitives return `None`
    // with a fault pending instead of a value, and each takes its own pins
    // on the arguments for the duration of the call.

    /// Calls a guest function with no arguments.
    pub fn call_guest0(&mut self, func: &Rooted) -> Option<Rooted> {
        self.run_guest_function(func, &[])
    }

    /// Calls a guest function with one argument.
    pub fn call_guest1(&mut self, func: &Rooted, a: &Rooted) -> Option<Rooted> {
        let args: ArgBuf = smallvec![a.clone()];
        self.run_guest_function(func, &args)
    }

    /// Calls a guest function with two arguments.
    pub fn call_guest2(&mut self, func: &Rooted, a: &Rooted, b: &Rooted) -> Option<Rooted> {
        let args: ArgBuf = smallvec![a.clone(), b.clone()];
        self.run_guest_function(func, &args)
    }

    /// Calls a guest function with three arguments.
    pub fn call_guest3(
        &mut self,
        func: &Rooted,
        a: &Rooted,
        b: &Rooted,
        c: &Rooted,
    ) -> Option<Rooted> {
        let args: ArgBuf = smallvec![a.clone(), b.clone(), c.clone()];
        self.run_guest_function(func, &args)
    }

    /// Calls a guest function with any number of arguments.
    pub fn call_guest_many(&mut self, func: &Rooted, args: &[Rooted]) -> Option<Rooted> {
        self.run_guest_function(func, args)
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    /// Guest-payload path: convert every argument under the handle's mode,
    /// dispatch by count, check for faults, convert the result.
    fn call_guest_converted(
        &mut self,
        func: &Rooted,
        mode: ConversionMode,
        args: &[HostRef],
    ) -> Result<HostRef, BridgeError> {
        let mut converted: ArgBuf = SmallVec::with_capacity(args.len());
        for arg in args {
            converted.push(marshal::convert_in(&mut self.guest, arg, mode)?);
        }

        let outcome = match converted.as_slice() {
            [] => self.call_guest0(func),
            [a] => self.call_guest1(func, a),
            [a, b] => self.call_guest2(func, a, b),
            [a, b, c] => self.call_guest3(func, a, b, c),
            _ => self.call_guest_many(func, &converted),
        };

        // Fault check before the result is touched.
        let result = fault::finish_call(&mut self.guest, outcome)?;
        Ok(marshal::convert_out(&self.guest, result))
    }

    /// Native-payload path: arity check, then the body runs inside a scoped
    /// reentry region. The body may call back into the bridge; recursion is
    /// ordinary recursion.
    fn call_native(
        &mut self,
        func: NativeFn,
        expected: usize,
        args: &[HostRef],
    ) -> Result<HostRef, BridgeError> {
        if args.len() != expected {
            return Err(BridgeError::ArityMismatch {
                expected,
                got: args.len(),
            });
        }
        debug_assert!(
            !self.guest.has_fault(),
            "pending guest fault at native entry"
        );

        let depth = Rc::clone(&self.reentry);
        let region = ReentryGuard::enter(&depth);
        trace!(event = "native_call", depth = depth.get(), argc = args.len());
        let result = func(self, args);
        drop(region);

        debug_assert!(
            !self.guest.has_fault(),
            "guest fault leaked across a native call"
        );
        result
    }

    /// Runs a guest function body with pinned arguments, maintaining the
    /// guest frame stack. An `Err` from the body becomes the pending fault;
    /// invoking a non-function raises one.
    fn run_guest_function(&mut self, func: &Rooted, args: &[Rooted]) -> Option<Rooted> {
        let target = func.get();
        let f = match self.guest.function_at(target) {
            Some(f) => f,
            None => {
                let kind = self.guest.kind_name(target);
                self.guest.raise(GuestError::new(format!(
                    "value of kind {kind} is not callable"
                )));
                return None;
            }
        };
        trace!(event = "guest_call", function = f.name(), argc = args.len());

        self.guest.push_frame(Rc::clone(&f.name));
        let outcome = (f.body)(self, args);
        let result = match outcome {
            Ok(value) => Some(value),
            Err(raised) => {
                self.guest.raise(raised);
                None
            }
        };
        self.guest.pop_frame();
        result
    }
}
