//! Guest runtime - garbage-collected value heap with explicit rooting
//!
//! Design: Slot heap with a free list and mark-and-sweep collection:
//! 1. Allocation returns a pinned handle (no window where a fresh value can
//!    be swept)
//! 2. Mark roots are the pin table; `List`/`Tuple` children are traced
//! 3. Collection triggers on an allocation-count threshold, or on demand
//!
//! The runtime also models the guest's calling side effects: a pending-fault
//! slot for unhandled errors and a frame stack feeding fault backtraces.

mod roots;
pub mod value;

#[cfg(test)]
mod tests;

pub use roots::Rooted;
pub use value::{GuestFn, GuestFnBody, GuestRef, GuestValue};

use std::rc::Rc;
use std::time::Instant;

use crate::bridge::Bridge;
use crate::logging::{debug, trace, warn};

use roots::RootTable;

/// Tuning knobs for a guest runtime instance.
#[derive(Debug, Clone, Copy)]
pub struct GuestConfig {
    /// Allocations between automatic collections.
    pub gc_threshold: usize,
    /// Initial heap capacity in slots.
    pub initial_capacity: usize,
}

impl Default for GuestConfig {
    fn default() -> Self {
        Self {
            gc_threshold: 512,
            initial_capacity: 64,
        }
    }
}

/// An unhandled guest error, parked until the next boundary check.
#[derive(Debug, Clone)]
pub struct GuestFault {
    pub message: String,
    /// Guest frames at the point of the raise, innermost first.
    pub backtrace: Vec<String>,
}

/// Error value raised by guest function bodies.
#[derive(Debug, Clone)]
pub struct GuestError {
    pub message: String,
}

impl GuestError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Heap counters for monitoring.
#[derive(Debug, Clone, Copy, Default)]
pub struct GuestStats {
    pub heap_slots: usize,
    pub live: usize,
    pub pinned: usize,
    pub collections_run: usize,
    pub collected_total: usize,
}

struct Slot {
    value: Option<GuestValue>,
    marked: bool,
}

/// The guest side of the bridge: a collected heap plus the runtime state
/// calls interact with (faults, frames).
pub struct GuestRuntime {
    slots: Vec<Slot>,
    free: Vec<u32>,
    roots: Rc<RootTable>,
    fault: Option<GuestFault>,
    frames: Vec<Rc<str>>,
    allocs_since_gc: usize,
    config: GuestConfig,
    collections_run: usize,
    collected_total: usize,
}

impl GuestRuntime {
    pub fn new() -> Self {
        Self::with_config(GuestConfig::default())
    }

    pub fn with_config(config: GuestConfig) -> Self {
        let mut slots = Vec::with_capacity(config.initial_capacity.max(1));
        // Slot 0 is the shared `nothing` singleton, pinned for the lifetime
        // of the runtime.
        slots.push(Slot {
            value: Some(GuestValue::Nothing),
            marked: false,
        });
        let roots = Rc::new(RootTable::new());
        roots.pin(0);
        Self {
            slots,
            free: Vec::new(),
            roots,
            fault: None,
            frames: Vec::new(),
            allocs_since_gc: 0,
            config,
            collections_run: 0,
            collected_total: 0,
        }
    }

    /// The `nothing` singleton. Never collected.
    #[inline]
    pub fn nothing(&self) -> GuestRef {
        GuestRef(0)
    }

    /// Allocates a value and pins it. Collection may run first if the
    /// threshold was reached, so anything unpinned and unreachable is fair
    /// game by the time this returns.
    pub fn alloc(&mut self, value: GuestValue) -> Rooted {
        self.maybe_collect();
        self.allocs_since_gc += 1;
        let slot = match self.free.pop() {
            Some(ix) => {
                self.slots[ix as usize].value = Some(value);
                ix
            }
            None => {
                self.slots.push(Slot {
                    value: Some(value),
                    marked: false,
                });
                (self.slots.len() - 1) as u32
            }
        };
        trace!(event = "guest_alloc", slot);
        Rooted::new(Rc::clone(&self.roots), GuestRef(slot))
    }

    /// Registers a named guest function on the heap.
    pub fn register_fn<F>(&mut self, name: &str, body: F) -> Rooted
    where
        F: Fn(&mut Bridge, &[Rooted]) -> Result<Rooted, GuestError> + 'static,
    {
        debug!(event = "guest_fn_registered", name);
        let func = GuestFn {
            name: Rc::from(name),
            body: Rc::new(body),
        };
        self.alloc(GuestValue::Function(func))
    }

    /// Reads a live slot.
    ///
    /// Panics on a dangling reference; holding an unpinned handle across a
    /// collection is a caller contract violation, not a recoverable state.
    pub fn get(&self, r: GuestRef) -> &GuestValue {
        match self.slots.get(r.index()).and_then(|s| s.value.as_ref()) {
            Some(value) => value,
            None => panic!("dangling guest reference: slot {} was collected", r.0),
        }
    }

    pub fn kind_name(&self, r: GuestRef) -> &'static str {
        self.get(r).kind_name()
    }

    /// Takes an additional pin on a live slot.
    pub fn root(&self, r: GuestRef) -> Rooted {
        let _ = self.get(r);
        Rooted::new(Rc::clone(&self.roots), r)
    }

    pub fn is_pinned(&self, r: GuestRef) -> bool {
        self.roots.is_pinned(r.0)
    }

    pub(crate) fn function_at(&self, r: GuestRef) -> Option<GuestFn> {
        match self.get(r) {
            GuestValue::Function(f) => Some(f.clone()),
            _ => None,
        }
    }

    // ------------------------------------------------------------------
    // Fault state
    // ------------------------------------------------------------------

    /// Parks an unhandled error in the fault slot, capturing the current
    /// frames. If a fault is already pending it stays; the earlier fault is
    /// the one still propagating outward.
    pub fn raise(&mut self, error: GuestError) {
        if self.fault.is_some() {
            trace!(event = "guest_fault_dropped", message = %error.message);
            return;
        }
        warn!(event = "guest_fault", message = %error.message);
        self.fault = Some(GuestFault {
            message: error.message,
            backtrace: self.backtrace(),
        });
    }

    /// Takes and clears the pending fault, if any.
    #[inline]
    pub fn take_fault(&mut self) -> Option<GuestFault> {
        self.fault.take()
    }

    #[inline]
    pub fn has_fault(&self) -> bool {
        self.fault.is_some()
    }

    // ------------------------------------------------------------------
    // Call frames
    // ------------------------------------------------------------------

    pub(crate) fn push_frame(&mut self, name: Rc<str>) {
        self.frames.push(name);
    }

    pub(crate) fn pop_frame(&mut self) {
        self.frames.pop();
    }

    /// Current guest frames, innermost first.
    pub fn backtrace(&self) -> Vec<String> {
        self.frames.iter().rev().map(|f| f.to_string()).collect()
    }

    pub fn frame_depth(&self) -> usize {
        self.frames.len()
    }

    // ------------------------------------------------------------------
    // Collection
    // ------------------------------------------------------------------

    /// Collects if the allocation threshold was reached.
    #[inline]
    pub fn maybe_collect(&mut self) {
        if self.allocs_since_gc >= self.config.gc_threshold {
            debug!(
                event = "gc_threshold",
                allocs = self.allocs_since_gc,
                threshold = self.config.gc_threshold,
            );
            self.collect();
        }
    }

    /// Forces an immediate collection. Returns the number of slots swept.
    pub fn force_collect(&mut self) -> usize {
        self.collect()
    }

    fn collect(&mut self) -> usize {
        let start = Instant::now();
        debug!(
            event = "gc_start",
            heap_slots = self.slots.len(),
            pinned = self.roots.len(),
        );

        for slot in &mut self.slots {
            slot.marked = false;
        }

        // Mark from the pin table, tracing aggregate children.
        let mut marked = 0usize;
        let mut stack: Vec<u32> = self.roots.pinned_slots();
        while let Some(ix) = stack.pop() {
            let slot = &mut self.slots[ix as usize];
            if slot.marked {
                continue;
            }
            slot.marked = true;
            marked += 1;
            if let Some(GuestValue::List(items)) | Some(GuestValue::Tuple(items)) = &slot.value {
                stack.extend(items.iter().map(|r| r.0));
            }
        }

        // Sweep. Dropping a `HostObj` slot releases its host reference.
        let mut collected = 0usize;
        for (ix, slot) in self.slots.iter_mut().enumerate() {
            if slot.value.is_some() && !slot.marked {
                slot.value = None;
                self.free.push(ix as u32);
                collected += 1;
            }
        }

        self.allocs_since_gc = 0;
        self.collections_run += 1;
        self.collected_total += collected;

        debug!(
            event = "gc_complete",
            duration_us = start.elapsed().as_micros() as u64,
            marked,
            collected,
        );
        collected
    }

    pub fn stats(&self) -> GuestStats {
        GuestStats {
            heap_slots: self.slots.len(),
            live: self.slots.iter().filter(|s| s.value.is_some()).count(),
            pinned: self.roots.len(),
            collections_run: self.collections_run,
            collected_total: self.collected_total,
        }
    }
}

impl Default for GuestRuntime {
    fn default() -> Self {
        Self::new()
    }
}
