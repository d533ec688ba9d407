//! Pin tracking - guest values kept alive for the host's sake
//!
//! The collector only knows about guest-internal reachability. Values held
//! across the boundary (callable payloads, foreign wrappers, in-flight call
//! arguments) are pinned here; a pinned slot is a mark root. Pins are
//! counted, so independent holders of the same slot compose.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use super::value::GuestRef;

/// Pin table shared between the runtime and every outstanding [`Rooted`].
pub(crate) struct RootTable {
    pins: RefCell<HashMap<u32, u32>>,
}

impl RootTable {
    pub(crate) fn new() -> Self {
        Self {
            pins: RefCell::new(HashMap::with_capacity(64)),
        }
    }

    #[inline]
    pub(crate) fn pin(&self, slot: u32) {
        *self.pins.borrow_mut().entry(slot).or_insert(0) += 1;
    }

    #[inline]
    pub(crate) fn unpin(&self, slot: u32) {
        let mut pins = self.pins.borrow_mut();
        match pins.get_mut(&slot) {
            Some(count) if *count > 1 => *count -= 1,
            Some(_) => {
                pins.remove(&slot);
            }
            None => debug_assert!(false, "unpin of slot {slot} that holds no pin"),
        }
    }

    pub(crate) fn is_pinned(&self, slot: u32) -> bool {
        self.pins.borrow().contains_key(&slot)
    }

    /// Snapshot of all pinned slots, the collector's mark roots.
    pub(crate) fn pinned_slots(&self) -> Vec<u32> {
        self.pins.borrow().keys().copied().collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.pins.borrow().len()
    }
}

/// Scoped pin on a guest heap slot.
///
/// Acquiring a `Rooted` pins the slot; dropping it releases the pin, on
/// success and error paths alike. Cloning takes an additional pin, so each
/// holder has an independent guarantee.
pub struct Rooted {
    slot: GuestRef,
    table: Rc<RootTable>,
}

impl Rooted {
    pub(crate) fn new(table: Rc<RootTable>, slot: GuestRef) -> Self {
        table.pin(slot.0);
        Self { slot, table }
    }

    /// The pinned slot.
    #[inline]
    pub fn get(&self) -> GuestRef {
        self.slot
    }
}

impl Clone for Rooted {
    fn clone(&self) -> Self {
        Rooted::new(Rc::clone(&self.table), self.slot)
    }
}

impl Drop for Rooted {
    #[inline]
    fn drop(&mut self) {
        self.table.unpin(self.slot.0);
    }
}

impl fmt::Debug for Rooted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Rooted").field(&self.slot.0).finish()
    }
}
