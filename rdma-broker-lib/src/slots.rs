//! Client-slot table. A fixed array plus an intrusive free-list
//! behind a single lock; the active count is tracked separately as an atomic
//! so callers can sample it without taking the lock.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::error::{BrokerError, Result};

struct Inner {
    free_list: Vec<usize>,
}

/// Fixed-capacity table of `max_clients` slot identifiers. Slot identifiers
/// are small integers, stable for a connection's lifetime, reused after
/// release, and never surfaced to clients as credentials.
pub struct SlotTable {
    capacity: usize,
    inner: Mutex<Inner>,
    active: AtomicUsize,
}

impl SlotTable {
    pub fn new(capacity: usize) -> Self {
        let free_list = (0..capacity).rev().collect();
        Self { capacity, inner: Mutex::new(Inner { free_list }), active: AtomicUsize::new(0) }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// O(1), locked. Returns [`BrokerError::Capacity`] when the table is full.
    pub fn admit(&self) -> Result<usize> {
        let mut inner = self.inner.lock().unwrap();
        let slot_id = inner.free_list.pop().ok_or(BrokerError::Capacity)?;
        self.active.fetch_add(1, Ordering::Relaxed);
        Ok(slot_id)
    }

    /// O(1), locked. Pushes `slot_id` back onto the free list.
    pub fn release(&self, slot_id: usize) {
        self.inner.lock().unwrap().free_list.push(slot_id);
        self.active.fetch_sub(1, Ordering::Relaxed);
    }

    /// Atomic read; may be stale by the time the caller observes it.
    pub fn active_count(&self) -> usize {
        self.active.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn admits_up_to_capacity_then_rejects() {
        let table = SlotTable::new(2);
        let a = table.admit().unwrap();
        let b = table.admit().unwrap();
        assert_ne!(a, b);
        assert!(matches!(table.admit(), Err(BrokerError::Capacity)));
        assert_eq!(table.active_count(), 2);
    }

    #[test]
    fn release_frees_a_slot_for_reuse() {
        let table = SlotTable::new(1);
        let slot = table.admit().unwrap();
        assert!(table.admit().is_err());
        table.release(slot);
        assert_eq!(table.active_count(), 0);
        assert_eq!(table.admit().unwrap(), slot);
    }

    #[test]
    fn admit_never_hands_out_the_same_slot_twice_concurrently() {
        let table = Arc::new(SlotTable::new(64));
        let handles: Vec<_> = (0..64)
            .map(|_| {
                let table = table.clone();
                thread::spawn(move || table.admit().unwrap())
            })
            .collect();

        let mut slots: Vec<usize> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        slots.sort_unstable();
        slots.dedup();
        assert_eq!(slots.len(), 64, "every admitted slot id must be unique");
        assert!(table.admit().is_err());
    }
}
