//! The wait-free SPSC ring of [`Slot`]s at the heart of a [`crate::Queue`].
//!
//! Indices are plain `u32` counters wrapped modulo `capacity` via a mask,
//! not unbounded monotone sequence numbers — a push/pop pair never needs to
//! disambiguate ABA across more than one lap of the ring, since the single
//! reserved slot already makes `read == write` unambiguous (see the module
//! invariants below).
//!
//! # Memory ordering
//!
//! - `write` is stored with `Release` after the cell it guards is written,
//!   and loaded with `Acquire` by the consumer so those writes become
//!   visible before it reads the cells.
//! - `read` is stored with `Release` after the consumer is done with the
//!   cells it freed, and loaded with `Acquire` by the producer so it can
//!   observe the freed slots before reusing them.
//! - Neither index is ever written by more than one thread, so producer-side
//!   and consumer-side loads of their own index use `Relaxed`.

use std::cell::UnsafeCell;
use std::mem::MaybeUninit;
use std::sync::atomic::{AtomicU32, Ordering};

use crate::invariants::{debug_assert_bounded_count, debug_assert_power_of_two};
use crate::slot::Slot;

/// A wait-free bounded SPSC ring of [`Slot`]s.
///
/// `write` is mutated only by the producer, `read` only by the consumer.
/// One slot is always reserved to disambiguate empty (`read == write`) from
/// full (`(write + 1) & mask == read`), so the usable capacity is
/// `capacity - 1`.
pub(crate) struct Ring {
    write: AtomicU32,
    read: AtomicU32,
    mask: u32,
    capacity: u32,
    buffer: Box<[UnsafeCell<MaybeUninit<Slot>>]>,
}

// Safety: `Ring` is shared between exactly two threads (one producer, one
// consumer) that never touch the same index; all cross-thread visibility of
// buffer contents goes through the release/acquire pairing on `write`/`read`.
unsafe impl Send for Ring {}
unsafe impl Sync for Ring {}

impl Ring {
    /// Creates a new ring. `capacity` must already be validated as a power
    /// of two `>= 2` by the caller (`Config::new`); this is re-checked with
    /// a debug assertion only.
    pub(crate) fn new(capacity: u32) -> Self {
        debug_assert_power_of_two!(capacity);
        let mut storage = Vec::with_capacity(capacity as usize);
        storage.resize_with(capacity as usize, || UnsafeCell::new(MaybeUninit::uninit()));
        Self {
            write: AtomicU32::new(0),
            read: AtomicU32::new(0),
            mask: capacity - 1,
            capacity,
            buffer: storage.into_boxed_slice(),
        }
    }

    #[inline]
    pub(crate) fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Advisory snapshot of the number of cells currently queued.
    #[inline]
    pub(crate) fn count(&self) -> u32 {
        let write = self.write.load(Ordering::Acquire);
        let read = self.read.load(Ordering::Acquire);
        write.wrapping_sub(read) & self.mask
    }

    /// Advisory snapshot of the number of free slots (excluding the
    /// permanently reserved disambiguation slot).
    #[inline]
    pub(crate) fn free_count(&self) -> u32 {
        let write = self.write.load(Ordering::Acquire);
        let read = self.read.load(Ordering::Acquire);
        (read.wrapping_sub(write).wrapping_sub(1)) & self.mask
    }

    #[inline]
    pub(crate) fn is_full(&self) -> bool {
        let write = self.write.load(Ordering::Acquire);
        let read = self.read.load(Ordering::Acquire);
        (write.wrapping_add(1) & self.mask) == read
    }

    #[inline]
    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool {
        self.write.load(Ordering::Acquire) == self.read.load(Ordering::Acquire)
    }

    /// Producer-only. Copies up to `n` cells from `cells` into the ring
    /// starting at the current write position, stopping early if the ring
    /// fills. Returns the number actually written (`0..=n`); never fails,
    /// only refuses to write past capacity.
    pub(crate) fn put(&self, cells: &[Slot], n: usize) -> usize {
        let n = n.min(cells.len());
        if n == 0 {
            return 0;
        }

        let read = self.read.load(Ordering::Acquire);
        let mut write = self.write.load(Ordering::Relaxed);
        let mut written = 0;

        while written < n {
            let next = write.wrapping_add(1) & self.mask;
            if next == read {
                break;
            }
            let idx = write as usize;
            // Safety: `idx` is only ever touched by the producer between
            // here and the consumer's subsequent acquire-synchronized read;
            // the consumer cannot yet see this slot since `write` has not
            // been published.
            unsafe {
                (*self.buffer[idx].get()).write(cells[written]);
            }
            write = next;
            written += 1;
        }

        if written > 0 {
            debug_assert_bounded_count!(write.wrapping_sub(read) & self.mask, self.capacity);
            self.write.store(write, Ordering::Release);
        }

        written
    }

    /// Consumer-only. Opens a scoped read transaction over every cell
    /// currently visible (i.e. published before this call). The returned
    /// [`Drainer`] advances a local cursor as cells are yielded and commits
    /// it via a release store of `read` when dropped — so iterating to
    /// completion, `break`ing early, or abandoning the iterator after only
    /// partial consumption all commit exactly the cells actually yielded.
    pub(crate) fn pop_iter(&self) -> Drainer<'_> {
        let read = self.read.load(Ordering::Relaxed);
        let end_of_read = self.write.load(Ordering::Acquire);
        Drainer {
            ring: self,
            cursor: read,
            end_of_read,
        }
    }
}

/// Scoped read-side cursor returned by [`Ring::pop_iter`].
///
/// Reading past the snapshot taken at `begin` yields `None`: cells the
/// producer publishes *during* iteration are left for the next drain. This
/// gives every drain a clean batch boundary and bounds the work done per
/// wake-up.
pub(crate) struct Drainer<'a> {
    ring: &'a Ring,
    cursor: u32,
    end_of_read: u32,
}

impl Iterator for Drainer<'_> {
    type Item = Slot;

    fn next(&mut self) -> Option<Slot> {
        if self.cursor == self.end_of_read {
            return None;
        }
        let idx = self.cursor as usize;
        // Safety: every slot in `[read, end_of_read)` was written by the
        // producer and published via the acquire-synchronized load of
        // `write` that produced `end_of_read`.
        let slot = unsafe { (*self.ring.buffer[idx].get()).assume_init() };
        self.cursor = self.cursor.wrapping_add(1) & self.ring.mask;
        Some(slot)
    }
}

impl Drop for Drainer<'_> {
    fn drop(&mut self) {
        self.ring.read.store(self.cursor, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::slot::{QueueFn, Slot};

    fn ptr_slot(v: usize) -> Slot {
        Slot::from_ptr(v as *mut ())
    }

    fn drain_ptrs(ring: &Ring) -> Vec<usize> {
        ring.pop_iter()
            // Safety: this test only ever pushes via `ptr_slot`.
            .map(|s| unsafe { s.as_ptr() } as usize)
            .collect()
    }

    #[test]
    fn capacity_accounting() {
        let ring = Ring::new(4);
        assert_eq!(ring.capacity(), 4);
        assert_eq!(ring.count(), 0);
        assert_eq!(ring.free_count(), 3);
        assert!(ring.is_empty());
        assert!(!ring.is_full());
    }

    #[test]
    fn fills_to_usable_capacity_then_refuses() {
        let ring = Ring::new(4); // usable capacity 3
        for i in 0..3 {
            assert_eq!(ring.put(&[ptr_slot(i)], 1), 1);
        }
        assert!(ring.is_full());
        assert_eq!(ring.put(&[ptr_slot(99)], 1), 0);
        assert_eq!(ring.count(), 3);
        assert_eq!(ring.free_count(), 0);
    }

    #[test]
    fn put_stops_partway_through_a_batch_when_full() {
        let ring = Ring::new(4); // usable capacity 3
        let batch: Vec<Slot> = (0..10).map(ptr_slot).collect();
        assert_eq!(ring.put(&batch, batch.len()), 3);
    }

    #[test]
    fn fifo_round_trip() {
        let ring = Ring::new(8);
        for i in 0..5 {
            assert_eq!(ring.put(&[ptr_slot(i)], 1), 1);
        }
        assert_eq!(drain_ptrs(&ring), vec![0, 1, 2, 3, 4]);
        assert!(ring.is_empty());
    }

    #[test]
    fn abandoned_drainer_commits_nothing() {
        let ring = Ring::new(8);
        ring.put(&[ptr_slot(1), ptr_slot(2), ptr_slot(3)], 3);

        {
            let mut it = ring.pop_iter();
            assert!(it.next().is_some());
            // Drop without reading the rest: nothing past the first item
            // should be considered consumed.
        }
        assert_eq!(ring.count(), 2);
        assert_eq!(drain_ptrs(&ring), vec![2, 3]);
    }

    #[test]
    fn wraps_around_after_repeated_fill_and_drain() {
        let ring = Ring::new(4); // usable capacity 3
        let mut expected_next = 0usize;
        for round in 0..5 {
            for i in 0..3 {
                assert_eq!(ring.put(&[ptr_slot(round * 3 + i)], 1), 1);
            }
            let got = drain_ptrs(&ring);
            let expected: Vec<usize> = (expected_next..expected_next + 3).collect();
            assert_eq!(got, expected);
            expected_next += 3;
        }
    }

    #[test]
    fn function_dispatch_round_trip() {
        static mut LAST_ARG: usize = 0;
        unsafe fn record(arg: *mut ()) {
            unsafe {
                LAST_ARG = arg as usize;
            }
        }
        let f: QueueFn = record;

        let ring = Ring::new(4);
        assert_eq!(ring.put(&[Slot::from_fun(f, 42usize as *mut ())], 1), 1);

        let mut invoked = 0;
        for slot in ring.pop_iter() {
            // Safety: this ring is only ever used in the function-dispatch
            // pattern within this test.
            let fun_slot = unsafe { slot.as_fun_slot() };
            unsafe { (fun_slot.fun)(fun_slot.fun_arg) };
            invoked += 1;
        }
        assert_eq!(invoked, 1);
        assert_eq!(unsafe { LAST_ARG }, 42);
    }
}
