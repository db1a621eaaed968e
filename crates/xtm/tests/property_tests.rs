//! Property-based tests for the ring/queue invariants in `xtm`.
//!
//! These check invariants 1-3 and 7 against randomized interleavings of
//! push and drain batch sizes.

use proptest::prelude::*;
use xtm::{PushFlags, PushOutcome, Queue, QueueFlags};

fn capacity_strategy() -> impl Strategy<Value = u32> {
    (1u32..=12).prop_map(|bits| 1u32 << bits)
}

proptest! {
    /// INV: `count + free_count + 1 == capacity` always holds, where
    /// `free_count` is derived here as `capacity - 1 - count`.
    #[test]
    fn prop_bounded_count(
        capacity in capacity_strategy(),
        pushes in 0usize..200,
        drains in 0usize..200,
    ) {
        let queue = Queue::new(capacity, QueueFlags::NONE).unwrap();
        let mut pushed = 0u32;
        for i in 0..pushes {
            match queue.push_ptr((i + 1) as *mut (), PushFlags::NONE) {
                PushOutcome::Pushed => pushed += 1,
                PushOutcome::QueueFull => break,
            }
        }
        prop_assert!(queue.count() <= capacity - 1);
        prop_assert_eq!(queue.count(), pushed);

        let mut buf = vec![std::ptr::null_mut(); drains];
        let drained = queue.pop_ptrs(&mut buf);
        prop_assert!(drained <= pushed as usize);
        prop_assert_eq!(queue.count(), pushed - drained as u32);
    }

    /// INV: cells are observed in push order regardless of drain batching.
    #[test]
    fn prop_fifo_order_preserved(
        capacity in capacity_strategy(),
        batch_sizes in prop::collection::vec(1usize..8, 1..40),
    ) {
        let usable = (capacity - 1) as usize;
        let queue = Queue::new(capacity, QueueFlags::NONE).unwrap();
        let mut next_push = 0usize;
        let mut next_expected = 0usize;
        let mut buf = vec![std::ptr::null_mut(); 8];

        for &want in &batch_sizes {
            let mut pushed_this_round = 0;
            while pushed_this_round < want && queue.count() < usable as u32 {
                next_push += 1;
                let outcome = queue.push_ptr(next_push as *mut (), PushFlags::NONE);
                if outcome == PushOutcome::QueueFull {
                    break;
                }
                pushed_this_round += 1;
            }

            let n = queue.pop_ptrs(&mut buf);
            for slot in &buf[..n] {
                next_expected += 1;
                prop_assert_eq!(*slot, next_expected as *mut ());
            }
        }

        // Drain whatever remains; it must continue the same monotone sequence.
        loop {
            let n = queue.pop_ptrs(&mut buf);
            if n == 0 {
                break;
            }
            for slot in &buf[..n] {
                next_expected += 1;
                prop_assert_eq!(*slot, next_expected as *mut ());
            }
        }
        prop_assert_eq!(next_expected, next_push);
    }

    /// INV: after `n` successful pushes minus `m` drained cells,
    /// `count == n - m`, for randomized push/drain interleavings on a
    /// queue with producer notifications enabled (exercises the
    /// wants-wakeup bookkeeping without affecting ring accounting).
    #[test]
    fn prop_count_matches_pushes_minus_drains_with_notifications(
        capacity in capacity_strategy(),
        steps in prop::collection::vec((0u8..2, 1usize..5), 1..60),
    ) {
        let queue = Queue::new(capacity, QueueFlags::WITH_PRODUCER_NOTIFICATIONS).unwrap();
        let mut pushed = 0u32;
        let mut drained = 0u32;
        let mut buf = vec![std::ptr::null_mut(); 8];

        for (op, amount) in steps {
            if op == 0 {
                for _ in 0..amount {
                    match queue.push_ptr(1usize as *mut (), PushFlags::NEEDS_WAKEUP) {
                        PushOutcome::Pushed => pushed += 1,
                        PushOutcome::QueueFull => break,
                    }
                }
            } else {
                let take = amount.min(buf.len());
                let n = queue.pop_ptrs(&mut buf[..take]);
                drained += n as u32;
            }
            prop_assert_eq!(queue.count(), pushed - drained);
        }
    }
}
