//! Debug assertion macros for the ring/queue invariants.
//!
//! These are only active in debug builds (`#[cfg(debug_assertions)]`), so
//! there is zero overhead in release builds. Used by `Ring` and `Queue`.

// =============================================================================
// INV-CAP-01: Capacity validity
// =============================================================================

/// Assert that a ring capacity is a power of two and at least 2.
///
/// Used in: `Ring::new`, once the public `Queue::new`/`Queue::with_config`
/// entry point has already turned an invalid caller-supplied capacity into
/// a proper `Err`.
macro_rules! debug_assert_power_of_two {
    ($capacity:expr) => {
        debug_assert!(
            $capacity >= 2 && ($capacity & ($capacity - 1)) == 0,
            "INV-CAP-01 violated: capacity {} is not a power of two >= 2",
            $capacity
        )
    };
}

// =============================================================================
// INV-SEQ-01: Bounded count
// =============================================================================

/// Assert that the ring never holds more than `capacity - 1` items, the
/// slot reserved to disambiguate empty from full.
///
/// **Invariant**: `count < capacity`
///
/// Used in: `Ring::put` after computing the candidate next write index.
macro_rules! debug_assert_bounded_count {
    ($count:expr, $capacity:expr) => {
        debug_assert!(
            $count < $capacity,
            "INV-SEQ-01 violated: count {} not below capacity {}",
            $count,
            $capacity
        )
    };
}

// =============================================================================
// INV-PAT-01: Single usage pattern per queue
// =============================================================================

/// Assert that a queue is used with exactly one of the function-dispatch or
/// pointer-transfer patterns for its whole lifetime.
///
/// Used in: `Queue::push_fun`, `Queue::push_ptr`, `Queue::invoke_funs_all`,
/// `Queue::pop_ptrs`.
macro_rules! debug_assert_single_pattern {
    ($observed:expr, $expected:expr) => {
        debug_assert!(
            $observed == $expected,
            "INV-PAT-01 violated: queue mixed function-dispatch and \
             pointer-transfer usage patterns (observed {:?}, established {:?})",
            $observed,
            $expected
        )
    };
}

pub(crate) use debug_assert_bounded_count;
pub(crate) use debug_assert_power_of_two;
pub(crate) use debug_assert_single_pattern;
