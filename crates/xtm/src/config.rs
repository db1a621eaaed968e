use crate::error::XtmError;

/// Flags accepted by [`crate::Queue::new`], controlling whether a
/// producer-direction wake channel is created at all.
///
/// Mirrors the bitflags accepted by `xtm_queue_new` in the original library,
/// expressed as a plain struct of booleans rather than an integer bitmask —
/// there is exactly one independent construction-time flag, not a
/// combinatorial set worth a `bitflags` dependency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct QueueFlags {
    /// If set, a second wake channel is created so the producer thread can
    /// watch [`crate::Queue::producer_fd`] and retry a push once the queue
    /// has drained below capacity. If unset, `producer_fd` is always `None`
    /// and a full queue must be retried by the caller's own means (spinning,
    /// backoff, or simply trying again later).
    pub producer_needs_notifications: bool,
}

impl QueueFlags {
    /// No producer-direction wake channel; a full queue is never signaled.
    pub const NONE: Self = Self {
        producer_needs_notifications: false,
    };

    /// Create a producer-direction wake channel alongside the consumer one.
    pub const WITH_PRODUCER_NOTIFICATIONS: Self = Self {
        producer_needs_notifications: true,
    };
}

/// Flags accepted by [`crate::Queue::close`], controlling which read-end
/// file descriptors the library closes versus leaves to the caller.
///
/// The write-end of a wake channel is always closed by the library when it
/// is a distinct descriptor from the read-end (the pipe fallback); on the
/// single-fd event-counter primitive, read and write alias the same
/// descriptor and its fate is controlled entirely by these flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CloseFlags {
    /// Close the consumer-direction wake channel's read fd.
    pub close_consumer_read_fd: bool,
    /// Close the producer-direction wake channel's read fd, if one exists.
    /// Ignored if the queue has no producer-direction channel.
    pub close_producer_read_fd: bool,
}

impl CloseFlags {
    /// Caller already closed (or otherwise owns) every read fd itself —
    /// typically because it handed the fd to an external event loop that
    /// manages descriptor lifetime on its own.
    pub const CALLER_OWNS_READ_FDS: Self = Self {
        close_consumer_read_fd: false,
        close_producer_read_fd: false,
    };

    /// The queue closes every read fd it created.
    pub const LIBRARY_OWNS_READ_FDS: Self = Self {
        close_consumer_read_fd: true,
        close_producer_read_fd: true,
    };
}

/// Flags accepted by [`crate::Queue::push_fun`]/[`crate::Queue::push_ptr`]
/// on a per-call basis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PushFlags {
    /// If the ring is full, arm the lost-wakeup-avoidance protocol (set
    /// `producer_wants_wakeup` and retry once) instead of returning
    /// `QueueFull` immediately. Has no effect if the queue was constructed
    /// without [`QueueFlags::producer_needs_notifications`].
    pub producer_needs_wakeup: bool,
}

impl PushFlags {
    /// Return `QueueFull` immediately without arming the wakeup protocol.
    pub const NONE: Self = Self {
        producer_needs_wakeup: false,
    };

    /// Arm the lost-wakeup-avoidance protocol on a full queue.
    pub const NEEDS_WAKEUP: Self = Self {
        producer_needs_wakeup: true,
    };
}

/// Configuration for a [`crate::Queue`].
#[derive(Debug, Clone, Copy)]
pub struct Config {
    /// Ring capacity in slots. Must be a power of two and at least 2; one
    /// slot is always reserved to disambiguate empty from full, so the
    /// queue can hold at most `capacity - 1` items at once.
    pub capacity: u32,
    /// Construction-time behavior. See [`QueueFlags`].
    pub flags: QueueFlags,
    /// Enable lightweight atomic counters for push/pop/notify activity.
    /// Disabled by default since the hot path (`push_fun`/`push_ptr`) is
    /// otherwise entirely wait-free and uncontended.
    pub enable_metrics: bool,
}

impl Config {
    /// Creates a new configuration, validating `capacity` eagerly so
    /// construction errors surface at config time rather than at
    /// `Queue::new` time.
    ///
    /// # Errors
    ///
    /// Returns [`XtmError::InvalidCapacity`] if `capacity` is not a power of
    /// two or is smaller than 2.
    pub fn new(capacity: u32, flags: QueueFlags, enable_metrics: bool) -> Result<Self, XtmError> {
        if capacity < 2 || capacity & (capacity - 1) != 0 {
            return Err(XtmError::InvalidCapacity(capacity));
        }
        Ok(Self {
            capacity,
            flags,
            enable_metrics,
        })
    }

    /// Returns the index mask used to wrap ring positions (`capacity - 1`).
    #[inline]
    #[must_use]
    pub const fn mask(&self) -> u32 {
        self.capacity - 1
    }

    /// Returns the largest number of items the queue can hold at once
    /// (`capacity - 1`, after the reserved disambiguation slot).
    #[inline]
    #[must_use]
    pub const fn usable_capacity(&self) -> u32 {
        self.capacity - 1
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            capacity: 1024,
            flags: QueueFlags::NONE,
            enable_metrics: false,
        }
    }
}

/// Tuned for a producer thread that pushes small bursts and needs to know
/// immediately when the queue drains: small ring, producer notifications on.
pub const LOW_LATENCY_CONFIG: Config = Config {
    capacity: 256,
    flags: QueueFlags::WITH_PRODUCER_NOTIFICATIONS,
    enable_metrics: false,
};

/// Tuned for sustained high-rate dispatch where the consumer drains quickly
/// and the producer rarely needs backpressure notification: large ring, no
/// producer notification channel.
pub const HIGH_THROUGHPUT_CONFIG: Config = Config {
    capacity: 1 << 16,
    flags: QueueFlags::NONE,
    enable_metrics: false,
};
