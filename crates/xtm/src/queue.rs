//! The public facade binding a [`Ring`] to one or two [`WakeChannel`]s.

use std::os::unix::io::RawFd;
use std::sync::atomic::{AtomicBool, Ordering};
#[cfg(debug_assertions)]
use std::sync::atomic::AtomicU8;

use crate::backoff::Backoff;
use crate::config::{CloseFlags, Config, PushFlags, QueueFlags};
use crate::error::XtmError;
#[cfg(debug_assertions)]
use crate::invariants::debug_assert_single_pattern;
use crate::metrics::{Metrics, MetricsSnapshot};
use crate::ring::Ring;
use crate::slot::{QueueFn, Slot, UsagePattern};
use crate::wake::WakeChannel;

/// Outcome of a push attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    /// The cell was written to the ring.
    Pushed,
    /// The ring was full after the retry permitted by [`PushFlags`]; the
    /// caller must try again later (spinning, backoff, or sleeping on
    /// [`Queue::producer_fd`]).
    QueueFull,
}

/// Outcome of [`Queue::probe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeStatus {
    /// At least one slot is free; a push would succeed right now.
    Ready,
    /// The ring is full.
    QueueFull,
}

/// A single-producer/single-consumer message transport: a wait-free bounded
/// ring paired with one or two kernel-backed wake channels.
///
/// A `Queue` is used in exactly one of two patterns for its whole lifetime —
/// function-dispatch (`push_fun`/`invoke_funs_all`) or pointer-transfer
/// (`push_ptr`/`pop_ptrs`) — enforced by a debug assertion on the first call
/// that commits to one of them.
pub struct Queue {
    ring: Ring,
    consumer_chan: WakeChannel,
    producer_chan: Option<WakeChannel>,
    producer_wants_wakeup: AtomicBool,
    #[cfg(debug_assertions)]
    pattern: AtomicU8,
    metrics: Option<Metrics>,
    config: Config,
}

// Safety: a `Queue` is shared between exactly one producer and one consumer
// thread; every field either is itself `Sync` (`Ring`, the atomics) or is
// only ever read by both sides (`config`, `metrics`, the optional channel).
unsafe impl Sync for Queue {}

impl Queue {
    /// Creates a queue with the given capacity and construction-time flags,
    /// using default configuration otherwise (metrics disabled).
    ///
    /// # Errors
    ///
    /// Returns [`XtmError::InvalidCapacity`] if `capacity` is not a power of
    /// two `>= 2`, or an I/O error if the kernel wake channel(s) could not be
    /// created.
    pub fn new(capacity: u32, flags: QueueFlags) -> Result<Self, XtmError> {
        Self::with_config(Config::new(capacity, flags, false)?)
    }

    /// Creates a queue from a fully specified [`Config`].
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the kernel wake channel(s) could not be
    /// created; any channel already created is torn down before returning.
    pub fn with_config(config: Config) -> Result<Self, XtmError> {
        let ring = Ring::new(config.capacity);
        let consumer_chan = WakeChannel::new()?;
        let producer_chan = if config.flags.producer_needs_notifications {
            match WakeChannel::new() {
                Ok(chan) => Some(chan),
                Err(err) => {
                    consumer_chan.teardown();
                    return Err(err);
                }
            }
        } else {
            None
        };
        let metrics = config.enable_metrics.then(Metrics::new);
        Ok(Self {
            ring,
            consumer_chan,
            producer_chan,
            producer_wants_wakeup: AtomicBool::new(false),
            #[cfg(debug_assertions)]
            pattern: AtomicU8::new(UsagePattern::Unset as u8),
            metrics,
            config,
        })
    }

    #[cfg(debug_assertions)]
    fn check_pattern(&self, expected: UsagePattern) {
        let observed = match self.pattern.compare_exchange(
            UsagePattern::Unset as u8,
            expected as u8,
            Ordering::Relaxed,
            Ordering::Relaxed,
        ) {
            Ok(_) => expected,
            Err(current) => UsagePattern::from(current),
        };
        debug_assert_single_pattern!(observed, expected);
    }

    #[cfg(not(debug_assertions))]
    #[inline]
    fn check_pattern(&self, _expected: UsagePattern) {}

    fn push_slot(&self, slot: Slot, flags: PushFlags) -> PushOutcome {
        let cell = [slot];
        if self.ring.put(&cell, 1) == 1 {
            if let Some(metrics) = &self.metrics {
                metrics.add_items_pushed(1);
            }
            return PushOutcome::Pushed;
        }
        if let Some(metrics) = &self.metrics {
            metrics.add_push_failure();
        }
        if !flags.producer_needs_wakeup || self.producer_chan.is_none() {
            return PushOutcome::QueueFull;
        }

        // Publish the intent to sleep before retrying: if the consumer's
        // drain-and-exchange already ran and saw `false`, this store still
        // lands before we check `put` again, so either this retry succeeds
        // (no wakeup needed) or the flag stays visible for the consumer's
        // next drain to pick up.
        self.producer_wants_wakeup.store(true, Ordering::SeqCst);

        if self.ring.put(&cell, 1) == 1 {
            if let Some(metrics) = &self.metrics {
                metrics.add_items_pushed(1);
            }
            return PushOutcome::Pushed;
        }
        PushOutcome::QueueFull
    }

    /// Pushes a `(function, argument)` pair for later invocation by
    /// [`Queue::invoke_funs_all`].
    pub fn push_fun(&self, fun: QueueFn, arg: *mut (), flags: PushFlags) -> PushOutcome {
        self.check_pattern(UsagePattern::FunctionDispatch);
        self.push_slot(Slot::from_fun(fun, arg), flags)
    }

    /// Pushes a single opaque pointer for later retrieval by
    /// [`Queue::pop_ptrs`].
    pub fn push_ptr(&self, ptr: *mut (), flags: PushFlags) -> PushOutcome {
        self.check_pattern(UsagePattern::PointerTransfer);
        self.push_slot(Slot::from_ptr(ptr), flags)
    }

    /// Like [`Queue::push_fun`], but spins with an adaptive [`Backoff`]
    /// instead of returning [`PushOutcome::QueueFull`] on the first retry
    /// failure. Still returns `QueueFull` once the backoff gives up, so the
    /// caller can fall back to sleeping on [`Queue::producer_fd`].
    pub fn push_fun_with_backoff(&self, fun: QueueFn, arg: *mut (), flags: PushFlags) -> PushOutcome {
        let mut backoff = Backoff::new();
        loop {
            match self.push_fun(fun, arg, flags) {
                PushOutcome::Pushed => return PushOutcome::Pushed,
                PushOutcome::QueueFull if backoff.is_completed() => return PushOutcome::QueueFull,
                PushOutcome::QueueFull => backoff.snooze(),
            }
        }
    }

    /// Like [`Queue::push_ptr`], with the same backoff-before-giving-up
    /// behavior as [`Queue::push_fun_with_backoff`].
    pub fn push_ptr_with_backoff(&self, ptr: *mut (), flags: PushFlags) -> PushOutcome {
        let mut backoff = Backoff::new();
        loop {
            match self.push_ptr(ptr, flags) {
                PushOutcome::Pushed => return PushOutcome::Pushed,
                PushOutcome::QueueFull if backoff.is_completed() => return PushOutcome::QueueFull,
                PushOutcome::QueueFull => backoff.snooze(),
            }
        }
    }

    /// Drains every currently-visible cell, invoking `fun(arg)` for each.
    /// Returns the number of cells invoked.
    pub fn invoke_funs_all(&self) -> usize {
        self.check_pattern(UsagePattern::FunctionDispatch);
        let mut invoked = 0usize;
        for slot in self.ring.pop_iter() {
            // Safety: this queue's pattern is pinned to function-dispatch by
            // `check_pattern` above.
            let fun_slot = unsafe { slot.as_fun_slot() };
            unsafe { (fun_slot.fun)(fun_slot.fun_arg) };
            invoked += 1;
        }
        self.record_drain(invoked);
        self.maybe_notify_producer();
        invoked
    }

    /// Copies up to `buf.len()` pointers from the ring into `buf`. Returns
    /// the number actually copied.
    pub fn pop_ptrs(&self, buf: &mut [*mut ()]) -> usize {
        self.check_pattern(UsagePattern::PointerTransfer);
        let mut drainer = self.ring.pop_iter();
        let mut count = 0usize;
        while count < buf.len() {
            match drainer.next() {
                Some(slot) => {
                    // Safety: this queue's pattern is pinned to
                    // pointer-transfer by `check_pattern` above.
                    buf[count] = unsafe { slot.as_ptr() };
                    count += 1;
                }
                None => break,
            }
        }
        drop(drainer);
        self.record_drain(count);
        self.maybe_notify_producer();
        count
    }

    fn record_drain(&self, n: usize) {
        if let Some(metrics) = &self.metrics {
            if n > 0 {
                metrics.add_items_popped(n as u64);
                metrics.add_batch_drained();
            }
        }
    }

    /// Atomically takes `producer_wants_wakeup` and notifies the producer
    /// direction exactly once if it had been set. Called after every drain,
    /// after the drain's own commit, so the exchange never races a producer
    /// that is still mid-retry.
    fn maybe_notify_producer(&self) {
        if self.producer_chan.is_none() {
            return;
        }
        let was_waiting = self.producer_wants_wakeup.swap(false, Ordering::SeqCst);
        if was_waiting {
            // Best-effort: a failed notify here is the same class of rare,
            // non-retryable I/O failure `close` can hit on teardown: nothing
            // short of surfacing it through a fallible drain API (not part
            // of this surface) could recover it, and the ring state itself
            // is unaffected.
            let _ = self.notify_producer();
        }
    }

    /// Number of cells currently queued (advisory — may be stale the
    /// instant it's read on a queue with a live producer or consumer).
    #[must_use]
    pub fn count(&self) -> u32 {
        self.ring.count()
    }

    /// Checks whether a push would currently succeed, without performing
    /// one.
    #[must_use]
    pub fn probe(&self) -> ProbeStatus {
        if self.ring.is_full() {
            ProbeStatus::QueueFull
        } else {
            ProbeStatus::Ready
        }
    }

    /// Sends a single non-blocking notification on the consumer-direction
    /// wake channel.
    ///
    /// # Errors
    ///
    /// Returns an error only for a non-retryable write failure; `EAGAIN`/
    /// `EWOULDBLOCK` are treated as success.
    pub fn notify_consumer(&self) -> Result<(), XtmError> {
        self.consumer_chan.notify()?;
        if let Some(metrics) = &self.metrics {
            metrics.add_consumer_notification();
        }
        Ok(())
    }

    /// Sends a single non-blocking notification on the producer-direction
    /// wake channel. A no-op if the queue has no producer-direction channel.
    ///
    /// # Errors
    ///
    /// Returns an error only for a non-retryable write failure; `EAGAIN`/
    /// `EWOULDBLOCK` are treated as success.
    pub fn notify_producer(&self) -> Result<(), XtmError> {
        let Some(chan) = &self.producer_chan else {
            return Ok(());
        };
        chan.notify()?;
        if let Some(metrics) = &self.metrics {
            metrics.add_producer_notification();
        }
        Ok(())
    }

    /// The consumer-direction readiness fd: becomes readable (edge-triggered)
    /// whenever the producer calls [`Queue::notify_consumer`]. Always
    /// present.
    #[must_use]
    pub fn consumer_fd(&self) -> RawFd {
        self.consumer_chan.read_fd()
    }

    /// The producer-direction readiness fd, if this queue was constructed
    /// with [`QueueFlags::producer_needs_notifications`].
    #[must_use]
    pub fn producer_fd(&self) -> Option<RawFd> {
        self.producer_chan.as_ref().map(WakeChannel::read_fd)
    }

    /// A snapshot of this queue's activity counters, if it was constructed
    /// with `enable_metrics` set.
    #[must_use]
    pub fn metrics(&self) -> Option<MetricsSnapshot> {
        self.metrics.as_ref().map(Metrics::snapshot)
    }

    /// The configuration this queue was constructed with.
    #[must_use]
    pub fn config(&self) -> Config {
        self.config
    }

    /// Closes this queue's wake-channel descriptors according to `flags`,
    /// consuming it.
    ///
    /// The write-end of each channel is always closed when it is a distinct
    /// descriptor from the read-end (the pipe fallback); on the single-fd
    /// event-counter primitive the write-end aliases the read-end and its
    /// fate is controlled entirely by `flags`. Every step is attempted even
    /// if an earlier one failed; the first error encountered is returned.
    ///
    /// # Errors
    ///
    /// Returns the first close failure encountered, if any.
    pub fn close(mut self, flags: CloseFlags) -> Result<(), XtmError> {
        let mut first_err = None;

        if flags.close_consumer_read_fd {
            if let Err(err) = self.consumer_chan.close_read() {
                first_err.get_or_insert(err);
            }
        }
        if let Err(err) = self.consumer_chan.close_write() {
            first_err.get_or_insert(err);
        }

        if let Some(producer_chan) = self.producer_chan.as_mut() {
            if flags.close_producer_read_fd {
                if let Err(err) = producer_chan.close_read() {
                    first_err.get_or_insert(err);
                }
            }
            if let Err(err) = producer_chan.close_write() {
                first_err.get_or_insert(err);
            }
        }

        match first_err {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}
