use std::io;

use thiserror::Error;

/// Errors produced by [`crate::Queue`] construction, teardown, and I/O-adjacent
/// operations.
///
/// Operations that only touch the lock-free ring (`push_fun`, `push_ptr`,
/// `pop_ptrs`, `invoke_funs_all`) signal backpressure with a plain `bool`/
/// `Option`/count rather than `XtmError`: a full ring is an expected, hot-path
/// outcome, not an error condition.
#[derive(Debug, Error)]
pub enum XtmError {
    /// `capacity` passed to [`crate::Queue::new`] was not a power of two, or
    /// was smaller than the minimum of 2.
    #[error("queue capacity {0} must be a power of two and at least 2")]
    InvalidCapacity(u32),

    /// Creating the kernel-backed wake channel (eventfd or pipe) failed.
    #[error("failed to create wake channel: {0}")]
    ChannelCreate(#[source] io::Error),

    /// Arming a channel's file descriptors non-blocking via `fcntl` failed.
    #[error("failed to set wake channel non-blocking: {0}")]
    SetNonBlocking(#[source] io::Error),

    /// Writing to a notification fd failed for a reason other than the
    /// queue simply being full (`EAGAIN`/`EWOULDBLOCK`, which callers see as
    /// success per xtm convention).
    #[error("failed to notify: {0}")]
    Notify(#[source] io::Error),

    /// Reading (draining) a notification fd failed.
    #[error("failed to consume notification: {0}")]
    Consume(#[source] io::Error),

    /// Closing one of the queue's file descriptors failed.
    #[error("failed to close wake channel fd: {0}")]
    Close(#[source] io::Error),
}

impl XtmError {
    /// Builds an `io::Error` from the current `errno`, the same convention
    /// the C library uses for its `-1`-on-failure return values.
    pub(crate) fn last_os_error() -> io::Error {
        io::Error::last_os_error()
    }
}
