//! Kernel-backed, non-blocking, edge-triggered readiness primitive.
//!
//! A [`WakeChannel`] carries no payload — only a boolean-in-time edge: a
//! *notify* tells the peer "something changed", a *consume* re-arms the fd
//! so it can become readable again. On Linux this is backed by a single
//! `eventfd` whose read- and write-ends alias the same descriptor; on other
//! Unix targets it falls back to a non-blocking pipe.

use std::io;
use std::os::unix::io::RawFd;

use crate::error::XtmError;

/// `eventfd` requires writes of exactly 8 bytes; the pipe fallback writes
/// the same payload size for symmetry, though a pipe has no such minimum.
const NOTIFY_PAYLOAD: [u8; 8] = [1, 0, 0, 0, 0, 0, 0, 0];

/// Size of the scratch buffer `consume` drains into. Matches the original
/// xtm implementation's 4096-byte stack buffer rather than looping a byte
/// at a time.
const CONSUME_BUF_LEN: usize = 4096;

/// One direction's worth of wake-up plumbing: a readable end the receiving
/// thread polls, and a writable end the sending thread notifies through.
pub(crate) struct WakeChannel {
    read_fd: RawFd,
    write_fd: RawFd,
    write_closed: bool,
}

impl WakeChannel {
    /// Creates a new channel with both ends set non-blocking.
    #[cfg(target_os = "linux")]
    pub(crate) fn new() -> Result<Self, XtmError> {
        // Safety: `eventfd` has no preconditions; `EFD_NONBLOCK` means we
        // never need a separate `fcntl` to arm non-blocking mode, and
        // `EFD_CLOEXEC` keeps the fd out of child processes.
        let fd = unsafe { libc::eventfd(0, libc::EFD_NONBLOCK | libc::EFD_CLOEXEC) };
        if fd < 0 {
            return Err(XtmError::ChannelCreate(XtmError::last_os_error()));
        }
        Ok(Self {
            read_fd: fd,
            write_fd: fd,
            write_closed: false,
        })
    }

    #[cfg(not(target_os = "linux"))]
    pub(crate) fn new() -> Result<Self, XtmError> {
        let mut fds: [RawFd; 2] = [0; 2];
        // Safety: `fds` is a valid, writable two-element array.
        let rc = unsafe { libc::pipe(fds.as_mut_ptr()) };
        if rc != 0 {
            return Err(XtmError::ChannelCreate(XtmError::last_os_error()));
        }
        let channel = Self {
            read_fd: fds[0],
            write_fd: fds[1],
            write_closed: false,
        };
        set_nonblocking(fds[0])?;
        set_nonblocking(fds[1])?;
        Ok(channel)
    }

    #[inline]
    pub(crate) fn read_fd(&self) -> RawFd {
        self.read_fd
    }

    #[inline]
    fn is_single_fd(&self) -> bool {
        self.read_fd == self.write_fd
    }

    /// A single non-blocking write. May be coalesced by the kernel (event
    /// counter) or may write zero-or-more bytes (pipe); `EAGAIN`/
    /// `EWOULDBLOCK` mean the peer already has a pending wake-up and count
    /// as success. `EINTR` is retried internally and never surfaced.
    pub(crate) fn notify(&self) -> Result<(), XtmError> {
        loop {
            // Safety: `write_fd` stays open for the lifetime of this
            // channel and `NOTIFY_PAYLOAD` is a valid 8-byte buffer.
            let rc = unsafe {
                libc::write(
                    self.write_fd,
                    NOTIFY_PAYLOAD.as_ptr().cast(),
                    NOTIFY_PAYLOAD.len(),
                )
            };
            if rc >= 0 {
                return Ok(());
            }
            let err = XtmError::last_os_error();
            match err.raw_os_error() {
                Some(libc::EINTR) => continue,
                Some(libc::EAGAIN) | Some(libc::EWOULDBLOCK) => return Ok(()),
                _ => return Err(XtmError::Notify(err)),
            }
        }
    }

    /// Drains whatever is currently available on the read end. Returns
    /// success on `EAGAIN`/`EWOULDBLOCK`; retries `EINTR`.
    pub(crate) fn drain(&self) -> Result<(), XtmError> {
        consume(self.read_fd)
    }

    /// Closes the write end, unless it aliases the read end (single-fd
    /// primitive) or has already been closed. Idempotent.
    pub(crate) fn close_write(&mut self) -> Result<(), XtmError> {
        if self.write_closed || self.is_single_fd() {
            self.write_closed = true;
            return Ok(());
        }
        self.write_closed = true;
        // Safety: `write_fd` was opened by this channel and not yet closed.
        let rc = unsafe { libc::close(self.write_fd) };
        if rc != 0 {
            return Err(XtmError::Close(XtmError::last_os_error()));
        }
        Ok(())
    }

    /// Closes the read end. Callers must only invoke this when the
    /// close-flag policy says the library owns this fd; a queue that leaves
    /// ownership with the caller never calls this.
    pub(crate) fn close_read(&mut self) -> Result<(), XtmError> {
        // Safety: `read_fd` was opened by this channel.
        let rc = unsafe { libc::close(self.read_fd) };
        if rc != 0 {
            return Err(XtmError::Close(XtmError::last_os_error()));
        }
        Ok(())
    }

    /// Full teardown of a channel this code still owns outright — used only
    /// to unwind a partially constructed [`crate::Queue`] on error, where no
    /// fd has yet been handed to a caller.
    pub(crate) fn teardown(mut self) {
        let _ = self.close_read();
        let _ = self.close_write();
    }
}

impl Drop for WakeChannel {
    fn drop(&mut self) {
        // Safety net: an explicitly-`close`d or caller-owned read fd is left
        // alone, but the write-end — ours alone whenever it is a distinct
        // descriptor — is not leaked if the queue is simply dropped.
        if !self.write_closed && !self.is_single_fd() {
            // Safety: `write_fd` was opened by this channel and `write_closed`
            // guards against a prior explicit close.
            unsafe {
                libc::close(self.write_fd);
            }
        }
    }
}

#[cfg(not(target_os = "linux"))]
fn set_nonblocking(fd: RawFd) -> Result<(), XtmError> {
    // Safety: `fd` is open and owned by the caller of this function.
    let flags = unsafe { libc::fcntl(fd, libc::F_GETFL, 0) };
    if flags < 0 {
        return Err(XtmError::SetNonBlocking(XtmError::last_os_error()));
    }
    // Safety: same as above.
    let rc = unsafe { libc::fcntl(fd, libc::F_SETFL, flags | libc::O_NONBLOCK) };
    if rc < 0 {
        return Err(XtmError::SetNonBlocking(XtmError::last_os_error()));
    }
    Ok(())
}

/// Drains a readiness fd: reads and discards bytes until `EAGAIN`/
/// `EWOULDBLOCK`, retrying `EINTR`. Exposed standalone so a caller that
/// polled `consumer_fd()`/`producer_fd()` itself (rather than going through
/// [`crate::Queue::invoke_funs_all`]) can re-arm the fd directly.
pub fn consume(fd: RawFd) -> Result<(), XtmError> {
    let mut buf = [0u8; CONSUME_BUF_LEN];
    loop {
        // Safety: `buf` is a valid, fully-owned `CONSUME_BUF_LEN`-byte
        // buffer; `fd` is the caller's to read from.
        let rc = unsafe { libc::read(fd, buf.as_mut_ptr().cast(), buf.len()) };
        if rc > 0 {
            continue;
        }
        if rc == 0 {
            return Ok(());
        }
        let err = io::Error::last_os_error();
        match err.raw_os_error() {
            Some(libc::EINTR) => continue,
            Some(libc::EAGAIN) | Some(libc::EWOULDBLOCK) => return Ok(()),
            _ => return Err(XtmError::Consume(err)),
        }
    }
}
