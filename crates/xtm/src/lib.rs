//! `xtm` — cross-thread messenger.
//!
//! A single-producer/single-consumer bounded queue built on a wait-free ring
//! buffer, paired with a kernel-backed, non-blocking readiness primitive
//! ("wake channel") so a producer thread can cheaply signal a consumer
//! thread sitting inside an arbitrary event loop (`select`, `poll`,
//! `epoll`, `kqueue`), and vice versa for backpressure.
//!
//! Two usage patterns share the same ring: function-dispatch
//! ([`Queue::push_fun`] / [`Queue::invoke_funs_all`]) and pointer-transfer
//! ([`Queue::push_ptr`] / [`Queue::pop_ptrs`]). A given [`Queue`] commits to
//! exactly one of the two for its lifetime.
//!
//! ```no_run
//! use xtm::{PushFlags, Queue, QueueFlags};
//!
//! let queue = Queue::new(64, QueueFlags::NONE)?;
//! let value: *mut () = std::ptr::null_mut();
//! queue.push_ptr(value, PushFlags::NONE);
//! queue.notify_consumer()?;
//! # Ok::<(), xtm::XtmError>(())
//! ```

mod backoff;
mod config;
mod error;
mod invariants;
mod metrics;
mod queue;
mod ring;
mod slot;
mod wake;

pub use backoff::Backoff;
pub use config::{CloseFlags, Config, PushFlags, QueueFlags, HIGH_THROUGHPUT_CONFIG, LOW_LATENCY_CONFIG};
pub use error::XtmError;
pub use metrics::{Metrics, MetricsSnapshot};
pub use queue::{ProbeStatus, PushOutcome, Queue};
pub use slot::QueueFn;
pub use wake::consume;
