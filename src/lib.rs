//! A bounded, fixed-capacity FIFO queue with two interchangeable
//! transports: a per-slot mutex/condvar ring (`Mode::Mutex`) and a
//! non-blocking OS pipe (`Mode::Pipe`).
//!
//! Both transports expose the same try/timed operation surface:
//!
//! - `push(payload, deadline)` — with no deadline, never blocks; with a
//!   deadline, may suspend until room appears or the deadline passes.
//! - `shift(deadline)` — the dual of `push`.
//! - `flush(callback)` — drains whatever is currently queued, intended for
//!   shutdown, not for interleaving with live producers/consumers.
//!
//! ```
//! use slotq::Queue;
//!
//! let queue: Queue<u32> = Queue::builder().capacity(4).mutex().build().unwrap();
//! queue.push(7, None).unwrap();
//! assert_eq!(queue.shift(None).unwrap(), 7);
//! ```
//!
//! The queue neither interprets nor copies payloads; it only ever moves
//! them. In PIPE mode each payload is boxed so that handing it across the
//! pipe is a single pointer-sized write.
//!
//! This crate is designed for single-producer/single-consumer use: nothing
//! prevents sharing a [`Queue`] behind an `Arc` across more threads, but
//! FIFO ordering and the `Again`/contention paths are only meaningful with
//! one producer thread and one consumer thread. See [`Queue`] for details.

pub mod constants;
pub mod error;
pub mod insights;
pub mod metrics;
mod queue;

pub use error::{ErrorCode, PushError, QueueError, ShiftError};
pub use metrics::MetricsSnapshot;
pub use queue::{Mode, Queue, QueueBuilder};
