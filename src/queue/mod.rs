//! The slotted queue's two transports and the façade that dispatches
//! between them.
//!
//! - `slot` — a single ring cell guarded by its own mutex/condvar.
//! - `mutex_ring` — the MUTEX-mode transport built from an array of slots.
//! - `pipe_transport` — the PIPE-mode transport built on a kernel pipe.

mod mutex_ring;
mod pipe_transport;
mod slot;

use std::time::Instant;

use parking_lot::RwLock;

use crate::constants::{DEFAULT_CAPACITY, MIN_CAPACITY};
use crate::error::{PushError, QueueError, ShiftError};
use crate::metrics::{Metrics, MetricsSnapshot};
use mutex_ring::MutexRing;
use pipe_transport::PipeTransport;

/// Selects which backend carries payloads between producer and consumer.
/// Immutable once `init` succeeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Per-slot mutex + condvar ring, sized by `configure_size`.
    Mutex,
    /// A non-blocking OS pipe; `configure_size` is accepted but ignored.
    Pipe,
}

enum Transport<T> {
    Mutex(MutexRing<T>),
    Pipe(PipeTransport<T>),
}

enum State<T> {
    Unconfigured { mode: Option<Mode>, capacity: usize },
    Initialized(Transport<T>),
    Destroyed,
}

/// A bounded FIFO queue with a pluggable transport, following the
/// configure → init → use → destroy lifecycle.
///
/// `Queue` is safe to share behind an `Arc` across threads, but `push` and
/// `shift` are only meaningful with a single producer thread and a single
/// consumer thread — see `MutexRing`'s and `PipeTransport`'s docs for what
/// breaks under multiple producers or consumers.
pub struct Queue<T> {
    state: RwLock<State<T>>,
    metrics: Metrics,
}

impl<T> Queue<T> {
    /// A fresh, unconfigured handle. Call `configure_mode`, optionally
    /// `configure_size`, then `init` before `push`/`shift`/`flush`.
    pub fn new() -> Self {
        Self {
            state: RwLock::new(State::Unconfigured {
                mode: None,
                capacity: DEFAULT_CAPACITY,
            }),
            metrics: Metrics::new(),
        }
    }

    /// Ergonomic one-shot construction: `Queue::builder().mutex().capacity(256).build()`.
    pub fn builder() -> QueueBuilder<T> {
        QueueBuilder::new()
    }

    /// Sets the transport. Permitted only before `init`; returns `Busy`
    /// once the queue has been initialized (mode is immutable afterward)
    /// or destroyed.
    pub fn configure_mode(&self, mode: Mode) -> Result<(), QueueError> {
        let mut state = self.state.write();
        match &mut *state {
            State::Unconfigured { mode: slot, .. } => {
                *slot = Some(mode);
                Ok(())
            }
            State::Initialized(_) | State::Destroyed => Err(QueueError::Busy),
        }
    }

    /// Sets the MUTEX-mode ring capacity. Ignored by PIPE mode but still
    /// validated and accepted, so callers don't need to branch on mode
    /// before configuring size. Permitted only before `init`.
    pub fn configure_size(&self, capacity: usize) -> Result<(), QueueError> {
        if capacity < MIN_CAPACITY || !capacity.is_power_of_two() {
            return Err(QueueError::config(format!(
                "capacity must be a power of two >= {MIN_CAPACITY}, got {capacity}"
            )));
        }
        let mut state = self.state.write();
        match &mut *state {
            State::Unconfigured { capacity: slot, .. } => {
                *slot = capacity;
                Ok(())
            }
            State::Initialized(_) | State::Destroyed => Err(QueueError::Busy),
        }
    }

    /// Allocates the slot array (MUTEX) or opens the pipe (PIPE). Requires
    /// a mode to have been configured first.
    pub fn init(&self) -> Result<(), QueueError> {
        let mut state = self.state.write();
        match &*state {
            State::Unconfigured { mode, capacity } => {
                let mode = mode.ok_or_else(|| QueueError::config("mode not configured"))?;
                let transport = match mode {
                    Mode::Mutex => Transport::Mutex(MutexRing::new(*capacity)),
                    Mode::Pipe => Transport::Pipe(PipeTransport::new()?),
                };
                *state = State::Initialized(transport);
                Ok(())
            }
            State::Initialized(_) => Err(QueueError::Busy),
            State::Destroyed => Err(QueueError::config("queue already destroyed")),
        }
    }

    /// Releases transport resources (drops the slot array, closes the
    /// pipe). Does not drain payloads — call `flush` first if any may
    /// remain. Idempotent: destroying an already-destroyed or never
    /// initialized handle succeeds.
    pub fn destroy(&self) -> Result<(), QueueError> {
        let mut state = self.state.write();
        *state = State::Destroyed;
        Ok(())
    }

    /// Attempts to enqueue `payload`. With `deadline: None` this never
    /// blocks, returning `PushError::Full`/`Again` immediately. With a
    /// deadline it may suspend until the deadline passes or room appears.
    pub fn push(&self, payload: T, deadline: Option<Instant>) -> Result<(), PushError<T>> {
        let state = self.state.read();
        let result = match &*state {
            State::Initialized(Transport::Mutex(ring)) => ring.push(payload, deadline),
            State::Initialized(Transport::Pipe(pipe)) => pipe.push(payload, deadline),
            State::Unconfigured { .. } | State::Destroyed => Err(PushError::Invalid(payload)),
        };
        record_push(&self.metrics, &result);
        result
    }

    /// Attempts to dequeue one payload. With `deadline: None` this never
    /// blocks, returning `ShiftError::Empty`/`Again` immediately. With a
    /// deadline it may suspend until the deadline passes or a payload
    /// appears.
    pub fn shift(&self, deadline: Option<Instant>) -> Result<T, ShiftError> {
        let state = self.state.read();
        let result = match &*state {
            State::Initialized(Transport::Mutex(ring)) => ring.shift(deadline),
            State::Initialized(Transport::Pipe(pipe)) => pipe.shift(deadline),
            State::Unconfigured { .. } | State::Destroyed => Err(ShiftError::Invalid),
        };
        record_shift(&self.metrics, &result);
        result
    }

    /// Drains whatever payloads are currently in the queue through
    /// `callback`, then leaves it empty. Safe and a no-op before `init` or
    /// after `destroy`. See `MutexRing::flush` for why this should only be
    /// called with no producer/consumer concurrently active.
    pub fn flush(&self, callback: impl FnMut(T)) -> Result<(), ShiftError> {
        let state = self.state.read();
        match &*state {
            State::Initialized(Transport::Mutex(ring)) => {
                ring.flush(callback);
                Ok(())
            }
            State::Initialized(Transport::Pipe(pipe)) => pipe.flush(callback),
            State::Unconfigured { .. } | State::Destroyed => Ok(()),
        }
    }

    /// The configured ring capacity, if running in MUTEX mode and
    /// initialized. `None` in PIPE mode or before `init`.
    pub fn capacity(&self) -> Option<usize> {
        match &*self.state.read() {
            State::Initialized(Transport::Mutex(ring)) => Some(ring.capacity()),
            _ => None,
        }
    }

    /// The configured or running transport mode. `None` before a mode has
    /// been set with `configure_mode` (or after `destroy`).
    pub fn mode(&self) -> Option<Mode> {
        match &*self.state.read() {
            State::Unconfigured { mode, .. } => *mode,
            State::Initialized(Transport::Mutex(_)) => Some(Mode::Mutex),
            State::Initialized(Transport::Pipe(_)) => Some(Mode::Pipe),
            State::Destroyed => None,
        }
    }

    /// A snapshot of this queue's push/shift/contention counters.
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}

impl<T> Default for Queue<T> {
    fn default() -> Self {
        Self::new()
    }
}

fn record_push<T>(metrics: &Metrics, result: &Result<(), PushError<T>>) {
    match result {
        Ok(()) => metrics.record_push_ok(),
        Err(PushError::Full(_)) => metrics.record_full(),
        Err(PushError::Again(_)) => metrics.record_again(),
        Err(PushError::TimedOut(_)) => metrics.record_timeout(),
        Err(PushError::Poisoned(_)) | Err(PushError::Corrupted) => metrics.record_poison(),
        Err(PushError::Invalid(_)) | Err(PushError::Os(..)) => {}
    }
}

fn record_shift<T>(metrics: &Metrics, result: &Result<T, ShiftError>) {
    match result {
        Ok(_) => metrics.record_shift_ok(),
        Err(ShiftError::Empty) => metrics.record_empty(),
        Err(ShiftError::Again) => metrics.record_again(),
        Err(ShiftError::TimedOut) => metrics.record_timeout(),
        Err(ShiftError::Poisoned) | Err(ShiftError::Corrupted) => metrics.record_poison(),
        Err(ShiftError::Invalid) | Err(ShiftError::Os(_)) => {}
    }
}

/// Builder for the common case of configuring and initializing a queue in
/// one call: `Queue::builder().capacity(256).mutex().build()`.
pub struct QueueBuilder<T> {
    mode: Mode,
    capacity: usize,
    _marker: std::marker::PhantomData<T>,
}

impl<T> QueueBuilder<T> {
    pub fn new() -> Self {
        Self {
            mode: Mode::Mutex,
            capacity: DEFAULT_CAPACITY,
            _marker: std::marker::PhantomData,
        }
    }

    /// Selects the MUTEX-mode ring transport. Default.
    pub fn mutex(mut self) -> Self {
        self.mode = Mode::Mutex;
        self
    }

    /// Selects the PIPE transport.
    pub fn pipe(mut self) -> Self {
        self.mode = Mode::Pipe;
        self
    }

    /// Sets the MUTEX-mode ring capacity; ignored in PIPE mode.
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn build(self) -> Result<Queue<T>, QueueError> {
        let queue = Queue::new();
        queue.configure_mode(self.mode)?;
        queue.configure_size(self.capacity)?;
        queue.init()?;
        Ok(queue)
    }
}

impl<T> Default for QueueBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn builder_produces_a_ready_to_use_mutex_queue() {
        let queue: Queue<u32> = Queue::builder().capacity(4).mutex().build().unwrap();
        queue.push(1, None).unwrap();
        assert_eq!(queue.shift(None).unwrap(), 1);
    }

    #[test]
    fn configure_size_rejects_non_power_of_two() {
        let queue: Queue<u32> = Queue::new();
        match queue.configure_size(3) {
            Err(QueueError::InvalidConfig(_)) => {}
            _ => panic!("expected InvalidConfig"),
        }
    }

    #[test]
    fn configure_size_rejects_capacity_one() {
        let queue: Queue<u32> = Queue::new();
        match queue.configure_size(1) {
            Err(QueueError::InvalidConfig(_)) => {}
            _ => panic!("expected InvalidConfig"),
        }
    }

    #[test]
    fn configure_mode_is_busy_after_init() {
        let queue: Queue<u32> = Queue::new();
        queue.configure_mode(Mode::Mutex).unwrap();
        queue.configure_size(2).unwrap();
        queue.init().unwrap();
        match queue.configure_mode(Mode::Pipe) {
            Err(QueueError::Busy) => {}
            _ => panic!("expected Busy"),
        }
    }

    #[test]
    fn configure_size_is_busy_after_init() {
        let queue: Queue<u32> = Queue::new();
        queue.configure_mode(Mode::Mutex).unwrap();
        queue.configure_size(2).unwrap();
        queue.init().unwrap();
        match queue.configure_size(4) {
            Err(QueueError::Busy) => {}
            _ => panic!("expected Busy"),
        }
    }

    #[test]
    fn init_without_mode_is_invalid() {
        let queue: Queue<u32> = Queue::new();
        match queue.init() {
            Err(QueueError::InvalidConfig(_)) => {}
            _ => panic!("expected InvalidConfig"),
        }
    }

    #[test]
    fn push_before_init_returns_invalid() {
        let queue: Queue<u32> = Queue::new();
        match queue.push(1, None) {
            Err(PushError::Invalid(1)) => {}
            _ => panic!("expected Invalid"),
        }
    }

    #[test]
    fn destroy_is_idempotent_and_flush_after_destroy_is_a_no_op() {
        let queue: Queue<u32> = Queue::builder().capacity(2).mutex().build().unwrap();
        queue.push(1, None).unwrap();
        queue.destroy().unwrap();
        queue.destroy().unwrap();

        let mut drained = Vec::new();
        queue.flush(|v| drained.push(v)).unwrap();
        assert!(drained.is_empty());
    }

    #[test]
    fn flush_before_init_is_a_no_op() {
        let queue: Queue<u32> = Queue::new();
        let mut drained = Vec::new();
        queue.flush(|v| drained.push(v)).unwrap();
        assert!(drained.is_empty());
    }

    #[test]
    fn mode_reflects_configuration_and_clears_on_destroy() {
        let queue: Queue<u32> = Queue::new();
        assert_eq!(queue.mode(), None);

        queue.configure_mode(Mode::Pipe).unwrap();
        assert_eq!(queue.mode(), Some(Mode::Pipe));

        queue.init().unwrap();
        assert_eq!(queue.mode(), Some(Mode::Pipe));

        queue.destroy().unwrap();
        assert_eq!(queue.mode(), None);
    }

    #[test]
    fn pipe_mode_fill_then_drain_round_trips() {
        let queue: Queue<u64> = Queue::builder().pipe().build().unwrap();
        for v in [1, 2, 3] {
            queue.push(v, None).unwrap();
        }
        for expected in [1, 2, 3] {
            assert_eq!(queue.shift(None).unwrap(), expected);
        }
        match queue.shift(None) {
            Err(ShiftError::Again) => {}
            _ => panic!("expected Again on empty pipe"),
        }
    }

    #[test]
    fn flush_on_shutdown_collects_slot_order_not_push_order() {
        let queue: Queue<u32> = Queue::builder().capacity(4).mutex().build().unwrap();
        for v in [10, 20, 30, 40] {
            queue.push(v, None).unwrap();
        }
        // Drain slot 0 and push once more so the write cursor wraps back
        // onto index 0 ahead of slots 1-3 — slot-index order then diverges
        // from push order, which a push-order-emitting flush would miss.
        assert_eq!(queue.shift(None).unwrap(), 10);
        queue.push(50, None).unwrap();

        let mut drained = Vec::new();
        queue.flush(|v| drained.push(v)).unwrap();
        assert_eq!(drained, vec![50, 20, 30, 40]);

        match queue.shift(None) {
            Err(ShiftError::Empty) => {}
            _ => panic!("expected Empty after flush"),
        }
    }

    #[test]
    fn timed_shift_respects_absolute_deadline() {
        let queue: Queue<u32> = Queue::builder().capacity(2).mutex().build().unwrap();
        let deadline = Instant::now() + Duration::from_millis(20);
        match queue.shift(Some(deadline)) {
            Err(ShiftError::TimedOut) => {}
            _ => panic!("expected TimedOut"),
        }
    }
}
