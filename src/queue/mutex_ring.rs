//! MUTEX-mode transport: a power-of-two ring of independently locked slots.
//!
//! Cursors are plain `usize`, not atomics — per spec §5, correctness relies
//! on write_cursor having exactly one owner (the producer) and read_cursor
//! having exactly one owner (the consumer), never on cursor atomicity
//! itself. Sharing a `MutexRing` across more than one producer or consumer
//! thread compiles but is outside the design's guarantees (see `SPEC_FULL.md`
//! Open Question resolution 3).

use std::cell::UnsafeCell;
use std::time::Instant;

use crate::error::{PushError, ShiftError};
use crate::queue::slot::{slot_push, slot_shift, LockOutcome, PushOutcome, Slot, ShiftOutcome};

/// A single producer's and single consumer's view of their respective
/// cursor. `UnsafeCell` rather than `Cell` because `push`/`shift` take `&self`
/// (the queue façade is shared behind the same reference on both sides);
/// the single-owner discipline is a documented contract, not one this type
/// enforces.
struct Cursor(UnsafeCell<usize>);

// SAFETY: advanced only by the thread that owns the producer or consumer
// role for this ring, per the single-producer/single-consumer contract
// documented on `MutexRing`.
unsafe impl Sync for Cursor {}

impl Cursor {
    fn new() -> Self {
        Self(UnsafeCell::new(0))
    }

    #[allow(clippy::mut_from_ref)]
    unsafe fn get(&self) -> usize {
        *self.0.get()
    }

    #[allow(clippy::mut_from_ref)]
    unsafe fn set(&self, value: usize) {
        *self.0.get() = value;
    }
}

pub(crate) struct MutexRing<T> {
    slots: Box<[Slot<T>]>,
    mask: usize,
    write_cursor: Cursor,
    read_cursor: Cursor,
}

impl<T> MutexRing<T> {
    /// `capacity` must already be validated as a power of two ≥
    /// `crate::constants::MIN_CAPACITY` by the caller (the queue façade).
    pub(crate) fn new(capacity: usize) -> Self {
        debug_assert!(capacity.is_power_of_two());
        let mut slots = Vec::with_capacity(capacity);
        slots.resize_with(capacity, Slot::default);
        Self {
            slots: slots.into_boxed_slice(),
            mask: capacity - 1,
            write_cursor: Cursor::new(),
            read_cursor: Cursor::new(),
        }
    }

    pub(crate) fn capacity(&self) -> usize {
        self.mask + 1
    }

    /// §4.1 push: non-blocking slot-lock acquisition, `AGAIN` on contention,
    /// otherwise the slot's own push state machine. Advances `write_cursor`
    /// only on success.
    pub(crate) fn push(&self, payload: T, deadline: Option<Instant>) -> Result<(), PushError<T>> {
        // SAFETY: single-producer contract; see `Cursor`.
        let index = unsafe { self.write_cursor.get() } & self.mask;
        let slot = &self.slots[index];

        let guard = match slot.try_enter() {
            LockOutcome::Acquired(guard) => guard,
            LockOutcome::Contended => {
                crate::insights::record_contention();
                return Err(PushError::Again(payload));
            }
        };

        match slot_push(slot, guard, payload, deadline) {
            Ok(()) => {
                // SAFETY: single-producer contract.
                unsafe { self.write_cursor.set(index.wrapping_add(1)) };
                crate::insights::record_push_ok();
                Ok(())
            }
            Err(PushOutcome::Full(payload)) => Err(PushError::Full(payload)),
            Err(PushOutcome::TimedOut(payload)) => {
                crate::insights::record_timeout();
                Err(PushError::TimedOut(payload))
            }
            Err(PushOutcome::AlreadyWaiting(payload)) => Err(PushError::Invalid(payload)),
        }
    }

    /// §4.1 shift: the symmetric dual of `push`, operating on
    /// slot[`read_cursor`].
    pub(crate) fn shift(&self, deadline: Option<Instant>) -> Result<T, ShiftError> {
        // SAFETY: single-consumer contract; see `Cursor`.
        let index = unsafe { self.read_cursor.get() } & self.mask;
        let slot = &self.slots[index];

        let guard = match slot.try_enter() {
            LockOutcome::Acquired(guard) => guard,
            LockOutcome::Contended => {
                crate::insights::record_contention();
                return Err(ShiftError::Again);
            }
        };

        match slot_shift(slot, guard, deadline) {
            Ok(payload) => {
                // SAFETY: single-consumer contract.
                unsafe { self.read_cursor.set(index.wrapping_add(1)) };
                crate::insights::record_shift_ok();
                Ok(payload)
            }
            Err(ShiftOutcome::Empty) => Err(ShiftError::Empty),
            Err(ShiftOutcome::TimedOut) => {
                crate::insights::record_timeout();
                Err(ShiftError::TimedOut)
            }
            Err(ShiftOutcome::AlreadyWaiting) => Err(ShiftError::Invalid),
        }
    }

    /// §4.4: walks the slot array in index order (not push order), handing
    /// each occupied payload to `callback` and clearing the slot. Does not
    /// touch either cursor — the caller is responsible for only flushing
    /// when no producer/consumer is concurrently active.
    pub(crate) fn flush(&self, mut callback: impl FnMut(T)) {
        for slot in self.slots.iter() {
            if let Some(payload) = slot.take_if_occupied() {
                callback(payload);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn fill_then_drain_in_order() {
        let ring: MutexRing<u32> = MutexRing::new(4);
        for v in [1, 2, 3, 4] {
            ring.push(v, None).expect("room for four");
        }
        match ring.push(5, None) {
            Err(PushError::Full(5)) => {}
            _ => panic!("expected Full"),
        }

        for expected in [1, 2, 3, 4] {
            assert_eq!(ring.shift(None).unwrap(), expected);
        }
        match ring.shift(None) {
            Err(ShiftError::Empty) => {}
            _ => panic!("expected Empty"),
        }
    }

    #[test]
    fn timed_wait_unblocks_then_times_out() {
        let ring: MutexRing<u32> = MutexRing::new(2);
        ring.push(0xAA, None).unwrap();

        let value = ring
            .shift(Some(Instant::now() + Duration::from_secs(1)))
            .expect("producer already filled the slot");
        assert_eq!(value, 0xAA);

        match ring.shift(Some(Instant::now() + Duration::from_millis(10))) {
            Err(ShiftError::TimedOut) => {}
            other => panic!("expected TimedOut, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn flush_drains_in_slot_index_order_not_push_order() {
        let ring: MutexRing<u32> = MutexRing::new(4);
        for v in [10, 20, 30, 40] {
            ring.push(v, None).unwrap();
        }
        // Desync push order from slot-index order: draining slot 0 and
        // pushing once more wraps the write cursor back onto index 0, so
        // the most recently pushed value (50) now occupies the lowest
        // index while 20/30/40 — pushed before it — sit at higher indices.
        assert_eq!(ring.shift(None).unwrap(), 10);
        ring.push(50, None).unwrap();

        let mut drained = Vec::new();
        ring.flush(|payload| drained.push(payload));
        assert_eq!(drained, vec![50, 20, 30, 40], "flush must walk slot index order, not push order");

        match ring.shift(None) {
            Err(ShiftError::Empty) => {}
            _ => panic!("expected Empty after flush"),
        }
    }

    #[test]
    fn concurrent_timed_pushes_on_a_full_ring_second_producer_gets_invalid() {
        let ring = Arc::new(MutexRing::<u32>::new(2));
        ring.push(1, None).unwrap();
        ring.push(2, None).unwrap();
        // The ring is now full and neither thread below ever succeeds, so
        // neither ever advances `write_cursor` — both target the same slot,
        // reproducing two producers racing the same slot's re-entry guard
        // (spec.md §4.1's INVAL re-entry check at slot.rs's `AlreadyWaiting`).

        let first_ring = Arc::clone(&ring);
        let first = thread::spawn(move || {
            let deadline = Instant::now() + Duration::from_millis(200);
            first_ring.push(3, Some(deadline))
        });

        thread::sleep(Duration::from_millis(50));

        let deadline = Instant::now() + Duration::from_millis(200);
        match ring.push(4, Some(deadline)) {
            Err(PushError::Invalid(payload)) => assert_eq!(payload, 4),
            _ => panic!("expected Invalid from the re-entry guard"),
        }

        match first.join().unwrap() {
            Err(PushError::TimedOut(payload)) => assert_eq!(payload, 3),
            _ => panic!("expected the first waiter to time out"),
        }
    }

    #[test]
    fn concurrent_producer_consumer_preserve_order() {
        let ring = Arc::new(MutexRing::<u64>::new(2));
        let producer_ring = Arc::clone(&ring);

        let producer = thread::spawn(move || {
            for i in 0..100_000u64 {
                let deadline = Instant::now() + Duration::from_secs(5);
                producer_ring.push(i, Some(deadline)).expect("never times out in test");
            }
        });

        for expected in 0..100_000u64 {
            let deadline = Instant::now() + Duration::from_secs(5);
            let got = ring.shift(Some(deadline)).expect("never times out in test");
            assert_eq!(got, expected);
        }

        producer.join().unwrap();
    }
}
