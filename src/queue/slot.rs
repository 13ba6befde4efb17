//! A single ring cell: one payload slot guarded by its own mutex and
//! condition variable.
//!
//! This is the unit of locking described in spec.md §3/§4.1 — giving every
//! slot its own lock is what lets a producer blocked on slot W proceed
//! independently of a consumer draining slot R when R != W.

use std::time::Instant;

use parking_lot::{Condvar, Mutex};

/// Occupancy and wait-intent state for one ring cell. `producer_waiting`
/// and `consumer_waiting` are the explicit encoding of the slot state
/// machine's four states (EMPTY, EMPTY_WITH_CONSUMER, FULL,
/// FULL_WITH_PRODUCER); invariant I3 ties each flag to the dual of
/// `payload`'s occupancy.
pub(crate) struct SlotState<T> {
    payload: Option<T>,
    producer_waiting: bool,
    consumer_waiting: bool,
}

impl<T> Default for SlotState<T> {
    fn default() -> Self {
        Self {
            payload: None,
            producer_waiting: false,
            consumer_waiting: false,
        }
    }
}

pub(crate) struct Slot<T> {
    lock: Mutex<SlotState<T>>,
    rendezvous: Condvar,
}

impl<T> Default for Slot<T> {
    fn default() -> Self {
        Self {
            lock: Mutex::new(SlotState::default()),
            rendezvous: Condvar::new(),
        }
    }
}

/// Result of attempting to acquire a slot's lock without blocking on it.
/// The slot lock itself is never waited on — §4.1: "producers never block
/// on the slot lock itself; blocking happens only on the rendezvous
/// condition."
pub(crate) enum LockOutcome<'a, T> {
    Acquired(parking_lot::MutexGuard<'a, SlotState<T>>),
    Contended,
}

impl<T> Slot<T> {
    pub(crate) fn try_enter(&self) -> LockOutcome<'_, T> {
        match self.lock.try_lock() {
            Some(guard) => LockOutcome::Acquired(guard),
            None => LockOutcome::Contended,
        }
    }

    /// Drains this slot's payload if occupied, without blocking. Used by
    /// `flush`, which only ever takes the lock transiently (§4.4).
    pub(crate) fn take_if_occupied(&self) -> Option<T> {
        let mut guard = self.lock.lock();
        guard.payload.take()
    }
}

/// Drives the push side of the slot state machine.
///
/// `guard` is the already-acquired slot lock. On success the payload has
/// been stored and the slot is FULL; the caller is responsible for
/// advancing the write cursor. Returns `Err(PushOutcome)` for every path
/// that did not store `payload` — `Full`, `TimedOut`, or `AlreadyWaiting`
/// (the INVAL re-entry guard from §4.1).
pub(crate) enum PushOutcome<T> {
    Full(T),
    TimedOut(T),
    AlreadyWaiting(T),
}

pub(crate) fn slot_push<T>(
    slot: &Slot<T>,
    mut guard: parking_lot::MutexGuard<'_, SlotState<T>>,
    payload: T,
    deadline: Option<Instant>,
) -> Result<(), PushOutcome<T>> {
    if let Some(deadline) = deadline {
        while guard.payload.is_some() {
            if guard.producer_waiting {
                return Err(PushOutcome::AlreadyWaiting(payload));
            }
            if guard.consumer_waiting {
                slot.rendezvous.notify_one();
            }
            guard.producer_waiting = true;
            let timed_out = slot.rendezvous.wait_until(&mut guard, deadline).timed_out();
            guard.producer_waiting = false;
            if timed_out && guard.payload.is_some() {
                return Err(PushOutcome::TimedOut(payload));
            }
        }
    } else if guard.payload.is_some() {
        return Err(PushOutcome::Full(payload));
    }

    let consumer_was_waiting = guard.consumer_waiting;
    guard.payload = Some(payload);
    drop(guard);
    if consumer_was_waiting {
        slot.rendezvous.notify_one();
    }
    Ok(())
}

pub(crate) enum ShiftOutcome {
    Empty,
    TimedOut,
    AlreadyWaiting,
}

pub(crate) fn slot_shift<T>(
    slot: &Slot<T>,
    mut guard: parking_lot::MutexGuard<'_, SlotState<T>>,
    deadline: Option<Instant>,
) -> Result<T, ShiftOutcome> {
    if let Some(deadline) = deadline {
        while guard.payload.is_none() {
            if guard.consumer_waiting {
                return Err(ShiftOutcome::AlreadyWaiting);
            }
            if guard.producer_waiting {
                slot.rendezvous.notify_one();
            }
            guard.consumer_waiting = true;
            let timed_out = slot.rendezvous.wait_until(&mut guard, deadline).timed_out();
            guard.consumer_waiting = false;
            if timed_out && guard.payload.is_none() {
                return Err(ShiftOutcome::TimedOut);
            }
        }
    } else if guard.payload.is_none() {
        return Err(ShiftOutcome::Empty);
    }

    let producer_was_waiting = guard.producer_waiting;
    let payload = guard.payload.take().expect("checked occupied above");
    drop(guard);
    if producer_was_waiting {
        slot.rendezvous.notify_one();
    }
    Ok(payload)
}
