//! Error types for the slotted queue.
//!
//! The C reference threads a single `int` status code (plus out-of-band
//! `errno`) through every call. This crate keeps the same taxonomy of
//! stable identifiers (`ErrorCode`) for callers that want to match on it
//! directly, but surfaces failures as ordinary typed errors: `QueueError`
//! for lifecycle calls, and `PushError<T>` / `ShiftError` for the data-path
//! operations, since a failed `push` must hand the caller's payload back
//! rather than silently drop it.

use std::io;

use thiserror::Error;

/// Stable identifiers mirroring the specification's error taxonomy.
///
/// `Ok` is never constructed by this crate as an error value — operations
/// signal success with `Ok(())`/`Ok(T)` — it exists so this enum alone
/// documents the full set of outcomes a caller may need to branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    Ok,
    Error,
    Errno,
    NoMem,
    Inval,
    TimedOut,
    Busy,
    Again,
    Empty,
    Full,
}

/// Returns a human-readable description of `code`, or `None` for `Ok`.
pub fn strerror(code: ErrorCode) -> Option<&'static str> {
    match code {
        ErrorCode::Ok => None,
        ErrorCode::Error => Some("protocol violation, transport poisoned"),
        ErrorCode::Errno => Some("operating system error"),
        ErrorCode::NoMem => Some("allocation failed"),
        ErrorCode::Inval => Some("invalid argument or lifecycle violation"),
        ErrorCode::TimedOut => Some("deadline exceeded"),
        ErrorCode::Busy => Some("queue already initialized"),
        ErrorCode::Again => Some("slot lock contended, retry"),
        ErrorCode::Empty => Some("queue empty"),
        ErrorCode::Full => Some("queue full"),
    }
}

/// Errors from the lifecycle surface: `configure_mode`, `configure_size`,
/// `init`, `destroy`.
#[derive(Error, Debug)]
pub enum QueueError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("queue already initialized")]
    Busy,

    #[error("allocation failed while initializing queue")]
    NoMemory,

    #[error("operating system error: {0}")]
    Os(#[from] io::Error),
}

impl QueueError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::InvalidConfig(message.into())
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            QueueError::InvalidConfig(_) => ErrorCode::Inval,
            QueueError::Busy => ErrorCode::Busy,
            QueueError::NoMemory => ErrorCode::NoMem,
            QueueError::Os(_) => ErrorCode::Errno,
        }
    }
}

/// Outcome of a `push`. Every variant that did not hand the payload off to
/// the queue returns it, mirroring `std::sync::mpsc::TrySendError`.
#[derive(Error, Debug)]
pub enum PushError<T> {
    #[error("queue full")]
    Full(T),

    #[error("slot lock contended")]
    Again(T),

    #[error("deadline exceeded")]
    TimedOut(T),

    #[error("invalid argument or lifecycle violation")]
    Invalid(T),

    #[error("transport poisoned by a prior protocol violation")]
    Poisoned(T),

    /// A partial pipe transfer was observed during this call. The transport
    /// is now poisoned; the in-flight payload could not be safely recovered.
    #[error("partial transfer corrupted the transport")]
    Corrupted,

    #[error("operating system error: {1}")]
    Os(T, #[source] io::Error),
}

impl<T> PushError<T> {
    pub fn code(&self) -> ErrorCode {
        match self {
            PushError::Full(_) => ErrorCode::Full,
            PushError::Again(_) => ErrorCode::Again,
            PushError::TimedOut(_) => ErrorCode::TimedOut,
            PushError::Invalid(_) => ErrorCode::Inval,
            PushError::Poisoned(_) => ErrorCode::Error,
            PushError::Corrupted => ErrorCode::Error,
            PushError::Os(..) => ErrorCode::Errno,
        }
    }

    /// Recovers the payload, if this variant still carries one.
    pub fn into_payload(self) -> Option<T> {
        match self {
            PushError::Full(p)
            | PushError::Again(p)
            | PushError::TimedOut(p)
            | PushError::Invalid(p)
            | PushError::Poisoned(p)
            | PushError::Os(p, _) => Some(p),
            PushError::Corrupted => None,
        }
    }
}

/// Outcome of a `shift`. Unlike `push`, there is no caller-owned payload to
/// hand back on failure.
#[derive(Error, Debug)]
pub enum ShiftError {
    #[error("queue empty")]
    Empty,

    #[error("slot lock contended")]
    Again,

    #[error("deadline exceeded")]
    TimedOut,

    #[error("invalid argument or lifecycle violation")]
    Invalid,

    #[error("transport poisoned by a prior protocol violation")]
    Poisoned,

    #[error("partial transfer corrupted the transport")]
    Corrupted,

    #[error("operating system error: {0}")]
    Os(#[source] io::Error),
}

impl ShiftError {
    pub fn code(&self) -> ErrorCode {
        match self {
            ShiftError::Empty => ErrorCode::Empty,
            ShiftError::Again => ErrorCode::Again,
            ShiftError::TimedOut => ErrorCode::TimedOut,
            ShiftError::Invalid => ErrorCode::Inval,
            ShiftError::Poisoned | ShiftError::Corrupted => ErrorCode::Error,
            ShiftError::Os(_) => ErrorCode::Errno,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strerror_maps_ok_to_none() {
        assert!(strerror(ErrorCode::Ok).is_none());
    }

    #[test]
    fn strerror_covers_every_other_code() {
        for code in [
            ErrorCode::Error,
            ErrorCode::Errno,
            ErrorCode::NoMem,
            ErrorCode::Inval,
            ErrorCode::TimedOut,
            ErrorCode::Busy,
            ErrorCode::Again,
            ErrorCode::Empty,
            ErrorCode::Full,
        ] {
            assert!(strerror(code).is_some());
        }
    }

    #[test]
    fn push_error_returns_payload() {
        let err: PushError<u32> = PushError::Full(7);
        assert_eq!(err.code(), ErrorCode::Full);
        assert_eq!(err.into_payload(), Some(7));
    }

    #[test]
    fn push_error_corrupted_has_no_payload() {
        let err: PushError<u32> = PushError::Corrupted;
        assert_eq!(err.into_payload(), None);
    }
}
