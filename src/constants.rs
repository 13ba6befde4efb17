//! Crate-wide constants.

/// Ring capacity used by [`crate::QueueBuilder`] when `capacity` is never
/// called. Chosen to be small enough for default use without surprising a
/// caller with a large allocation; must stay a power of two.
pub const DEFAULT_CAPACITY: usize = 1024;

/// The smallest capacity this crate accepts for MUTEX mode. Capacity 1
/// would force the historical mask-forced-to-1 degenerate case (see
/// `SPEC_FULL.md` Open Question 1); this crate rejects it outright instead.
pub const MIN_CAPACITY: usize = 2;
