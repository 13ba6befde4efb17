//! Insights - observability for the slotted queue.
//!
//! Unified tracing, zero-cost when the `tracing` feature is disabled.
//!
//! # Usage
//!
//! ```toml
//! slotq = { version = "0.1", features = ["tracing"] }
//! ```
//! ```rust,ignore
//! tracing_subscriber::fmt::init();
//! ```

/// Record a successful push (creates a trace span).
#[cfg(feature = "tracing")]
#[inline]
pub fn record_push_ok() {
    let _span = tracing::trace_span!("push_ok").entered();
}

#[cfg(not(feature = "tracing"))]
#[inline(always)]
pub fn record_push_ok() {}

/// Record a successful shift (creates a trace span).
#[cfg(feature = "tracing")]
#[inline]
pub fn record_shift_ok() {
    let _span = tracing::trace_span!("shift_ok").entered();
}

#[cfg(not(feature = "tracing"))]
#[inline(always)]
pub fn record_shift_ok() {}

/// Record a slot-lock contention event (`AGAIN`).
#[cfg(feature = "tracing")]
#[inline]
pub fn record_contention() {
    let _span = tracing::debug_span!("again").entered();
}

#[cfg(not(feature = "tracing"))]
#[inline(always)]
pub fn record_contention() {}

/// Record a deadline expiry.
#[cfg(feature = "tracing")]
#[inline]
pub fn record_timeout() {
    let _span = tracing::debug_span!("timed_out").entered();
}

#[cfg(not(feature = "tracing"))]
#[inline(always)]
pub fn record_timeout() {}

/// Record a transport poisoning event — always worth a warning regardless
/// of the configured log level, since it permanently disables a direction.
#[cfg(feature = "tracing")]
#[inline]
pub fn record_poisoned(reason: &str) {
    tracing::warn!(reason, "transport poisoned");
}

#[cfg(not(feature = "tracing"))]
#[inline(always)]
pub fn record_poisoned(_reason: &str) {}
