//! Metrics for a slotted queue instance.
//!
//! Lightweight relaxed counters for observability; always compiled in
//! (cheap enough that, like the teacher's own metrics module, it isn't
//! worth feature-gating).

use std::sync::atomic::{AtomicU64, Ordering};

/// Per-queue metrics counters. One lives inside each [`crate::Queue`].
#[derive(Default)]
pub struct Metrics {
    pub pushes_ok: AtomicU64,
    pub shifts_ok: AtomicU64,
    pub again_events: AtomicU64,
    pub timeouts: AtomicU64,
    pub full_rejections: AtomicU64,
    pub empty_rejections: AtomicU64,
    pub poison_events: AtomicU64,
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            pushes_ok: AtomicU64::new(0),
            shifts_ok: AtomicU64::new(0),
            again_events: AtomicU64::new(0),
            timeouts: AtomicU64::new(0),
            full_rejections: AtomicU64::new(0),
            empty_rejections: AtomicU64::new(0),
            poison_events: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn record_push_ok(&self) {
        self.pushes_ok.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_shift_ok(&self) {
        self.shifts_ok.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_again(&self) {
        self.again_events.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_timeout(&self) {
        self.timeouts.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_full(&self) {
        self.full_rejections.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_empty(&self) {
        self.empty_rejections.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_poison(&self) {
        self.poison_events.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            pushes_ok: self.pushes_ok.load(Ordering::Relaxed),
            shifts_ok: self.shifts_ok.load(Ordering::Relaxed),
            again_events: self.again_events.load(Ordering::Relaxed),
            timeouts: self.timeouts.load(Ordering::Relaxed),
            full_rejections: self.full_rejections.load(Ordering::Relaxed),
            empty_rejections: self.empty_rejections.load(Ordering::Relaxed),
            poison_events: self.poison_events.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsSnapshot {
    pub pushes_ok: u64,
    pub shifts_ok: u64,
    pub again_events: u64,
    pub timeouts: u64,
    pub full_rejections: u64,
    pub empty_rejections: u64,
    pub poison_events: u64,
}

impl std::fmt::Display for MetricsSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "push_ok={} shift_ok={} again={} timeout={} full={} empty={} poison={}",
            self.pushes_ok,
            self.shifts_ok,
            self.again_events,
            self.timeouts,
            self.full_rejections,
            self.empty_rejections,
            self.poison_events
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_each_event_kind() {
        let m = Metrics::new();
        m.record_push_ok();
        m.record_shift_ok();
        m.record_again();
        m.record_timeout();
        m.record_full();
        m.record_empty();
        m.record_poison();

        let s = m.snapshot();
        assert_eq!(s.pushes_ok, 1);
        assert_eq!(s.shifts_ok, 1);
        assert_eq!(s.again_events, 1);
        assert_eq!(s.timeouts, 1);
        assert_eq!(s.full_rejections, 1);
        assert_eq!(s.empty_rejections, 1);
        assert_eq!(s.poison_events, 1);
    }
}
