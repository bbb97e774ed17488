//! Operational counters for the sampling loop.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Counters updated by the collector thread and read by request handlers.
#[derive(Debug, Default)]
pub struct CollectorStats {
    cycles: AtomicU64,
    tips: AtomicU64,
    flushed: AtomicU64,
    flush_failures: AtomicU64,
    overruns: AtomicU64,
}

/// Point-in-time copy of [`CollectorStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub cycles: u64,
    pub tips: u64,
    pub flushed: u64,
    pub flush_failures: u64,
    pub overruns: u64,
}

impl CollectorStats {
    pub(crate) fn record_cycle(&self) {
        self.cycles.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_tip(&self) {
        self.tips.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_flush(&self) {
        self.flushed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_flush_failure(&self) {
        self.flush_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_overrun(&self) {
        self.overruns.fetch_add(1, Ordering::Relaxed);
    }

    #[must_use]
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            cycles: self.cycles.load(Ordering::Relaxed),
            tips: self.tips.load(Ordering::Relaxed),
            flushed: self.flushed.load(Ordering::Relaxed),
            flush_failures: self.flush_failures.load(Ordering::Relaxed),
            overruns: self.overruns.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_at_zero() {
        assert_eq!(CollectorStats::default().snapshot(), StatsSnapshot::default());
    }

    #[test]
    fn snapshot_reflects_each_counter() {
        let stats = CollectorStats::default();
        stats.record_cycle();
        stats.record_cycle();
        stats.record_tip();
        stats.record_flush();
        stats.record_flush_failure();
        stats.record_overrun();
        stats.record_overrun();
        stats.record_overrun();

        assert_eq!(
            stats.snapshot(),
            StatsSnapshot {
                cycles: 2,
                tips: 1,
                flushed: 1,
                flush_failures: 1,
                overruns: 3,
            }
        );
    }

    #[test]
    fn snapshot_serializes_counter_names() {
        let json = serde_json::to_value(StatsSnapshot::default()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "cycles": 0,
                "tips": 0,
                "flushed": 0,
                "flush_failures": 0,
                "overruns": 0
            })
        );
    }
}
