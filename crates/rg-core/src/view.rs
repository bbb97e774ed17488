//! Read-only access to the live buckets.

use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::buckets::{Buckets, HOURS_PER_DAY, MINUTES_PER_HOUR};
use crate::clock;
use crate::stats::{CollectorStats, StatsSnapshot};
use crate::types::BucketSize;

/// Cheap-to-clone handle onto the collector's shared state.
///
/// Every accessor copies under the read lock, and the collector applies a
/// whole cycle under the write lock, so a reader never sees a half-rolled
/// minute or a stale hour total next to a fresh minute.
#[derive(Debug, Clone)]
pub struct RainView {
    buckets: Arc<RwLock<Buckets>>,
    stats: Arc<CollectorStats>,
    bucket_size: BucketSize,
    started_at: DateTime<Utc>,
}

/// The root view: the last hour and day, oldest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RainSummary {
    /// Start of the current minute, ISO 8601 without zone.
    pub current: String,
    pub divider: i64,
    /// 60 minute counts ending at the current minute.
    pub hour: Vec<i64>,
    /// 24 hour totals ending at the current hour.
    pub day: Vec<i64>,
}

impl RainView {
    pub(crate) fn new(
        buckets: Arc<RwLock<Buckets>>,
        stats: Arc<CollectorStats>,
        bucket_size: BucketSize,
    ) -> Self {
        Self {
            buckets,
            stats,
            bucket_size,
            started_at: Utc::now(),
        }
    }

    #[must_use]
    pub const fn bucket_size(&self) -> BucketSize {
        self.bucket_size
    }

    #[must_use]
    pub const fn divider(&self) -> i64 {
        self.bucket_size.divider()
    }

    #[must_use]
    pub const fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn current_minute(&self) -> usize {
        clock::minute_of_hour(clock::now_secs())
    }

    #[must_use]
    pub fn current_hour(&self) -> usize {
        clock::hour_of_day(clock::now_secs())
    }

    /// Copy of both rings taken at once.
    #[must_use]
    pub fn snapshot(&self) -> Buckets {
        self.buckets
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    #[must_use]
    pub fn last_hour_buckets(&self) -> [i64; MINUTES_PER_HOUR] {
        *self.snapshot().minutes()
    }

    #[must_use]
    pub fn last_day_buckets(&self) -> [i64; HOURS_PER_DAY] {
        *self.snapshot().hours()
    }

    #[must_use]
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    #[must_use]
    pub fn summary(&self) -> RainSummary {
        self.summary_at(clock::now_secs())
    }

    /// Builds the root view as of `now`.
    #[must_use]
    pub fn summary_at(&self, now: i64) -> RainSummary {
        let now = clock::truncate_to_minute(now);
        let buckets = self.snapshot();
        RainSummary {
            current: clock::iso_timestamp(now),
            divider: self.divider(),
            hour: buckets.hour_history(clock::minute_of_hour(now)),
            day: buckets.day_history(clock::hour_of_day(now)),
        }
    }
}
