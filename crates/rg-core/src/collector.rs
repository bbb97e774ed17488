//! The sampling loop.
//!
//! # Cycle
//!
//! Each cycle, at a fixed cadence:
//!
//! 1. Truncate the wall clock to the minute and derive the minute-of-hour.
//! 2. Read the sensor level.
//! 3. On a new minute, queue the finished minute for storage (if it saw any
//!    tips) and clear the slot for the new minute.
//! 4. Count a tip on a falling edge (high to low). The gauge holds its contact
//!    closed for a short pulse per tip, so only the release is counted.
//! 5. Recompute the current hour's total from the minutes before this one.
//!
//! Steps 3 to 5 run under one write lock. The finished minute is written to
//! the store after the lock is released. A failed write is logged and the
//! minute is dropped; it is never retried.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, error, info, warn};

use crate::buckets::Buckets;
use crate::clock::{self, SECONDS_PER_DAY, SECONDS_PER_HOUR, SECONDS_PER_MINUTE};
use crate::gpio::DigitalInput;
use crate::stats::CollectorStats;
use crate::types::{BucketSize, HourTotal, RainRecord};
use crate::view::RainView;

/// Durable storage for finished minutes.
pub trait RainStore {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Appends a finished minute. Fails on a duplicate timestamp.
    fn insert_rain(&mut self, record: &RainRecord) -> Result<(), Self::Error>;

    /// Rows with `timestamp > after`, oldest first.
    fn rain_since(&self, after: i64) -> Result<Vec<RainRecord>, Self::Error>;

    /// Rows with `timestamp > after`, summed by hour-of-day.
    fn hourly_totals_since(&self, after: i64) -> Result<Vec<HourTotal>, Self::Error>;
}

/// Configuration for the sampling loop.
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    pub bucket_size: BucketSize,

    /// Sleep between cycles.
    /// Default: 25ms, half the gauge's 50ms pulse.
    pub poll_interval: Duration,

    /// Longest acceptable cycle, sleep included, before a pulse may be missed.
    /// Default: 50ms.
    pub cycle_budget: Duration,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            bucket_size: BucketSize::default(),
            poll_interval: Duration::from_millis(25),
            cycle_budget: Duration::from_millis(50),
        }
    }
}

/// What a single cycle did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleOutcome {
    /// The finished minute handed to the store, if the minute rolled with tips.
    pub flushed: Option<RainRecord>,
    /// Whether the store rejected `flushed`.
    pub flush_failed: bool,
    /// Whether this cycle counted a tip.
    pub tipped: bool,
    /// Total for the current hour after resummarization.
    pub hour_total: i64,
}

/// Rows loaded into the buckets at startup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Hydration {
    pub minutes: usize,
    pub hours: usize,
    /// Rows whose divider differs from the configured one.
    pub divider_mismatches: usize,
}

/// Owns the sensor and the store and is the only writer of the buckets.
pub struct Collector<S, I> {
    store: S,
    input: I,
    config: CollectorConfig,
    buckets: Arc<RwLock<Buckets>>,
    stats: Arc<CollectorStats>,
    view: RainView,
    last_level: bool,
    last_minute: usize,
}

impl<S: RainStore, I: DigitalInput> Collector<S, I> {
    pub fn new(store: S, input: I, config: CollectorConfig) -> Self {
        let buckets = Arc::new(RwLock::new(Buckets::default()));
        let stats = Arc::new(CollectorStats::default());
        let view = RainView::new(buckets.clone(), stats.clone(), config.bucket_size);
        Self {
            store,
            input,
            config,
            buckets,
            stats,
            view,
            last_level: false,
            last_minute: 0,
        }
    }

    /// A read handle for request handlers.
    #[must_use]
    pub fn view(&self) -> RainView {
        self.view.clone()
    }

    /// Loads the last hour of minutes and the last day of hour totals.
    ///
    /// Rows recorded under a different divider are loaded unscaled and
    /// reported; converting them is left to the operator.
    pub fn hydrate(&mut self, now: i64) -> Result<Hydration, S::Error> {
        let now = clock::truncate_to_minute(now);
        let divider = self.config.bucket_size.divider();
        let rows = self.store.rain_since(now - SECONDS_PER_HOUR)?;
        let totals = self
            .store
            .hourly_totals_since(now - SECONDS_PER_DAY)?;

        let mut hydration = Hydration::default();
        let mut buckets = self.buckets.write().unwrap_or_else(PoisonError::into_inner);
        for row in &rows {
            debug!(?row, "hydrating minute");
            buckets.set_minute(clock::minute_of_hour(row.timestamp), row.amount);
            if row.divider != divider {
                hydration.divider_mismatches += 1;
            }
        }
        for total in &totals {
            debug!(?total, "hydrating hour");
            buckets.set_hour(total.hour, total.amount);
            if total.mixes_divider(divider) {
                hydration.divider_mismatches += 1;
            }
        }
        drop(buckets);

        hydration.minutes = rows.len();
        hydration.hours = totals.len();
        if hydration.divider_mismatches > 0 {
            warn!(
                configured = divider,
                mismatches = hydration.divider_mismatches,
                "stored rain was recorded with a different divider; loading it unscaled"
            );
        }
        Ok(hydration)
    }

    /// Takes the initial sensor level and minute so the first cycle neither
    /// counts a tip nor rolls.
    pub fn prime(&mut self, now: i64) {
        self.last_minute = clock::minute_of_hour(now);
        self.last_level = self.input.read_level();
    }

    /// Runs one cycle as of wall-clock `now`.
    pub fn step(&mut self, now: i64) -> CycleOutcome {
        let now = clock::truncate_to_minute(now);
        let minute = clock::minute_of_hour(now);
        let level = self.input.read_level();
        let mut outcome = CycleOutcome::default();

        {
            let mut buckets = self.buckets.write().unwrap_or_else(PoisonError::into_inner);
            if minute != self.last_minute {
                debug!(minute, "another minute, another bucket");
                let count = buckets.minute(self.last_minute);
                if count > 0 {
                    outcome.flushed = Some(RainRecord {
                        timestamp: now - SECONDS_PER_MINUTE,
                        amount: count,
                        divider: self.config.bucket_size.divider(),
                    });
                }
                buckets.reset_minute(minute);
            }
            if self.last_level && !level {
                buckets.record_tip(minute);
                outcome.tipped = true;
            }
            outcome.hour_total = buckets.resummarize_hour(minute, clock::hour_of_day(now));
        }

        if level != self.last_level {
            debug!(level, "sensor level changed");
        }
        if outcome.tipped {
            self.stats.record_tip();
            info!(
                inches = self.config.bucket_size.inches(1),
                "rain tip"
            );
        }
        if let Some(record) = &outcome.flushed {
            match self.store.insert_rain(record) {
                Ok(()) => {
                    self.stats.record_flush();
                    info!(
                        timestamp = record.timestamp,
                        amount = record.amount,
                        inches = self.config.bucket_size.inches(record.amount),
                        "stored bucket"
                    );
                }
                Err(err) => {
                    self.stats.record_flush_failure();
                    outcome.flush_failed = true;
                    error!(
                        %err,
                        timestamp = record.timestamp,
                        amount = record.amount,
                        "unable to save bucket (storage issue or clock rolled back)"
                    );
                }
            }
        }

        self.last_level = level;
        self.last_minute = minute;
        self.stats.record_cycle();
        outcome
    }

    /// Samples until `shutdown` is set.
    ///
    /// Cycles whose duration, sleep included, exceeds the budget are logged
    /// and counted; a pulse may have been missed during them.
    pub fn run(mut self, shutdown: &AtomicBool) {
        self.prime(clock::now_secs());
        info!(
            divider = self.config.bucket_size.divider(),
            poll_ms = self.config.poll_interval.as_millis(),
            "rain collector running"
        );

        while !shutdown.load(Ordering::Relaxed) {
            let started = Instant::now();
            self.step(clock::now_secs());
            thread::sleep(self.config.poll_interval);

            let elapsed = started.elapsed();
            if elapsed > self.config.cycle_budget {
                self.stats.record_overrun();
                warn!(
                    elapsed_ms = elapsed.as_millis(),
                    budget_ms = self.config.cycle_budget.as_millis(),
                    "sampling cycle overran its budget, a tip may have been missed"
                );
            }
        }

        info!("rain collector stopped");
    }
}
