//! Circular minute and hour buckets.

pub const MINUTES_PER_HOUR: usize = 60;
pub const HOURS_PER_DAY: usize = 24;

/// Tip counts for the last hour (by minute-of-hour) and the last day (by
/// hour-of-day).
///
/// Slot `m` of the minute ring always holds the most recent occurrence of
/// minute `m`; it is overwritten every 60 minutes. The hour ring works the
/// same way over 24 hours.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Buckets {
    minutes: [i64; MINUTES_PER_HOUR],
    hours: [i64; HOURS_PER_DAY],
}

impl Default for Buckets {
    fn default() -> Self {
        Self {
            minutes: [0; MINUTES_PER_HOUR],
            hours: [0; HOURS_PER_DAY],
        }
    }
}

impl Buckets {
    #[must_use]
    pub const fn minutes(&self) -> &[i64; MINUTES_PER_HOUR] {
        &self.minutes
    }

    #[must_use]
    pub const fn hours(&self) -> &[i64; HOURS_PER_DAY] {
        &self.hours
    }

    #[must_use]
    pub const fn minute(&self, minute: usize) -> i64 {
        self.minutes[minute % MINUTES_PER_HOUR]
    }

    #[must_use]
    pub const fn hour(&self, hour: usize) -> i64 {
        self.hours[hour % HOURS_PER_DAY]
    }

    /// Clears a minute slot so it can start accumulating again.
    pub const fn reset_minute(&mut self, minute: usize) {
        self.minutes[minute % MINUTES_PER_HOUR] = 0;
    }

    /// Counts one tip in a minute slot.
    pub const fn record_tip(&mut self, minute: usize) {
        self.minutes[minute % MINUTES_PER_HOUR] += 1;
    }

    pub const fn set_minute(&mut self, minute: usize, amount: i64) {
        self.minutes[minute % MINUTES_PER_HOUR] = amount;
    }

    pub const fn set_hour(&mut self, hour: usize, amount: i64) {
        self.hours[hour % HOURS_PER_DAY] = amount;
    }

    /// Recomputes `hour` as the sum of minute slots `0..minute`.
    ///
    /// The in-progress minute is left out until it rolls.
    pub fn resummarize_hour(&mut self, minute: usize, hour: usize) -> i64 {
        let total = self.minutes[..minute.min(MINUTES_PER_HOUR)].iter().sum();
        self.set_hour(hour, total);
        total
    }

    /// The minute ring ordered oldest to newest, ending at `current_minute`.
    #[must_use]
    pub fn hour_history(&self, current_minute: usize) -> Vec<i64> {
        rotate_oldest_first(&self.minutes, current_minute)
    }

    /// The hour ring ordered oldest to newest, ending at `current_hour`.
    #[must_use]
    pub fn day_history(&self, current_hour: usize) -> Vec<i64> {
        rotate_oldest_first(&self.hours, current_hour)
    }
}

fn rotate_oldest_first(ring: &[i64], newest: usize) -> Vec<i64> {
    let len = ring.len();
    (1..=len).map(|offset| ring[(newest + offset) % len]).collect()
}
