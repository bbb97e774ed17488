//! Archive windows over stored rain.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, NaiveDate, Utc};

use crate::types::ValidationError;

/// A named calendar window for archive queries, in UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArchivePeriod {
    ThisMonth,
    LastMonth,
    ThisYear,
}

/// How archive rows are keyed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveGrouping {
    /// Day-of-month and hour, e.g. `0510` for the 5th at 10:00.
    DayHour,
    /// Day-of-year, e.g. `032` for February 1st.
    DayOfYear,
}

impl ArchiveGrouping {
    /// SQLite `strftime` format producing the key.
    #[must_use]
    pub const fn strftime_format(self) -> &'static str {
        match self {
            Self::DayHour => "%d%H",
            Self::DayOfYear => "%j",
        }
    }
}

/// Half-open `[start, end)` range of timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArchiveWindow {
    pub start: i64,
    pub end: i64,
    pub grouping: ArchiveGrouping,
}

impl ArchivePeriod {
    pub const ALL: [Self; 3] = [Self::ThisMonth, Self::LastMonth, Self::ThisYear];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ThisMonth => "thismonth",
            Self::LastMonth => "lastmonth",
            Self::ThisYear => "thisyear",
        }
    }

    #[must_use]
    pub const fn grouping(self) -> ArchiveGrouping {
        match self {
            Self::ThisMonth | Self::LastMonth => ArchiveGrouping::DayHour,
            Self::ThisYear => ArchiveGrouping::DayOfYear,
        }
    }

    /// The window this period covers as of `now`.
    ///
    /// Returns `None` only for dates outside chrono's representable range.
    #[must_use]
    pub fn window(self, now: DateTime<Utc>) -> Option<ArchiveWindow> {
        let (year, month) = (now.year(), now.month());
        let (start, end) = match self {
            Self::ThisMonth => (month_start(year, month)?, next_month_start(year, month)?),
            Self::LastMonth => {
                let (prev_year, prev_month) = if month == 1 {
                    (year - 1, 12)
                } else {
                    (year, month - 1)
                };
                (month_start(prev_year, prev_month)?, month_start(year, month)?)
            }
            Self::ThisYear => (month_start(year, 1)?, month_start(year + 1, 1)?),
        };
        Some(ArchiveWindow {
            start,
            end,
            grouping: self.grouping(),
        })
    }
}

fn month_start(year: i32, month: u32) -> Option<i64> {
    Some(
        NaiveDate::from_ymd_opt(year, month, 1)?
            .and_hms_opt(0, 0, 0)?
            .and_utc()
            .timestamp(),
    )
}

fn next_month_start(year: i32, month: u32) -> Option<i64> {
    if month == 12 {
        month_start(year + 1, 1)
    } else {
        month_start(year, month + 1)
    }
}

impl fmt::Display for ArchivePeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ArchivePeriod {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|period| period.as_str() == s)
            .ok_or_else(|| ValidationError::UnknownArchivePeriod {
                value: s.to_string(),
            })
    }
}
