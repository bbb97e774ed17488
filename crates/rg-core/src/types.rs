//! Core type definitions with validation.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Highest sensor line the driver can export (lines are `XIO-P0` to `XIO-P7`).
pub const MAX_SENSOR_LINE: u8 = 7;

/// Validation errors for core types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The sensor line is outside the exportable range.
    #[error("only sensor lines 0 through {MAX_SENSOR_LINE} are allowed, {line} is invalid")]
    LineOutOfRange { line: u8 },

    /// The bucket size selector is not one of 0, 1 or 2.
    #[error("bucket size must be 0, 1 or 2, got {selector}")]
    UnknownBucketSize { selector: u8 },

    /// The archive period name is not recognized.
    #[error("unknown archive period: {value}")]
    UnknownArchivePeriod { value: String },
}

/// A validated sensor line number in `0..=7`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct SensorLine(u8);

impl SensorLine {
    /// Creates a sensor line after range validation.
    pub const fn new(line: u8) -> Result<Self, ValidationError> {
        if line > MAX_SENSOR_LINE {
            return Err(ValidationError::LineOutOfRange { line });
        }
        Ok(Self(line))
    }

    #[must_use]
    pub const fn get(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for SensorLine {
    type Error = ValidationError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<SensorLine> for u8 {
    fn from(line: SensorLine) -> Self {
        line.0
    }
}

impl fmt::Display for SensorLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Physical size of one bucket tip on the gauge.
///
/// The selector values match the gauge's DIP switch documentation:
/// `0` is 0.01", `1` is 0.001" and `2` is 0.0001".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BucketSize {
    Hundredth,
    #[default]
    Thousandth,
    TenThousandth,
}

impl BucketSize {
    pub const ALL: [Self; 3] = [Self::Hundredth, Self::Thousandth, Self::TenThousandth];

    /// Maps a bucket size selector to its variant.
    pub const fn from_selector(selector: u8) -> Result<Self, ValidationError> {
        match selector {
            0 => Ok(Self::Hundredth),
            1 => Ok(Self::Thousandth),
            2 => Ok(Self::TenThousandth),
            _ => Err(ValidationError::UnknownBucketSize { selector }),
        }
    }

    #[must_use]
    pub const fn selector(self) -> u8 {
        match self {
            Self::Hundredth => 0,
            Self::Thousandth => 1,
            Self::TenThousandth => 2,
        }
    }

    /// Number of tips per inch of rainfall.
    #[must_use]
    pub const fn divider(self) -> i64 {
        match self {
            Self::Hundredth => 100,
            Self::Thousandth => 1_000,
            Self::TenThousandth => 10_000,
        }
    }

    /// Converts a raw tip count to inches of rainfall.
    #[expect(
        clippy::cast_precision_loss,
        reason = "tip counts stay far below 2^52"
    )]
    #[must_use]
    pub fn inches(self, tips: i64) -> f64 {
        tips as f64 / self.divider() as f64
    }
}

/// One persisted minute of rain: the minute start, tip count and divider in
/// effect when it was recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RainRecord {
    /// Minute start, seconds since the Unix epoch.
    pub timestamp: i64,
    /// Raw tip count.
    pub amount: i64,
    pub divider: i64,
}

/// Summed tips for one hour-of-day over a query window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HourTotal {
    /// Hour of day (UTC), `0..24`.
    pub hour: usize,
    pub amount: i64,
    /// Smallest and largest divider seen among the summed rows.
    pub min_divider: i64,
    pub max_divider: i64,
}

impl HourTotal {
    /// Whether any summed row was recorded with a divider other than `divider`.
    #[must_use]
    pub const fn mixes_divider(&self, divider: i64) -> bool {
        self.min_divider != divider || self.max_divider != divider
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sensor_line_accepts_range() {
        for line in 0..=MAX_SENSOR_LINE {
            assert_eq!(SensorLine::new(line).unwrap().get(), line);
        }
    }

    #[test]
    fn sensor_line_rejects_out_of_range() {
        let err = SensorLine::new(8).unwrap_err();
        assert_eq!(err, ValidationError::LineOutOfRange { line: 8 });
        assert_eq!(
            err.to_string(),
            "only sensor lines 0 through 7 are allowed, 8 is invalid"
        );
    }

    #[test]
    fn sensor_line_deserialize_validates() {
        let line: SensorLine = serde_json::from_str("3").unwrap();
        assert_eq!(line.get(), 3);
        assert!(serde_json::from_str::<SensorLine>("12").is_err());
    }

    #[test]
    fn bucket_size_selectors_map_to_dividers() {
        assert_eq!(BucketSize::from_selector(0).unwrap().divider(), 100);
        assert_eq!(BucketSize::from_selector(1).unwrap().divider(), 1_000);
        assert_eq!(BucketSize::from_selector(2).unwrap().divider(), 10_000);
        assert_eq!(
            BucketSize::from_selector(3),
            Err(ValidationError::UnknownBucketSize { selector: 3 })
        );
    }

    #[test]
    fn bucket_size_selector_roundtrip() {
        for selector in 0..=2 {
            let size = BucketSize::from_selector(selector).unwrap();
            assert_eq!(size.selector(), selector);
        }
    }

    #[test]
    fn inches_scales_by_divider() {
        assert!((BucketSize::Hundredth.inches(25) - 0.25).abs() < f64::EPSILON);
        assert!((BucketSize::Thousandth.inches(1) - 0.001).abs() < f64::EPSILON);
    }

    #[test]
    fn hour_total_flags_mixed_dividers() {
        let uniform = HourTotal {
            hour: 3,
            amount: 4,
            min_divider: 1_000,
            max_divider: 1_000,
        };
        assert!(!uniform.mixes_divider(1_000));
        assert!(uniform.mixes_divider(100));

        let mixed = HourTotal {
            min_divider: 100,
            ..uniform
        };
        assert!(mixed.mixes_divider(1_000));
    }
}
