//! Core logic for the rain gauge daemon.
//!
//! This crate contains:
//! - GPIO access: exporting and reading the gauge's contact line
//! - Buckets: the circular minute and hour tip counters
//! - Collector: the sampling loop that detects tips and rolls buckets
//! - View: the read-only façade handed to request handlers

pub mod archive;
pub mod buckets;
pub mod clock;
mod collector;
pub mod gpio;
mod stats;
mod types;
mod view;

pub use archive::{ArchiveGrouping, ArchivePeriod, ArchiveWindow};
pub use buckets::Buckets;
pub use collector::{Collector, CollectorConfig, CycleOutcome, Hydration, RainStore};
pub use gpio::{DigitalInput, GpioError, GpioSensor, SysfsGpio};
pub use stats::{CollectorStats, StatsSnapshot};
pub use types::{BucketSize, HourTotal, MAX_SENSOR_LINE, RainRecord, SensorLine, ValidationError};
pub use view::{RainSummary, RainView};
