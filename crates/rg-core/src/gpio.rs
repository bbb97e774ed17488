//! Digital input access through the Linux sysfs GPIO interface.
//!
//! Lines are exported by writing `base + line` to `<root>/export`, after which
//! `<root>/gpio<N>/value` reads back `0` or `1`. The default root and base
//! match the C.H.I.P. expander pins `XIO-P0` to `XIO-P7`.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::types::SensorLine;

/// Default sysfs GPIO class directory.
pub const DEFAULT_GPIO_ROOT: &str = "/sys/class/gpio";

/// GPIO number of sensor line 0.
pub const DEFAULT_GPIO_BASE: u32 = 408;

/// `errno` reported when another process has already exported the line.
const EBUSY: i32 = 16;

/// GPIO driver errors.
#[derive(Debug, Error)]
pub enum GpioError {
    /// The line has already been allocated by this driver.
    #[error("sensor line {0} is already in use")]
    AlreadyAllocated(SensorLine),
    /// The line was never allocated, or has been released.
    #[error("sensor line {0} is not in use")]
    NotAllocated(SensorLine),
    /// Reading or writing a sysfs attribute failed.
    #[error("unable to access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// The value attribute held something other than `0` or `1`.
    #[error("unexpected value {value:?} in {}", path.display())]
    InvalidValue { path: PathBuf, value: String },
}

/// Direction of an allocated line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Input,
    Output,
}

/// Handle to an allocated line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineHandle {
    line: SensorLine,
    number: u32,
}

impl LineHandle {
    #[must_use]
    pub const fn line(&self) -> SensorLine {
        self.line
    }

    /// Kernel GPIO number backing the line.
    #[must_use]
    pub const fn number(&self) -> u32 {
        self.number
    }
}

/// How an allocated line came to be exported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Ownership {
    /// This process wrote the export; release unexports it.
    Exported,
    /// Another process had already exported it; release leaves it alone.
    Adopted,
}

/// Sysfs GPIO driver tracking which lines this process has allocated.
#[derive(Debug)]
pub struct SysfsGpio {
    root: PathBuf,
    base: u32,
    lines: HashMap<SensorLine, (Direction, Ownership)>,
}

impl Default for SysfsGpio {
    fn default() -> Self {
        Self::new(DEFAULT_GPIO_ROOT, DEFAULT_GPIO_BASE)
    }
}

impl SysfsGpio {
    pub fn new(root: impl Into<PathBuf>, base: u32) -> Self {
        Self {
            root: root.into(),
            base,
            lines: HashMap::new(),
        }
    }

    /// Exports a line and, for outputs, sets its direction.
    ///
    /// A line exported by another process (`EBUSY`) is logged and adopted:
    /// it can be read, but [`release`](Self::release) will not unexport it.
    pub fn allocate(
        &mut self,
        line: SensorLine,
        direction: Direction,
    ) -> Result<LineHandle, GpioError> {
        if self.lines.contains_key(&line) {
            return Err(GpioError::AlreadyAllocated(line));
        }
        let handle = LineHandle {
            line,
            number: self.base + u32::from(line.get()),
        };
        let export = write_attr(&self.root.join("export"), handle.number);
        self.register(handle, direction, export)
    }

    /// Records a line once its export has been attempted.
    fn register(
        &mut self,
        handle: LineHandle,
        direction: Direction,
        export: Result<(), GpioError>,
    ) -> Result<LineHandle, GpioError> {
        let ownership = export_ownership(export, handle.number)?;
        if direction == Direction::Output {
            write_attr(&self.line_path(handle, "direction"), "out")?;
        }

        self.lines.insert(handle.line, (direction, ownership));
        debug!(
            line = %handle.line,
            gpio = handle.number,
            ?direction,
            ?ownership,
            "allocated sensor line"
        );
        Ok(handle)
    }

    /// Reads the current logic level of a line; `true` is high.
    pub fn read(&self, handle: LineHandle) -> Result<bool, GpioError> {
        if !self.lines.contains_key(&handle.line) {
            return Err(GpioError::NotAllocated(handle.line));
        }
        let path = self.line_path(handle, "value");
        let raw = fs::read_to_string(&path).map_err(|source| GpioError::Io {
            path: path.clone(),
            source,
        })?;
        match raw.trim() {
            "1" => Ok(true),
            "0" => Ok(false),
            other => Err(GpioError::InvalidValue {
                path,
                value: other.to_string(),
            }),
        }
    }

    /// Drives outputs low and unexports the line. Failures are logged only.
    pub fn release(&mut self, handle: LineHandle) {
        let Some((direction, ownership)) = self.lines.remove(&handle.line) else {
            warn!(line = %handle.line, "release requested for a line that is not in use");
            return;
        };
        if ownership == Ownership::Adopted {
            debug!(
                line = %handle.line,
                gpio = handle.number,
                "leaving line exported, another process owns it"
            );
            return;
        }
        if direction == Direction::Output {
            if let Err(err) = write_attr(&self.line_path(handle, "value"), 0) {
                error!(%err, "failed to drive output low before release");
            }
        }
        if let Err(err) = write_attr(&self.root.join("unexport"), handle.number) {
            error!(%err, "failed to unexport sensor line");
        }
        debug!(line = %handle.line, "released sensor line");
    }

    fn line_path(&self, handle: LineHandle, attr: &str) -> PathBuf {
        self.root.join(format!("gpio{}", handle.number)).join(attr)
    }
}

/// Classifies the result of writing to `export`.
fn export_ownership(export: Result<(), GpioError>, number: u32) -> Result<Ownership, GpioError> {
    match export {
        Ok(()) => Ok(Ownership::Exported),
        Err(GpioError::Io { source, .. }) if source.raw_os_error() == Some(EBUSY) => {
            warn!(gpio = number, "something else is already using this GPIO");
            Ok(Ownership::Adopted)
        }
        Err(err) => Err(err),
    }
}

fn write_attr(path: &Path, value: impl ToString) -> Result<(), GpioError> {
    fs::write(path, value.to_string()).map_err(|source| GpioError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// A source of line levels for the sampling loop.
///
/// Implementations never fail: errors are logged and replaced by a sentinel
/// level so the hot loop keeps its cadence.
pub trait DigitalInput {
    fn read_level(&mut self) -> bool;
}

/// The rain gauge's contact, read through [`SysfsGpio`].
///
/// On a read failure the last good level is reported, which can never create
/// a falling edge on its own. The line is released on drop.
#[derive(Debug)]
pub struct GpioSensor {
    gpio: SysfsGpio,
    handle: LineHandle,
    last_good: bool,
    failing: bool,
}

impl GpioSensor {
    /// Allocates `line` as an input on `gpio`.
    pub fn open(mut gpio: SysfsGpio, line: SensorLine) -> Result<Self, GpioError> {
        let handle = gpio.allocate(line, Direction::Input)?;
        Ok(Self {
            gpio,
            handle,
            last_good: false,
            failing: false,
        })
    }

    #[must_use]
    pub const fn handle(&self) -> LineHandle {
        self.handle
    }
}

impl DigitalInput for GpioSensor {
    fn read_level(&mut self) -> bool {
        match self.gpio.read(self.handle) {
            Ok(level) => {
                if self.failing {
                    info!(line = %self.handle.line, "sensor reads recovered");
                    self.failing = false;
                }
                self.last_good = level;
                level
            }
            Err(err) => {
                // Logged once per failure streak; the loop polls every few ms.
                if !self.failing {
                    error!(%err, "unable to read sensor line");
                    self.failing = true;
                }
                self.last_good
            }
        }
    }
}

impl Drop for GpioSensor {
    fn drop(&mut self) {
        self.gpio.release(self.handle);
    }
}
