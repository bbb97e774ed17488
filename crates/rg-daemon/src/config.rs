//! Configuration loading and management.

use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use rg_core::{BucketSize, CollectorConfig, SensorLine};
use serde::{Deserialize, Serialize};

/// Daemon configuration.
///
/// Fixed at startup; there is no runtime reconfiguration.
#[derive(Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to the database file.
    pub database_path: PathBuf,

    /// Log to this file instead of stdout.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_file: Option<PathBuf>,

    /// Address the HTTP API listens on.
    pub listen: String,

    pub port: u16,

    /// Tip size selector: 0 = 0.01", 1 = 0.001", 2 = 0.0001".
    pub bucket_size: u8,

    /// Sensor line, `XIO-P0` to `XIO-P7`.
    pub sensor_line: u8,

    /// Sysfs GPIO class directory.
    pub gpio_root: PathBuf,

    /// Kernel GPIO number of sensor line 0.
    pub gpio_base: u32,

    /// Sleep between samples in milliseconds.
    pub poll_interval_ms: u64,

    /// Longest acceptable sampling cycle in milliseconds.
    pub cycle_budget_ms: u64,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("database_path", &self.database_path)
            .field("log_file", &self.log_file)
            .field("listen", &format_args!("{}:{}", self.listen, self.port))
            .field("bucket_size", &self.bucket_size)
            .field("sensor_line", &self.sensor_line)
            .field("gpio", &format_args!("{}@{}", self.gpio_root.display(), self.gpio_base))
            .field("poll_interval_ms", &self.poll_interval_ms)
            .field("cycle_budget_ms", &self.cycle_budget_ms)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs_data_path().unwrap_or_else(|| PathBuf::from("."));
        let collector = CollectorConfig::default();
        Self {
            database_path: data_dir.join("rg11.db"),
            log_file: None,
            listen: "0.0.0.0".to_string(),
            port: 80,
            bucket_size: collector.bucket_size.selector(),
            sensor_line: 0,
            gpio_root: PathBuf::from(rg_core::gpio::DEFAULT_GPIO_ROOT),
            gpio_base: rg_core::gpio::DEFAULT_GPIO_BASE,
            poll_interval_ms: duration_ms(collector.poll_interval),
            cycle_budget_ms: duration_ms(collector.cycle_budget),
        }
    }
}

/// Values given on the command line, layered over every other source.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ConfigOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_file: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub listen: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bucket_size: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sensor_line: Option<u8>,
}

/// Startup settings derived from a validated [`Config`].
#[derive(Debug, Clone)]
pub struct Settings {
    pub listen_addr: SocketAddr,
    pub sensor_line: SensorLine,
    pub collector: CollectorConfig,
}

impl Config {
    /// Loads configuration, optionally from a specific file, then applies
    /// command-line overrides.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(
        config_path: Option<&Path>,
        overrides: &ConfigOverrides,
    ) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        // Load from default config location
        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        // Load from specified config file
        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        // Load from environment variables (RGD_*)
        figment = figment.merge(Env::prefixed("RGD_"));

        figment = figment.merge(Serialized::defaults(overrides));

        figment.extract()
    }

    /// Checks every value the daemon cannot start without.
    pub fn validate(&self) -> Result<Settings> {
        let sensor_line = SensorLine::new(self.sensor_line).context("invalid sensor_line")?;
        let bucket_size = self.bucket_size()?;
        let ip: IpAddr = self
            .listen
            .parse()
            .with_context(|| format!("invalid listen address: {}", self.listen))?;
        if self.poll_interval_ms == 0 {
            anyhow::bail!("poll_interval_ms must be greater than zero");
        }
        Ok(Settings {
            listen_addr: SocketAddr::new(ip, self.port),
            sensor_line,
            collector: CollectorConfig {
                bucket_size,
                poll_interval: Duration::from_millis(self.poll_interval_ms),
                cycle_budget: Duration::from_millis(self.cycle_budget_ms),
            },
        })
    }

    pub fn bucket_size(&self) -> Result<BucketSize> {
        BucketSize::from_selector(self.bucket_size).context("invalid bucket_size")
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Returns the platform-specific config directory for rgd.
fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("rgd"))
}

/// Returns the platform-specific data directory for rgd.
///
/// On Linux: `~/.local/share/rgd`
pub fn dirs_data_path() -> Option<PathBuf> {
    dirs::data_dir().map(|p| p.join("rgd"))
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::Write;

    use tempfile::NamedTempFile;

    #[test]
    fn test_dirs_data_path_ends_with_rgd() {
        let path = dirs_data_path().unwrap();
        assert_eq!(path.file_name().unwrap(), "rgd");
    }

    #[test]
    fn test_default_config_matches_gauge_defaults() {
        let config = Config::default();
        assert_eq!(config.database_path.file_name().unwrap(), "rg11.db");
        assert_eq!(config.listen, "0.0.0.0");
        assert_eq!(config.port, 80);
        assert_eq!(config.bucket_size, 1);
        assert_eq!(config.sensor_line, 0);
        assert_eq!(config.gpio_base, 408);
        assert_eq!(config.poll_interval_ms, 25);
        assert_eq!(config.cycle_budget_ms, 50);
        assert!(config.log_file.is_none());
    }

    #[test]
    fn test_file_then_overrides() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "port = 8080\nbucket_size = 2\nsensor_line = 3").unwrap();
        file.flush().unwrap();

        let overrides = ConfigOverrides {
            port: Some(9090),
            log_file: Some(PathBuf::from("/tmp/rgd.log")),
            ..ConfigOverrides::default()
        };
        let config = Config::load_from(Some(file.path()), &overrides).unwrap();

        assert_eq!(config.port, 9090);
        assert_eq!(config.bucket_size, 2);
        assert_eq!(config.sensor_line, 3);
        assert_eq!(config.log_file, Some(PathBuf::from("/tmp/rgd.log")));
    }

    #[test]
    fn test_validate_builds_settings() {
        let config = Config {
            listen: "127.0.0.1".to_string(),
            port: 8080,
            bucket_size: 0,
            sensor_line: 7,
            ..Config::default()
        };

        let settings = config.validate().unwrap();

        assert_eq!(settings.listen_addr, "127.0.0.1:8080".parse().unwrap());
        assert_eq!(settings.sensor_line.get(), 7);
        assert_eq!(settings.collector.bucket_size.divider(), 100);
        assert_eq!(settings.collector.poll_interval, Duration::from_millis(25));
    }

    #[test]
    fn test_validate_rejects_bad_line() {
        let config = Config {
            sensor_line: 8,
            ..Config::default()
        };
        let err = config.validate().unwrap_err();
        assert!(format!("{err:#}").contains("8 is invalid"));
    }

    #[test]
    fn test_validate_rejects_bad_bucket_size() {
        let config = Config {
            bucket_size: 3,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_listen_address() {
        let config = Config {
            listen: "not-an-ip".to_string(),
            ..Config::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("not-an-ip"));
    }
}
