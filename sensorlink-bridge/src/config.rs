//! Configuration for the sensorlink bridge.

use sensorlink_common::LoggingConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Load(#[from] sensorlink_common::Error),
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Complete bridge configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Serial peripheral settings.
    #[serde(default)]
    pub serial: SerialConfig,

    /// Telemetry source settings.
    #[serde(default)]
    pub telemetry: TelemetryConfig,

    /// Sensor name matching rules.
    #[serde(default)]
    pub metrics: MetricsConfig,

    /// Delay between forwarding cycles in milliseconds (default: 1000).
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_poll_interval_ms() -> u64 {
    1000
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            serial: SerialConfig::default(),
            telemetry: TelemetryConfig::default(),
            metrics: MetricsConfig::default(),
            poll_interval_ms: default_poll_interval_ms(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Serial peripheral configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerialConfig {
    /// Substring matched against each port's description (case-sensitive).
    #[serde(default = "default_target")]
    pub target: String,

    /// Baud rate (default: 9600)
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,

    /// Wait between discovery attempts in milliseconds (default: 1000).
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// Pause after opening the port while the peripheral resets (default: 2000).
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,

    /// Upper bound on writing one block before the link is dropped (default: 2000).
    #[serde(default = "default_write_timeout_ms")]
    pub write_timeout_ms: u64,
}

fn default_target() -> String {
    "Leonardo".to_string()
}

fn default_baud_rate() -> u32 {
    9600
}

fn default_retry_delay_ms() -> u64 {
    1000
}

fn default_settle_delay_ms() -> u64 {
    2000
}

fn default_write_timeout_ms() -> u64 {
    2000
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            target: default_target(),
            baud_rate: default_baud_rate(),
            retry_delay_ms: default_retry_delay_ms(),
            settle_delay_ms: default_settle_delay_ms(),
            write_timeout_ms: default_write_timeout_ms(),
        }
    }
}

impl SerialConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }
}

/// Telemetry source configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// HTTP endpoint returning the JSON reading array.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Request timeout in milliseconds (default: 1000).
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_endpoint() -> String {
    "http://localhost:6969/".to_string()
}

fn default_timeout_ms() -> u64 {
    1000
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl TelemetryConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Built-in sensor naming profiles.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Profile {
    /// Desktop profile: package temperature, GPU instance disambiguation.
    #[default]
    Full,
    /// OLED build: first P-core temperature, plain GPU lookup.
    Oled,
}

/// How GPU readings are picked when several GPUs report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GpuStrategy {
    /// Prefer instance 1, then instance 0, filtering by class prefix.
    PreferSecondary,
    /// First reading with a matching name, regardless of class.
    FirstMatch,
}

/// Per-metric sensor name overrides.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensorNames {
    pub cpu_usage: Option<String>,
    pub cpu_temp: Option<String>,
    pub gpu_usage: Option<String>,
    pub gpu_temp: Option<String>,
    pub tx: Option<String>,
    pub rx: Option<String>,
}

/// Metric extraction configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Base naming profile (default: "full").
    #[serde(default)]
    pub profile: Profile,

    /// GPU selection override; the profile decides when unset.
    #[serde(default)]
    pub gpu_strategy: Option<GpuStrategy>,

    /// Sensor name overrides on top of the profile.
    #[serde(default)]
    pub sensors: SensorNames,

    /// Class labels for GPU instance 0 and instance 1.
    #[serde(default = "default_gpu_labels")]
    pub gpu_labels: Vec<String>,
}

fn default_gpu_labels() -> Vec<String> {
    vec!["GPU [#0]:".to_string(), "GPU [#1]:".to_string()]
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            profile: Profile::default(),
            gpu_strategy: None,
            sensors: SensorNames::default(),
            gpu_labels: default_gpu_labels(),
        }
    }
}

impl BridgeConfig {
    /// Load configuration from a JSON5 file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let config: BridgeConfig = sensorlink_common::load_config(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a JSON5 string without validating it.
    #[cfg(test)]
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        Ok(sensorlink_common::parse_config::<Self>(content)?)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.serial.target.is_empty() {
            return Err(ConfigError::Validation(
                "serial.target cannot be empty".to_string(),
            ));
        }

        if self.serial.baud_rate == 0 {
            return Err(ConfigError::Validation(
                "serial.baud_rate must be > 0".to_string(),
            ));
        }

        if self.serial.write_timeout_ms == 0 {
            return Err(ConfigError::Validation(
                "serial.write_timeout_ms must be > 0".to_string(),
            ));
        }

        if self.poll_interval_ms == 0 {
            return Err(ConfigError::Validation(
                "poll_interval_ms must be > 0".to_string(),
            ));
        }

        let endpoint = &self.telemetry.endpoint;
        if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
            return Err(ConfigError::Validation(format!(
                "telemetry.endpoint '{}' must be an http(s) URL",
                endpoint
            )));
        }

        if self.telemetry.timeout_ms == 0 {
            return Err(ConfigError::Validation(
                "telemetry.timeout_ms must be > 0".to_string(),
            ));
        }

        if self.metrics.gpu_labels.len() != 2 {
            return Err(ConfigError::Validation(format!(
                "metrics.gpu_labels must list exactly 2 labels, got {}",
                self.metrics.gpu_labels.len()
            )));
        }

        if self.metrics.gpu_labels.iter().any(|label| label.is_empty()) {
            return Err(ConfigError::Validation(
                "metrics.gpu_labels cannot contain an empty label".to_string(),
            ));
        }

        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}
