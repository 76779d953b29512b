//! MonitorSettings - Config Loader output
//!
//! Describes the complete monitor configuration: device link, field mapping,
//! display window and storage locations.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{ContractError, DeviceRef, FieldMapping};

/// Smallest accepted chart data limit
pub const CHART_LIMIT_MIN: usize = 10;

/// Largest accepted chart data limit
pub const CHART_LIMIT_MAX: usize = 1000;

/// Chart data limit used when none is configured
pub const CHART_LIMIT_DEFAULT: usize = 100;

/// Configuration version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Complete monitor settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct MonitorSettings {
    /// Configuration version
    #[serde(default)]
    pub version: ConfigVersion,

    /// Device link
    #[serde(default)]
    #[validate(nested)]
    pub device: DeviceConfig,

    /// Active field mapping
    #[serde(default)]
    #[validate(nested)]
    pub field_mapping: FieldMapping,

    /// Live display window
    #[serde(default)]
    #[validate(nested)]
    pub display: DisplayConfig,

    /// Storage locations
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Transport used to reach the device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportKind {
    /// Line stream over TCP
    #[default]
    Tcp,
    /// Recorded JSONL capture file
    Replay,
}

/// Device link configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct DeviceConfig {
    /// Transport kind
    #[serde(default)]
    pub transport: TransportKind,

    /// Socket address or capture file path
    #[serde(default = "default_address")]
    #[validate(length(min = 1))]
    pub address: String,

    /// Display name (optional)
    #[serde(default)]
    pub name: Option<String>,

    /// Connect timeout in milliseconds, must be > 0
    #[serde(default = "default_connect_timeout_ms")]
    #[validate(range(min = 1))]
    pub connect_timeout_ms: u64,

    /// Delay between replayed lines in milliseconds (replay only)
    #[serde(default)]
    pub replay_interval_ms: u64,
}

fn default_address() -> String {
    "192.168.4.1:8080".to_string()
}

fn default_connect_timeout_ms() -> u64 {
    5000
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            transport: TransportKind::default(),
            address: default_address(),
            name: None,
            connect_timeout_ms: default_connect_timeout_ms(),
            replay_interval_ms: 0,
        }
    }
}

impl DeviceConfig {
    /// Device reference for the Connection Manager
    pub fn device_ref(&self) -> DeviceRef {
        DeviceRef {
            address: self.address.clone(),
            name: self.name.clone(),
        }
    }

    /// Connect timeout as a `Duration`
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Replay pacing as a `Duration`
    pub fn replay_interval(&self) -> Duration {
        Duration::from_millis(self.replay_interval_ms)
    }
}

/// Live display configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct DisplayConfig {
    /// Realtime window capacity
    #[serde(default = "default_chart_data_limit")]
    #[validate(range(min = 10, max = 1000))]
    pub chart_data_limit: usize,
}

fn default_chart_data_limit() -> usize {
    CHART_LIMIT_DEFAULT
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            chart_data_limit: CHART_LIMIT_DEFAULT,
        }
    }
}

/// Storage locations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding the history and session stores
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Directory receiving CSV exports
    #[serde(default = "default_export_dir")]
    pub export_dir: PathBuf,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./airscout-data")
}

fn default_export_dir() -> PathBuf {
    PathBuf::from("./airscout-exports")
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            export_dir: default_export_dir(),
        }
    }
}

/// Validate a chart data limit
///
/// Out-of-range values are rejected, never clamped.
pub fn validate_chart_limit(limit: usize) -> Result<(), ContractError> {
    if (CHART_LIMIT_MIN..=CHART_LIMIT_MAX).contains(&limit) {
        Ok(())
    } else {
        Err(ContractError::config_validation(
            "display.chart_data_limit",
            format!(
                "chart_data_limit must be between {CHART_LIMIT_MIN} and {CHART_LIMIT_MAX}, got {limit}"
            ),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings_are_valid() {
        let settings = MonitorSettings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.display.chart_data_limit, 100);
        assert_eq!(settings.device.address, "192.168.4.1:8080");
        assert_eq!(settings.device.connect_timeout_ms, 5000);
    }

    #[test]
    fn test_chart_limit_bounds() {
        assert!(validate_chart_limit(10).is_ok());
        assert!(validate_chart_limit(1000).is_ok());
        assert!(validate_chart_limit(9).is_err());
        assert!(validate_chart_limit(1001).is_err());
    }

    #[test]
    fn test_derive_rejects_out_of_range_limit() {
        let mut settings = MonitorSettings::default();
        settings.display.chart_data_limit = 5;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_derive_rejects_empty_key() {
        let mut settings = MonitorSettings::default();
        settings.field_mapping.battery.clear();
        assert!(settings.validate().is_err());
    }
}
