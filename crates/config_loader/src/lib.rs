//! # Config Loader
//!
//! Settings loading and persistence module.
//!
//! Responsibilities:
//! - Parse TOML/JSON settings files
//! - Validate settings (mapping keys, chart data limit, device link)
//! - Generate `MonitorSettings`
//! - Save updated settings without ever persisting an invalid state
//!
//! # Example
//!
//! ```no_run
//! use config_loader::ConfigLoader;
//! use std::path::Path;
//!
//! let settings = ConfigLoader::load_from_path(Path::new("airscout.toml")).unwrap();
//! println!("Device: {}", settings.device.address);
//! ```

mod parser;
mod validator;

pub use contracts::MonitorSettings;
pub use parser::ConfigFormat;

use std::io::Write;
use std::path::Path;

use contracts::{validate_chart_limit, ContractError, FieldMapping};
use tracing::{debug, info};

/// Settings loader
///
/// Provides static methods to load, update and save settings.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load settings from file path
    ///
    /// Automatically detects format from file extension (.toml / .json).
    ///
    /// # Errors
    /// - File read failure
    /// - Unsupported format
    /// - Parse failure
    /// - Validation failure
    pub fn load_from_path(path: &Path) -> Result<MonitorSettings, ContractError> {
        let format = Self::detect_format(path)?;
        let content = Self::read_file(path)?;
        Self::load_from_str(&content, format)
    }

    /// Load settings from file path, falling back to defaults when the file is missing
    pub fn load_or_default(path: &Path) -> Result<MonitorSettings, ContractError> {
        if path.exists() {
            Self::load_from_path(path)
        } else {
            debug!(path = %path.display(), "settings file not found, using defaults");
            Ok(MonitorSettings::default())
        }
    }

    /// Load settings from string
    ///
    /// # Errors
    /// - Parse failure
    /// - Validation failure
    pub fn load_from_str(
        content: &str,
        format: ConfigFormat,
    ) -> Result<MonitorSettings, ContractError> {
        Self::parse_and_validate(content, format)
    }

    /// Validate settings without loading them
    pub fn validate(settings: &MonitorSettings) -> Result<(), ContractError> {
        validator::validate(settings)
    }

    /// Serialize MonitorSettings to TOML string
    pub fn to_toml(settings: &MonitorSettings) -> Result<String, ContractError> {
        toml::to_string_pretty(settings)
            .map_err(|e| ContractError::config_parse(format!("TOML serialize error: {e}")))
    }

    /// Serialize MonitorSettings to JSON string
    pub fn to_json(settings: &MonitorSettings) -> Result<String, ContractError> {
        serde_json::to_string_pretty(settings)
            .map_err(|e| ContractError::config_parse(format!("JSON serialize error: {e}")))
    }

    /// Validate and save settings to file path
    ///
    /// The file is written to a temporary sibling and renamed into place, so a
    /// failed save leaves the previous file intact.
    pub fn save_to_path(settings: &MonitorSettings, path: &Path) -> Result<(), ContractError> {
        validator::validate(settings)?;

        let content = match Self::detect_format(path)? {
            ConfigFormat::Toml => Self::to_toml(settings)?,
            ConfigFormat::Json => Self::to_json(settings)?,
        };

        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir)?;

        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(content.as_bytes())?;
        tmp.flush()?;
        tmp.persist(path).map_err(|e| ContractError::Io(e.error))?;

        info!(path = %path.display(), "settings saved");
        Ok(())
    }

    /// Replace the field mapping, rejecting empty keys
    pub fn update_field_mapping(
        settings: &mut MonitorSettings,
        mapping: FieldMapping,
    ) -> Result<(), ContractError> {
        mapping.ensure_complete()?;
        settings.field_mapping = mapping;
        Ok(())
    }

    /// Replace the chart data limit, rejecting out-of-range values
    pub fn update_chart_limit(
        settings: &mut MonitorSettings,
        limit: usize,
    ) -> Result<(), ContractError> {
        validate_chart_limit(limit)?;
        settings.display.chart_data_limit = limit;
        Ok(())
    }
}

impl ConfigLoader {
    /// Infer settings format from file extension
    fn detect_format(path: &Path) -> Result<ConfigFormat, ContractError> {
        let ext = path.extension().and_then(|e| e.to_str()).ok_or_else(|| {
            ContractError::config_parse("cannot determine file format from extension")
        })?;

        ConfigFormat::from_extension(ext).ok_or_else(|| {
            ContractError::config_parse(format!("unsupported config format: .{ext}"))
        })
    }

    /// Read settings file content
    fn read_file(path: &Path) -> Result<String, ContractError> {
        Ok(std::fs::read_to_string(path)?)
    }

    /// Parse and validate settings content
    fn parse_and_validate(
        content: &str,
        format: ConfigFormat,
    ) -> Result<MonitorSettings, ContractError> {
        let settings = parser::parse(content, format)?;
        validator::validate(&settings)?;
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::CanonicalField;
    use tempfile::tempdir;

    const MINIMAL_TOML: &str = r#"
[device]
address = "192.168.4.1:8080"
name = "AirScout32"

[field_mapping]
temperature = "tmp"
humidity = "hum"
gas1 = "CO2"
gas2 = "VOC+CO"
battery = "Akku"

[display]
chart_data_limit = 120
"#;

    #[test]
    fn test_load_from_str_toml() {
        let settings = ConfigLoader::load_from_str(MINIMAL_TOML, ConfigFormat::Toml).unwrap();
        assert_eq!(settings.device.address, "192.168.4.1:8080");
        assert_eq!(settings.display.chart_data_limit, 120);
    }

    #[test]
    fn test_round_trip_toml() {
        let settings = ConfigLoader::load_from_str(MINIMAL_TOML, ConfigFormat::Toml).unwrap();
        let serialized = ConfigLoader::to_toml(&settings).unwrap();
        let back = ConfigLoader::load_from_str(&serialized, ConfigFormat::Toml).unwrap();
        assert_eq!(settings, back);
    }

    #[test]
    fn test_round_trip_json() {
        let settings = ConfigLoader::load_from_str(MINIMAL_TOML, ConfigFormat::Toml).unwrap();
        let json = ConfigLoader::to_json(&settings).unwrap();
        let back = ConfigLoader::load_from_str(&json, ConfigFormat::Json).unwrap();
        assert_eq!(settings, back);
    }

    #[test]
    fn test_validation_runs_after_parse() {
        let content = "[display]\nchart_data_limit = 2000\n";
        let result = ConfigLoader::load_from_str(content, ConfigFormat::Toml);
        assert!(result.unwrap_err().to_string().contains("chart_data_limit"));
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let dir = tempdir().unwrap();
        let settings = ConfigLoader::load_or_default(&dir.path().join("none.toml")).unwrap();
        assert_eq!(settings, MonitorSettings::default());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("airscout.toml");

        let mut settings = MonitorSettings::default();
        ConfigLoader::update_chart_limit(&mut settings, 500).unwrap();
        ConfigLoader::save_to_path(&settings, &path).unwrap();

        let loaded = ConfigLoader::load_from_path(&path).unwrap();
        assert_eq!(loaded.display.chart_data_limit, 500);
    }

    #[test]
    fn test_invalid_settings_never_saved() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("airscout.json");

        let mut settings = MonitorSettings::default();
        settings.field_mapping.temperature.clear();
        assert!(ConfigLoader::save_to_path(&settings, &path).is_err());
        assert!(!path.exists());
    }

    #[test]
    fn test_update_rejects_without_mutating() {
        let mut settings = MonitorSettings::default();

        assert!(ConfigLoader::update_chart_limit(&mut settings, 5).is_err());
        assert_eq!(settings.display.chart_data_limit, 100);

        let mut mapping = FieldMapping::default();
        mapping.set_key(CanonicalField::Gas1, "");
        assert!(ConfigLoader::update_field_mapping(&mut settings, mapping).is_err());
        assert_eq!(settings.field_mapping, FieldMapping::default());
    }
}
