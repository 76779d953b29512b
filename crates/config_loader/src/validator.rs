//! Settings validation
//!
//! Rules:
//! - every field mapping key is non-empty
//! - chart_data_limit within [10, 1000], rejected rather than clamped
//! - device address non-empty
//! - connect_timeout_ms > 0

use contracts::{validate_chart_limit, ContractError, MonitorSettings};
use validator::Validate;

/// Validate MonitorSettings
///
/// Returns the first error encountered, or Ok(()).
pub fn validate(settings: &MonitorSettings) -> Result<(), ContractError> {
    validate_field_mapping(settings)?;
    validate_display(settings)?;
    validate_device(settings)?;
    validate_derived(settings)?;
    Ok(())
}

/// Validate field mapping keys
fn validate_field_mapping(settings: &MonitorSettings) -> Result<(), ContractError> {
    settings.field_mapping.ensure_complete()
}

/// Validate display window limits
fn validate_display(settings: &MonitorSettings) -> Result<(), ContractError> {
    validate_chart_limit(settings.display.chart_data_limit)
}

/// Validate device link settings
fn validate_device(settings: &MonitorSettings) -> Result<(), ContractError> {
    let device = &settings.device;

    if device.address.trim().is_empty() {
        return Err(ContractError::config_validation(
            "device.address",
            "device address cannot be empty",
        ));
    }

    if device.connect_timeout_ms == 0 {
        return Err(ContractError::config_validation(
            "device.connect_timeout_ms",
            "connect_timeout_ms must be > 0",
        ));
    }

    Ok(())
}

/// Run the derive-based rules declared on the contract types
fn validate_derived(settings: &MonitorSettings) -> Result<(), ContractError> {
    settings
        .validate()
        .map_err(|e| ContractError::config_validation("settings", e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::CanonicalField;

    #[test]
    fn test_default_settings_valid() {
        assert!(validate(&MonitorSettings::default()).is_ok());
    }

    #[test]
    fn test_empty_mapping_key_rejected() {
        let mut settings = MonitorSettings::default();
        settings.field_mapping.set_key(CanonicalField::Humidity, "");
        let err = validate(&settings).unwrap_err();
        assert!(matches!(err, ContractError::ConfigValidation { ref field, .. } if field == "field_mapping.humidity"));
    }

    #[test]
    fn test_chart_limit_out_of_range_rejected() {
        for limit in [0, 9, 1001, 5000] {
            let mut settings = MonitorSettings::default();
            settings.display.chart_data_limit = limit;
            let err = validate(&settings).unwrap_err();
            assert!(err.to_string().contains("chart_data_limit"), "{err}");
        }
    }

    #[test]
    fn test_chart_limit_bounds_accepted() {
        for limit in [10, 100, 1000] {
            let mut settings = MonitorSettings::default();
            settings.display.chart_data_limit = limit;
            assert!(validate(&settings).is_ok());
        }
    }

    #[test]
    fn test_blank_address_rejected() {
        let mut settings = MonitorSettings::default();
        settings.device.address = "  ".into();
        let err = validate(&settings).unwrap_err();
        assert!(err.to_string().contains("device.address"));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let mut settings = MonitorSettings::default();
        settings.device.connect_timeout_ms = 0;
        assert!(validate(&settings).is_err());
    }
}
