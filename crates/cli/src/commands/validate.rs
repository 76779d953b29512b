//! `validate` command implementation.

use anyhow::{Context, Result};
use config_loader::ConfigLoader;
use contracts::{MonitorSettings, TransportKind};
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<SettingsSummary>,
}

#[derive(Serialize)]
struct SettingsSummary {
    version: String,
    transport: String,
    address: String,
    chart_data_limit: usize,
    data_dir: String,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.config.display(), "Validating settings");

    let result = validate_settings(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Settings validation failed")
    }
}

fn validate_settings(args: &ValidateArgs) -> ValidationResult {
    let path = &args.config.config;
    let config_path = path.display().to_string();

    if !path.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", path.display())),
            warnings: None,
            summary: None,
        };
    }

    match ConfigLoader::load_from_path(path) {
        Ok(settings) => {
            let warnings = collect_warnings(&settings);
            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: if warnings.is_empty() {
                    None
                } else {
                    Some(warnings)
                },
                summary: Some(SettingsSummary {
                    version: format!("{:?}", settings.version),
                    transport: format!("{:?}", settings.device.transport),
                    address: settings.device.address.clone(),
                    chart_data_limit: settings.display.chart_data_limit,
                    data_dir: settings.storage.data_dir.display().to_string(),
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

/// Collect non-fatal issues
fn collect_warnings(settings: &MonitorSettings) -> Vec<String> {
    let mut warnings = Vec::new();

    if settings.device.name.is_none() {
        warnings.push("device.name is not set - logs will show the address only".to_string());
    }

    match settings.device.transport {
        TransportKind::Replay => {
            if !std::path::Path::new(&settings.device.address).exists() {
                warnings.push(format!(
                    "replay capture file not found: {}",
                    settings.device.address
                ));
            }
        }
        TransportKind::Tcp => {
            if settings.device.replay_interval_ms > 0 {
                warnings.push("device.replay_interval_ms is ignored by the tcp transport".to_string());
            }
        }
    }

    let mut keys: Vec<&str> = settings.field_mapping.entries().map(|(_, key)| key).collect();
    keys.sort_unstable();
    keys.dedup();
    if keys.len() < 5 {
        warnings.push("field_mapping maps several fields to the same source key".to_string());
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Settings are valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!("  Transport: {}", summary.transport);
            println!("  Address: {}", summary.address);
            println!("  Chart data limit: {}", summary.chart_data_limit);
            println!("  Data dir: {}", summary.data_dir);
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Settings are invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::ConfigArg;
    use contracts::CanonicalField;
    use tempfile::tempdir;

    fn args(path: std::path::PathBuf) -> ValidateArgs {
        ValidateArgs {
            config: ConfigArg { config: path },
            json: true,
        }
    }

    #[test]
    fn test_missing_file_is_invalid() {
        let dir = tempdir().unwrap();
        let result = validate_settings(&args(dir.path().join("missing.toml")));
        assert!(!result.valid);
        assert!(result.error.unwrap().contains("File not found"));
    }

    #[test]
    fn test_out_of_range_limit_is_invalid() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("airscout.toml");
        std::fs::write(&path, "[display]\nchart_data_limit = 5000\n").unwrap();

        let result = validate_settings(&args(path));
        assert!(!result.valid);
        assert!(result.error.unwrap().contains("chart_data_limit"));
    }

    #[test]
    fn test_valid_file_has_summary() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("airscout.toml");
        std::fs::write(&path, "[device]\naddress = \"10.0.0.5:8080\"\nname = \"Lab\"\n").unwrap();

        let result = validate_settings(&args(path));
        assert!(result.valid);
        assert_eq!(result.summary.unwrap().address, "10.0.0.5:8080");
        assert!(result.warnings.is_none());
    }

    #[test]
    fn test_duplicate_mapping_keys_warned() {
        let mut settings = MonitorSettings::default();
        settings.device.name = Some("Lab".into());
        settings.field_mapping.set_key(CanonicalField::Gas2, "CO2");

        let warnings = collect_warnings(&settings);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("same source key"));
    }
}
