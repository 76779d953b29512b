//! `mapping` command implementation.

use anyhow::{Context, Result};
use config_loader::ConfigLoader;
use contracts::{CanonicalField, FieldMapping};
use tracing::info;

use super::load_settings;
use crate::cli::{MappingAction, MappingArgs, MappingKeys};

/// Execute the `mapping` command
pub fn run_mapping(args: &MappingArgs) -> Result<()> {
    let mut settings = load_settings(&args.config)?;

    match &args.action {
        MappingAction::Show => print_mapping(&settings.field_mapping),
        MappingAction::Set(keys) => {
            let mapping = apply_keys(&settings.field_mapping, keys);
            ConfigLoader::update_field_mapping(&mut settings, mapping)
                .context("Invalid field mapping")?;
            ConfigLoader::save_to_path(&settings, &args.config.config).with_context(|| {
                format!("Failed to save settings to {}", args.config.config.display())
            })?;

            info!(config = %args.config.config.display(), "Field mapping updated");
            println!("✓ Field mapping saved to {}", args.config.config.display());
            print_mapping(&settings.field_mapping);
        }
    }

    Ok(())
}

/// Overlay the given keys on the current mapping
fn apply_keys(current: &FieldMapping, keys: &MappingKeys) -> FieldMapping {
    let mut mapping = current.clone();
    let overrides = [
        (CanonicalField::Temperature, &keys.temperature),
        (CanonicalField::Humidity, &keys.humidity),
        (CanonicalField::Gas1, &keys.gas1),
        (CanonicalField::Gas2, &keys.gas2),
        (CanonicalField::Battery, &keys.battery),
    ];
    for (field, key) in overrides {
        if let Some(key) = key {
            mapping.set_key(field, key.as_str());
        }
    }
    mapping
}

fn print_mapping(mapping: &FieldMapping) {
    for (field, key) in mapping.entries() {
        println!("  {:<12} <- \"{}\"", field.name(), key);
    }
}
