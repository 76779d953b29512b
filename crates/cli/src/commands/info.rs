//! `info` command implementation.

use anyhow::{Context, Result};
use contracts::MonitorSettings;
use serde::Serialize;

use super::load_existing_settings;
use crate::cli::InfoArgs;

/// Settings info for JSON output
#[derive(Serialize)]
struct SettingsInfo {
    version: String,
    device: DeviceInfo,
    field_mapping: Vec<MappingInfo>,
    chart_data_limit: usize,
    data_dir: String,
    export_dir: String,
}

#[derive(Serialize)]
struct DeviceInfo {
    transport: String,
    address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    connect_timeout_ms: u64,
    replay_interval_ms: u64,
}

#[derive(Serialize)]
struct MappingInfo {
    field: &'static str,
    key: String,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    let settings = load_existing_settings(&args.config)?;

    if args.json {
        let info = build_settings_info(&settings);
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize settings info")?;
        println!("{}", json);
    } else {
        print_settings_info(&settings);
    }

    Ok(())
}

fn build_settings_info(settings: &MonitorSettings) -> SettingsInfo {
    SettingsInfo {
        version: format!("{:?}", settings.version),
        device: DeviceInfo {
            transport: format!("{:?}", settings.device.transport),
            address: settings.device.address.clone(),
            name: settings.device.name.clone(),
            connect_timeout_ms: settings.device.connect_timeout_ms,
            replay_interval_ms: settings.device.replay_interval_ms,
        },
        field_mapping: settings
            .field_mapping
            .entries()
            .map(|(field, key)| MappingInfo {
                field: field.name(),
                key: key.to_string(),
            })
            .collect(),
        chart_data_limit: settings.display.chart_data_limit,
        data_dir: settings.storage.data_dir.display().to_string(),
        export_dir: settings.storage.export_dir.display().to_string(),
    }
}

fn print_settings_info(settings: &MonitorSettings) {
    println!("=== AirScout Settings ===\n");

    let device = &settings.device;
    println!("Device");
    println!("   ├─ Version: {:?}", settings.version);
    println!("   ├─ Transport: {:?}", device.transport);
    println!("   ├─ Address: {}", device.address);
    println!("   ├─ Connect timeout: {} ms", device.connect_timeout_ms);
    match &device.name {
        Some(name) => println!("   └─ Name: {}", name),
        None => println!("   └─ Name: (unset)"),
    }

    println!("\nField Mapping");
    let entries: Vec<_> = settings.field_mapping.entries().collect();
    for (i, (field, key)) in entries.iter().enumerate() {
        let prefix = if i == entries.len() - 1 { "└─" } else { "├─" };
        println!("   {} {} <- \"{}\"", prefix, field.name(), key);
    }

    println!("\nDisplay");
    println!("   └─ Chart data limit: {}", settings.display.chart_data_limit);

    println!("\nStorage");
    println!("   ├─ Data dir: {}", settings.storage.data_dir.display());
    println!("   └─ Export dir: {}", settings.storage.export_dir.display());

    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_info_lists_every_mapping_entry() {
        let info = build_settings_info(&MonitorSettings::default());
        let keys: Vec<&str> = info.field_mapping.iter().map(|m| m.key.as_str()).collect();
        assert_eq!(keys, ["tmp", "hum", "CO2", "VOC+CO", "Akku"]);
        assert_eq!(info.chart_data_limit, 100);
    }
}
