//! Command implementations.

mod history;
mod info;
mod mapping;
mod run;
mod sessions;
mod validate;

pub use history::run_history;
pub use info::run_info;
pub use mapping::run_mapping;
pub use run::run_pipeline;
pub use sessions::run_sessions;
pub use validate::run_validate;

use anyhow::{Context, Result};
use config_loader::ConfigLoader;
use contracts::MonitorSettings;
use tracing::info;

use crate::cli::ConfigArg;
use crate::error::CliError;

/// Load settings, falling back to defaults when the file does not exist
fn load_settings(arg: &ConfigArg) -> Result<MonitorSettings> {
    info!(config = %arg.config.display(), "Loading settings");
    ConfigLoader::load_or_default(&arg.config)
        .with_context(|| format!("Failed to load settings from {}", arg.config.display()))
}

/// Load settings from a file that must exist
fn load_existing_settings(arg: &ConfigArg) -> Result<MonitorSettings> {
    if !arg.config.exists() {
        return Err(CliError::config_not_found(arg.config.display().to_string()).into());
    }
    load_settings(arg)
}
