//! `history` command implementation.

use anyhow::{Context, Result};
use archive::csv::render_row;
use archive::CSV_HEADER;
use chrono::Utc;

use super::load_settings;
use crate::cli::{HistoryAction, HistoryArgs};
use crate::error::CliError;
use crate::pipeline::FileMonitor;

/// Execute the `history` command
pub async fn run_history(args: &HistoryArgs) -> Result<()> {
    let settings = load_settings(&args.config)?;

    let output_dir = match &args.action {
        HistoryAction::Export { output_dir } => output_dir.clone(),
        _ => None,
    };
    let monitor = FileMonitor::open_with_export_dir(&settings, output_dir)?;

    let result = execute(&args.action, &monitor).await;
    monitor.shutdown().await;
    result
}

async fn execute(action: &HistoryAction, monitor: &FileMonitor) -> Result<()> {
    match action {
        HistoryAction::Export { .. } => {
            let path = monitor
                .export_history(Utc::now())
                .await
                .context("Failed to export history")?;
            println!("✓ History exported to {}", path.display());
        }
        HistoryAction::Show { limit } => {
            let readings = monitor
                .history()
                .query_recent(*limit)
                .await
                .context("Failed to query history")?;
            if readings.is_empty() {
                println!("No readings archived");
            } else {
                println!("{CSV_HEADER}");
                for reading in &readings {
                    println!("{}", render_row(reading));
                }
            }
        }
        HistoryAction::Clear { yes } => {
            if !*yes {
                return Err(CliError::not_confirmed("delete all history").into());
            }
            monitor
                .clear_history()
                .await
                .context("Failed to clear history")?;
            println!("✓ History cleared");
        }
    }
    Ok(())
}
