//! `run` command implementation.

use anyhow::{Context, Result};
use config_loader::ConfigLoader;
use contracts::MonitorSettings;
use std::time::Duration;
use tracing::{info, warn};

use super::load_settings;
use crate::cli::RunArgs;
use crate::pipeline::{Pipeline, PipelineConfig};

/// Execute the `run` command
pub async fn run_pipeline(args: &RunArgs) -> Result<()> {
    let mut settings = load_settings(&args.config)?;
    apply_overrides(&mut settings, args)?;
    ConfigLoader::validate(&settings).context("Invalid settings")?;

    info!(
        transport = ?settings.device.transport,
        address = %settings.device.address,
        chart_data_limit = settings.display.chart_data_limit,
        data_dir = %settings.storage.data_dir.display(),
        "Settings loaded"
    );

    let pipeline_config = PipelineConfig {
        settings,
        max_readings: if args.max_readings == 0 {
            None
        } else {
            Some(args.max_readings)
        },
        timeout: if args.timeout == 0 {
            None
        } else {
            Some(Duration::from_secs(args.timeout))
        },
        session_name: args.session_name.clone(),
        export_history: args.export_history,
        metrics_port: if args.metrics_port == 0 {
            None
        } else {
            Some(args.metrics_port)
        },
    };

    info!("Starting pipeline...");

    let stats = Pipeline::new(pipeline_config)
        .run(setup_shutdown_signal())
        .await
        .context("Pipeline execution failed")?;

    info!(
        readings = stats.readings_received,
        stop_reason = %stats.stop_reason,
        duration_secs = stats.duration.as_secs_f64(),
        "Pipeline completed"
    );
    stats.print_summary();

    info!("AirScout finished");
    Ok(())
}

/// Apply CLI overrides on top of file settings
fn apply_overrides(settings: &mut MonitorSettings, args: &RunArgs) -> Result<()> {
    if let Some(transport) = args.transport {
        info!(transport = ?transport, "Overriding transport from CLI");
        settings.device.transport = transport.into();
    }
    if let Some(ref address) = args.address {
        info!(address = %address, "Overriding device address from CLI");
        settings.device.address = address.clone();
    }
    if let Some(limit) = args.chart_limit {
        info!(limit, "Overriding chart data limit from CLI");
        ConfigLoader::update_chart_limit(settings, limit)
            .context("Invalid --chart-limit")?;
    }
    Ok(())
}

/// Resolve on Ctrl+C or SIGTERM
///
/// A handler that cannot be installed never resolves.
async fn setup_shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
