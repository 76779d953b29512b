//! CLI argument definitions using clap.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// AirScout - Sensor telemetry pipeline for AirScout devices
#[derive(Parser, Debug)]
#[command(
    name = "airscout",
    author,
    version,
    about = "AirScout sensor telemetry pipeline",
    long_about = "Streams JSON readings from an AirScout device, keeps a live window,\n\
                  archives every reading and saves named sessions that can be\n\
                  exported to CSV."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "AIRSCOUT_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "AIRSCOUT_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Connect to the device and record readings
    Run(RunArgs),

    /// Validate settings file without running
    Validate(ValidateArgs),

    /// Display settings information
    Info(InfoArgs),

    /// Inspect, export or clear the reading history
    History(HistoryArgs),

    /// Manage saved sessions
    Sessions(SessionsArgs),

    /// Edit the field mapping
    Mapping(MappingArgs),
}

/// Settings file location shared by every command
#[derive(Args, Debug, Clone)]
pub struct ConfigArg {
    /// Path to settings file (TOML or JSON)
    #[arg(
        short,
        long,
        default_value = "airscout.toml",
        env = "AIRSCOUT_CONFIG"
    )]
    pub config: PathBuf,
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    #[command(flatten)]
    pub config: ConfigArg,

    /// Override the transport from settings
    #[arg(long, value_enum, env = "AIRSCOUT_TRANSPORT")]
    pub transport: Option<TransportArg>,

    /// Override the device address (host:port, or capture file for replay)
    #[arg(long, env = "AIRSCOUT_ADDRESS")]
    pub address: Option<String>,

    /// Override the live window size (10..=1000)
    #[arg(long, env = "AIRSCOUT_CHART_LIMIT")]
    pub chart_limit: Option<usize>,

    /// Stop after this many readings (0 = unlimited)
    #[arg(long, default_value = "0", env = "AIRSCOUT_MAX_READINGS")]
    pub max_readings: u64,

    /// Stop after this many seconds (0 = no timeout)
    #[arg(long, default_value = "0", env = "AIRSCOUT_TIMEOUT")]
    pub timeout: u64,

    /// Save the live window as a session with this name when the run ends
    /// (an empty name uses the default "Session dd.MM.yyyy HH:mm")
    #[arg(long, env = "AIRSCOUT_SESSION_NAME")]
    pub session_name: Option<String>,

    /// Export the full history to CSV when the run ends
    #[arg(long)]
    pub export_history: bool,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "AIRSCOUT_METRICS_PORT")]
    pub metrics_port: u16,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    #[command(flatten)]
    pub config: ConfigArg,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    #[command(flatten)]
    pub config: ConfigArg,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `history` command
#[derive(Parser, Debug)]
pub struct HistoryArgs {
    #[command(flatten)]
    pub config: ConfigArg,

    #[command(subcommand)]
    pub action: HistoryAction,
}

#[derive(Subcommand, Debug)]
pub enum HistoryAction {
    /// Export every archived reading to CSV
    Export {
        /// Directory receiving the file (defaults to storage.export_dir)
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },

    /// Print the most recent readings, newest first
    Show {
        /// Number of readings to print
        #[arg(long, default_value = "20")]
        limit: usize,
    },

    /// Delete all archived readings
    Clear {
        /// Confirm the deletion
        #[arg(long)]
        yes: bool,
    },
}

/// Arguments for the `sessions` command
#[derive(Parser, Debug)]
pub struct SessionsArgs {
    #[command(flatten)]
    pub config: ConfigArg,

    #[command(subcommand)]
    pub action: SessionsAction,
}

#[derive(Subcommand, Debug)]
pub enum SessionsAction {
    /// List saved sessions, newest first
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Export one session to CSV
    Export {
        /// Session id
        id: u64,

        /// Directory receiving the file (defaults to storage.export_dir)
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },

    /// Delete one session
    Delete {
        /// Session id
        id: u64,
    },

    /// Delete every session
    Clear {
        /// Confirm the deletion
        #[arg(long)]
        yes: bool,
    },
}

/// Arguments for the `mapping` command
#[derive(Parser, Debug)]
pub struct MappingArgs {
    #[command(flatten)]
    pub config: ConfigArg,

    #[command(subcommand)]
    pub action: MappingAction,
}

#[derive(Subcommand, Debug)]
pub enum MappingAction {
    /// Print the active field mapping
    Show,

    /// Change one or more mapping keys and save the settings file
    Set(MappingKeys),
}

/// Source keys to assign, unset fields keep their current key
#[derive(Args, Debug, Clone, Default)]
pub struct MappingKeys {
    #[arg(long)]
    pub temperature: Option<String>,

    #[arg(long)]
    pub humidity: Option<String>,

    #[arg(long)]
    pub gas1: Option<String>,

    #[arg(long)]
    pub gas2: Option<String>,

    #[arg(long)]
    pub battery: Option<String>,
}

/// Transport selection
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransportArg {
    /// Line stream over TCP
    Tcp,
    /// Recorded JSONL capture file
    Replay,
}

impl From<TransportArg> for contracts::TransportKind {
    fn from(arg: TransportArg) -> Self {
        match arg {
            TransportArg::Tcp => contracts::TransportKind::Tcp,
            TransportArg::Replay => contracts::TransportKind::Replay,
        }
    }
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(arg: LogFormat) -> Self {
        match arg {
            LogFormat::Json => observability::LogFormat::Json,
            LogFormat::Pretty => observability::LogFormat::Pretty,
            LogFormat::Compact => observability::LogFormat::Compact,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_run_overrides() {
        let cli = Cli::try_parse_from([
            "airscout",
            "run",
            "--transport",
            "replay",
            "--address",
            "capture.jsonl",
            "--chart-limit",
            "50",
            "--max-readings",
            "10",
            "--session-name",
            "Office",
        ])
        .unwrap();

        let Commands::Run(args) = cli.command else {
            panic!("expected run command");
        };
        assert_eq!(args.transport, Some(TransportArg::Replay));
        assert_eq!(args.address.as_deref(), Some("capture.jsonl"));
        assert_eq!(args.chart_limit, Some(50));
        assert_eq!(args.max_readings, 10);
        assert_eq!(args.session_name.as_deref(), Some("Office"));
        assert!(!args.export_history);
    }

    #[test]
    fn test_log_flags_reach_observability_config() {
        let cli = Cli::try_parse_from(["airscout", "-vv", "--log-format", "json", "info"]).unwrap();
        assert_eq!(
            observability::LogFormat::from(cli.log_format),
            observability::LogFormat::Json
        );

        let config = observability::ObservabilityConfig::default()
            .with_verbosity(cli.verbose, cli.quiet);
        assert_eq!(config.default_log_level, "trace");
        assert!(!config.ignore_env);
    }

    #[test]
    fn test_parse_sessions_export() {
        let cli = Cli::try_parse_from(["airscout", "sessions", "export", "7"]).unwrap();
        let Commands::Sessions(args) = cli.command else {
            panic!("expected sessions command");
        };
        assert!(matches!(
            args.action,
            SessionsAction::Export { id: 7, output_dir: None }
        ));
    }

    #[test]
    fn test_parse_mapping_set() {
        let cli = Cli::try_parse_from(["airscout", "mapping", "set", "--gas1", "co2_ppm"]).unwrap();
        let Commands::Mapping(args) = cli.command else {
            panic!("expected mapping command");
        };
        let MappingAction::Set(keys) = args.action else {
            panic!("expected set action");
        };
        assert_eq!(keys.gas1.as_deref(), Some("co2_ppm"));
        assert!(keys.temperature.is_none());
    }
}
