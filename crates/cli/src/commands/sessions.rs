//! `sessions` command implementation.

use anyhow::{Context, Result};
use archive::{Session, SessionId};
use serde::Serialize;

use super::load_settings;
use crate::cli::{SessionsAction, SessionsArgs};
use crate::error::CliError;
use crate::pipeline::FileMonitor;

/// Session listing entry for JSON output
#[derive(Serialize)]
struct SessionInfo {
    id: u64,
    name: String,
    start_time: String,
    end_time: String,
    duration_minutes: i64,
    readings: usize,
}

impl From<&Session> for SessionInfo {
    fn from(session: &Session) -> Self {
        Self {
            id: session.id.0,
            name: session.name.clone(),
            start_time: session.start_time.to_rfc3339(),
            end_time: session.end_time.to_rfc3339(),
            duration_minutes: session.duration_minutes(),
            readings: session.reading_count,
        }
    }
}

/// Execute the `sessions` command
pub async fn run_sessions(args: &SessionsArgs) -> Result<()> {
    let settings = load_settings(&args.config)?;

    let output_dir = match &args.action {
        SessionsAction::Export { output_dir, .. } => output_dir.clone(),
        _ => None,
    };
    let monitor = FileMonitor::open_with_export_dir(&settings, output_dir)?;

    let result = execute(&args.action, &monitor).await;
    monitor.shutdown().await;
    result
}

async fn execute(action: &SessionsAction, monitor: &FileMonitor) -> Result<()> {
    let sessions = monitor.sessions();

    match action {
        SessionsAction::List { json } => {
            let list = sessions.list().await.context("Failed to list sessions")?;
            let infos: Vec<SessionInfo> = list.iter().map(SessionInfo::from).collect();
            if *json {
                let json = serde_json::to_string_pretty(&infos)
                    .context("Failed to serialize sessions")?;
                println!("{}", json);
            } else {
                print_sessions(&infos);
            }
        }
        SessionsAction::Export { id, .. } => {
            let result = sessions.export(SessionId(*id), monitor.exporter()).await;
            observability::record_export("session", result.is_ok());
            let path = result.with_context(|| format!("Failed to export session {id}"))?;
            println!("✓ Session {} exported to {}", id, path.display());
        }
        SessionsAction::Delete { id } => {
            sessions
                .delete(SessionId(*id))
                .await
                .with_context(|| format!("Failed to delete session {id}"))?;
            println!("✓ Session {} deleted", id);
        }
        SessionsAction::Clear { yes } => {
            if !*yes {
                return Err(CliError::not_confirmed("delete all sessions").into());
            }
            let removed = sessions
                .delete_all()
                .await
                .context("Failed to delete sessions")?;
            println!("✓ {} sessions deleted", removed);
        }
    }
    Ok(())
}

fn print_sessions(sessions: &[SessionInfo]) {
    if sessions.is_empty() {
        println!("No saved sessions");
        return;
    }

    println!(
        "{:>5}  {:<32} {:<26} {:>8} {:>9}",
        "ID", "Name", "Start", "Minutes", "Readings"
    );
    for s in sessions {
        println!(
            "{:>5}  {:<32} {:<26} {:>8} {:>9}",
            s.id, s.name, s.start_time, s.duration_minutes, s.readings
        );
    }
}
