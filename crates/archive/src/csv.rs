//! CSV Exporter
//!
//! Column order is fixed: `Timestamp,Date,Time,Temperature,Humidity,Gas1,Gas2,Battery`.
//! `Timestamp` is epoch milliseconds; `Date` and `Time` are derived from it
//! in UTC. Files are written to a temporary sibling and renamed into place,
//! so an earlier export at the same path is never left half overwritten.

use std::fmt::Write as _;
use std::io::Write as _;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use contracts::{SensorReading, Session};
use tracing::{debug, instrument};

use crate::error::{ArchiveError, Result};

/// CSV header line
pub const CSV_HEADER: &str = "Timestamp,Date,Time,Temperature,Humidity,Gas1,Gas2,Battery";

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMAT: &str = "%H:%M:%S";
const META_TIME_FORMAT: &str = "%d.%m.%Y %H:%M:%S";
const FILE_STAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Metadata block written above a session export
#[derive(Debug, Clone, PartialEq)]
pub struct SessionHeader {
    pub name: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub duration_minutes: i64,
    pub data_points: usize,
}

impl From<&Session> for SessionHeader {
    fn from(session: &Session) -> Self {
        Self {
            name: session.name.clone(),
            start_time: session.start_time,
            end_time: session.end_time,
            duration_minutes: session.duration_minutes(),
            data_points: session.reading_count,
        }
    }
}

impl SessionHeader {
    fn render(&self, out: &mut String) {
        let _ = writeln!(out, "Session: {}", self.name);
        let _ = writeln!(out, "Start: {}", self.start_time.format(META_TIME_FORMAT));
        let _ = writeln!(out, "End: {}", self.end_time.format(META_TIME_FORMAT));
        let _ = writeln!(out, "Duration: {} minutes", self.duration_minutes);
        let _ = writeln!(out, "Data Points: {}", self.data_points);
        out.push('\n');
    }
}

/// Render one CSV row (no trailing newline)
pub fn render_row(reading: &SensorReading) -> String {
    format!(
        "{},{},{},{},{},{},{},{}",
        reading.timestamp_millis(),
        reading.timestamp.format(DATE_FORMAT),
        reading.timestamp.format(TIME_FORMAT),
        reading.temperature,
        reading.humidity,
        reading.gas1,
        reading.gas2,
        reading.battery,
    )
}

/// Render the complete file contents
pub fn render(readings: &[SensorReading], header: Option<&SessionHeader>) -> String {
    let mut out = String::with_capacity(64 * (readings.len() + 8));
    if let Some(header) = header {
        header.render(&mut out);
    }
    out.push_str(CSV_HEADER);
    out.push('\n');
    for reading in readings {
        out.push_str(&render_row(reading));
        out.push('\n');
    }
    out
}

/// File name for a session export
///
/// Every character of the session name outside `[A-Za-z0-9._-]` becomes an
/// underscore. The stamp is the session start.
pub fn session_file_name(session: &Session) -> String {
    let name: String = session
        .name
        .chars()
        .map(|c| match c {
            'A'..='Z' | 'a'..='z' | '0'..='9' | '.' | '_' | '-' => c,
            _ => '_',
        })
        .collect();
    format!(
        "session_{}_{}.csv",
        name,
        session.start_time.format(FILE_STAMP_FORMAT)
    )
}

/// File name for a history export made at `now`
pub fn history_file_name(now: DateTime<Utc>) -> String {
    format!("airscout_data_{}.csv", now.format(FILE_STAMP_FORMAT))
}

/// Writes CSV exports into a directory
#[derive(Debug, Clone)]
pub struct CsvExporter {
    dir: PathBuf,
}

impl CsvExporter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Export directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write `readings` to `file_name`, optionally preceded by a session header
    #[instrument(
        name = "csv_export",
        skip(self, readings, header),
        fields(rows = readings.len())
    )]
    pub fn export(
        &self,
        file_name: &str,
        readings: &[SensorReading],
        header: Option<&SessionHeader>,
    ) -> Result<PathBuf> {
        let path = self.dir.join(file_name);
        let content = render(readings, header);
        self.write_atomic(&path, content.as_bytes())
            .map_err(|e| ArchiveError::export(&path, e))?;

        metrics::counter!("airscout_exports_total").increment(1);
        debug!(path = %path.display(), "export written");
        Ok(path)
    }

    /// Export a session with its metadata block
    pub fn export_session(&self, session: &Session) -> Result<PathBuf> {
        let header = SessionHeader::from(session);
        self.export(&session_file_name(session), &session.readings, Some(&header))
    }

    /// Export history readings
    pub fn export_history(&self, readings: &[SensorReading], now: DateTime<Utc>) -> Result<PathBuf> {
        self.export(&history_file_name(now), readings, None)
    }

    fn write_atomic(&self, path: &Path, bytes: &[u8]) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| e.error)?;
        Ok(())
    }
}
