//! Session Manager
//!
//! Freezes a window of readings into a named, immutable session and manages
//! the stored sessions. Freezing never touches the realtime window; clearing
//! it afterwards is up to the caller.

use std::path::PathBuf;

use contracts::{NewSession, SensorReading, Session, SessionId, SessionStore};
use tracing::{info, instrument};

use crate::csv::CsvExporter;
use crate::error::{ArchiveError, Result};

const DEFAULT_NAME_FORMAT: &str = "%d.%m.%Y %H:%M";

/// Session Manager
pub struct SessionManager<S> {
    store: S,
}

impl<S: SessionStore> SessionManager<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Freeze `window` into a stored session
    ///
    /// Start and end times are the first and last reading timestamps. A blank
    /// name becomes `Session dd.MM.yyyy HH:mm` of the start time.
    #[instrument(name = "session_freeze", skip(self, window), fields(readings = window.len()))]
    pub async fn freeze(&self, name: &str, window: &[SensorReading]) -> Result<Session> {
        let (first, last) = match (window.first(), window.last()) {
            (Some(first), Some(last)) => (first, last),
            _ => return Err(ArchiveError::EmptyWindow),
        };

        let name = match name.trim() {
            "" => format!("Session {}", first.timestamp.format(DEFAULT_NAME_FORMAT)),
            trimmed => trimmed.to_string(),
        };

        let session = self
            .store
            .insert(NewSession {
                name,
                start_time: first.timestamp,
                end_time: last.timestamp,
                readings: window.to_vec(),
            })
            .await?;

        metrics::counter!("airscout_sessions_saved_total").increment(1);
        info!(
            id = %session.id,
            name = %session.name,
            readings = session.reading_count,
            "session saved"
        );
        Ok(session)
    }

    /// All sessions, newest start first
    pub async fn list(&self) -> Result<Vec<Session>> {
        Ok(self.store.list().await?)
    }

    /// One session by id
    pub async fn get(&self, id: SessionId) -> Result<Session> {
        self.store
            .get(id)
            .await?
            .ok_or(ArchiveError::SessionNotFound(id))
    }

    /// Delete one session
    #[instrument(name = "session_delete", skip(self))]
    pub async fn delete(&self, id: SessionId) -> Result<()> {
        if self.store.delete(id).await? {
            info!(%id, "session deleted");
            Ok(())
        } else {
            Err(ArchiveError::SessionNotFound(id))
        }
    }

    /// Delete every session, returns how many were removed
    #[instrument(name = "session_delete_all", skip(self))]
    pub async fn delete_all(&self) -> Result<usize> {
        let removed = self.store.delete_all().await?;
        info!(removed, "all sessions deleted");
        Ok(removed)
    }

    /// Export one session to CSV
    pub async fn export(&self, id: SessionId, exporter: &CsvExporter) -> Result<PathBuf> {
        let session = self.get(id).await?;
        exporter.export_session(&session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stores::MemorySessionStore;
    use chrono::{TimeZone, Utc};

    fn reading(ms: i64) -> SensorReading {
        SensorReading::from_values(Utc.timestamp_millis_opt(ms).unwrap(), [1.0; 5])
    }

    fn manager() -> SessionManager<MemorySessionStore> {
        SessionManager::new(MemorySessionStore::new())
    }

    #[tokio::test]
    async fn test_freeze_empty_window_fails() {
        let err = manager().freeze("test", &[]).await.unwrap_err();
        assert!(matches!(err, ArchiveError::EmptyWindow));
    }

    #[tokio::test]
    async fn test_freeze_single_reading() {
        let r1 = reading(1_700_000_000_000);
        let session = manager().freeze("test", &[r1]).await.unwrap();
        assert_eq!(session.start_time, r1.timestamp);
        assert_eq!(session.end_time, r1.timestamp);
        assert_eq!(session.reading_count, 1);
        assert_eq!(session.name, "test");
    }

    #[tokio::test]
    async fn test_times_come_from_readings() {
        let window = [reading(1_000), reading(2_000), reading(61_000)];
        let session = manager().freeze("walk", &window).await.unwrap();
        assert_eq!(session.start_time, window[0].timestamp);
        assert_eq!(session.end_time, window[2].timestamp);
        assert_eq!(session.readings, window.to_vec());
        assert_eq!(session.duration_minutes(), 1);
    }

    #[tokio::test]
    async fn test_blank_name_defaults() {
        let session = manager()
            .freeze("   ", &[reading(1_700_000_000_000)])
            .await
            .unwrap();
        assert_eq!(session.name, "Session 14.11.2023 22:13");
    }

    #[tokio::test]
    async fn test_list_delete() {
        let manager = manager();
        let a = manager.freeze("a", &[reading(1_000)]).await.unwrap();
        let b = manager.freeze("b", &[reading(5_000)]).await.unwrap();
        let c = manager.freeze("c", &[reading(3_000)]).await.unwrap();

        let names: Vec<String> = manager
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(names, vec!["b", "c", "a"]);

        manager.delete(c.id).await.unwrap();
        assert!(matches!(
            manager.delete(c.id).await,
            Err(ArchiveError::SessionNotFound(_))
        ));
        assert_eq!(manager.get(b.id).await.unwrap().name, "b");
        assert_eq!(manager.delete_all().await.unwrap(), 2);
        assert!(manager.list().await.unwrap().is_empty());
        assert!(manager.get(a.id).await.is_err());
    }

    #[tokio::test]
    async fn test_export_missing_session() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = CsvExporter::new(dir.path());
        let err = manager().export(SessionId(42), &exporter).await.unwrap_err();
        assert!(matches!(err, ArchiveError::SessionNotFound(SessionId(42))));
    }
}
