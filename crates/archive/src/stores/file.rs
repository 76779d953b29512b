//! File-backed stores
//!
//! History is one JSONL file whose first line is a schema header. Sessions
//! are one JSON document per session. Schema evolution is destructive: data
//! written under another schema version is discarded with a warning.

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use contracts::{
    ContractError, HistoryStore, NewSession, SensorReading, Session, SessionId, SessionStore,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use super::{newest_first, oldest_first};

/// Current history file schema
pub const HISTORY_SCHEMA_VERSION: u32 = 1;

/// Current session document schema
pub const SESSION_SCHEMA_VERSION: u32 = 1;

const HISTORY_SCHEMA_NAME: &str = "airscout-history";
const HISTORY_FILE: &str = "history.jsonl";
const SESSIONS_DIR: &str = "sessions";
const LAST_ID_FILE: &str = "last_id";

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Serialize, Deserialize)]
struct HistoryHeader {
    schema: String,
    version: u32,
}

impl HistoryHeader {
    fn current() -> Self {
        Self {
            schema: HISTORY_SCHEMA_NAME.to_string(),
            version: HISTORY_SCHEMA_VERSION,
        }
    }
}

/// History in `<data_dir>/history.jsonl`
#[derive(Debug)]
pub struct JsonlHistoryStore {
    path: PathBuf,
    file: Mutex<File>,
}

impl JsonlHistoryStore {
    /// Open (or create) the history file under `data_dir`
    pub fn open(data_dir: &Path) -> Result<Self, ContractError> {
        fs::create_dir_all(data_dir)?;
        let path = data_dir.join(HISTORY_FILE);

        if path.exists() {
            let file = File::open(&path)?;
            if let Some(found) = Self::check_header(BufReader::new(file))? {
                let mismatch = ContractError::SchemaMismatch {
                    store: "jsonl".to_string(),
                    expected: HISTORY_SCHEMA_VERSION,
                    found,
                };
                warn!(path = %path.display(), error = %mismatch, "discarding incompatible history");
                Self::write_header(&path)?;
            }
        } else {
            Self::write_header(&path)?;
        }

        let file = OpenOptions::new().append(true).open(&path)?;
        debug!(path = %path.display(), "history store opened");
        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    /// History file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `Some` describes the incompatible header that was found
    ///
    /// IO failures are returned as errors and never count as a mismatch.
    fn check_header(mut reader: impl BufRead) -> Result<Option<String>, ContractError> {
        let mut first = String::new();
        match reader.read_line(&mut first) {
            Ok(_) => {}
            Err(e) if e.kind() == ErrorKind::InvalidData => {
                return Ok(Some("unreadable header".to_string()))
            }
            Err(e) => return Err(e.into()),
        }

        match serde_json::from_str::<HistoryHeader>(first.trim()) {
            Ok(h) if h.schema == HISTORY_SCHEMA_NAME && h.version == HISTORY_SCHEMA_VERSION => {
                Ok(None)
            }
            Ok(h) => Ok(Some(format!("{} v{}", h.schema, h.version))),
            Err(_) => Ok(Some("no schema header".to_string())),
        }
    }

    /// Truncate the file to a bare header
    fn write_header(path: &Path) -> Result<(), ContractError> {
        let mut file = File::create(path)?;
        let header = serde_json::to_string(&HistoryHeader::current())
            .map_err(|e| ContractError::store("jsonl", e.to_string()))?;
        writeln!(file, "{header}")?;
        file.sync_all()?;
        Ok(())
    }

    fn read_all(&self) -> Result<Vec<SensorReading>, ContractError> {
        let _guard = lock(&self.file);
        let file = File::open(&self.path)?;
        let mut readings = Vec::new();

        for (index, line) in BufReader::new(file).lines().enumerate().skip(1) {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<SensorReading>(&line) {
                Ok(reading) => readings.push(reading),
                Err(e) => warn!(line = index + 1, error = %e, "skipping corrupt history entry"),
            }
        }
        Ok(readings)
    }
}

impl HistoryStore for JsonlHistoryStore {
    fn name(&self) -> &str {
        "jsonl"
    }

    async fn insert(&self, reading: &SensorReading) -> Result<(), ContractError> {
        let mut line = serde_json::to_string(reading)
            .map_err(|e| ContractError::store("jsonl", e.to_string()))?;
        line.push('\n');
        lock(&self.file)
            .write_all(line.as_bytes())
            .map_err(|e| ContractError::store("jsonl", e.to_string()))
    }

    async fn query_all(&self) -> Result<Vec<SensorReading>, ContractError> {
        Ok(newest_first(self.read_all()?))
    }

    async fn query_recent(&self, limit: usize) -> Result<Vec<SensorReading>, ContractError> {
        let mut readings = newest_first(self.read_all()?);
        readings.truncate(limit);
        Ok(readings)
    }

    async fn query_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<SensorReading>, ContractError> {
        let mut readings = self.read_all()?;
        readings.retain(|r| r.timestamp >= start && r.timestamp <= end);
        Ok(oldest_first(readings))
    }

    async fn delete_all(&self) -> Result<(), ContractError> {
        let mut file = lock(&self.file);
        Self::write_header(&self.path)?;
        *file = OpenOptions::new().append(true).open(&self.path)?;
        info!(path = %self.path.display(), "history deleted");
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredSession {
    schema_version: u32,
    session: Session,
}

/// Sessions in `<data_dir>/sessions/<id>.json`
#[derive(Debug)]
pub struct JsonSessionStore {
    dir: PathBuf,
    last_id: Mutex<u64>,
}

impl JsonSessionStore {
    /// Open (or create) the session directory under `data_dir`
    ///
    /// Documents with another schema version, or that fail to parse, are
    /// deleted. Ids continue from the highest id ever assigned, so ids of
    /// deleted sessions are never reused.
    pub fn open(data_dir: &Path) -> Result<Self, ContractError> {
        let dir = data_dir.join(SESSIONS_DIR);
        fs::create_dir_all(&dir)?;

        let store = Self {
            dir,
            last_id: Mutex::new(0),
        };

        let mut last_id = store.read_last_id()?;
        for path in store.documents()? {
            match Self::load(&path) {
                Ok(session) => last_id = last_id.max(session.id.0),
                Err(ContractError::Io(e)) => return Err(ContractError::Io(e)),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "discarding incompatible session");
                    fs::remove_file(&path)?;
                }
            }
        }
        *lock(&store.last_id) = last_id;

        debug!(dir = %store.dir.display(), last_id, "session store opened");
        Ok(store)
    }

    /// Persisted id high-water mark, 0 when absent
    fn read_last_id(&self) -> Result<u64, ContractError> {
        let path = self.dir.join(LAST_ID_FILE);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };
        match content.trim().parse() {
            Ok(id) => Ok(id),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "ignoring unreadable session id mark");
                Ok(0)
            }
        }
    }

    fn write_last_id(&self, id: u64) -> Result<(), ContractError> {
        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir)?;
        writeln!(tmp, "{id}")?;
        tmp.persist(self.dir.join(LAST_ID_FILE))
            .map_err(|e| ContractError::Io(e.error))?;
        Ok(())
    }

    fn path_for(&self, id: SessionId) -> PathBuf {
        self.dir.join(format!("{id}.json"))
    }

    fn documents(&self) -> Result<Vec<PathBuf>, ContractError> {
        let mut paths = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                paths.push(path);
            }
        }
        Ok(paths)
    }

    fn load(path: &Path) -> Result<Session, ContractError> {
        let content = fs::read_to_string(path)?;
        let value: Value = serde_json::from_str(&content)
            .map_err(|e| ContractError::store("json", e.to_string()))?;

        let version = value.get("schema_version").and_then(Value::as_u64);
        if version != Some(u64::from(SESSION_SCHEMA_VERSION)) {
            return Err(ContractError::SchemaMismatch {
                store: "json".to_string(),
                expected: SESSION_SCHEMA_VERSION,
                found: version.map_or_else(|| "none".to_string(), |v| v.to_string()),
            });
        }

        let stored: StoredSession = serde_json::from_value(value)
            .map_err(|e| ContractError::store("json", e.to_string()))?;
        Ok(stored.session)
    }

    fn write(&self, session: &Session) -> Result<(), ContractError> {
        let stored = StoredSession {
            schema_version: SESSION_SCHEMA_VERSION,
            session: session.clone(),
        };
        let content = serde_json::to_vec_pretty(&stored)
            .map_err(|e| ContractError::store("json", e.to_string()))?;

        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(&content)?;
        tmp.persist(self.path_for(session.id))
            .map_err(|e| ContractError::Io(e.error))?;
        Ok(())
    }
}

impl SessionStore for JsonSessionStore {
    fn name(&self) -> &str {
        "json"
    }

    async fn insert(&self, session: NewSession) -> Result<Session, ContractError> {
        let mut last_id = lock(&self.last_id);
        let session = Session::from_new(SessionId(*last_id + 1), session);
        self.write_last_id(session.id.0)?;
        self.write(&session)?;
        *last_id = session.id.0;
        Ok(session)
    }

    async fn list(&self) -> Result<Vec<Session>, ContractError> {
        let mut sessions = Vec::new();
        for path in self.documents()? {
            match Self::load(&path) {
                Ok(session) => sessions.push(session),
                Err(e) => warn!(path = %path.display(), error = %e, "skipping unreadable session"),
            }
        }
        sessions.sort_by(|a, b| b.start_time.cmp(&a.start_time));
        Ok(sessions)
    }

    async fn get(&self, id: SessionId) -> Result<Option<Session>, ContractError> {
        let path = self.path_for(id);
        if !path.exists() {
            return Ok(None);
        }
        Self::load(&path).map(Some)
    }

    async fn delete(&self, id: SessionId) -> Result<bool, ContractError> {
        match fs::remove_file(self.path_for(id)) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete_all(&self) -> Result<usize, ContractError> {
        let paths = self.documents()?;
        for path in &paths {
            fs::remove_file(path)?;
        }
        Ok(paths.len())
    }
}
