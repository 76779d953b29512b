//! In-memory stores

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use contracts::{
    ContractError, HistoryStore, NewSession, SensorReading, Session, SessionId, SessionStore,
};

use super::{newest_first, oldest_first};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// History kept in a `Vec`
#[derive(Debug, Default)]
pub struct MemoryHistoryStore {
    readings: Mutex<Vec<SensorReading>>,
    failing: AtomicBool,
}

impl MemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent insert fail
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::Relaxed);
    }
}

impl HistoryStore for MemoryHistoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn insert(&self, reading: &SensorReading) -> Result<(), ContractError> {
        if self.failing.load(Ordering::Relaxed) {
            return Err(ContractError::store("memory", "insert rejected"));
        }
        lock(&self.readings).push(*reading);
        Ok(())
    }

    async fn query_all(&self) -> Result<Vec<SensorReading>, ContractError> {
        Ok(newest_first(lock(&self.readings).clone()))
    }

    async fn query_recent(&self, limit: usize) -> Result<Vec<SensorReading>, ContractError> {
        let mut readings = newest_first(lock(&self.readings).clone());
        readings.truncate(limit);
        Ok(readings)
    }

    async fn query_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<SensorReading>, ContractError> {
        let selected = lock(&self.readings)
            .iter()
            .filter(|r| r.timestamp >= start && r.timestamp <= end)
            .copied()
            .collect();
        Ok(oldest_first(selected))
    }

    async fn delete_all(&self) -> Result<(), ContractError> {
        lock(&self.readings).clear();
        Ok(())
    }
}

/// Sessions kept in a map keyed by id
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    inner: Mutex<MemorySessions>,
}

#[derive(Debug, Default)]
struct MemorySessions {
    sessions: BTreeMap<SessionId, Session>,
    last_id: u64,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySessionStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn insert(&self, session: NewSession) -> Result<Session, ContractError> {
        let mut inner = lock(&self.inner);
        inner.last_id += 1;
        let session = Session::from_new(SessionId(inner.last_id), session);
        inner.sessions.insert(session.id, session.clone());
        Ok(session)
    }

    async fn list(&self) -> Result<Vec<Session>, ContractError> {
        let mut sessions: Vec<Session> = lock(&self.inner).sessions.values().cloned().collect();
        sessions.sort_by(|a, b| b.start_time.cmp(&a.start_time));
        Ok(sessions)
    }

    async fn get(&self, id: SessionId) -> Result<Option<Session>, ContractError> {
        Ok(lock(&self.inner).sessions.get(&id).cloned())
    }

    async fn delete(&self, id: SessionId) -> Result<bool, ContractError> {
        Ok(lock(&self.inner).sessions.remove(&id).is_some())
    }

    async fn delete_all(&self) -> Result<usize, ContractError> {
        let mut inner = lock(&self.inner);
        let removed = inner.sessions.len();
        inner.sessions.clear();
        Ok(removed)
    }
}
