//! Persistent store traits - Archive backend interface
//!
//! The storage engine is an opaque, key-ordered append/query store. Only the
//! shapes below are required from it.

use chrono::{DateTime, Utc};

use crate::{ContractError, NewSession, SensorReading, Session, SessionId};

/// Durable reading history
#[trait_variant::make(HistoryStore: Send)]
pub trait LocalHistoryStore {
    /// Store name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Append one reading
    async fn insert(&self, reading: &SensorReading) -> Result<(), ContractError>;

    /// All readings, newest first
    async fn query_all(&self) -> Result<Vec<SensorReading>, ContractError>;

    /// At most `limit` readings, newest first
    async fn query_recent(&self, limit: usize) -> Result<Vec<SensorReading>, ContractError>;

    /// Readings with `start <= timestamp <= end`, oldest first
    async fn query_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<SensorReading>, ContractError>;

    /// Remove every reading
    async fn delete_all(&self) -> Result<(), ContractError>;
}

/// Durable session storage
#[trait_variant::make(SessionStore: Send)]
pub trait LocalSessionStore {
    /// Store name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Persist a session and assign its id
    async fn insert(&self, session: NewSession) -> Result<Session, ContractError>;

    /// All sessions, ordered by start time descending
    async fn list(&self) -> Result<Vec<Session>, ContractError>;

    /// One session by id
    async fn get(&self, id: SessionId) -> Result<Option<Session>, ContractError>;

    /// Delete one session, returns whether it existed
    async fn delete(&self, id: SessionId) -> Result<bool, ContractError>;

    /// Delete every session, returns how many were removed
    async fn delete_all(&self) -> Result<usize, ContractError>;
}
