//! Session - Session Manager output
//!
//! Named, immutable snapshot of the realtime window.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::SensorReading;

/// Session identifier (assigned by the session store)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Session contents before the store assigns an id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewSession {
    pub name: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub readings: Vec<SensorReading>,
}

/// Stored session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,

    pub name: String,

    /// Timestamp of the first reading
    pub start_time: DateTime<Utc>,

    /// Timestamp of the last reading
    pub end_time: DateTime<Utc>,

    pub reading_count: usize,

    pub readings: Vec<SensorReading>,
}

impl Session {
    /// Attach an id to frozen session contents
    pub fn from_new(id: SessionId, new: NewSession) -> Self {
        Self {
            id,
            name: new.name,
            start_time: new.start_time,
            end_time: new.end_time,
            reading_count: new.readings.len(),
            readings: new.readings,
        }
    }

    /// Time between first and last reading
    pub fn duration(&self) -> Duration {
        self.end_time - self.start_time
    }

    /// Duration truncated to whole minutes
    pub fn duration_minutes(&self) -> i64 {
        self.duration().num_minutes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn reading_at(ms: i64) -> SensorReading {
        SensorReading::from_values(Utc.timestamp_millis_opt(ms).unwrap(), [0.0; 5])
    }

    #[test]
    fn test_duration_minutes_truncates() {
        let readings = vec![reading_at(0), reading_at(179_999)];
        let session = Session::from_new(
            SessionId(1),
            NewSession {
                name: "walk".into(),
                start_time: readings[0].timestamp,
                end_time: readings[1].timestamp,
                readings,
            },
        );
        assert_eq!(session.reading_count, 2);
        assert_eq!(session.duration_minutes(), 2);
    }
}
