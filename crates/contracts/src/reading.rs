//! SensorReading - Ingestion output
//!
//! Canonical, timestamped set of sensor field values.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Canonical sensor reading
///
/// Produced once per accepted device line. The timestamp is assigned at
/// ingestion time, the device never supplies one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    /// Ingestion time (UTC)
    pub timestamp: DateTime<Utc>,

    /// Temperature
    pub temperature: f64,

    /// Relative humidity
    pub humidity: f64,

    /// First gas channel
    pub gas1: f64,

    /// Second gas channel
    pub gas2: f64,

    /// Battery level
    pub battery: f64,
}

impl SensorReading {
    /// Build a reading from canonical values in [`CanonicalField::ALL`] order
    pub fn from_values(timestamp: DateTime<Utc>, values: [f64; 5]) -> Self {
        let [temperature, humidity, gas1, gas2, battery] = values;
        Self {
            timestamp,
            temperature,
            humidity,
            gas1,
            gas2,
            battery,
        }
    }

    /// Value of a single canonical field
    pub fn value(&self, field: CanonicalField) -> f64 {
        match field {
            CanonicalField::Temperature => self.temperature,
            CanonicalField::Humidity => self.humidity,
            CanonicalField::Gas1 => self.gas1,
            CanonicalField::Gas2 => self.gas2,
            CanonicalField::Battery => self.battery,
        }
    }

    /// Canonical values in [`CanonicalField::ALL`] order
    pub fn values(&self) -> [f64; 5] {
        [
            self.temperature,
            self.humidity,
            self.gas1,
            self.gas2,
            self.battery,
        ]
    }

    /// Timestamp as epoch milliseconds
    pub fn timestamp_millis(&self) -> i64 {
        self.timestamp.timestamp_millis()
    }
}

/// Canonical reading field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CanonicalField {
    Temperature,
    Humidity,
    Gas1,
    Gas2,
    Battery,
}

impl CanonicalField {
    /// All canonical fields, in export column order
    pub const ALL: [CanonicalField; 5] = [
        CanonicalField::Temperature,
        CanonicalField::Humidity,
        CanonicalField::Gas1,
        CanonicalField::Gas2,
        CanonicalField::Battery,
    ];

    /// Canonical field name
    pub fn name(self) -> &'static str {
        match self {
            CanonicalField::Temperature => "temperature",
            CanonicalField::Humidity => "humidity",
            CanonicalField::Gas1 => "gas1",
            CanonicalField::Gas2 => "gas2",
            CanonicalField::Battery => "battery",
        }
    }
}

impl fmt::Display for CanonicalField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_values_follow_field_order() {
        let ts = Utc.timestamp_millis_opt(1_700_000_000_000).unwrap();
        let reading = SensorReading::from_values(ts, [21.5, 40.0, 400.0, 12.0, 87.0]);

        for (field, value) in CanonicalField::ALL.iter().zip(reading.values()) {
            assert_eq!(reading.value(*field), value);
        }
        assert_eq!(reading.timestamp_millis(), 1_700_000_000_000);
    }

    #[test]
    fn test_serde_round_trip() {
        let ts = Utc.timestamp_millis_opt(1_700_000_000_123).unwrap();
        let reading = SensorReading::from_values(ts, [1.0, 2.0, 3.0, 4.0, 5.0]);
        let json = serde_json::to_string(&reading).unwrap();
        let back: SensorReading = serde_json::from_str(&json).unwrap();
        assert_eq!(reading, back);
    }
}
