//! Field Mapping Resolver
//!
//! Holds the active [`FieldMapping`] and resolves raw device records into
//! canonical readings. Readers take an `Arc` snapshot per call, so an update
//! never affects a record that is already being resolved.

use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use contracts::{CanonicalField, FieldMapping, SensorReading};
use serde_json::Value;
use tracing::{debug, trace};

use crate::error::{IngestionError, Result};

/// Flat key/value record as sent by the device
pub type RawRecord = serde_json::Map<String, Value>;

/// Resolves raw records against the active field mapping
#[derive(Debug, Default)]
pub struct FieldMappingResolver {
    active: RwLock<Arc<FieldMapping>>,
}

impl FieldMappingResolver {
    /// Create a resolver with the given initial mapping
    pub fn new(mapping: FieldMapping) -> Self {
        Self {
            active: RwLock::new(Arc::new(mapping)),
        }
    }

    /// Immutable snapshot of the active mapping
    pub fn snapshot(&self) -> Arc<FieldMapping> {
        self.active
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replace the active mapping
    ///
    /// Only records resolved after this call observe the new keys.
    pub fn update(&self, mapping: FieldMapping) -> Result<()> {
        mapping
            .ensure_complete()
            .map_err(IngestionError::InvalidMapping)?;

        debug!(?mapping, "field mapping updated");
        *self.active.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(mapping);
        Ok(())
    }

    /// Resolve a raw record into a reading stamped with `timestamp`
    ///
    /// Missing or non-numeric values resolve to `0.0`. Never fails.
    pub fn resolve(&self, record: &RawRecord, timestamp: DateTime<Utc>) -> SensorReading {
        let mapping = self.snapshot();
        let values = CanonicalField::ALL.map(|field| {
            let key = mapping.key(field);
            let value = record.get(key).and_then(numeric_value);
            if value.is_none() {
                trace!(%field, key, "field missing or non-numeric, defaulting to 0.0");
            }
            value.unwrap_or(0.0)
        });
        SensorReading::from_values(timestamp, values)
    }
}

/// Numeric view of a JSON value
///
/// Accepts JSON numbers and strings holding a finite number.
fn numeric_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        _ => None,
    }
}
