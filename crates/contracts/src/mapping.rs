//! FieldMapping - device key to canonical field table

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{CanonicalField, ContractError};

/// Source keys for each canonical field
///
/// Exactly one mapping is active at a time. Versionless, last write wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct FieldMapping {
    #[validate(length(min = 1))]
    pub temperature: String,

    #[validate(length(min = 1))]
    pub humidity: String,

    #[validate(length(min = 1))]
    pub gas1: String,

    #[validate(length(min = 1))]
    pub gas2: String,

    #[validate(length(min = 1))]
    pub battery: String,
}

impl Default for FieldMapping {
    fn default() -> Self {
        Self {
            temperature: "tmp".to_string(),
            humidity: "hum".to_string(),
            gas1: "CO2".to_string(),
            gas2: "VOC+CO".to_string(),
            battery: "Akku".to_string(),
        }
    }
}

impl FieldMapping {
    /// Source key configured for a canonical field
    pub fn key(&self, field: CanonicalField) -> &str {
        match field {
            CanonicalField::Temperature => &self.temperature,
            CanonicalField::Humidity => &self.humidity,
            CanonicalField::Gas1 => &self.gas1,
            CanonicalField::Gas2 => &self.gas2,
            CanonicalField::Battery => &self.battery,
        }
    }

    /// Replace the source key of one canonical field
    pub fn set_key(&mut self, field: CanonicalField, key: impl Into<String>) {
        let key = key.into();
        match field {
            CanonicalField::Temperature => self.temperature = key,
            CanonicalField::Humidity => self.humidity = key,
            CanonicalField::Gas1 => self.gas1 = key,
            CanonicalField::Gas2 => self.gas2 = key,
            CanonicalField::Battery => self.battery = key,
        }
    }

    /// Iterate `(field, key)` pairs in canonical order
    pub fn entries(&self) -> impl Iterator<Item = (CanonicalField, &str)> {
        CanonicalField::ALL.into_iter().map(|f| (f, self.key(f)))
    }

    /// Reject mappings with an empty (or whitespace-only) key
    pub fn ensure_complete(&self) -> Result<(), ContractError> {
        for (field, key) in self.entries() {
            if key.trim().is_empty() {
                return Err(ContractError::config_validation(
                    format!("field_mapping.{field}"),
                    "source key cannot be empty",
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_keys() {
        let mapping = FieldMapping::default();
        assert_eq!(mapping.key(CanonicalField::Temperature), "tmp");
        assert_eq!(mapping.key(CanonicalField::Humidity), "hum");
        assert_eq!(mapping.key(CanonicalField::Gas1), "CO2");
        assert_eq!(mapping.key(CanonicalField::Gas2), "VOC+CO");
        assert_eq!(mapping.key(CanonicalField::Battery), "Akku");
        assert!(mapping.ensure_complete().is_ok());
    }

    #[test]
    fn test_whitespace_key_rejected() {
        let mut mapping = FieldMapping::default();
        mapping.set_key(CanonicalField::Gas2, "   ");
        let err = mapping.ensure_complete().unwrap_err();
        assert!(err.to_string().contains("field_mapping.gas2"));
    }

    #[test]
    fn test_partial_deserialize_uses_defaults() {
        let mapping: FieldMapping = serde_json::from_str(r#"{"gas1": "co2_ppm"}"#).unwrap();
        assert_eq!(mapping.gas1, "co2_ppm");
        assert_eq!(mapping.temperature, "tmp");
    }
}
