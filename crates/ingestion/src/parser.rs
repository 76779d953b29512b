//! Line Parser
//!
//! One device line is one flat JSON object. Timestamps are assigned here,
//! at ingestion.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use contracts::SensorReading;
use serde_json::Value;

use crate::error::ParseError;
use crate::mapping::FieldMappingResolver;

/// Turns raw lines into canonical readings
#[derive(Debug, Clone)]
pub struct LineParser {
    resolver: Arc<FieldMappingResolver>,
}

impl LineParser {
    pub fn new(resolver: Arc<FieldMappingResolver>) -> Self {
        Self { resolver }
    }

    /// Resolver used by this parser
    pub fn resolver(&self) -> &Arc<FieldMappingResolver> {
        &self.resolver
    }

    /// Parse a line, stamping it with the current time
    pub fn parse(&self, line: &str) -> Result<SensorReading, ParseError> {
        self.parse_at(line, Utc::now())
    }

    /// Parse a line with an explicit timestamp
    pub fn parse_at(
        &self,
        line: &str,
        timestamp: DateTime<Utc>,
    ) -> Result<SensorReading, ParseError> {
        let line = line.trim();
        if line.is_empty() {
            return Err(ParseError::blank());
        }

        let value: Value =
            serde_json::from_str(line).map_err(|e| ParseError::malformed(e.to_string()))?;

        match value {
            Value::Object(record) => Ok(self.resolver.resolve(&record, timestamp)),
            other => Err(ParseError::malformed(format!(
                "expected object, got {}",
                json_kind(&other)
            ))),
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use contracts::{CanonicalField, FieldMapping};

    fn parser() -> LineParser {
        LineParser::new(Arc::new(FieldMappingResolver::default()))
    }

    #[test]
    fn test_parse_device_line() {
        let ts = Utc.timestamp_millis_opt(1_700_000_000_000).unwrap();
        let reading = parser()
            .parse_at(
                r#"{"tmp":23.1,"hum":45.2,"CO2":415,"VOC+CO":0.8,"Akku":77}"#,
                ts,
            )
            .unwrap();
        assert_eq!(reading.values(), [23.1, 45.2, 415.0, 0.8, 77.0]);
        assert_eq!(reading.timestamp, ts);
    }

    #[test]
    fn test_blank_lines() {
        assert_eq!(parser().parse(""), Err(ParseError::blank()));
        assert_eq!(parser().parse("  \t\r"), Err(ParseError::blank()));
        assert!(parser().parse(" ").unwrap_err().is_blank());
    }

    #[test]
    fn test_malformed_lines() {
        for line in ["{\"tmp\": 1", "not json", "[1,2,3]", "42", "\"tmp\"", "null"] {
            let err = parser().parse(line).unwrap_err();
            assert!(
                matches!(err, ParseError::MalformedRecord { .. }),
                "{line}: {err:?}"
            );
            assert!(!err.is_blank());
        }
    }

    #[test]
    fn test_unknown_keys_ignored() {
        let reading = parser().parse(r#"{"foo": 1, "tmp": 5}"#).unwrap();
        assert_eq!(reading.temperature, 5.0);
        assert_eq!(reading.gas1, 0.0);
    }

    #[test]
    fn test_mapping_change_isolation() {
        let parser = parser();
        let line = r#"{"tmp": 10, "temp_c": 11}"#;

        let before = parser.parse(line).unwrap();
        let mut mapping = FieldMapping::default();
        mapping.set_key(CanonicalField::Temperature, "temp_c");
        parser.resolver().update(mapping).unwrap();
        let after = parser.parse(line).unwrap();

        assert_eq!(before.temperature, 10.0);
        assert_eq!(after.temperature, 11.0);
    }
}
