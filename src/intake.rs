//! The caller-supplied intake record.
//!
//! An intake is an open JSON object; the template on the generation service
//! decides which fields it consumes. The only field the pipeline itself
//! relies on is `startupName`, which names the output file and doubles as
//! the PDF open password.

use crate::error::MemoError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Field holding the subject's name.
pub const STARTUP_NAME_FIELD: &str = "startupName";

/// Suffix appended to the startup name to form the output filename.
pub const MEMO_FILENAME_SUFFIX: &str = "_Secure_Memo.pdf";

/// A structured record describing the subject of the memo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IntakeRecord(Map<String, Value>);

impl IntakeRecord {
    /// Wrap an existing field map.
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    /// Interpret an arbitrary JSON value as an intake record.
    ///
    /// Fails with [`MemoError::InvalidIntake`] unless `value` is an object.
    pub fn from_value(value: Value) -> Result<Self, MemoError> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(MemoError::InvalidIntake(format!(
                "expected a JSON object, got {}",
                json_kind(&other)
            ))),
        }
    }

    /// The trimmed, non-empty `startupName`.
    pub fn startup_name(&self) -> Result<&str, MemoError> {
        match self.0.get(STARTUP_NAME_FIELD) {
            Some(Value::String(name)) if !name.trim().is_empty() => Ok(name.trim()),
            Some(Value::String(_)) => Err(MemoError::InvalidIntake(format!(
                "'{STARTUP_NAME_FIELD}' must not be empty"
            ))),
            Some(other) => Err(MemoError::InvalidIntake(format!(
                "'{STARTUP_NAME_FIELD}' must be a string, got {}",
                json_kind(other)
            ))),
            None => Err(MemoError::InvalidIntake(format!(
                "missing required field '{STARTUP_NAME_FIELD}'"
            ))),
        }
    }

    /// The PDF open password: `startupName` exactly as supplied, surrounding
    /// whitespace included. Subject to the same checks as [`startup_name`].
    ///
    /// [`startup_name`]: IntakeRecord::startup_name
    pub fn open_password(&self) -> Result<&str, MemoError> {
        self.startup_name()?;
        Ok(self.0[STARTUP_NAME_FIELD].as_str().unwrap_or_default())
    }

    /// Output filename, e.g. `Acme_Secure_Memo.pdf`.
    pub fn memo_filename(&self) -> Result<String, MemoError> {
        Ok(format!("{}{MEMO_FILENAME_SUFFIX}", self.startup_name()?))
    }

    /// The record as the `documentValues` JSON object.
    pub fn as_value(&self) -> Value {
        Value::Object(self.0.clone())
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }
}

impl From<Map<String, Value>> for IntakeRecord {
    fn from(fields: Map<String, Value>) -> Self {
        Self(fields)
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn startup_name_is_trimmed() {
        let intake = IntakeRecord::from_value(json!({ "startupName": "  Acme " })).unwrap();
        assert_eq!(intake.startup_name().unwrap(), "Acme");
        assert_eq!(intake.memo_filename().unwrap(), "Acme_Secure_Memo.pdf");
    }

    #[test]
    fn open_password_keeps_surrounding_whitespace() {
        let intake = IntakeRecord::from_value(json!({ "startupName": " Acme " })).unwrap();
        assert_eq!(intake.open_password().unwrap(), " Acme ");

        let blank = IntakeRecord::from_value(json!({ "startupName": "  " })).unwrap();
        assert!(matches!(blank.open_password(), Err(MemoError::InvalidIntake(_))));
    }

    #[test]
    fn missing_or_blank_startup_name_is_rejected() {
        let missing = IntakeRecord::from_value(json!({ "sector": "fintech" })).unwrap();
        assert!(matches!(missing.startup_name(), Err(MemoError::InvalidIntake(_))));

        let blank = IntakeRecord::from_value(json!({ "startupName": "   " })).unwrap();
        assert!(blank.startup_name().is_err());

        let number = IntakeRecord::from_value(json!({ "startupName": 42 })).unwrap();
        let err = number.startup_name().unwrap_err();
        assert!(err.to_string().contains("a number"), "got: {err}");
    }

    #[test]
    fn non_object_intake_is_rejected() {
        let err = IntakeRecord::from_value(json!(["Acme"])).unwrap_err();
        assert!(err.to_string().contains("an array"));
    }

    #[test]
    fn nested_fields_survive_round_trip_into_document_values() {
        let raw = json!({
            "startupName": "Acme",
            "funding": { "round": "Seed", "amount": 1500000 },
            "score": 8.5
        });
        let intake: IntakeRecord = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(intake.as_value(), raw);
        assert_eq!(intake.fields().len(), 3);
    }
}
