//! On-storage encoding of the prompt collection.
//!
//! The whole collection lives under one key as
//! `{"schemaVersion": 1, "prompts": [...]}`. The browser extension wrote a
//! bare array with no version field; that form is still read and is replaced
//! by the envelope on the next write.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::backend::BackendError;
use crate::error::StoreError;
use crate::model::Prompt;

/// Newest schema version this crate reads and the one it writes.
pub const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Envelope {
    schema_version: u32,
    #[serde(default)]
    prompts: Vec<Prompt>,
}

/// Decode a stored value into the prompt collection.
pub fn decode(value: Value) -> Result<Vec<Prompt>, StoreError> {
    match value {
        Value::Null => Ok(Vec::new()),
        Value::Array(_) => {
            serde_json::from_value(value).map_err(|e| StoreError::Corrupt(e.to_string()))
        }
        Value::Object(ref map) => {
            let found = map
                .get("schemaVersion")
                .and_then(Value::as_u64)
                .ok_or_else(|| StoreError::Corrupt("missing schemaVersion".to_string()))?;

            if found > u64::from(SCHEMA_VERSION) {
                return Err(StoreError::UnsupportedSchema {
                    found,
                    supported: SCHEMA_VERSION,
                });
            }

            let envelope: Envelope =
                serde_json::from_value(value).map_err(|e| StoreError::Corrupt(e.to_string()))?;
            Ok(envelope.prompts)
        }
        other => Err(StoreError::Corrupt(format!(
            "expected an object or array, found {}",
            other
        ))),
    }
}

/// Encode the prompt collection in the current schema.
pub fn encode(prompts: Vec<Prompt>) -> Result<Value, StoreError> {
    let envelope = Envelope {
        schema_version: SCHEMA_VERSION,
        prompts,
    };
    serde_json::to_value(envelope).map_err(encode_error)
}

/// Failing to serialize is a write-side problem, not corrupt storage.
fn encode_error(e: serde_json::Error) -> StoreError {
    StoreError::Backend(BackendError::Encoding(e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_legacy_array() {
        let value = json!([
            {"text": "a", "modality": "text", "tags": [], "timestamp": "2024-01-01T00:00:00.000Z", "id": "1"},
            {"text": "b", "modality": "image", "tags": ["t"], "timestamp": "2024-01-02T00:00:00.000Z", "id": "2"}
        ]);

        let prompts = decode(value).unwrap();
        assert_eq!(prompts.len(), 2);
        assert_eq!(prompts[1].tags, vec!["t"]);
    }

    #[test]
    fn test_encode_writes_envelope() {
        let value = encode(Vec::new()).unwrap();
        assert_eq!(value, json!({"schemaVersion": 1, "prompts": []}));
        assert!(decode(value).unwrap().is_empty());
    }

    #[test]
    fn test_decode_rejects_newer_schema() {
        let err = decode(json!({"schemaVersion": 2, "prompts": []})).unwrap_err();
        assert!(matches!(
            err,
            StoreError::UnsupportedSchema { found: 2, supported: 1 }
        ));
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(decode(json!("nope")), Err(StoreError::Corrupt(_))));
        assert!(matches!(
            decode(json!({"prompts": []})),
            Err(StoreError::Corrupt(_))
        ));
        assert!(matches!(
            decode(json!([{"text": "no id"}])),
            Err(StoreError::Corrupt(_))
        ));
    }

    #[test]
    fn test_encode_failure_is_not_reported_as_corruption() {
        let json_err = serde_json::from_str::<Value>("{").unwrap_err();
        let err = encode_error(json_err);

        assert!(matches!(err, StoreError::Backend(BackendError::Encoding(_))));
        assert!(!err.to_string().contains("corrupt"));
    }
}
