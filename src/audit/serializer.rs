//! Audit payload serializers.

use crate::core::Result;
use serde_json::Value;

/// Strategy for turning an entity snapshot into a record payload.
pub trait AuditSerDe: Send + Sync {
    /// Identifier stored alongside each payload.
    fn name(&self) -> &str;

    /// Encode an entity snapshot.
    fn serialize(&self, entity: &Value) -> Result<String>;

    /// Decode a payload written by [`AuditSerDe::serialize`].
    fn deserialize(&self, payload: &str) -> Result<Value>;
}

/// Compact JSON. The default serializer.
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonSerDe;

impl AuditSerDe for JsonSerDe {
    fn name(&self) -> &str {
        "json"
    }

    fn serialize(&self, entity: &Value) -> Result<String> {
        Ok(serde_json::to_string(entity)?)
    }

    fn deserialize(&self, payload: &str) -> Result<Value> {
        Ok(serde_json::from_str(payload)?)
    }
}

/// Indented JSON, for stores read by humans.
#[derive(Clone, Copy, Debug, Default)]
pub struct PrettyJsonSerDe;

impl AuditSerDe for PrettyJsonSerDe {
    fn name(&self) -> &str {
        "json-pretty"
    }

    fn serialize(&self, entity: &Value) -> Result<String> {
        Ok(serde_json::to_string_pretty(entity)?)
    }

    fn deserialize(&self, payload: &str) -> Result<Value> {
        Ok(serde_json::from_str(payload)?)
    }
}
