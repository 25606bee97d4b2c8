//! Documents and search queries.
//!
//! Backend-agnostic unit of persistence.

use crate::audit::entity::{Entity, EntityKey};
use crate::core::Result;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// A persisted entity.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Entity type name
    pub entity_type: String,
    /// Identity key
    pub key: EntityKey,
    /// Serialized entity
    pub body: Value,
}

impl Document {
    /// Create a document.
    pub fn new(entity_type: &str, key: EntityKey, body: Value) -> Self {
        Self {
            entity_type: entity_type.to_string(),
            key,
            body,
        }
    }

    /// Snapshot an entity.
    pub fn from_entity<E: Entity>(entity: &E) -> Result<Self> {
        Ok(Self::new(
            E::TYPE_NAME,
            entity.key(),
            serde_json::to_value(entity)?,
        ))
    }

    /// Rebuild the entity from its body.
    pub fn into_entity<E: DeserializeOwned>(self) -> Result<E> {
        Ok(serde_json::from_value(self.body)?)
    }
}

/// Search request.
///
/// Query text semantics belong to the backend. An unset limit means the
/// store's configured page size.
#[derive(Clone, Debug, Default)]
pub struct SearchQuery {
    /// Backend query text
    pub text: String,
    /// Results to skip
    pub offset: usize,
    /// Maximum results
    pub limit: Option<usize>,
    /// Named parameters
    pub params: HashMap<String, Value>,
}

impl SearchQuery {
    /// Create a query.
    pub fn new(text: &str) -> Self {
        Self {
            text: text.to_string(),
            ..Default::default()
        }
    }

    /// Set pagination offset.
    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    /// Set result limit.
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Add a named parameter.
    pub fn with_param(mut self, name: &str, value: impl Serialize) -> Self {
        if let Ok(v) = serde_json::to_value(value) {
            self.params.insert(name.to_string(), v);
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Serialize, Deserialize, Debug, PartialEq)]
    struct Note {
        id: String,
        text: String,
    }

    impl Entity for Note {
        const TYPE_NAME: &'static str = "Note";

        fn key(&self) -> EntityKey {
            EntityKey::new(&self.id)
        }
    }

    #[test]
    fn test_document_from_entity() {
        let note = Note {
            id: "n1".to_string(),
            text: "hello".to_string(),
        };
        let doc = Document::from_entity(&note).unwrap();

        assert_eq!(doc.entity_type, "Note");
        assert_eq!(doc.key.as_str(), "n1");
        assert_eq!(doc.body["text"], "hello");
        assert_eq!(doc.into_entity::<Note>().unwrap(), note);
    }

    #[test]
    fn test_query_builder() {
        let query = SearchQuery::new("*")
            .with_offset(5)
            .with_limit(10)
            .with_param("status", "open");

        assert_eq!(query.offset, 5);
        assert_eq!(query.limit, Some(10));
        assert_eq!(query.params["status"], "open");
    }
}
