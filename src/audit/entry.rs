//! Audit record structure.
//!
//! Backend-agnostic record of an action taken on an entity.

use crate::audit::entity::{Entity, EntityKey};
use crate::core::{now, Hash256, Timestamp};
use serde::{Deserialize, Serialize};

/// Unique record identifier.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordId(pub String);

impl RecordId {
    /// Create a new record ID.
    pub fn new(id: &str) -> Self {
        Self(id.to_string())
    }

    /// Generate a unique ID.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Get the ID string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kind of audited action.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuditType {
    /// Entity created
    Create,
    /// Entity updated
    Update,
    /// Entity deleted
    Delete,
    /// Entity read
    Read,
    /// Custom action
    Custom(String),
}

impl std::fmt::Display for AuditType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuditType::Create => write!(f, "CREATE"),
            AuditType::Update => write!(f, "UPDATE"),
            AuditType::Delete => write!(f, "DELETE"),
            AuditType::Read => write!(f, "READ"),
            AuditType::Custom(name) => write!(f, "{}", name),
        }
    }
}

/// A persisted audit entry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    /// Unique record ID
    pub id: RecordId,
    /// Audited action
    pub audit_type: AuditType,
    /// Acting principal
    pub actor: String,
    /// Target entity type
    pub entity_type: String,
    /// Target entity key
    pub entity_key: EntityKey,
    /// Serialized entity
    pub entity: String,
    /// Serializer that produced `entity`
    pub serializer: String,
    /// Optional change delta
    pub change_delta: Option<String>,
    /// Extra context supplied by the data store
    pub context: Option<serde_json::Value>,
    /// Logger that wrote this record
    pub logger: String,
    /// Timestamp
    pub timestamp: Timestamp,
    /// Content hash (for verification)
    pub digest: Option<Hash256>,
}

impl AuditRecord {
    /// Create a record stamped now.
    pub fn new(audit_type: AuditType, actor: &str, entity_type: &str, entity_key: EntityKey) -> Self {
        Self {
            id: RecordId::generate(),
            audit_type,
            actor: actor.to_string(),
            entity_type: entity_type.to_string(),
            entity_key,
            entity: String::new(),
            serializer: String::new(),
            change_delta: None,
            context: None,
            logger: String::new(),
            timestamp: now(),
            digest: None,
        }
    }

    /// Attach the serialized entity.
    pub fn with_entity(mut self, serializer: &str, payload: String) -> Self {
        self.serializer = serializer.to_string();
        self.entity = payload;
        self
    }

    /// Attach a change delta.
    pub fn with_delta(mut self, delta: Option<&str>) -> Self {
        self.change_delta = delta.map(str::to_string);
        self
    }

    /// Attach store-supplied context.
    pub fn with_context(mut self, context: Option<serde_json::Value>) -> Self {
        self.context = context;
        self
    }

    /// Set the writing logger.
    pub fn with_logger(mut self, logger: &str) -> Self {
        self.logger = logger.to_string();
        self
    }

    fn content_hash(&self) -> Hash256 {
        let data = format!(
            "{}:{}:{}:{}:{}:{}:{}",
            self.id,
            self.audit_type,
            self.actor,
            self.entity_type,
            self.entity_key,
            self.timestamp.to_rfc3339(),
            self.change_delta.as_deref().unwrap_or("")
        );
        Hash256::digest(&[data.as_bytes(), self.entity.as_bytes()])
    }

    /// Compute and set content hash.
    pub fn seal(&mut self) -> Hash256 {
        let hash = self.content_hash();
        self.digest = Some(hash.clone());
        hash
    }

    /// Verify the record's hash. Unsealed records never verify.
    pub fn verify(&self) -> bool {
        self.digest
            .as_ref()
            .is_some_and(|stored| *stored == self.content_hash())
    }
}

impl Entity for AuditRecord {
    const TYPE_NAME: &'static str = "AuditRecord";

    fn key(&self) -> EntityKey {
        EntityKey::new(self.id.as_str())
    }
}
