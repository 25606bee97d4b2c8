//! AuditLogger trait definition.
//!
//! Core trait that all audit loggers must implement.

use crate::audit::entity::{EntityKey, Principal};
use crate::audit::entry::{AuditRecord, AuditType};
use crate::audit::serializer::AuditSerDe;
use crate::config::node::{ConfigNode, Configurable};
use crate::core::Result;
use crate::store::backend::DataStore;
use serde::{Deserialize, Serialize};

/// Backing store a logger persists to.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreRef {
    /// Data store name
    pub name: String,
    /// Expected backend-type identifier
    #[serde(rename = "type")]
    pub store_type: String,
}

/// Settings shared by every logger.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggerSettings {
    /// Registry name
    pub name: String,
    /// Fallback for unrouted entity types
    pub default: bool,
    /// Backing store
    pub data_store: StoreRef,
    /// Entity type names routed to this logger
    pub entities: Vec<String>,
}

impl LoggerSettings {
    /// Read the shared settings from a logger element.
    ///
    /// `default` may be a boolean or a "true"/"false" string, and `entities`
    /// a list or a single name.
    pub fn from_node(node: &ConfigNode<'_>) -> Result<Self> {
        Ok(Self {
            name: node.require_attribute("name")?.to_string(),
            default: node.bool_attribute("default")?.unwrap_or(false),
            data_store: node.require_child("dataStore")?.deserialize()?,
            entities: node.string_list("entities")?.unwrap_or_default(),
        })
    }
}

/// A single audit event handed to a logger.
pub struct AuditEvent<'a> {
    /// Audited action
    pub audit_type: AuditType,
    /// Target entity type name
    pub entity_type: &'a str,
    /// Target entity key
    pub entity_key: EntityKey,
    /// Entity snapshot
    pub entity: &'a serde_json::Value,
    /// Optional change delta
    pub change_delta: Option<&'a str>,
    /// Acting principal
    pub principal: &'a dyn Principal,
    /// Store-supplied context
    pub context: Option<serde_json::Value>,
}

/// Core trait for audit loggers.
///
/// Loggers are built from configuration, bound to a data store and then
/// shared read-only between dispatching threads.
pub trait AuditLogger: Configurable + Send + Sync {
    /// Shared settings.
    fn settings(&self) -> &LoggerSettings;

    /// Attach the backing store.
    fn bind_data_store(&mut self, store: Box<dyn DataStore>);

    /// Persist a record for `event`.
    fn write(&self, event: &AuditEvent<'_>, serializer: &dyn AuditSerDe) -> Result<AuditRecord>;

    /// Release resources. Writes fail afterwards.
    fn close(&self) -> Result<()>;

    /// Registry name.
    fn name(&self) -> &str {
        &self.settings().name
    }

    /// Whether this logger is the fallback.
    fn is_default(&self) -> bool {
        self.settings().default
    }

    /// Entity type names routed to this logger.
    fn entity_types(&self) -> &[String] {
        &self.settings().entities
    }

    /// Name of the backing store.
    fn data_store_name(&self) -> &str {
        &self.settings().data_store.name
    }

    /// Expected backend type of the backing store.
    fn data_store_type(&self) -> &str {
        &self.settings().data_store.store_type
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::node::ConfigTree;
    use serde_json::json;

    #[test]
    fn test_settings_from_node() {
        let tree = ConfigTree::new(json!({
            "type": "store",
            "name": "s3audit",
            "entities": ["Order", "Invoice"],
            "dataStore": { "name": "audit-store", "type": "memory" }
        }));
        let settings = LoggerSettings::from_node(&tree.root()).unwrap();

        assert_eq!(settings.name, "s3audit");
        assert!(!settings.default);
        assert_eq!(settings.entities, vec!["Order", "Invoice"]);
        assert_eq!(settings.data_store.store_type, "memory");
    }

    #[test]
    fn test_settings_accept_string_forms() {
        let tree = ConfigTree::new(json!({
            "type": "store",
            "name": "file1",
            "default": "true",
            "entities": "Order",
            "dataStore": { "name": "audit-store", "type": "memory" }
        }));
        let settings = LoggerSettings::from_node(&tree.root()).unwrap();

        assert!(settings.default);
        assert_eq!(settings.entities, vec!["Order"]);
    }

    #[test]
    fn test_settings_reject_malformed_default() {
        let tree = ConfigTree::new(json!({
            "name": "file1",
            "default": "often",
            "dataStore": { "name": "audit-store", "type": "memory" }
        }));
        let err = LoggerSettings::from_node(&tree.root()).unwrap_err();
        assert!(err.to_string().contains("'default'"));
    }

    #[test]
    fn test_settings_require_data_store() {
        let tree = ConfigTree::new(json!({ "type": "store", "name": "x" }));
        assert!(LoggerSettings::from_node(&tree.root()).is_err());
    }
}
