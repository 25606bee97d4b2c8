//! Data-store descriptor.

use crate::config::node::ConfigNode;
use crate::core::{Error, Result};
use serde::{Deserialize, Serialize};

/// Page size used when a search doesn't specify one.
pub const DEFAULT_MAX_RESULTS: usize = 500;

fn default_max_results() -> usize {
    DEFAULT_MAX_RESULTS
}

/// How a data store obtains its connection.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConnectionSpec {
    /// Name of a shared connection.
    Reference(String),
    /// Connection node carrying either a `reference` or a `type` attribute.
    Inline(serde_json::Value),
}

/// Configuration-level description of a data store. Immutable once parsed.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataStoreConfig {
    /// Unique store name
    pub name: String,
    /// Backend-type identifier
    #[serde(rename = "type")]
    pub data_store_type: String,
    /// Free-form description
    #[serde(default)]
    pub description: Option<String>,
    /// Connection reference or inline connection
    pub connection: ConnectionSpec,
    /// Expected connection-type identifier
    pub connection_type: String,
    /// Whether mutations should be audited. Read by [`from_node`](Self::from_node),
    /// which also accepts "true"/"false" strings.
    #[serde(skip_deserializing)]
    pub audited: bool,
    /// Logger to audit with instead of type routing
    #[serde(default)]
    pub audit_logger: Option<String>,
    /// Audit context generator type identifier
    #[serde(default)]
    pub audit_context_provider: Option<String>,
    /// Default search page size
    #[serde(default = "default_max_results")]
    pub max_results: usize,
}

impl DataStoreConfig {
    /// Descriptor with a referenced connection and default options.
    pub fn new(name: &str, data_store_type: &str, connection: &str, connection_type: &str) -> Self {
        Self {
            name: name.to_string(),
            data_store_type: data_store_type.to_string(),
            description: None,
            connection: ConnectionSpec::Reference(connection.to_string()),
            connection_type: connection_type.to_string(),
            audited: false,
            audit_logger: None,
            audit_context_provider: None,
            max_results: DEFAULT_MAX_RESULTS,
        }
    }

    /// Mark the store as audited, optionally pinning a logger.
    pub fn audited_by(mut self, logger: Option<&str>) -> Self {
        self.audited = true;
        self.audit_logger = logger.map(str::to_string);
        self
    }

    /// Parse and validate a descriptor node.
    pub fn from_node(node: &ConfigNode<'_>) -> Result<Self> {
        let mut config: Self = node.deserialize()?;
        config.audited = node.bool_attribute("audited")?.unwrap_or(false);
        config.validate(node.path())?;
        Ok(config)
    }

    fn validate(&self, path: &str) -> Result<()> {
        let required = [
            ("name", self.name.as_str()),
            ("type", self.data_store_type.as_str()),
            ("connectionType", self.connection_type.as_str()),
        ];
        for (attr, value) in required {
            if value.is_empty() {
                return Err(Error::config(format!(
                    "Missing required attribute '{}'. [node={}]",
                    attr, path
                )));
            }
        }
        match &self.connection {
            ConnectionSpec::Reference(name) if name.is_empty() => Err(Error::config(format!(
                "No connection defined. [data store={}][node={}]",
                self.name, path
            ))),
            ConnectionSpec::Inline(value) if !value.is_object() => Err(Error::config(format!(
                "Invalid connection node. [data store={}][node={}]",
                self.name, path
            ))),
            _ => Ok(()),
        }
    }
}
