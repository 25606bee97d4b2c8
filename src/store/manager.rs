//! Data-store manager.
//!
//! Holds parsed descriptors and builds configured store instances on request.

use crate::audit::context::AuditContextGenerator;
use crate::config::node::ConfigNode;
use crate::config::registry::TypeRegistry;
use crate::core::{Error, Result};
use crate::store::backend::DataStore;
use crate::store::connection::ConnectionManager;
use crate::store::descriptor::DataStoreConfig;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Configuration node holding connection elements.
pub const CONNECTIONS_PATH: &str = "connections";

/// Configuration node holding data-store descriptors.
pub const DATA_STORES_PATH: &str = "dataStores";

/// Registry of data-store descriptors.
///
/// Every [`get_data_store`](Self::get_data_store) call builds a fresh
/// instance owned by the caller and bound to the calling context.
pub struct DataStoreManager {
    types: Arc<TypeRegistry>,
    connections: Arc<ConnectionManager>,
    descriptors: RwLock<HashMap<String, DataStoreConfig>>,
}

impl DataStoreManager {
    /// Create a manager over the given registries.
    pub fn new(types: Arc<TypeRegistry>, connections: Arc<ConnectionManager>) -> Self {
        Self {
            types,
            connections,
            descriptors: RwLock::new(HashMap::new()),
        }
    }

    /// Type registry.
    pub fn types(&self) -> &TypeRegistry {
        &self.types
    }

    /// Connection registry.
    pub fn connections(&self) -> &ConnectionManager {
        &self.connections
    }

    /// Register a descriptor. The last registration for a name wins.
    pub fn add_descriptor(&self, config: DataStoreConfig) {
        let name = config.name.clone();
        if self.descriptors.write().insert(name.clone(), config).is_some() {
            warn!(data_store = %name, "Replaced data store descriptor");
        }
    }

    /// Descriptor by name.
    pub fn descriptor(&self, name: &str) -> Option<DataStoreConfig> {
        self.descriptors.read().get(name).cloned()
    }

    /// Read connections and descriptors from `node`.
    ///
    /// Either section may be absent; each may hold one element or a list.
    pub fn configure(&self, node: &ConfigNode<'_>) -> Result<()> {
        if let Some(connections) = node.child(CONNECTIONS_PATH) {
            self.connections.configure(&connections, &self.types)?;
        }
        if let Some(stores) = node.child(DATA_STORES_PATH) {
            for element in stores.elements() {
                let config = DataStoreConfig::from_node(&element)?;
                info!(
                    data_store = %config.name,
                    kind = %config.data_store_type,
                    audited = config.audited,
                    "Registered data store"
                );
                self.add_descriptor(config);
            }
        }
        Ok(())
    }

    /// Build the store named `name` if its backend type is `data_store_type`.
    ///
    /// Returns `None` for an unknown name or a type mismatch. Instantiation
    /// and configuration failures are configuration errors.
    pub fn get_data_store(
        &self,
        name: &str,
        data_store_type: &str,
    ) -> Result<Option<Box<dyn DataStore>>> {
        let Some(config) = self.descriptor(name) else {
            debug!(data_store = name, "Data store not registered");
            return Ok(None);
        };
        if config.data_store_type != data_store_type {
            debug!(
                data_store = name,
                expected = data_store_type,
                actual = %config.data_store_type,
                "Data store type mismatch"
            );
            return Ok(None);
        }

        let mut store = self
            .types
            .data_stores()
            .create(&config.data_store_type)
            .ok_or_else(|| {
                Error::config(format!(
                    "Unknown data store type '{}'. [data store={}][known={}]",
                    config.data_store_type,
                    name,
                    self.types.data_stores().identifiers().join(",")
                ))
            })?;
        store.with_config(config);
        store.configure(self).map_err(|e| {
            Error::config_with(format!("Failed to configure data store. [name={}]", name), e)
        })?;
        Ok(Some(store))
    }

    /// Build the audit context generator declared by the store's descriptor.
    pub fn audit_context_generator(
        &self,
        name: &str,
    ) -> Result<Option<Box<dyn AuditContextGenerator>>> {
        let Some(config) = self.descriptor(name) else {
            return Ok(None);
        };
        let Some(provider) = config.audit_context_provider.as_deref() else {
            return Ok(None);
        };
        self.types
            .context_generators()
            .create(provider)
            .map(Some)
            .ok_or_else(|| {
                Error::config(format!(
                    "Unknown audit context generator '{}'. [data store={}]",
                    provider, name
                ))
            })
    }
}
