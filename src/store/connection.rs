//! Connections and the shared connection registry.

use crate::config::node::{ConfigNode, Configurable};
use crate::config::registry::TypeRegistry;
use crate::config::resolve::instantiate;
use crate::core::Result;
use parking_lot::RwLock;
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

/// A configured handle to a storage backend.
///
/// Connections are shared between data stores and owned by the
/// [`ConnectionManager`] they are registered with.
pub trait Connection: Configurable + Send + Sync {
    /// Registry name.
    fn name(&self) -> &str;

    /// Connection-type identifier, matched against a descriptor's
    /// `connectionType`.
    fn connection_type(&self) -> &str;

    /// Release backend resources.
    fn close(&self) -> Result<()>;

    /// Access to the concrete type, for backends that need their own
    /// connection kind.
    fn as_any(&self) -> &dyn Any;
}

/// Name-keyed registry of shared connections.
#[derive(Default)]
pub struct ConnectionManager {
    connections: RwLock<HashMap<String, Arc<dyn Connection>>>,
}

impl ConnectionManager {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection under its name. The last registration wins.
    pub fn register(&self, connection: Arc<dyn Connection>) {
        let name = connection.name().to_string();
        if self
            .connections
            .write()
            .insert(name.clone(), connection)
            .is_some()
        {
            warn!(connection = %name, "Replaced registered connection");
        }
    }

    /// Shared connection by name.
    pub fn connection(&self, name: &str) -> Option<Arc<dyn Connection>> {
        self.connections.read().get(name).cloned()
    }

    /// Number of registered connections.
    pub fn len(&self) -> usize {
        self.connections.read().len()
    }

    /// Whether no connection is registered.
    pub fn is_empty(&self) -> bool {
        self.connections.read().is_empty()
    }

    /// Instantiate and register every connection element under `node`.
    ///
    /// `node` may be a single connection element or a list of them.
    pub fn configure(&self, node: &ConfigNode<'_>, types: &TypeRegistry) -> Result<usize> {
        let mut count = 0;
        for element in node.elements() {
            let connection: Arc<dyn Connection> =
                Arc::from(instantiate(&element, types.connections())?);
            info!(
                connection = connection.name(),
                kind = connection.connection_type(),
                "Configured connection"
            );
            self.register(connection);
            count += 1;
        }
        Ok(count)
    }

    /// Close and drop every registered connection.
    ///
    /// All connections are closed even if some fail; the first failure is
    /// returned.
    pub fn close(&self) -> Result<()> {
        let drained: Vec<Arc<dyn Connection>> =
            self.connections.write().drain().map(|(_, c)| c).collect();
        let mut first_err = None;
        for connection in drained {
            if let Err(e) = connection.close() {
                warn!(connection = connection.name(), error = %e, "Failed to close connection");
                first_err.get_or_insert(e);
            }
        }
        first_err.map_or(Ok(()), Err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::node::ConfigTree;
    use crate::store::backends::MemoryConnection;
    use serde_json::json;

    #[test]
    fn test_configure_list() {
        let tree = ConfigTree::new(json!([
            { "type": "memory", "name": "a" },
            { "type": "memory", "name": "b" }
        ]));
        let manager = ConnectionManager::new();
        let count = manager
            .configure(&tree.root(), &TypeRegistry::with_defaults())
            .unwrap();

        assert_eq!(count, 2);
        assert!(manager.connection("a").is_some());
        assert_eq!(manager.connection("b").unwrap().connection_type(), "memory");
    }

    #[test]
    fn test_register_last_wins() {
        let manager = ConnectionManager::new();
        let first: Arc<dyn Connection> = Arc::new(MemoryConnection::named("main"));
        let second: Arc<dyn Connection> = Arc::new(MemoryConnection::named("main"));
        manager.register(first);
        manager.register(second.clone());

        assert_eq!(manager.len(), 1);
        assert!(Arc::ptr_eq(&manager.connection("main").unwrap(), &second));
    }

    #[test]
    fn test_close_drains() {
        let manager = ConnectionManager::new();
        let conn = Arc::new(MemoryConnection::named("main"));
        manager.register(conn.clone());
        manager.close().unwrap();

        assert!(manager.is_empty());
        assert!(conn.is_closed());
    }
}
