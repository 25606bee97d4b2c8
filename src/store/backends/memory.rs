//! In-memory backend implementation.
//!
//! Documents live in the shared [`MemoryConnection`]; every store built on the
//! same connection sees the same tables.

use crate::audit::entity::EntityKey;
use crate::config::node::{ConfigNode, Configurable};
use crate::core::{Context, Error, Result};
use crate::store::backend::{DataStore, StoreCore};
use crate::store::connection::Connection;
use crate::store::document::{Document, SearchQuery};
use crate::store::manager::DataStoreManager;
use parking_lot::RwLock;
use std::any::Any;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};

type Table = BTreeMap<String, Document>;

/// In-process connection holding one table per entity type.
#[derive(Default)]
pub struct MemoryConnection {
    name: String,
    tables: RwLock<HashMap<String, Table>>,
    closed: AtomicBool,
}

impl MemoryConnection {
    /// Type identifier used in configuration.
    pub const TYPE_ID: &'static str = "memory";

    /// Create a named connection without configuration.
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    /// Whether [`Connection::close`] has been called.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            return Err(Error::store(format!("Connection is closed. [name={}]", self.name)));
        }
        Ok(())
    }

    /// Number of documents stored for `entity_type`.
    pub fn count(&self, entity_type: &str) -> usize {
        self.tables.read().get(entity_type).map_or(0, BTreeMap::len)
    }
}

impl Configurable for MemoryConnection {
    fn configure(&mut self, node: &ConfigNode<'_>) -> Result<()> {
        self.name = node.require_attribute("name")?.to_string();
        Ok(())
    }
}

impl Connection for MemoryConnection {
    fn name(&self) -> &str {
        &self.name
    }

    fn connection_type(&self) -> &str {
        Self::TYPE_ID
    }

    fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::Release);
        self.tables.write().clear();
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Data store over a [`MemoryConnection`].
///
/// Search semantics:
/// - `*` or an empty query matches every document of the type
/// - any other query matches documents with a scalar body value, at any
///   depth, containing the text; field names never match
/// - parameters require equality of top-level body fields
/// - results are ordered by key before offset and limit apply
#[derive(Default)]
pub struct InMemoryDataStore {
    core: StoreCore,
}

impl InMemoryDataStore {
    /// Type identifier used in configuration.
    pub const TYPE_ID: &'static str = "memory";

    fn tables(&self) -> Result<&MemoryConnection> {
        let connection = self.core.connection()?;
        let memory = connection
            .as_any()
            .downcast_ref::<MemoryConnection>()
            .ok_or_else(|| {
                Error::store(format!(
                    "Unsupported connection for in-memory store. [name={}][connection={}]",
                    self.core.name(),
                    connection.name()
                ))
            })?;
        memory.ensure_open()?;
        Ok(memory)
    }

    fn matches(doc: &Document, query: &SearchQuery) -> bool {
        let text = query.text.trim();
        if !text.is_empty() && text != "*" && !Self::value_contains(&doc.body, text) {
            return false;
        }
        query
            .params
            .iter()
            .all(|(field, expected)| doc.body.get(field) == Some(expected))
    }

    fn value_contains(value: &serde_json::Value, text: &str) -> bool {
        use serde_json::Value;
        match value {
            Value::Null => false,
            Value::String(s) => s.contains(text),
            Value::Bool(_) | Value::Number(_) => value.to_string().contains(text),
            Value::Array(items) => items.iter().any(|v| Self::value_contains(v, text)),
            Value::Object(fields) => fields.values().any(|v| Self::value_contains(v, text)),
        }
    }
}

impl DataStore for InMemoryDataStore {
    fn core(&self) -> &StoreCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut StoreCore {
        &mut self.core
    }

    fn backend_type(&self) -> &str {
        Self::TYPE_ID
    }

    fn configure(&mut self, manager: &DataStoreManager) -> Result<()> {
        self.core.read_connection(manager)?;
        self.tables().map_err(|e| e.into_config("Invalid in-memory data store connection"))?;
        Ok(())
    }

    fn create(&self, doc: Document, _ctx: Option<&Context>) -> Result<Document> {
        self.core.check_context()?;
        let conn = self.tables()?;
        let mut tables = conn.tables.write();
        let table = tables.entry(doc.entity_type.clone()).or_default();
        if table.contains_key(doc.key.as_str()) {
            return Err(Error::store(format!(
                "Entity already exists. [type={}][key={}]",
                doc.entity_type, doc.key
            )));
        }
        table.insert(doc.key.as_str().to_string(), doc.clone());
        Ok(doc)
    }

    fn update(&self, doc: Document, _ctx: Option<&Context>) -> Result<Document> {
        self.core.check_context()?;
        let conn = self.tables()?;
        let mut tables = conn.tables.write();
        let slot = tables
            .get_mut(&doc.entity_type)
            .and_then(|t| t.get_mut(doc.key.as_str()))
            .ok_or_else(|| {
                Error::store(format!(
                    "Entity not found. [type={}][key={}]",
                    doc.entity_type, doc.key
                ))
            })?;
        *slot = doc.clone();
        Ok(doc)
    }

    fn delete(&self, entity_type: &str, key: &EntityKey, _ctx: Option<&Context>) -> Result<bool> {
        self.core.check_context()?;
        let conn = self.tables()?;
        let mut tables = conn.tables.write();
        Ok(tables
            .get_mut(entity_type)
            .and_then(|t| t.remove(key.as_str()))
            .is_some())
    }

    fn find(
        &self,
        entity_type: &str,
        key: &EntityKey,
        _ctx: Option<&Context>,
    ) -> Result<Option<Document>> {
        self.core.check_context()?;
        let conn = self.tables()?;
        let tables = conn.tables.read();
        Ok(tables
            .get(entity_type)
            .and_then(|t| t.get(key.as_str()))
            .cloned())
    }

    fn search(
        &self,
        entity_type: &str,
        query: &SearchQuery,
        _ctx: Option<&Context>,
    ) -> Result<Vec<Document>> {
        self.core.check_context()?;
        let conn = self.tables()?;
        let limit = query.limit.unwrap_or_else(|| self.core.max_results());
        let tables = conn.tables.read();
        let Some(table) = tables.get(entity_type) else {
            return Ok(Vec::new());
        };
        Ok(table
            .values()
            .filter(|doc| Self::matches(doc, query))
            .skip(query.offset)
            .take(limit)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::entity::Entity;
    use crate::config::registry::TypeRegistry;
    use crate::core::ErrorKind;
    use crate::store::backend::DataStoreExt;
    use crate::store::connection::ConnectionManager;
    use crate::store::descriptor::DataStoreConfig;
    use serde::{Deserialize, Serialize};
    use std::sync::Arc;

    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    struct Order {
        id: String,
        status: String,
        total: u32,
    }

    impl Entity for Order {
        const TYPE_NAME: &'static str = "Order";

        fn key(&self) -> EntityKey {
            EntityKey::new(&self.id)
        }
    }

    fn order(id: &str, status: &str, total: u32) -> Order {
        Order {
            id: id.to_string(),
            status: status.to_string(),
            total,
        }
    }

    fn store() -> (DataStoreManager, Box<dyn DataStore>) {
        let connections = Arc::new(ConnectionManager::new());
        connections.register(Arc::new(MemoryConnection::named("main")));
        let manager = DataStoreManager::new(Arc::new(TypeRegistry::with_defaults()), connections);
        manager.add_descriptor(DataStoreConfig::new("orders", "memory", "main", "memory"));
        let store = manager.get_data_store("orders", "memory").unwrap().unwrap();
        (manager, store)
    }

    #[test]
    fn test_crud() {
        let (_manager, store) = store();
        let o = order("o1", "open", 10);

        store.create_entity(&o, None).unwrap();
        assert_eq!(store.find_entity::<Order>(&o.key(), None).unwrap(), Some(o.clone()));

        let closed = order("o1", "closed", 10);
        store.update_entity(&closed, None).unwrap();
        assert_eq!(
            store.find_entity::<Order>(&o.key(), None).unwrap().unwrap().status,
            "closed"
        );

        assert!(store.delete_entity::<Order>(&o.key(), None).unwrap());
        assert!(!store.delete_entity::<Order>(&o.key(), None).unwrap());
        assert_eq!(store.find_entity::<Order>(&o.key(), None).unwrap(), None);
    }

    #[test]
    fn test_duplicate_create_and_missing_update() {
        let (_manager, store) = store();
        let o = order("o1", "open", 10);
        store.create_entity(&o, None).unwrap();

        let err = store.create_entity(&o, None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Store);

        let err = store.update_entity(&order("o2", "open", 1), None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Store);
    }

    #[test]
    fn test_search_pagination_and_params() {
        let (_manager, store) = store();
        for i in 0..6 {
            let status = if i % 2 == 0 { "open" } else { "closed" };
            store.create_entity(&order(&format!("o{i}"), status, i), None).unwrap();
        }

        let all: Vec<Order> = store.search_entities(&SearchQuery::new("*"), None).unwrap();
        assert_eq!(all.len(), 6);

        let page: Vec<Order> = store
            .search_entities(&SearchQuery::new("*").with_offset(2).with_limit(2), None)
            .unwrap();
        let ids: Vec<&str> = page.iter().map(|o| o.id.as_str()).collect();
        assert_eq!(ids, vec!["o2", "o3"]);

        let open: Vec<Order> = store
            .search_entities(&SearchQuery::new("").with_param("status", "open"), None)
            .unwrap();
        assert_eq!(open.len(), 3);

        let text = store.search_default("Order", "closed", None).unwrap();
        assert_eq!(text.len(), 3);
        assert!(store.search_default("Order", "status", None).unwrap().is_empty());
        assert_eq!(store.search_default("Order", "5", None).unwrap().len(), 1);
        assert!(store.search_default("Unknown", "*", None).unwrap().is_empty());
    }

    #[test]
    fn test_shared_connection_between_stores() {
        let (manager, a) = store();
        let b = manager.get_data_store("orders", "memory").unwrap().unwrap();
        a.create_entity(&order("o1", "open", 1), None).unwrap();
        assert!(b.find_entity::<Order>(&EntityKey::new("o1"), None).unwrap().is_some());
    }

    #[test]
    fn test_operations_from_other_context_fail() {
        let (_manager, store) = store();
        let err = std::thread::scope(|s| {
            s.spawn(|| store.find("Order", &EntityKey::new("o1"), None))
                .join()
                .unwrap()
        })
        .unwrap_err();
        assert!(matches!(err, Error::ContextViolation { .. }));
    }

    #[test]
    fn test_closed_store_rejects_operations() {
        let (_manager, store) = store();
        store.close().unwrap();
        let err = store.create_entity(&order("o1", "open", 1), None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Store);
    }

    #[test]
    fn test_connection_type_mismatch() {
        let connections = Arc::new(ConnectionManager::new());
        connections.register(Arc::new(MemoryConnection::named("main")));
        let manager = DataStoreManager::new(Arc::new(TypeRegistry::with_defaults()), connections);
        manager.add_descriptor(DataStoreConfig::new("orders", "memory", "main", "jdbc"));

        let err = manager.get_data_store("orders", "memory").err().unwrap();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }
}
