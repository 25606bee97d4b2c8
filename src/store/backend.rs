//! DataStore trait definition.
//!
//! Core contract every storage backend implements, plus the shared state
//! backends build on.

use crate::audit::entity::{Entity, EntityKey};
use crate::config::node::ConfigNode;
use crate::config::resolve::resolve_shared;
use crate::core::{Context, ContextId, Error, Result};
use crate::store::connection::Connection;
use crate::store::descriptor::{ConnectionSpec, DataStoreConfig, DEFAULT_MAX_RESULTS};
use crate::store::document::{Document, SearchQuery};
use crate::store::manager::DataStoreManager;
use serde::de::DeserializeOwned;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Uniform operation set over heterogeneous backends.
///
/// An instance belongs to the execution context that constructed it. Every
/// operation fails with [`Error::ContextViolation`] when called from any
/// other context; callers needing fan-out build one instance per context.
pub trait DataStore: Send + Sync {
    /// Shared backend state.
    fn core(&self) -> &StoreCore;

    /// Mutable shared backend state.
    fn core_mut(&mut self) -> &mut StoreCore;

    /// Backend-type identifier.
    fn backend_type(&self) -> &str;

    /// Finish configuration once the descriptor is set.
    ///
    /// Called by the owning manager, which supplies shared services such as
    /// connection resolution.
    fn configure(&mut self, manager: &DataStoreManager) -> Result<()>;

    /// Persist a new document.
    fn create(&self, doc: Document, ctx: Option<&Context>) -> Result<Document>;

    /// Replace an existing document.
    fn update(&self, doc: Document, ctx: Option<&Context>) -> Result<Document>;

    /// Delete by key. Returns false if nothing was deleted.
    fn delete(&self, entity_type: &str, key: &EntityKey, ctx: Option<&Context>) -> Result<bool>;

    /// Find by key.
    fn find(
        &self,
        entity_type: &str,
        key: &EntityKey,
        ctx: Option<&Context>,
    ) -> Result<Option<Document>>;

    /// Search documents of `entity_type`.
    fn search(
        &self,
        entity_type: &str,
        query: &SearchQuery,
        ctx: Option<&Context>,
    ) -> Result<Vec<Document>>;

    /// Release the store. The shared connection stays open.
    fn close(&self) -> Result<()> {
        self.core().mark_closed();
        Ok(())
    }

    /// Store name from the descriptor.
    fn name(&self) -> &str {
        self.core().name()
    }

    /// Attach the descriptor. First configuration phase.
    fn with_config(&mut self, config: DataStoreConfig) {
        self.core_mut().config = Some(config);
    }

    /// Supply a connection, skipping resolution from the descriptor.
    fn with_connection(&mut self, connection: Arc<dyn Connection>) {
        self.core_mut().connection = Some(connection);
    }
}

/// State shared by every backend.
pub struct StoreCore {
    config: Option<DataStoreConfig>,
    connection: Option<Arc<dyn Connection>>,
    owner: ContextId,
    closed: AtomicBool,
}

impl StoreCore {
    /// Bind to the calling execution context.
    pub fn new() -> Self {
        Self {
            config: None,
            connection: None,
            owner: ContextId::current(),
            closed: AtomicBool::new(false),
        }
    }

    /// Context that created the store.
    pub fn owner(&self) -> ContextId {
        self.owner
    }

    /// Fail unless called from the owning context of an open store.
    pub fn check_context(&self) -> Result<()> {
        let current = ContextId::current();
        if current != self.owner {
            return Err(Error::ContextViolation {
                expected: self.owner.as_u64(),
                current: current.as_u64(),
            });
        }
        if self.closed.load(Ordering::Acquire) {
            return Err(Error::store(format!("Data store is closed. [name={}]", self.name())));
        }
        Ok(())
    }

    /// Descriptor, once set.
    pub fn config(&self) -> Result<&DataStoreConfig> {
        self.config
            .as_ref()
            .ok_or_else(|| Error::config("Data store has no configuration"))
    }

    /// Store name, empty before configuration.
    pub fn name(&self) -> &str {
        self.config.as_ref().map_or("", |c| c.name.as_str())
    }

    /// Page size for searches without an explicit limit.
    pub fn max_results(&self) -> usize {
        self.config
            .as_ref()
            .map_or(DEFAULT_MAX_RESULTS, |c| c.max_results)
    }

    /// Resolved connection.
    pub fn connection(&self) -> Result<&Arc<dyn Connection>> {
        self.connection.as_ref().ok_or_else(|| {
            Error::store(format!("Data store has no connection. [name={}]", self.name()))
        })
    }

    /// Resolve the descriptor's connection unless one was supplied.
    ///
    /// A reference name must exist in the manager's connection registry;
    /// an inline node is resolved through the type registry. The result must
    /// match the descriptor's connection type.
    pub fn read_connection(&mut self, manager: &DataStoreManager) -> Result<()> {
        if self.connection.is_some() {
            return Ok(());
        }
        let config = self.config()?;
        let connection = match &config.connection {
            ConnectionSpec::Reference(name) => {
                manager.connections().connection(name).ok_or_else(|| {
                    Error::config(format!(
                        "Invalid connection reference. [data store={}][reference={}]",
                        config.name, name
                    ))
                })?
            }
            ConnectionSpec::Inline(value) => {
                let node = ConfigNode::new(format!("/dataStores/{}/connection", config.name), value);
                resolve_shared(
                    &node,
                    |name| manager.connections().connection(name),
                    manager.types().connections(),
                )?
            }
        };
        if connection.connection_type() != config.connection_type {
            return Err(Error::config(format!(
                "Connection type mismatch. [data store={}][expected={}][actual={}]",
                config.name,
                config.connection_type,
                connection.connection_type()
            )));
        }
        self.connection = Some(connection);
        Ok(())
    }

    /// Mark the store closed.
    pub fn mark_closed(&self) {
        self.closed.store(true, Ordering::Release);
    }
}

impl Default for StoreCore {
    fn default() -> Self {
        Self::new()
    }
}

/// Typed helpers over [`DataStore`].
pub trait DataStoreExt: DataStore {
    /// Persist a new entity.
    fn create_entity<E: Entity>(&self, entity: &E, ctx: Option<&Context>) -> Result<()> {
        self.create(encode(self.core(), entity)?, ctx).map(|_| ())
    }

    /// Replace an existing entity.
    fn update_entity<E: Entity>(&self, entity: &E, ctx: Option<&Context>) -> Result<()> {
        self.update(encode(self.core(), entity)?, ctx).map(|_| ())
    }

    /// Delete an entity by key.
    fn delete_entity<E: Entity>(&self, key: &EntityKey, ctx: Option<&Context>) -> Result<bool> {
        self.delete(E::TYPE_NAME, key, ctx)
    }

    /// Find an entity by key.
    fn find_entity<E: Entity + DeserializeOwned>(
        &self,
        key: &EntityKey,
        ctx: Option<&Context>,
    ) -> Result<Option<E>> {
        self.find(E::TYPE_NAME, key, ctx)?
            .map(|doc| doc.into_entity().map_err(|e| e.into_store("Failed to decode entity")))
            .transpose()
    }

    /// Search entities.
    fn search_entities<E: Entity + DeserializeOwned>(
        &self,
        query: &SearchQuery,
        ctx: Option<&Context>,
    ) -> Result<Vec<E>> {
        self.search(E::TYPE_NAME, query, ctx)?
            .into_iter()
            .map(|doc| doc.into_entity().map_err(|e| e.into_store("Failed to decode entity")))
            .collect()
    }

    /// Search with the store's default page size.
    fn search_default(
        &self,
        entity_type: &str,
        text: &str,
        ctx: Option<&Context>,
    ) -> Result<Vec<Document>> {
        let query = SearchQuery::new(text).with_limit(self.core().max_results());
        self.search(entity_type, &query, ctx)
    }
}

impl<T: DataStore + ?Sized> DataStoreExt for T {}

fn encode<E: Entity>(core: &StoreCore, entity: &E) -> Result<Document> {
    core.check_context()?;
    Document::from_entity(entity).map_err(|e| e.into_store("Failed to encode entity"))
}
