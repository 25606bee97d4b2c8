//! Type registry.
//!
//! Maps textual type identifiers from configuration to factories. Populated
//! once at startup; resolution never falls back to anything implicit.

use crate::audit::context::AuditContextGenerator;
use crate::audit::entity::Entity;
use crate::audit::logger::AuditLogger;
use crate::audit::loggers::DataStoreAuditLogger;
use crate::lock::lease::{InMemoryLeaseBackend, LeaseBackend};
use crate::store::backend::DataStore;
use crate::store::backends::{InMemoryDataStore, MemoryConnection};
use crate::store::connection::Connection;
use std::any::TypeId;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

/// Constructor for a registered type.
pub type Factory<T> = Arc<dyn Fn() -> Box<T> + Send + Sync>;

/// Factories for one category of configurable types.
pub struct FactoryMap<T: ?Sized> {
    kind: &'static str,
    factories: HashMap<String, Factory<T>>,
}

impl<T: ?Sized> FactoryMap<T> {
    /// Create an empty map for `kind` (used in error messages).
    pub fn new(kind: &'static str) -> Self {
        Self {
            kind,
            factories: HashMap::new(),
        }
    }

    /// Category name.
    pub fn kind(&self) -> &'static str {
        self.kind
    }

    /// Register a factory. Re-registering an identifier replaces it.
    pub fn register<F>(&mut self, id: &str, factory: F)
    where
        F: Fn() -> Box<T> + Send + Sync + 'static,
    {
        if self.factories.insert(id.to_string(), Arc::new(factory)).is_some() {
            warn!(kind = self.kind, id, "Replaced registered factory");
        }
    }

    /// Construct a fresh instance.
    pub fn create(&self, id: &str) -> Option<Box<T>> {
        self.factories.get(id).map(|f| f())
    }

    /// Whether `id` is registered.
    pub fn contains(&self, id: &str) -> bool {
        self.factories.contains_key(id)
    }

    /// Registered identifiers, sorted.
    pub fn identifiers(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }
}

impl<T: ?Sized> Clone for FactoryMap<T> {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            factories: self.factories.clone(),
        }
    }
}

/// Registered entity type.
#[derive(Clone, Debug)]
pub struct EntityTypeInfo {
    /// Configuration name of the type
    pub name: String,
    /// Concrete Rust type
    pub type_id: TypeId,
    /// Logger named by the type's audited marker
    pub audit_logger: Option<&'static str>,
}

/// Startup-populated registry of every dynamically selectable type.
#[derive(Clone)]
pub struct TypeRegistry {
    connections: FactoryMap<dyn Connection>,
    data_stores: FactoryMap<dyn DataStore>,
    audit_loggers: FactoryMap<dyn AuditLogger>,
    context_generators: FactoryMap<dyn AuditContextGenerator>,
    lease_backends: FactoryMap<dyn LeaseBackend>,
    entities: HashMap<String, EntityTypeInfo>,
}

impl TypeRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            connections: FactoryMap::new("connection"),
            data_stores: FactoryMap::new("data store"),
            audit_loggers: FactoryMap::new("audit logger"),
            context_generators: FactoryMap::new("audit context generator"),
            lease_backends: FactoryMap::new("lease backend"),
            entities: HashMap::new(),
        }
    }

    /// Registry pre-populated with the built-in implementations.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry
            .register_connection(MemoryConnection::TYPE_ID, || {
                Box::new(MemoryConnection::default())
            })
            .register_data_store(InMemoryDataStore::TYPE_ID, || {
                Box::new(InMemoryDataStore::default())
            })
            .register_audit_logger(DataStoreAuditLogger::TYPE_ID, || {
                Box::new(DataStoreAuditLogger::default())
            })
            .register_lease_backend(InMemoryLeaseBackend::TYPE_ID, || {
                Box::new(InMemoryLeaseBackend::default())
            });
        registry
    }

    /// Register a connection type.
    pub fn register_connection<F>(&mut self, id: &str, factory: F) -> &mut Self
    where
        F: Fn() -> Box<dyn Connection> + Send + Sync + 'static,
    {
        self.connections.register(id, factory);
        self
    }

    /// Register a data-store backend type.
    pub fn register_data_store<F>(&mut self, id: &str, factory: F) -> &mut Self
    where
        F: Fn() -> Box<dyn DataStore> + Send + Sync + 'static,
    {
        self.data_stores.register(id, factory);
        self
    }

    /// Register an audit logger type.
    pub fn register_audit_logger<F>(&mut self, id: &str, factory: F) -> &mut Self
    where
        F: Fn() -> Box<dyn AuditLogger> + Send + Sync + 'static,
    {
        self.audit_loggers.register(id, factory);
        self
    }

    /// Register an audit context generator type.
    pub fn register_context_generator<F>(&mut self, id: &str, factory: F) -> &mut Self
    where
        F: Fn() -> Box<dyn AuditContextGenerator> + Send + Sync + 'static,
    {
        self.context_generators.register(id, factory);
        self
    }

    /// Register a lease backend type.
    pub fn register_lease_backend<F>(&mut self, id: &str, factory: F) -> &mut Self
    where
        F: Fn() -> Box<dyn LeaseBackend> + Send + Sync + 'static,
    {
        self.lease_backends.register(id, factory);
        self
    }

    /// Register an entity type under its [`Entity::TYPE_NAME`].
    pub fn register_entity<E: Entity>(&mut self) -> &mut Self {
        let info = EntityTypeInfo {
            name: E::TYPE_NAME.to_string(),
            type_id: TypeId::of::<E>(),
            audit_logger: E::AUDIT_LOGGER,
        };
        if self.entities.insert(info.name.clone(), info).is_some() {
            warn!(entity = E::TYPE_NAME, "Replaced registered entity type");
        }
        self
    }

    /// Connection factories.
    pub fn connections(&self) -> &FactoryMap<dyn Connection> {
        &self.connections
    }

    /// Data-store factories.
    pub fn data_stores(&self) -> &FactoryMap<dyn DataStore> {
        &self.data_stores
    }

    /// Audit logger factories.
    pub fn audit_loggers(&self) -> &FactoryMap<dyn AuditLogger> {
        &self.audit_loggers
    }

    /// Audit context generator factories.
    pub fn context_generators(&self) -> &FactoryMap<dyn AuditContextGenerator> {
        &self.context_generators
    }

    /// Lease backend factories.
    pub fn lease_backends(&self) -> &FactoryMap<dyn LeaseBackend> {
        &self.lease_backends
    }

    /// Look up an entity type by its configuration name.
    pub fn entity(&self, name: &str) -> Option<&EntityTypeInfo> {
        self.entities.get(name)
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
