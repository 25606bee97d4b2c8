//! Audit routing engine.
//!
//! Maps entity types and logger names to configured loggers and dispatches
//! audit events. Routing for an entity type, in order:
//! 1. the entity index built from each logger's `entities` list
//! 2. the logger named by the type's audited marker, if registered
//! 3. the default logger
//!
//! A miss is a silent no-op. Configuration takes `&mut self` and dispatch
//! takes `&self`, so once the manager is shared behind an `Arc` its
//! registries are frozen and safe for concurrent lookups.

use crate::audit::context::AuditContextGenerator;
use crate::audit::entity::{Entity, Principal};
use crate::audit::entry::{AuditRecord, AuditType};
use crate::audit::logger::{AuditEvent, AuditLogger};
use crate::audit::serializer::{AuditSerDe, JsonSerDe};
use crate::config::node::ConfigNode;
use crate::config::resolve::instantiate;
use crate::core::{Context, Error, Result};
use crate::store::descriptor::DataStoreConfig;
use crate::store::manager::DataStoreManager;
use std::any::TypeId;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Configuration node holding the audit settings.
pub const CONFIG_PATH: &str = "audit-manager";

/// Child of [`CONFIG_PATH`] holding one logger element or a list of them.
pub const LOGGER_PATH: &str = "logger";

/// Audit routing engine.
pub struct AuditManager {
    stores: Arc<DataStoreManager>,
    loggers: HashMap<String, Arc<dyn AuditLogger>>,
    entity_index: HashMap<TypeId, Arc<dyn AuditLogger>>,
    default_logger: Option<Arc<dyn AuditLogger>>,
    serializer: Arc<dyn AuditSerDe>,
}

impl AuditManager {
    /// Create an empty manager resolving logger stores through `stores`.
    pub fn new(stores: Arc<DataStoreManager>) -> Self {
        Self {
            stores,
            loggers: HashMap::new(),
            entity_index: HashMap::new(),
            default_logger: None,
            serializer: Arc::new(JsonSerDe),
        }
    }

    /// Replace the serializer used when a call doesn't supply one.
    pub fn with_serializer(mut self, serializer: Arc<dyn AuditSerDe>) -> Self {
        self.serializer = serializer;
        self
    }

    /// Read logger configuration from the `audit-manager` child of `node`.
    ///
    /// A failing element aborts configuration; loggers registered from
    /// earlier elements stay registered.
    pub fn configure(&mut self, node: &ConfigNode<'_>) -> Result<()> {
        let Some(section) = node.child(CONFIG_PATH) else {
            debug!(node = node.path(), "No audit configuration found");
            return Ok(());
        };
        let Some(loggers) = section.child(LOGGER_PATH) else {
            debug!(node = section.path(), "No audit loggers configured");
            return Ok(());
        };
        for element in loggers.elements() {
            self.read_logger_config(&element).map_err(|e| {
                e.into_config(format!(
                    "Failed to configure audit logger. [node={}]",
                    element.path()
                ))
            })?;
        }
        Ok(())
    }

    fn read_logger_config(&mut self, node: &ConfigNode<'_>) -> Result<()> {
        let stores = Arc::clone(&self.stores);
        let types = stores.types();
        let mut logger = instantiate(node, types.audit_loggers())?;

        let store = stores
            .get_data_store(logger.data_store_name(), logger.data_store_type())?
            .ok_or_else(|| {
                Error::config(format!(
                    "[logger={}] Data store not found. [name={}][type={}]",
                    logger.name(),
                    logger.data_store_name(),
                    logger.data_store_type()
                ))
            })?;
        logger.bind_data_store(store);

        let logger: Arc<dyn AuditLogger> = Arc::from(logger);
        self.register(logger.clone());

        for entity in logger.entity_types() {
            let info = types.entity(entity).ok_or_else(|| {
                Error::config(format!(
                    "[logger={}] Unknown entity type. [entity={}]",
                    logger.name(),
                    entity
                ))
            })?;
            if let Some(previous) = self.entity_index.insert(info.type_id, logger.clone()) {
                if previous.name() != logger.name() {
                    warn!(
                        entity = %entity,
                        previous = previous.name(),
                        logger = logger.name(),
                        "Entity type re-routed"
                    );
                }
            }
        }

        info!(
            logger = logger.name(),
            default = logger.is_default(),
            entities = logger.entity_types().len(),
            node = node.path(),
            "Configured audit logger"
        );
        Ok(())
    }

    /// Register a logger by name. The last registration for a name wins, and
    /// the last logger marked default becomes the fallback.
    pub fn register(&mut self, logger: Arc<dyn AuditLogger>) {
        let name = logger.name().to_string();
        if logger.is_default() {
            self.default_logger = Some(logger.clone());
        }
        if self.loggers.insert(name.clone(), logger).is_some() {
            warn!(logger = %name, "Replaced registered audit logger");
        }
    }

    /// Route entity type `E` to `logger`, replacing any earlier route.
    pub fn route<E: Entity>(&mut self, logger: Arc<dyn AuditLogger>) {
        self.entity_index.insert(TypeId::of::<E>(), logger);
    }

    /// Logger registered under `name`.
    pub fn get_logger(&self, name: &str) -> Option<Arc<dyn AuditLogger>> {
        self.loggers.get(name).cloned()
    }

    /// Logger that events for entity type `E` route to.
    pub fn logger_for<E: Entity>(&self) -> Option<Arc<dyn AuditLogger>> {
        self.resolve(TypeId::of::<E>(), E::AUDIT_LOGGER).cloned()
    }

    fn resolve(&self, type_id: TypeId, marker: Option<&str>) -> Option<&Arc<dyn AuditLogger>> {
        self.entity_index
            .get(&type_id)
            .or_else(|| marker.and_then(|name| self.loggers.get(name)))
            .or(self.default_logger.as_ref())
    }

    /// Default logger, if one is configured.
    pub fn default_logger(&self) -> Option<Arc<dyn AuditLogger>> {
        self.default_logger.clone()
    }

    /// Number of registered loggers.
    pub fn logger_count(&self) -> usize {
        self.loggers.len()
    }

    /// Audit `entity` with the routed logger and the default serializer.
    ///
    /// Returns `Ok(None)` without any I/O when no logger resolves.
    pub fn audit<E: Entity>(
        &self,
        audit_type: AuditType,
        entity: &E,
        change_delta: Option<&str>,
        principal: &dyn Principal,
    ) -> Result<Option<AuditRecord>> {
        self.audit_with(audit_type, entity, change_delta, principal, self.serializer.as_ref())
    }

    /// [`audit`](Self::audit) with an explicit serializer.
    pub fn audit_with<E: Entity>(
        &self,
        audit_type: AuditType,
        entity: &E,
        change_delta: Option<&str>,
        principal: &dyn Principal,
        serializer: &dyn AuditSerDe,
    ) -> Result<Option<AuditRecord>> {
        let Some(logger) = self.resolve(TypeId::of::<E>(), E::AUDIT_LOGGER) else {
            debug!(entity_type = E::TYPE_NAME, "No audit logger resolved");
            return Ok(None);
        };
        write(logger.as_ref(), audit_type, entity, change_delta, principal, serializer, None)
            .map(Some)
    }

    /// Audit `entity` with the logger registered as `logger`, bypassing
    /// routing. An unknown name is a silent no-op.
    pub fn audit_to<E: Entity>(
        &self,
        logger: &str,
        audit_type: AuditType,
        entity: &E,
        change_delta: Option<&str>,
        principal: &dyn Principal,
    ) -> Result<Option<AuditRecord>> {
        self.audit_to_with(
            logger,
            audit_type,
            entity,
            change_delta,
            principal,
            self.serializer.as_ref(),
        )
    }

    /// [`audit_to`](Self::audit_to) with an explicit serializer.
    pub fn audit_to_with<E: Entity>(
        &self,
        logger: &str,
        audit_type: AuditType,
        entity: &E,
        change_delta: Option<&str>,
        principal: &dyn Principal,
        serializer: &dyn AuditSerDe,
    ) -> Result<Option<AuditRecord>> {
        let Some(logger) = self.loggers.get(logger) else {
            debug!(logger, "Audit logger not registered");
            return Ok(None);
        };
        write(logger.as_ref(), audit_type, entity, change_delta, principal, serializer, None)
            .map(Some)
    }

    /// Audit a mutation made through the data store described by `store`.
    ///
    /// Stores not marked audited are skipped. A store naming its own logger
    /// bypasses routing; otherwise the entity type is routed as usual. The
    /// optional generator adds store context to the record.
    #[allow(clippy::too_many_arguments)]
    pub fn audit_store_mutation<E: Entity>(
        &self,
        store: &DataStoreConfig,
        generator: Option<&dyn AuditContextGenerator>,
        audit_type: AuditType,
        entity: &E,
        change_delta: Option<&str>,
        principal: &dyn Principal,
        ctx: Option<&Context>,
    ) -> Result<Option<AuditRecord>> {
        if !store.audited {
            return Ok(None);
        }
        let logger = match store.audit_logger.as_deref() {
            Some(name) => self.loggers.get(name),
            None => self.resolve(TypeId::of::<E>(), E::AUDIT_LOGGER),
        };
        let Some(logger) = logger else {
            debug!(data_store = %store.name, entity_type = E::TYPE_NAME, "No audit logger resolved");
            return Ok(None);
        };
        let context = generator.and_then(|g| g.generate(&store.name, E::TYPE_NAME, ctx));
        write(
            logger.as_ref(),
            audit_type,
            entity,
            change_delta,
            principal,
            self.serializer.as_ref(),
            context,
        )
        .map(Some)
    }

    /// Close every registered logger once and clear all registries.
    ///
    /// Every logger is closed even if some fail; the first failure is
    /// returned. Closing an already closed manager does nothing.
    pub fn close(&mut self) -> Result<()> {
        self.entity_index.clear();
        self.default_logger = None;
        let mut first_err = None;
        for (name, logger) in self.loggers.drain() {
            if let Err(e) = logger.close() {
                warn!(logger = %name, error = %e, "Failed to close audit logger");
                first_err.get_or_insert(e);
            }
        }
        first_err.map_or(Ok(()), Err)
    }
}

fn write<E: Entity>(
    logger: &dyn AuditLogger,
    audit_type: AuditType,
    entity: &E,
    change_delta: Option<&str>,
    principal: &dyn Principal,
    serializer: &dyn AuditSerDe,
    context: Option<serde_json::Value>,
) -> Result<AuditRecord> {
    let snapshot = serde_json::to_value(entity)
        .map_err(|e| Error::audit_with(format!("Failed to snapshot {}", E::TYPE_NAME), e))?;
    let event = AuditEvent {
        audit_type,
        entity_type: E::TYPE_NAME,
        entity_key: entity.key(),
        entity: &snapshot,
        change_delta,
        principal,
        context,
    };
    debug!(logger = logger.name(), entity_type = E::TYPE_NAME, "Dispatching audit event");
    logger.write(&event, serializer)
}
