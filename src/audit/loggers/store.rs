//! Store-backed logger implementation.
//!
//! Persists every record as a document in the bound data store.

use crate::audit::entry::AuditRecord;
use crate::audit::logger::{AuditEvent, AuditLogger, LoggerSettings};
use crate::audit::serializer::AuditSerDe;
use crate::config::node::{ConfigNode, Configurable};
use crate::core::{Error, Result};
use crate::store::backend::{DataStore, DataStoreExt};
use crate::store::document::SearchQuery;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

/// Logger writing sealed [`AuditRecord`]s through a [`DataStore`].
#[derive(Default)]
pub struct DataStoreAuditLogger {
    settings: LoggerSettings,
    store: Option<Box<dyn DataStore>>,
    closed: AtomicBool,
}

impl DataStoreAuditLogger {
    /// Type identifier used in configuration.
    pub const TYPE_ID: &'static str = "store";

    fn store(&self) -> Result<&dyn DataStore> {
        self.store
            .as_deref()
            .ok_or_else(|| Error::audit(format!("No data store bound. [logger={}]", self.name())))
    }

    /// Records previously written by this logger, oldest key first.
    pub fn records(&self, query: &SearchQuery) -> Result<Vec<AuditRecord>> {
        self.store()?.search_entities(query, None)
    }
}

impl Configurable for DataStoreAuditLogger {
    fn configure(&mut self, node: &ConfigNode<'_>) -> Result<()> {
        self.settings = LoggerSettings::from_node(node)?;
        Ok(())
    }
}

impl AuditLogger for DataStoreAuditLogger {
    fn settings(&self) -> &LoggerSettings {
        &self.settings
    }

    fn bind_data_store(&mut self, store: Box<dyn DataStore>) {
        self.store = Some(store);
    }

    fn write(&self, event: &AuditEvent<'_>, serializer: &dyn AuditSerDe) -> Result<AuditRecord> {
        if self.closed.load(Ordering::Acquire) {
            return Err(Error::audit(format!("Logger is closed. [logger={}]", self.name())));
        }
        let store = self.store()?;

        let payload = serializer
            .serialize(event.entity)
            .map_err(|e| Error::audit_with("Failed to serialize audited entity", e))?;
        let mut record = AuditRecord::new(
            event.audit_type.clone(),
            event.principal.name(),
            event.entity_type,
            event.entity_key.clone(),
        )
        .with_entity(serializer.name(), payload)
        .with_delta(event.change_delta)
        .with_context(event.context.clone())
        .with_logger(self.name());
        record.seal();

        store.create_entity(&record, None).map_err(|e| {
            Error::audit_with(
                format!(
                    "Failed to persist audit record. [logger={}][store={}]",
                    self.name(),
                    store.name()
                ),
                e,
            )
        })?;

        debug!(
            logger = self.name(),
            record = %record.id,
            entity_type = event.entity_type,
            "Audit record written"
        );
        Ok(record)
    }

    fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        match &self.store {
            Some(store) => store.close(),
            None => Ok(()),
        }
    }
}
