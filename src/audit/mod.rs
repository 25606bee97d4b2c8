//! Audit Layer
//!
//! Configuration-driven routing of entity audit events:
//! - Loggers built by type identifier and bound to a data store
//! - Entity index, audited marker and default-logger fallback
//! - Sealed records with a SHA3-256 digest

pub mod context;
pub mod entity;
pub mod entry;
pub mod logger;
pub mod loggers;
pub mod manager;
pub mod serializer;

pub use context::AuditContextGenerator;
pub use entity::{Entity, EntityKey, Principal, User};
pub use entry::{AuditRecord, AuditType, RecordId};
pub use logger::{AuditEvent, AuditLogger, LoggerSettings, StoreRef};
pub use loggers::DataStoreAuditLogger;
pub use manager::AuditManager;
pub use serializer::{AuditSerDe, JsonSerDe, PrettyJsonSerDe};
