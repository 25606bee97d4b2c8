//! # dalkit - Configurable Data-Access Layer
//!
//! Runtime-selected storage, audit and locking:
//! - **Config**: type resolution from a configuration tree
//! - **Store**: connections, data-store descriptors and context-bound store instances
//! - **Audit**: entity-to-logger routing with sealed audit records
//! - **Lock**: reentrant locks with verifiable ownership and lease backends
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use dalkit::audit::{AuditManager, AuditType, Entity, EntityKey, User};
//! use dalkit::config::{ConfigTree, TypeRegistry};
//! use dalkit::store::{ConnectionManager, DataStoreManager};
//! use serde::Serialize;
//! use std::sync::Arc;
//!
//! #[derive(Serialize)]
//! struct Order {
//!     id: String,
//! }
//!
//! impl Entity for Order {
//!     const TYPE_NAME: &'static str = "Order";
//!
//!     fn key(&self) -> EntityKey {
//!         EntityKey::new(&self.id)
//!     }
//! }
//!
//! fn main() -> dalkit::Result<()> {
//!     let tree = ConfigTree::from_json(&std::fs::read_to_string("dalkit.json")?)?;
//!
//!     let mut types = TypeRegistry::with_defaults();
//!     types.register_entity::<Order>();
//!
//!     let stores = DataStoreManager::new(Arc::new(types), Arc::new(ConnectionManager::new()));
//!     stores.configure(&tree.root())?;
//!
//!     let mut audit = AuditManager::new(Arc::new(stores));
//!     audit.configure(&tree.root())?;
//!
//!     let order = Order { id: "o-1".into() };
//!     audit.audit(AuditType::Create, &order, None, &User::new("alice"))?;
//!     audit.close()
//! }
//! ```

pub mod audit;
pub mod config;
pub mod core;
pub mod lock;
pub mod store;

pub use core::error::{Error, ErrorKind, Result};
