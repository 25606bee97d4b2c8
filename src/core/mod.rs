//! Core utilities and common types for dalkit.

pub mod context;
pub mod error;
pub mod logging;
pub mod types;

pub use context::{Context, ContextId};
pub use error::{BoxError, Error, ErrorKind, Result};
pub use types::*;
