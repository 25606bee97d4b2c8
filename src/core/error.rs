//! Error types for dalkit.

use thiserror::Error;

/// Result type alias for dalkit operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Boxed cause carried by wrapping error variants.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Coarse classification of an [`Error`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed or incomplete configuration.
    Configuration,
    /// Data store failure, including execution-context violations.
    Store,
    /// Failure in an audit logger's write path.
    Audit,
    /// Lock ownership violation or acquire timeout.
    Lock,
    /// Payload (de)serialization failure.
    Serialization,
    /// I/O failure.
    Io,
}

/// Errors that can occur in dalkit operations.
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors
    #[error("Configuration error: {message}")]
    Configuration {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    // Store errors
    #[error("Data store error: {message}")]
    Store {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    #[error("Data store used outside its execution context. [expected={expected}][current={current}]")]
    ContextViolation { expected: u64, current: u64 },

    // Audit errors
    #[error("Audit error: {message}")]
    Audit {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    // Lock errors
    #[error("Lock not owned by current context. [key={key}][owner={owner}][current={current}]")]
    LockOwnership { key: String, owner: u64, current: u64 },

    #[error("Timed out acquiring lock. [key={key}][timeout={timeout_ms}ms]")]
    LockTimeout { key: String, timeout_ms: u64 },

    // Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Configuration error without an underlying cause.
    pub fn config(message: impl Into<String>) -> Self {
        Error::Configuration {
            message: message.into(),
            source: None,
        }
    }

    /// Configuration error wrapping its cause.
    pub fn config_with(message: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Error::Configuration {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Store error without an underlying cause.
    pub fn store(message: impl Into<String>) -> Self {
        Error::Store {
            message: message.into(),
            source: None,
        }
    }

    /// Store error wrapping a backend failure.
    pub fn store_with(message: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Error::Store {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Audit error without an underlying cause.
    pub fn audit(message: impl Into<String>) -> Self {
        Error::Audit {
            message: message.into(),
            source: None,
        }
    }

    /// Audit error wrapping its cause.
    pub fn audit_with(message: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Error::Audit {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Configuration { .. } => ErrorKind::Configuration,
            Error::Store { .. } | Error::ContextViolation { .. } => ErrorKind::Store,
            Error::Audit { .. } => ErrorKind::Audit,
            Error::LockOwnership { .. } | Error::LockTimeout { .. } => ErrorKind::Lock,
            Error::Serialization(_) => ErrorKind::Serialization,
            Error::Io(_) => ErrorKind::Io,
        }
    }

    /// Wrap this error as the cause of a configuration error.
    ///
    /// Configuration errors pass through untouched so that nested
    /// resolution steps don't stack identical prefixes.
    pub fn into_config(self, message: impl Into<String>) -> Self {
        match self {
            e @ Error::Configuration { .. } => e,
            other => Error::config_with(message, other),
        }
    }

    /// Wrap this error as a store error, keeping store-kind errors as-is.
    pub fn into_store(self, message: impl Into<String>) -> Self {
        match self.kind() {
            ErrorKind::Store => self,
            _ => Error::store_with(message, self),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}
