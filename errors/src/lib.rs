//! # Platform Configuration Errors
//!
//! Error handling for configuration assembly of the embedded billing
//! platform.
//!
//! - Uses `thiserror` for structured error definitions
//! - Every message uses named fields
//! - Underlying causes are kept as `source` for debugging

use thiserror::Error;

/// Boxed cause carried by [`ConfigError::Initialization`].
pub type BoxedCause = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Configuration assembly errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Construction could not complete: the provider factory failed, the base
    /// configuration location was malformed, or settings were invalid.
    #[error("Initialization failed: {reason}")]
    Initialization {
        reason: String,
        #[source]
        source: Option<BoxedCause>,
    },

    #[error("I/O failure while {operation}: {source}")]
    Io {
        operation: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid value for {key}: {value} ({reason})")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },
}

impl ConfigError {
    /// Initialization failure without an underlying cause.
    pub fn initialization(reason: impl Into<String>) -> Self {
        Self::Initialization {
            reason: reason.into(),
            source: None,
        }
    }

    /// Initialization failure wrapping the error that caused it.
    pub fn initialization_caused_by(
        reason: impl Into<String>,
        cause: impl Into<BoxedCause>,
    ) -> Self {
        Self::Initialization {
            reason: reason.into(),
            source: Some(cause.into()),
        }
    }

    pub fn io(operation: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            operation: operation.into(),
            source,
        }
    }

    pub fn is_initialization(&self) -> bool {
        matches!(self, Self::Initialization { .. })
    }

    pub fn is_io(&self) -> bool {
        matches!(self, Self::Io { .. })
    }
}

pub type Result<T> = std::result::Result<T, ConfigError>;
