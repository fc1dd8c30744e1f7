//! Error types for the GSLB switcher
//!
//! This module defines all error types used throughout the crate.
//!
//! Only conditions that abort an evaluation cycle are errors. An unreachable
//! health-check target is an expected outcome and is reported as an unhealthy
//! [`HealthVerdict`](crate::traits::HealthVerdict), never through this type.

use thiserror::Error;

/// Result type alias for GSLB operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the GSLB switcher
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration errors (bad URL, unparsable target IP, missing field)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Health checker could not be set up (e.g. its HTTP client failed to build)
    #[error("Health check error: {0}")]
    HealthCheck(String),

    /// The managed record is missing, ambiguous or incomplete
    #[error("Record error: {0}")]
    Record(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP client errors (from provider APIs)
    #[error("HTTP error: {0}")]
    Http(String),

    /// Authentication errors
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Record not found
    #[error("Record not found: {0}")]
    NotFound(String),

    /// Provider-specific error
    #[error("Provider error ({provider}): {message}")]
    Provider {
        /// Provider name
        provider: String,
        /// Error message
        message: String,
    },

    /// Wraps an inner error with the evaluation step that produced it
    #[error("{context}: {source}")]
    Context {
        /// What the evaluator was doing
        context: &'static str,
        /// Underlying failure
        #[source]
        source: Box<Error>,
    },

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a health check error
    pub fn health_check(msg: impl Into<String>) -> Self {
        Self::HealthCheck(msg.into())
    }

    /// Create a record error
    pub fn record(msg: impl Into<String>) -> Self {
        Self::Record(msg.into())
    }

    /// Create an HTTP error
    pub fn http(msg: impl Into<String>) -> Self {
        Self::Http(msg.into())
    }

    /// Create an authentication error
    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Authentication(msg.into())
    }

    /// Create a "not found" error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a provider-specific error
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Attach the name of the failing step to an error
    pub fn context(self, context: &'static str) -> Self {
        Self::Context {
            context,
            source: Box::new(self),
        }
    }

    /// The innermost error, with every [`Error::Context`] layer removed
    pub fn root(&self) -> &Error {
        match self {
            Self::Context { source, .. } => source.root(),
            other => other,
        }
    }
}

/// Helper for converting anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}
