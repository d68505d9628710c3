//! Error types for the provisioner config builder
//!
//! Translation and fleet aggregation only ever fail with configuration or
//! fleet-constraint errors. The remaining variants belong to the deployment
//! adapters and the CLI.

use thiserror::Error;

/// Unified error type for the crate
#[derive(Error, Debug)]
pub enum Error {
    // =========================================================================
    // Translation Errors
    // =========================================================================
    #[error("Configuration error: {field}: {reason}")]
    Configuration { field: String, reason: String },

    #[error("Fleet constraint violated: {0}")]
    FleetConstraint(String),

    // =========================================================================
    // Deployment Errors
    // =========================================================================
    #[error("Kubernetes API error: {0}")]
    Kube(#[from] kube::Error),

    #[error("Chart install failed for release {release}: {reason}")]
    Install { release: String, reason: String },

    // =========================================================================
    // Serialization Errors
    // =========================================================================
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // =========================================================================
    // IO Errors
    // =========================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Shorthand for a configuration error on `field`
    pub fn configuration(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::Configuration {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Field named by a configuration error, if any
    pub fn field(&self) -> Option<&str> {
        match self {
            Error::Configuration { field, .. } => Some(field),
            _ => None,
        }
    }

    /// Check if this error is retryable.
    ///
    /// Translation is pure computation, so only collaborator failures qualify.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::Kube(_) | Error::Install { .. } | Error::Io(_)
        )
    }
}

/// Result type alias for the crate
pub type Result<T> = std::result::Result<T, Error>;
