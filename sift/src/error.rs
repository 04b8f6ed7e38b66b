//! Error types for sift

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Missing configuration: {0}")]
    ConfigurationMissing(String),

    #[error("Invalid query argument: {0}")]
    InvalidQueryArgument(String),

    #[error("Client not found: {0}")]
    ClientResolution(String),

    #[error("{operation} on '{index}' failed: {reason}")]
    Administration {
        operation: String,
        index: String,
        reason: String,
    },

    #[error("Invalid alias: {0}")]
    InvalidAlias(String),

    #[error("Backfill failed: {0}")]
    Backfill(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Build an administration error for a failed engine call
    pub fn administration(
        operation: impl Into<String>,
        index: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::Administration {
            operation: operation.into(),
            index: index.into(),
            reason: reason.into(),
        }
    }

    /// Get the error type as a string for metrics labeling
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::ConfigurationMissing(_) => "configuration_missing",
            Self::InvalidQueryArgument(_) => "invalid_query_argument",
            Self::ClientResolution(_) => "client_resolution",
            Self::Administration { .. } => "administration",
            Self::InvalidAlias(_) => "invalid_alias",
            Self::Backfill(_) => "backfill",
            Self::Config(_) => "config",
            Self::Io(_) => "io",
            Self::Yaml(_) => "yaml",
            Self::Json(_) => "json",
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
