//! Error types for the Heirloom facade.

use heirloom_config::ConfigError;
use heirloom_fields::FieldError;
use heirloom_query::QueryError;
use thiserror::Error;

/// Result type for Heirloom operations.
pub type Result<T> = std::result::Result<T, HeirloomError>;

/// Errors that can occur while configuring or running an extraction.
#[derive(Debug, Error)]
pub enum HeirloomError {
    /// No source with this id is configured.
    #[error("unknown source: {0}")]
    UnknownSource(String),

    /// Query building or execution failed.
    #[error("query error: {0}")]
    Query(#[from] QueryError),

    /// Field declaration or reconstruction failed.
    #[error("field error: {0}")]
    Field(#[from] FieldError),

    /// Configuration was inconsistent.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}
