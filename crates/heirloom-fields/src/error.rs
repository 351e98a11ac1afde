//! Error types for field reconstruction.

use heirloom_query::QueryError;
use thiserror::Error;

/// Errors raised while declaring or reconstructing fields.
#[derive(Debug, Error)]
pub enum FieldError {
    /// A field name cannot be turned into a storage table name.
    #[error("invalid field name: {0:?}")]
    InvalidFieldName(String),

    /// A sub-column name is malformed or collides with a storage key column.
    #[error("invalid sub-column {column:?} for field {field}")]
    InvalidColumn { field: String, column: String },

    /// A field was declared twice for the same content type.
    #[error("field {field} declared twice for content type {node_type}")]
    DuplicateField { node_type: String, field: String },

    /// A storage row has a column of the wrong shape, or is missing one.
    #[error("malformed {column} in {table}: {value}")]
    MalformedCell {
        table: String,
        column: String,
        value: String,
    },

    /// Building or running a storage query failed.
    #[error(transparent)]
    Query(#[from] QueryError),
}

/// Result type for field operations.
pub type Result<T> = std::result::Result<T, FieldError>;
