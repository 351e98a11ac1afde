//! Error types for extraction queries.

use heirloom_types::{NodeType, TranslationStrategy, UnknownStrategy};
use thiserror::Error;

/// Errors raised while building or executing an extraction query.
#[derive(Debug, Error)]
pub enum QueryError {
    /// The configured strategy name matches no translation model.
    #[error(transparent)]
    UnknownStrategy(#[from] UnknownStrategy),

    /// The type filter names a content type the schema registry does not know.
    #[error("unknown content type: {0}")]
    UnknownNodeType(NodeType),

    /// Translations were requested for a content type that is not translatable.
    #[error("content type {node_type} is not translatable under the {strategy} strategy")]
    UntranslatableType {
        node_type: NodeType,
        strategy: TranslationStrategy,
    },

    /// An identifier would be spliced into SQL but is not a plain name.
    #[error("invalid identifier: {0:?}")]
    InvalidIdentifier(String),

    /// A result row is missing an expected column.
    #[error("column not found in result: {0}")]
    ColumnNotFound(String),

    /// A column held a value of the wrong shape.
    #[error("type mismatch for {column}: expected {expected}, got {actual}")]
    TypeMismatch {
        column: String,
        expected: &'static str,
        actual: String,
    },

    /// The underlying connection failed. The original error is kept as the source.
    #[error("source connection failed")]
    Connection(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl QueryError {
    /// Wraps a connection error without altering it.
    pub fn connection<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        QueryError::Connection(Box::new(err))
    }
}

/// Result type for query operations.
pub type Result<T> = std::result::Result<T, QueryError>;
