//! # heirloom-query: extraction queries for legacy content schemas
//!
//! Builds the single SELECT that enumerates content items out of a legacy
//! CMS database, for one of three translation models:
//!
//! - **None**: every content item is one row.
//! - **`SetLinked`**: translations are separate items grouped by a shared
//!   translation-set id (`tnid`). Originals and translations are extracted
//!   in separate runs.
//! - **`EntityLinked`**: translations live in the `entity_translation` table
//!   keyed by `(entity_id, language)`. The translation record overrides the
//!   item's language, author, status and timestamps.
//!
//! Queries are plain data ([`SelectQuery`]). A host renders them to
//! parameterized SQL ([`SelectQuery::to_sql`]) or hands them to a
//! [`SourceConnection`] implementation; [`MemorySource`] evaluates them in
//! memory for fixtures and tests.
//!
//! ## Usage
//!
//! ```ignore
//! use heirloom_query::{build_query, RenderOptions};
//! use heirloom_types::{SourceOptions, TranslationStrategy};
//!
//! let options = SourceOptions::new(TranslationStrategy::SetLinked)
//!     .with_translations(true)
//!     .with_node_type("article");
//! let plan = build_query(&options, &catalog)?;
//! let sql = plan.to_sql(&RenderOptions::default().with_table_prefix("d7_"))?;
//! ```

mod builder;
mod connection;
mod error;
mod memory;
mod plan;
mod render;
mod value;


pub use builder::{NodeTypeCatalog, build_query, translation_capability};
pub use connection::{QueryResult, Record, Row, SourceConnection, execute};
pub use error::{QueryError, Result};
pub use memory::{MemoryError, MemorySource, MemoryTable};
pub use plan::{
    ColumnLookup, ColumnRef, Filter, FilterCondition, FilterOp, Join, JoinKind, Operand, OrderBy,
    Projection, QueryPlan, SelectQuery, SortOrder, TableRef, check_identifier,
    is_plain_identifier,
};
pub use render::{PlaceholderStyle, RenderOptions, RenderedSql};
pub use value::Value;
