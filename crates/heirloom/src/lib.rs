//! # Heirloom
//!
//! Legacy CMS content extraction for migration pipelines.
//!
//! Heirloom builds the queries that enumerate content items (and their
//! translations) out of a legacy CMS schema, and rebuilds each item's field
//! values from the sparse per-field storage tables. Scheduling, ID maps,
//! rollback and the destination write path belong to the host pipeline.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │                       NodeSource                          │
//! │  ┌──────────────┐   ┌────────────┐   ┌─────────────────┐  │
//! │  │ build_query  │ → │ Connection │ → │  prepare_row    │  │
//! │  │ (strategy)   │   │ (host SQL) │   │ (field rebuild) │  │
//! │  └──────────────┘   └────────────┘   └─────────────────┘  │
//! └───────────────────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```ignore
//! use heirloom::{HeirloomConfig, NodeSource, Prepared};
//!
//! let config = HeirloomConfig::load()?;
//! let source = NodeSource::from_config(&config, "article_translations")?;
//!
//! // Hand the SQL to the pipeline's driver...
//! let sql = source.to_sql()?;
//!
//! // ...and enrich every row it returns.
//! for mut row in rows {
//!     if source.prepare_row(&mut conn, &mut row)? == Prepared::Ready {
//!         pipeline.push(row);
//!     }
//! }
//! ```

mod error;
mod source;

pub use error::{HeirloomError, Result};
pub use source::{
    Extraction, NodeSource, Prepared, SkipReason, registry_from_config, render_options,
};

// Re-export the building blocks hosts implement or consume.
pub use heirloom_config::{ConfigError, ConfigLoader, HeirloomConfig};
pub use heirloom_fields::{
    FieldDef, FieldError, FieldRegistry, ItemRef, MigrateRow, ReconstructedField, RowValue,
    SourceRow, StaticFieldRegistry,
};
pub use heirloom_query::{
    MemorySource, NodeTypeCatalog, QueryError, QueryPlan, QueryResult, RenderOptions,
    RenderedSql, SelectQuery, SourceConnection, Value,
};
pub use heirloom_types::{
    Delta, EntityId, LanguageCode, NodeType, RevisionId, SourceOptions, TranslationStrategy,
};
