//! # heirloom-fields: field reconstruction for legacy content
//!
//! Legacy field values live in one sparse table per field, one row per
//! `(entity, revision, language, delta)`, with each sub-column in its own
//! physical column. This crate turns those rows back into an ordered list of
//! values per field and attaches them to the extracted row.
//!
//! - [`FieldRegistry`] lists the fields of each content type;
//!   [`StaticFieldRegistry`] is the configuration-backed implementation and
//!   doubles as the query builder's [`heirloom_query::NodeTypeCatalog`].
//! - [`reconstruct`] rebuilds one field of one item; [`reconstruct_batch`]
//!   does the same for a page of items with one query per field.
//! - [`MigrateRow`] is the host pipeline's row; [`SourceRow`] a plain map.

mod error;
mod reconstruct;
mod registry;
mod row;
mod storage;

#[cfg(test)]
mod tests;

pub use error::{FieldError, Result};
pub use reconstruct::{
    DeltaValues, FieldReconstructor, ItemFields, ItemRef, ReconstructedField, reconstruct,
    reconstruct_batch,
};
pub use registry::{FieldDef, FieldRegistry, StaticFieldRegistry, StaticFieldRegistryBuilder};
pub use row::{MigrateRow, RowValue, SourceRow};
pub use storage::{KEY_COLUMNS, StorageKind, is_valid_name};
