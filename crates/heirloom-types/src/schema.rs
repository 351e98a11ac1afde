//! Table and column names of the legacy content schema.

/// Entity type recorded on translation records and field cells for content items.
pub const NODE_ENTITY_TYPE: &str = "node";

/// Content item table.
pub const NODE_TABLE: &str = "node";

/// Entity-level translation side table.
pub const ENTITY_TRANSLATION_TABLE: &str = "entity_translation";

/// Table prefix for current (un-revisioned) field storage.
pub const FIELD_DATA_PREFIX: &str = "field_data_";

/// Table prefix for revisioned field storage.
pub const FIELD_REVISION_PREFIX: &str = "field_revision_";

/// Columns present on every field storage table.
pub mod field_columns {
    pub const ENTITY_TYPE: &str = "entity_type";
    pub const BUNDLE: &str = "bundle";
    pub const DELETED: &str = "deleted";
    pub const ENTITY_ID: &str = "entity_id";
    pub const REVISION_ID: &str = "revision_id";
    pub const LANGUAGE: &str = "language";
    pub const DELTA: &str = "delta";
}
