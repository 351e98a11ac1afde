//! Integration tests for heirloom-fields.

#![allow(clippy::unwrap_used)] // Tests use unwrap for simplicity
#![allow(clippy::cast_possible_wrap)] // Test ids are small
#![allow(clippy::missing_panics_doc)] // Test functions don't document panics

use std::convert::Infallible;

use heirloom_query::{MemorySource, QueryResult, SelectQuery, SourceConnection, Value};
use heirloom_types::Delta;
use proptest::prelude::*;

use crate::reconstruct::{DeltaValues, FieldReconstructor, ItemRef, reconstruct, reconstruct_batch};
use crate::registry::{FieldDef, StaticFieldRegistry};
use crate::storage::{KEY_COLUMNS, StorageKind};

// ============================================================================
// Storage fixture
// ============================================================================

fn create_storage(db: &mut MemorySource, field: &FieldDef, kind: StorageKind) {
    let mut columns: Vec<String> = KEY_COLUMNS.iter().map(ToString::to_string).collect();
    columns.extend(field.columns().iter().map(|c| field.storage_column(c)));
    let columns: Vec<&str> = columns.iter().map(String::as_str).collect();
    db.create_table(&kind.table_name(field.name()), &columns);
}

#[derive(Debug, Clone)]
struct StoredCell {
    entity_id: i64,
    revision_id: i64,
    language: &'static str,
    delta: i64,
    deleted: bool,
    values: Vec<(&'static str, Value)>,
}

impl StoredCell {
    fn new(entity_id: i64, language: &'static str, delta: i64) -> Self {
        Self {
            entity_id,
            revision_id: entity_id,
            language,
            delta,
            deleted: false,
            values: Vec::new(),
        }
    }

    fn value(mut self, column: &'static str, value: impl Into<Value>) -> Self {
        self.values.push((column, value.into()));
        self
    }

    fn revision(mut self, revision_id: i64) -> Self {
        self.revision_id = revision_id;
        self
    }

    fn deleted(mut self) -> Self {
        self.deleted = true;
        self
    }
}

fn store(db: &mut MemorySource, field: &FieldDef, kind: StorageKind, cell: &StoredCell) {
    let mut cells: Vec<(String, Value)> = vec![
        ("entity_type".into(), "node".into()),
        ("bundle".into(), "page".into()),
        ("deleted".into(), i64::from(cell.deleted).into()),
        ("entity_id".into(), cell.entity_id.into()),
        ("revision_id".into(), cell.revision_id.into()),
        ("language".into(), cell.language.into()),
        ("delta".into(), cell.delta.into()),
    ];
    cells.extend(
        cell.values
            .iter()
            .map(|(c, v)| (field.storage_column(c), v.clone())),
    );
    db.insert(&kind.table_name(field.name()), cells).unwrap();
}

fn body() -> FieldDef {
    FieldDef::new("body", ["value", "summary", "format"]).unwrap()
}

fn as_vec(field: &crate::ReconstructedField) -> Vec<DeltaValues> {
    field.values().cloned().collect()
}

fn map(pairs: &[(&str, Value)]) -> DeltaValues {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), v.clone()))
        .collect()
}

// ============================================================================
// Reconstruction
// ============================================================================

#[test]
fn deltas_round_trip_with_disjoint_sub_columns() {
    let field = body();
    let mut db = MemorySource::new();
    create_storage(&mut db, &field, StorageKind::Current);
    // Stored out of delta order, with one sub-column spread over two rows.
    for cell in [
        StoredCell::new(1, "en", 2).value("format", "plain"),
        StoredCell::new(1, "en", 0).value("value", "zero"),
        StoredCell::new(1, "en", 1).value("summary", "one"),
        StoredCell::new(1, "en", 0).value("format", "html"),
    ] {
        store(&mut db, &field, StorageKind::Current, &cell);
    }

    let item = ItemRef::new("page", 1u64).with_language("en");
    let out = reconstruct(&mut db, &item, &field).unwrap();
    assert_eq!(
        as_vec(&out),
        vec![
            map(&[("value", "zero".into()), ("format", "html".into())]),
            map(&[("summary", "one".into())]),
            map(&[("format", "plain".into())]),
        ]
    );
    let deltas: Vec<_> = out.iter().map(|(d, _)| d).collect();
    assert_eq!(deltas, vec![Delta::new(0), Delta::new(1), Delta::new(2)]);
}

#[test]
fn deleted_cells_are_never_visible() {
    let field = body();
    let mut db = MemorySource::new();
    create_storage(&mut db, &field, StorageKind::Current);
    store(&mut db, &field, StorageKind::Current, &StoredCell::new(1, "en", 0).value("value", "live"));
    // The only cell for delta 1 is deleted.
    store(
        &mut db,
        &field,
        StorageKind::Current,
        &StoredCell::new(1, "en", 1).value("value", "gone").deleted(),
    );

    let out = reconstruct(&mut db, &ItemRef::new("page", 1u64), &field).unwrap();
    assert_eq!(out.len(), 1);
    assert!(out.get(Delta::new(1)).is_none());
}

#[test]
fn language_without_cells_does_not_fall_back() {
    let field = body();
    let mut db = MemorySource::new();
    create_storage(&mut db, &field, StorageKind::Current);
    store(&mut db, &field, StorageKind::Current, &StoredCell::new(1, "und", 0).value("value", "x"));
    store(&mut db, &field, StorageKind::Current, &StoredCell::new(1, "en", 0).value("value", "y"));

    let fr = ItemRef::new("page", 1u64).with_language("fr");
    assert!(reconstruct(&mut db, &fr, &field).unwrap().is_empty());

    // No language given reads every language.
    let any = ItemRef::new("page", 1u64);
    assert_eq!(reconstruct(&mut db, &any, &field).unwrap().len(), 1);
}

#[test]
fn missing_storage_table_yields_empty_field() {
    let mut db = MemorySource::new();
    let out = reconstruct(&mut db, &ItemRef::new("page", 1u64), &body()).unwrap();
    assert!(out.is_empty());

    let batch = reconstruct_batch(&mut db, &body(), &[ItemRef::new("page", 1u64)]).unwrap();
    assert_eq!(batch, vec![crate::ReconstructedField::new()]);
}

#[test]
fn revision_reads_revision_storage_only() {
    let field = body();
    let mut db = MemorySource::new();
    create_storage(&mut db, &field, StorageKind::Current);
    create_storage(&mut db, &field, StorageKind::Revision);
    store(&mut db, &field, StorageKind::Current, &StoredCell::new(1, "en", 0).revision(3).value("value", "current"));
    store(&mut db, &field, StorageKind::Revision, &StoredCell::new(1, "en", 0).revision(2).value("value", "old"));
    store(&mut db, &field, StorageKind::Revision, &StoredCell::new(1, "en", 0).revision(3).value("value", "current"));

    let old = ItemRef::new("page", 1u64).with_revision(2u64);
    let out = reconstruct(&mut db, &old, &field).unwrap();
    assert_eq!(as_vec(&out), vec![map(&[("value", "old".into())])]);
}

#[test]
fn malformed_delta_is_an_error() {
    let field = FieldDef::new("tags", ["tid"]).unwrap();
    let mut db = MemorySource::new();
    create_storage(&mut db, &field, StorageKind::Current);
    db.insert(
        "field_data_tags",
        [
            ("entity_type", Value::from("node")),
            ("deleted", Value::from(0i64)),
            ("entity_id", Value::from(1i64)),
            ("language", Value::from("en")),
            ("delta", Value::from(-1i64)),
        ],
    )
    .unwrap();
    assert!(matches!(
        reconstruct(&mut db, &ItemRef::new("page", 1u64), &field),
        Err(crate::FieldError::MalformedCell { column, .. }) if column == "delta"
    ));
}

/// A driver that drops trailing values from every row it returns.
struct TruncatingDriver(MemorySource);

impl SourceConnection for TruncatingDriver {
    type Error = Infallible;

    fn execute(&mut self, query: &SelectQuery) -> Result<QueryResult, Self::Error> {
        let mut result = self.0.execute(query).unwrap();
        for row in &mut result.rows {
            row.truncate(row.len() - 1);
        }
        Ok(result)
    }

    fn table_exists(&mut self, table: &str) -> Result<bool, Self::Error> {
        Ok(self.0.table_exists(table).unwrap())
    }
}

#[test]
fn short_driver_rows_are_an_error() {
    let field = FieldDef::new("tags", ["value"]).unwrap();
    let mut db = MemorySource::new();
    create_storage(&mut db, &field, StorageKind::Current);
    store(&mut db, &field, StorageKind::Current, &StoredCell::new(1, "en", 0).value("value", "a"));

    let mut driver = TruncatingDriver(db);
    let item = ItemRef::new("page", 1u64);
    assert!(matches!(
        reconstruct(&mut driver, &item, &field),
        Err(crate::FieldError::MalformedCell { column, .. }) if column == "value"
    ));
    assert!(matches!(
        reconstruct_batch(&mut driver, &field, &[item]),
        Err(crate::FieldError::MalformedCell { .. })
    ));
}

#[test]
fn reconstruct_all_follows_registry_order() {
    let summary = FieldDef::new("summary", ["value"]).unwrap();
    let tags = FieldDef::new("tags", ["value"]).unwrap();
    let registry = StaticFieldRegistry::builder()
        .node_type("page", false)
        .field("page", summary.clone())
        .field("page", tags.clone())
        .build()
        .unwrap();

    let mut db = MemorySource::new();
    create_storage(&mut db, &tags, StorageKind::Current);
    store(&mut db, &tags, StorageKind::Current, &StoredCell::new(10, "en", 0).value("value", "a"));

    let fields = FieldReconstructor::new(&registry)
        .reconstruct_all(&mut db, &ItemRef::new("page", 10u64))
        .unwrap();
    let names: Vec<_> = fields.iter().map(|(n, _)| n.as_str()).collect();
    assert_eq!(names, vec!["summary", "tags"]);
    assert!(fields[0].1.is_empty());
    assert_eq!(fields[1].1.len(), 1);

    let single = FieldReconstructor::new(&registry)
        .reconstruct(&mut db, &ItemRef::new("page", 10u64), &tags)
        .unwrap();
    assert_eq!(single, fields[1].1);

    // Unknown types have nothing to rebuild.
    let none = FieldReconstructor::new(&registry)
        .reconstruct_all(&mut db, &ItemRef::new("blog", 10u64))
        .unwrap();
    assert!(none.is_empty());
}

// ============================================================================
// Batching
// ============================================================================

const LANGUAGES: [&str; 3] = ["en", "fr", "und"];

fn stored_cell() -> impl Strategy<Value = StoredCell> {
    (1i64..5, 1i64..3, 0usize..3, 0i64..3, prop::bool::weighted(0.2), 0usize..3, "[a-z]{1,4}")
        .prop_map(|(entity_id, rev, lang, delta, deleted, column, text)| {
            let column = ["value", "summary", "format"][column];
            let mut cell = StoredCell::new(entity_id, LANGUAGES[lang], delta)
                .revision(entity_id * 10 + rev)
                .value(column, text);
            cell.deleted = deleted;
            cell
        })
}

fn item_ref() -> impl Strategy<Value = ItemRef> {
    (1u64..6, prop::option::of(1u64..3), prop::option::of(0usize..3)).prop_map(
        |(entity_id, rev, lang)| {
            let mut item = ItemRef::new("page", entity_id);
            if let Some(rev) = rev {
                item = item.with_revision(entity_id * 10 + rev);
            }
            if let Some(lang) = lang {
                item = item.with_language(LANGUAGES[lang]);
            }
            item
        },
    )
}

proptest! {
    /// Batched reconstruction equals per-item reconstruction for every item.
    #[test]
    fn batch_matches_per_item(
        current in prop::collection::vec(stored_cell(), 0..20),
        revisions in prop::collection::vec(stored_cell(), 0..20),
        items in prop::collection::vec(item_ref(), 1..8),
    ) {
        let field = body();
        let mut db = MemorySource::new();
        create_storage(&mut db, &field, StorageKind::Current);
        create_storage(&mut db, &field, StorageKind::Revision);
        for cell in &current {
            store(&mut db, &field, StorageKind::Current, cell);
        }
        for cell in &revisions {
            store(&mut db, &field, StorageKind::Revision, cell);
        }

        let batch = reconstruct_batch(&mut db, &field, &items).unwrap();
        prop_assert_eq!(batch.len(), items.len());
        for (item, batched) in items.iter().zip(&batch) {
            let single = reconstruct(&mut db, item, &field).unwrap();
            prop_assert_eq!(&single, batched);
        }
    }

    /// No value stored with deleted = 1 ever surfaces.
    #[test]
    fn deleted_values_never_surface(cells in prop::collection::vec(stored_cell(), 0..30)) {
        let field = body();
        let mut db = MemorySource::new();
        create_storage(&mut db, &field, StorageKind::Current);
        for (i, cell) in cells.iter().enumerate() {
            // Tag each value so deleted ones are recognizable.
            let mut cell = cell.clone();
            let tag = if cell.deleted { "deleted" } else { "live" };
            for value in &mut cell.values {
                value.1 = Value::from(format!("{tag}-{i}"));
            }
            store(&mut db, &field, StorageKind::Current, &cell);
        }

        for entity_id in 1u64..5 {
            let out = reconstruct(&mut db, &ItemRef::new("page", entity_id), &field).unwrap();
            for values in out.values() {
                for value in values.values() {
                    prop_assert!(value.as_text().is_some_and(|t| t.starts_with("live")));
                }
            }
        }
    }
}
