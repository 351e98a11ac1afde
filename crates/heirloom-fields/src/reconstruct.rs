//! Field Reconstructor.
//!
//! Field values are stored one row per `(entity, revision, language, delta)`
//! in a table per field, with each sub-column held in its own physical column
//! named `<field>_<sub>`. Reconstruction reads those rows for one content item
//! and folds them into an ordered-by-delta list of sub-column maps.
//!
//! NULL sub-column cells are treated as absent: sparse storage leaves columns
//! a delta never set as NULL, and they do not appear in the rebuilt map.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use heirloom_query::{
    ColumnRef, Filter, QueryError, QueryResult, SelectQuery, SortOrder, SourceConnection, Value,
    execute,
};
use heirloom_types::schema::{NODE_ENTITY_TYPE, field_columns};
use heirloom_types::{Delta, EntityId, LanguageCode, NodeType, RevisionId};
use tracing::debug;

use crate::error::{FieldError, Result};
use crate::registry::{FieldDef, FieldRegistry};
use crate::storage::StorageKind;

const ALIAS: &str = "f";

/// The content item whose fields are being rebuilt.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ItemRef {
    pub node_type: NodeType,
    pub entity_id: EntityId,
    /// Selects revision storage when present.
    pub revision_id: Option<RevisionId>,
    /// Empty means every language.
    pub language: LanguageCode,
}

impl ItemRef {
    pub fn new(node_type: impl Into<NodeType>, entity_id: impl Into<EntityId>) -> Self {
        Self {
            node_type: node_type.into(),
            entity_id: entity_id.into(),
            revision_id: None,
            language: LanguageCode::default(),
        }
    }

    pub fn with_revision(mut self, revision_id: impl Into<RevisionId>) -> Self {
        self.revision_id = Some(revision_id.into());
        self
    }

    pub fn with_language(mut self, language: impl Into<LanguageCode>) -> Self {
        self.language = language.into();
        self
    }

    pub fn storage_kind(&self) -> StorageKind {
        StorageKind::for_revision(self.revision_id)
    }

    fn accepts(&self, cell: &Cell) -> bool {
        self.entity_id.as_u64() == cell.entity_id
            && self
                .revision_id
                .is_none_or(|r| cell.revision_id == Some(r.as_u64()))
            && (!self.language.is_specified() || self.language.as_str() == cell.language)
    }
}

/// Sub-column name to value, for one delta.
pub type DeltaValues = BTreeMap<String, Value>;

/// All values of one field on one item, ordered by delta.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReconstructedField {
    deltas: BTreeMap<Delta, DeltaValues>,
}

impl ReconstructedField {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.deltas.is_empty()
    }

    /// Number of deltas holding at least one value.
    pub fn len(&self) -> usize {
        self.deltas.len()
    }

    pub fn get(&self, delta: Delta) -> Option<&DeltaValues> {
        self.deltas.get(&delta)
    }

    /// Deltas and their values in ascending delta order.
    pub fn iter(&self) -> impl Iterator<Item = (Delta, &DeltaValues)> {
        self.deltas.iter().map(|(d, v)| (*d, v))
    }

    /// Values in ascending delta order.
    pub fn values(&self) -> impl Iterator<Item = &DeltaValues> {
        self.deltas.values()
    }

    /// Sets one sub-column of one delta. NULL values are ignored.
    pub fn insert(&mut self, delta: Delta, column: impl Into<String>, value: Value) {
        if value.is_null() {
            return;
        }
        self.deltas
            .entry(delta)
            .or_default()
            .insert(column.into(), value);
    }

    /// JSON array of objects, one per delta.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Array(
            self.values()
                .map(|values| {
                    values
                        .iter()
                        .map(|(column, value)| (column.clone(), value.to_json()))
                        .collect::<serde_json::Map<_, _>>()
                        .into()
                })
                .collect(),
        )
    }

    fn merge(&mut self, cell: &Cell) {
        for (column, value) in &cell.values {
            self.insert(cell.delta, column.clone(), value.clone());
        }
    }
}

impl FromIterator<(Delta, DeltaValues)> for ReconstructedField {
    fn from_iter<T: IntoIterator<Item = (Delta, DeltaValues)>>(iter: T) -> Self {
        let mut field = ReconstructedField::new();
        for (delta, values) in iter {
            for (column, value) in values {
                field.insert(delta, column, value);
            }
        }
        field
    }
}

/// One decoded storage row.
#[derive(Debug)]
struct Cell {
    entity_id: u64,
    revision_id: Option<u64>,
    language: String,
    delta: Delta,
    values: Vec<(String, Value)>,
}

fn col(column: &str) -> ColumnRef {
    ColumnRef::new(ALIAS, column)
}

fn storage_query(field: &FieldDef, kind: StorageKind, scope: Vec<Filter>) -> SelectQuery {
    let mut query = SelectQuery::from(kind.table_name(field.name()), ALIAS).columns(
        ALIAS,
        &[
            field_columns::ENTITY_ID,
            field_columns::REVISION_ID,
            field_columns::LANGUAGE,
            field_columns::DELTA,
        ],
    );
    for sub in field.columns() {
        query = query.column_as(ALIAS, &field.storage_column(sub), sub);
    }

    query = query.condition(Filter::eq(col(field_columns::ENTITY_TYPE), NODE_ENTITY_TYPE));
    for filter in scope {
        query = query.condition(filter);
    }
    query
        .condition(Filter::eq(col(field_columns::DELETED), 0i64))
        .order_by(col(field_columns::ENTITY_ID), SortOrder::Ascending)
        .order_by(col(field_columns::DELTA), SortOrder::Ascending)
}

fn decode_cells(table: &str, field: &FieldDef, result: &QueryResult) -> Result<Vec<Cell>> {
    let entity_idx = result.require_column(field_columns::ENTITY_ID)?;
    let revision_idx = result.require_column(field_columns::REVISION_ID)?;
    let language_idx = result.require_column(field_columns::LANGUAGE)?;
    let delta_idx = result.require_column(field_columns::DELTA)?;
    let sub_idx = field
        .columns()
        .iter()
        .map(|c| Ok((c, result.require_column(c)?)))
        .collect::<std::result::Result<Vec<_>, QueryError>>()?;

    let malformed = |column: &str, value: &Value| FieldError::MalformedCell {
        table: table.to_string(),
        column: column.to_string(),
        value: value.to_string(),
    };
    let width = result.columns.len();
    let cell = |row: &[Value], idx: usize, column: &str| {
        row.get(idx).cloned().ok_or_else(|| FieldError::MalformedCell {
            table: table.to_string(),
            column: column.to_string(),
            value: format!("missing from a row of {} of {width} columns", row.len()),
        })
    };

    result
        .rows
        .iter()
        .map(|row| {
            let row = row.as_slice();
            let entity = cell(row, entity_idx, field_columns::ENTITY_ID)?;
            let entity_id = entity
                .to_u64()
                .ok_or_else(|| malformed(field_columns::ENTITY_ID, &entity))?;

            let revision = cell(row, revision_idx, field_columns::REVISION_ID)?;
            let revision_id = if revision.is_null() {
                None
            } else {
                Some(
                    revision
                        .to_u64()
                        .ok_or_else(|| malformed(field_columns::REVISION_ID, &revision))?,
                )
            };

            let delta = cell(row, delta_idx, field_columns::DELTA)?;
            let delta = delta
                .to_u64()
                .and_then(|d| u32::try_from(d).ok())
                .map(Delta::new)
                .ok_or_else(|| malformed(field_columns::DELTA, &delta))?;

            let language = cell(row, language_idx, field_columns::LANGUAGE)?;
            let values = sub_idx
                .iter()
                .map(|(c, i)| Ok(((*c).clone(), cell(row, *i, c.as_str())?)))
                .collect::<Result<_>>()?;

            Ok(Cell {
                entity_id,
                revision_id,
                language: language.as_text().unwrap_or_default().to_string(),
                delta,
                values,
            })
        })
        .collect()
}

/// Runs a storage query, or returns `None` if the storage table is absent.
fn fetch_cells<C: SourceConnection + ?Sized>(
    conn: &mut C,
    field: &FieldDef,
    kind: StorageKind,
    scope: Vec<Filter>,
) -> Result<Option<Vec<Cell>>> {
    let table = kind.table_name(field.name());
    if !conn
        .table_exists(&table)
        .map_err(QueryError::connection)?
    {
        debug!(field = field.name(), %table, "field storage table missing");
        return Ok(None);
    }

    let query = storage_query(field, kind, scope);
    let result = execute(conn, &query)?;
    debug!(field = field.name(), %table, rows = result.len(), "read field storage");
    decode_cells(&table, field, &result).map(Some)
}

/// Rebuilds one field of one item.
///
/// A missing storage table, or a language with no stored cells, yields an
/// empty field. There is no fallback to another language.
pub fn reconstruct<C: SourceConnection + ?Sized>(
    conn: &mut C,
    item: &ItemRef,
    field: &FieldDef,
) -> Result<ReconstructedField> {
    let mut scope = vec![Filter::eq(
        col(field_columns::ENTITY_ID),
        item.entity_id.as_u64(),
    )];
    if item.language.is_specified() {
        scope.push(Filter::eq(
            col(field_columns::LANGUAGE),
            item.language.as_str(),
        ));
    }
    if let Some(revision) = item.revision_id {
        scope.push(Filter::eq(
            col(field_columns::REVISION_ID),
            revision.as_u64(),
        ));
    }

    let mut out = ReconstructedField::new();
    let Some(cells) = fetch_cells(conn, field, item.storage_kind(), scope)? else {
        return Ok(out);
    };
    for cell in cells.iter().filter(|c| item.accepts(c)) {
        out.merge(cell);
    }
    Ok(out)
}

/// Rebuilds one field for a page of items with one query per storage table.
///
/// The result is index-aligned with `items` and equal to calling
/// [`reconstruct`] for each item.
pub fn reconstruct_batch<C: SourceConnection + ?Sized>(
    conn: &mut C,
    field: &FieldDef,
    items: &[ItemRef],
) -> Result<Vec<ReconstructedField>> {
    let mut out = vec![ReconstructedField::new(); items.len()];

    for kind in [StorageKind::Current, StorageKind::Revision] {
        let group: Vec<usize> = (0..items.len())
            .filter(|&i| items[i].storage_kind() == kind)
            .collect();
        if group.is_empty() {
            continue;
        }

        let ids: BTreeSet<u64> = group.iter().map(|&i| items[i].entity_id.as_u64()).collect();
        let mut scope = vec![Filter::is_in(
            col(field_columns::ENTITY_ID),
            ids.into_iter().map(Value::from).collect(),
        )];
        if group.iter().all(|&i| items[i].language.is_specified()) {
            let languages: BTreeSet<&str> =
                group.iter().map(|&i| items[i].language.as_str()).collect();
            scope.push(Filter::is_in(
                col(field_columns::LANGUAGE),
                languages.into_iter().map(Value::from).collect(),
            ));
        }
        if kind == StorageKind::Revision {
            let revisions: BTreeSet<u64> = group
                .iter()
                .filter_map(|&i| items[i].revision_id.map(RevisionId::as_u64))
                .collect();
            scope.push(Filter::is_in(
                col(field_columns::REVISION_ID),
                revisions.into_iter().map(Value::from).collect(),
            ));
        }

        let Some(cells) = fetch_cells(conn, field, kind, scope)? else {
            continue;
        };

        let mut by_entity: HashMap<u64, Vec<usize>> = HashMap::new();
        for &i in &group {
            by_entity
                .entry(items[i].entity_id.as_u64())
                .or_default()
                .push(i);
        }
        for cell in &cells {
            for &i in by_entity.get(&cell.entity_id).into_iter().flatten() {
                if items[i].accepts(cell) {
                    out[i].merge(cell);
                }
            }
        }
    }

    Ok(out)
}

/// Fields of one item, in declaration order.
pub type ItemFields = Vec<(String, ReconstructedField)>;

/// Rebuilds every field the registry declares for an item's type.
#[derive(Debug)]
pub struct FieldReconstructor<'r, R: ?Sized> {
    registry: &'r R,
}

impl<'r, R: FieldRegistry + ?Sized> FieldReconstructor<'r, R> {
    pub fn new(registry: &'r R) -> Self {
        Self { registry }
    }

    /// One field of one item.
    pub fn reconstruct<C: SourceConnection + ?Sized>(
        &self,
        conn: &mut C,
        item: &ItemRef,
        field: &FieldDef,
    ) -> Result<ReconstructedField> {
        reconstruct(conn, item, field)
    }

    /// Fields for one item, one storage query per field.
    pub fn reconstruct_all<C: SourceConnection + ?Sized>(
        &self,
        conn: &mut C,
        item: &ItemRef,
    ) -> Result<ItemFields> {
        self.registry
            .fields_for(&item.node_type)
            .iter()
            .map(|field| Ok((field.name().to_string(), reconstruct(conn, item, field)?)))
            .collect()
    }

    /// Fields for a page of items, one storage query per field per content type.
    pub fn reconstruct_all_batch<C: SourceConnection + ?Sized>(
        &self,
        conn: &mut C,
        items: &[ItemRef],
    ) -> Result<Vec<ItemFields>> {
        let mut out: Vec<ItemFields> = vec![Vec::new(); items.len()];

        let mut by_type: BTreeMap<&NodeType, Vec<usize>> = BTreeMap::new();
        for (i, item) in items.iter().enumerate() {
            by_type.entry(&item.node_type).or_default().push(i);
        }

        for (node_type, indices) in by_type {
            let page: Vec<ItemRef> = indices.iter().map(|&i| items[i].clone()).collect();
            for field in self.registry.fields_for(node_type) {
                let values = reconstruct_batch(conn, field, &page)?;
                for (&i, value) in indices.iter().zip(values) {
                    out[i].push((field.name().to_string(), value));
                }
            }
        }

        Ok(out)
    }
}
