//! The row abstraction shared with the host pipeline.

use std::collections::BTreeMap;

use heirloom_query::{Record, Value};

use crate::reconstruct::ReconstructedField;

/// A property value on a source row.
#[derive(Debug, Clone, PartialEq)]
pub enum RowValue {
    /// A column read by the extraction query.
    Scalar(Value),
    /// A field attached by reconstruction.
    Field(ReconstructedField),
}

impl RowValue {
    pub fn as_scalar(&self) -> Option<&Value> {
        match self {
            RowValue::Scalar(v) => Some(v),
            RowValue::Field(_) => None,
        }
    }

    pub fn as_field(&self) -> Option<&ReconstructedField> {
        match self {
            RowValue::Field(f) => Some(f),
            RowValue::Scalar(_) => None,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            RowValue::Scalar(v) => v.to_json(),
            RowValue::Field(f) => f.to_json(),
        }
    }
}

impl From<Value> for RowValue {
    fn from(value: Value) -> Self {
        RowValue::Scalar(value)
    }
}

impl From<ReconstructedField> for RowValue {
    fn from(field: ReconstructedField) -> Self {
        RowValue::Field(field)
    }
}

/// Property access on a row owned by the host pipeline.
pub trait MigrateRow {
    fn source_property(&self, name: &str) -> Option<&RowValue>;

    /// Sets `name`, replacing any previous value.
    fn set_source_property(&mut self, name: &str, value: RowValue);

    /// Scalar value of `name`, if present and scalar.
    fn scalar(&self, name: &str) -> Option<&Value> {
        self.source_property(name).and_then(RowValue::as_scalar)
    }
}

/// A plain property map implementing [`MigrateRow`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceRow {
    properties: BTreeMap<String, RowValue>,
}

impl SourceRow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a row from one query result record.
    pub fn from_record(record: Record<'_>) -> Self {
        Self {
            properties: record
                .iter()
                .map(|(name, value)| (name.to_string(), RowValue::Scalar(value.clone())))
                .collect(),
        }
    }

    pub fn with(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.set_source_property(name, RowValue::Scalar(value.into()));
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &RowValue)> {
        self.properties.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn field(&self, name: &str) -> Option<&ReconstructedField> {
        self.properties.get(name).and_then(RowValue::as_field)
    }

    /// JSON object of every property.
    pub fn to_json(&self) -> serde_json::Value {
        self.properties
            .iter()
            .map(|(k, v)| (k.clone(), v.to_json()))
            .collect::<serde_json::Map<_, _>>()
            .into()
    }
}

impl MigrateRow for SourceRow {
    fn source_property(&self, name: &str) -> Option<&RowValue> {
        self.properties.get(name)
    }

    fn set_source_property(&mut self, name: &str, value: RowValue) {
        self.properties.insert(name.to_string(), value);
    }
}
