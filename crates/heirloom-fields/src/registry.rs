//! Field-schema registry: which fields each content type carries.

use std::collections::BTreeMap;

use heirloom_query::NodeTypeCatalog;
use heirloom_types::NodeType;
use serde::{Deserialize, Serialize};

use crate::error::{FieldError, Result};
use crate::storage::{KEY_COLUMNS, is_valid_name};

/// A field declared on a content type, with its known sub-columns.
///
/// Sub-column `value` of field `body` is stored as `body_value`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawFieldDef", into = "RawFieldDef")]
pub struct FieldDef {
    name: String,
    columns: Vec<String>,
}

#[derive(Serialize, Deserialize)]
struct RawFieldDef {
    name: String,
    columns: Vec<String>,
}

impl FieldDef {
    /// Declares a field, validating its name and sub-columns.
    pub fn new<I, S>(name: impl Into<String>, columns: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let name = name.into();
        if !is_valid_name(&name) {
            return Err(FieldError::InvalidFieldName(name));
        }

        let columns: Vec<String> = columns.into_iter().map(Into::into).collect();
        for (i, column) in columns.iter().enumerate() {
            if !is_valid_name(column)
                || KEY_COLUMNS.contains(&column.as_str())
                || columns[..i].contains(column)
            {
                return Err(FieldError::InvalidColumn {
                    field: name,
                    column: column.clone(),
                });
            }
        }

        Ok(Self { name, columns })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Physical column holding sub-column `column`.
    pub fn storage_column(&self, column: &str) -> String {
        format!("{}_{column}", self.name)
    }
}

impl TryFrom<RawFieldDef> for FieldDef {
    type Error = FieldError;

    fn try_from(raw: RawFieldDef) -> Result<Self> {
        FieldDef::new(raw.name, raw.columns)
    }
}

impl From<FieldDef> for RawFieldDef {
    fn from(def: FieldDef) -> Self {
        RawFieldDef {
            name: def.name,
            columns: def.columns,
        }
    }
}

/// Lists the fields declared for a content type, in declaration order.
pub trait FieldRegistry {
    /// Fields attached to `node_type`. Unknown types have none.
    fn fields_for(&self, node_type: &NodeType) -> &[FieldDef];
}

impl<R: FieldRegistry + ?Sized> FieldRegistry for &R {
    fn fields_for(&self, node_type: &NodeType) -> &[FieldDef] {
        (**self).fields_for(node_type)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct TypeEntry {
    translatable: bool,
    fields: Vec<FieldDef>,
}

/// A registry fixed at construction time, typically built from configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StaticFieldRegistry {
    types: BTreeMap<NodeType, TypeEntry>,
}

impl StaticFieldRegistry {
    pub fn builder() -> StaticFieldRegistryBuilder {
        StaticFieldRegistryBuilder::default()
    }

    /// Known content types in name order.
    pub fn node_types(&self) -> impl Iterator<Item = &NodeType> {
        self.types.keys()
    }
}

impl FieldRegistry for StaticFieldRegistry {
    fn fields_for(&self, node_type: &NodeType) -> &[FieldDef] {
        self.types
            .get(node_type)
            .map(|entry| entry.fields.as_slice())
            .unwrap_or_default()
    }
}

impl NodeTypeCatalog for StaticFieldRegistry {
    fn has_node_type(&self, node_type: &NodeType) -> bool {
        self.types.contains_key(node_type)
    }

    fn is_translatable(&self, node_type: &NodeType) -> bool {
        self.types.get(node_type).is_some_and(|e| e.translatable)
    }
}

/// Builder for [`StaticFieldRegistry`].
#[derive(Debug, Default)]
pub struct StaticFieldRegistryBuilder {
    types: BTreeMap<NodeType, TypeEntry>,
}

impl StaticFieldRegistryBuilder {
    /// Declares a content type. Declaring it again replaces the earlier entry.
    pub fn node_type(mut self, node_type: impl Into<NodeType>, translatable: bool) -> Self {
        self.types.insert(
            node_type.into(),
            TypeEntry {
                translatable,
                fields: Vec::new(),
            },
        );
        self
    }

    /// Appends `field` to `node_type`, declaring the type if needed.
    pub fn field(mut self, node_type: impl Into<NodeType>, field: FieldDef) -> Self {
        self.types
            .entry(node_type.into())
            .or_default()
            .fields
            .push(field);
        self
    }

    /// Finishes the registry, rejecting a field declared twice on one type.
    pub fn build(self) -> Result<StaticFieldRegistry> {
        for (node_type, entry) in &self.types {
            for (i, field) in entry.fields.iter().enumerate() {
                if entry.fields[..i].iter().any(|f| f.name == field.name) {
                    return Err(FieldError::DuplicateField {
                        node_type: node_type.to_string(),
                        field: field.name.clone(),
                    });
                }
            }
        }
        Ok(StaticFieldRegistry { types: self.types })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> StaticFieldRegistry {
        StaticFieldRegistry::builder()
            .node_type("page", false)
            .field("page", FieldDef::new("summary", ["value"]).unwrap())
            .field("page", FieldDef::new("tags", ["value"]).unwrap())
            .node_type("article", true)
            .field("article", FieldDef::new("body", ["value", "format"]).unwrap())
            .build()
            .unwrap()
    }

    #[test]
    fn fields_keep_declaration_order() {
        let reg = registry();
        let names: Vec<_> = reg
            .fields_for(&"page".into())
            .iter()
            .map(FieldDef::name)
            .collect();
        assert_eq!(names, vec!["summary", "tags"]);
    }

    #[test]
    fn unknown_type_has_no_fields() {
        let reg = registry();
        assert!(reg.fields_for(&"blog".into()).is_empty());
        assert!(!reg.has_node_type(&"blog".into()));
        assert!(!reg.is_translatable(&"blog".into()));
    }

    #[test]
    fn catalog_reports_translatability() {
        let reg = registry();
        assert!(reg.is_translatable(&"article".into()));
        assert!(!reg.is_translatable(&"page".into()));
    }

    #[test]
    fn sub_columns_are_validated() {
        assert!(matches!(
            FieldDef::new("body", ["delta"]),
            Err(FieldError::InvalidColumn { .. })
        ));
        assert!(FieldDef::new("body", ["value", "value"]).is_err());
        assert!(matches!(
            FieldDef::new("body`", ["value"]),
            Err(FieldError::InvalidFieldName(_))
        ));
        assert_eq!(
            FieldDef::new("body", ["value"]).unwrap().storage_column("value"),
            "body_value"
        );
    }

    #[test]
    fn duplicate_field_is_rejected() {
        let result = StaticFieldRegistry::builder()
            .field("page", FieldDef::new("body", ["value"]).unwrap())
            .field("page", FieldDef::new("body", ["format"]).unwrap())
            .build();
        assert!(matches!(result, Err(FieldError::DuplicateField { .. })));
    }

    #[test]
    fn field_def_deserialization_validates() {
        let ok: FieldDef =
            serde_json::from_str(r#"{"name":"tags","columns":["tid"]}"#).unwrap();
        assert_eq!(ok.columns(), ["tid".to_string()]);
        assert!(serde_json::from_str::<FieldDef>(r#"{"name":"Tags","columns":[]}"#).is_err());
    }
}
