//! Query builder: turns [`SourceOptions`] into the extraction [`QueryPlan`].
//!
//! One builder serves every translation model; the strategy is matched once
//! and selects the base table, the projection list, and the translation-state
//! filter.
//!
//! | strategy        | base table               | original rows                   | translation rows                 |
//! |-----------------|--------------------------|---------------------------------|----------------------------------|
//! | `None`          | `node n`                 | all                             | all                              |
//! | `SetLinked`     | `node n`                 | `n.tnid = 0 OR n.tnid = n.nid`  | `n.tnid <> 0 AND n.tnid <> n.nid`|
//! | `EntityLinked`  | `entity_translation et`  | `et.source = ''`                | `et.source <> ''`                |

use heirloom_types::schema::{ENTITY_TRANSLATION_TABLE, NODE_ENTITY_TYPE, NODE_TABLE};
use heirloom_types::{NodeType, SourceOptions, TranslationStrategy};
use tracing::debug;

use crate::error::{QueryError, Result};
use crate::plan::{ColumnRef, Filter, QueryPlan, SelectQuery, SortOrder};

const NODE: &str = "n";
const TRANSLATION: &str = "et";

/// Content-item columns projected under their own names by the node-based strategies.
const NODE_COLUMNS: &[&str] = &[
    "nid", "vid", "type", "language", "title", "uid", "status", "created", "changed", "comment",
    "promote", "sticky", "tnid", "translate",
];

/// Columns the entity-linked strategy reads from the translation record,
/// overriding the content item's values of the same name.
const TRANSLATION_OVERRIDES: &[&str] = &["language", "uid", "status", "translate", "created", "changed"];

/// Display columns the entity-linked strategy still reads from the content item.
const ENTITY_LINKED_NODE_COLUMNS: &[&str] = &["nid", "type", "title", "comment", "promote", "sticky"];

/// Knowledge about content types that the builder needs up front.
pub trait NodeTypeCatalog {
    /// Returns true if `node_type` exists in the legacy schema.
    fn has_node_type(&self, node_type: &NodeType) -> bool;

    /// Capability check: returns true if items of `node_type` carry translations.
    fn is_translatable(&self, node_type: &NodeType) -> bool;
}

/// Reports whether the configured source can yield translations.
///
/// `None` never can. The translation-aware strategies can unless a type filter
/// names a type the catalog marks as untranslatable.
pub fn translation_capability(options: &SourceOptions, catalog: &dyn NodeTypeCatalog) -> bool {
    if !options.strategy.is_translation_aware() {
        return false;
    }
    options
        .node_type
        .as_ref()
        .is_none_or(|t| catalog.is_translatable(t))
}

/// Builds the extraction query for one migration run.
///
/// Configuration problems are reported here, before any row is read.
pub fn build_query(options: &SourceOptions, catalog: &dyn NodeTypeCatalog) -> Result<QueryPlan> {
    if let Some(node_type) = &options.node_type {
        if !catalog.has_node_type(node_type) {
            return Err(QueryError::UnknownNodeType(node_type.clone()));
        }
    }

    let plan = match options.strategy {
        TranslationStrategy::None => QueryPlan::new(
            options.strategy,
            with_type_filter(node_query(), options),
            vec!["nid"],
        ),
        TranslationStrategy::SetLinked => {
            let query = node_query().condition(set_linked_filter(options.translations));
            QueryPlan::new(
                options.strategy,
                with_type_filter(query, options),
                vec!["nid"],
            )
        }
        TranslationStrategy::EntityLinked => {
            if options.translations && !translation_capability(options, catalog) {
                if let Some(node_type) = &options.node_type {
                    return Err(QueryError::UntranslatableType {
                        node_type: node_type.clone(),
                        strategy: options.strategy,
                    });
                }
            }
            QueryPlan::new(
                options.strategy,
                with_type_filter(entity_linked_query(options.translations), options),
                vec!["nid", "language"],
            )
        }
    };

    debug!(
        strategy = %plan.strategy(),
        translations = options.translations,
        node_type = ?options.node_type,
        columns = plan.column_names().len(),
        "built extraction query"
    );

    Ok(plan)
}

fn col(table: &str, column: &str) -> ColumnRef {
    ColumnRef::new(table, column)
}

/// ANDs the optional content type restriction onto `query`.
fn with_type_filter(query: SelectQuery, options: &SourceOptions) -> SelectQuery {
    match &options.node_type {
        Some(t) => query.condition(Filter::eq(col(NODE, "type"), t.as_str())),
        None => query,
    }
}

/// `SELECT` over the content item table, shared by `None` and `SetLinked`.
fn node_query() -> SelectQuery {
    SelectQuery::from(NODE_TABLE, NODE)
        .columns(NODE, NODE_COLUMNS)
        .column_as(NODE, "uid", "node_uid")
        .order_by(col(NODE, "nid"), SortOrder::Ascending)
}

fn set_linked_filter(translations: bool) -> Filter {
    let tnid = || col(NODE, "tnid");
    let nid = || col(NODE, "nid");
    if translations {
        // Non-default translations only.
        Filter::and(vec![
            Filter::not_eq(tnid(), 0i64),
            Filter::not_eq(tnid(), nid()),
        ])
    } else {
        // Untranslated items and default translations.
        Filter::or(vec![Filter::eq(tnid(), 0i64), Filter::eq(tnid(), nid())])
    }
}

fn entity_linked_query(translations: bool) -> SelectQuery {
    let source = col(TRANSLATION, "source");
    let state = if translations {
        Filter::not_eq(source, "")
    } else {
        Filter::eq(source, "")
    };

    SelectQuery::from(ENTITY_TRANSLATION_TABLE, TRANSLATION)
        .inner_join(
            NODE_TABLE,
            NODE,
            Filter::eq(col(NODE, "nid"), col(TRANSLATION, "entity_id")),
        )
        .columns(TRANSLATION, TRANSLATION_OVERRIDES)
        .column_as(TRANSLATION, "revision_id", "vid")
        .column_as(TRANSLATION, "uid", "revision_uid")
        .column_as(TRANSLATION, "changed", "timestamp")
        .column_as(TRANSLATION, "entity_id", "tnid")
        .columns(NODE, ENTITY_LINKED_NODE_COLUMNS)
        .column_as(NODE, "translate", "node_translate")
        .column_as(NODE, "uid", "node_uid")
        .condition(Filter::eq(col(TRANSLATION, "entity_type"), NODE_ENTITY_TYPE))
        .condition(state)
        .order_by(col(NODE, "nid"), SortOrder::Ascending)
        .order_by(col(TRANSLATION, "language"), SortOrder::Ascending)
}
