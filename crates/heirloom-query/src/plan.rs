//! Query plan intermediate representation.
//!
//! A [`SelectQuery`] is built up front with an explicit projection list; it is
//! never edited column by column after the fact. Connections either render it
//! to SQL ([`crate::render`]) or evaluate it directly ([`crate::MemorySource`]).

use heirloom_types::TranslationStrategy;

use crate::error::{QueryError, Result};
use crate::render::{RenderOptions, RenderedSql};
use crate::value::Value;

/// Returns true if `name` can be spliced into SQL as a bare identifier.
pub fn is_plain_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Fails with [`QueryError::InvalidIdentifier`] unless `name` is a plain identifier.
pub fn check_identifier(name: &str) -> Result<()> {
    if is_plain_identifier(name) {
        Ok(())
    } else {
        Err(QueryError::InvalidIdentifier(name.to_string()))
    }
}

/// A table in the FROM or JOIN clause together with its alias.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRef {
    pub name: String,
    pub alias: String,
}

impl TableRef {
    pub fn new(name: impl Into<String>, alias: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            alias: alias.into(),
        }
    }
}

/// A column qualified by its table alias.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColumnRef {
    pub table: String,
    pub column: String,
}

impl ColumnRef {
    pub fn new(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            column: column.into(),
        }
    }
}

impl std::fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.table, self.column)
    }
}

/// One output column: a source column and the name it is returned under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Projection {
    pub source: ColumnRef,
    pub alias: String,
}

/// Join kinds. Extraction only ever needs inner joins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
}

/// A joined table and its ON condition.
#[derive(Debug, Clone)]
pub struct Join {
    pub kind: JoinKind,
    pub table: TableRef,
    pub on: Filter,
}

/// Right-hand side of a comparison.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// Column-to-column comparison.
    Column(ColumnRef),
    /// Bound parameter.
    Value(Value),
}

impl From<ColumnRef> for Operand {
    fn from(column: ColumnRef) -> Self {
        Operand::Column(column)
    }
}

macro_rules! operand_from_value {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for Operand {
                fn from(value: $ty) -> Self {
                    Operand::Value(value.into())
                }
            }
        )*
    };
}

operand_from_value!(Value, i64, u64, bool, String, &str);

/// Filter comparison operator.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterOp {
    /// Equal.
    Eq(Operand),
    /// Not equal.
    NotEq(Operand),
    /// In list.
    In(Vec<Value>),
    /// IS NULL check.
    IsNull,
    /// IS NOT NULL check.
    IsNotNull,
}

/// A single filter condition.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterCondition {
    pub column: ColumnRef,
    pub op: FilterOp,
}

/// Source of column values for filter evaluation.
pub trait ColumnLookup {
    fn lookup(&self, column: &ColumnRef) -> Option<&Value>;
}

impl FilterCondition {
    /// Evaluates this condition with SQL semantics: comparisons against NULL
    /// are never true.
    pub fn matches<L: ColumnLookup + ?Sized>(&self, row: &L) -> bool {
        let Some(cell) = row.lookup(&self.column) else {
            return false;
        };

        let resolve = |operand: &Operand| -> Option<Value> {
            match operand {
                Operand::Column(c) => row.lookup(c).cloned(),
                Operand::Value(v) => Some(v.clone()),
            }
        };

        match &self.op {
            FilterOp::Eq(rhs) => resolve(rhs).is_some_and(|v| cell.sql_eq(&v)),
            FilterOp::NotEq(rhs) => resolve(rhs).is_some_and(|v| {
                !cell.is_null() && !v.is_null() && !cell.sql_eq(&v)
            }),
            FilterOp::In(values) => values.iter().any(|v| cell.sql_eq(v)),
            FilterOp::IsNull => cell.is_null(),
            FilterOp::IsNotNull => !cell.is_null(),
        }
    }
}

/// Filter to apply to joined rows.
///
/// Supports both AND and OR logical operations in a tree structure.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Single condition.
    Condition(FilterCondition),
    /// All conditions must match (AND).
    And(Vec<Filter>),
    /// At least one condition must match (OR).
    Or(Vec<Filter>),
}

impl Filter {
    pub fn eq(column: ColumnRef, rhs: impl Into<Operand>) -> Self {
        Filter::Condition(FilterCondition {
            column,
            op: FilterOp::Eq(rhs.into()),
        })
    }

    pub fn not_eq(column: ColumnRef, rhs: impl Into<Operand>) -> Self {
        Filter::Condition(FilterCondition {
            column,
            op: FilterOp::NotEq(rhs.into()),
        })
    }

    pub fn is_in(column: ColumnRef, values: Vec<Value>) -> Self {
        Filter::Condition(FilterCondition {
            column,
            op: FilterOp::In(values),
        })
    }

    /// Creates a filter with AND of multiple conditions.
    pub fn and(mut filters: Vec<Filter>) -> Self {
        debug_assert!(
            !filters.is_empty(),
            "AND filter must have at least one condition"
        );
        if filters.len() == 1 {
            if let Some(only) = filters.pop() {
                return only;
            }
        }
        Filter::And(filters)
    }

    /// Creates a filter with OR of multiple conditions.
    pub fn or(mut filters: Vec<Filter>) -> Self {
        debug_assert!(
            !filters.is_empty(),
            "OR filter must have at least one condition"
        );
        if filters.len() == 1 {
            if let Some(only) = filters.pop() {
                return only;
            }
        }
        Filter::Or(filters)
    }

    /// Evaluates the filter against a row.
    pub fn matches<L: ColumnLookup + ?Sized>(&self, row: &L) -> bool {
        match self {
            Filter::Condition(c) => c.matches(row),
            Filter::And(filters) => filters.iter().all(|f| f.matches(row)),
            Filter::Or(filters) => filters.iter().any(|f| f.matches(row)),
        }
    }

    /// Appends every column this filter reads.
    pub fn collect_columns<'a>(&'a self, out: &mut Vec<&'a ColumnRef>) {
        match self {
            Filter::Condition(c) => {
                out.push(&c.column);
                if let FilterOp::Eq(Operand::Column(rhs)) | FilterOp::NotEq(Operand::Column(rhs)) =
                    &c.op
                {
                    out.push(rhs);
                }
            }
            Filter::And(filters) | Filter::Or(filters) => {
                for f in filters {
                    f.collect_columns(out);
                }
            }
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

/// One ORDER BY key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub column: ColumnRef,
    pub order: SortOrder,
}

/// A SELECT over one base table and any number of inner joins.
#[derive(Debug, Clone)]
pub struct SelectQuery {
    pub from: TableRef,
    pub joins: Vec<Join>,
    pub projection: Vec<Projection>,
    pub filter: Option<Filter>,
    pub order_by: Vec<OrderBy>,
}

impl SelectQuery {
    /// Starts a query on `table` under `alias`.
    pub fn from(table: impl Into<String>, alias: impl Into<String>) -> Self {
        Self {
            from: TableRef::new(table, alias),
            joins: Vec::new(),
            projection: Vec::new(),
            filter: None,
            order_by: Vec::new(),
        }
    }

    pub fn inner_join(
        mut self,
        table: impl Into<String>,
        alias: impl Into<String>,
        on: Filter,
    ) -> Self {
        self.joins.push(Join {
            kind: JoinKind::Inner,
            table: TableRef::new(table, alias),
            on,
        });
        self
    }

    /// Projects `table.column` under its own name.
    pub fn column(self, table: &str, column: &str) -> Self {
        self.column_as(table, column, column)
    }

    /// Projects several columns of one table under their own names.
    pub fn columns(mut self, table: &str, columns: &[&str]) -> Self {
        for column in columns {
            self = self.column(table, column);
        }
        self
    }

    /// Projects `table.column` as `alias`.
    pub fn column_as(mut self, table: &str, column: &str, alias: &str) -> Self {
        debug_assert!(
            !self.projection.iter().any(|p| p.alias == alias),
            "duplicate output column {alias}"
        );
        self.projection.push(Projection {
            source: ColumnRef::new(table, column),
            alias: alias.to_string(),
        });
        self
    }

    /// ANDs `filter` into the WHERE clause.
    pub fn condition(mut self, filter: Filter) -> Self {
        self.filter = Some(match self.filter.take() {
            None => filter,
            Some(Filter::And(mut existing)) => {
                existing.push(filter);
                Filter::And(existing)
            }
            Some(existing) => Filter::And(vec![existing, filter]),
        });
        self
    }

    pub fn order_by(mut self, column: ColumnRef, order: SortOrder) -> Self {
        self.order_by.push(OrderBy { column, order });
        self
    }

    /// Output column names in projection order.
    pub fn column_names(&self) -> Vec<&str> {
        self.projection.iter().map(|p| p.alias.as_str()).collect()
    }

    /// Every table the query reads, base table first.
    pub fn tables(&self) -> impl Iterator<Item = &TableRef> {
        std::iter::once(&self.from).chain(self.joins.iter().map(|j| &j.table))
    }

    /// Renders this query to parameterized SQL.
    pub fn to_sql(&self, options: &RenderOptions) -> Result<RenderedSql> {
        crate::render::render_select(self, options)
    }

    /// Renders a `COUNT(*)` over the same rows.
    pub fn to_count_sql(&self, options: &RenderOptions) -> Result<RenderedSql> {
        crate::render::render_count(self, options)
    }
}

/// The extraction query for one migration run plus the metadata the host
/// pipeline needs to consume its rows.
#[derive(Debug, Clone)]
pub struct QueryPlan {
    strategy: TranslationStrategy,
    query: SelectQuery,
    id_keys: Vec<&'static str>,
}

impl QueryPlan {
    pub(crate) fn new(
        strategy: TranslationStrategy,
        query: SelectQuery,
        id_keys: Vec<&'static str>,
    ) -> Self {
        debug_assert!(
            id_keys
                .iter()
                .all(|k| query.projection.iter().any(|p| p.alias == *k)),
            "id keys must be projected"
        );
        Self {
            strategy,
            query,
            id_keys,
        }
    }

    pub fn strategy(&self) -> TranslationStrategy {
        self.strategy
    }

    pub fn query(&self) -> &SelectQuery {
        &self.query
    }

    /// Output column names, stable per strategy.
    pub fn column_names(&self) -> Vec<&str> {
        self.query.column_names()
    }

    /// Columns that together identify one source row.
    pub fn id_keys(&self) -> &[&'static str] {
        &self.id_keys
    }

    pub fn to_sql(&self, options: &RenderOptions) -> Result<RenderedSql> {
        self.query.to_sql(options)
    }

    pub fn to_count_sql(&self, options: &RenderOptions) -> Result<RenderedSql> {
        self.query.to_count_sql(options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct MapRow(HashMap<ColumnRef, Value>);

    impl ColumnLookup for MapRow {
        fn lookup(&self, column: &ColumnRef) -> Option<&Value> {
            self.0.get(column)
        }
    }

    fn row(cells: &[(&str, &str, Value)]) -> MapRow {
        MapRow(
            cells
                .iter()
                .map(|(t, c, v)| (ColumnRef::new(*t, *c), v.clone()))
                .collect(),
        )
    }

    #[test]
    fn identifiers_are_checked() {
        assert!(is_plain_identifier("field_data_body"));
        assert!(is_plain_identifier("_x1"));
        assert!(!is_plain_identifier("1abc"));
        assert!(!is_plain_identifier("body; DROP"));
        assert!(!is_plain_identifier(""));
        assert!(check_identifier("a-b").is_err());
    }

    #[test]
    fn column_to_column_comparison() {
        let r = row(&[("n", "tnid", Value::BigInt(5)), ("n", "nid", Value::BigInt(5))]);
        let same = Filter::eq(ColumnRef::new("n", "tnid"), ColumnRef::new("n", "nid"));
        let differs = Filter::not_eq(ColumnRef::new("n", "tnid"), ColumnRef::new("n", "nid"));
        assert!(same.matches(&r));
        assert!(!differs.matches(&r));
    }

    #[test]
    fn null_never_compares() {
        let r = row(&[("t", "language", Value::Null)]);
        let col = ColumnRef::new("t", "language");
        assert!(!Filter::eq(col.clone(), "en").matches(&r));
        assert!(!Filter::not_eq(col.clone(), "en").matches(&r));
        assert!(Filter::Condition(FilterCondition {
            column: col,
            op: FilterOp::IsNull
        })
        .matches(&r));
    }

    #[test]
    fn single_element_combinators_collapse() {
        let f = Filter::eq(ColumnRef::new("n", "nid"), 1i64);
        assert_eq!(Filter::and(vec![f.clone()]), f);
        assert_eq!(Filter::or(vec![f.clone()]), f);
    }

    #[test]
    fn conditions_accumulate_as_and() {
        let q = SelectQuery::from("node", "n")
            .column("n", "nid")
            .condition(Filter::eq(ColumnRef::new("n", "type"), "page"))
            .condition(Filter::eq(ColumnRef::new("n", "status"), 1i64))
            .condition(Filter::eq(ColumnRef::new("n", "promote"), 0i64));
        match q.filter {
            Some(Filter::And(parts)) => assert_eq!(parts.len(), 3),
            other => panic!("expected AND, got {other:?}"),
        }
    }

    #[test]
    fn collects_both_sides_of_column_comparisons() {
        let f = Filter::or(vec![
            Filter::eq(ColumnRef::new("n", "tnid"), 0i64),
            Filter::eq(ColumnRef::new("n", "tnid"), ColumnRef::new("n", "nid")),
        ]);
        let mut cols = Vec::new();
        f.collect_columns(&mut cols);
        assert_eq!(cols.len(), 3);
    }
}
