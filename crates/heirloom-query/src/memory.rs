//! In-memory legacy schema.
//!
//! Evaluates [`SelectQuery`] directly: nested-loop inner joins, the filter
//! tree, ordering, then projection. Used for fixtures and tests; production
//! hosts implement [`SourceConnection`] over their own driver.

use std::cmp::Ordering;
use std::collections::HashMap;

use thiserror::Error;

use crate::connection::{QueryResult, Row, SourceConnection};
use crate::plan::{ColumnLookup, ColumnRef, SelectQuery, SortOrder};
use crate::value::Value;

/// Errors raised by [`MemorySource`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MemoryError {
    #[error("table not found: {0}")]
    TableNotFound(String),

    #[error("column {column} not found in {table}")]
    ColumnNotFound { table: String, column: String },

    #[error("unknown table alias: {0}")]
    UnknownAlias(String),
}

/// One stored table: column names and rows in insertion order.
#[derive(Debug, Clone, Default)]
pub struct MemoryTable {
    columns: Vec<String>,
    rows: Vec<Row>,
}

impl MemoryTable {
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn column_index(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }
}

/// A legacy database held in memory.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    tables: HashMap<String, MemoryTable>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates (or replaces) a table with the given columns.
    pub fn create_table(&mut self, name: &str, columns: &[&str]) -> &mut Self {
        self.tables.insert(
            name.to_string(),
            MemoryTable {
                columns: columns.iter().map(ToString::to_string).collect(),
                rows: Vec::new(),
            },
        );
        self
    }

    /// Inserts a row given as column/value pairs. Columns left out are NULL.
    pub fn insert<I, K, V>(&mut self, table: &str, cells: I) -> Result<&mut Self, MemoryError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        let t = self
            .tables
            .get_mut(table)
            .ok_or_else(|| MemoryError::TableNotFound(table.to_string()))?;
        let mut row = vec![Value::Null; t.columns.len()];
        for (column, value) in cells {
            let column = column.as_ref();
            let idx = t
                .column_index(column)
                .ok_or_else(|| MemoryError::ColumnNotFound {
                    table: table.to_string(),
                    column: column.to_string(),
                })?;
            row[idx] = value.into();
        }
        t.rows.push(row);
        Ok(self)
    }

    pub fn table(&self, name: &str) -> Option<&MemoryTable> {
        self.tables.get(name)
    }

    fn resolve_tables<'q>(
        &self,
        query: &'q SelectQuery,
    ) -> Result<Vec<(&'q str, &MemoryTable)>, MemoryError> {
        query
            .tables()
            .map(|t| {
                self.tables
                    .get(&t.name)
                    .map(|table| (t.alias.as_str(), table))
                    .ok_or_else(|| MemoryError::TableNotFound(t.name.clone()))
            })
            .collect()
    }

    fn check_columns<'q>(
        bound: &[(&'q str, &MemoryTable)],
        query: &'q SelectQuery,
    ) -> Result<(), MemoryError> {
        let mut referenced: Vec<&ColumnRef> = query.projection.iter().map(|p| &p.source).collect();
        referenced.extend(query.order_by.iter().map(|o| &o.column));
        if let Some(filter) = &query.filter {
            filter.collect_columns(&mut referenced);
        }
        for join in &query.joins {
            join.on.collect_columns(&mut referenced);
        }

        for column in referenced {
            let (_, table) = bound
                .iter()
                .find(|(alias, _)| *alias == column.table)
                .ok_or_else(|| MemoryError::UnknownAlias(column.table.clone()))?;
            if table.column_index(&column.column).is_none() {
                return Err(MemoryError::ColumnNotFound {
                    table: column.table.clone(),
                    column: column.column.clone(),
                });
            }
        }
        Ok(())
    }
}

/// One candidate output row: a row index per bound table.
struct Joined<'a, 'q> {
    tables: &'a [(&'q str, &'a MemoryTable)],
    rows: Vec<usize>,
}

impl ColumnLookup for Joined<'_, '_> {
    fn lookup(&self, column: &ColumnRef) -> Option<&Value> {
        self.tables
            .iter()
            .zip(&self.rows)
            .find(|((alias, _), _)| *alias == column.table)
            .and_then(|((_, table), &row)| {
                let idx = table.column_index(&column.column)?;
                table.rows.get(row)?.get(idx)
            })
    }
}

impl SourceConnection for MemorySource {
    type Error = MemoryError;

    fn execute(&mut self, query: &SelectQuery) -> Result<QueryResult, MemoryError> {
        let bound = self.resolve_tables(query)?;
        Self::check_columns(&bound, query)?;

        let Some((_, base)) = bound.first() else {
            return Ok(QueryResult::default());
        };

        // Nested loop join: extend each candidate with every matching row of
        // the next table.
        let mut candidates: Vec<Vec<usize>> = (0..base.rows.len()).map(|i| vec![i]).collect();
        for (depth, join) in query.joins.iter().enumerate() {
            let (_, right) = bound[depth + 1];
            let mut next = Vec::new();
            for candidate in candidates {
                for r in 0..right.rows.len() {
                    let mut rows = candidate.clone();
                    rows.push(r);
                    let joined = Joined {
                        tables: &bound[..=depth + 1],
                        rows,
                    };
                    if join.on.matches(&joined) {
                        next.push(joined.rows);
                    }
                }
            }
            candidates = next;
        }

        let mut matched: Vec<Joined<'_, '_>> = candidates
            .into_iter()
            .map(|rows| Joined {
                tables: &bound,
                rows,
            })
            .filter(|j| query.filter.as_ref().is_none_or(|f| f.matches(j)))
            .collect();

        if !query.order_by.is_empty() {
            matched.sort_by(|a, b| {
                for key in &query.order_by {
                    let cmp = match (a.lookup(&key.column), b.lookup(&key.column)) {
                        (Some(av), Some(bv)) => av.compare(bv).unwrap_or(Ordering::Equal),
                        (None, None) => Ordering::Equal,
                        (None, Some(_)) => Ordering::Less,
                        (Some(_), None) => Ordering::Greater,
                    };
                    if cmp != Ordering::Equal {
                        return match key.order {
                            SortOrder::Ascending => cmp,
                            SortOrder::Descending => cmp.reverse(),
                        };
                    }
                }
                Ordering::Equal
            });
        }

        let (columns, rows) = if query.projection.is_empty() {
            let columns = base.columns.clone();
            let rows = matched
                .iter()
                .map(|j| base.rows[j.rows[0]].clone())
                .collect();
            (columns, rows)
        } else {
            let columns = query.projection.iter().map(|p| p.alias.clone()).collect();
            let rows = matched
                .iter()
                .map(|j| {
                    query
                        .projection
                        .iter()
                        .map(|p| j.lookup(&p.source).cloned().unwrap_or_default())
                        .collect()
                })
                .collect();
            (columns, rows)
        };

        Ok(QueryResult { columns, rows })
    }

    fn table_exists(&mut self, table: &str) -> Result<bool, MemoryError> {
        Ok(self.tables.contains_key(table))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::Filter;

    fn source() -> MemorySource {
        let mut src = MemorySource::new();
        src.create_table("node", &["nid", "type", "title"]);
        src.create_table("entity_translation", &["entity_id", "language"]);
        for (nid, ty, title) in [(1i64, "page", "One"), (2, "article", "Two")] {
            src.insert("node", [("nid", Value::from(nid)), ("type", ty.into()), ("title", title.into())])
                .unwrap();
        }
        for (id, lang) in [(1i64, "en"), (1, "fr"), (2, "en")] {
            src.insert("entity_translation", [("entity_id", Value::from(id)), ("language", lang.into())])
                .unwrap();
        }
        src
    }

    #[test]
    fn inner_join_pairs_matching_rows() {
        let mut src = source();
        let q = SelectQuery::from("entity_translation", "et")
            .inner_join(
                "node",
                "n",
                Filter::eq(ColumnRef::new("n", "nid"), ColumnRef::new("et", "entity_id")),
            )
            .column("n", "title")
            .column("et", "language")
            .order_by(ColumnRef::new("et", "language"), SortOrder::Descending)
            .order_by(ColumnRef::new("n", "title"), SortOrder::Ascending);
        let result = src.execute(&q).unwrap();
        assert_eq!(result.columns, vec!["title", "language"]);
        assert_eq!(
            result.rows,
            vec![
                vec![Value::from("One"), Value::from("fr")],
                vec![Value::from("One"), Value::from("en")],
                vec![Value::from("Two"), Value::from("en")],
            ]
        );
    }

    #[test]
    fn missing_table_and_column_are_errors() {
        let mut src = source();
        let q = SelectQuery::from("field_data_body", "t").column("t", "delta");
        assert_eq!(
            src.execute(&q).unwrap_err(),
            MemoryError::TableNotFound("field_data_body".into())
        );

        let q = SelectQuery::from("node", "n").column("n", "sticky");
        assert!(matches!(
            src.execute(&q),
            Err(MemoryError::ColumnNotFound { .. })
        ));

        assert!(src.insert("node", [("bogus", 1i64)]).is_err());
        assert!(!src.table_exists("field_data_body").unwrap());
    }

    #[test]
    fn unprojected_query_returns_base_columns() {
        let mut src = source();
        let q = SelectQuery::from("node", "n")
            .condition(Filter::eq(ColumnRef::new("n", "type"), "article"));
        let result = src.execute(&q).unwrap();
        assert_eq!(result.columns, vec!["nid", "type", "title"]);
        assert_eq!(result.len(), 1);
        assert_eq!(src.count(&q).unwrap(), 1);
    }
}
