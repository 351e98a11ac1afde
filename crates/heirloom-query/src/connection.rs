//! The connection seam to a legacy database.

use crate::error::{QueryError, Result};
use crate::plan::SelectQuery;
use crate::value::Value;

/// A single result row.
pub type Row = Vec<Value>;

/// Result of executing a query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResult {
    /// Column names in result order.
    pub columns: Vec<String>,
    /// Result rows.
    pub rows: Vec<Row>,
}

impl QueryResult {
    /// Creates an empty result with the given columns.
    pub fn empty(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: vec![],
        }
    }

    /// Returns the number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if there are no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of `name` among the result columns.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Like [`QueryResult::column_index`], failing with [`QueryError::ColumnNotFound`].
    pub fn require_column(&self, name: &str) -> Result<usize> {
        self.column_index(name)
            .ok_or_else(|| QueryError::ColumnNotFound(name.to_string()))
    }

    /// Iterates rows as name-addressable records.
    pub fn records(&self) -> impl Iterator<Item = Record<'_>> {
        self.rows.iter().map(|values| Record {
            columns: &self.columns,
            values,
        })
    }
}

/// A borrowed view of one row with its column names.
#[derive(Debug, Clone, Copy)]
pub struct Record<'a> {
    columns: &'a [String],
    values: &'a [Value],
}

impl<'a> Record<'a> {
    pub fn get(&self, name: &str) -> Option<&'a Value> {
        self.columns
            .iter()
            .position(|c| c == name)
            .and_then(|i| self.values.get(i))
    }

    /// Column name / value pairs in result order.
    pub fn iter(&self) -> impl Iterator<Item = (&'a str, &'a Value)> {
        self.columns
            .iter()
            .map(String::as_str)
            .zip(self.values.iter())
    }
}

/// Executes extraction queries against a legacy schema.
///
/// Implemented by the host pipeline's database layer. Errors are passed
/// through untouched as the source of [`QueryError::Connection`].
pub trait SourceConnection {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Runs a SELECT and returns every row.
    fn execute(&mut self, query: &SelectQuery) -> std::result::Result<QueryResult, Self::Error>;

    /// Returns true if `table` exists in the legacy schema.
    fn table_exists(&mut self, table: &str) -> std::result::Result<bool, Self::Error>;

    /// Counts the rows `query` would return.
    fn count(&mut self, query: &SelectQuery) -> std::result::Result<u64, Self::Error> {
        Ok(self.execute(query)?.len() as u64)
    }
}

impl<C: SourceConnection + ?Sized> SourceConnection for &mut C {
    type Error = C::Error;

    fn execute(&mut self, query: &SelectQuery) -> std::result::Result<QueryResult, Self::Error> {
        (**self).execute(query)
    }

    fn table_exists(&mut self, table: &str) -> std::result::Result<bool, Self::Error> {
        (**self).table_exists(table)
    }

    fn count(&mut self, query: &SelectQuery) -> std::result::Result<u64, Self::Error> {
        (**self).count(query)
    }
}

/// Runs `query`, mapping the connection error into [`QueryError`].
pub fn execute<C: SourceConnection + ?Sized>(
    conn: &mut C,
    query: &SelectQuery,
) -> Result<QueryResult> {
    conn.execute(query).map_err(QueryError::connection)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result() -> QueryResult {
        QueryResult {
            columns: vec!["delta".into(), "value".into()],
            rows: vec![
                vec![Value::BigInt(0), Value::from("a")],
                vec![Value::BigInt(1), Value::from("b")],
            ],
        }
    }

    #[test]
    fn records_are_addressable_by_name() {
        let r = result();
        let values: Vec<_> = r.records().filter_map(|rec| rec.get("value").cloned()).collect();
        assert_eq!(values, vec![Value::from("a"), Value::from("b")]);
        assert!(r.records().all(|rec| rec.get("missing").is_none()));
    }

    #[test]
    fn require_column_reports_missing() {
        let r = result();
        assert_eq!(r.require_column("delta").unwrap(), 0);
        assert!(matches!(
            r.require_column("nid"),
            Err(QueryError::ColumnNotFound(c)) if c == "nid"
        ));
    }
}
