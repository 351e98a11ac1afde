//! SQL rendering for [`SelectQuery`].
//!
//! Values are always bound as parameters. Identifiers are checked with
//! [`is_plain_identifier`] before they are written into the statement.

use std::fmt::Write;

use crate::error::Result;
use crate::plan::{
    ColumnRef, Filter, FilterCondition, FilterOp, Operand, SelectQuery, SortOrder,
    check_identifier,
};
use crate::value::Value;

/// Placeholder syntax of the target driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaceholderStyle {
    /// `?` (MySQL, SQLite).
    #[default]
    Question,
    /// `$1`, `$2`, ... (PostgreSQL).
    Numbered,
}

/// Rendering options for one legacy database.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderOptions {
    pub placeholder: PlaceholderStyle,
    /// Prepended to every table name (legacy installs may share a database).
    pub table_prefix: String,
}

impl RenderOptions {
    pub fn with_table_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.table_prefix = prefix.into();
        self
    }

    pub fn with_placeholder(mut self, placeholder: PlaceholderStyle) -> Self {
        self.placeholder = placeholder;
        self
    }
}

/// A rendered statement and its bound parameters, in order.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedSql {
    pub sql: String,
    pub params: Vec<Value>,
}

struct Renderer<'a> {
    options: &'a RenderOptions,
    sql: String,
    params: Vec<Value>,
}

impl<'a> Renderer<'a> {
    fn new(options: &'a RenderOptions) -> Self {
        Self {
            options,
            sql: String::new(),
            params: Vec::new(),
        }
    }

    fn bind(&mut self, value: &Value) {
        self.params.push(value.clone());
        match self.options.placeholder {
            PlaceholderStyle::Question => self.sql.push('?'),
            PlaceholderStyle::Numbered => {
                let _ = write!(self.sql, "${}", self.params.len());
            }
        }
    }

    fn column(&mut self, column: &ColumnRef) -> Result<()> {
        check_identifier(&column.table)?;
        check_identifier(&column.column)?;
        let _ = write!(self.sql, "{}.{}", column.table, column.column);
        Ok(())
    }

    fn table(&mut self, name: &str, alias: &str) -> Result<()> {
        check_identifier(name)?;
        check_identifier(alias)?;
        if !self.options.table_prefix.is_empty() {
            check_identifier(&self.options.table_prefix)?;
        }
        let _ = write!(self.sql, "{}{} {}", self.options.table_prefix, name, alias);
        Ok(())
    }

    fn operand(&mut self, operand: &Operand) -> Result<()> {
        match operand {
            Operand::Column(c) => self.column(c),
            Operand::Value(v) => {
                self.bind(v);
                Ok(())
            }
        }
    }

    fn condition(&mut self, condition: &FilterCondition) -> Result<()> {
        match &condition.op {
            FilterOp::In(values) if values.is_empty() => {
                self.sql.push_str("1 = 0");
                return Ok(());
            }
            _ => {}
        }

        self.column(&condition.column)?;
        match &condition.op {
            FilterOp::Eq(rhs) => {
                self.sql.push_str(" = ");
                self.operand(rhs)?;
            }
            FilterOp::NotEq(rhs) => {
                self.sql.push_str(" <> ");
                self.operand(rhs)?;
            }
            FilterOp::In(values) => {
                self.sql.push_str(" IN (");
                for (i, v) in values.iter().enumerate() {
                    if i > 0 {
                        self.sql.push_str(", ");
                    }
                    self.bind(v);
                }
                self.sql.push(')');
            }
            FilterOp::IsNull => self.sql.push_str(" IS NULL"),
            FilterOp::IsNotNull => self.sql.push_str(" IS NOT NULL"),
        }
        Ok(())
    }

    fn filter(&mut self, filter: &Filter) -> Result<()> {
        let (parts, joiner) = match filter {
            Filter::Condition(c) => return self.condition(c),
            Filter::And(parts) => (parts, " AND "),
            Filter::Or(parts) => (parts, " OR "),
        };
        for (i, part) in parts.iter().enumerate() {
            if i > 0 {
                self.sql.push_str(joiner);
            }
            let nested = !matches!(part, Filter::Condition(_));
            if nested {
                self.sql.push('(');
            }
            self.filter(part)?;
            if nested {
                self.sql.push(')');
            }
        }
        Ok(())
    }

    fn from_and_where(&mut self, query: &SelectQuery) -> Result<()> {
        self.sql.push_str(" FROM ");
        self.table(&query.from.name, &query.from.alias)?;
        for join in &query.joins {
            self.sql.push_str(" INNER JOIN ");
            self.table(&join.table.name, &join.table.alias)?;
            self.sql.push_str(" ON ");
            self.filter(&join.on)?;
        }
        if let Some(filter) = &query.filter {
            self.sql.push_str(" WHERE ");
            self.filter(filter)?;
        }
        Ok(())
    }

    fn finish(self) -> RenderedSql {
        RenderedSql {
            sql: self.sql,
            params: self.params,
        }
    }
}

pub(crate) fn render_select(query: &SelectQuery, options: &RenderOptions) -> Result<RenderedSql> {
    let mut r = Renderer::new(options);
    r.sql.push_str("SELECT ");
    if query.projection.is_empty() {
        let _ = write!(r.sql, "{}.*", query.from.alias);
    }
    for (i, p) in query.projection.iter().enumerate() {
        if i > 0 {
            r.sql.push_str(", ");
        }
        r.column(&p.source)?;
        if p.alias != p.source.column {
            check_identifier(&p.alias)?;
            let _ = write!(r.sql, " AS {}", p.alias);
        }
    }
    r.from_and_where(query)?;
    for (i, o) in query.order_by.iter().enumerate() {
        r.sql.push_str(if i == 0 { " ORDER BY " } else { ", " });
        r.column(&o.column)?;
        r.sql.push_str(match o.order {
            SortOrder::Ascending => " ASC",
            SortOrder::Descending => " DESC",
        });
    }
    Ok(r.finish())
}

pub(crate) fn render_count(query: &SelectQuery, options: &RenderOptions) -> Result<RenderedSql> {
    let mut r = Renderer::new(options);
    r.sql.push_str("SELECT COUNT(*) AS count");
    r.from_and_where(query)?;
    Ok(r.finish())
}
