//! Content item source: the operations a migration pipeline drives.

use std::fmt::{self, Display};

use heirloom_config::{DatabaseConfig, Driver, HeirloomConfig};
use heirloom_fields::{
    FieldDef, FieldReconstructor, FieldRegistry, ItemFields, ItemRef, MigrateRow, RowValue,
    SourceRow, StaticFieldRegistry,
};
use heirloom_query::{
    NodeTypeCatalog, PlaceholderStyle, QueryError, QueryPlan, RenderOptions, RenderedSql,
    SourceConnection, Value, build_query, execute,
};
use heirloom_types::{SourceOptions, TranslationStrategy};
use tracing::{info, warn};

use crate::error::{HeirloomError, Result};

/// Why a row was left out of the migration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The row has no content type.
    MissingType,
    /// The row has no usable content item id.
    MissingId,
}

impl Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::MissingType => f.write_str("missing content type"),
            SkipReason::MissingId => f.write_str("missing content item id"),
        }
    }
}

/// Outcome of preparing one row.
#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prepared {
    /// Fields are attached; hand the row on.
    Ready,
    /// Drop the row.
    Skip(SkipReason),
}

/// Prepared rows of one run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Extraction {
    pub rows: Vec<SourceRow>,
    pub skipped: usize,
}

/// Extraction source for legacy content items.
///
/// Built once per migration run from [`SourceOptions`] and a schema registry.
/// The host executes [`NodeSource::build_query`] and passes every row
/// through [`NodeSource::prepare_row`], or lets [`NodeSource::extract`] do both.
#[derive(Debug, Clone)]
pub struct NodeSource<R = StaticFieldRegistry> {
    options: SourceOptions,
    registry: R,
    batch_size: usize,
    render_options: RenderOptions,
}

impl<R: FieldRegistry + NodeTypeCatalog> NodeSource<R> {
    pub fn new(options: SourceOptions, registry: R) -> Self {
        Self {
            options,
            registry,
            batch_size: 1,
            render_options: RenderOptions::default(),
        }
    }

    /// Rebuilds fields for `batch_size` rows at a time during [`NodeSource::extract`].
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn with_render_options(mut self, render_options: RenderOptions) -> Self {
        self.render_options = render_options;
        self
    }

    pub fn options(&self) -> &SourceOptions {
        &self.options
    }

    pub fn registry(&self) -> &R {
        &self.registry
    }

    /// Builds the extraction query. Configuration errors surface here.
    pub fn build_query(&self) -> Result<QueryPlan> {
        Ok(build_query(&self.options, &self.registry)?)
    }

    /// Renders the extraction query for this source's database.
    pub fn to_sql(&self) -> Result<RenderedSql> {
        Ok(self.build_query()?.to_sql(&self.render_options)?)
    }

    /// Renders a row count for this source's database.
    pub fn to_count_sql(&self) -> Result<RenderedSql> {
        Ok(self.build_query()?.to_count_sql(&self.render_options)?)
    }

    /// Rebuilds and attaches every field declared for the row's content type.
    ///
    /// Rows without a content type or id are skipped, not failed.
    pub fn prepare_row<C, T>(&self, conn: &mut C, row: &mut T) -> Result<Prepared>
    where
        C: SourceConnection + ?Sized,
        T: MigrateRow + ?Sized,
    {
        let item = match self.item_ref(row) {
            Ok(item) => item,
            Err(reason) => {
                warn!(%reason, "skipping source row");
                return Ok(Prepared::Skip(reason));
            }
        };

        let fields = FieldReconstructor::new(&self.registry).reconstruct_all(conn, &item)?;
        attach(row, fields);
        Ok(Prepared::Ready)
    }

    /// Runs the extraction query and prepares every row.
    pub fn extract<C: SourceConnection + ?Sized>(&self, conn: &mut C) -> Result<Extraction> {
        let plan = self.build_query()?;
        let result = execute(conn, plan.query())?;
        let mut rows: Vec<SourceRow> = result.records().map(SourceRow::from_record).collect();

        let mut extraction = Extraction::default();
        if self.batch_size == 1 {
            for mut row in rows {
                match self.prepare_row(conn, &mut row)? {
                    Prepared::Ready => extraction.rows.push(row),
                    Prepared::Skip(_) => extraction.skipped += 1,
                }
            }
        } else {
            while !rows.is_empty() {
                let page: Vec<SourceRow> = rows.drain(..self.batch_size.min(rows.len())).collect();
                self.prepare_page(conn, page, &mut extraction)?;
            }
        }

        info!(
            strategy = %plan.strategy(),
            translations = self.options.translations,
            rows = extraction.rows.len(),
            skipped = extraction.skipped,
            "extraction complete"
        );
        Ok(extraction)
    }

    /// Number of rows the extraction query returns.
    pub fn count<C: SourceConnection + ?Sized>(&self, conn: &mut C) -> Result<u64> {
        let plan = self.build_query()?;
        Ok(conn
            .count(plan.query())
            .map_err(QueryError::connection)?)
    }

    fn prepare_page<C: SourceConnection + ?Sized>(
        &self,
        conn: &mut C,
        page: Vec<SourceRow>,
        out: &mut Extraction,
    ) -> Result<()> {
        let mut ready = Vec::with_capacity(page.len());
        let mut items = Vec::with_capacity(page.len());
        for row in page {
            match self.item_ref(&row) {
                Ok(item) => {
                    items.push(item);
                    ready.push(row);
                }
                Err(reason) => {
                    warn!(%reason, "skipping source row");
                    out.skipped += 1;
                }
            }
        }

        let fields = FieldReconstructor::new(&self.registry).reconstruct_all_batch(conn, &items)?;
        for (mut row, fields) in ready.into_iter().zip(fields) {
            attach(&mut row, fields);
            out.rows.push(row);
        }
        Ok(())
    }

    /// Identifies the item behind a row.
    ///
    /// Only entity-level translations store field values per language; under
    /// the other strategies a translated item keeps its language-neutral
    /// values, so the row language does not filter field storage.
    fn item_ref<T: MigrateRow + ?Sized>(
        &self,
        row: &T,
    ) -> std::result::Result<ItemRef, SkipReason> {
        let node_type = row
            .scalar("type")
            .and_then(Value::as_text)
            .filter(|t| !t.is_empty())
            .ok_or(SkipReason::MissingType)?;
        let nid = row
            .scalar("nid")
            .and_then(Value::to_u64)
            .filter(|&nid| nid > 0)
            .ok_or(SkipReason::MissingId)?;

        let mut item = ItemRef::new(node_type, nid);
        if let Some(vid) = row.scalar("vid").and_then(Value::to_u64) {
            item = item.with_revision(vid);
        }
        if self.options.strategy == TranslationStrategy::EntityLinked
            && let Some(language) = row.scalar("language").and_then(Value::as_text)
        {
            item = item.with_language(language);
        }
        Ok(item)
    }
}

impl NodeSource<StaticFieldRegistry> {
    /// Builds the source configured under `source_id`.
    pub fn from_config(config: &HeirloomConfig, source_id: &str) -> Result<Self> {
        config.validate()?;
        let source = config
            .source(source_id)
            .ok_or_else(|| HeirloomError::UnknownSource(source_id.to_string()))?;

        let mut node_source = NodeSource::new(source.options(), registry_from_config(config)?)
            .with_batch_size(source.batch_size);
        if let Some(db) = config.databases.get(&source.database) {
            node_source = node_source.with_render_options(render_options(db));
        }
        Ok(node_source)
    }
}

/// Builds the field registry declared under `node_types`.
pub fn registry_from_config(config: &HeirloomConfig) -> Result<StaticFieldRegistry> {
    let mut builder = StaticFieldRegistry::builder();
    for (name, node_type) in &config.node_types {
        builder = builder.node_type(name.as_str(), node_type.translatable);
        for field in &node_type.fields {
            builder = builder.field(
                name.as_str(),
                FieldDef::new(field.name.clone(), field.columns.iter().cloned())?,
            );
        }
    }
    Ok(builder.build()?)
}

/// SQL dialect settings for one legacy database.
pub fn render_options(db: &DatabaseConfig) -> RenderOptions {
    let placeholder = match db.driver {
        Driver::Pgsql => PlaceholderStyle::Numbered,
        Driver::Mysql | Driver::Sqlite => PlaceholderStyle::Question,
    };
    RenderOptions::default()
        .with_placeholder(placeholder)
        .with_table_prefix(db.prefix.clone())
}

fn attach<T: MigrateRow + ?Sized>(row: &mut T, fields: ItemFields) {
    for (name, field) in fields {
        row.set_source_property(&name, RowValue::Field(field));
    }
}
