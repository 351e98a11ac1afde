//! Configuration management for Heirloom
//!
//! Provides hierarchical configuration loading from multiple sources:
//! 1. Environment variables (`HEIRLOOM_*` prefix, `__` between keys)
//! 2. heirloom.local.toml (gitignored, credentials and local overrides)
//! 3. heirloom.toml (git-tracked, project config)
//! 4. ~/.config/heirloom/config.toml (user defaults)
//! 5. Built-in defaults (lowest precedence)
//!
//! ```toml
//! [databases.legacy]
//! driver = "mysql"
//! database = "d7"
//! prefix = "d7_"
//!
//! [sources.articles]
//! strategy = "entity-linked"
//! translations = true
//! node_type = "article"
//! database = "legacy"
//!
//! [node_types.article]
//! translatable = true
//! fields = [{ name = "body", columns = ["value", "summary", "format"] }]
//! ```

use anyhow::Result;
use heirloom_types::{NodeType, SourceOptions, TranslationStrategy};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

mod error;
mod loader;
mod paths;

pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use paths::Paths;

/// Name of the database a source reads when it names none.
pub const DEFAULT_DATABASE: &str = "default";

/// Main Heirloom configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct HeirloomConfig {
    pub project: ProjectConfig,
    /// Legacy databases by key, mirroring the legacy settings file.
    pub databases: BTreeMap<String, DatabaseConfig>,
    /// Extraction sources by migration id.
    pub sources: BTreeMap<String, SourceConfig>,
    /// Content types of the legacy schema and their fields.
    pub node_types: BTreeMap<String, NodeTypeConfig>,
}

impl Default for HeirloomConfig {
    fn default() -> Self {
        Self {
            project: ProjectConfig::default(),
            databases: BTreeMap::from([(DEFAULT_DATABASE.to_string(), DatabaseConfig::default())]),
            sources: BTreeMap::new(),
            node_types: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ProjectConfig {
    pub name: String,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            name: "heirloom-project".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum Driver {
    #[default]
    Mysql,
    Pgsql,
    Sqlite,
}

/// Connection settings for one legacy install.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DatabaseConfig {
    pub driver: Driver,
    pub host: String,
    pub port: u16,
    /// Database name, or the file path for SQLite.
    pub database: String,
    pub username: String,
    pub password: String,
    /// Table name prefix shared by every legacy table.
    pub prefix: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            driver: Driver::Mysql,
            host: "localhost".to_string(),
            port: 3306,
            database: "legacy".to_string(),
            username: "root".to_string(),
            password: String::new(),
            prefix: String::new(),
        }
    }
}

/// One extraction source.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SourceConfig {
    pub strategy: TranslationStrategy,
    pub translations: bool,
    pub node_type: Option<NodeType>,
    pub database: String,
    /// Rows whose fields are rebuilt together; 1 rebuilds row by row.
    pub batch_size: usize,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            strategy: TranslationStrategy::None,
            translations: false,
            node_type: None,
            database: DEFAULT_DATABASE.to_string(),
            batch_size: 1,
        }
    }
}

impl SourceConfig {
    pub fn options(&self) -> SourceOptions {
        SourceOptions {
            strategy: self.strategy,
            translations: self.translations,
            node_type: self.node_type.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct NodeTypeConfig {
    pub translatable: bool,
    pub fields: Vec<FieldConfig>,
}

/// A field and its sub-columns, in declaration order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FieldConfig {
    pub name: String,
    #[serde(default = "default_columns")]
    pub columns: Vec<String>,
}

fn default_columns() -> Vec<String> {
    vec!["value".to_string()]
}

impl HeirloomConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self> {
        ConfigLoader::new().load()
    }

    /// Load configuration from specific project directory
    pub fn load_from_dir(project_dir: impl AsRef<Path>) -> Result<Self> {
        ConfigLoader::new().with_project_dir(project_dir).load()
    }

    /// Parses a single TOML document on top of the built-in defaults.
    pub fn from_toml_str(s: &str) -> std::result::Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Looks up a source by migration id.
    pub fn source(&self, id: &str) -> Option<&SourceConfig> {
        self.sources.get(id)
    }

    /// Database settings used by source `id`.
    pub fn database_for(&self, id: &str) -> Option<&DatabaseConfig> {
        self.source(id).and_then(|s| self.databases.get(&s.database))
    }

    /// Checks references between sections.
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        for (id, source) in &self.sources {
            if !self.databases.contains_key(&source.database) {
                return Err(ConfigError::UnknownDatabase {
                    source_id: id.clone(),
                    database: source.database.clone(),
                });
            }
            if source.batch_size == 0 {
                return Err(ConfigError::ValidationError(format!(
                    "source {id}: batch_size must be at least 1"
                )));
            }
        }
        Ok(())
    }

    /// Resolve relative SQLite database paths against the project directory
    pub fn resolve_paths(&mut self, base_dir: impl AsRef<Path>) {
        let base = base_dir.as_ref();

        for db in self.databases.values_mut() {
            if db.driver == Driver::Sqlite && Path::new(&db.database).is_relative() {
                db.database = base.join(&db.database).to_string_lossy().into_owned();
            }
        }
    }
}
