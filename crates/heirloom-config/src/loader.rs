//! Configuration loader with multi-source merging

use crate::{HeirloomConfig, Paths};
use anyhow::{Context, Result};
use std::env;
use std::path::{Path, PathBuf};

/// Configuration loader with builder pattern
pub struct ConfigLoader {
    project_dir: PathBuf,
    env_prefix: String,
}

impl ConfigLoader {
    /// Create a new config loader with default project directory (current dir)
    pub fn new() -> Self {
        Self {
            project_dir: env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            env_prefix: "HEIRLOOM".to_string(),
        }
    }

    /// Set the project directory
    pub fn with_project_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.project_dir = dir.as_ref().to_path_buf();
        self
    }

    /// Set the environment variable prefix (default: "HEIRLOOM")
    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    /// Configuration files that exist, lowest precedence first: the user file,
    /// then `heirloom.toml`, then `heirloom.local.toml`.
    pub fn files(&self) -> Vec<PathBuf> {
        let user = Paths::new().user_config_file().ok();
        user.into_iter()
            .chain([
                Paths::project_config_file(&self.project_dir),
                Paths::local_config_file(&self.project_dir),
            ])
            .filter(|path| path.exists())
            .collect()
    }

    /// `HEIRLOOM_SOURCES__PAGES__BATCH_SIZE=50` sets `sources.pages.batch_size`.
    fn environment(&self) -> config::Environment {
        config::Environment::with_prefix(&self.env_prefix)
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true)
    }

    /// Merges defaults, every configuration file and the environment, then
    /// validates source references before resolving SQLite paths.
    pub fn load(self) -> Result<HeirloomConfig> {
        let mut builder = config::Config::builder()
            .add_source(config::Config::try_from(&HeirloomConfig::default())?);
        for file in self.files() {
            builder = builder.add_source(config::File::from(file).format(config::FileFormat::Toml));
        }

        let mut loaded: HeirloomConfig = builder
            .add_source(self.environment())
            .build()
            .and_then(|merged| merged.try_deserialize::<HeirloomConfig>())
            .context("Failed to load configuration")?;

        loaded.validate().with_context(|| {
            format!("Invalid configuration in {}", self.project_dir.display())
        })?;
        loaded.resolve_paths(&self.project_dir);
        Ok(loaded)
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}
