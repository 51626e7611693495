//! CLI command handlers.

mod aggregate;
mod import;
mod map;
mod seed;
mod verify;

pub use aggregate::run_aggregate_command;
pub use import::run_import_command;
pub use map::run_map_command;
pub use seed::run_seed_command;
pub use verify::run_verify_command;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::debug;

use topicmap_core::config::LoadedConfig;
use topicmap_core::topics::{AliasTable, WeightageTable};
use topicmap_core::{Database, MatchPolicy, TopicStore};

/// Settings every command resolves the same way.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub database_path: PathBuf,
    pub aliases_path: Option<PathBuf>,
    pub weightage_path: Option<PathBuf>,
    pub policy: MatchPolicy,
}

impl RunContext {
    /// Applies CLI overrides on top of the loaded config file.
    #[must_use]
    pub fn resolve(loaded: &LoadedConfig, database_override: Option<&Path>) -> Self {
        Self {
            database_path: loaded.database_path(database_override),
            aliases_path: loaded.config.aliases.clone(),
            weightage_path: loaded.config.weightage.clone(),
            policy: loaded.config.match_policy(),
        }
    }

    pub async fn open_store(&self) -> Result<TopicStore> {
        let db = Database::new(&self.database_path).await.with_context(|| {
            format!("Cannot open database '{}'", self.database_path.display())
        })?;
        Ok(TopicStore::new(db))
    }

    pub fn load_aliases(&self) -> Result<AliasTable> {
        let table = match &self.aliases_path {
            Some(path) => AliasTable::load(path)?,
            None => AliasTable::builtin().context("Built-in alias table is invalid")?,
        };
        debug!(version = table.version(), aliases = table.len(), "Alias table ready");
        Ok(table)
    }

    pub fn load_weightage(&self) -> Result<Option<WeightageTable>> {
        self.weightage_path
            .as_deref()
            .map(WeightageTable::load)
            .transpose()
            .map_err(Into::into)
    }
}
