//! File configuration for the `topicmap` binary.
//!
//! The file is JSON:
//!
//! ```json
//! {
//!   "database": "/var/lib/topicmap/topicmap.db",
//!   "aliases": "aliases.json",
//!   "weightage": "weightage.kcet.json",
//!   "word_overlap": false,
//!   "prefer_aliases": false
//! }
//! ```
//!
//! Relative paths are resolved against the directory holding the file.

use std::env;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::topics::MatchPolicy;

/// Database file used when neither the CLI nor the config file names one.
pub const DEFAULT_DATABASE_FILE: &str = "topicmap.db";

/// Errors produced while loading the config file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An explicitly requested config file does not exist.
    #[error(
        "config file not found: '{}'\n  Suggestion: Check the --config path or omit it to use the default location",
        .0.display()
    )]
    NotFound(PathBuf),

    #[error("cannot read config file '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file '{}': {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Values read from the config file. Every key is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    /// SQLite database path.
    pub database: Option<PathBuf>,
    /// Alias table replacing the built-in one.
    pub aliases: Option<PathBuf>,
    /// Exam weightage table applied when seeding.
    pub weightage: Option<PathBuf>,
    /// Enable the word-overlap matching step.
    pub word_overlap: Option<bool>,
    /// Try aliases before containment.
    pub prefer_aliases: Option<bool>,
}

impl FileConfig {
    fn resolve_relative_to(mut self, base: &Path) -> Self {
        for path in [&mut self.database, &mut self.aliases, &mut self.weightage]
            .into_iter()
            .flatten()
        {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        }
        self
    }

    /// Matching policy the file asks for, defaults elsewhere.
    #[must_use]
    pub fn match_policy(&self) -> MatchPolicy {
        let defaults = MatchPolicy::default();
        MatchPolicy {
            prefer_aliases: self.prefer_aliases.unwrap_or(defaults.prefer_aliases),
            word_overlap: self.word_overlap.unwrap_or(defaults.word_overlap),
        }
    }
}

/// Loaded config metadata.
#[derive(Debug, Clone, Default)]
pub struct LoadedConfig {
    /// Path the config was looked up at, if any location is known.
    pub path: Option<PathBuf>,
    /// Parsed values; defaults when no file was found.
    pub config: FileConfig,
    /// Whether a file was actually read.
    pub loaded_from_file: bool,
}

impl LoadedConfig {
    /// Database path: CLI flag, then config file, then [`DEFAULT_DATABASE_FILE`].
    #[must_use]
    pub fn database_path(&self, cli_override: Option<&Path>) -> PathBuf {
        cli_override
            .map(Path::to_path_buf)
            .or_else(|| self.config.database.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATABASE_FILE))
    }
}

/// Resolves the default config path.
///
/// Priority:
/// 1. `$XDG_CONFIG_HOME/topicmap/config.json`
/// 2. `$HOME/.config/topicmap/config.json`
#[must_use]
pub fn resolve_default_config_path() -> Option<PathBuf> {
    if let Some(xdg_config_home) = env_var_non_empty_os("XDG_CONFIG_HOME") {
        return Some(
            PathBuf::from(xdg_config_home)
                .join("topicmap")
                .join("config.json"),
        );
    }

    let home = env_var_non_empty_os("HOME")?;
    Some(
        PathBuf::from(home)
            .join(".config")
            .join("topicmap")
            .join("config.json"),
    )
}

fn env_var_non_empty_os(name: &str) -> Option<OsString> {
    let value = env::var_os(name)?;
    if value.is_empty() { None } else { Some(value) }
}

/// Loads the config file.
///
/// An explicit path must exist. Without one, the default location is used
/// and a missing file yields defaults.
///
/// # Errors
///
/// Returns [`ConfigError::NotFound`] for a missing explicit file, or an
/// IO/parse error for an unreadable or invalid one.
pub fn load_config(explicit: Option<&Path>) -> Result<LoadedConfig, ConfigError> {
    let path = match explicit {
        Some(path) if !path.exists() => return Err(ConfigError::NotFound(path.to_path_buf())),
        Some(path) => Some(path.to_path_buf()),
        None => resolve_default_config_path(),
    };

    let Some(path_ref) = path.as_deref().filter(|p| p.exists()) else {
        debug!("No config file found, using defaults");
        return Ok(LoadedConfig {
            path,
            config: FileConfig::default(),
            loaded_from_file: false,
        });
    };

    let config = load_file_config(path_ref)?;
    debug!(path = %path_ref.display(), "Loaded config file");
    Ok(LoadedConfig {
        path,
        config,
        loaded_from_file: true,
    })
}

fn load_file_config(path: &Path) -> Result<FileConfig, ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let config: FileConfig = serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    let base = path.parent().unwrap_or_else(|| Path::new(""));
    Ok(config.resolve_relative_to(base))
}
