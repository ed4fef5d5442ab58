//! Layered configuration loading using figment.
//!
//! Configuration sources (in priority order, highest wins):
//! 1. Environment variables (`DECLMAP_*` prefix, `__` as separator)
//! 2. An explicit file passed on the command line
//! 3. Project-level `declmap.toml`
//! 4. User-level `~/.config/declmap/config.toml`
//! 5. Built-in defaults
//!
//! `DECLMAP_LOG__LEVEL=debug` maps to `log.level`, and
//! `DECLMAP_EXTRACT__SELF_NAME=this` maps to `extract.self_name`.

use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::extract::{ExtractOptions, DEFAULT_SELF_NAME};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration error: {0}")]
    Figment(#[from] figment::Error),

    #[error("invalid configuration value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

fn default_level() -> String {
    "warn".to_string()
}

fn default_file_prefix() -> String {
    "declmap.log".to_string()
}

const fn default_max_files() -> usize {
    5
}

const fn default_ansi() -> bool {
    true
}

/// Logging sinks and verbosity.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct LogConfig {
    /// Filter directive, e.g. `info` or `declmap=debug`.
    #[serde(default = "default_level")]
    pub level: String,

    /// Directory for rolling log files. Console only when unset.
    #[serde(default)]
    pub directory: Option<PathBuf>,

    #[serde(default = "default_file_prefix")]
    pub file_prefix: String,

    /// Rotated files kept on disk.
    #[serde(default = "default_max_files")]
    pub max_files: usize,

    #[serde(default = "default_ansi")]
    pub ansi: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            directory: None,
            file_prefix: default_file_prefix(),
            max_files: default_max_files(),
            ansi: default_ansi(),
        }
    }
}

fn default_self_name() -> String {
    DEFAULT_SELF_NAME.to_string()
}

fn default_extensions() -> Vec<String> {
    vec!["py".to_string(), "pyi".to_string()]
}

/// What to extract and from which files.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ExtractConfig {
    #[serde(default = "default_self_name")]
    pub self_name: String,

    /// File extensions treated as Python source, without the dot.
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,

    /// Glob patterns, relative to the walk root, to skip.
    #[serde(default)]
    pub exclude: Vec<String>,

    #[serde(default)]
    pub include_hidden: bool,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            self_name: default_self_name(),
            extensions: default_extensions(),
            exclude: Vec::new(),
            include_hidden: false,
        }
    }
}

impl ExtractConfig {
    pub fn options(&self) -> ExtractOptions {
        ExtractOptions::with_self_name(self.self_name.clone())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct DeclmapConfig {
    #[serde(default)]
    pub log: LogConfig,
    #[serde(default)]
    pub extract: ExtractConfig,
}

impl DeclmapConfig {
    /// Load configuration from all sources (TOML files + environment variables).
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Load configuration, layering `explicit` above the discovered files.
    pub fn load_from(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let config: Self = Self::figment(explicit).extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration after reading a `.env` file from the working directory.
    pub fn load_with_dotenv(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        // A missing .env file is not an error.
        let _ = dotenvy::dotenv();
        Self::load_from(explicit)
    }

    /// Build the figment provider chain.
    pub fn figment(explicit: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        // Layer 1: User-global config
        if let Some(global_path) = Self::global_config_path() {
            if global_path.exists() {
                figment = figment.merge(Toml::file(global_path));
            }
        }

        // Layer 2: Project-local config
        let local_path = PathBuf::from("declmap.toml");
        if local_path.exists() {
            figment = figment.merge(Toml::file(local_path));
        }

        // Layer 3: Explicit file. file_exact fails on a missing path and
        // does not search parent directories.
        if let Some(path) = explicit {
            figment = figment.merge(Toml::file_exact(path));
        }

        // Layer 4: Environment variables (highest priority). DECLMAP_LOG is
        // the tracing filter, not the `[log]` table.
        figment.merge(Env::prefixed("DECLMAP_").ignore(&["LOG"]).split("__"))
    }

    fn global_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("declmap").join("config.toml"))
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let self_name = self.extract.self_name.trim();
        if self_name.is_empty() || self_name.contains(|c: char| c.is_whitespace()) {
            return Err(ConfigError::InvalidValue {
                field: "extract.self_name".to_string(),
                reason: "must be a single identifier".to_string(),
            });
        }
        if self.extract.extensions.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "extract.extensions".to_string(),
                reason: "at least one extension is required".to_string(),
            });
        }
        if self.log.max_files == 0 {
            return Err(ConfigError::InvalidValue {
                field: "log.max_files".to_string(),
                reason: "must keep at least one file".to_string(),
            });
        }
        Ok(())
    }
}
