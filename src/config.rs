//! File-backed configuration for the storage layer and logging.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Environment variable that points at a config file when no explicit path is given.
pub const CONFIG_ENV: &str = "TABULA_CONFIG";

/// Options used when opening a [`crate::db::Database`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseOptions {
    /// Path of the SQLite database file.
    pub path: PathBuf,
    /// Whether `PRAGMA foreign_keys = ON` is issued on every connection.
    pub foreign_keys: bool,
    /// How long a connection waits on a locked database, in milliseconds.
    pub busy_timeout_ms: u64,
    /// Whether to create the database file if it doesn't exist.
    pub create_if_missing: bool,
}

impl Default for DatabaseOptions {
    fn default() -> Self {
        Self {
            path: PathBuf::from("tabula.db"),
            foreign_keys: true,
            busy_timeout_ms: 5_000,
            create_if_missing: true,
        }
    }
}

impl DatabaseOptions {
    /// Default options pointed at `path`.
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }
}

/// Options for [`crate::telemetry::init_tracing`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub filter: String,
    /// Whether to colour the output.
    pub ansi: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "tabula=info".to_string(),
            ansi: true,
        }
    }
}

/// Top-level configuration file.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TabulaConfig {
    /// `[database]` section.
    pub database: DatabaseOptions,
    /// `[logging]` section.
    pub logging: LoggingConfig,
}

impl TabulaConfig {
    /// Loads configuration from `explicit`, `$TABULA_CONFIG`, or the user
    /// config directory, in that order. A missing file yields the defaults.
    pub fn load(explicit: Option<PathBuf>) -> Result<Self, ConfigError> {
        let path = explicit
            .or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from))
            .or_else(default_config_path);
        match path {
            Some(path) if path.exists() => read_file(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Parses configuration from TOML text.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(|source| ConfigError::Parse {
            path: PathBuf::from("<inline>"),
            source,
        })
    }

    /// Writes the configuration as pretty TOML, creating parent directories.
    pub fn persist(&self, target: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = target.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| ConfigError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let serialized =
            toml::to_string_pretty(self).map_err(|source| ConfigError::Serialize { source })?;
        fs::write(target, serialized).map_err(|source| ConfigError::Write {
            path: target.to_path_buf(),
            source,
        })
    }
}

fn read_file(path: &Path) -> Result<TabulaConfig, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Errors raised while loading or persisting configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file exists but could not be read.
    #[error("failed to read config {path}: {source}")]
    Read {
        /// File that failed.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// The config file is not valid TOML for [`TabulaConfig`].
    #[error("failed to parse config {path}: {source}")]
    Parse {
        /// File that failed.
        path: PathBuf,
        /// Underlying parse error.
        source: toml::de::Error,
    },
    /// The configuration could not be rendered as TOML.
    #[error("failed to serialize config: {source}")]
    Serialize {
        /// Underlying serialization error.
        source: toml::ser::Error,
    },
    /// The config file could not be written.
    #[error("failed to write config {path}: {source}")]
    Write {
        /// File that failed.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// A parent directory could not be created.
    #[error("failed to create config directory {path}: {source}")]
    CreateDir {
        /// Directory that failed.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// The tracing filter directive was rejected.
    #[error("invalid log filter '{filter}': {message}")]
    InvalidFilter {
        /// Directive as configured.
        filter: String,
        /// Parser message.
        message: String,
    },
    /// A global tracing subscriber is already installed.
    #[error("tracing subscriber already installed")]
    SubscriberInstalled,
}

/// `<config dir>/tabula/tabula.toml`, when the platform has a config dir.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|base| base.join("tabula").join("tabula.toml"))
}
