//! Store configuration.
//!
//! # Responsibility
//! - Describe where documents and legacy imports live.
//! - Load `modelstore.json` from a config directory, writing a default one on
//!   first use.
//!
//! # Invariants
//! - Relative paths in the config file resolve against the config directory.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

const CONFIG_FILE_NAME: &str = "modelstore.json";
const DEFAULT_DOCUMENTS_DIR: &str = "documents";

/// Filesystem locations and read-path policy for one document store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreConfig {
    /// Directory holding one subdirectory per document.
    pub root: PathBuf,
    /// Secondary location scanned by `bootstrap_legacy`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub legacy_root: Option<PathBuf>,
    /// Write `upgraded` migration results back on read.
    #[serde(default = "default_persist_upgrades")]
    pub persist_upgrades: bool,
}

fn default_persist_upgrades() -> bool {
    true
}

impl StoreConfig {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            legacy_root: None,
            persist_upgrades: default_persist_upgrades(),
        }
    }

    pub fn with_legacy_root(mut self, legacy_root: impl Into<PathBuf>) -> Self {
        self.legacy_root = Some(legacy_root.into());
        self
    }

    pub fn with_persist_upgrades(mut self, persist_upgrades: bool) -> Self {
        self.persist_upgrades = persist_upgrades;
        self
    }

    /// Reads `<base_dir>/modelstore.json`, creating it with defaults if absent.
    ///
    /// # Errors
    /// - `ConfigError::Io` when the directory or file cannot be read/written.
    /// - `ConfigError::Parse` when the existing file is not a valid config.
    pub fn load_or_init(base_dir: &Path) -> Result<Self, ConfigError> {
        fs::create_dir_all(base_dir).map_err(|source| ConfigError::Io {
            path: base_dir.to_path_buf(),
            source,
        })?;

        let config_path = base_dir.join(CONFIG_FILE_NAME);
        if config_path.exists() {
            let raw = fs::read_to_string(&config_path).map_err(|source| ConfigError::Io {
                path: config_path.clone(),
                source,
            })?;
            let config: StoreConfig =
                serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
                    path: config_path.clone(),
                    source,
                })?;
            return Ok(config.resolved_against(base_dir));
        }

        let default = StoreConfig::new(DEFAULT_DOCUMENTS_DIR);
        let payload = serde_json::to_string_pretty(&default).map_err(ConfigError::Serialize)?;
        fs::write(&config_path, payload).map_err(|source| ConfigError::Io {
            path: config_path.clone(),
            source,
        })?;
        Ok(default.resolved_against(base_dir))
    }

    fn resolved_against(mut self, base_dir: &Path) -> Self {
        if self.root.is_relative() {
            self.root = base_dir.join(&self.root);
        }
        if let Some(legacy_root) = self.legacy_root.take() {
            self.legacy_root = Some(if legacy_root.is_relative() {
                base_dir.join(legacy_root)
            } else {
                legacy_root
            });
        }
        self
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io { path: PathBuf, source: io::Error },
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    Serialize(serde_json::Error),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => write!(f, "config io error at `{}`: {source}", path.display()),
            Self::Parse { path, source } => {
                write!(f, "invalid config `{}`: {source}", path.display())
            }
            Self::Serialize(err) => write!(f, "failed to serialize default config: {err}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse { source, .. } => Some(source),
            Self::Serialize(err) => Some(err),
        }
    }
}
