//! Durable persistence of the rule configuration.
//!
//! # Load precedence
//! ```text
//! external file (exists, non-empty, parses)
//!     → bundled defaults file (exists, non-empty, parses)
//!     → empty config { enabled: true, rules: [] }
//! ```
//!
//! Failures at one level are logged and fall through to the next, so
//! `FileRuleStore::load` always yields a usable config. `save` reports
//! failures; swallowing them is the caller's decision.

use std::fs;
use std::path::{Path, PathBuf};

use crate::rules::model::{PersistedConfig, Rule};

/// Errors raised by a rule store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("rule store I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("rule store serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Where a loaded configuration came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSource {
    File,
    Bundled,
    /// Nothing persisted anywhere; the structural default was returned.
    Empty,
}

/// Result of a load, tagged with its source.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: PersistedConfig,
    pub source: ConfigSource,
}

/// Persistence backend for the rule registry.
pub trait RuleStore: Send + Sync + std::fmt::Debug {
    /// Read the persisted configuration.
    fn load(&self) -> Result<LoadedConfig, StoreError>;

    /// Overwrite the persisted configuration with the given state.
    fn save(&self, enabled: bool, rules: &[Rule]) -> Result<(), StoreError>;
}

/// JSON file-backed store.
#[derive(Debug, Clone)]
pub struct FileRuleStore {
    path: PathBuf,
    bundled: Option<PathBuf>,
}

impl FileRuleStore {
    /// Create a store writing to `path`. Relative paths resolve against the
    /// working directory at construction time.
    pub fn new(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let path = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
        Self {
            path,
            bundled: None,
        }
    }

    /// Read-only fallback consulted when the external file is unusable.
    pub fn with_bundled(mut self, bundled: impl Into<PathBuf>) -> Self {
        self.bundled = Some(bundled.into());
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read and parse one file. `Ok(None)` means missing or empty.
    fn read_config(path: &Path) -> Result<Option<PersistedConfig>, StoreError> {
        if !path.exists() {
            return Ok(None);
        }
        let bytes = fs::read(path).map_err(|source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        if bytes.is_empty() {
            return Ok(None);
        }
        Ok(Some(serde_json::from_slice(&bytes)?))
    }
}

impl RuleStore for FileRuleStore {
    fn load(&self) -> Result<LoadedConfig, StoreError> {
        match Self::read_config(&self.path) {
            Ok(Some(config)) => {
                return Ok(LoadedConfig {
                    config,
                    source: ConfigSource::File,
                })
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Rules file unreadable, falling back");
            }
        }

        if let Some(bundled) = &self.bundled {
            match Self::read_config(bundled) {
                Ok(Some(config)) => {
                    return Ok(LoadedConfig {
                        config,
                        source: ConfigSource::Bundled,
                    })
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(path = %bundled.display(), error = %e, "Bundled rules unreadable, falling back");
                }
            }
        }

        Ok(LoadedConfig {
            config: PersistedConfig::default(),
            source: ConfigSource::Empty,
        })
    }

    fn save(&self, enabled: bool, rules: &[Rule]) -> Result<(), StoreError> {
        let config = PersistedConfig {
            enabled,
            rules: rules.to_vec(),
        };

        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir).map_err(|source| StoreError::Io {
                path: dir.to_path_buf(),
                source,
            })?;
        }

        let bytes = serde_json::to_vec_pretty(&config)?;
        fs::write(&self.path, bytes).map_err(|source| StoreError::Io {
            path: self.path.clone(),
            source,
        })?;

        tracing::debug!(path = %self.path.display(), rules = rules.len(), "Rules persisted");
        Ok(())
    }
}
