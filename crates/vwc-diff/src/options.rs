use std::path::Path;

use serde::{Deserialize, Serialize};
use vwc_ignore::IgnoreConfig;

use crate::error::{DiffError, DiffResult};

/// Settings for one diff run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiffOptions {
    /// Report ignored paths through `ignored_path` instead of dropping them.
    pub list_ignored: bool,
    /// Match live names against snapshot names exactly. When `false`, names
    /// are compared lower-cased.
    pub case_sensitive: bool,
    /// Whether the platform supports symlinks. Without support, snapshot
    /// symlinks compare as regular files.
    pub symlinks_enabled: bool,
    /// Entry names never reported, not even as ignored.
    pub hidden_names: Vec<String>,
}

impl Default for DiffOptions {
    fn default() -> Self {
        Self {
            list_ignored: false,
            case_sensitive: true,
            symlinks_enabled: true,
            hidden_names: vec![".git".to_string(), ".hg".to_string()],
        }
    }
}

impl DiffOptions {
    pub fn from_toml_str(contents: &str) -> DiffResult<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Read options from a TOML file. Missing keys take their defaults.
    pub fn load(path: impl AsRef<Path>) -> DiffResult<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| DiffError::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    /// Ignore-stack settings derived from these options.
    pub fn ignore_config(&self) -> IgnoreConfig {
        IgnoreConfig {
            hidden_names: self.hidden_names.clone(),
            case_insensitive: !self.case_sensitive,
        }
    }
}
