//! Configuration for the table engine and its shell

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::btree::{DEFAULT_DEGREE, MIN_DEGREE};
use crate::error::{LumaError, Result};
use crate::table::{TableOptions, DEFAULT_CACHE_CAPACITY};

/// Snapshot file extension
pub const SNAPSHOT_EXTENSION: &str = "ltb";

/// Main configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory holding one snapshot file per database
    pub data_dir: PathBuf,

    /// Cached query results per table
    pub cache_capacity: usize,

    /// Minimum degree of B-tree indexes
    pub btree_degree: usize,

    /// Default `tracing` filter when `RUST_LOG` is unset
    pub log_filter: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./luma_data"),
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            btree_degree: DEFAULT_DEGREE,
            log_filter: "luma_table=info".to_string(),
        }
    }
}

impl Config {
    /// Load from a TOML (`.toml`) or JSON file; a missing file yields the
    /// defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config: Config = if path.extension().map_or(false, |ext| ext == "toml") {
            toml::from_str(&content)?
        } else {
            serde_json::from_str(&content)?
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.cache_capacity == 0 {
            return Err(LumaError::InvalidConfig("cache_capacity must be at least 1".into()));
        }
        if self.btree_degree < MIN_DEGREE {
            return Err(LumaError::InvalidConfig(format!(
                "btree_degree must be at least {}",
                MIN_DEGREE
            )));
        }
        Ok(())
    }

    /// Snapshot file for database `name`
    pub fn snapshot_path(&self, name: &str) -> PathBuf {
        self.data_dir.join(format!("{}.{}", name, SNAPSHOT_EXTENSION))
    }

    pub fn table_options(&self) -> TableOptions {
        TableOptions {
            cache_capacity: self.cache_capacity,
            btree_degree: self.btree_degree,
        }
    }
}
