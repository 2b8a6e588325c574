//! `formwarden.toml` loading.
//!
//! Every key is optional. A missing file yields the defaults; `FORMWARDEN_DATA_DIR`
//! overrides `store.data_dir` whichever way the file was found.

use crate::core::error::WardenError;
use crate::core::schemas;
use crate::core::store::Store;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE_NAME: &str = "formwarden.toml";
pub const DATA_DIR_ENV: &str = "FORMWARDEN_DATA_DIR";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub store: StoreConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub data_dir: PathBuf,
    pub db_name: String,
    pub actor: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(".formwarden").join("data"),
            db_name: schemas::STORE_DB_NAME.to_string(),
            actor: "formwarden".to_string(),
        }
    }
}

impl Config {
    pub fn parse(content: &str) -> Result<Self, WardenError> {
        toml::from_str(content).map_err(|e| WardenError::Config(e.to_string()))
    }

    /// Apply an explicit data directory override (empty values are ignored).
    pub fn with_data_dir_override(mut self, data_dir: Option<String>) -> Self {
        if let Some(dir) = data_dir.filter(|d| !d.trim().is_empty()) {
            self.store.data_dir = PathBuf::from(dir);
        }
        self
    }

    pub fn to_store(&self) -> Store {
        let mut store = Store::new(&self.store.data_dir).with_actor(&self.store.actor);
        store.db_name = self.store.db_name.clone();
        store
    }
}

/// Load configuration from `path`, or from `formwarden.toml` in the working
/// directory when no path is given. An explicitly named file must exist.
pub fn load_config(path: Option<&Path>) -> Result<Config, WardenError> {
    let config = match path {
        Some(p) => {
            let content = fs::read_to_string(p).map_err(|e| {
                WardenError::Config(format!("cannot read {}: {}", p.display(), e))
            })?;
            Config::parse(&content)?
        }
        None => {
            let default_path = Path::new(CONFIG_FILE_NAME);
            if default_path.exists() {
                Config::parse(&fs::read_to_string(default_path)?)?
            } else {
                Config::default()
            }
        }
    };
    Ok(config.with_data_dir_override(std::env::var(DATA_DIR_ENV).ok()))
}
