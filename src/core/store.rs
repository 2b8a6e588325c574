//! Store handle threaded through every core operation.
//!
//! A `Store` names where the relational store lives; it carries no connection.
//! Each operation opens its own connection through the broker, so two handles
//! pointing at different roots are fully isolated (tests rely on this).

use crate::core::schemas;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct Store {
    /// Directory holding the database file and the broker audit log.
    pub root: PathBuf,
    /// Database file name inside `root`.
    pub db_name: String,
    /// Actor recorded in audit events for operations through this handle.
    pub actor: String,
}

impl Store {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            db_name: schemas::STORE_DB_NAME.to_string(),
            actor: "formwarden".to_string(),
        }
    }

    pub fn with_actor(mut self, actor: &str) -> Self {
        self.actor = actor.to_string();
        self
    }

    pub fn db_path(&self) -> PathBuf {
        self.root.join(&self.db_name)
    }

    pub fn audit_log_path(&self) -> PathBuf {
        audit_log_path(&self.root)
    }
}

pub fn audit_log_path(root: &Path) -> PathBuf {
    root.join(schemas::AUDIT_LOG_NAME)
}
