use crate::core::db;
use crate::core::error::{self, WardenError};
use crate::core::store::Store;
use crate::core::time;
use rusqlite::{Connection, TransactionBehavior};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

/// The DB Broker is the single path for store access.
///
/// Every operation gets a fresh connection, and every operation (success or
/// failure) is appended to the audit log as one JSON line.
pub struct DbBroker {
    db_path: PathBuf,
    audit_log_path: PathBuf,
    actor: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct BrokerEvent {
    pub ts: String,
    pub event_id: String,
    pub actor: String,
    pub op: String,
    pub db_id: String,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl DbBroker {
    pub fn new(store: &Store) -> Self {
        Self {
            db_path: store.db_path(),
            audit_log_path: store.audit_log_path(),
            actor: store.actor.clone(),
        }
    }

    /// Execute a closure with a plain connection (reads, or single statements).
    pub fn with_conn<F, R>(&self, op_name: &str, f: F) -> Result<R, WardenError>
    where
        F: FnOnce(&Connection) -> Result<R, WardenError>,
    {
        let result = db::db_connect(&self.db_path.to_string_lossy())
            .and_then(|conn| f(&conn))
            .map_err(reclassify);
        self.record(op_name, &result)?;
        result
    }

    /// Execute a closure inside an IMMEDIATE transaction.
    ///
    /// The write lock is taken up front so a read inside the closure and the
    /// write that follows it see one snapshot. The transaction commits only if
    /// the closure returns `Ok`; otherwise it is rolled back on drop.
    pub fn with_tx<F, R>(&self, op_name: &str, f: F) -> Result<R, WardenError>
    where
        F: FnOnce(&Connection) -> Result<R, WardenError>,
    {
        self.run_tx(op_name, TransactionBehavior::Immediate, f)
    }

    /// Execute a closure inside a DEFERRED transaction: several reads share
    /// one snapshot without blocking writers.
    pub fn with_snapshot<F, R>(&self, op_name: &str, f: F) -> Result<R, WardenError>
    where
        F: FnOnce(&Connection) -> Result<R, WardenError>,
    {
        self.run_tx(op_name, TransactionBehavior::Deferred, f)
    }

    fn run_tx<F, R>(
        &self,
        op_name: &str,
        behavior: TransactionBehavior,
        f: F,
    ) -> Result<R, WardenError>
    where
        F: FnOnce(&Connection) -> Result<R, WardenError>,
    {
        let result = db::db_connect(&self.db_path.to_string_lossy())
            .and_then(|mut conn| {
                let tx = conn
                    .transaction_with_behavior(behavior)
                    .map_err(error::classify_sqlite)?;
                let value = f(&tx)?;
                tx.commit().map_err(error::classify_sqlite)?;
                Ok(value)
            })
            .map_err(reclassify);
        self.record(op_name, &result)?;
        result
    }

    fn record<R>(&self, op: &str, result: &Result<R, WardenError>) -> Result<(), WardenError> {
        let (status, detail) = match result {
            Ok(_) => ("success", None),
            Err(e) => ("error", Some(e.to_string())),
        };
        let db_id = self
            .db_path
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string();

        let ev = BrokerEvent {
            ts: time::now_epoch_z(),
            event_id: time::new_event_id(),
            actor: self.actor.clone(),
            op: op.to_string(),
            db_id,
            status: status.to_string(),
            detail,
        };

        if let Some(parent) = self.audit_log_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut f = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.audit_log_path)?;
        writeln!(f, "{}", serde_json::to_string(&ev)?)?;
        Ok(())
    }
}

fn reclassify(err: WardenError) -> WardenError {
    match err {
        WardenError::Rusqlite(e) => error::classify_sqlite(e),
        other => other,
    }
}

/// Read back the audit log. A missing log is an empty history.
pub fn read_audit_log(store: &Store) -> Result<Vec<BrokerEvent>, WardenError> {
    let path = store.audit_log_path();
    if !path.exists() {
        return Ok(Vec::new());
    }
    let content = fs::read_to_string(&path)?;
    let mut events = Vec::new();
    for line in content.lines().filter(|l| !l.trim().is_empty()) {
        events.push(serde_json::from_str(line)?);
    }
    Ok(events)
}
