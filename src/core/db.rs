use crate::core::broker::DbBroker;
use crate::core::error::{self, WardenError};
use crate::core::schemas;
use crate::core::store::Store;
use rusqlite::Connection;
use std::fs;
use std::time::Duration;

/// Busy timeout applied to every connection.
const BUSY_TIMEOUT_SECS: u64 = 5;

pub fn db_connect(db_path: &str) -> Result<Connection, WardenError> {
    let conn = Connection::open(db_path).map_err(error::classify_sqlite)?;
    conn.busy_timeout(Duration::from_secs(BUSY_TIMEOUT_SECS))
        .map_err(error::classify_sqlite)?;
    conn.query_row("PRAGMA journal_mode=WAL;", [], |_| Ok(()))
        .map_err(error::classify_sqlite)?;
    // Cascades and reference checks depend on this; SQLite leaves it off per connection.
    conn.execute("PRAGMA foreign_keys=ON;", [])
        .map_err(error::classify_sqlite)?;
    Ok(conn)
}

/// Create the store directory, tables and indexes. Safe to run repeatedly.
pub fn initialize_store_db(store: &Store) -> Result<(), WardenError> {
    fs::create_dir_all(&store.root)?;

    let broker = DbBroker::new(store);
    broker.with_tx("store.init", |conn| {
        for (_, ddl) in schemas::TABLES {
            conn.execute(ddl, [])?;
        }
        for ddl in schemas::JOIN_INDEXES {
            conn.execute(ddl, [])?;
        }
        Ok(())
    })
}

pub fn table_exists(conn: &Connection, table: &str) -> Result<bool, WardenError> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
        [table],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}
