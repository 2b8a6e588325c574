//! Identity uniqueness guard shared by every entity.
//!
//! The guard is a read-only pre-check that produces a legible error before the
//! write is attempted. The `UNIQUE` constraint on the identifying column stays
//! the enforcement of last resort.

use crate::core::error::WardenError;
use crate::core::registry::EntityDescriptor;
use rusqlite::{Connection, OptionalExtension, params};

/// Id of another row already holding `value` in the descriptor's identity
/// column. `self_id` excludes the row being updated so a no-op update passes.
pub fn conflicting_row(
    conn: &Connection,
    desc: &EntityDescriptor,
    value: &str,
    self_id: Option<&str>,
) -> Result<Option<String>, WardenError> {
    let sql = format!(
        "SELECT id FROM {} WHERE {} = ?1 AND (?2 IS NULL OR id <> ?2) LIMIT 1",
        desc.table, desc.identity_column
    );
    let existing: Option<String> = conn
        .query_row(&sql, params![value, self_id], |row| row.get(0))
        .optional()?;
    Ok(existing)
}

/// Fail with `UniquenessViolation` if another row already holds `value`.
pub fn ensure_unique(
    conn: &Connection,
    desc: &EntityDescriptor,
    value: &str,
    self_id: Option<&str>,
) -> Result<(), WardenError> {
    if value.trim().is_empty() {
        return Err(WardenError::Validation(format!(
            "{}.{} must not be empty",
            desc.name(),
            desc.identity_column
        )));
    }
    if conflicting_row(conn, desc, value, self_id)?.is_some() {
        return Err(WardenError::UniquenessViolation {
            field: desc.identity_column.to_string(),
            value: value.to_string(),
        });
    }
    Ok(())
}
