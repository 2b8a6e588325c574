//! Lifecycle hooks run immediately before an entity is written.
//!
//! One implementation serves every entity; the per-entity differences live
//! behind `Entity::validate` and `Entity::prepare_credentials`. Hooks run on the
//! caller's connection, inside the write transaction, so a failing hook leaves
//! nothing behind.

use crate::core::error::WardenError;
use crate::core::guard;
use crate::core::time;
use crate::entities::Entity;
use rusqlite::Connection;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOp {
    Insert,
    Update,
}

/// Validate, stamp `created_at`, check identity uniqueness (no self-exclusion),
/// then hash any supplied credential.
pub fn before_insert<E: Entity>(conn: &Connection, entity: &mut E) -> Result<(), WardenError> {
    entity.validate(WriteOp::Insert)?;
    entity.set_created_at(time::now_epoch_z());
    guard::ensure_unique(conn, E::descriptor(), entity.identity(), None)?;
    entity.prepare_credentials()
}

/// Validate, check identity uniqueness excluding the row itself, then hash any
/// freshly supplied credential. `created_at` is left alone.
pub fn before_update<E: Entity>(conn: &Connection, entity: &mut E) -> Result<(), WardenError> {
    let Some(id) = entity.id().map(str::to_string) else {
        return Err(WardenError::Validation(format!(
            "{} update requires an id",
            E::descriptor().name()
        )));
    };
    entity.validate(WriteOp::Update)?;
    guard::ensure_unique(conn, E::descriptor(), entity.identity(), Some(&id))?;
    entity.prepare_credentials()
}
