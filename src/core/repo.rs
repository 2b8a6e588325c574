//! Generic create/read/update/delete over any `Entity`.
//!
//! Writes run the lifecycle hook and the physical statement inside one
//! brokered IMMEDIATE transaction: either both land or neither does.

use crate::core::broker::DbBroker;
use crate::core::error::WardenError;
use crate::core::graph;
use crate::core::hooks;
use crate::core::registry::{EntityDescriptor, EntityKind};
use crate::core::store::Store;
use crate::core::time;
use crate::entities::{Entity, Record};
use rusqlite::{Connection, OptionalExtension};
use serde::Serialize;
use std::collections::BTreeMap;

/// Rows removed by a delete, beyond the target row itself.
#[derive(Debug, Clone, Serialize)]
pub struct DeleteReport {
    pub kind: EntityKind,
    pub id: String,
    /// Dependent rows removed by cascade, keyed by table.
    pub cascaded: BTreeMap<String, u64>,
}

impl DeleteReport {
    pub fn cascaded_from(&self, table: &str) -> u64 {
        self.cascaded.get(table).copied().unwrap_or(0)
    }
}

/// Insert `entity` under a freshly generated id; any id it carries is replaced.
pub fn create<E: Entity>(store: &Store, mut entity: E) -> Result<E, WardenError> {
    let desc = E::descriptor();
    let identity = entity.identity().to_string();
    let broker = DbBroker::new(store);

    broker
        .with_tx(&format!("{}.create", desc.name()), |conn| {
            hooks::before_insert(conn, &mut entity)?;
            entity.set_id(time::new_entity_id());
            entity.insert_row(conn)?;
            Ok(entity)
        })
        .map_err(|e| e.with_identity_value(desc.identity_column, &identity))
}

/// Write every mutable column of `entity`, identified by its id. Returns the
/// row as stored.
pub fn update<E: Entity>(store: &Store, mut entity: E) -> Result<E, WardenError> {
    let desc = E::descriptor();
    let identity = entity.identity().to_string();
    let broker = DbBroker::new(store);

    broker
        .with_tx(&format!("{}.update", desc.name()), |conn| {
            let id = entity
                .id()
                .map(str::to_string)
                .ok_or_else(|| {
                    WardenError::Validation(format!("{} update requires an id", desc.name()))
                })?;
            let existing: E = find_in(conn, &id)?.ok_or_else(|| not_found(desc, &id))?;
            if let Some(created_at) = existing.created_at() {
                entity.set_created_at(created_at.to_string());
            }

            hooks::before_update(conn, &mut entity)?;
            entity.update_row(conn)?;

            find_in(conn, &id)?.ok_or_else(|| not_found(desc, &id))
        })
        .map_err(|e| e.with_identity_value(desc.identity_column, &identity))
}

pub fn get<E: Entity>(store: &Store, id: &str) -> Result<E, WardenError> {
    let desc = E::descriptor();
    DbBroker::new(store).with_conn(&format!("{}.get", desc.name()), |conn| {
        find_in(conn, id)?.ok_or_else(|| not_found(desc, id))
    })
}

/// Look an entity up by its identifying value (slug, or email for users).
pub fn find_by_identity<E: Entity>(store: &Store, value: &str) -> Result<Option<E>, WardenError> {
    let desc = E::descriptor();
    DbBroker::new(store).with_conn(&format!("{}.find", desc.name()), |conn| {
        let sql = format!(
            "SELECT * FROM {} WHERE {} = ?1",
            desc.table, desc.identity_column
        );
        Ok(conn.query_row(&sql, [value], |row| E::from_row(row)).optional()?)
    })
}

pub fn list<E: Entity>(store: &Store) -> Result<Vec<E>, WardenError> {
    let desc = E::descriptor();
    DbBroker::new(store).with_conn(&format!("{}.list", desc.name()), |conn| {
        let sql = format!(
            "SELECT * FROM {} ORDER BY {}",
            desc.table, desc.identity_column
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map([], |row| E::from_row(row))?;
        let mut results = Vec::new();
        for r in rows {
            results.push(r?);
        }
        Ok(results)
    })
}

/// Physically delete a row. The store cascades to dependents; the report
/// counts what the cascade removed.
pub fn delete(store: &Store, kind: EntityKind, id: &str) -> Result<DeleteReport, WardenError> {
    let desc = kind.descriptor()?;
    DbBroker::new(store).with_tx(&format!("{}.delete", desc.name()), |conn| {
        if find_record_in(conn, desc, id)?.is_none() {
            return Err(not_found(desc, id));
        }
        let mut cascaded = BTreeMap::new();
        graph::count_dependents(conn, desc, id, &mut cascaded)?;

        conn.execute(&format!("DELETE FROM {} WHERE id = ?1", desc.table), [id])?;
        Ok(DeleteReport {
            kind,
            id: id.to_string(),
            cascaded,
        })
    })
}

pub fn create_record(store: &Store, record: Record) -> Result<Record, WardenError> {
    Ok(match record {
        Record::Scope(e) => create(store, e)?.into_record(),
        Record::Privilege(e) => create(store, e)?.into_record(),
        Record::Group(e) => create(store, e)?.into_record(),
        Record::User(e) => create(store, e)?.into_record(),
        Record::Field(e) => create(store, e)?.into_record(),
        Record::Form(e) => create(store, e)?.into_record(),
        Record::Response(e) => create(store, e)?.into_record(),
    })
}

pub fn update_record(store: &Store, record: Record) -> Result<Record, WardenError> {
    Ok(match record {
        Record::Scope(e) => update(store, e)?.into_record(),
        Record::Privilege(e) => update(store, e)?.into_record(),
        Record::Group(e) => update(store, e)?.into_record(),
        Record::User(e) => update(store, e)?.into_record(),
        Record::Field(e) => update(store, e)?.into_record(),
        Record::Form(e) => update(store, e)?.into_record(),
        Record::Response(e) => update(store, e)?.into_record(),
    })
}

pub fn get_record(store: &Store, kind: EntityKind, id: &str) -> Result<Record, WardenError> {
    let desc = kind.descriptor()?;
    DbBroker::new(store).with_conn(&format!("{}.get", desc.name()), |conn| {
        find_record_in(conn, desc, id)?.ok_or_else(|| not_found(desc, id))
    })
}

pub fn list_records(store: &Store, kind: EntityKind) -> Result<Vec<Record>, WardenError> {
    Ok(match kind {
        EntityKind::Scope => into_records(list::<crate::entities::Scope>(store)?),
        EntityKind::Privilege => into_records(list::<crate::entities::Privilege>(store)?),
        EntityKind::Group => into_records(list::<crate::entities::Group>(store)?),
        EntityKind::User => into_records(list::<crate::entities::User>(store)?),
        EntityKind::Field => into_records(list::<crate::entities::Field>(store)?),
        EntityKind::Form => into_records(list::<crate::entities::Form>(store)?),
        EntityKind::Response => into_records(list::<crate::entities::Response>(store)?),
    })
}

fn into_records<E: Entity>(entities: Vec<E>) -> Vec<Record> {
    entities.into_iter().map(Entity::into_record).collect()
}

pub(crate) fn find_in<E: Entity>(conn: &Connection, id: &str) -> Result<Option<E>, WardenError> {
    let sql = format!("SELECT * FROM {} WHERE id = ?1", E::descriptor().table);
    Ok(conn.query_row(&sql, [id], |row| E::from_row(row)).optional()?)
}

pub(crate) fn find_record_in(
    conn: &Connection,
    desc: &EntityDescriptor,
    id: &str,
) -> Result<Option<Record>, WardenError> {
    let sql = format!("SELECT * FROM {} WHERE id = ?1", desc.table);
    Ok(conn
        .query_row(&sql, [id], |row| Record::from_row(desc.kind, row))
        .optional()?)
}

fn not_found(desc: &EntityDescriptor, id: &str) -> WardenError {
    WardenError::NotFound(format!("{} '{}'", desc.name(), id))
}
