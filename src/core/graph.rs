//! Traversal of the declared relationship graph.
//!
//! Queries are generated from `RelationKind` declarations; the target of a
//! relation is only resolved (by name, through the registry) when the relation
//! is walked.

use crate::core::broker::DbBroker;
use crate::core::error::WardenError;
use crate::core::registry::{EntityDescriptor, EntityKind, Relation, RelationKind};
use crate::core::repo;
use crate::core::store::Store;
use crate::entities::Record;
use rusqlite::Connection;
use serde::Serialize;
use std::collections::BTreeMap;

/// An entity together with the relations requested alongside it.
#[derive(Debug, Clone, Serialize)]
pub struct Loaded {
    pub record: Record,
    pub related: BTreeMap<String, Vec<Record>>,
}

impl Loaded {
    /// Summary of the entity with each relation's members summarized under
    /// the relation name.
    pub fn summary(&self) -> serde_json::Value {
        let mut out = self.record.summary();
        if let Some(obj) = out.as_object_mut() {
            for (name, records) in &self.related {
                obj.insert(
                    name.clone(),
                    serde_json::Value::Array(records.iter().map(Record::summary).collect()),
                );
            }
        }
        out
    }
}

fn related_sql(owner: &EntityDescriptor, rel: &Relation, target: &EntityDescriptor) -> String {
    match rel.kind {
        RelationKind::BelongsTo { column } => format!(
            "SELECT t.* FROM {target} t JOIN {owner} o ON o.{column} = t.id
             WHERE o.id = ?1 ORDER BY t.{ident}",
            target = target.table,
            owner = owner.table,
            column = column,
            ident = target.identity_column
        ),
        RelationKind::HasMany { foreign_column } => format!(
            "SELECT t.* FROM {target} t WHERE t.{fk} = ?1 ORDER BY t.{ident}",
            target = target.table,
            fk = foreign_column,
            ident = target.identity_column
        ),
        RelationKind::ManyToMany {
            through,
            owner_column,
            target_column,
        } => format!(
            "SELECT t.* FROM {target} t JOIN {through} j ON j.{tcol} = t.id
             WHERE j.{ocol} = ?1 ORDER BY t.{ident}",
            target = target.table,
            through = through,
            tcol = target_column,
            ocol = owner_column,
            ident = target.identity_column
        ),
    }
}

pub(crate) fn related_in(
    conn: &Connection,
    owner: &EntityDescriptor,
    id: &str,
    relation: &str,
) -> Result<Vec<Record>, WardenError> {
    let rel = owner.relation(relation)?;
    let target = rel.resolve_target()?;
    let mut stmt = conn.prepare(&related_sql(owner, rel, target))?;
    let rows = stmt.query_map([id], |row| Record::from_row(target.kind, row))?;
    let mut results = Vec::new();
    for r in rows {
        results.push(r?);
    }
    Ok(results)
}

/// Entities reachable from `kind`/`id` through one named relation.
pub fn related(
    store: &Store,
    kind: EntityKind,
    id: &str,
    relation: &str,
) -> Result<Vec<Record>, WardenError> {
    let owner = kind.descriptor()?;
    DbBroker::new(store).with_conn(&format!("{}.related.{}", owner.name(), relation), |conn| {
        ensure_exists(conn, owner, id)?;
        related_in(conn, owner, id, relation)
    })
}

/// Load an entity and several of its relations in one read transaction.
pub fn fetch_with(
    store: &Store,
    kind: EntityKind,
    id: &str,
    relations: &[&str],
) -> Result<Loaded, WardenError> {
    let owner = kind.descriptor()?;
    DbBroker::new(store).with_snapshot(&format!("{}.fetch", owner.name()), |conn| {
        let record = repo::find_record_in(conn, owner, id)?
            .ok_or_else(|| WardenError::NotFound(format!("{} '{}'", owner.name(), id)))?;
        let mut related = BTreeMap::new();
        for name in relations {
            related.insert(name.to_string(), related_in(conn, owner, id, name)?);
        }
        Ok(Loaded { record, related })
    })
}

fn join_of(rel: &Relation) -> Result<(&'static str, &'static str, &'static str), WardenError> {
    match rel.kind {
        RelationKind::ManyToMany {
            through,
            owner_column,
            target_column,
        } => Ok((through, owner_column, target_column)),
        _ => Err(WardenError::Validation(format!(
            "relation '{}' is not many-to-many; set the reference column instead",
            rel.name
        ))),
    }
}

/// Record a many-to-many pair. Returns `false` if the pair already existed.
/// A missing row on either side is a `ReferentialIntegrityViolation`.
pub fn link(
    store: &Store,
    kind: EntityKind,
    id: &str,
    relation: &str,
    target_id: &str,
) -> Result<bool, WardenError> {
    let owner = kind.descriptor()?;
    let (through, owner_column, target_column) = join_of(owner.relation(relation)?)?;
    DbBroker::new(store).with_tx(&format!("{}.link.{}", owner.name(), relation), |conn| {
        let sql = format!(
            "INSERT OR IGNORE INTO {through}({owner_column}, {target_column}) VALUES(?1, ?2)"
        );
        let inserted = conn.execute(&sql, [id, target_id])?;
        Ok(inserted == 1)
    })
}

/// Remove a many-to-many pair. Returns `false` if there was none.
pub fn unlink(
    store: &Store,
    kind: EntityKind,
    id: &str,
    relation: &str,
    target_id: &str,
) -> Result<bool, WardenError> {
    let owner = kind.descriptor()?;
    let (through, owner_column, target_column) = join_of(owner.relation(relation)?)?;
    DbBroker::new(store).with_tx(&format!("{}.unlink.{}", owner.name(), relation), |conn| {
        let sql = format!("DELETE FROM {through} WHERE {owner_column} = ?1 AND {target_column} = ?2");
        let removed = conn.execute(&sql, [id, target_id])?;
        Ok(removed > 0)
    })
}

/// Tables a delete of `kind` reaches through cascades, in traversal order.
///
/// Has-many targets are deleted with their owner and cascade further; join
/// tables lose the owner's pairs. Belongs-to edges never cascade upward.
pub fn cascade_scope(kind: EntityKind) -> Result<Vec<&'static str>, WardenError> {
    let mut tables = Vec::new();
    collect_scope(kind.descriptor()?, &mut tables)?;
    Ok(tables)
}

fn collect_scope(
    desc: &EntityDescriptor,
    tables: &mut Vec<&'static str>,
) -> Result<(), WardenError> {
    for rel in desc.relations {
        match rel.kind {
            RelationKind::BelongsTo { .. } => {}
            RelationKind::HasMany { .. } => {
                let target = rel.resolve_target()?;
                if !tables.contains(&target.table) {
                    tables.push(target.table);
                    collect_scope(target, tables)?;
                }
            }
            RelationKind::ManyToMany { through, .. } => {
                if !tables.contains(&through) {
                    tables.push(through);
                }
            }
        }
    }
    Ok(())
}

/// Count, per table, the rows a delete of `id` will cascade to.
pub(crate) fn count_dependents(
    conn: &Connection,
    desc: &EntityDescriptor,
    id: &str,
    counts: &mut BTreeMap<String, u64>,
) -> Result<(), WardenError> {
    for rel in desc.relations {
        match rel.kind {
            RelationKind::BelongsTo { .. } => {}
            RelationKind::HasMany { foreign_column } => {
                let target = rel.resolve_target()?;
                let sql = format!("SELECT id FROM {} WHERE {} = ?1", target.table, foreign_column);
                let mut stmt = conn.prepare(&sql)?;
                let child_ids = stmt
                    .query_map([id], |row| row.get::<_, String>(0))?
                    .collect::<Result<Vec<_>, _>>()?;
                *counts.entry(target.table.to_string()).or_insert(0) += child_ids.len() as u64;
                for child in &child_ids {
                    count_dependents(conn, target, child, counts)?;
                }
            }
            RelationKind::ManyToMany {
                through,
                owner_column,
                ..
            } => {
                let sql = format!("SELECT COUNT(*) FROM {} WHERE {} = ?1", through, owner_column);
                let n: i64 = conn.query_row(&sql, [id], |row| row.get(0))?;
                *counts.entry(through.to_string()).or_insert(0) += n as u64;
            }
        }
    }
    Ok(())
}

fn ensure_exists(conn: &Connection, desc: &EntityDescriptor, id: &str) -> Result<(), WardenError> {
    if repo::find_record_in(conn, desc, id)?.is_none() {
        return Err(WardenError::NotFound(format!("{} '{}'", desc.name(), id)));
    }
    Ok(())
}
