//! Privilege resolution for users.
//!
//! A user holds a privilege when it is granted directly or through any group
//! the user belongs to.

use crate::core::broker::DbBroker;
use crate::core::error::WardenError;
use crate::core::repo;
use crate::core::store::Store;
use crate::entities::{Entity, Privilege, User};
use rusqlite::Connection;

const EFFECTIVE_PRIVILEGES_SQL: &str = "
    SELECT p.* FROM privileges p
    WHERE p.id IN (
        SELECT up.privilege_id FROM users_privileges up WHERE up.user_id = ?1
        UNION
        SELECT gp.privilege_id FROM groups_privileges gp
        JOIN users_groups ug ON ug.group_id = gp.group_id
        WHERE ug.user_id = ?1
    )
    ORDER BY p.slug
";

fn effective_in(conn: &Connection, user_id: &str) -> Result<Vec<Privilege>, WardenError> {
    if repo::find_in::<User>(conn, user_id)?.is_none() {
        return Err(WardenError::NotFound(format!("user '{}'", user_id)));
    }
    let mut stmt = conn.prepare(EFFECTIVE_PRIVILEGES_SQL)?;
    let rows = stmt.query_map([user_id], |row| Privilege::from_row(row))?;
    let mut results = Vec::new();
    for r in rows {
        results.push(r?);
    }
    Ok(results)
}

/// Direct and group-inherited privileges of a user, distinct, ordered by slug.
pub fn effective_privileges(store: &Store, user_id: &str) -> Result<Vec<Privilege>, WardenError> {
    DbBroker::new(store).with_snapshot("access.effective_privileges", |conn| {
        effective_in(conn, user_id)
    })
}

pub fn has_privilege(
    store: &Store,
    user_id: &str,
    privilege_slug: &str,
) -> Result<bool, WardenError> {
    DbBroker::new(store).with_snapshot("access.has_privilege", |conn| {
        Ok(effective_in(conn, user_id)?
            .iter()
            .any(|p| p.slug == privilege_slug))
    })
}
