//! Relational schema for the forms-and-privileges store.
//!
//! Seven entity tables and four pure join tables. Identifying columns carry a
//! `UNIQUE` constraint so the store itself rejects duplicates that slip past the
//! guard; every reference cascades on delete.

use crate::core::registry::{RelationKind, registry};

pub const STORE_DB_NAME: &str = "formwarden.db";
pub const AUDIT_LOG_NAME: &str = "broker.events.jsonl";

pub const SCOPES_SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS scopes (
        id TEXT PRIMARY KEY,
        created_at TEXT NOT NULL,
        slug TEXT NOT NULL UNIQUE,
        name TEXT,
        description TEXT
    )
";

pub const PRIVILEGES_SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS privileges (
        id TEXT PRIMARY KEY,
        created_at TEXT NOT NULL,
        slug TEXT NOT NULL UNIQUE,
        name TEXT,
        description TEXT,
        type TEXT,
        scope_id TEXT NOT NULL,
        FOREIGN KEY(scope_id) REFERENCES scopes(id) ON DELETE CASCADE
    )
";

pub const GROUPS_SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS groups (
        id TEXT PRIMARY KEY,
        created_at TEXT NOT NULL,
        slug TEXT NOT NULL UNIQUE,
        name TEXT,
        description TEXT
    )
";

pub const USERS_SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS users (
        id TEXT PRIMARY KEY,
        created_at TEXT NOT NULL,
        email TEXT NOT NULL UNIQUE,
        name TEXT NOT NULL,
        hashed_password TEXT NOT NULL
    )
";

pub const FIELDS_SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS fields (
        id TEXT PRIMARY KEY,
        created_at TEXT NOT NULL,
        slug TEXT NOT NULL UNIQUE,
        name TEXT,
        description TEXT
    )
";

pub const FORMS_SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS forms (
        id TEXT PRIMARY KEY,
        created_at TEXT NOT NULL,
        slug TEXT NOT NULL UNIQUE,
        name TEXT,
        description TEXT
    )
";

pub const RESPONSES_SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS responses (
        id TEXT PRIMARY KEY,
        created_at TEXT NOT NULL,
        slug TEXT NOT NULL UNIQUE,
        name TEXT,
        description TEXT,
        data TEXT, -- JSON object
        field_id TEXT NOT NULL,
        user_id TEXT NOT NULL,
        FOREIGN KEY(field_id) REFERENCES fields(id) ON DELETE CASCADE,
        FOREIGN KEY(user_id) REFERENCES users(id) ON DELETE CASCADE
    )
";

pub const USERS_GROUPS_SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS users_groups (
        user_id TEXT NOT NULL,
        group_id TEXT NOT NULL,
        PRIMARY KEY(user_id, group_id),
        FOREIGN KEY(user_id) REFERENCES users(id) ON DELETE CASCADE,
        FOREIGN KEY(group_id) REFERENCES groups(id) ON DELETE CASCADE
    )
";

pub const USERS_PRIVILEGES_SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS users_privileges (
        user_id TEXT NOT NULL,
        privilege_id TEXT NOT NULL,
        PRIMARY KEY(user_id, privilege_id),
        FOREIGN KEY(user_id) REFERENCES users(id) ON DELETE CASCADE,
        FOREIGN KEY(privilege_id) REFERENCES privileges(id) ON DELETE CASCADE
    )
";

pub const GROUPS_PRIVILEGES_SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS groups_privileges (
        group_id TEXT NOT NULL,
        privilege_id TEXT NOT NULL,
        PRIMARY KEY(group_id, privilege_id),
        FOREIGN KEY(group_id) REFERENCES groups(id) ON DELETE CASCADE,
        FOREIGN KEY(privilege_id) REFERENCES privileges(id) ON DELETE CASCADE
    )
";

pub const FORMS_FIELDS_SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS forms_fields (
        form_id TEXT NOT NULL,
        field_id TEXT NOT NULL,
        PRIMARY KEY(form_id, field_id),
        FOREIGN KEY(form_id) REFERENCES forms(id) ON DELETE CASCADE,
        FOREIGN KEY(field_id) REFERENCES fields(id) ON DELETE CASCADE
    )
";

// Reverse-side lookups for join tables; the composite primary key already
// covers the leading column.
pub const JOIN_INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_users_groups_group ON users_groups(group_id)",
    "CREATE INDEX IF NOT EXISTS idx_users_privileges_privilege ON users_privileges(privilege_id)",
    "CREATE INDEX IF NOT EXISTS idx_groups_privileges_privilege ON groups_privileges(privilege_id)",
    "CREATE INDEX IF NOT EXISTS idx_forms_fields_field ON forms_fields(field_id)",
    "CREATE INDEX IF NOT EXISTS idx_privileges_scope ON privileges(scope_id)",
    "CREATE INDEX IF NOT EXISTS idx_responses_field ON responses(field_id)",
    "CREATE INDEX IF NOT EXISTS idx_responses_user ON responses(user_id)",
];

/// Table DDL in dependency order (referenced tables first).
pub const TABLES: &[(&str, &str)] = &[
    ("scopes", SCOPES_SCHEMA),
    ("privileges", PRIVILEGES_SCHEMA),
    ("groups", GROUPS_SCHEMA),
    ("users", USERS_SCHEMA),
    ("fields", FIELDS_SCHEMA),
    ("forms", FORMS_SCHEMA),
    ("responses", RESPONSES_SCHEMA),
    ("users_groups", USERS_GROUPS_SCHEMA),
    ("users_privileges", USERS_PRIVILEGES_SCHEMA),
    ("groups_privileges", GROUPS_PRIVILEGES_SCHEMA),
    ("forms_fields", FORMS_FIELDS_SCHEMA),
];

pub fn schema() -> serde_json::Value {
    let entities: Vec<_> = registry()
        .descriptors()
        .map(|desc| {
            let relations: Vec<_> = desc
                .relations
                .iter()
                .map(|rel| {
                    let (kind, via) = match rel.kind {
                        RelationKind::BelongsTo { column } => ("belongs_to", column),
                        RelationKind::HasMany { foreign_column } => ("has_many", foreign_column),
                        RelationKind::ManyToMany { through, .. } => ("many_to_many", through),
                    };
                    serde_json::json!({
                        "name": rel.name,
                        "target": rel.target,
                        "kind": kind,
                        "via": via,
                    })
                })
                .collect();
            serde_json::json!({
                "entity": desc.name(),
                "table": desc.table,
                "identity": desc.identity_column,
                "relations": relations,
            })
        })
        .collect();

    serde_json::json!({
        "name": "formwarden",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Scoped privileges, groups, users, forms, fields and responses",
        "tables": TABLES.iter().map(|(name, _)| *name).collect::<Vec<_>>(),
        "entities": entities,
        "storage": [STORE_DB_NAME, AUDIT_LOG_NAME]
    })
}
