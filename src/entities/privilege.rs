use crate::core::error::WardenError;
use crate::core::hooks::WriteOp;
use crate::core::registry::{EntityDescriptor, EntityKind, Relation, RelationKind};
use crate::entities::{Entity, Record, require_non_empty};
use rusqlite::{Connection, Row, params};
use serde::{Deserialize, Serialize};

pub static DESCRIPTOR: EntityDescriptor = EntityDescriptor {
    kind: EntityKind::Privilege,
    table: "privileges",
    identity_column: "slug",
    relations: &[
        Relation {
            name: "scope",
            target: "scope",
            kind: RelationKind::BelongsTo { column: "scope_id" },
        },
        Relation {
            name: "users",
            target: "user",
            kind: RelationKind::ManyToMany {
                through: "users_privileges",
                owner_column: "privilege_id",
                target_column: "user_id",
            },
        },
        Relation {
            name: "groups",
            target: "group",
            kind: RelationKind::ManyToMany {
                through: "groups_privileges",
                owner_column: "privilege_id",
                target_column: "group_id",
            },
        },
    ],
};

/// A named permission inside one scope, grantable to users and groups.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Privilege {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    pub slug: String,
    pub name: String,
    pub description: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub scope_id: String,
}

impl Privilege {
    pub fn new(slug: &str, name: &str, description: &str, kind: &str, scope_id: &str) -> Self {
        Self {
            id: None,
            created_at: None,
            slug: slug.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            kind: kind.to_string(),
            scope_id: scope_id.to_string(),
        }
    }
}

impl Entity for Privilege {
    fn descriptor() -> &'static EntityDescriptor {
        &DESCRIPTOR
    }

    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn set_id(&mut self, id: String) {
        self.id = Some(id);
    }

    fn created_at(&self) -> Option<&str> {
        self.created_at.as_deref()
    }

    fn set_created_at(&mut self, ts: String) {
        self.created_at = Some(ts);
    }

    fn identity(&self) -> &str {
        &self.slug
    }

    fn validate(&self, _op: WriteOp) -> Result<(), WardenError> {
        require_non_empty(&DESCRIPTOR, "scope_id", &self.scope_id)
    }

    fn insert_row(&self, conn: &Connection) -> rusqlite::Result<usize> {
        conn.execute(
            "INSERT INTO privileges(id, created_at, slug, name, description, type, scope_id)
             VALUES(?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                self.id,
                self.created_at,
                self.slug,
                self.name,
                self.description,
                self.kind,
                self.scope_id
            ],
        )
    }

    fn update_row(&self, conn: &Connection) -> rusqlite::Result<usize> {
        conn.execute(
            "UPDATE privileges
             SET slug = ?2, name = ?3, description = ?4, type = ?5, scope_id = ?6
             WHERE id = ?1",
            params![
                self.id,
                self.slug,
                self.name,
                self.description,
                self.kind,
                self.scope_id
            ],
        )
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Privilege {
            id: row.get("id")?,
            created_at: row.get("created_at")?,
            slug: row.get("slug")?,
            name: row.get::<_, Option<String>>("name")?.unwrap_or_default(),
            description: row
                .get::<_, Option<String>>("description")?
                .unwrap_or_default(),
            kind: row.get::<_, Option<String>>("type")?.unwrap_or_default(),
            scope_id: row.get("scope_id")?,
        })
    }

    fn summary(&self) -> serde_json::Value {
        serde_json::json!({
            "id": self.id,
            "slug": self.slug,
            "name": self.name,
            "description": self.description,
            "type": self.kind,
            "scope_id": self.scope_id,
        })
    }

    fn into_record(self) -> Record {
        Record::Privilege(self)
    }
}
