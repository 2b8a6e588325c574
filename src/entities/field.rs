use crate::core::registry::{EntityDescriptor, EntityKind, Relation, RelationKind};
use crate::entities::{Entity, Record};
use rusqlite::{Connection, Row, params};
use serde::{Deserialize, Serialize};

pub static DESCRIPTOR: EntityDescriptor = EntityDescriptor {
    kind: EntityKind::Field,
    table: "fields",
    identity_column: "slug",
    relations: &[
        Relation {
            name: "forms",
            target: "form",
            kind: RelationKind::ManyToMany {
                through: "forms_fields",
                owner_column: "field_id",
                target_column: "form_id",
            },
        },
        Relation {
            name: "responses",
            target: "response",
            kind: RelationKind::HasMany {
                foreign_column: "field_id",
            },
        },
    ],
};

/// Atomic question or input definition; shared between forms.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Field {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    pub slug: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl Field {
    pub fn new(slug: &str) -> Self {
        Self {
            slug: slug.to_string(),
            ..Self::default()
        }
    }

    pub fn named(mut self, name: &str, description: &str) -> Self {
        self.name = Some(name.to_string());
        self.description = Some(description.to_string());
        self
    }
}

impl Entity for Field {
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

    fn insert_row(&self, conn: &Connection) -> rusqlite::Result<usize> {
        conn.execute(
            "INSERT INTO fields(id, created_at, slug, name, description)
             VALUES(?1, ?2, ?3, ?4, ?5)",
            params![
                self.id,
                self.created_at,
                self.slug,
                self.name,
                self.description
            ],
        )
    }

    fn update_row(&self, conn: &Connection) -> rusqlite::Result<usize> {
        conn.execute(
            "UPDATE fields SET slug = ?2, name = ?3, description = ?4 WHERE id = ?1",
            params![self.id, self.slug, self.name, self.description],
        )
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Field {
            id: row.get("id")?,
            created_at: row.get("created_at")?,
            slug: row.get("slug")?,
            name: row.get("name")?,
            description: row.get("description")?,
        })
    }

    fn summary(&self) -> serde_json::Value {
        serde_json::json!({
            "slug": self.slug,
            "name": self.name,
            "description": self.description,
        })
    }

    fn into_record(self) -> Record {
        Record::Field(self)
    }
}
