use crate::core::registry::{EntityDescriptor, EntityKind, Relation, RelationKind};
use crate::entities::{Entity, Record};
use rusqlite::{Connection, Row, params};
use serde::{Deserialize, Serialize};

pub static DESCRIPTOR: EntityDescriptor = EntityDescriptor {
    kind: EntityKind::Form,
    table: "forms",
    identity_column: "slug",
    relations: &[Relation {
        name: "fields",
        target: "field",
        kind: RelationKind::ManyToMany {
            through: "forms_fields",
            owner_column: "form_id",
            target_column: "field_id",
        },
    }],
};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Form {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    pub slug: String,
    pub name: String,
    pub description: String,
}

impl Form {
    pub fn new(slug: &str, name: &str, description: &str) -> Self {
        Self {
            id: None,
            created_at: None,
            slug: slug.to_string(),
            name: name.to_string(),
            description: description.to_string(),
        }
    }
}

impl Entity for Form {
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
            "INSERT INTO forms(id, created_at, slug, name, description)
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
            "UPDATE forms SET slug = ?2, name = ?3, description = ?4 WHERE id = ?1",
            params![self.id, self.slug, self.name, self.description],
        )
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Form {
            id: row.get("id")?,
            created_at: row.get("created_at")?,
            slug: row.get("slug")?,
            name: row.get::<_, Option<String>>("name")?.unwrap_or_default(),
            description: row
                .get::<_, Option<String>>("description")?
                .unwrap_or_default(),
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
        Record::Form(self)
    }
}
