use crate::core::error::WardenError;
use crate::core::hooks::WriteOp;
use crate::core::registry::{EntityDescriptor, EntityKind, Relation, RelationKind};
use crate::entities::{Entity, Record, require_non_empty};
use rusqlite::types::Type;
use rusqlite::{Connection, Row, params};
use serde::{Deserialize, Serialize};

pub static DESCRIPTOR: EntityDescriptor = EntityDescriptor {
    kind: EntityKind::Response,
    table: "responses",
    identity_column: "slug",
    relations: &[
        Relation {
            name: "field",
            target: "field",
            kind: RelationKind::BelongsTo { column: "field_id" },
        },
        Relation {
            name: "user",
            target: "user",
            kind: RelationKind::BelongsTo { column: "user_id" },
        },
    ],
};

/// One user's answer to one field. `data` is an opaque JSON object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Response {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    pub slug: String,
    pub name: String,
    pub description: String,
    pub data: serde_json::Value,
    pub field_id: String,
    pub user_id: String,
}

impl Response {
    pub fn new(
        slug: &str,
        name: &str,
        description: &str,
        data: serde_json::Value,
        field_id: &str,
        user_id: &str,
    ) -> Self {
        Self {
            id: None,
            created_at: None,
            slug: slug.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            data,
            field_id: field_id.to_string(),
            user_id: user_id.to_string(),
        }
    }
}

impl Entity for Response {
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
        if !self.data.is_object() {
            return Err(WardenError::Validation(
                "response.data must be a JSON object".to_string(),
            ));
        }
        require_non_empty(&DESCRIPTOR, "field_id", &self.field_id)?;
        require_non_empty(&DESCRIPTOR, "user_id", &self.user_id)
    }

    fn insert_row(&self, conn: &Connection) -> rusqlite::Result<usize> {
        conn.execute(
            "INSERT INTO responses(id, created_at, slug, name, description, data, field_id, user_id)
             VALUES(?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                self.id,
                self.created_at,
                self.slug,
                self.name,
                self.description,
                self.data.to_string(),
                self.field_id,
                self.user_id
            ],
        )
    }

    fn update_row(&self, conn: &Connection) -> rusqlite::Result<usize> {
        conn.execute(
            "UPDATE responses
             SET slug = ?2, name = ?3, description = ?4, data = ?5, field_id = ?6, user_id = ?7
             WHERE id = ?1",
            params![
                self.id,
                self.slug,
                self.name,
                self.description,
                self.data.to_string(),
                self.field_id,
                self.user_id
            ],
        )
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let raw: Option<String> = row.get("data")?;
        let data = match raw {
            Some(text) => serde_json::from_str(&text).map_err(|e| {
                let idx = row.as_ref().column_index("data").unwrap_or_default();
                rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e))
            })?,
            None => serde_json::Value::Object(Default::default()),
        };
        Ok(Response {
            id: row.get("id")?,
            created_at: row.get("created_at")?,
            slug: row.get("slug")?,
            name: row.get::<_, Option<String>>("name")?.unwrap_or_default(),
            description: row
                .get::<_, Option<String>>("description")?
                .unwrap_or_default(),
            data,
            field_id: row.get("field_id")?,
            user_id: row.get("user_id")?,
        })
    }

    fn summary(&self) -> serde_json::Value {
        serde_json::json!({
            "id": self.id,
            "slug": self.slug,
            "name": self.name,
            "description": self.description,
            "field_id": self.field_id,
            "user_id": self.user_id,
        })
    }

    fn into_record(self) -> Record {
        Record::Response(self)
    }
}
