use crate::core::credential;
use crate::core::error::WardenError;
use crate::core::hooks::WriteOp;
use crate::core::registry::{EntityDescriptor, EntityKind, Relation, RelationKind};
use crate::entities::{Entity, Record, require_non_empty};
use regex::Regex;
use rusqlite::{Connection, Row, params};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

pub static DESCRIPTOR: EntityDescriptor = EntityDescriptor {
    kind: EntityKind::User,
    table: "users",
    identity_column: "email",
    relations: &[
        Relation {
            name: "groups",
            target: "group",
            kind: RelationKind::ManyToMany {
                through: "users_groups",
                owner_column: "user_id",
                target_column: "group_id",
            },
        },
        Relation {
            name: "privileges",
            target: "privilege",
            kind: RelationKind::ManyToMany {
                through: "users_privileges",
                owner_column: "user_id",
                target_column: "privilege_id",
            },
        },
        Relation {
            name: "responses",
            target: "response",
            kind: RelationKind::HasMany {
                foreign_column: "user_id",
            },
        },
    ],
};

fn email_pattern() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("static email regex"))
}

#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    pub email: String,
    pub name: String,
    /// Argon2id PHC string. Produced by the hasher or read from the store; never
    /// taken from or written to JSON.
    #[serde(skip)]
    pub hashed_password: String,
    /// Plaintext accepted on input only; hashed and cleared before any write.
    #[serde(default, skip_serializing)]
    pub password: Option<String>,
}

impl User {
    pub fn new(email: &str, name: &str, password: &str) -> Self {
        Self {
            id: None,
            created_at: None,
            email: email.to_string(),
            name: name.to_string(),
            hashed_password: String::new(),
            password: Some(password.to_string()),
        }
    }

    pub fn with_password(mut self, password: &str) -> Self {
        self.password = Some(password.to_string());
        self
    }

    pub fn verify_password(&self, password: &str) -> Result<bool, WardenError> {
        if self.hashed_password.is_empty() {
            return Ok(false);
        }
        credential::verify_password(password, &self.hashed_password)
    }
}

impl fmt::Debug for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("created_at", &self.created_at)
            .field("email", &self.email)
            .field("name", &self.name)
            .field("hashed_password", &"<redacted>")
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl Entity for User {
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
        &self.email
    }

    fn validate(&self, op: WriteOp) -> Result<(), WardenError> {
        if !email_pattern().is_match(&self.email) {
            return Err(WardenError::Validation(format!(
                "user.email '{}' is not a valid address",
                self.email
            )));
        }
        require_non_empty(&DESCRIPTOR, "name", &self.name)?;

        let has_password = self.password.as_deref().is_some_and(|p| !p.is_empty());
        if op == WriteOp::Insert && !has_password && self.hashed_password.is_empty() {
            return Err(WardenError::Validation(
                "user requires a password".to_string(),
            ));
        }
        if !has_password && !self.hashed_password.is_empty() {
            credential::ensure_password_hash(&self.hashed_password)?;
        }
        Ok(())
    }

    fn prepare_credentials(&mut self) -> Result<(), WardenError> {
        if let Some(plaintext) = self.password.take() {
            if !plaintext.is_empty() {
                self.hashed_password = credential::hash_password(&plaintext)?;
            }
        }
        Ok(())
    }

    fn insert_row(&self, conn: &Connection) -> rusqlite::Result<usize> {
        conn.execute(
            "INSERT INTO users(id, created_at, email, name, hashed_password)
             VALUES(?1, ?2, ?3, ?4, ?5)",
            params![
                self.id,
                self.created_at,
                self.email,
                self.name,
                self.hashed_password
            ],
        )
    }

    fn update_row(&self, conn: &Connection) -> rusqlite::Result<usize> {
        // No fresh password and no hash carried over: keep the stored hash.
        if self.hashed_password.is_empty() {
            return conn.execute(
                "UPDATE users SET email = ?2, name = ?3 WHERE id = ?1",
                params![self.id, self.email, self.name],
            );
        }
        conn.execute(
            "UPDATE users SET email = ?2, name = ?3, hashed_password = ?4 WHERE id = ?1",
            params![self.id, self.email, self.name, self.hashed_password],
        )
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(User {
            id: row.get("id")?,
            created_at: row.get("created_at")?,
            email: row.get("email")?,
            name: row.get("name")?,
            hashed_password: row.get("hashed_password")?,
            password: None,
        })
    }

    fn summary(&self) -> serde_json::Value {
        serde_json::json!({
            "id": self.id,
            "email": self.email,
            "name": self.name,
        })
    }

    fn into_record(self) -> Record {
        Record::User(self)
    }
}
