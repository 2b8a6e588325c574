//! Entity modules: one row type per table.
//!
//! Each entity declares its descriptor (table, identity column, relations by
//! target name) and implements `Entity`, the seam the generic hooks,
//! repository and graph work through.

pub mod field;
pub mod form;
pub mod group;
pub mod privilege;
pub mod response;
pub mod scope;
pub mod user;

use crate::core::error::WardenError;
use crate::core::hooks::WriteOp;
use crate::core::registry::{EntityDescriptor, EntityKind};
use rusqlite::{Connection, Row};
use serde::Serialize;
use serde::de::DeserializeOwned;

pub use field::Field;
pub use form::Form;
pub use group::Group;
pub use privilege::Privilege;
pub use response::Response;
pub use scope::Scope;
pub use user::User;

pub trait Entity: Sized + Serialize + DeserializeOwned {
    fn descriptor() -> &'static EntityDescriptor;

    fn id(&self) -> Option<&str>;
    fn set_id(&mut self, id: String);
    fn created_at(&self) -> Option<&str>;
    fn set_created_at(&mut self, ts: String);

    /// Value of the identifying column (slug, or email for users).
    fn identity(&self) -> &str;

    /// Required-field and format checks, run before the uniqueness guard.
    fn validate(&self, _op: WriteOp) -> Result<(), WardenError> {
        Ok(())
    }

    /// Turn a freshly supplied secret into its stored form. No-op unless the
    /// entity carries credentials.
    fn prepare_credentials(&mut self) -> Result<(), WardenError> {
        Ok(())
    }

    /// Insert the row. `id` and `created_at` are set by the time this runs.
    fn insert_row(&self, conn: &Connection) -> rusqlite::Result<usize>;

    /// Update every mutable column of the row. Never writes `created_at`.
    fn update_row(&self, conn: &Connection) -> rusqlite::Result<usize>;

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self>;

    /// Externally safe projection; never contains credential material.
    fn summary(&self) -> serde_json::Value;

    fn into_record(self) -> Record;
}

/// Any entity, for operations that pick the type at runtime (graph traversal,
/// the CLI).
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Record {
    Scope(Scope),
    Privilege(Privilege),
    Group(Group),
    User(User),
    Field(Field),
    Form(Form),
    Response(Response),
}

impl Record {
    pub fn kind(&self) -> EntityKind {
        match self {
            Record::Scope(_) => EntityKind::Scope,
            Record::Privilege(_) => EntityKind::Privilege,
            Record::Group(_) => EntityKind::Group,
            Record::User(_) => EntityKind::User,
            Record::Field(_) => EntityKind::Field,
            Record::Form(_) => EntityKind::Form,
            Record::Response(_) => EntityKind::Response,
        }
    }

    pub fn id(&self) -> Option<&str> {
        match self {
            Record::Scope(e) => e.id(),
            Record::Privilege(e) => e.id(),
            Record::Group(e) => e.id(),
            Record::User(e) => e.id(),
            Record::Field(e) => e.id(),
            Record::Form(e) => e.id(),
            Record::Response(e) => e.id(),
        }
    }

    pub fn identity(&self) -> &str {
        match self {
            Record::Scope(e) => e.identity(),
            Record::Privilege(e) => e.identity(),
            Record::Group(e) => e.identity(),
            Record::User(e) => e.identity(),
            Record::Field(e) => e.identity(),
            Record::Form(e) => e.identity(),
            Record::Response(e) => e.identity(),
        }
    }

    pub fn summary(&self) -> serde_json::Value {
        match self {
            Record::Scope(e) => e.summary(),
            Record::Privilege(e) => e.summary(),
            Record::Group(e) => e.summary(),
            Record::User(e) => e.summary(),
            Record::Field(e) => e.summary(),
            Record::Form(e) => e.summary(),
            Record::Response(e) => e.summary(),
        }
    }

    pub fn from_row(kind: EntityKind, row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(match kind {
            EntityKind::Scope => Record::Scope(Scope::from_row(row)?),
            EntityKind::Privilege => Record::Privilege(Privilege::from_row(row)?),
            EntityKind::Group => Record::Group(Group::from_row(row)?),
            EntityKind::User => Record::User(User::from_row(row)?),
            EntityKind::Field => Record::Field(Field::from_row(row)?),
            EntityKind::Form => Record::Form(Form::from_row(row)?),
            EntityKind::Response => Record::Response(Response::from_row(row)?),
        })
    }

    /// Parse a JSON payload as an entity of `kind`.
    pub fn from_json(kind: EntityKind, value: serde_json::Value) -> Result<Self, WardenError> {
        fn parse<E: Entity>(kind: EntityKind, value: serde_json::Value) -> Result<E, WardenError> {
            serde_json::from_value(value)
                .map_err(|e| WardenError::Validation(format!("Invalid {} payload: {}", kind, e)))
        }
        Ok(match kind {
            EntityKind::Scope => Record::Scope(parse(kind, value)?),
            EntityKind::Privilege => Record::Privilege(parse(kind, value)?),
            EntityKind::Group => Record::Group(parse(kind, value)?),
            EntityKind::User => Record::User(parse(kind, value)?),
            EntityKind::Field => Record::Field(parse(kind, value)?),
            EntityKind::Form => Record::Form(parse(kind, value)?),
            EntityKind::Response => Record::Response(parse(kind, value)?),
        })
    }
}

pub(crate) fn require_non_empty(
    desc: &EntityDescriptor,
    field: &str,
    value: &str,
) -> Result<(), WardenError> {
    if value.trim().is_empty() {
        return Err(WardenError::Validation(format!(
            "{}.{} is required",
            desc.name(),
            field
        )));
    }
    Ok(())
}
