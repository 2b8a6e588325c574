use rusqlite::{ErrorCode, ffi};
use std::io;
use thiserror::Error;

/// Every failure the core reports. Nothing is swallowed: a failed write
/// surfaces as one of these and leaves the store unchanged.
#[derive(Error, Debug)]
pub enum WardenError {
    /// Another row already holds `value` in the unique column `field`.
    #[error("Uniqueness violation: {field} '{value}' is already taken")]
    UniquenessViolation { field: String, value: String },
    /// A write referenced a row that does not exist.
    #[error("Referential integrity violation: {0}")]
    ReferentialIntegrityViolation(String),
    /// The store could not be opened, or stayed locked past the busy timeout.
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),
    /// Malformed input, rejected before the guard runs.
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Not found: {0}")]
    NotFound(String),
    /// Hashing failed or a stored hash could not be parsed.
    #[error("Credential error: {0}")]
    Credential(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("SQLite error: {0}")]
    Rusqlite(#[from] rusqlite::Error),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl WardenError {
    /// Fill in the offending value on a uniqueness violation raised by the
    /// store, whose message only names the column. Violations on any other
    /// column than `column` are left as they are.
    pub fn with_identity_value(self, column: &str, value: &str) -> Self {
        match self {
            WardenError::UniquenessViolation { field, .. } if field == column => {
                WardenError::UniquenessViolation {
                    field,
                    value: value.to_string(),
                }
            }
            other => other,
        }
    }

    pub fn is_uniqueness_violation(&self) -> bool {
        matches!(self, WardenError::UniquenessViolation { .. })
    }

    pub fn is_referential_violation(&self) -> bool {
        matches!(self, WardenError::ReferentialIntegrityViolation(_))
    }
}

/// Map a raw SQLite failure onto the typed taxonomy.
///
/// Constraint failures become `UniquenessViolation` / `ReferentialIntegrityViolation`,
/// busy, locked and open failures become `StoreUnavailable`. Anything else stays
/// a plain `Rusqlite` error.
pub fn classify_sqlite(err: rusqlite::Error) -> WardenError {
    let rusqlite::Error::SqliteFailure(code, message) = &err else {
        return WardenError::Rusqlite(err);
    };
    let message = message.clone().unwrap_or_default();

    match code.code {
        ErrorCode::ConstraintViolation => match code.extended_code {
            ffi::SQLITE_CONSTRAINT_UNIQUE | ffi::SQLITE_CONSTRAINT_PRIMARYKEY => {
                WardenError::UniquenessViolation {
                    field: unique_column(&message),
                    value: String::new(),
                }
            }
            ffi::SQLITE_CONSTRAINT_FOREIGNKEY => {
                WardenError::ReferentialIntegrityViolation(message)
            }
            _ => WardenError::Rusqlite(err),
        },
        ErrorCode::DatabaseBusy
        | ErrorCode::DatabaseLocked
        | ErrorCode::CannotOpen
        | ErrorCode::NotADatabase
        | ErrorCode::SystemIoFailure => WardenError::StoreUnavailable(err.to_string()),
        _ => WardenError::Rusqlite(err),
    }
}

// "UNIQUE constraint failed: users.email" -> "email"
fn unique_column(message: &str) -> String {
    message
        .rsplit(": ")
        .next()
        .and_then(|cols| cols.split(", ").next())
        .map(|col| col.rsplit('.').next().unwrap_or(col).to_string())
        .unwrap_or_default()
}
