//! Timestamp and identifier helpers.

use std::time::{SystemTime, UNIX_EPOCH};
use ulid::Ulid;
use uuid::Uuid;

/// Returns unix-epoch seconds with `Z` suffix (e.g. `1771220592Z`).
pub fn now_epoch_z() -> String {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    format!("{}Z", secs)
}

/// Audit event id; ULIDs sort by creation time.
pub fn new_event_id() -> String {
    Ulid::new().to_string()
}

/// Primary key for a new entity row.
pub fn new_entity_id() -> String {
    Uuid::new_v4().to_string()
}
