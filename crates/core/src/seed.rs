//! Demo records for populating an empty store

use crate::error::{Error, Result};
use crate::record::NewRecord;

const DEMO_USERS_JSON: &str = include_str!("../fixtures/demo_users.json");

/// The ten demo users, in insertion order
pub fn demo_records() -> Result<Vec<NewRecord>> {
    serde_json::from_str(DEMO_USERS_JSON).map_err(|e| Error::Parse(format!("demo fixture: {}", e)))
}
