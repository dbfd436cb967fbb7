//! SQLite schema for the record store
//!
//! Records are plain rows. Ranking happens in Rust (see
//! [`roster_core::scoring`]), so there is no full-text index here.

/// Current schema version for migrations
pub const SCHEMA_VERSION: i32 = 1;

/// SQL to create the complete schema
///
/// Includes:
/// - Schema version tracking table
/// - Records table with unique `username` and `email`
/// - Indexes backing the status and role filters
pub const SCHEMA_SQL: &str = include_str!("schema.sql");

/// Column list shared by every record query, in [`crate::record_store`] row order
pub const RECORD_COLUMNS: &str = "id, name, username, bio, email, role, status, created_by, nickname, created_at";
