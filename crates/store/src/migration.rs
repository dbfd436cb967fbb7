//! Schema migration logic for the record store
//!
//! Tracks applied migrations and applies pending ones up to the current schema version.

use crate::error::{Error, Result};
use crate::schema::{SCHEMA_SQL, SCHEMA_VERSION};
use rusqlite::Connection;
use tracing::{debug, info, trace};

/// Manages schema migrations for the record store
pub struct MigrationManager;

impl MigrationManager {
    /// Highest version recorded in `schema_version`, or 0 for a database
    /// that has never held a roster schema.
    pub fn get_current_version(conn: &Connection) -> Result<i32> {
        let version: Option<i32> = match conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| {
            row.get(0)
        }) {
            Ok(version) => version,
            Err(rusqlite::Error::SqliteFailure(_, Some(msg))) if msg.contains("no such table") => {
                trace!("No schema_version table; treating database as empty");
                None
            }
            Err(e) => return Err(Error::database(format!("Failed to read roster schema version: {e}"))),
        };

        Ok(version.unwrap_or(0))
    }

    /// Apply pending migrations up to SCHEMA_VERSION
    ///
    /// Running it on an up-to-date database is a no-op.
    pub fn migrate(conn: &Connection) -> Result<()> {
        let current_version = Self::get_current_version(conn)?;
        debug!("Current schema version: {}, target: {}", current_version, SCHEMA_VERSION);

        if current_version > SCHEMA_VERSION {
            return Err(Error::database(format!(
                "Roster schema version {} is newer than supported version {}; refusing to open",
                current_version, SCHEMA_VERSION
            )));
        }

        if current_version == SCHEMA_VERSION {
            trace!("Schema is up to date, no migration needed");
            return Ok(());
        }

        info!("Upgrading roster schema from version {} to {}", current_version, SCHEMA_VERSION);

        if current_version == 0 {
            Self::apply_v1_migration(conn)?;
        }

        info!("Roster schema at version {}", SCHEMA_VERSION);
        Ok(())
    }

    /// Create the `records` table and its indexes, and stamp version 1
    fn apply_v1_migration(conn: &Connection) -> Result<()> {
        debug!("Creating records table");

        conn.execute_batch(SCHEMA_SQL)
            .map_err(|e| Error::database(format!("Failed to create records schema: {e}")))?;

        trace!("records table ready at version 1");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    fn table_exists(conn: &Connection, name: &str) -> bool {
        conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name=?1)",
            [name],
            |row| row.get(0),
        )
        .unwrap()
    }

    #[test]
    fn test_get_current_version_fresh_db() {
        let conn = Connection::open_in_memory().unwrap();
        let version = MigrationManager::get_current_version(&conn).unwrap();
        assert_eq!(version, 0);
    }

    #[test]
    fn test_get_current_version_ignores_unrelated_tables() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE notes (body TEXT)").unwrap();
        assert_eq!(MigrationManager::get_current_version(&conn).unwrap(), 0);

        MigrationManager::migrate(&conn).unwrap();
        assert!(table_exists(&conn, "notes"));
        assert_eq!(MigrationManager::get_current_version(&conn).unwrap(), SCHEMA_VERSION);
    }

    #[test]
    fn test_migrate_applies_schema_and_sets_version() {
        let conn = Connection::open_in_memory().unwrap();
        MigrationManager::migrate(&conn).unwrap();

        let version = MigrationManager::get_current_version(&conn).unwrap();
        assert_eq!(version, SCHEMA_VERSION);
        assert!(table_exists(&conn, "records"));
    }

    #[test]
    fn test_migrate_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();

        MigrationManager::migrate(&conn).unwrap();
        let version1 = MigrationManager::get_current_version(&conn).unwrap();

        MigrationManager::migrate(&conn).unwrap();
        let version2 = MigrationManager::get_current_version(&conn).unwrap();

        assert_eq!(version1, version2);
        assert_eq!(version2, SCHEMA_VERSION);
    }

    #[test]
    fn test_migrate_rejects_newer_schema() {
        let conn = Connection::open_in_memory().unwrap();
        MigrationManager::migrate(&conn).unwrap();
        conn.execute("INSERT INTO schema_version (version) VALUES (?1)", [SCHEMA_VERSION + 1])
            .unwrap();

        let err = MigrationManager::migrate(&conn).unwrap_err();
        assert!(err.to_string().contains("newer than supported"));
    }

    #[test]
    fn test_schema_enforces_unique_email() {
        let conn = Connection::open_in_memory().unwrap();
        MigrationManager::migrate(&conn).unwrap();

        let insert = "INSERT INTO records (username, email, created_at) VALUES (?1, ?2, '2025-01-01T00:00:00+00:00')";
        conn.execute(insert, ["alice123", "alice@example.com"]).unwrap();
        assert!(conn.execute(insert, ["alice456", "alice@example.com"]).is_err());
    }

    #[test]
    fn test_schema_rejects_unknown_status() {
        let conn = Connection::open_in_memory().unwrap();
        MigrationManager::migrate(&conn).unwrap();

        let result = conn.execute(
            "INSERT INTO records (username, email, status, created_at) VALUES ('bob_smith', 'bob@example.com', 'banned', '2025-01-01T00:00:00+00:00')",
            [],
        );
        assert!(result.is_err());
    }
}
