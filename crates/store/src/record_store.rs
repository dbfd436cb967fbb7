//! Record store backed by SQLite
//!
//! Every operation is a single closure run on the connection's dedicated
//! thread, so operations never interleave. Inserts check uniqueness and write
//! inside one transaction; a rejected batch leaves the table untouched.
use crate::error::{Error, Result};
use crate::migration::MigrationManager;
use crate::schema::RECORD_COLUMNS;

use chrono::{DateTime, Utc};
use roster_core::config::{StoreConfig, StoreLocation};
use roster_core::logging::sanitize_path;
use roster_core::{NewRecord, Record, SearchResult, Status, ValidationError, prepare_batch, rank, tokenize};
use rusqlite::types::Type;
use rusqlite::{OptionalExtension, Row, params};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use tokio_rusqlite::Connection;
use tracing::instrument;

/// Narrows the candidate set of a search
#[derive(Debug, Clone, Default)]
pub struct SearchFilters {
    /// Only records with this status
    pub status: Option<Status>,
    /// Only records with this role (compared uppercase)
    pub role: Option<String>,
    /// Keep at most this many results, after ranking
    pub limit: Option<usize>,
}

/// Store statistics
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreStats {
    pub record_count: usize,
    /// Keyed by status name; statuses with no records are listed as zero
    pub by_status: BTreeMap<String, usize>,
}

/// A handle to the record store
///
/// Cloning shares the same connection.
#[derive(Clone)]
pub struct RecordStore {
    conn: Arc<Connection>,
}

impl RecordStore {
    /// Open or create a record store at the given path
    ///
    /// Missing parent directories are created.
    #[instrument(skip_all, fields(db_path = %sanitize_path(db_path)))]
    pub async fn open(db_path: &Path) -> Result<Self> {
        tracing::info!("Opening record store at {}", sanitize_path(db_path));

        if let Some(parent) = db_path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(db_path)
            .await
            .map_err(|e| Error::database(format!("Failed to open database: {e}")))?;

        Self::init(conn).await
    }

    /// Open a store that lives only as long as this handle
    #[instrument]
    pub async fn open_in_memory() -> Result<Self> {
        tracing::info!("Opening in-memory record store");

        let conn = Connection::open_in_memory()
            .await
            .map_err(|e| Error::database(format!("Failed to open in-memory database: {e}")))?;

        Self::init(conn).await
    }

    /// Open the store described by `config`
    pub async fn open_with(config: &StoreConfig) -> Result<Self> {
        match config.location() {
            StoreLocation::File(path) => Self::open(&path).await,
            StoreLocation::Memory => Self::open_in_memory().await,
        }
    }

    async fn init(conn: Connection) -> Result<Self> {
        conn.call(|conn| {
            tracing::debug!("Running migrations");
            MigrationManager::migrate(conn).map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;
            tracing::trace!("Migrations complete");
            Ok::<(), rusqlite::Error>(())
        })
        .await
        .map_err(|e| Error::database(format!("Migration failed: {e}")))?;

        tracing::info!("Record store opened successfully");
        Ok(Self { conn: Arc::new(conn) })
    }

    /// Close the connection
    ///
    /// If other clones of this handle are alive the connection stays open
    /// until the last one is dropped.
    #[instrument(skip(self))]
    pub async fn close(self) -> Result<()> {
        match Arc::try_unwrap(self.conn) {
            Ok(conn) => {
                conn.close()
                    .await
                    .map_err(|e| Error::database(format!("Failed to close database: {e}")))?;
                tracing::info!("Record store closed");
            }
            Err(_) => tracing::debug!("Record store still shared; leaving connection open"),
        }
        Ok(())
    }

    /// Validate and append a batch of records
    ///
    /// All-or-nothing: the first failing check rejects the whole batch and
    /// nothing is written.
    #[instrument(skip(self, records), fields(count = records.len()))]
    pub async fn insert(&self, records: Vec<NewRecord>) -> Result<Vec<Record>> {
        let records = prepare_batch(records)?;
        if records.is_empty() {
            return Ok(Vec::new());
        }

        let created_at = Utc::now();
        let outcome = self
            .conn
            .call(move |conn| {
                let tx = conn.transaction()?;

                if let Some(conflict) = find_conflict(&tx, &records)? {
                    tracing::debug!("Rejecting batch: {}", conflict);
                    return Ok::<_, rusqlite::Error>(Err(conflict));
                }

                let mut inserted = Vec::with_capacity(records.len());
                {
                    let mut stmt = tx.prepare_cached(
                        r#"
                        INSERT INTO records
                            (name, username, bio, email, role, status, created_by, nickname, created_at)
                        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                        "#,
                    )?;

                    for record in records {
                        let id = stmt.insert(params![
                            &record.name,
                            &record.username,
                            &record.bio,
                            &record.email,
                            &record.role,
                            record.status.as_str(),
                            &record.created_by,
                            &record.nickname,
                            created_at.to_rfc3339(),
                        ])?;
                        inserted.push(Record::from_new(id, record, created_at));
                    }
                }

                tx.commit()?;
                tracing::trace!("Committed {} records", inserted.len());
                Ok(Ok(inserted))
            })
            .await?;

        let inserted = outcome?;
        tracing::debug!("Inserted {} records", inserted.len());
        Ok(inserted)
    }

    /// Validate and append a single record
    pub async fn insert_one(&self, record: NewRecord) -> Result<Record> {
        self.insert(vec![record])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Error::database("insert returned no record"))
    }

    /// Ranked search over `name`, `username` and `bio`
    ///
    /// An empty query yields no results.
    pub async fn search(&self, query: &str) -> Result<Vec<SearchResult>> {
        self.search_filtered(query, SearchFilters::default()).await
    }

    /// Ranked search restricted by `filters`
    #[instrument(skip(self, filters), fields(limit = filters.limit))]
    pub async fn search_filtered(&self, query: &str, filters: SearchFilters) -> Result<Vec<SearchResult>> {
        tracing::debug!("Searching with query: {}", query);

        if tokenize(query).is_empty() {
            return Ok(Vec::new());
        }

        let candidates = self.load(filters.status, filters.role).await?;
        let mut results = rank(&candidates, query);
        if let Some(limit) = filters.limit {
            results.truncate(limit);
        }

        tracing::debug!("Search returned {} hits from {} candidates", results.len(), candidates.len());
        Ok(results)
    }

    /// All records in insertion order
    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<Record>> {
        self.load(None, None).await
    }

    /// The newest `limit` records, newest first
    #[instrument(skip(self))]
    pub async fn recent(&self, limit: usize) -> Result<Vec<Record>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);

        let records = self
            .conn
            .call(move |conn| {
                let sql = format!("SELECT {} FROM records ORDER BY id DESC LIMIT ?1", RECORD_COLUMNS);
                let mut stmt = conn.prepare_cached(&sql)?;
                let records = stmt
                    .query_map(params![limit], record_from_row)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok::<_, rusqlite::Error>(records)
            })
            .await?;

        Ok(records)
    }

    /// Look a record up by username
    #[instrument(skip(self))]
    pub async fn get_by_username(&self, username: &str) -> Result<Option<Record>> {
        let username = username.trim().to_owned();

        let record = self
            .conn
            .call(move |conn| {
                let sql = format!("SELECT {} FROM records WHERE username = ?1", RECORD_COLUMNS);
                let mut stmt = conn.prepare_cached(&sql)?;
                let record = stmt.query_row(params![&username], record_from_row).optional()?;
                Ok::<_, rusqlite::Error>(record)
            })
            .await?;

        Ok(record)
    }

    /// Number of stored records
    pub async fn count(&self) -> Result<usize> {
        let count = self
            .conn
            .call(|conn| {
                let count: i64 = conn.query_row("SELECT COUNT(*) FROM records", [], |row| row.get(0))?;
                Ok::<_, rusqlite::Error>(count)
            })
            .await?;

        usize::try_from(count).map_err(|e| Error::database(format!("Invalid record count {count}: {e}")))
    }

    /// Get store statistics
    #[instrument(skip(self))]
    pub async fn stats(&self) -> Result<StoreStats> {
        tracing::debug!("Getting store statistics");

        let rows = self
            .conn
            .call(|conn| {
                let mut stmt = conn.prepare_cached("SELECT status, COUNT(*) FROM records GROUP BY status")?;
                let rows = stmt
                    .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok::<_, rusqlite::Error>(rows)
            })
            .await?;

        let mut by_status: BTreeMap<String, usize> =
            Status::VALUES.iter().map(|status| (status.as_str().to_string(), 0)).collect();
        let mut record_count = 0;
        for (status, count) in rows {
            let count = count as usize;
            record_count += count;
            by_status.insert(status, count);
        }

        Ok(StoreStats { record_count, by_status })
    }

    /// Records matching the optional filters, in insertion order
    async fn load(&self, status: Option<Status>, role: Option<String>) -> Result<Vec<Record>> {
        let status = status.map(|s| s.as_str());
        let role = role.map(|r| r.trim().to_uppercase());

        let records = self
            .conn
            .call(move |conn| {
                let sql = format!(
                    r#"
                    SELECT {}
                    FROM records
                    WHERE (?1 IS NULL OR status = ?1)
                      AND (?2 IS NULL OR role = ?2)
                    ORDER BY id
                    "#,
                    RECORD_COLUMNS
                );
                let mut stmt = conn.prepare_cached(&sql)?;
                let records = stmt
                    .query_map(params![status, role], record_from_row)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok::<_, rusqlite::Error>(records)
            })
            .await?;

        Ok(records)
    }
}

/// First username or email in `records` that already exists in the table
fn find_conflict(conn: &rusqlite::Connection, records: &[NewRecord]) -> rusqlite::Result<Option<ValidationError>> {
    let mut by_username = conn.prepare_cached("SELECT EXISTS(SELECT 1 FROM records WHERE username = ?1)")?;
    let mut by_email = conn.prepare_cached("SELECT EXISTS(SELECT 1 FROM records WHERE email = ?1)")?;

    for record in records {
        let taken: bool = by_username.query_row(params![&record.username], |row| row.get(0))?;
        if taken {
            return Ok(Some(ValidationError::duplicate("username", &record.username)));
        }

        let taken: bool = by_email.query_row(params![&record.email], |row| row.get(0))?;
        if taken {
            return Ok(Some(ValidationError::duplicate("email", &record.email)));
        }
    }

    Ok(None)
}

/// Map a row selected with [`RECORD_COLUMNS`]
fn record_from_row(row: &Row<'_>) -> rusqlite::Result<Record> {
    let status_raw: String = row.get(6)?;
    let status =
        Status::from_str(&status_raw).map_err(|e| rusqlite::Error::FromSqlConversionFailure(6, Type::Text, Box::new(e)))?;

    let created_at_raw: String = row.get(9)?;
    let created_at = DateTime::parse_from_rfc3339(&created_at_raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(9, Type::Text, Box::new(e)))?
        .with_timezone(&Utc);

    Ok(Record {
        id: row.get(0)?,
        name: row.get(1)?,
        username: row.get(2)?,
        bio: row.get(3)?,
        email: row.get(4)?,
        role: row.get(5)?,
        status,
        created_by: row.get(7)?,
        nickname: row.get(8)?,
        created_at,
    })
}
