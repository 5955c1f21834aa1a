//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.

use crate::state::{ItemKind, ItemStatus, StatusCounts};
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::storage::FrontierRecord;
use crate::url::CanonicalUrl;
use chrono::Utc;
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// SQLite storage backend
///
/// Rows are scoped by `site` (the host of the crawl root), so several mirrors
/// can share one database file without seeing each other's progress.
pub struct SqliteStorage {
    conn: Mutex<Connection>,
    site: String,
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    /// * `site` - The mirrored site the rows belong to
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(StorageError)` - Failed to open database
    pub fn new(path: &Path, site: &str) -> StorageResult<Self> {
        let conn = Connection::open(path)?;

        // Configure SQLite for better performance
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
            site: site.to_string(),
        })
    }

    /// Creates an in-memory database
    pub fn new_in_memory(site: &str) -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            site: site.to_string(),
        })
    }

    /// Returns the site this storage is scoped to
    pub fn site(&self) -> &str {
        &self.site
    }

    /// Counts recorded items per status
    pub fn status_counts(&self) -> StorageResult<StatusCounts> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT status, COUNT(*) FROM frontier_items WHERE site = ?1 GROUP BY status",
        )?;

        let rows = stmt
            .query_map(params![self.site], |row| {
                Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut counts = StatusCounts::default();
        for (code, count) in rows {
            let status = ItemStatus::from_db_code(code)
                .ok_or_else(|| StorageError::Corrupt(format!("unknown status code {}", code)))?;
            counts.add(status, count as u64);
        }

        Ok(counts)
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Storage for SqliteStorage {
    fn load(&self) -> StorageResult<Vec<FrontierRecord>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT url, kind, status FROM frontier_items WHERE site = ?1 ORDER BY url",
        )?;

        let rows = stmt
            .query_map(params![self.site], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, i64>(2)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(url, kind, status)| {
                let kind = ItemKind::from_db_code(kind).ok_or_else(|| {
                    StorageError::Corrupt(format!("unknown kind code {} for {}", kind, url))
                })?;
                let status = ItemStatus::from_db_code(status).ok_or_else(|| {
                    StorageError::Corrupt(format!("unknown status code {} for {}", status, url))
                })?;
                Ok(FrontierRecord {
                    url: CanonicalUrl::from(url),
                    kind,
                    status,
                })
            })
            .collect()
    }

    fn record_transition(
        &self,
        url: &CanonicalUrl,
        kind: ItemKind,
        status: ItemStatus,
    ) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        self.conn().execute(
            "INSERT INTO frontier_items (site, url, kind, status, created, updated)
             VALUES (?1, ?2, ?3, ?4, ?5, ?5)
             ON CONFLICT(site, url) DO UPDATE SET
                kind = excluded.kind,
                status = excluded.status,
                updated = excluded.updated",
            params![
                self.site,
                url.as_str(),
                kind.to_db_code(),
                status.to_db_code(),
                now
            ],
        )?;
        Ok(())
    }

    fn clear(&self) -> StorageResult<()> {
        self.conn().execute(
            "DELETE FROM frontier_items WHERE site = ?1",
            params![self.site],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> CanonicalUrl {
        CanonicalUrl::from(s)
    }

    #[test]
    fn test_create_in_memory() {
        let storage = SqliteStorage::new_in_memory("x.test");
        assert!(storage.is_ok());
    }

    #[test]
    fn test_load_empty() {
        let storage = SqliteStorage::new_in_memory("x.test").unwrap();
        assert!(storage.load().unwrap().is_empty());
    }

    #[test]
    fn test_first_transition_inserts_later_ones_update() {
        let storage = SqliteStorage::new_in_memory("x.test").unwrap();
        let u = url("https://x.test/a");

        storage
            .record_transition(&u, ItemKind::Page, ItemStatus::InFlight)
            .unwrap();
        storage
            .record_transition(&u, ItemKind::Page, ItemStatus::Saved)
            .unwrap();

        let records = storage.load().unwrap();
        assert_eq!(
            records,
            vec![FrontierRecord {
                url: u,
                kind: ItemKind::Page,
                status: ItemStatus::Saved,
            }]
        );
    }

    #[test]
    fn test_update_moves_updated_timestamp_only() {
        let storage = SqliteStorage::new_in_memory("x.test").unwrap();
        let u = url("https://x.test/a");

        storage
            .record_transition(&u, ItemKind::Asset, ItemStatus::InFlight)
            .unwrap();
        let created_before: String = storage
            .conn()
            .query_row("SELECT created FROM frontier_items", [], |row| row.get(0))
            .unwrap();

        storage
            .record_transition(&u, ItemKind::Asset, ItemStatus::Ignored)
            .unwrap();
        let (created_after, updated): (String, String) = storage
            .conn()
            .query_row("SELECT created, updated FROM frontier_items", [], |row| {
                Ok((row.get(0)?, row.get(1)?))
            })
            .unwrap();

        assert_eq!(created_before, created_after);
        assert!(updated >= created_after);
    }

    #[test]
    fn test_clear_only_touches_own_site() {
        let conn_path = tempfile::NamedTempFile::new().unwrap();
        let ours = SqliteStorage::new(conn_path.path(), "x.test").unwrap();
        let theirs = SqliteStorage::new(conn_path.path(), "y.test").unwrap();

        ours.record_transition(&url("https://x.test/"), ItemKind::Page, ItemStatus::Saved)
            .unwrap();
        theirs
            .record_transition(&url("https://y.test/"), ItemKind::Page, ItemStatus::Saved)
            .unwrap();

        ours.clear().unwrap();

        assert!(ours.load().unwrap().is_empty());
        assert_eq!(theirs.load().unwrap().len(), 1);
    }

    #[test]
    fn test_status_counts() {
        let storage = SqliteStorage::new_in_memory("x.test").unwrap();
        storage
            .record_transition(&url("https://x.test/"), ItemKind::Page, ItemStatus::Saved)
            .unwrap();
        storage
            .record_transition(&url("https://x.test/a"), ItemKind::Page, ItemStatus::InFlight)
            .unwrap();
        storage
            .record_transition(&url("https://x.test/b.css"), ItemKind::Asset, ItemStatus::Ignored)
            .unwrap();

        let counts = storage.status_counts().unwrap();
        assert_eq!(counts.saved, 1);
        assert_eq!(counts.in_flight, 1);
        assert_eq!(counts.ignored, 1);
        assert_eq!(counts.total(), 3);
    }

    #[test]
    fn test_corrupt_status_code() {
        let storage = SqliteStorage::new_in_memory("x.test").unwrap();
        storage
            .conn()
            .execute(
                "INSERT INTO frontier_items (site, url, kind, status, created, updated)
                 VALUES ('x.test', 'https://x.test/', 1, 9, 'now', 'now')",
                [],
            )
            .unwrap();

        assert!(matches!(storage.load(), Err(StorageError::Corrupt(_))));
    }

    #[test]
    fn test_reopen_keeps_records() {
        let file = tempfile::NamedTempFile::new().unwrap();
        {
            let storage = SqliteStorage::new(file.path(), "x.test").unwrap();
            storage
                .record_transition(&url("https://x.test/a"), ItemKind::Page, ItemStatus::InFlight)
                .unwrap();
        }

        let storage = SqliteStorage::new(file.path(), "x.test").unwrap();
        let records = storage.load().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, ItemStatus::InFlight);
    }
}
