//! Database connection management with pragma configuration.
//!
//! This module handles opening the SQLite database, applying required pragmas
//! for performance and concurrency (WAL mode), running migrations and the
//! start-up sweep of expired rows.

use super::clock::{Clock, SystemClock};
use super::migrations;
use crate::Error;
use chrono::{DateTime, Utc};
use std::path::Path;
use std::sync::Arc;
use tokio_rusqlite::Connection;

/// Cache database handle.
///
/// Wraps a tokio-rusqlite Connection that runs database operations
/// on a background thread. Every statement goes through that one thread,
/// so writes are serialized. Clones share the same connection.
#[derive(Clone, Debug)]
pub struct CacheDb {
    pub(crate) conn: Connection,
    clock: Arc<dyn Clock>,
}

impl CacheDb {
    /// Open a database at the specified path.
    ///
    /// Creates the file if it doesn't exist, applies performance pragmas,
    /// runs any pending migrations and sweeps expired rows.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        let conn = Connection::open(path).await.map_err(|e| Error::Database(Arc::new(e.into())))?;
        Self::init(conn).await
    }

    /// Open an in-memory database for testing.
    ///
    /// Creates a temporary in-memory SQLite database with the same
    /// pragma configuration as file-based databases.
    pub async fn open_in_memory() -> Result<Self, Error> {
        let conn = Connection::open_in_memory()
            .await
            .map_err(|e| Error::Database(Arc::new(e.into())))?;
        Self::init(conn).await
    }

    async fn init(conn: Connection) -> Result<Self, Error> {
        conn.call(|conn| {
            conn.execute_batch(
                "PRAGMA journal_mode=WAL;
                 PRAGMA synchronous=NORMAL;
                 PRAGMA temp_store=MEMORY;
                 PRAGMA foreign_keys=ON;",
            )?;
            Ok(())
        })
        .await
        .map_err(|e| Error::Database(Arc::new(e)))?;

        migrations::run(&conn).await?;

        let db = Self { conn, clock: Arc::new(SystemClock) };
        db.sweep().await;
        Ok(db)
    }

    /// Replace the time source used for expiry decisions.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Current time according to this store's clock.
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Close the underlying connection.
    ///
    /// Other clones of this handle fail with `CACHE_UNAVAILABLE` afterwards.
    pub async fn close(self) -> Result<(), Error> {
        self.conn.close().await.map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheKey, FixedClock};
    use chrono::TimeZone;

    #[tokio::test]
    async fn test_open_in_memory() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let version = db
            .conn
            .call(|conn| conn.query_row("SELECT sqlite_version()", [], |row| row.get::<_, String>(0)))
            .await
            .unwrap();
        assert!(!version.is_empty());
    }

    #[tokio::test]
    async fn test_with_clock() {
        let at = Utc.with_ymd_and_hms(2025, 10, 22, 10, 0, 0).unwrap();
        let db = CacheDb::open_in_memory().await.unwrap().with_clock(Arc::new(FixedClock(at)));
        assert_eq!(db.now(), at);
    }

    #[tokio::test]
    async fn test_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.sqlite");
        let key = CacheKey::new("https://example.com/menu", Utc::now().date_naive() + chrono::Days::new(2));

        let db = CacheDb::open(&path).await.unwrap();
        db.put_menu(&key, "{\"items\":[]}").await.unwrap();
        db.close().await.unwrap();

        let reopened = CacheDb::open(&path).await.unwrap();
        assert_eq!(reopened.get_menu(&key).await.unwrap().as_deref(), Some("{\"items\":[]}"));
    }

    #[tokio::test]
    async fn test_open_sweeps_expired_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.sqlite");
        let stale = CacheKey::parse("https://example.com/menu", "2020-01-01").unwrap();
        let past = Utc.with_ymd_and_hms(2020, 1, 1, 8, 0, 0).unwrap();

        let db = CacheDb::open(&path).await.unwrap();
        db.put_menu_at(&stale, "{}", past).await.unwrap();
        assert_eq!(db.count_menus().await.unwrap(), 1);
        db.close().await.unwrap();

        let reopened = CacheDb::open(&path).await.unwrap();
        assert_eq!(reopened.count_menus().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_closed_handle_reports_cache_error() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let other = db.clone();
        db.close().await.unwrap();

        let key = CacheKey::parse("https://example.com/menu", "2025-10-22").unwrap();
        let err = other.get_menu(&key).await.unwrap_err();
        assert!(err.is_cache_error());
    }
}
