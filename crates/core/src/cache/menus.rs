//! Menu cache operations.
//!
//! Rows live until the local midnight following their date. Reads past that
//! point delete the row and report a miss; sweeps delete every expired row.

use super::clock::format_timestamp;
use super::connection::CacheDb;
use super::key::CacheKey;
use crate::Error;
use chrono::{DateTime, Utc};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

impl CacheDb {
    /// Get the cached payload for a key, using this store's clock.
    pub async fn get_menu(&self, key: &CacheKey) -> Result<Option<String>, Error> {
        self.get_menu_at(key, self.now()).await
    }

    /// Get the cached payload for a key as of `now`.
    ///
    /// A row whose expiry has been reached is deleted in the same call and
    /// reported as absent, so a stale payload is never returned.
    pub async fn get_menu_at(&self, key: &CacheKey, now: DateTime<Utc>) -> Result<Option<String>, Error> {
        let url = key.url.clone();
        let date = key.iso_date();
        let now = format_timestamp(&now);
        self.conn
            .call(move |conn| -> Result<Option<String>, Error> {
                let row = conn.query_row(
                    "SELECT payload, expires_at FROM menu_cache WHERE url = ?1 AND menu_date = ?2",
                    params![url, date],
                    |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
                );

                match row {
                    Ok((payload, expires_at)) if now < expires_at => Ok(Some(payload)),
                    Ok(_) => {
                        conn.execute(
                            "DELETE FROM menu_cache WHERE url = ?1 AND menu_date = ?2 AND expires_at <= ?3",
                            params![url, date, now],
                        )?;
                        tracing::debug!(%url, %date, "dropped expired menu on read");
                        Ok(None)
                    }
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Store a payload for a key, using this store's clock.
    pub async fn put_menu(&self, key: &CacheKey, payload: &str) -> Result<(), Error> {
        self.put_menu_at(key, payload, self.now()).await
    }

    /// Insert or replace the payload for a key.
    ///
    /// Uses UPSERT semantics: a second write for the same key replaces the
    /// first in place and recomputes its expiry.
    pub async fn put_menu_at(&self, key: &CacheKey, payload: &str, now: DateTime<Utc>) -> Result<(), Error> {
        let url = key.url.clone();
        let date = key.iso_date();
        let payload = payload.to_string();
        let created_at = format_timestamp(&now);
        let expires_at = format_timestamp(&key.expires_at());
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO menu_cache (url, menu_date, payload, created_at, expires_at)
                     VALUES (?1, ?2, ?3, ?4, ?5)
                     ON CONFLICT(url, menu_date) DO UPDATE SET
                        payload = excluded.payload,
                        created_at = excluded.created_at,
                        expires_at = excluded.expires_at",
                    params![url, date, payload, created_at, expires_at],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Delete expired menus.
    ///
    /// Returns the number of deleted entries.
    pub async fn purge_expired_menus(&self) -> Result<u64, Error> {
        self.purge_expired_menus_at(self.now()).await
    }

    /// Delete every menu whose expiry is before `now`.
    ///
    /// Returns the number of deleted entries.
    pub async fn purge_expired_menus_at(&self, now: DateTime<Utc>) -> Result<u64, Error> {
        let now = format_timestamp(&now);
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count = conn.execute("DELETE FROM menu_cache WHERE expires_at < ?1", params![now])?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }

    /// Sweep expired menus, logging instead of failing.
    ///
    /// Maintenance must never fail a caller, so errors are swallowed and
    /// reported as zero deletions.
    pub async fn sweep(&self) -> u64 {
        match self.purge_expired_menus().await {
            Ok(0) => 0,
            Ok(rows) => {
                tracing::info!(rows, "swept expired menus");
                rows
            }
            Err(e) => {
                tracing::warn!(error = %e, "menu cache sweep failed");
                0
            }
        }
    }

    /// Delete every cached date for one source URL.
    ///
    /// Returns the number of deleted entries.
    pub async fn purge_menus_for_url(&self, url: &str) -> Result<u64, Error> {
        let url = url.to_string();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count = conn.execute("DELETE FROM menu_cache WHERE url = ?1", params![url])?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }

    /// Number of stored rows, expired or not.
    pub async fn count_menus(&self) -> Result<u64, Error> {
        self.conn
            .call(|conn| -> Result<u64, Error> {
                let count: i64 = conn.query_row("SELECT COUNT(*) FROM menu_cache", [], |row| row.get(0))?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }
}
