//! Cache schema migrations.
//!
//! Applied versions are recorded in `_migrations`; each pending migration runs
//! inside its own transaction together with its bookkeeping row, so a failed
//! step leaves the schema at the previous version.

use super::Error;
use super::clock::format_timestamp;
use tokio_rusqlite::{Connection, params};

struct Migration {
    version: i64,
    name: &'static str,
    sql: &'static str,
}

/// Ordered by version. Each SQL batch is safe to re-run.
const MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    name: "menu_cache",
    sql: include_str!("../../migrations/001_menu_cache.sql"),
}];

/// Bring the schema up to the latest version.
pub async fn run(conn: &Connection) -> Result<(), Error> {
    conn.call(|conn| -> Result<(), Error> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS _migrations (
                version INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                applied_at TEXT NOT NULL
            )",
        )?;

        let current: i64 = conn.query_row("SELECT COALESCE(MAX(version), 0) FROM _migrations", [], |row| row.get(0))?;

        for migration in MIGRATIONS.iter().filter(|m| m.version > current) {
            tracing::debug!(version = migration.version, name = migration.name, "applying cache migration");

            let tx = conn.transaction()?;
            tx.execute_batch(migration.sql)
                .map_err(|e| Error::MigrationFailed(format!("{} ({}): {e}", migration.name, migration.version)))?;
            tx.execute(
                "INSERT INTO _migrations (version, name, applied_at) VALUES (?1, ?2, ?3)",
                params![migration.version, migration.name, format_timestamp(&chrono::Utc::now())],
            )?;
            tx.commit()?;
        }

        Ok(())
    })
    .await
    .map_err(Error::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn object_exists(conn: &Connection, kind: &'static str, name: &'static str) -> bool {
        conn.call(move |conn| {
            conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = ?1 AND name = ?2)",
                params![kind, name],
                |row| row.get(0),
            )
        })
        .await
        .unwrap()
    }

    #[test]
    fn test_versions_strictly_increase() {
        assert!(MIGRATIONS.windows(2).all(|w| w[0].version < w[1].version));
        assert_eq!(MIGRATIONS[0].version, 1);
    }

    #[tokio::test]
    async fn test_creates_menu_cache_schema() {
        let conn = Connection::open_in_memory().await.unwrap();
        run(&conn).await.unwrap();

        assert!(object_exists(&conn, "table", "menu_cache").await);
        assert!(object_exists(&conn, "index", "idx_menu_cache_expires_at").await);
    }

    #[tokio::test]
    async fn test_rerun_applies_nothing_twice() {
        let conn = Connection::open_in_memory().await.unwrap();
        run(&conn).await.unwrap();
        run(&conn).await.unwrap();

        let applied: Vec<(i64, String)> = conn
            .call(|conn| {
                let mut stmt = conn.prepare("SELECT version, name FROM _migrations ORDER BY version")?;
                let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
                rows.collect::<Result<Vec<_>, _>>()
            })
            .await
            .unwrap();

        assert_eq!(applied, vec![(1, "menu_cache".to_string())]);
    }
}
