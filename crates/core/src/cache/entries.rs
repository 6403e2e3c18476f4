//! Cache entry CRUD on the SQLite engine.

use super::connection::SqliteEngine;
use super::engine::CacheEngine;
use crate::Error;
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

#[async_trait::async_trait]
impl CacheEngine for SqliteEngine {
    /// Existence check that never reads the value column.
    async fn contains(&self, key: &str) -> Result<bool, Error> {
        let key = key.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let found: bool = conn
                    .query_row(
                        "SELECT EXISTS(SELECT 1 FROM cache_entries WHERE key = ?1)",
                        params![key],
                        |row| row.get(0),
                    )
                    .map_err(Error::from)?;
                Ok(found)
            })
            .await
            .map_err(Error::from)
    }

    async fn load(&self, key: &str) -> Result<Option<Vec<u8>>, Error> {
        let key = key.to_string();
        self.conn
            .call(move |conn| -> Result<Option<Vec<u8>>, Error> {
                let mut stmt = conn.prepare("SELECT value FROM cache_entries WHERE key = ?1")?;

                match stmt.query_row(params![key], |row| row.get(0)) {
                    Ok(value) => Ok(Some(value)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Single UPSERT statement, so readers never see a half-written entry.
    async fn store(&self, key: &str, value: Vec<u8>) -> Result<(), Error> {
        let key = key.to_string();
        let updated_at = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO cache_entries (key, value, updated_at) VALUES (?1, ?2, ?3)
                    ON CONFLICT(key) DO UPDATE SET
                        value = excluded.value,
                        updated_at = excluded.updated_at",
                    params![key, value, updated_at],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    async fn remove(&self, key: &str) -> Result<(), Error> {
        let key = key.to_string();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute("DELETE FROM cache_entries WHERE key = ?1", params![key])?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    async fn destroy(&self) -> Result<(), Error> {
        let cleared = self
            .conn
            .call(|conn| -> Result<usize, Error> { Ok(conn.execute("DELETE FROM cache_entries", [])?) })
            .await
            .map_err(Error::from);
        match cleared {
            Ok(count) => tracing::debug!(entries = count, "cleared cache entries"),
            Err(e) => tracing::warn!("failed to clear cache entries: {e}"),
        }
        self.teardown().await;
        Ok(())
    }
}
