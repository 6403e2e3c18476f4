//! SQLite engine: connection management, pragmas and on-disk location.
//!
//! The database lives in a single directory owned by the engine. The
//! directory is destroyed when the engine is torn down, whether it was a
//! private temporary directory or one supplied by the caller.

use super::migrations;
use crate::Error;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tempfile::TempDir;
use tokio_rusqlite::Connection;

/// File name of the database inside the engine's directory.
pub const DB_FILE: &str = "cache.sqlite";

/// Suffix of private temporary cache directories.
const TEMP_SUFFIX: &str = ".DataGatorCache";

const PRAGMAS: &str = "PRAGMA journal_mode=WAL;
     PRAGMA synchronous=NORMAL;
     PRAGMA temp_store=MEMORY;
     PRAGMA foreign_keys=ON;";

/// Where the database files live.
#[derive(Debug)]
enum Location {
    Temporary(TempDir),
    Directory(PathBuf),
}

impl Location {
    fn path(&self) -> &Path {
        match self {
            Location::Temporary(dir) => dir.path(),
            Location::Directory(path) => path,
        }
    }

    /// Remove the database files and the directory. Failures are logged.
    fn remove(self) {
        match self {
            Location::Temporary(dir) => {
                let path = dir.path().to_path_buf();
                if let Err(e) = dir.close() {
                    tracing::warn!(path = %path.display(), "failed to remove cache directory: {e}");
                }
            }
            Location::Directory(path) => {
                for name in [DB_FILE.to_string(), format!("{DB_FILE}-wal"), format!("{DB_FILE}-shm")] {
                    let file = path.join(name);
                    match std::fs::remove_file(&file) {
                        Ok(()) => {}
                        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                        Err(e) => tracing::warn!(path = %file.display(), "failed to remove cache file: {e}"),
                    }
                }
                // Leaves the directory behind if the caller put other files in it.
                if let Err(e) = std::fs::remove_dir(&path) {
                    tracing::debug!(path = %path.display(), "cache directory not removed: {e}");
                }
            }
        }
    }
}

/// SQLite-backed cache engine.
///
/// Wraps a tokio-rusqlite Connection that runs database operations
/// on a background thread.
#[derive(Debug)]
pub struct SqliteEngine {
    pub(crate) conn: Connection,
    location: Mutex<Option<Location>>,
}

impl SqliteEngine {
    /// Open (or create) the cache database inside `dir`.
    ///
    /// Creates the directory if it doesn't exist, applies performance
    /// pragmas, and runs any pending migrations.
    pub async fn open(dir: impl AsRef<Path>) -> Result<Self, Error> {
        let dir = dir.as_ref().to_path_buf();
        let dir = blocking(move || std::fs::create_dir_all(&dir).map(|()| dir)).await?;
        Self::open_at(Location::Directory(dir)).await
    }

    /// Open a cache database in a private temporary directory.
    pub async fn temporary() -> Result<Self, Error> {
        let dir = blocking(|| tempfile::Builder::new().suffix(TEMP_SUFFIX).tempdir()).await?;
        Self::open_at(Location::Temporary(dir)).await
    }

    /// Open an in-memory database for testing.
    ///
    /// Uses the same pragma configuration and schema as file-based databases.
    pub async fn open_in_memory() -> Result<Self, Error> {
        let conn = Connection::open_in_memory()
            .await
            .map_err(|e| Error::Database(e.into()))?;
        configure(&conn).await?;
        Ok(Self { conn, location: Mutex::new(None) })
    }

    async fn open_at(location: Location) -> Result<Self, Error> {
        let path = location.path().join(DB_FILE);
        tracing::debug!(path = %path.display(), "opening cache database");

        let conn = Connection::open(&path).await.map_err(|e| Error::Database(e.into()))?;
        configure(&conn).await?;

        Ok(Self { conn, location: Mutex::new(Some(location)) })
    }

    /// Directory holding the database, if the engine is file-backed and
    /// has not been destroyed.
    pub fn dir(&self) -> Option<PathBuf> {
        self.location
            .lock()
            .ok()
            .and_then(|guard| guard.as_ref().map(|l| l.path().to_path_buf()))
    }

    /// Close the connection and remove the on-disk location.
    ///
    /// Never fails: every problem is logged and suppressed.
    pub(crate) async fn teardown(&self) {
        if let Err(e) = self.conn.clone().close().await {
            tracing::warn!("failed to close cache database: {e}");
        }
        let location = match self.location.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(location) = location
            && let Err(e) = tokio::task::spawn_blocking(move || location.remove()).await
        {
            tracing::warn!("cache location removal did not finish: {e}");
        }
    }
}

/// Run filesystem work on the blocking pool.
async fn blocking<T, F>(f: F) -> Result<T, Error>
where
    T: Send + 'static,
    F: FnOnce() -> io::Result<T> + Send + 'static,
{
    let result = tokio::task::spawn_blocking(f).await.map_err(io::Error::other)?;
    Ok(result?)
}

impl Drop for SqliteEngine {
    fn drop(&mut self) {
        let location = match self.location.get_mut() {
            Ok(slot) => slot.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(location) = location {
            tracing::debug!(path = %location.path().display(), "removing cache location on drop");
            location.remove();
        }
    }
}

async fn configure(conn: &Connection) -> Result<(), Error> {
    conn.call(|conn| {
        conn.execute_batch(PRAGMAS)?;
        Ok(())
    })
    .await
    .map_err(Error::Database)?;

    migrations::run(conn).await
}
