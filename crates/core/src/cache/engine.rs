//! Storage engine contract behind [`CacheStore`](super::CacheStore).

use crate::Error;

/// Raw key/bytes storage used by the cache store.
///
/// Engines must make each single-key operation atomic: a concurrent reader
/// observes either the previous value or the new one, never a partial write.
/// Cross-key transactions are not required.
#[async_trait::async_trait]
pub trait CacheEngine: Send + Sync {
    /// Whether a value is stored for `key`, without materializing it.
    async fn contains(&self, key: &str) -> Result<bool, Error>;

    /// Stored bytes for `key`, if any.
    async fn load(&self, key: &str) -> Result<Option<Vec<u8>>, Error>;

    /// Store `value` under `key`, replacing any previous value.
    async fn store(&self, key: &str, value: Vec<u8>) -> Result<(), Error>;

    /// Remove `key`. Removing an absent key succeeds.
    async fn remove(&self, key: &str) -> Result<(), Error>;

    /// Erase every entry and release the storage location.
    ///
    /// Called once at teardown; the engine is unusable afterwards.
    async fn destroy(&self) -> Result<(), Error>;
}
