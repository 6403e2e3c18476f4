//! JSON document layer over a [`CacheEngine`].

use super::connection::SqliteEngine;
use super::engine::CacheEngine;
use crate::Error;
use crate::config::AppConfig;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;

/// Key to JSON-document cache shared by the entities of one session.
///
/// Cloning is cheap; clones share the same engine.
#[derive(Clone)]
pub struct CacheStore {
    engine: Arc<dyn CacheEngine>,
}

impl std::fmt::Debug for CacheStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheStore").finish_non_exhaustive()
    }
}

impl CacheStore {
    pub fn new(engine: Arc<dyn CacheEngine>) -> Self {
        Self { engine }
    }

    /// Build the SQLite-backed store described by `config`.
    ///
    /// Uses `cache_dir` when set, otherwise a private temporary directory.
    pub async fn from_config(config: &AppConfig) -> Result<Self, Error> {
        let engine = match &config.cache_dir {
            Some(dir) => SqliteEngine::open(dir).await?,
            None => SqliteEngine::temporary().await?,
        };
        Ok(Self::new(Arc::new(engine)))
    }

    /// Whether a value is cached for `key`. The value is not decoded.
    pub async fn exists(&self, key: &str) -> Result<bool, Error> {
        self.engine.contains(key).await
    }

    /// Decoded value for `key`, or `None` on a miss.
    ///
    /// # Errors
    ///
    /// Returns `Error::Decode` if the stored bytes are not valid JSON for `T`.
    /// The corrupt entry is left in place.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, Error> {
        let Some(raw) = self.engine.load(key).await? else {
            return Ok(None);
        };
        serde_json::from_slice(&raw)
            .map(Some)
            .map_err(|e| Error::Decode { key: key.to_string(), reason: e.to_string() })
    }

    /// Decoded value for `key`, or `default` on a miss.
    pub async fn get_or<T: DeserializeOwned>(&self, key: &str, default: T) -> Result<T, Error> {
        Ok(self.get(key).await?.unwrap_or(default))
    }

    /// Encode `value` as JSON and store it under `key`.
    ///
    /// Encoding happens before the engine is touched, so a value that
    /// cannot be serialized leaves the previous entry intact.
    pub async fn put<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), Error> {
        let raw = serde_json::to_vec(value).map_err(|e| Error::Encode(e.to_string()))?;
        self.engine.store(key, raw).await
    }

    /// Remove the entry for `key`, if any.
    pub async fn delete(&self, key: &str) -> Result<(), Error> {
        self.engine.remove(key).await
    }

    /// Drop the cached state of an entity so the next read re-fetches it.
    pub async fn invalidate(&self, key: &str) -> Result<(), Error> {
        tracing::debug!("invalidating cache entry '{key}'");
        self.delete(key).await
    }

    /// Erase all entries and remove the backing location.
    ///
    /// Best effort: failures are logged, never returned.
    pub async fn destroy(&self) {
        if let Err(e) = self.engine.destroy().await {
            tracing::warn!("failed to destroy cache store: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::memory::MemoryEngine;
    use serde_json::json;

    async fn sqlite_store() -> CacheStore {
        CacheStore::new(Arc::new(SqliteEngine::open_in_memory().await.unwrap()))
    }

    #[tokio::test]
    async fn test_exists_lifecycle() {
        let store = sqlite_store().await;
        assert!(!store.exists("repo/DS").await.unwrap());

        store.put("repo/DS", &json!({"rev": 3})).await.unwrap();
        assert!(store.exists("repo/DS").await.unwrap());

        store.delete("repo/DS").await.unwrap();
        assert!(!store.exists("repo/DS").await.unwrap());
    }

    #[tokio::test]
    async fn test_round_trip_nested_document() {
        let store = sqlite_store().await;
        let doc = json!({
            "kind": "datagator#DataSet",
            "name": "IGO_Members",
            "rev": 12,
            "items": [{"name": "UN"}, {"name": "WTO"}],
            "ratio": 0.25,
            "note": "unicode \u{00e9}\u{4e2d}",
            "missing": null,
        });
        store.put("Pardee/IGO_Members", &doc).await.unwrap();

        let back: serde_json::Value = store.get("Pardee/IGO_Members").await.unwrap().unwrap();
        assert_eq!(back, doc);
    }

    #[tokio::test]
    async fn test_tuple_round_trips_as_array() {
        let store = CacheStore::new(Arc::new(MemoryEngine::new()));
        store.put("pair", &("UN", 1945)).await.unwrap();

        let back: serde_json::Value = store.get("pair").await.unwrap().unwrap();
        assert_eq!(back, json!(["UN", 1945]));
    }

    #[tokio::test]
    async fn test_get_or_default_on_miss() {
        let store = sqlite_store().await;
        let value = store.get_or("absent", json!({"items": []})).await.unwrap();
        assert_eq!(value, json!({"items": []}));
        assert!(store.get::<serde_json::Value>("absent").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_corrupt_entry_is_decode_error_and_kept() {
        let engine = Arc::new(MemoryEngine::new());
        engine.store("repo", b"{not json".to_vec()).await.unwrap();
        let store = CacheStore::new(engine.clone());

        let result = store.get::<serde_json::Value>("repo").await;
        assert!(matches!(result, Err(Error::Decode { key, .. }) if key == "repo"));
        assert!(store.exists("repo").await.unwrap());
        assert_eq!(engine.load("repo").await.unwrap().unwrap(), b"{not json");
    }

    #[tokio::test]
    async fn test_encode_failure_keeps_previous_value() {
        let store = sqlite_store().await;
        store.put("repo", &json!(1)).await.unwrap();

        let mut bad = std::collections::HashMap::new();
        bad.insert((1, 2), "tuple keys are not JSON object keys");
        let result = store.put("repo", &bad).await;
        assert!(matches!(result, Err(Error::Encode(_))));

        assert_eq!(store.get::<i64>("repo").await.unwrap(), Some(1));
    }

    #[tokio::test]
    async fn test_invalidate_then_miss() {
        let store = sqlite_store().await;
        store.put("repo/DS", &json!({"rev": 1})).await.unwrap();
        store.invalidate("repo/DS").await.unwrap();
        assert!(store.get::<serde_json::Value>("repo/DS").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_from_config_uses_cache_dir() {
        let parent = tempfile::tempdir().unwrap();
        let dir = parent.path().join("cache");
        let config = AppConfig { cache_dir: Some(dir.clone()), ..Default::default() };

        let store = CacheStore::from_config(&config).await.unwrap();
        store.put("repo", &json!({"name": "repo"})).await.unwrap();
        assert!(dir.join(crate::cache::connection::DB_FILE).exists());

        store.destroy().await;
        assert!(!dir.exists());
    }

    #[tokio::test]
    async fn test_clones_share_engine() {
        let store = CacheStore::new(Arc::new(MemoryEngine::new()));
        let other = store.clone();
        store.put("repo", &json!(true)).await.unwrap();
        assert!(other.exists("repo").await.unwrap());
    }
}
