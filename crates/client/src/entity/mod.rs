//! Remote entities backed by the cache store and revision buffers.
//!
//! Reads go through the session's [`CacheStore`]: a cached document is
//! served locally, a miss is fetched from the service and memoized. Writes
//! go through a per-entity [`RevisionBuffer`](datagator_core::RevisionBuffer)
//! and invalidate the cached document once the revision is committed.

pub mod dataset;
pub mod repo;

pub use dataset::DataSet;
pub use repo::Repo;

use crate::service::{HttpService, Service};
use datagator_core::{AppConfig, CacheStore, CommitSink, Error, RevisionLimits};
use regex::Regex;
use serde_json::Value;
use std::sync::{Arc, LazyLock};

/// Maximum length of a repository or data set name.
pub const MAX_NAME_LEN: usize = 64;

static NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_][A-Za-z0-9_\-\.]*$").expect("entity name pattern is valid"));

/// Check that `name` is usable as a repository or data set name.
pub fn validate_name(name: &str) -> Result<(), Error> {
    if name.is_empty() || name.len() > MAX_NAME_LEN || !NAME_RE.is_match(name) {
        return Err(Error::InvalidName(format!("'{name}'")));
    }
    Ok(())
}

/// Shared state of the entities of one client session.
pub struct Context<S> {
    service: Arc<S>,
    cache: CacheStore,
    limits: RevisionLimits,
    v1: bool,
}

impl<S> Clone for Context<S> {
    fn clone(&self) -> Self {
        Self { service: self.service.clone(), cache: self.cache.clone(), limits: self.limits, v1: self.v1 }
    }
}

impl Context<HttpService> {
    /// HTTP service and SQLite cache built from the configuration.
    pub async fn connect(config: &AppConfig) -> Result<Self, Error> {
        let service = Arc::new(HttpService::new(config)?);
        let cache = CacheStore::from_config(config).await?;
        Ok(Self::new(service, cache).with_limits(RevisionLimits::from(config)).with_v1_api(config.is_v1()))
    }
}

impl<S: Service + 'static> Context<S> {
    pub fn new(service: Arc<S>, cache: CacheStore) -> Self {
        Self { service, cache, limits: RevisionLimits::default(), v1: false }
    }

    pub fn with_limits(mut self, limits: RevisionLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Follow the v1 protocol, where data set creation is an async task.
    pub fn with_v1_api(mut self, v1: bool) -> Self {
        self.v1 = v1;
        self
    }

    /// Statuses the service answers a successful data set creation with.
    pub(crate) fn creation_statuses(&self) -> &'static [u16] {
        if self.v1 { &[202] } else { &[200, 201] }
    }

    /// URI a data set reference is PUT to: the repository under v1, the
    /// data set itself since v2.
    pub(crate) fn creation_target<'a>(&self, repo_uri: &'a str, dataset_uri: &'a str) -> &'a str {
        if self.v1 { repo_uri } else { dataset_uri }
    }

    pub fn service(&self) -> &Arc<S> {
        &self.service
    }

    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    pub fn limits(&self) -> RevisionLimits {
        self.limits
    }

    pub(crate) fn sink(&self) -> Arc<dyn CommitSink> {
        self.service.clone()
    }

    /// Document of the entity at `uri`, from the cache or the service.
    pub async fn cached(&self, uri: &str) -> Result<Option<Value>, Error> {
        if let Some(doc) = self.cache.get::<Value>(uri).await? {
            tracing::debug!("cache hit for '{uri}'");
            return Ok(Some(doc));
        }
        let Some(doc) = self.service.fetch(uri).await? else {
            return Ok(None);
        };
        if let Err(e) = self.cache.put(uri, &doc).await {
            tracing::warn!("failed to cache '{uri}': {e}");
        }
        Ok(Some(doc))
    }

    /// Forget the cached document of `uri`.
    pub async fn invalidate(&self, uri: &str) -> Result<(), Error> {
        self.cache.invalidate(uri).await
    }

    /// Tear down the session cache.
    pub async fn close(self) {
        self.cache.destroy().await;
    }
}
