//! Repositories: the top-level namespace of data sets.

use super::dataset::{count_of, names_of};
use super::{Context, DataSet, validate_name};
use crate::service::Service;
use datagator_core::Error;
use serde::Serialize;
use serde_json::{Value, json};

/// An existing repository on the service.
pub struct Repo<S: Service + 'static> {
    ctx: Context<S>,
    name: String,
}

impl<S: Service + 'static> Repo<S> {
    /// Open the repository `name`.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidName` for a malformed name and
    /// `Error::NotFound` if the service does not know the repository.
    pub async fn open(ctx: Context<S>, name: &str) -> Result<Self, Error> {
        validate_name(name)?;
        if ctx.cached(name).await?.is_none() {
            return Err(Error::NotFound(format!("repository '{name}'")));
        }
        tracing::debug!("opened repository '{name}'");
        Ok(Self { ctx, name: name.to_string() })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn uri(&self) -> &str {
        &self.name
    }

    pub fn context(&self) -> &Context<S> {
        &self.ctx
    }

    pub fn reference(&self) -> Value {
        json!({"kind": "datagator#Repo", "name": self.name})
    }

    async fn content(&self) -> Result<Value, Error> {
        self.ctx
            .cached(self.uri())
            .await?
            .ok_or_else(|| Error::NotFound(format!("repository '{}'", self.name)))
    }

    /// Whether the data set `name` exists. Malformed names never do.
    pub async fn contains(&self, name: &str) -> Result<bool, Error> {
        if validate_name(name).is_err() {
            return Ok(false);
        }
        let uri = format!("{}/{}", self.name, name);
        if self.ctx.cache().exists(&uri).await? {
            return Ok(true);
        }
        Ok(self.ctx.cached(&uri).await?.is_some())
    }

    /// Handle to the existing data set `name`.
    pub async fn dataset(&self, name: &str) -> Result<DataSet<S>, Error> {
        if !self.contains(name).await? {
            return Err(Error::NotFound(format!("data set '{}/{}'", self.name, name)));
        }
        DataSet::new(self.ctx.clone(), &self.name, name)
    }

    /// Create (or replace) the data set `name` and write `items` into it.
    pub async fn create_dataset<I, K, V>(&self, name: &str, items: I) -> Result<DataSet<S>, Error>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Serialize,
    {
        let mut ds = DataSet::new(self.ctx.clone(), &self.name, name)?;

        let target = self.ctx.creation_target(self.uri(), ds.uri());
        let outcome = self.ctx.service().put(target, &ds.reference()).await?;
        if !self.ctx.creation_statuses().contains(&outcome.status) {
            return Err(Error::Rejected { uri: target.to_string(), status: outcome.status });
        }
        if let Some(task) = &outcome.task {
            tracing::debug!("data set '{}' creation queued as {}", ds.uri(), task);
        }

        self.ctx.invalidate(ds.uri()).await?;
        self.ctx.invalidate(self.uri()).await?;

        ds.update(items).await?;
        Ok(ds)
    }

    pub async fn dataset_names(&self) -> Result<Vec<String>, Error> {
        let doc = self.content().await?;
        Ok(names_of(&doc))
    }

    /// Number of data sets, as reported by the service.
    pub async fn len(&self) -> Result<usize, Error> {
        let doc = self.content().await?;
        Ok(count_of(&doc))
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::{FakeService, context};
    use super::*;

    #[tokio::test]
    async fn test_open_existing() {
        let service = FakeService::with_repo("Pardee");
        let repo = Repo::open(context(&service), "Pardee").await.unwrap();
        assert_eq!(repo.name(), "Pardee");
        assert_eq!(repo.uri(), "Pardee");
        assert_eq!(repo.reference(), json!({"kind": "datagator#Repo", "name": "Pardee"}));
        assert_eq!(repo.len().await.unwrap(), 0);
        assert_eq!(service.fetch_count("Pardee"), 1);
    }

    #[tokio::test]
    async fn test_open_missing_or_malformed() {
        let service = FakeService::with_repo("Pardee");
        assert!(matches!(Repo::open(context(&service), "NonExistence").await, Err(Error::NotFound(_))));
        assert!(matches!(Repo::open(context(&service), "Not A Repo").await, Err(Error::InvalidName(_))));
    }

    #[tokio::test]
    async fn test_create_dataset_writes_items() {
        let service = FakeService::with_repo("Pardee");
        let repo = Repo::open(context(&service), "Pardee").await.unwrap();

        let ds = repo
            .create_dataset("IGO_Members", [("UN", json!({"members": 193})), ("WTO", json!({"members": 164}))])
            .await
            .unwrap();

        assert_eq!(ds.uri(), "Pardee/IGO_Members");
        assert_eq!(ds.len().await.unwrap(), 2);
        assert!(repo.contains("IGO_Members").await.unwrap());
        assert_eq!(repo.dataset_names().await.unwrap(), vec!["IGO_Members"]);
        assert_eq!(repo.len().await.unwrap(), 1);
        assert_eq!(service.fetch_count("Pardee"), 2);
    }

    #[tokio::test]
    async fn test_create_dataset_rejected_status() {
        let service = FakeService::with_repo("Pardee");
        let repo = Repo::open(context(&service), "Pardee").await.unwrap();
        *service.put_status.lock().unwrap() = Some(409);

        let result = repo.create_dataset("IGO_Members", Vec::<(&str, Value)>::new()).await;
        assert!(matches!(result, Err(Error::Rejected { status: 409, .. })));
        assert_eq!(service.push_count(), 0);
    }

    #[tokio::test]
    async fn test_create_dataset_v1_expects_accepted() {
        let service = FakeService::with_repo("Pardee");
        let repo = Repo::open(context(&service).with_v1_api(true), "Pardee").await.unwrap();

        let result = repo.create_dataset("IGO_Members", Vec::<(&str, Value)>::new()).await;
        assert!(matches!(result, Err(Error::Rejected { status: 201, .. })));

        *service.put_status.lock().unwrap() = Some(202);
        assert!(repo.create_dataset("IGO_Members", Vec::<(&str, Value)>::new()).await.is_ok());
    }

    #[tokio::test]
    async fn test_create_dataset_reference_target_by_version() {
        let service = FakeService::with_repo("Pardee");
        let repo = Repo::open(context(&service), "Pardee").await.unwrap();
        repo.create_dataset("IGO_Members", Vec::<(&str, Value)>::new()).await.unwrap();

        let repo = Repo::open(context(&service).with_v1_api(true), "Pardee").await.unwrap();
        *service.put_status.lock().unwrap() = Some(202);
        repo.create_dataset("Treaties", Vec::<(&str, Value)>::new()).await.unwrap();

        assert_eq!(*service.puts.lock().unwrap(), vec!["Pardee/IGO_Members".to_string(), "Pardee".to_string()]);
    }

    #[tokio::test]
    async fn test_contains_uses_cache_first() {
        let service = FakeService::with_repo("Pardee");
        let repo = Repo::open(context(&service), "Pardee").await.unwrap();
        repo.context().cache().put("Pardee/Cached", &json!({"name": "Cached"})).await.unwrap();

        assert!(repo.contains("Cached").await.unwrap());
        assert_eq!(service.fetch_count("Pardee/Cached"), 0);
        assert!(!repo.contains("Missing").await.unwrap());
        assert!(!repo.contains("bad name").await.unwrap());
        assert_eq!(service.fetch_count("Pardee/bad name"), 0);
    }

    #[tokio::test]
    async fn test_dataset_lookup() {
        let service = FakeService::with_repo("Pardee");
        let repo = Repo::open(context(&service), "Pardee").await.unwrap();
        repo.create_dataset("IGO_Members", [("UN", 1)]).await.unwrap();

        let ds = repo.dataset("IGO_Members").await.unwrap();
        assert_eq!(ds.item_names().await.unwrap(), vec!["UN"]);
        assert!(matches!(repo.dataset("Missing").await, Err(Error::NotFound(_))));
    }
}
