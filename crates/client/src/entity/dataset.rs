//! Data sets: named collections of JSON items inside a repository.

use super::{Context, validate_name};
use crate::service::Service;
use datagator_core::{CommitReceipt, Error, RevisionBuffer};
use serde::Serialize;
use serde_json::{Value, json};
use std::io::Read;

/// A data set of a repository, written through its own revision buffer.
pub struct DataSet<S: Service + 'static> {
    ctx: Context<S>,
    repo: String,
    name: String,
    rev: RevisionBuffer,
}

impl<S: Service + 'static> DataSet<S> {
    pub(crate) fn new(ctx: Context<S>, repo: &str, name: &str) -> Result<Self, Error> {
        validate_name(name)?;
        let rev = RevisionBuffer::with_limits(format!("{repo}/{name}"), ctx.sink(), ctx.limits())?;
        Ok(Self { ctx, repo: repo.to_string(), name: name.to_string(), rev })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn repo_name(&self) -> &str {
        &self.repo
    }

    /// `<repo>/<name>`
    pub fn uri(&self) -> &str {
        self.rev.uri()
    }

    pub fn reference(&self) -> Value {
        json!({
            "kind": "datagator#DataSet",
            "name": self.name,
            "repo": {"kind": "datagator#Repo", "name": self.repo},
        })
    }

    /// Entries written but not yet committed.
    pub fn pending(&self) -> usize {
        self.rev.len()
    }

    async fn content(&self) -> Result<Value, Error> {
        self.ctx
            .cached(self.uri())
            .await?
            .ok_or_else(|| Error::NotFound(format!("data set '{}'", self.uri())))
    }

    /// Latest revision number known to the service.
    ///
    /// A cached document without a revision was stored before the data set
    /// had one; it is refetched once.
    pub async fn rev(&self) -> Result<u64, Error> {
        let mut doc = self.content().await?;
        if doc.get("rev").is_none() {
            self.ctx.invalidate(self.uri()).await?;
            doc = self.content().await?;
        }
        Ok(doc.get("rev").and_then(Value::as_u64).unwrap_or(0))
    }

    pub async fn item_names(&self) -> Result<Vec<String>, Error> {
        let doc = self.content().await?;
        Ok(names_of(&doc))
    }

    /// Number of items, as reported by the service.
    pub async fn len(&self) -> Result<usize, Error> {
        let doc = self.content().await?;
        Ok(count_of(&doc))
    }

    pub async fn set_item<V: Serialize + ?Sized>(&mut self, key: &str, value: &V) -> Result<(), Error> {
        self.update([(key, value)]).await
    }

    /// Store an item from pre-serialized JSON.
    pub async fn set_raw<R: Read + Send>(&mut self, key: &str, reader: R) -> Result<(), Error> {
        let mut receipts = Vec::new();
        let result = async {
            let mut session = self.rev.session()?;
            receipts.extend(session.write_raw(key, reader).await?);
            receipts.extend(session.close().await?);
            Ok::<_, Error>(())
        }
        .await;
        self.settle(&receipts, result).await
    }

    /// Remove an item; the service drops keys revised to `null`.
    pub async fn delete_item(&mut self, key: &str) -> Result<(), Error> {
        self.update([(key, Value::Null)]).await
    }

    /// Write all `items` in one revision session.
    pub async fn update<I, K, V>(&mut self, items: I) -> Result<(), Error>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Serialize,
    {
        let mut receipts = Vec::new();
        let result = async {
            let mut session = self.rev.session()?;
            for (key, value) in items {
                receipts.extend(session.write(key.as_ref(), &value).await?);
            }
            receipts.extend(session.close().await?);
            Ok::<_, Error>(())
        }
        .await;
        self.settle(&receipts, result).await
    }

    /// Commit entries left pending by an earlier failure.
    pub async fn commit(&mut self) -> Result<Option<CommitReceipt>, Error> {
        let receipt = self.rev.commit().await?;
        self.settle(receipt.as_slice(), Ok(())).await?;
        Ok(receipt)
    }

    /// Commit pending entries and release the revision buffer.
    pub async fn finish(self) -> Result<Option<CommitReceipt>, Error> {
        let Self { ctx, rev, .. } = self;
        let uri = rev.uri().to_string();
        let receipt = rev.finish().await?;
        if receipt.is_some() {
            ctx.invalidate(&uri).await?;
        }
        Ok(receipt)
    }

    /// Invalidate the cached document once anything reached the service.
    async fn settle(&self, receipts: &[CommitReceipt], result: Result<(), Error>) -> Result<(), Error> {
        for receipt in receipts {
            tracing::debug!(
                uri = %receipt.uri,
                entries = receipt.entries,
                payload_size = receipt.payload_size,
                task = receipt.task.as_deref().unwrap_or("-"),
                "revision committed"
            );
        }
        if receipts.is_empty() && result.is_err() {
            return result;
        }
        if let Err(e) = self.ctx.invalidate(self.uri()).await {
            if result.is_ok() {
                return Err(e);
            }
            tracing::warn!("failed to invalidate '{}': {}", self.uri(), e);
        }
        result
    }
}

pub(super) fn names_of(doc: &Value) -> Vec<String> {
    doc.get("items")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.get("name").and_then(Value::as_str).map(String::from))
                .collect()
        })
        .unwrap_or_default()
}

pub(super) fn count_of(doc: &Value) -> usize {
    doc.get("itemsCount").and_then(Value::as_u64).unwrap_or(0) as usize
}
