//! Revision buffering for batched remote commits.
//!
//! A [`RevisionBuffer`] accumulates key/value edits for one remote entity
//! into a single JSON object document and pushes it to a [`CommitSink`] as
//! one revision. The document is serialized incrementally into a [`Spool`]
//! as entries arrive:
//!
//! ```text
//! {"UN": {"a": 1}, "WTO": {"b": 2}}
//! ```
//!
//! A revision is committed when its size reaches `max_payload_bytes` or when
//! the caller commits explicitly (usually by closing a [`RevisionSession`]).
//! A failed push leaves every entry pending so the commit can be retried.

mod encode;
pub mod session;
pub mod sink;
pub mod spool;

pub use session::RevisionSession;
pub use sink::{CommitDocument, CommitReceipt, CommitSink, PushOutcome};
pub use spool::Spool;

use crate::Error;
use crate::config::AppConfig;
use serde::Serialize;
use std::io::Read;
use std::sync::Arc;

/// Default size at which a revision is committed automatically (16MB).
pub const MAX_PAYLOAD_SIZE: usize = 1 << 24;

/// Default in-memory size of the staging buffer before it spills to disk (64kB).
pub const MAX_BUFFER_SIZE: usize = 1 << 16;

/// Size bounds of a revision buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RevisionLimits {
    pub max_payload_bytes: usize,
    pub max_buffer_bytes: usize,
}

impl Default for RevisionLimits {
    fn default() -> Self {
        Self { max_payload_bytes: MAX_PAYLOAD_SIZE, max_buffer_bytes: MAX_BUFFER_SIZE }
    }
}

impl From<&AppConfig> for RevisionLimits {
    fn from(config: &AppConfig) -> Self {
        Self { max_payload_bytes: config.max_payload_bytes, max_buffer_bytes: config.max_buffer_bytes }
    }
}

/// Write accumulator bound to one remote entity.
///
/// Not meant for concurrent writers; every mutating method takes `&mut self`.
pub struct RevisionBuffer {
    uri: String,
    sink: Arc<dyn CommitSink>,
    limits: RevisionLimits,
    spool: Option<Spool>,
    entries: usize,
}

impl RevisionBuffer {
    /// New buffer for `uri` with default limits.
    pub fn new(uri: impl Into<String>, sink: Arc<dyn CommitSink>) -> Result<Self, Error> {
        Self::with_limits(uri, sink, RevisionLimits::default())
    }

    pub fn with_limits(uri: impl Into<String>, sink: Arc<dyn CommitSink>, limits: RevisionLimits) -> Result<Self, Error> {
        let mut buffer = Self { uri: uri.into(), sink, limits, spool: None, entries: 0 };
        buffer.rewind()?;
        Ok(buffer)
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn limits(&self) -> RevisionLimits {
        self.limits
    }

    /// Number of pending entries.
    pub fn len(&self) -> usize {
        self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries == 0
    }

    /// Serialized size of the pending document, without the closing brace.
    pub fn payload_size(&self) -> u64 {
        self.spool.as_ref().map_or(0, Spool::len)
    }

    /// Prepare a fresh document.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvariantViolation` if entries are pending; they must
    /// be committed first.
    pub fn rewind(&mut self) -> Result<(), Error> {
        if self.entries > 0 {
            return Err(Error::InvariantViolation(format!("cannot rewind a pending revision for '{}'", self.uri)));
        }
        if self.spool.is_some() {
            tracing::debug!("attempting to rewind an empty revision");
            return Ok(());
        }
        tracing::debug!("creating new revision for '{}'", self.uri);
        let mut spool = Spool::new(self.limits.max_buffer_bytes);
        spool.append(b"{")?;
        self.spool = Some(spool);
        Ok(())
    }

    /// Open a scoped write session.
    ///
    /// Entries still pending from an earlier session that was not closed are
    /// carried over and delivered when this session closes.
    pub fn session(&mut self) -> Result<RevisionSession<'_>, Error> {
        if self.entries == 0 {
            self.rewind()?;
        } else {
            tracing::warn!(uri = %self.uri, entries = self.entries, "carrying pending entries into new revision session");
        }
        Ok(RevisionSession::new(self))
    }

    /// Append `key` → `value`.
    ///
    /// Returns the receipt of the automatic commit if the document reached
    /// `max_payload_bytes`.
    ///
    /// # Errors
    ///
    /// Returns `Error::Encode` if `value` cannot be serialized; the buffer is
    /// unchanged. An automatic commit that fails returns its error with the
    /// entry kept pending.
    pub async fn write<V: Serialize + ?Sized>(&mut self, key: &str, value: &V) -> Result<Option<CommitReceipt>, Error> {
        let value = encode::to_vec(value).map_err(|e| Error::Encode(format!("value for '{key}': {e}")))?;
        self.append(key, &value).await
    }

    /// Append `key` → pre-serialized JSON read from `reader`, verbatim.
    pub async fn write_raw<R: Read + Send>(&mut self, key: &str, mut reader: R) -> Result<Option<CommitReceipt>, Error> {
        let mut value = Vec::new();
        reader.read_to_end(&mut value)?;
        if value.iter().all(u8::is_ascii_whitespace) {
            return Err(Error::Encode(format!("value for '{key}': empty pre-serialized payload")));
        }
        self.append(key, &value).await
    }

    async fn append(&mut self, key: &str, value: &[u8]) -> Result<Option<CommitReceipt>, Error> {
        let key_json = encode::to_vec(key)?;
        if self.spool.is_none() {
            self.rewind()?;
        }
        let spool = self
            .spool
            .as_mut()
            .ok_or_else(|| Error::InvariantViolation(format!("cannot write to an uninitialized revision for '{}'", self.uri)))?;

        let mut entry = Vec::with_capacity(key_json.len() + value.len() + 4);
        if self.entries > 0 {
            entry.extend_from_slice(b", ");
        }
        entry.extend_from_slice(&key_json);
        entry.extend_from_slice(b": ");
        entry.extend_from_slice(value);
        spool.append(&entry)?;
        let size = spool.len();
        self.entries += 1;
        tracing::debug!("  - '{key}'");

        if size < self.limits.max_payload_bytes as u64 {
            return Ok(None);
        }
        tracing::debug!(uri = %self.uri, size, "revision reached payload limit");
        self.commit().await
    }

    /// Close the document and push it to the sink.
    ///
    /// A no-op returning `Ok(None)` when nothing is pending.
    ///
    /// # Errors
    ///
    /// Returns `Error::CommitRejected` or `Error::CommitFailed` if the push
    /// does not succeed. All entries stay pending and calling `commit` again
    /// re-delivers the same document.
    pub async fn commit(&mut self) -> Result<Option<CommitReceipt>, Error> {
        if self.entries == 0 {
            tracing::debug!("attempting to commit an empty revision");
            return Ok(None);
        }
        let spool = self
            .spool
            .as_mut()
            .ok_or_else(|| Error::InvariantViolation("cannot commit an uninitialized revision".into()))?;
        let open_len = spool.len();
        close_document(spool, open_len)?;
        let payload_size = spool.len();

        tracing::debug!("committing revision");
        tracing::debug!("  - entries count: {}", self.entries);
        tracing::debug!("  - payload size: {payload_size}");

        let pushed = match spool.reader() {
            Ok(mut reader) => self.sink.push(&self.uri, CommitDocument::new(&mut reader, payload_size)).await,
            Err(e) => {
                spool.truncate(open_len)?;
                return Err(e.into());
            }
        };

        let failure = match pushed {
            Ok(outcome) if outcome.is_success() => {
                let receipt = CommitReceipt {
                    uri: self.uri.clone(),
                    entries: self.entries,
                    payload_size,
                    status: outcome.status,
                    task: outcome.task,
                };
                // prepare for consecutive revisions
                self.spool = None;
                self.entries = 0;
                if let Err(e) = self.rewind() {
                    tracing::warn!(uri = %self.uri, "failed to prepare next revision: {e}");
                }
                return Ok(Some(receipt));
            }
            Ok(outcome) => Error::CommitRejected { uri: self.uri.clone(), payload_size, status: outcome.status },
            Err(e) => Error::CommitFailed { uri: self.uri.clone(), payload_size, reason: e.to_string() },
        };

        tracing::error!("{failure}");
        if let Some(spool) = self.spool.as_mut() {
            spool.truncate(open_len)?;
        }
        Err(failure)
    }

    /// Commit whatever is pending and release the buffer.
    ///
    /// If the final commit fails the error is returned and the loss of the
    /// pending entries is logged when the buffer drops.
    pub async fn finish(mut self) -> Result<Option<CommitReceipt>, Error> {
        self.commit().await
    }
}

/// Append the closing brace.
///
/// On failure the spool is cut back to `open_len`, leaving the document open.
fn close_document(spool: &mut Spool, open_len: u64) -> Result<(), Error> {
    let closed = spool.append(b"}").and_then(|()| spool.flush());
    if let Err(e) = closed {
        spool.truncate(open_len)?;
        return Err(e.into());
    }
    Ok(())
}

impl Drop for RevisionBuffer {
    fn drop(&mut self) {
        if self.entries > 0 {
            tracing::error!(uri = %self.uri, entries = self.entries, "pending revision dropped without commit");
        }
    }
}

impl std::fmt::Debug for RevisionBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RevisionBuffer")
            .field("uri", &self.uri)
            .field("entries", &self.entries)
            .field("payload_size", &self.payload_size())
            .field("limits", &self.limits)
            .finish_non_exhaustive()
    }
}
