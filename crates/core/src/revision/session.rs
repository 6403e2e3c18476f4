//! Scoped write sessions over a revision buffer.

use super::{CommitReceipt, RevisionBuffer};
use crate::Error;
use serde::Serialize;
use std::io::Read;

/// A bracket of writes committed together by [`close`](Self::close).
///
/// Dropping the session without closing it, typically because an error was
/// propagated out of the bracket, leaves the written entries pending in the
/// buffer. They are delivered by the next successful commit.
pub struct RevisionSession<'a> {
    buffer: &'a mut RevisionBuffer,
    closed: bool,
}

impl<'a> RevisionSession<'a> {
    pub(super) fn new(buffer: &'a mut RevisionBuffer) -> Self {
        Self { buffer, closed: false }
    }

    pub async fn write<V: Serialize + ?Sized>(&mut self, key: &str, value: &V) -> Result<Option<CommitReceipt>, Error> {
        self.buffer.write(key, value).await
    }

    pub async fn write_raw<R: Read + Send>(&mut self, key: &str, reader: R) -> Result<Option<CommitReceipt>, Error> {
        self.buffer.write_raw(key, reader).await
    }

    /// Pending entries in the underlying buffer.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Commit everything written so far.
    pub async fn close(mut self) -> Result<Option<CommitReceipt>, Error> {
        self.closed = true;
        self.buffer.commit().await
    }

    /// End the session without committing; entries stay pending.
    pub fn abandon(mut self) {
        self.closed = true;
        tracing::debug!(uri = %self.buffer.uri(), entries = self.buffer.len(), "revision session abandoned");
    }
}

impl Drop for RevisionSession<'_> {
    fn drop(&mut self) {
        if !self.closed && !self.buffer.is_empty() {
            tracing::warn!(
                uri = %self.buffer.uri(),
                entries = self.buffer.len(),
                "revision session ended without close; entries left pending"
            );
        }
    }
}
