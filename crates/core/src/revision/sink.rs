//! Remote commit sink contract.

use crate::Error;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::io::{self, Read};

/// Answer of the remote side to a pushed revision document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushOutcome {
    /// HTTP-style status code.
    pub status: u16,
    /// Tracking handle (task location) for asynchronous application, if any.
    pub task: Option<String>,
}

impl PushOutcome {
    pub fn accepted(task: Option<String>) -> Self {
        Self { status: 202, task }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// A finished revision document, read from the staging buffer.
///
/// The document is streamed from wherever it was staged (memory or a
/// temporary file); it is never required to be contiguous in memory.
pub struct CommitDocument<'a> {
    reader: &'a mut (dyn Read + Send),
    len: u64,
}

impl<'a> CommitDocument<'a> {
    /// Document of `len` bytes produced by `reader`.
    pub fn new(reader: &'a mut (dyn Read + Send), len: u64) -> Self {
        Self { reader, len }
    }

    /// Size of the whole document in bytes.
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Read the rest of the document into memory.
    pub fn into_bytes(mut self) -> io::Result<Bytes> {
        let mut buf = Vec::with_capacity(usize::try_from(self.len).unwrap_or(0));
        self.read_to_end(&mut buf)?;
        Ok(Bytes::from(buf))
    }
}

impl Read for CommitDocument<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.reader.read(buf)
    }
}

impl std::fmt::Debug for CommitDocument<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommitDocument").field("len", &self.len).finish_non_exhaustive()
    }
}

/// Receiver of finished revision documents.
///
/// Implementations return `Ok` with the remote status for every answered
/// request (including rejections) and `Err` only when no answer was obtained.
/// A sink may stop reading the document early; the buffer restores its
/// state either way.
#[async_trait::async_trait]
pub trait CommitSink: Send + Sync {
    /// Deliver `document`, a complete JSON object, to the entity at `uri`.
    async fn push(&self, uri: &str, document: CommitDocument<'_>) -> Result<PushOutcome, Error>;
}

/// Record of a delivered revision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitReceipt {
    pub uri: String,
    pub entries: usize,
    pub payload_size: u64,
    pub status: u16,
    pub task: Option<String>,
}
