//! Append-only staging file for revision documents.
//!
//! Small documents stay in memory; once the content grows past the
//! configured threshold it is moved to an anonymous temporary file.

#[cfg(test)]
use bytes::Bytes;
use std::io::{self, Read, Seek, SeekFrom, Write};
use tempfile::SpooledTempFile;

pub struct Spool {
    file: SpooledTempFile,
    len: u64,
}

impl Spool {
    /// New empty spool keeping up to `max_in_memory` bytes off disk.
    pub fn new(max_in_memory: usize) -> Self {
        Self { file: SpooledTempFile::new(max_in_memory), len: 0 }
    }

    /// Bytes written so far.
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Whether the content has spilled to disk.
    pub fn is_rolled_over(&self) -> bool {
        self.file.is_rolled()
    }

    /// Append `bytes` at the end.
    ///
    /// Either all bytes are appended or the spool is restored to its
    /// previous length.
    pub fn append(&mut self, bytes: &[u8]) -> io::Result<()> {
        if let Err(e) = self.file.write_all(bytes) {
            self.truncate(self.len)?;
            return Err(e);
        }
        self.len += bytes.len() as u64;
        Ok(())
    }

    /// Cut the content back to `len` bytes and continue appending from there.
    pub fn truncate(&mut self, len: u64) -> io::Result<()> {
        self.file.set_len(len)?;
        self.file.seek(SeekFrom::Start(len))?;
        self.len = len;
        Ok(())
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }

    /// Reader over the full content from the start.
    ///
    /// Reading moves the write position; call [`truncate`](Self::truncate)
    /// before appending again.
    pub fn reader(&mut self) -> io::Result<io::Take<&mut SpooledTempFile>> {
        self.file.seek(SeekFrom::Start(0))?;
        Ok((&mut self.file).take(self.len))
    }

    /// Copy of the full content. The write position is left at the end.
    #[cfg(test)]
    pub fn contents(&mut self) -> io::Result<Bytes> {
        let mut buf = Vec::with_capacity(self.len as usize);
        self.file.seek(SeekFrom::Start(0))?;
        let read = self.file.read_to_end(&mut buf);
        self.file.seek(SeekFrom::End(0))?;
        read?;
        Ok(Bytes::from(buf))
    }
}

impl std::fmt::Debug for Spool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Spool")
            .field("len", &self.len)
            .field("rolled_over", &self.is_rolled_over())
            .finish()
    }
}
