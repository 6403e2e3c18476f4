//! Unified error types for the DataGator client.
//!
//! Every variant renders with a stable code prefix so log lines and
//! surfaced messages can be matched without inspecting the type.

use tokio_rusqlite::rusqlite;

/// Unified error type shared by the cache store, the revision buffer and
/// the client crate.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A programming error, such as rewinding a revision with pending entries.
    #[error("INVARIANT_VIOLATION: {0}")]
    InvariantViolation(String),

    /// A value could not be serialized to JSON.
    #[error("ENCODE_ERROR: {0}")]
    Encode(String),

    /// A cached value could not be decoded. The entry is left in place.
    #[error("DECODE_ERROR: {key}: {reason}")]
    Decode { key: String, reason: String },

    /// The remote sink answered a commit with a non-success status.
    #[error("COMMIT_REJECTED: {uri} ({payload_size} bytes): status {status}")]
    CommitRejected { uri: String, payload_size: u64, status: u16 },

    /// The remote sink could not be reached or failed mid-request.
    #[error("COMMIT_FAILED: {uri} ({payload_size} bytes): {reason}")]
    CommitFailed { uri: String, payload_size: u64, reason: String },

    /// Database operation failed.
    #[error("CACHE_ERROR: {0}")]
    Database(tokio_rusqlite::Error),

    /// Migration failed to apply.
    #[error("CACHE_ERROR: migration failed: {0}")]
    MigrationFailed(String),

    /// Local I/O failure (staging file, cache directory).
    #[error("IO_ERROR: {0}")]
    Io(#[from] std::io::Error),

    /// Network failure talking to the remote service.
    #[error("TRANSPORT_ERROR: {0}")]
    Transport(String),

    /// The remote service answered a request with an unexpected status.
    #[error("HTTP_ERROR: {uri}: status {status}")]
    Rejected { uri: String, status: u16 },

    /// Invalid URL.
    #[error("INVALID_URL: {0}")]
    InvalidUrl(String),

    /// Entity name does not satisfy the naming rules.
    #[error("INVALID_NAME: {0}")]
    InvalidName(String),

    /// Remote entity does not exist.
    #[error("NOT_FOUND: {0}")]
    NotFound(String),
}

impl From<tokio_rusqlite::Error<Error>> for Error {
    fn from(err: tokio_rusqlite::Error<Error>) -> Self {
        match err {
            tokio_rusqlite::Error::Error(e) => e,
            tokio_rusqlite::Error::ConnectionClosed => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
            tokio_rusqlite::Error::Close(c) => Error::Database(tokio_rusqlite::Error::Close(c)),
            _ => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
        }
    }
}

impl From<tokio_rusqlite::Error<rusqlite::Error>> for Error {
    fn from(err: tokio_rusqlite::Error<rusqlite::Error>) -> Self {
        Error::Database(err)
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Database(tokio_rusqlite::Error::Error(err))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Encode(err.to_string())
    }
}

impl Error {
    /// Whether retrying the same operation may succeed.
    ///
    /// Only remote failures qualify; invariant and encoding errors are
    /// programming or data errors and will fail again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::CommitRejected { .. } | Error::CommitFailed { .. } | Error::Transport(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::CommitRejected { uri: "repo/DS".to_string(), payload_size: 42, status: 500 };
        let msg = err.to_string();
        assert!(msg.contains("COMMIT_REJECTED"));
        assert!(msg.contains("repo/DS"));
        assert!(msg.contains("42 bytes"));
    }

    #[test]
    fn test_decode_error_names_key() {
        let err = Error::Decode { key: "repo".to_string(), reason: "expected value".to_string() };
        assert_eq!(err.to_string(), "DECODE_ERROR: repo: expected value");
    }

    #[test]
    fn test_retryable() {
        assert!(Error::CommitFailed { uri: "r".into(), payload_size: 2, reason: "timeout".into() }.is_retryable());
        assert!(!Error::InvariantViolation("cannot rewind".into()).is_retryable());
        assert!(!Error::Encode("bad".into()).is_retryable());
    }

    #[test]
    fn test_serde_error_maps_to_encode() {
        let err: Error = serde_json::from_str::<serde_json::Value>("{").unwrap_err().into();
        assert!(matches!(err, Error::Encode(_)));
    }
}
