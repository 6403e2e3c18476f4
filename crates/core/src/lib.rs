//! Core types and shared functionality for the DataGator client.
//!
//! This crate provides:
//! - Cache store with pluggable engines (SQLite, in-memory)
//! - Revision buffering for batched remote commits
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;
pub mod revision;

pub use cache::{CacheEngine, CacheStore, MemoryEngine, SqliteEngine};
pub use config::{AppConfig, ConfigError};
pub use error::Error;
pub use revision::{
    CommitDocument, CommitReceipt, CommitSink, PushOutcome, RevisionBuffer, RevisionLimits, RevisionSession,
};
