//! Session-scoped cache of remote entity state.
//!
//! Entries map an entity URI to its last fetched JSON document. The store
//! is a thin layer over a pluggable [`CacheEngine`]:
//!
//! - `SqliteEngine`: on-disk database via tokio-rusqlite, in a private
//!   temporary directory unless one is supplied
//! - `MemoryEngine`: a plain map, for tests and ephemeral sessions
//!
//! The backing location is destroyed when the store is torn down.

pub mod connection;
pub mod engine;
mod entries;
pub mod memory;
pub mod migrations;
pub mod store;

pub use crate::Error;

pub use connection::SqliteEngine;
pub use engine::CacheEngine;
pub use memory::MemoryEngine;
pub use store::CacheStore;
