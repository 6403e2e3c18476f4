//! Client for the DataGator service.
//!
//! This crate provides the HTTP service binding and the repository / data
//! set entities built on the cache store and revision buffer from core.

pub mod entity;
pub mod service;

pub use entity::{Context, DataSet, Repo, validate_name};
pub use service::{HttpService, Service};
