//! # Bug Imprints shared library
//!
//! Domain core of the bug tracker, used by the HTTP server.
//!
//! ## Module Organization
//!
//! - `audit`: audit stamping and soft delete
//! - `lifecycle`: bug acceptance rules
//! - `auth`: passwords, tokens, request identity and the permission gate
//! - `models`: database rows and their queries
//! - `services`: one function per operation, permission-checked and transactional
//! - `storage`: media file backends
//! - `db`: connection pool and migrations
//! - `error`: domain error taxonomy

pub mod audit;
pub mod auth;
pub mod db;
pub mod error;
pub mod lifecycle;
pub mod models;
pub mod services;
pub mod storage;

/// Current version of the shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
