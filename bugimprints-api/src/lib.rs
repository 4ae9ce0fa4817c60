//! # Bug Imprints API Server Library
//!
//! HTTP surface of the bug tracker, built on axum.
//!
//! ## Modules
//!
//! - `app`: application state and router builder
//! - `config`: configuration from the environment
//! - `error`: error handling and HTTP response mapping
//! - `routes`: route handlers

pub mod app;
pub mod config;
pub mod error;
pub mod routes;
