//! Cinefuse - movie data aggregation server
//!
//! This library crate exposes the core functionality for integration testing.

pub mod cache;
pub mod config;
pub mod enrich;
pub mod error;
pub mod health;
pub mod limiter;
pub mod providers;
pub mod server;
pub mod validate;
