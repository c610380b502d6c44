//! pagewalk library
//!
//! Exposes the cache, crawler, config, and server modules for use in
//! integration tests and by the binary.

pub mod cache;
pub mod cli;
pub mod config;
pub mod crawler;
pub mod server;
