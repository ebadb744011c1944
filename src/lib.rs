//! raincheck — personal automation toolkit (library crate).
//!
//! Re-exports public modules for integration tests and external use.

pub mod config;
pub mod constants;
pub mod env;
pub mod mail;
pub mod notify;
pub mod runner;
pub mod secrets;
pub mod weather;
