//! Himorganic storefront backend library.
//!
//! Exposes the HTTP API, services, and storage adapter as a library so the
//! CLI and integration tests can reuse them.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
pub mod store;
