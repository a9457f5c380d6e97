//! Himorganic Core - Shared types library.
//!
//! This crate provides common types used across all Himorganic components:
//! - `server` - HTTP API serving the storefront and admin dashboard
//! - `cli` - Command-line tools for admin management and seeding
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no database access, no HTTP
//! clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, emails, and statuses

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
