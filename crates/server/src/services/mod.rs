//! Business logic services, shared by HTTP routes and the CLI.

pub mod analytics;
pub mod auth;
pub mod orders;
