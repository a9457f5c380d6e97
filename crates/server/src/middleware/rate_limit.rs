//! Rate limiting built on governor and `tower_governor`.
//!
//! Auth endpoints get a strict limiter to slow down credential stuffing;
//! the rest of the API gets a relaxed one.

use std::sync::Arc;

use governor::clock::QuantaInstant;
use governor::middleware::NoOpMiddleware;
use tower_governor::key_extractor::SmartIpKeyExtractor;
use tower_governor::{GovernorLayer, governor::GovernorConfigBuilder};

/// Rate limiter layer type for Axum.
///
/// `SmartIpKeyExtractor` prefers proxy headers (`x-forwarded-for`,
/// `x-real-ip`) and falls back to the peer address, so the server must be
/// started with connect info (see `main.rs`).
pub type RateLimiterLayer =
    GovernorLayer<SmartIpKeyExtractor, NoOpMiddleware<QuantaInstant>, axum::body::Body>;

/// Limiter for login/register endpoints: replenish one token every 2
/// seconds with a burst of 20, roughly 30 sustained requests per minute
/// per IP.
///
/// # Panics
///
/// Does not panic; the builder only rejects zero intervals or burst sizes.
#[must_use]
pub fn auth_rate_limiter() -> RateLimiterLayer {
    let config = GovernorConfigBuilder::default()
        .key_extractor(SmartIpKeyExtractor)
        .per_second(2)
        .burst_size(20)
        .finish()
        .expect("non-zero rate limiter configuration");
    GovernorLayer::new(Arc::new(config))
}

/// Limiter for the rest of the API: roughly 100 requests per minute per IP.
///
/// # Panics
///
/// Does not panic; the builder only rejects zero intervals or burst sizes.
#[must_use]
pub fn api_rate_limiter() -> RateLimiterLayer {
    let config = GovernorConfigBuilder::default()
        .key_extractor(SmartIpKeyExtractor)
        .per_second(1)
        .burst_size(50)
        .finish()
        .expect("non-zero rate limiter configuration");
    GovernorLayer::new(Arc::new(config))
}
