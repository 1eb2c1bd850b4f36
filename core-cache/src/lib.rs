//! # HTTP Response Cache
//!
//! Wraps any [`bridge_traits::HttpClient`] with an in-memory GET cache that
//! honours `Cache-Control`, `Expires` and `Age`, revalidates with `ETag` /
//! `Last-Modified`, and serves the last good response when the network fails.
//!
//! ```ignore
//! use core_cache::CachingHttpClient;
//!
//! let cached = CachingHttpClient::new(platform_client, clock)
//!     .with_event_bus(event_bus.clone());
//! let response = cached.execute(HttpRequest::get(url)).await?;
//! ```
//!
//! The store lives for the process. Nothing is persisted.

pub mod client;
pub mod config;
pub mod freshness;
pub mod key;
pub mod stats;
pub mod store;

pub use client::{CachingHttpClient, STALE_WARNING};
pub use config::CacheConfig;
pub use freshness::Freshness;
pub use key::CacheKey;
pub use stats::CacheStats;
pub use store::{CacheEntry, ResponseCache};
