//! # Remote Catalog
//!
//! Client for the music catalog backend: stream resolution, related tracks
//! for radio mode, playlist contents and search.
//!
//! The [`CatalogClient`] trait is the seam the queue engine depends on;
//! [`HttpCatalogClient`] implements it over any [`bridge_traits::HttpClient`].

pub mod client;
pub mod error;
pub mod types;

pub use client::{CatalogClient, HttpCatalogClient, DEFAULT_REQUEST_TIMEOUT};
pub use error::{CatalogError, Result};
pub use types::{
    fallback_thumbnail, ResolvedStream, SearchKind, SearchResult, TrackMeta,
    DEFAULT_THUMBNAIL_TEMPLATE,
};
