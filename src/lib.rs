//! Umbrella crate for the TuneCore playback core.
//!
//! Host applications depend on `tunecore-workspace` and pick components by
//! feature instead of wiring each crate by hand:
//!
//! - `desktop-shims` (default): the full [`service`] with a `reqwest` client
//! - `playback`: the queue engine alone, for hosts that bring their own catalog
//! - `catalog`: the catalog client alone
//! - `response-cache`: the caching HTTP decorator alone

#[cfg(feature = "desktop-shims")]
pub use core_service as service;

#[cfg(feature = "playback")]
pub use core_playback as playback;

#[cfg(feature = "catalog")]
pub use core_catalog as catalog;

#[cfg(feature = "response-cache")]
pub use core_cache as cache;
