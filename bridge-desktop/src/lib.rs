//! # Desktop Bridge
//!
//! Ready-made [`HttpClient`](bridge_traits::HttpClient) for desktop hosts
//! (macOS, Windows, Linux), used by `core-runtime` when the host does not
//! inject its own client. The native player always comes from the host.

mod http;

pub use http::{ReqwestHttpClient, DEFAULT_TIMEOUT};
