//! # Host Bridge Traits
//!
//! The seams between the playback core and the host platform. The core never
//! talks to the network, the audio stack or the system clock directly; the
//! host hands it implementations of these traits.
//!
//! | Trait | Module | Desktop default |
//! |-------|--------|-----------------|
//! | [`HttpClient`] | [`http`] | `bridge-desktop::ReqwestHttpClient` |
//! | [`PlayerAdapter`] | [`playback`] | none, always host-provided |
//! | [`Clock`] | [`time`] | [`SystemClock`] |
//! | [`LoggerSink`] | [`logging`] | none, optional |
//!
//! All traits are `Send + Sync` and failures are reported as [`BridgeError`].
//! An [`HttpClient`] must report "no response at all" as
//! [`BridgeError::Transport`] or [`BridgeError::Timeout`], never as a status
//! code.

pub mod error;
pub mod http;
pub mod logging;
pub mod playback;
pub mod time;

pub use error::BridgeError;

pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse, RetryPolicy};
pub use logging::{LogEntry, LogLevel, LoggerSink};
pub use playback::{PlayerAdapter, PlayerEvent, PlayerTrack};
pub use time::{Clock, ManualClock, SystemClock};
