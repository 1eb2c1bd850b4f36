//! Runtime plumbing shared by every core crate.
//!
//! - [`config`]: host-injected bridges and settings, validated up front
//! - [`events`]: the broadcast bus the engine and cache publish on
//! - [`logging`]: subscriber installation and log redaction helpers

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
