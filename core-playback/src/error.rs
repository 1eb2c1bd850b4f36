//! # Playback Error Types
//!
//! Errors raised inside the queue engine. None of them cross the public
//! transport API, which reports "did something" as a `bool`; they drive the
//! retry-then-skip recovery path and end up in logs and playback events.

use bridge_traits::error::BridgeError;
use core_catalog::CatalogError;
use thiserror::Error;

/// Errors that can occur while resolving or loading a track.
#[derive(Error, Debug)]
pub enum PlaybackError {
    // ========================================================================
    // Source Errors
    // ========================================================================
    /// Catalog lookup failed.
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// The queue entry has no usable stream URL after resolution.
    #[error("No playable stream for track {0}")]
    StreamUnavailable(String),

    // ========================================================================
    // Platform/Adapter Errors
    // ========================================================================
    /// The native player rejected a command.
    #[error("Player adapter error: {0}")]
    Adapter(#[from] BridgeError),

    // ========================================================================
    // Queue Errors
    // ========================================================================
    /// Operation needs a non-empty queue.
    #[error("Queue is empty")]
    QueueEmpty,

    /// Index does not address a queue entry.
    #[error("Queue index {index} out of range (length {len})")]
    IndexOutOfRange { index: usize, len: usize },

    // ========================================================================
    // Generic Errors
    // ========================================================================
    /// Engine configuration failed validation.
    #[error("Invalid engine configuration: {0}")]
    InvalidConfig(String),

    /// Internal error (should not occur in normal operation).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PlaybackError {
    /// Returns `true` if this error is transient and the operation can be retried.
    pub fn is_transient(&self) -> bool {
        match self {
            PlaybackError::Catalog(e) => e.is_transient(),
            PlaybackError::Adapter(e) => e.is_transport(),
            PlaybackError::StreamUnavailable(_) => true,
            _ => false,
        }
    }
}

/// Result type for playback operations.
pub type Result<T> = std::result::Result<T, PlaybackError>;
