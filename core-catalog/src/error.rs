//! Error types for the remote catalog

use bridge_traits::error::BridgeError;
use thiserror::Error;

/// Remote catalog errors
#[derive(Error, Debug)]
pub enum CatalogError {
    /// The request never produced a usable response
    #[error(transparent)]
    Bridge(#[from] BridgeError),

    /// The catalog answered with a non-success status
    #[error("Catalog request failed (status {status}): {endpoint}")]
    HttpStatus { status: u16, endpoint: String },

    /// The audio endpoint answered without a playable URL
    #[error("No stream URL returned for track {track_id}")]
    MissingStreamUrl { track_id: String },

    /// Body was not JSON or had an unusable shape
    #[error("Invalid catalog response: {0}")]
    InvalidResponse(String),

    /// Endpoint URL could not be built from the base URL
    #[error("Invalid catalog URL: {0}")]
    InvalidUrl(String),
}

impl CatalogError {
    /// Whether retrying later might succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            CatalogError::Bridge(e) => e.is_transport(),
            CatalogError::HttpStatus { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

/// Result type for catalog operations
pub type Result<T> = std::result::Result<T, CatalogError>;
