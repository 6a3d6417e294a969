//! Error types for guidance operations
//!
//! Covers search collaborator failures, service lifecycle problems and
//! configuration rejection. An empty search result is deliberately not
//! represented here: "nothing nearby" is an answer, not an error, and
//! surfaces as a status instead.

use thiserror::Error;

use kompas_core::CoreError;

/// Main error type for guidance operations
#[derive(Error, Debug)]
pub enum GuidanceError {
    // ===== Search Errors =====
    /// The search collaborator failed (transport, decode, upstream trouble)
    #[error("Search failed: {0}")]
    SearchFailed(String),

    /// The search collaborator gave up waiting on its backend
    #[error("Search timed out after {duration_ms}ms")]
    SearchTimeout {
        /// Timeout duration in milliseconds
        duration_ms: u64,
    },

    // ===== State Errors =====
    /// A refresh was requested before any location fix arrived
    #[error("Cannot determine your location")]
    NoLocationFix,

    // ===== Configuration Errors =====
    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ===== Channel Errors =====
    /// Channel closed (service no longer running)
    #[error("Guidance service channel closed")]
    ChannelClosed,

    // ===== Boundary Errors =====
    /// Geographic input rejected by the data-model boundary
    #[error("Invalid input: {0}")]
    InvalidInput(#[from] CoreError),
}

impl GuidanceError {
    /// Check if this error is recoverable/retriable
    ///
    /// Retriable failures leave the movement gate untouched, so the next
    /// location tick (or a manual refresh) tries again without requiring
    /// the user to move.
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            GuidanceError::SearchFailed(_)
                | GuidanceError::SearchTimeout { .. }
                | GuidanceError::NoLocationFix
        )
    }

    /// Get an error code for logging/metrics
    pub fn error_code(&self) -> &'static str {
        match self {
            GuidanceError::SearchFailed(_) => "SEARCH_FAILED",
            GuidanceError::SearchTimeout { .. } => "SEARCH_TIMEOUT",
            GuidanceError::NoLocationFix => "NO_LOCATION_FIX",
            GuidanceError::InvalidConfig(_) => "INVALID_CONFIG",
            GuidanceError::ChannelClosed => "CHANNEL_CLOSED",
            GuidanceError::InvalidInput(_) => "INVALID_INPUT",
        }
    }
}

/// Result type alias for guidance operations
pub type Result<T> = std::result::Result<T, GuidanceError>;
