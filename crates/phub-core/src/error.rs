//! Error types for the phub client
//!
//! Provides a single error enum with human-readable messages and
//! string serialization so errors can be forwarded to a frontend as-is.

use serde::{Serialize, Serializer};
use thiserror::Error;

/// Error type for all phub operations
#[derive(Error, Debug)]
pub enum PhubError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// A required text extraction rule found no match
    #[error("Pattern `{rule}` not found")]
    PatternNotFound { rule: &'static str },

    /// A pattern rule was misused (bad replacement template, wrong mode)
    #[error("Pattern error: {0}")]
    Pattern(String),

    /// Extracted text is not valid data, or a manifest has an unexpected shape
    #[error("Parsing error: {0}")]
    Parsing(String),

    /// Session renewal did not unlock the page within the attempt ceiling
    #[error("Parsing failed after {attempts} attempts")]
    ParsingExhausted { attempts: u32 },

    /// Video is not available in the client's region
    #[error("Video is blocked in this region")]
    RegionBlocked,

    /// Video requires a premium account
    #[error("Video requires a premium account")]
    PremiumRequired,

    /// Video was disabled by the site
    #[error("Video has been disabled")]
    VideoDisabled,

    /// Video is still under review and not yet public
    #[error("Video is pending review")]
    VideoPendingReview,

    /// A segment could not be fetched within its retry budget
    #[error("Max retries exceeded for {url} after {attempts} attempts")]
    MaxRetriesExceeded { url: String, attempts: u32 },

    /// Login rejected by the remote
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Rate limited by server (HTTP 429)
    #[error("Rate limited - too many requests")]
    RateLimited,

    /// Resource not found on server
    #[error("Not found: {0}")]
    NotFound(String),

    /// URL does not point to a video
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Data key with an unknown namespace prefix
    #[error("Invalid data key: {0}")]
    InvalidKey(String),

    /// Writing downloaded media failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PhubError {
    /// Whether the error is a content-availability error.
    ///
    /// Terminal errors are never retried: renewing the session cannot make a
    /// region-blocked or disabled video playable. Batch callers use this to
    /// skip an item and keep going.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PhubError::RegionBlocked
                | PhubError::PremiumRequired
                | PhubError::VideoDisabled
                | PhubError::VideoPendingReview
        )
    }
}

impl Serialize for PhubError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

/// Result type alias for phub operations
pub type Result<T> = std::result::Result<T, PhubError>;
