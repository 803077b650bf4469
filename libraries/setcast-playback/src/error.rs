//! Error types for show reconciliation

use crate::types::ShowStatus;
use thiserror::Error;

/// Playback errors
///
/// Host quirks (graph construction, resume, priming, rejected play) never
/// surface here; they are logged and swallowed. What remains are contract
/// violations the caller has to see.
#[derive(Debug, Error)]
pub enum PlaybackError {
    /// A status the drain step cannot apply reached it
    #[error("Unexpected show status at drain: {0}")]
    UnexpectedStatus(ShowStatus),

    /// Target state violates the data model
    #[error("Invalid target: {0}")]
    InvalidTarget(String),

    /// Playback handle command failed
    #[error("Playback handle error: {0}")]
    Handle(String),

    /// Audio graph construction or resume failed
    #[error("Audio graph error: {0}")]
    Graph(String),

    /// Target JSON could not be parsed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for playback operations
pub type Result<T> = std::result::Result<T, PlaybackError>;
