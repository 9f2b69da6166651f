//! Error types for midiclip

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClipError {
    /// No track/clip-slot pair has been bound yet
    #[error("No target: bind a track and clip slot first")]
    NoTarget,
    /// Slot is bound but no clip is open to write into
    #[error("No clip open in the bound slot")]
    NoClipOpen,
    #[error("Host error: {0}")]
    Host(String),
    #[error("Malformed note data: {0}")]
    MalformedNoteData(String),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ClipError {
    /// Caller ordering bugs, as opposed to collaborator failures
    pub fn is_precondition(&self) -> bool {
        matches!(self, Self::NoTarget | Self::NoClipOpen)
    }
}

pub type Result<T> = std::result::Result<T, ClipError>;
