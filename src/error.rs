//! Error types for backend requests and clipboard access

use thiserror::Error;

/// Result type alias for panel operations
pub type Result<T> = std::result::Result<T, PanelError>;

#[derive(Error, Debug)]
pub enum PanelError {
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Server returned {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("Failed to decode response: {error}\nRaw response: {raw}")]
    Decode { error: String, raw: String },

    #[error("Request task failed: {0}")]
    Task(String),

    #[error("Clipboard unavailable: {0}")]
    Clipboard(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PanelError {
    pub fn decode(error: impl ToString, raw: &str) -> Self {
        PanelError::Decode {
            error: error.to_string(),
            raw: raw.to_string(),
        }
    }
}
