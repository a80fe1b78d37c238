//! Error types for Parley

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for Parley operations
pub type Result<T> = std::result::Result<T, Error>;

/// HTTP status the chat endpoint uses for temporary unavailability
pub const SERVICE_UNAVAILABLE: u16 = 503;

/// Errors that can occur while running a turn
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Submitted display name was empty after trimming
    #[error("name must not be empty")]
    InvalidName,

    /// No speech started within the capture timeout
    #[error("no speech detected within {0} seconds")]
    CaptureTimeout(u64),

    /// Speech was captured but could not be transcribed
    #[error("speech not understood")]
    CaptureUnintelligible,

    /// Speech recognition service unreachable or failing
    #[error("speech service error: {0}")]
    CaptureService(String),

    /// Chat endpoint answered with a non-success status
    #[error("chat endpoint returned {status}: {body}")]
    ChatHttp { status: u16, body: String },

    /// Chat request failed for any other reason
    #[error("unexpected chat error: {0}")]
    ChatUnexpected(String),

    /// Text-to-speech error
    #[error("TTS error: {0}")]
    Synthesis(String),

    /// Audio artifact backing file is missing or unreadable
    #[error("audio file not found: {}", .0.display())]
    PlaybackMissingFile(PathBuf),

    /// Audio device error
    #[error("audio error: {0}")]
    Audio(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl Error {
    /// Whether the chat client should try this request again
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::ChatHttp { status, .. } if crate::chat::is_retryable_status(*status))
    }

    /// Text shown to the user when a turn fails with this error
    #[must_use]
    pub fn status_message(&self) -> String {
        match self {
            Self::CaptureTimeout(secs) => {
                format!("Timeout: No speech detected within {secs} seconds.")
            }
            Self::CaptureUnintelligible => {
                "Sorry, I couldn't understand what you said.".to_string()
            }
            Self::CaptureService(msg) => {
                format!("Sorry, there was an issue with the speech service: {msg}")
            }
            Self::ChatHttp { status, .. } => format!("Chat service error: HTTP {status}"),
            Self::ChatUnexpected(msg) => format!("Unexpected error: {msg}"),
            Self::Synthesis(msg) => format!("Failed to generate audio: {msg}"),
            Self::PlaybackMissingFile(_) => "Audio file not found or invalid.".to_string(),
            Self::InvalidName => "Please enter your name to begin.".to_string(),
            other => format!("Error: {other}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_503_is_retryable() {
        let unavailable = Error::ChatHttp {
            status: 503,
            body: String::new(),
        };
        let not_found = Error::ChatHttp {
            status: 404,
            body: String::new(),
        };

        assert!(unavailable.is_retryable());
        assert!(!not_found.is_retryable());
        assert!(!Error::ChatUnexpected("reset".to_string()).is_retryable());
    }

    #[test]
    fn capture_messages_match_ui_copy() {
        assert_eq!(
            Error::CaptureTimeout(10).status_message(),
            "Timeout: No speech detected within 10 seconds."
        );
        assert_eq!(
            Error::CaptureUnintelligible.status_message(),
            "Sorry, I couldn't understand what you said."
        );
        assert!(
            Error::CaptureService("offline".to_string())
                .status_message()
                .ends_with("offline")
        );
    }
}
