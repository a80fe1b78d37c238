//! User-visible turn feedback
//!
//! The pipeline reports progress through a [`StatusSink`] instead of writing
//! to any UI directly. The web server collects statuses per request; the
//! terminal mode prints them as they arrive.

use std::fmt;
use std::sync::Mutex;

use serde::Serialize;

/// A single piece of feedback emitted during a turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TurnStatus {
    /// Microphone is open and waiting for speech
    Listening { timeout_secs: u64 },
    /// Input captured, waiting on the model
    Processing,
    /// Chat endpoint was unavailable and the request will be retried
    Retrying { attempt: u32, max_attempts: u32 },
    /// Text to show in the response region
    Response { text: String },
    /// The turn failed
    Error { message: String },
}

impl TurnStatus {
    #[must_use]
    pub fn response(text: impl Into<String>) -> Self {
        Self::Response { text: text.into() }
    }

    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }
}

impl fmt::Display for TurnStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Listening { timeout_secs } => {
                write!(f, "Listening... Please speak within {timeout_secs} seconds.")
            }
            Self::Processing => f.write_str("Processing..."),
            Self::Retrying {
                attempt,
                max_attempts,
            } => write!(
                f,
                "Attempt {attempt}/{max_attempts}: Service Unavailable. Retrying..."
            ),
            Self::Response { text } => f.write_str(text),
            Self::Error { message } => f.write_str(message),
        }
    }
}

/// Receiver of turn feedback
pub trait StatusSink: Send + Sync {
    fn emit(&self, status: TurnStatus);
}

/// Discards all statuses
#[derive(Debug, Default, Clone, Copy)]
pub struct NoStatus;

impl StatusSink for NoStatus {
    fn emit(&self, _status: TurnStatus) {}
}

/// Collects statuses in emission order
#[derive(Debug, Default)]
pub struct StatusLog {
    entries: Mutex<Vec<TurnStatus>>,
}

impl StatusLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything emitted so far
    #[must_use]
    pub fn entries(&self) -> Vec<TurnStatus> {
        self.entries
            .lock()
            .map(|entries| entries.clone())
            .unwrap_or_default()
    }

    /// Drain the collected statuses
    #[must_use]
    pub fn take(&self) -> Vec<TurnStatus> {
        self.entries
            .lock()
            .map(|mut entries| std::mem::take(&mut *entries))
            .unwrap_or_default()
    }

    /// Last response text, if any
    #[must_use]
    pub fn last_response(&self) -> Option<String> {
        self.entries().into_iter().rev().find_map(|s| match s {
            TurnStatus::Response { text } => Some(text),
            _ => None,
        })
    }
}

impl StatusSink for StatusLog {
    fn emit(&self, status: TurnStatus) {
        tracing::debug!(status = %status, "turn status");
        if let Ok(mut entries) = self.entries.lock() {
            entries.push(status);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_matches_ui_copy() {
        assert_eq!(
            TurnStatus::Listening { timeout_secs: 10 }.to_string(),
            "Listening... Please speak within 10 seconds."
        );
        assert_eq!(
            TurnStatus::Retrying {
                attempt: 1,
                max_attempts: 3
            }
            .to_string(),
            "Attempt 1/3: Service Unavailable. Retrying..."
        );
    }

    #[test]
    fn log_keeps_order_and_drains() {
        let log = StatusLog::new();
        log.emit(TurnStatus::Processing);
        log.emit(TurnStatus::response("hi"));

        assert_eq!(log.last_response().as_deref(), Some("hi"));
        assert_eq!(
            log.take(),
            vec![TurnStatus::Processing, TurnStatus::response("hi")]
        );
        assert!(log.entries().is_empty());
    }

    #[test]
    fn serializes_with_kind_tag() {
        let json = serde_json::to_value(TurnStatus::error("boom")).unwrap();
        assert_eq!(json["kind"], "error");
        assert_eq!(json["message"], "boom");

        let json = serde_json::to_value(TurnStatus::Processing).unwrap();
        assert_eq!(json["kind"], "processing");
    }
}
