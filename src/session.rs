//! Session state: who is talking and whether onboarding is done
//!
//! A session starts in [`SessionPhase::AwaitingName`] and moves to
//! [`SessionPhase::Onboarded`] once a non-empty name is submitted. There is
//! no way back.

use serde::Serialize;

use crate::{Error, Result};

/// Lifecycle phase of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    /// Waiting for the user to enter a display name
    AwaitingName,
    /// Name captured; query turns are accepted
    Onboarded,
}

/// Per-user interactive session
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    user_name: Option<String>,
}

impl Session {
    /// Create a session awaiting a name
    #[must_use]
    pub const fn new() -> Self {
        Self { user_name: None }
    }

    /// Current phase
    #[must_use]
    pub const fn phase(&self) -> SessionPhase {
        if self.user_name.is_some() {
            SessionPhase::Onboarded
        } else {
            SessionPhase::AwaitingName
        }
    }

    #[must_use]
    pub const fn is_onboarded(&self) -> bool {
        self.user_name.is_some()
    }

    /// Normalized display name, if captured
    #[must_use]
    pub fn user_name(&self) -> Option<&str> {
        self.user_name.as_deref()
    }

    /// The stored name, or `None` when the UI must prompt for one
    #[must_use]
    pub fn get_or_prompt_name(&self) -> Option<&str> {
        self.user_name()
    }

    /// Whether a query turn may run in this session
    #[must_use]
    pub const fn accepts_queries(&self) -> bool {
        self.is_onboarded()
    }

    /// Record the user's name and finish onboarding
    ///
    /// Returns the normalized name. Once onboarded, further calls keep the
    /// first name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidName`] if the name is blank
    pub fn mark_onboarded(&mut self, raw_name: &str) -> Result<&str> {
        let name = normalize_name(raw_name).ok_or(Error::InvalidName)?;

        match self.user_name {
            Some(ref existing) => {
                tracing::warn!(existing = %existing, ignored = %name, "session already onboarded");
            }
            None => {
                tracing::info!(user = %name, "session onboarded");
                self.user_name = Some(name);
            }
        }

        Ok(self.user_name.as_deref().unwrap_or_default())
    }
}

/// Trim a raw name and upper-case its first character
///
/// The remaining characters keep their casing. Returns `None` for blank
/// input.
#[must_use]
pub fn normalize_name(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let mut chars = trimmed.chars();
    let first = chars.next()?;
    Some(first.to_uppercase().chain(chars).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_first_letter_only() {
        assert_eq!(normalize_name("john").as_deref(), Some("John"));
        assert_eq!(normalize_name("MARY").as_deref(), Some("MARY"));
        assert_eq!(normalize_name("mcDonald").as_deref(), Some("McDonald"));
        assert_eq!(normalize_name("  ada lovelace ").as_deref(), Some("Ada lovelace"));
        assert_eq!(normalize_name("élodie").as_deref(), Some("Élodie"));
    }

    #[test]
    fn blank_names_are_rejected() {
        assert_eq!(normalize_name(""), None);
        assert_eq!(normalize_name("   "), None);

        let mut session = Session::new();
        assert!(matches!(session.mark_onboarded(" \t"), Err(Error::InvalidName)));
        assert_eq!(session.phase(), SessionPhase::AwaitingName);
    }

    #[test]
    fn awaiting_name_rejects_queries() {
        let session = Session::new();
        assert_eq!(session.phase(), SessionPhase::AwaitingName);
        assert!(!session.accepts_queries());
        assert_eq!(session.get_or_prompt_name(), None);
    }

    #[test]
    fn onboarding_is_terminal() {
        let mut session = Session::new();
        assert_eq!(session.mark_onboarded("john").unwrap(), "John");
        assert!(session.accepts_queries());
        assert_eq!(session.get_or_prompt_name(), Some("John"));

        // A second submission does not replace the name
        assert_eq!(session.mark_onboarded("mary").unwrap(), "John");
        assert_eq!(session.phase(), SessionPhase::Onboarded);
    }
}
