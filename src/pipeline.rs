//! One interaction turn: input text to spoken reply
//!
//! Turn failures are reported as error statuses, not returned. The one
//! exception is a blank name during onboarding.

use std::sync::Arc;

use async_trait::async_trait;

use crate::chat::{ASSISTANT_NAME, ChatClient, ChatModel, ChatTurn};
use crate::config::Config;
use crate::session::Session;
use crate::status::{StatusSink, TurnStatus};
use crate::voice::{
    AudioArtifact, CaptureLimits, MicrophoneListener, SpeechCapture, SpeechSynthesizer,
    TextToSpeech,
};
use crate::{Error, Result};

/// Sentence spoken once a user has introduced themselves
#[must_use]
pub fn welcome_message(user_name: &str) -> String {
    format!("Welcome, {user_name}. This is {ASSISTANT_NAME}, your professional voice assistant.")
}

/// Result of a successful onboarding turn
#[derive(Debug)]
pub struct Onboarding {
    pub welcome: String,
    /// Spoken welcome, absent if synthesis failed
    pub artifact: Option<AudioArtifact>,
}

/// Reply to a query turn
#[derive(Debug)]
pub struct Reply {
    pub turn: ChatTurn,
    pub artifact: AudioArtifact,
}

impl Reply {
    /// Reply text
    #[must_use]
    pub fn text(&self) -> &str {
        self.turn.reply.as_deref().unwrap_or_default()
    }
}

/// Sequences capture, chat and synthesis for a session
pub struct TurnPipeline {
    capture: Arc<dyn SpeechCapture>,
    chat: Arc<dyn ChatModel>,
    synthesizer: Arc<dyn SpeechSynthesizer>,
    language: String,
    limits: CaptureLimits,
}

impl TurnPipeline {
    #[must_use]
    pub fn new(
        capture: Arc<dyn SpeechCapture>,
        chat: Arc<dyn ChatModel>,
        synthesizer: Arc<dyn SpeechSynthesizer>,
    ) -> Self {
        Self {
            capture,
            chat,
            synthesizer,
            language: "en".to_string(),
            limits: CaptureLimits::default(),
        }
    }

    /// Build the production pipeline from configuration
    ///
    /// Without a Whisper key the microphone reports a speech service error
    /// on every capture; typed turns keep working.
    ///
    /// # Errors
    ///
    /// Returns error if the chat client or the TTS provider cannot be built
    pub fn from_config(config: &Config) -> Result<Self> {
        let chat = ChatClient::new(&config.chat)?;
        let synthesizer = TextToSpeech::from_config(&config.voice)?;

        let capture: Arc<dyn SpeechCapture> = match MicrophoneListener::from_config(&config.voice)
        {
            Ok(listener) => Arc::new(listener),
            Err(e) => {
                tracing::warn!(error = %e, "speech capture unavailable");
                Arc::new(UnavailableCapture(e.to_string()))
            }
        };

        Ok(Self::new(capture, Arc::new(chat), Arc::new(synthesizer))
            .with_language(config.voice.language.clone())
            .with_limits(config.voice.capture))
    }

    #[must_use]
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    #[must_use]
    pub const fn with_limits(mut self, limits: CaptureLimits) -> Self {
        self.limits = limits;
        self
    }

    #[must_use]
    pub const fn limits(&self) -> &CaptureLimits {
        &self.limits
    }

    /// Capture a name, onboard the session and speak the welcome
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidName`] if the name is blank; the session is
    /// left awaiting a name.
    pub async fn run_onboarding_turn(
        &self,
        session: &mut Session,
        raw_name: &str,
        status: &dyn StatusSink,
    ) -> Result<Onboarding> {
        let name = session.mark_onboarded(raw_name)?.to_string();
        let welcome = welcome_message(&name);
        status.emit(TurnStatus::response(&welcome));

        let artifact = match self.synthesize(&welcome).await {
            Ok(artifact) => Some(artifact),
            Err(e) => {
                tracing::error!(error = %e, "welcome synthesis failed");
                status.emit(TurnStatus::error(e.status_message()));
                None
            }
        };

        Ok(Onboarding { welcome, artifact })
    }

    /// Answer one utterance
    ///
    /// Returns `None` when the session is not onboarded, the text is blank,
    /// or the turn failed (an error status was emitted).
    pub async fn run_query_turn(
        &self,
        captured_text: &str,
        session: &Session,
        status: &dyn StatusSink,
    ) -> Option<Reply> {
        let Some(user_name) = session.user_name() else {
            tracing::debug!("query ignored before onboarding");
            return None;
        };

        let text = captured_text.trim();
        if text.is_empty() {
            return None;
        }

        status.emit(TurnStatus::Processing);
        let mut turn = ChatTurn::new(text, user_name);

        let reply = match self.chat.complete(&turn, status).await {
            Ok(reply) => reply,
            Err(e) => {
                tracing::error!(error = %e, "chat turn failed");
                status.emit(TurnStatus::error(e.status_message()));
                return None;
            }
        };

        let artifact = match self.synthesize(&reply).await {
            Ok(artifact) => artifact,
            Err(e) => {
                tracing::error!(error = %e, "reply synthesis failed");
                status.emit(TurnStatus::error(e.status_message()));
                return None;
            }
        };

        status.emit(TurnStatus::response(&reply));
        turn.reply = Some(reply);

        Some(Reply { turn, artifact })
    }

    /// Listen for one phrase
    ///
    /// Returns `None` after emitting an error status if nothing usable was
    /// captured.
    pub async fn capture(&self, status: &dyn StatusSink) -> Option<String> {
        status.emit(TurnStatus::Listening {
            timeout_secs: self.limits.start_timeout.as_secs(),
        });

        match self.capture.listen(&self.limits).await {
            Ok(text) => {
                tracing::info!(input = %text, "speech captured");
                Some(text)
            }
            Err(e) => {
                tracing::warn!(error = %e, "speech capture failed");
                status.emit(TurnStatus::error(e.status_message()));
                None
            }
        }
    }

    /// Capture a phrase and answer it
    pub async fn run_recorded_turn(
        &self,
        session: &Session,
        status: &dyn StatusSink,
    ) -> Option<Reply> {
        if !session.accepts_queries() {
            tracing::debug!("recording ignored before onboarding");
            return None;
        }

        let text = self.capture(status).await?;
        self.run_query_turn(&text, session, status).await
    }

    async fn synthesize(&self, text: &str) -> Result<AudioArtifact> {
        let audio = self.synthesizer.synthesize(text, &self.language).await?;
        if audio.is_empty() {
            return Err(Error::Synthesis("synthesizer returned no audio".to_string()));
        }

        AudioArtifact::from_mp3(&audio).map_err(|e| Error::Synthesis(e.to_string()))
    }
}

/// Stand-in capture when no speech service is configured
struct UnavailableCapture(String);

#[async_trait]
impl SpeechCapture for UnavailableCapture {
    async fn listen(&self, _limits: &CaptureLimits) -> Result<String> {
        Err(Error::CaptureService(self.0.clone()))
    }
}
