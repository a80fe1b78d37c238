//! Microphone speech capture backed by Whisper

use async_trait::async_trait;
use secrecy::ExposeSecret;

use super::stt::SpeechToText;
use super::{CaptureLimits, SpeechCapture};
use crate::config::VoiceConfig;
use crate::{Error, Result};

/// Records one phrase from the default input device and transcribes it
pub struct MicrophoneListener {
    stt: SpeechToText,
}

impl MicrophoneListener {
    #[must_use]
    pub const fn new(stt: SpeechToText) -> Self {
        Self { stt }
    }

    /// Build a listener from voice configuration
    ///
    /// # Errors
    ///
    /// Returns error if no `OpenAI` key is configured for Whisper
    pub fn from_config(config: &VoiceConfig) -> Result<Self> {
        let key = config
            .openai_api_key
            .as_ref()
            .map(|k| k.expose_secret().to_string())
            .unwrap_or_default();

        let stt = SpeechToText::new_whisper(key, config.stt_model.clone(), config.language.clone())?;
        Ok(Self::new(stt))
    }
}

#[async_trait]
impl SpeechCapture for MicrophoneListener {
    async fn listen(&self, limits: &CaptureLimits) -> Result<String> {
        let limits = *limits;
        let recording = tokio::task::spawn_blocking(move || record_from_device(&limits))
            .await
            .map_err(|e| Error::CaptureService(format!("capture task failed: {e}")))?
            .map_err(|e| match e {
                Error::Audio(msg) => Error::CaptureService(msg),
                other => other,
            })?;

        let samples = match recording {
            super::Recording::Phrase(samples) => samples,
            super::Recording::NoSpeech => {
                return Err(Error::CaptureTimeout(limits.start_timeout.as_secs()));
            }
        };

        tracing::debug!(samples = samples.len(), "phrase recorded");
        let wav = super::samples_to_wav(&samples, super::SAMPLE_RATE)
            .map_err(|e| Error::CaptureService(e.to_string()))?;

        self.stt.transcribe(&wav).await
    }
}

#[cfg(feature = "audio-io")]
fn record_from_device(limits: &CaptureLimits) -> Result<super::Recording> {
    let mut capture = super::AudioCapture::start()?;
    super::record_phrase(&mut capture, limits)
}

#[cfg(not(feature = "audio-io"))]
fn record_from_device(_limits: &CaptureLimits) -> Result<super::Recording> {
    Err(Error::Audio(
        "microphone support not built (enable the audio-io feature)".to_string(),
    ))
}
