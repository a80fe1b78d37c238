//! Speech-to-text (STT) processing

use secrecy::{ExposeSecret, SecretString};

use crate::{Error, Result};

/// Default `OpenAI` transcription endpoint
const WHISPER_URL: &str = "https://api.openai.com/v1/audio/transcriptions";

/// Response from `OpenAI` Whisper transcription API
#[derive(serde::Deserialize)]
struct WhisperResponse {
    text: String,
}

/// Transcribes recorded speech to text
pub struct SpeechToText {
    client: reqwest::Client,
    api_key: SecretString,
    model: String,
    language: String,
    url: String,
}

impl SpeechToText {
    /// Create a new STT instance using `OpenAI` Whisper
    ///
    /// # Errors
    ///
    /// Returns error if API key is missing
    pub fn new_whisper(api_key: String, model: String, language: String) -> Result<Self> {
        if api_key.is_empty() {
            return Err(Error::Config(
                "OpenAI API key required for Whisper".to_string(),
            ));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            api_key: SecretString::from(api_key),
            model,
            language,
            url: WHISPER_URL.to_string(),
        })
    }

    /// Point the client at another `OpenAI`-compatible transcription endpoint
    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Transcribe audio to text
    ///
    /// # Arguments
    ///
    /// * `audio` - WAV audio bytes
    ///
    /// # Errors
    ///
    /// Returns [`Error::CaptureService`] if the service cannot be reached or
    /// fails, [`Error::CaptureUnintelligible`] if no words were recognized
    pub async fn transcribe(&self, audio: &[u8]) -> Result<String> {
        tracing::debug!(audio_bytes = audio.len(), "starting Whisper transcription");

        let form = reqwest::multipart::Form::new()
            .part(
                "file",
                reqwest::multipart::Part::bytes(audio.to_vec())
                    .file_name("audio.wav")
                    .mime_str("audio/wav")
                    .map_err(|e| Error::CaptureService(e.to_string()))?,
            )
            .text("model", self.model.clone())
            .text("language", self.language.clone());

        let response = self
            .client
            .post(&self.url)
            .bearer_auth(self.api_key.expose_secret())
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Whisper request failed");
                Error::CaptureService(e.to_string())
            })?;

        let status = response.status();
        tracing::debug!(status = %status, "received response");

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "Whisper API error");
            return Err(Error::CaptureService(format!("Whisper API error {status}: {body}")));
        }

        let result: WhisperResponse = response.json().await.map_err(|e| {
            tracing::error!(error = %e, "failed to parse response");
            Error::CaptureService(e.to_string())
        })?;

        transcript_or_unintelligible(&result.text)
    }
}

/// Turn a raw transcript into input text, rejecting empty recognitions
fn transcript_or_unintelligible(raw: &str) -> Result<String> {
    let text = raw.trim();
    if text.is_empty() {
        tracing::info!("transcription empty");
        return Err(Error::CaptureUnintelligible);
    }

    tracing::info!(transcript = %text, "transcription complete");
    Ok(text.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_transcript_is_unintelligible() {
        assert!(matches!(
            transcript_or_unintelligible("  \n"),
            Err(Error::CaptureUnintelligible)
        ));
        assert_eq!(transcript_or_unintelligible(" Hello ").unwrap(), "Hello");
    }

    #[test]
    fn whisper_requires_key() {
        let result = SpeechToText::new_whisper(String::new(), "whisper-1".into(), "en".into());
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[tokio::test]
    async fn unreachable_service_is_capture_service_error() {
        let stt = SpeechToText::new_whisper("k".into(), "whisper-1".into(), "en".into())
            .unwrap()
            .with_url("http://127.0.0.1:9/v1/audio/transcriptions");

        let result = stt.transcribe(b"RIFF").await;
        assert!(matches!(result, Err(Error::CaptureService(_))));
    }
}
