//! Voice processing module
//!
//! Speech capture (microphone, voice activity detection, Whisper), speech
//! synthesis, and the playback lifecycle for synthesized replies.

mod artifact;
mod capture;
mod lifecycle;
mod microphone;
#[cfg(feature = "audio-io")]
mod playback;
mod stt;
mod tts;
mod vad;

use std::time::Duration;

use async_trait::async_trait;

pub use artifact::{AudioArtifact, AudioFormat};
#[cfg(feature = "audio-io")]
pub use capture::AudioCapture;
pub use capture::{Recording, SAMPLE_RATE, SampleSource, record_phrase, samples_to_wav};
pub use lifecycle::{
    AudioLifecycle, InlineAudio, Playback, PlaybackEvents, PlaybackSurface, WebAudioSlot,
};
pub use microphone::MicrophoneListener;
#[cfg(feature = "audio-io")]
pub use playback::SpeakerSurface;
pub use stt::SpeechToText;
pub use tts::{TextToSpeech, split_for_tts};
pub use vad::{DetectorState, UtteranceDetector};

use crate::Result;

/// Bounds on a single microphone capture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureLimits {
    /// How long to wait for speech to begin
    pub start_timeout: Duration,
    /// Longest phrase recorded once speech began
    pub phrase_limit: Duration,
    /// Background noise sampled before listening
    pub ambient_calibration: Duration,
}

impl Default for CaptureLimits {
    fn default() -> Self {
        Self {
            start_timeout: Duration::from_secs(10),
            phrase_limit: Duration::from_secs(10),
            ambient_calibration: Duration::from_secs(1),
        }
    }
}

/// Turns one spoken phrase into text
#[async_trait]
pub trait SpeechCapture: Send + Sync {
    /// Listen for a single phrase
    ///
    /// # Errors
    ///
    /// [`crate::Error::CaptureTimeout`] if nobody spoke in time,
    /// [`crate::Error::CaptureUnintelligible`] if the speech could not be
    /// recognized, [`crate::Error::CaptureService`] if recognition failed.
    async fn listen(&self, limits: &CaptureLimits) -> Result<String>;
}

/// Turns text into MP3 audio
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Synthesize `text` spoken in `language`
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Synthesis`] if no audio could be produced
    async fn synthesize(&self, text: &str, language: &str) -> Result<Vec<u8>>;
}
