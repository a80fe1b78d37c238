//! Voice activity detection for a single utterance
//!
//! Energy-based: an ambient noise sample sets the threshold, speech starts
//! when a chunk rises above it, and the phrase ends after a pause or when the
//! phrase limit is reached.

use std::time::Duration;

use super::CaptureLimits;

/// Speech threshold used before calibration
const DEFAULT_ENERGY_THRESHOLD: f32 = 0.03;

/// Calibrated thresholds never drop below this
const MIN_ENERGY_THRESHOLD: f32 = 0.01;

/// Calibrated threshold as a multiple of the ambient level
const AMBIENT_MULTIPLIER: f32 = 2.0;

/// Minimum speech before a pause may end the phrase
const MIN_SPEECH: Duration = Duration::from_millis(300);

/// Silence that ends a phrase
const PAUSE: Duration = Duration::from_millis(800);

/// State of the utterance detector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectorState {
    /// Waiting for speech to start
    WaitingForSpeech,
    /// Speech started, accumulating
    Capturing,
    /// Phrase ended by a pause or the phrase limit
    Complete,
    /// Nothing was said before the start timeout
    TimedOut,
}

/// Detects one spoken phrase in a stream of samples
pub struct UtteranceDetector {
    threshold: f32,
    state: DetectorState,
    speech_buffer: Vec<f32>,
    silence_counter: usize,
    waited: usize,
    start_timeout: usize,
    phrase_limit: usize,
    min_speech: usize,
    pause: usize,
}

impl UtteranceDetector {
    /// Create a detector for audio at `sample_rate`
    #[must_use]
    pub fn new(sample_rate: u32, limits: &CaptureLimits) -> Self {
        Self {
            threshold: DEFAULT_ENERGY_THRESHOLD,
            state: DetectorState::WaitingForSpeech,
            speech_buffer: Vec::new(),
            silence_counter: 0,
            waited: 0,
            start_timeout: duration_to_samples(limits.start_timeout, sample_rate),
            phrase_limit: duration_to_samples(limits.phrase_limit, sample_rate),
            min_speech: duration_to_samples(MIN_SPEECH, sample_rate),
            pause: duration_to_samples(PAUSE, sample_rate),
        }
    }

    /// Set the speech threshold from a sample of background noise
    ///
    /// Returns the new threshold.
    pub fn calibrate(&mut self, ambient: &[f32]) -> f32 {
        let ambient_energy = calculate_energy(ambient);
        self.threshold = (ambient_energy * AMBIENT_MULTIPLIER).max(MIN_ENERGY_THRESHOLD);
        tracing::debug!(ambient_energy, threshold = self.threshold, "calibrated for ambient noise");
        self.threshold
    }

    #[must_use]
    pub const fn state(&self) -> DetectorState {
        self.state
    }

    /// Feed a chunk of samples and return the resulting state
    pub fn process(&mut self, samples: &[f32]) -> DetectorState {
        let energy = calculate_energy(samples);
        let is_speech = energy > self.threshold;

        match self.state {
            DetectorState::WaitingForSpeech => {
                if is_speech {
                    self.state = DetectorState::Capturing;
                    self.speech_buffer.clear();
                    self.speech_buffer.extend_from_slice(samples);
                    self.silence_counter = 0;
                    tracing::trace!(energy, "speech detected, capturing");
                } else {
                    self.waited += samples.len();
                    if self.waited >= self.start_timeout {
                        tracing::debug!(waited = self.waited, "no speech before timeout");
                        self.state = DetectorState::TimedOut;
                    }
                }
            }
            DetectorState::Capturing => {
                self.speech_buffer.extend_from_slice(samples);

                if is_speech {
                    self.silence_counter = 0;
                } else {
                    self.silence_counter += samples.len();
                }

                if self.speech_buffer.len() >= self.phrase_limit {
                    self.speech_buffer.truncate(self.phrase_limit);
                    tracing::debug!(samples = self.speech_buffer.len(), "phrase limit reached");
                    self.state = DetectorState::Complete;
                } else if self.silence_counter > self.pause {
                    if self.speech_buffer.len() - self.silence_counter > self.min_speech {
                        tracing::debug!(
                            samples = self.speech_buffer.len(),
                            "speech segment complete"
                        );
                        self.state = DetectorState::Complete;
                    } else {
                        // Too short to be speech, keep waiting
                        tracing::trace!("discarding short noise burst");
                        self.waited += self.speech_buffer.len();
                        self.speech_buffer.clear();
                        self.silence_counter = 0;
                        self.state = DetectorState::WaitingForSpeech;
                    }
                }
            }
            DetectorState::Complete | DetectorState::TimedOut => {}
        }

        self.state
    }

    /// Take the captured phrase, clearing it
    pub fn take_utterance(&mut self) -> Vec<f32> {
        std::mem::take(&mut self.speech_buffer)
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
fn duration_to_samples(duration: Duration, sample_rate: u32) -> usize {
    (duration.as_secs_f64() * f64::from(sample_rate)) as usize
}

/// Calculate RMS energy of audio samples
#[allow(clippy::cast_precision_loss)]
fn calculate_energy(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }

    let sum_squares: f32 = samples.iter().map(|s| s * s).sum();
    (sum_squares / samples.len() as f32).sqrt()
}
