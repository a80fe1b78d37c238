//! Audio capture from microphone

use std::time::{Duration, Instant};

use super::CaptureLimits;
use super::vad::{DetectorState, UtteranceDetector};
use crate::{Error, Result};

/// Sample rate for audio capture (16kHz for speech)
pub const SAMPLE_RATE: u32 = 16000;

/// How often the capture buffer is drained into the detector
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Outcome of recording one phrase
#[derive(Debug)]
pub enum Recording {
    /// Samples of the spoken phrase
    Phrase(Vec<f32>),
    /// Nothing was said within the start timeout
    NoSpeech,
}

/// Source of raw microphone samples
///
/// Implemented by the cpal-backed [`AudioCapture`]; tests feed canned audio.
pub trait SampleSource {
    /// Samples captured since the last call
    fn take_samples(&mut self) -> Vec<f32>;
}

/// Record a single phrase from `source`
///
/// Blocks the calling thread: first samples ambient noise for
/// `limits.ambient_calibration`, then waits up to `limits.start_timeout` for
/// speech and records at most `limits.phrase_limit` of it.
///
/// # Errors
///
/// Returns error if the source stops producing audio entirely
pub fn record_phrase(source: &mut dyn SampleSource, limits: &CaptureLimits) -> Result<Recording> {
    let mut detector = UtteranceDetector::new(SAMPLE_RATE, limits);

    let calibration_end = Instant::now() + limits.ambient_calibration;
    let mut ambient = Vec::new();
    while Instant::now() < calibration_end {
        std::thread::sleep(POLL_INTERVAL);
        ambient.extend(source.take_samples());
    }
    detector.calibrate(&ambient);

    // Wall-clock guard in case the device delivers fewer samples than expected
    let deadline = Instant::now() + limits.start_timeout + limits.phrase_limit + POLL_INTERVAL * 4;

    loop {
        std::thread::sleep(POLL_INTERVAL);
        let samples = source.take_samples();

        match detector.process(&samples) {
            DetectorState::Complete => return Ok(Recording::Phrase(detector.take_utterance())),
            DetectorState::TimedOut => return Ok(Recording::NoSpeech),
            DetectorState::WaitingForSpeech | DetectorState::Capturing => {}
        }

        if Instant::now() >= deadline {
            return match detector.state() {
                DetectorState::Capturing => Ok(Recording::Phrase(detector.take_utterance())),
                _ if samples.is_empty() => {
                    Err(Error::Audio("microphone delivered no audio".to_string()))
                }
                _ => Ok(Recording::NoSpeech),
            };
        }
    }
}

#[cfg(feature = "audio-io")]
pub use device::AudioCapture;

#[cfg(feature = "audio-io")]
mod device {
    use std::sync::{Arc, Mutex};

    use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
    use cpal::{SampleRate, Stream, StreamConfig};

    use super::{SAMPLE_RATE, SampleSource};
    use crate::{Error, Result};

    /// Captures audio from the default input device
    ///
    /// Holds a live cpal stream, so it must stay on the thread that created it.
    pub struct AudioCapture {
        buffer: Arc<Mutex<Vec<f32>>>,
        _stream: Stream,
    }

    impl AudioCapture {
        /// Open the default input device and start capturing
        ///
        /// # Errors
        ///
        /// Returns error if audio device cannot be opened
        pub fn start() -> Result<Self> {
            let host = cpal::default_host();

            let device = host
                .default_input_device()
                .ok_or_else(|| Error::Audio("no input device available".to_string()))?;

            let supported_config = device
                .supported_input_configs()
                .map_err(|e| Error::Audio(e.to_string()))?
                .find(|c| {
                    c.channels() == 1
                        && c.min_sample_rate() <= SampleRate(SAMPLE_RATE)
                        && c.max_sample_rate() >= SampleRate(SAMPLE_RATE)
                })
                .ok_or_else(|| Error::Audio("no suitable audio config found".to_string()))?;

            let config: StreamConfig = supported_config
                .with_sample_rate(SampleRate(SAMPLE_RATE))
                .config();

            let buffer = Arc::new(Mutex::new(Vec::new()));
            let sink = Arc::clone(&buffer);

            let stream = device
                .build_input_stream(
                    &config,
                    move |data: &[f32], _: &cpal::InputCallbackInfo| {
                        if let Ok(mut buf) = sink.lock() {
                            buf.extend_from_slice(data);
                        }
                    },
                    |err| {
                        tracing::error!(error = %err, "audio capture error");
                    },
                    None,
                )
                .map_err(|e| Error::Audio(e.to_string()))?;

            stream.play().map_err(|e| Error::Audio(e.to_string()))?;

            tracing::debug!(
                device = device.name().unwrap_or_default(),
                sample_rate = SAMPLE_RATE,
                "audio capture started"
            );

            Ok(Self {
                buffer,
                _stream: stream,
            })
        }
    }

    impl SampleSource for AudioCapture {
        fn take_samples(&mut self) -> Vec<f32> {
            self.buffer
                .lock()
                .map(|mut buf| std::mem::take(&mut *buf))
                .unwrap_or_default()
        }
    }

    impl Drop for AudioCapture {
        fn drop(&mut self) {
            tracing::debug!("audio capture stopped");
        }
    }
}

/// Convert f32 samples to WAV bytes for STT APIs
///
/// # Errors
///
/// Returns error if WAV encoding fails
pub fn samples_to_wav(samples: &[f32], sample_rate: u32) -> Result<Vec<u8>> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = std::io::Cursor::new(Vec::new());
    {
        let mut writer =
            hound::WavWriter::new(&mut cursor, spec).map_err(|e| Error::Audio(e.to_string()))?;

        for &sample in samples {
            // Convert f32 [-1.0, 1.0] to i16
            #[allow(clippy::cast_possible_truncation)]
            let sample_i16 = (sample * 32767.0).clamp(-32768.0, 32767.0) as i16;
            writer
                .write_sample(sample_i16)
                .map_err(|e| Error::Audio(e.to_string()))?;
        }

        writer.finalize().map_err(|e| Error::Audio(e.to_string()))?;
    }

    Ok(cursor.into_inner())
}
