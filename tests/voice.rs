//! Voice pipeline integration tests
//!
//! Tests voice components without requiring audio hardware

use std::collections::VecDeque;
use std::io::Cursor;
use std::time::Duration;

use parley::voice::{
    AudioArtifact, CaptureLimits, DetectorState, InlineAudio, Recording, SAMPLE_RATE,
    SampleSource, UtteranceDetector, record_phrase, samples_to_wav, split_for_tts,
};

/// Generate sine wave audio samples
fn generate_sine_samples(frequency: f32, duration_secs: f32, amplitude: f32) -> Vec<f32> {
    let num_samples = (SAMPLE_RATE as f32 * duration_secs) as usize;
    (0..num_samples)
        .map(|i| {
            let t = i as f32 / SAMPLE_RATE as f32;
            amplitude * (2.0 * std::f32::consts::PI * frequency * t).sin()
        })
        .collect()
}

/// Generate silence
fn generate_silence(duration_secs: f32) -> Vec<f32> {
    let num_samples = (SAMPLE_RATE as f32 * duration_secs) as usize;
    vec![0.0; num_samples]
}

/// Hands out audio in fixed-size chunks, then silence
struct ChunkedSource {
    chunks: VecDeque<Vec<f32>>,
}

impl ChunkedSource {
    fn new(audio: &[f32], chunk: usize) -> Self {
        Self {
            chunks: audio.chunks(chunk).map(<[f32]>::to_vec).collect(),
        }
    }
}

impl SampleSource for ChunkedSource {
    fn take_samples(&mut self) -> Vec<f32> {
        self.chunks.pop_front().unwrap_or_else(|| vec![0.0; 800])
    }
}

#[test]
fn test_default_capture_limits() {
    let limits = CaptureLimits::default();
    assert_eq!(limits.start_timeout, Duration::from_secs(10));
    assert_eq!(limits.phrase_limit, Duration::from_secs(10));
    assert_eq!(limits.ambient_calibration, Duration::from_secs(1));
}

#[test]
fn test_detector_full_cycle() {
    let mut detector = UtteranceDetector::new(SAMPLE_RATE, &CaptureLimits::default());
    detector.calibrate(&generate_silence(1.0));

    assert_eq!(detector.process(&generate_silence(0.5)), DetectorState::WaitingForSpeech);
    assert_eq!(
        detector.process(&generate_sine_samples(300.0, 1.0, 0.4)),
        DetectorState::Capturing
    );
    assert_eq!(detector.process(&generate_silence(1.0)), DetectorState::Complete);

    let utterance = detector.take_utterance();
    assert_eq!(utterance.len(), (SAMPLE_RATE * 2) as usize);
}

#[test]
fn test_record_phrase_from_chunked_audio() {
    let mut audio = generate_sine_samples(440.0, 0.6, 0.3);
    audio.extend(generate_silence(1.0));
    let mut source = ChunkedSource::new(&audio, 1600);

    let limits = CaptureLimits {
        start_timeout: Duration::from_secs(1),
        phrase_limit: Duration::from_secs(5),
        ambient_calibration: Duration::ZERO,
    };

    match record_phrase(&mut source, &limits).unwrap() {
        Recording::Phrase(samples) => assert!(samples.len() >= 9600),
        Recording::NoSpeech => panic!("expected a phrase"),
    }
}

#[test]
fn test_samples_to_wav_roundtrip() {
    let samples = generate_sine_samples(440.0, 0.1, 0.5);
    let wav = samples_to_wav(&samples, SAMPLE_RATE).unwrap();

    let reader = hound::WavReader::new(Cursor::new(wav)).unwrap();
    let spec = reader.spec();
    assert_eq!(spec.channels, 1);
    assert_eq!(spec.sample_rate, SAMPLE_RATE);
    assert_eq!(spec.bits_per_sample, 16);
    assert_eq!(reader.len() as usize, samples.len());
}

#[test]
fn test_google_chunks_stay_under_limit() {
    let text = "Welcome, Ada. This is Speech Chat Bot, your professional voice assistant. \
                Ask me anything you like and I will do my best to answer briefly.";
    let chunks = split_for_tts(text, 100);

    assert!(chunks.len() > 1);
    assert!(chunks.iter().all(|c| c.chars().count() <= 100));
    assert_eq!(chunks.join(" "), text.split_whitespace().collect::<Vec<_>>().join(" "));
}

#[test]
fn test_inline_audio_data_uri() {
    let inline = InlineAudio::encode(b"ID3abc", "audio/mp3");
    assert_eq!(inline.data_uri(), "data:audio/mp3;base64,SUQzYWJj");
    assert_eq!(inline.decode().unwrap(), b"ID3abc");
}

#[test]
fn test_unplayed_artifact_is_cleaned_up() {
    let artifact = AudioArtifact::from_mp3(b"ID3abc").unwrap();
    let path = artifact.path().to_path_buf();
    assert!(path.exists());
    assert_eq!(path.extension().and_then(|e| e.to_str()), Some("mp3"));

    drop(artifact);
    assert!(!path.exists());
}
