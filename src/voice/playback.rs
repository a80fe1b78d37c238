//! Audio playback to speakers

use std::io::Cursor;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleRate, StreamConfig};
use tokio::sync::oneshot;

use super::lifecycle::{InlineAudio, PlaybackEvents, PlaybackSurface};
use crate::{Error, Result};

/// Plays presented audio on the default output device
///
/// Each presentation runs on its own thread; clearing raises a stop flag that
/// the running thread observes within one poll interval.
#[derive(Default)]
pub struct SpeakerSurface {
    stop: Mutex<Option<Arc<AtomicBool>>>,
}

impl SpeakerSurface {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl PlaybackSurface for SpeakerSurface {
    fn clear(&self) {
        if let Ok(mut current) = self.stop.lock() {
            if let Some(flag) = current.take() {
                flag.store(true, Ordering::SeqCst);
                tracing::debug!("stopping speaker playback");
            }
        }
    }

    fn present(&self, audio: InlineAudio) -> Result<PlaybackEvents> {
        let mp3 = audio.decode()?;
        let stop = Arc::new(AtomicBool::new(false));

        {
            let mut current = self
                .stop
                .lock()
                .map_err(|_| Error::Audio("speaker state poisoned".to_string()))?;
            *current = Some(Arc::clone(&stop));
        }

        let (started_tx, started) = oneshot::channel();
        let (finished_tx, finished) = oneshot::channel();

        std::thread::spawn(move || {
            if let Err(e) = play_mp3_blocking(&mp3, &stop, started_tx) {
                tracing::error!(error = %e, "speaker playback failed");
            }
            finished_tx.send(()).ok();
        });

        Ok(PlaybackEvents { started, finished })
    }
}

/// Decode and play MP3 bytes until done or stopped
fn play_mp3_blocking(
    mp3_data: &[u8],
    stop: &AtomicBool,
    started: oneshot::Sender<()>,
) -> Result<()> {
    let (samples, sample_rate) = decode_mp3(mp3_data)?;
    if samples.is_empty() {
        return Ok(());
    }

    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| Error::Audio("no output device available".to_string()))?;

    let supported_config = device
        .supported_output_configs()
        .map_err(|e| Error::Audio(e.to_string()))?
        .find(|c| {
            c.channels() == 1
                && c.min_sample_rate() <= SampleRate(sample_rate)
                && c.max_sample_rate() >= SampleRate(sample_rate)
        })
        .or_else(|| {
            // Fallback: try stereo
            device.supported_output_configs().ok()?.find(|c| {
                c.channels() == 2
                    && c.min_sample_rate() <= SampleRate(sample_rate)
                    && c.max_sample_rate() >= SampleRate(sample_rate)
            })
        })
        .ok_or_else(|| Error::Audio("no suitable output config found".to_string()))?;

    let config: StreamConfig = supported_config
        .with_sample_rate(SampleRate(sample_rate))
        .config();
    let channels = config.channels as usize;

    let sample_count = samples.len();
    let samples = Arc::new(samples);
    let position = Arc::new(Mutex::new(0usize));
    let finished = Arc::new(AtomicBool::new(false));

    let samples_clone = Arc::clone(&samples);
    let position_clone = Arc::clone(&position);
    let finished_clone = Arc::clone(&finished);

    let stream = device
        .build_output_stream(
            &config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                let Ok(mut pos) = position_clone.lock() else {
                    return;
                };

                for frame in data.chunks_mut(channels) {
                    let sample = samples_clone.get(*pos).copied().unwrap_or_else(|| {
                        finished_clone.store(true, Ordering::SeqCst);
                        0.0
                    });

                    for out in frame.iter_mut() {
                        *out = sample;
                    }

                    if *pos < samples_clone.len() {
                        *pos += 1;
                    }
                }
            },
            |err| {
                tracing::error!(error = %err, "audio playback error");
            },
            None,
        )
        .map_err(|e| Error::Audio(e.to_string()))?;

    stream.play().map_err(|e| Error::Audio(e.to_string()))?;
    started.send(()).ok();
    tracing::debug!(samples = sample_count, sample_rate, "playback started");

    let duration_ms = (sample_count as u64 * 1000) / u64::from(sample_rate);
    let timeout = Duration::from_millis(duration_ms + 500);
    let start = Instant::now();

    while !finished.load(Ordering::SeqCst) && !stop.load(Ordering::SeqCst) {
        if start.elapsed() > timeout {
            break;
        }
        std::thread::sleep(Duration::from_millis(50));
    }

    drop(stream);
    tracing::debug!(
        stopped = stop.load(Ordering::SeqCst),
        "playback complete"
    );

    Ok(())
}

/// Decode MP3 bytes to mono f32 samples and their sample rate
fn decode_mp3(mp3_data: &[u8]) -> Result<(Vec<f32>, u32)> {
    let mut decoder = minimp3::Decoder::new(Cursor::new(mp3_data));
    let mut samples = Vec::new();
    let mut sample_rate = 24000;

    loop {
        match decoder.next_frame() {
            Ok(frame) => {
                #[allow(clippy::cast_sign_loss)]
                {
                    sample_rate = frame.sample_rate as u32;
                }

                if frame.channels == 2 {
                    // Stereo: average channels
                    samples.extend(frame.data.chunks(2).map(|chunk| {
                        let left = f32::from(chunk[0]) / 32768.0;
                        let right = f32::from(chunk.get(1).copied().unwrap_or(chunk[0])) / 32768.0;
                        f32::midpoint(left, right)
                    }));
                } else {
                    samples.extend(frame.data.iter().map(|&s| f32::from(s) / 32768.0));
                }
            }
            Err(minimp3::Error::Eof) => break,
            Err(e) => return Err(Error::Audio(format!("MP3 decode error: {e}"))),
        }
    }

    Ok((samples, sample_rate))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn garbage_decodes_to_nothing_or_errors() {
        match decode_mp3(b"definitely not an mp3") {
            Ok((samples, _)) => assert!(samples.is_empty()),
            Err(e) => assert!(matches!(e, Error::Audio(_))),
        }
    }

    #[test]
    fn clear_without_playback_is_noop() {
        let speaker = SpeakerSurface::new();
        speaker.clear();
        assert!(speaker.stop.lock().unwrap().is_none());
    }
}
