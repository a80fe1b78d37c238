//! Playback sequencing for synthesized replies
//!
//! [`AudioLifecycle`] owns the single "currently presented" audio slot. Each
//! call to [`AudioLifecycle::play`] clears the previous audio before
//! presenting the next one, then deletes the artifact's temp file once the
//! surface reports that playback started (or the settle delay elapses).

use std::sync::Mutex;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Serialize;
use tokio::sync::oneshot;

use super::AudioArtifact;
use crate::{Error, Result};

/// Audio encoded for inline delivery, marked for autoplay
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InlineAudio {
    pub mime_type: &'static str,
    /// Base64 of the audio bytes
    pub data: String,
    pub autoplay: bool,
}

impl InlineAudio {
    /// Encode raw bytes for autoplay
    #[must_use]
    pub fn encode(bytes: &[u8], mime_type: &'static str) -> Self {
        Self {
            mime_type,
            data: STANDARD.encode(bytes),
            autoplay: true,
        }
    }

    /// `data:` URI suitable for an `<audio>` source
    #[must_use]
    pub fn data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.data)
    }

    /// Decode back to raw bytes
    ///
    /// # Errors
    ///
    /// Returns error if the payload is not valid base64
    pub fn decode(&self) -> Result<Vec<u8>> {
        STANDARD
            .decode(&self.data)
            .map_err(|e| Error::Audio(format!("invalid inline audio: {e}")))
    }
}

/// Signals a surface raises for presented audio
///
/// A dropped sender counts as "no information"; waiters stop waiting.
#[derive(Debug)]
pub struct PlaybackEvents {
    pub started: oneshot::Receiver<()>,
    pub finished: oneshot::Receiver<()>,
}

impl PlaybackEvents {
    /// Events for a surface that hands audio over without tracking it
    ///
    /// `started` fires right away; `finished` is unknown.
    #[must_use]
    pub fn handed_over() -> Self {
        let (started_tx, started) = oneshot::channel();
        let (_, finished) = oneshot::channel();
        started_tx.send(()).ok();
        Self { started, finished }
    }
}

/// Where presented audio ends up: a web page slot, the speakers, a test log
pub trait PlaybackSurface: Send + Sync {
    /// Stop and remove whatever is currently presented
    fn clear(&self);

    /// Present audio for autoplay
    ///
    /// # Errors
    ///
    /// Returns error if the surface cannot accept the audio
    fn present(&self, audio: InlineAudio) -> Result<PlaybackEvents>;
}

/// Handle to audio that was presented
#[derive(Debug)]
pub struct Playback {
    id: u64,
    finished: oneshot::Receiver<()>,
}

impl Playback {
    #[must_use]
    pub const fn id(&self) -> u64 {
        self.id
    }

    /// Resolve when the surface reports the end of playback
    ///
    /// Resolves immediately for surfaces that cannot observe playback.
    pub async fn finished(self) {
        if self.finished.await.is_err() {
            tracing::trace!(id = self.id, "surface does not report playback end");
        }
    }

    /// Like [`Playback::finished`], giving up after `limit`
    ///
    /// Returns `false` if the limit elapsed first.
    pub async fn finished_within(self, limit: Duration) -> bool {
        tokio::time::timeout(limit, self.finished()).await.is_ok()
    }
}

/// Owner of the single active audio slot
pub struct AudioLifecycle<S> {
    surface: S,
    settle_delay: Duration,
    presented: Option<u64>,
    next_id: u64,
}

impl<S: PlaybackSurface> AudioLifecycle<S> {
    /// Create a lifecycle presenting on `surface`
    ///
    /// `settle_delay` bounds how long to wait for a playback-started signal
    /// before deleting the artifact's file.
    #[must_use]
    pub const fn new(surface: S, settle_delay: Duration) -> Self {
        Self {
            surface,
            settle_delay,
            presented: None,
            next_id: 1,
        }
    }

    #[must_use]
    pub const fn surface(&self) -> &S {
        &self.surface
    }

    /// Id of the audio last handed to the surface, until [`stop`](Self::stop)
    ///
    /// This tracks what the surface holds, not whether it is audible. A web
    /// slot keeps its audio after the page has finished playing it.
    #[must_use]
    pub const fn presented(&self) -> Option<u64> {
        self.presented
    }

    /// Stop and clear the presented audio, if any
    pub fn stop(&mut self) {
        if let Some(id) = self.presented.take() {
            tracing::debug!(id, "stopping playback");
        }
        self.surface.clear();
    }

    /// Present an artifact, replacing whatever played before
    ///
    /// # Errors
    ///
    /// Returns [`Error::PlaybackMissingFile`] if the artifact's file is gone
    /// (nothing is cleared or deleted in that case), or the surface's error
    /// if it rejects the audio.
    pub async fn play(&mut self, artifact: AudioArtifact) -> Result<Playback> {
        let bytes = match tokio::fs::read(artifact.path()).await {
            Ok(bytes) => bytes,
            Err(e) => {
                let path = artifact.path().to_path_buf();
                tracing::error!(path = %path.display(), error = %e, "audio artifact unreadable");
                artifact.abandon();
                return Err(Error::PlaybackMissingFile(path));
            }
        };

        self.stop();

        let inline = InlineAudio::encode(&bytes, artifact.format().mime_type());
        let events = self.surface.present(inline)?;

        let id = self.next_id;
        self.next_id += 1;
        self.presented = Some(id);
        tracing::debug!(id, bytes = bytes.len(), "audio presented");

        match tokio::time::timeout(self.settle_delay, events.started).await {
            Ok(Ok(())) => tracing::debug!(id, "playback started"),
            Ok(Err(_)) => tracing::debug!(id, "surface gave no start signal"),
            Err(_) => tracing::warn!(
                id,
                settle_ms = self.settle_delay.as_millis(),
                "playback start not confirmed within settle delay"
            ),
        }

        if let Err(e) = artifact.release() {
            tracing::warn!(id, error = %e, "failed to delete audio artifact");
        }

        Ok(Playback {
            id,
            finished: events.finished,
        })
    }
}

/// Slot holding the audio a web page should autoplay next
#[derive(Debug, Default)]
pub struct WebAudioSlot {
    current: Mutex<Option<InlineAudio>>,
}

impl WebAudioSlot {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Audio currently presented, if any
    #[must_use]
    pub fn current(&self) -> Option<InlineAudio> {
        self.current
            .lock()
            .map(|slot| slot.clone())
            .unwrap_or_default()
    }
}

impl PlaybackSurface for WebAudioSlot {
    fn clear(&self) {
        if let Ok(mut slot) = self.current.lock() {
            *slot = None;
        }
    }

    fn present(&self, audio: InlineAudio) -> Result<PlaybackEvents> {
        let mut slot = self
            .current
            .lock()
            .map_err(|_| Error::Audio("audio slot poisoned".to_string()))?;
        *slot = Some(audio);
        Ok(PlaybackEvents::handed_over())
    }
}
