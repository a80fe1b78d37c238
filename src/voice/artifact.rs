//! Temp-file backed audio produced by speech synthesis

use std::io::Write;
use std::path::Path;

use tempfile::TempPath;

use crate::Result;

/// Container format of synthesized audio
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioFormat {
    Mp3,
}

impl AudioFormat {
    #[must_use]
    pub const fn mime_type(self) -> &'static str {
        match self {
            Self::Mp3 => "audio/mp3",
        }
    }

    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Mp3 => ".mp3",
        }
    }
}

/// One synthesized utterance stored in a temporary file
///
/// The file is removed when the artifact is released after playback, or when
/// the artifact is dropped without being played.
#[derive(Debug)]
pub struct AudioArtifact {
    path: TempPath,
    format: AudioFormat,
}

impl AudioArtifact {
    /// Write MP3 bytes to a fresh temporary file
    ///
    /// # Errors
    ///
    /// Returns error if the temporary file cannot be created or written
    pub fn from_mp3(bytes: &[u8]) -> Result<Self> {
        let format = AudioFormat::Mp3;
        let mut file = tempfile::Builder::new()
            .prefix("parley-")
            .suffix(format.extension())
            .tempfile()?;
        file.write_all(bytes)?;
        file.flush()?;

        let path = file.into_temp_path();
        tracing::debug!(path = %path.display(), bytes = bytes.len(), "audio artifact written");

        Ok(Self { path, format })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub const fn format(&self) -> AudioFormat {
        self.format
    }

    /// Delete the backing file
    ///
    /// # Errors
    ///
    /// Returns error if the file could not be removed
    pub(crate) fn release(self) -> Result<()> {
        self.path.close()?;
        Ok(())
    }

    /// Give up on the artifact without touching its path
    pub(crate) fn abandon(self) {
        if let Err(e) = self.path.keep() {
            tracing::debug!(error = %e, "abandoned artifact path");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_bytes_to_mp3_file() {
        let artifact = AudioArtifact::from_mp3(b"ID3fake").unwrap();
        let path = artifact.path().to_path_buf();

        assert_eq!(path.extension().and_then(|e| e.to_str()), Some("mp3"));
        assert_eq!(std::fs::read(&path).unwrap(), b"ID3fake");
        assert_eq!(artifact.format().mime_type(), "audio/mp3");

        artifact.release().unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn dropping_unplayed_artifact_removes_file() {
        let artifact = AudioArtifact::from_mp3(b"data").unwrap();
        let path = artifact.path().to_path_buf();
        drop(artifact);
        assert!(!path.exists());
    }
}
