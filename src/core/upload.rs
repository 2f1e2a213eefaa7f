//! Voice-reference uploads.
//!
//! The model contract takes a file path, so an uploaded reference clip is
//! written to a named temp file for the duration of one request. The file is
//! removed when the [`ReferenceAudio`] is dropped, whichever way the request
//! ends.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use bytes::Bytes;
use tempfile::NamedTempFile;
use tracing::debug;

use crate::core::audio::AudioFormat;

/// An uploaded reference clip persisted to disk.
#[derive(Debug)]
pub struct ReferenceAudio {
    file: NamedTempFile,
    format: AudioFormat,
    size: usize,
}

impl ReferenceAudio {
    /// Write `data` to a fresh temp file in `dir` (or the system temp dir).
    ///
    /// The file suffix follows the detected container so format-sniffing
    /// loaders on the model side pick the right decoder.
    pub async fn persist(data: Bytes, dir: Option<PathBuf>) -> io::Result<Self> {
        tokio::task::spawn_blocking(move || Self::persist_blocking(&data, dir.as_deref()))
            .await
            .map_err(io::Error::other)?
    }

    fn persist_blocking(data: &[u8], dir: Option<&Path>) -> io::Result<Self> {
        let format = AudioFormat::detect(data);
        let suffix = format!(".{}", format.extension());

        let mut builder = tempfile::Builder::new();
        builder.prefix("audio-prompt-").suffix(&suffix);
        let mut file = match dir {
            Some(dir) => builder.tempfile_in(dir)?,
            None => builder.tempfile()?,
        };

        file.write_all(data)?;
        file.flush()?;

        debug!(
            "Persisted reference audio ({} bytes, {:?}) to {}",
            data.len(),
            format,
            file.path().display()
        );

        Ok(Self {
            file,
            format,
            size: data.len(),
        })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    pub fn format(&self) -> AudioFormat {
        self.format
    }

    pub fn size(&self) -> usize {
        self.size
    }
}
