//! Generated audio persistence.
//!
//! Every file is written to a temp file inside the output directory and then
//! renamed into place, so a concurrent `GET` never observes a partial WAV.

use std::fmt;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::core::audio::{AudioError, encode_wav};
use crate::core::tts::Waveform;

/// File name used in shared naming mode.
pub const SHARED_OUTPUT_FILENAME: &str = "generated_audio.wav";

const OUTPUT_PREFIX: &str = "generated_";
const OUTPUT_EXTENSION: &str = ".wav";

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Failed to encode audio: {0}")]
    Encode(#[from] AudioError),

    #[error("Failed to write audio file: {0}")]
    Io(#[from] io::Error),
}

/// How output files are named.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputNaming {
    /// `generated_<uuid>.wav` per request
    #[default]
    Unique,
    /// One `generated_audio.wav`, overwritten by each request
    Shared,
}

impl OutputNaming {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unique => "unique",
            Self::Shared => "shared",
        }
    }

    pub fn parse(s: &str) -> Result<Self, String> {
        match s.trim().to_lowercase().as_str() {
            "unique" | "per-request" | "uuid" => Ok(Self::Unique),
            "shared" | "single" => Ok(Self::Shared),
            other => Err(format!(
                "Invalid output naming '{other}'. Must be 'unique' or 'shared'"
            )),
        }
    }
}

impl fmt::Display for OutputNaming {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A waveform written to the output directory.
#[derive(Debug, Clone)]
pub struct SavedOutput {
    pub file_name: String,
    pub path: PathBuf,
}

impl SavedOutput {
    /// URL path under which the file is served.
    pub fn public_path(&self) -> String {
        format!("/{}", self.file_name)
    }
}

/// Writes generated audio into one directory.
#[derive(Debug, Clone)]
pub struct OutputStore {
    dir: PathBuf,
    naming: OutputNaming,
}

impl OutputStore {
    pub fn new(dir: impl Into<PathBuf>, naming: OutputNaming) -> Self {
        Self {
            dir: dir.into(),
            naming,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn naming(&self) -> OutputNaming {
        self.naming
    }

    /// Create the output directory if it does not exist.
    pub async fn ensure_dir(&self) -> io::Result<()> {
        tokio::fs::create_dir_all(&self.dir).await
    }

    fn next_file_name(&self) -> String {
        match self.naming {
            OutputNaming::Shared => SHARED_OUTPUT_FILENAME.to_string(),
            OutputNaming::Unique => format!("{OUTPUT_PREFIX}{}{OUTPUT_EXTENSION}", Uuid::new_v4()),
        }
    }

    /// Encode `waveform` as WAV and move it into place.
    pub async fn save(&self, waveform: &Waveform) -> Result<SavedOutput, OutputError> {
        let bytes = encode_wav(waveform)?;
        let file_name = self.next_file_name();
        let path = self.dir.join(&file_name);

        let dir = self.dir.clone();
        let target = path.clone();
        tokio::task::spawn_blocking(move || write_atomically(&dir, &target, &bytes))
            .await
            .map_err(io::Error::other)??;

        debug!(
            "Wrote {:.2}s of audio to {}",
            waveform.duration_secs(),
            path.display()
        );

        Ok(SavedOutput { file_name, path })
    }

    /// Delete generated files older than `max_age`. Returns how many were removed.
    pub async fn sweep(&self, max_age: Duration) -> Result<usize, OutputError> {
        let now = SystemTime::now();
        let mut removed = 0;
        let mut entries = tokio::fs::read_dir(&self.dir).await?;

        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            if !is_generated_file(name) {
                continue;
            }

            let modified = match entry.metadata().await.and_then(|m| m.modified()) {
                Ok(modified) => modified,
                Err(e) => {
                    warn!("Skipping {name} during output sweep: {e}");
                    continue;
                }
            };
            let age = now.duration_since(modified).unwrap_or_default();
            if age < max_age {
                continue;
            }

            match tokio::fs::remove_file(entry.path()).await {
                Ok(()) => removed += 1,
                // Raced with another sweep or a shared-mode overwrite
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => warn!("Failed to remove expired output {name}: {e}"),
            }
        }

        Ok(removed)
    }

    /// Periodically sweep files older than `retention`.
    pub fn spawn_retention_task(self: Arc<Self>, retention: Duration, interval: Duration) -> JoinHandle<()> {
        info!(
            "Output retention enabled: removing files older than {}s every {}s",
            retention.as_secs(),
            interval.as_secs()
        );
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                match self.sweep(retention).await {
                    Ok(0) => {}
                    Ok(n) => info!("Removed {n} expired output file(s)"),
                    Err(e) => warn!("Output sweep failed: {e}"),
                }
            }
        })
    }
}

fn is_generated_file(name: &str) -> bool {
    name.starts_with(OUTPUT_PREFIX) && name.ends_with(OUTPUT_EXTENSION)
}

fn write_atomically(dir: &Path, target: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut tmp = tempfile::Builder::new()
        .prefix(".partial-")
        .suffix(OUTPUT_EXTENSION)
        .tempfile_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.flush()?;
    tmp.persist(target).map_err(|e| e.error)?;
    Ok(())
}
