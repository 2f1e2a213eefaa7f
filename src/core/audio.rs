//! Audio helpers: container sniffing and WAV encode/decode.

use std::io::Cursor;

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use thiserror::Error;

use crate::core::tts::Waveform;

#[derive(Debug, Error)]
pub enum AudioError {
    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),

    #[error("Unsupported WAV layout: {0}")]
    UnsupportedLayout(String),

    #[error("Invalid sample rate: {0}")]
    InvalidSampleRate(u32),
}

/// Audio container recognised from its leading bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioFormat {
    Wav,
    Mp3,
    Ogg,
    Flac,
    M4a,
    Unknown,
}

impl AudioFormat {
    /// Detect the container from magic bytes.
    pub fn detect(data: &[u8]) -> Self {
        if data.len() < 12 {
            return Self::Unknown;
        }
        if data.starts_with(b"RIFF") && &data[8..12] == b"WAVE" {
            return Self::Wav;
        }
        if data.starts_with(b"ID3") || (data[0] == 0xFF && (data[1] & 0xE0) == 0xE0) {
            return Self::Mp3;
        }
        if data.starts_with(b"OggS") {
            return Self::Ogg;
        }
        if data.starts_with(b"fLaC") {
            return Self::Flac;
        }
        if &data[4..8] == b"ftyp" {
            return Self::M4a;
        }
        Self::Unknown
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Wav => "wav",
            Self::Mp3 => "mp3",
            Self::Ogg => "ogg",
            Self::Flac => "flac",
            Self::M4a => "m4a",
            Self::Unknown => "bin",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Wav => "audio/wav",
            Self::Mp3 => "audio/mpeg",
            Self::Ogg => "audio/ogg",
            Self::Flac => "audio/flac",
            Self::M4a => "audio/mp4",
            Self::Unknown => "application/octet-stream",
        }
    }
}

/// Encode a waveform as 32-bit float mono WAV.
pub fn encode_wav(waveform: &Waveform) -> Result<Vec<u8>, AudioError> {
    if waveform.sample_rate == 0 {
        return Err(AudioError::InvalidSampleRate(0));
    }

    let spec = WavSpec {
        channels: 1,
        sample_rate: waveform.sample_rate,
        bits_per_sample: 32,
        sample_format: SampleFormat::Float,
    };

    let mut cursor = Cursor::new(Vec::with_capacity(44 + waveform.samples.len() * 4));
    {
        let mut writer = WavWriter::new(&mut cursor, spec)?;
        for &sample in &waveform.samples {
            writer.write_sample(sample)?;
        }
        writer.finalize()?;
    }
    Ok(cursor.into_inner())
}

/// Decode a WAV body into a mono waveform.
///
/// Integer PCM is scaled to `[-1, 1]`; multi-channel audio is averaged down
/// to one channel.
pub fn decode_wav(data: &[u8]) -> Result<Waveform, AudioError> {
    let mut reader = WavReader::new(Cursor::new(data))?;
    let spec = reader.spec();

    if spec.sample_rate == 0 {
        return Err(AudioError::InvalidSampleRate(0));
    }
    if spec.channels == 0 {
        return Err(AudioError::UnsupportedLayout("zero channels".to_string()));
    }

    let interleaved: Vec<f32> = match (spec.sample_format, spec.bits_per_sample) {
        (SampleFormat::Float, 32) => reader.samples::<f32>().collect::<Result<_, _>>()?,
        (SampleFormat::Int, bits @ 8..=32) => {
            let scale = (1i64 << (bits - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<Result<_, _>>()?
        }
        (format, bits) => {
            return Err(AudioError::UnsupportedLayout(format!(
                "{bits}-bit {format:?}"
            )));
        }
    };

    let channels = spec.channels as usize;
    let samples = if channels == 1 {
        interleaved
    } else {
        interleaved
            .chunks_exact(channels)
            .map(|frame| frame.iter().sum::<f32>() / channels as f32)
            .collect()
    };

    Ok(Waveform::new(samples, spec.sample_rate))
}
