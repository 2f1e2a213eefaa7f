//! Base traits and types for speech model backends.
//!
//! The gateway never runs inference itself. A [`SpeechModel`] is the opaque
//! collaborator that turns text (plus an optional voice reference) into a
//! mono waveform; backends differ only in how they reach the model.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::core::audio::AudioError;

/// Default model sample rate (Hz).
pub const DEFAULT_SAMPLE_RATE: u32 = 24_000;

/// Default upper bound for a single generation call (seconds).
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 300;

// =============================================================================
// Error Types
// =============================================================================

/// Errors raised while talking to a speech model backend.
#[derive(Debug, Error)]
pub enum ModelError {
    /// Backend configuration is unusable
    #[error("Invalid model configuration: {0}")]
    InvalidConfiguration(String),

    /// The model service could not be reached
    #[error("Connection to model failed: {0}")]
    ConnectionFailed(String),

    /// The model service answered with a non-success status
    #[error("Model returned HTTP {status}: {message}")]
    RequestFailed { status: u16, message: String },

    /// The model process exited unsuccessfully
    #[error("Model process failed (exit code {code:?}): {stderr}")]
    ProcessFailed { code: Option<i32>, stderr: String },

    /// Generation did not finish in time
    #[error("Model did not respond within {0} seconds")]
    Timeout(u64),

    /// The model produced audio the gateway cannot read
    #[error("Invalid audio from model: {0}")]
    InvalidAudio(#[from] AudioError),

    /// The model produced no samples
    #[error("Model returned an empty waveform")]
    EmptyOutput,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for model operations.
pub type ModelResult<T> = Result<T, ModelError>;

// =============================================================================
// Configuration Types
// =============================================================================

/// How the gateway reaches the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelBackend {
    /// No model configured; generation requests fail with 500
    #[default]
    None,
    /// HTTP inference service
    Remote,
    /// Local executable run once per request
    Command,
}

impl ModelBackend {
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Remote => "remote",
            Self::Command => "command",
        }
    }

    /// Parse a backend name. Unknown names are rejected rather than defaulted
    /// so a typo never silently disables the model.
    pub fn parse(s: &str) -> Result<Self, String> {
        match s.trim().to_lowercase().as_str() {
            "" | "none" | "disabled" => Ok(Self::None),
            "remote" | "http" => Ok(Self::Remote),
            "command" | "cmd" | "process" => Ok(Self::Command),
            other => Err(format!(
                "Unsupported model backend: {other}. Supported backends: none, remote, command"
            )),
        }
    }
}

impl fmt::Display for ModelBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Target device the model should run on.
///
/// Passed explicitly to the backend instead of patching the model loader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelDevice {
    #[default]
    Cpu,
    Cuda,
    Mps,
}

impl ModelDevice {
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cpu => "cpu",
            Self::Cuda => "cuda",
            Self::Mps => "mps",
        }
    }

    /// Parse a device name. Unknown names are rejected; an empty value means CPU.
    pub fn parse(s: &str) -> Result<Self, String> {
        match s.trim().to_lowercase().as_str() {
            "" | "cpu" => Ok(Self::Cpu),
            "cuda" | "gpu" => Ok(Self::Cuda),
            "mps" | "metal" => Ok(Self::Mps),
            other => Err(format!(
                "Unsupported model device: {other}. Supported devices: cpu, cuda, mps"
            )),
        }
    }
}

impl fmt::Display for ModelDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Bearer token for the model service. Wiped from memory on drop and never
/// printed by `Debug`.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(***)")
    }
}

/// Model backend configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelConfig {
    pub backend: ModelBackend,
    /// Base URL of the inference service (`remote`)
    pub url: Option<String>,
    /// Optional bearer token for the inference service (`remote`)
    pub api_key: Option<ApiKey>,
    /// Program to execute (`command`)
    pub command: Option<String>,
    /// Leading arguments placed before the generated ones (`command`)
    pub args: Vec<String>,
    pub device: ModelDevice,
    /// The model's native sample rate
    pub sample_rate: u32,
    pub timeout_seconds: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            backend: ModelBackend::None,
            url: None,
            api_key: None,
            command: None,
            args: Vec::new(),
            device: ModelDevice::Cpu,
            sample_rate: DEFAULT_SAMPLE_RATE,
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
        }
    }
}

// =============================================================================
// Request / Response Types
// =============================================================================

/// Tuning parameters forwarded untouched to the model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GenerationParams {
    /// Emotion exaggeration
    pub exaggeration: f32,
    /// Sampling temperature
    pub temperature: f32,
    /// Classifier-free guidance weight
    pub cfg_weight: f32,
}

impl GenerationParams {
    pub const DEFAULT_EXAGGERATION: f32 = 0.5;
    pub const DEFAULT_TEMPERATURE: f32 = 0.8;
    pub const DEFAULT_CFG_WEIGHT: f32 = 0.5;
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            exaggeration: Self::DEFAULT_EXAGGERATION,
            temperature: Self::DEFAULT_TEMPERATURE,
            cfg_weight: Self::DEFAULT_CFG_WEIGHT,
        }
    }
}

/// One call into the model.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub text: String,
    /// Voice reference to condition on; the file only lives for the request
    pub audio_prompt_path: Option<PathBuf>,
    pub params: GenerationParams,
}

/// Mono waveform produced by the model.
#[derive(Debug, Clone, PartialEq)]
pub struct Waveform {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl Waveform {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration_secs(&self) -> f32 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f32 / self.sample_rate as f32
    }
}

// =============================================================================
// Speech Model Trait
// =============================================================================

/// The `generate` contract of the wrapped pretrained model.
#[async_trait]
pub trait SpeechModel: Send + Sync {
    /// Synthesize `request.text`, optionally conditioned on the reference audio.
    async fn generate(&self, request: &GenerationRequest) -> ModelResult<Waveform>;

    /// Native sample rate of the model (its `sr`).
    fn sample_rate(&self) -> u32;

    /// Device the model was asked to run on.
    fn device(&self) -> ModelDevice;

    /// Check that the model is reachable. Backends without a cheap probe
    /// report healthy.
    async fn health_check(&self) -> ModelResult<()> {
        Ok(())
    }

    /// Backend description for the `/model` endpoint.
    fn get_model_info(&self) -> serde_json::Value;
}

/// Shared handle to a model backend.
pub type SharedSpeechModel = Arc<dyn SpeechModel>;
