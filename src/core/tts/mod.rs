mod base;
pub mod command;
pub mod remote;

pub use base::{
    ApiKey, DEFAULT_SAMPLE_RATE, DEFAULT_TIMEOUT_SECONDS, GenerationParams, GenerationRequest,
    ModelBackend, ModelConfig, ModelDevice, ModelError, ModelResult, SharedSpeechModel,
    SpeechModel, Waveform,
};
pub use command::CommandSpeechModel;
pub use remote::RemoteSpeechModel;

use std::sync::Arc;

/// Factory function to create the speech model for a configuration.
///
/// # Supported Backends
///
/// - `none` - no model; returns `Ok(None)`
/// - `remote` - HTTP inference service ([`RemoteSpeechModel`])
/// - `command` - local executable ([`CommandSpeechModel`])
///
/// # Example
///
/// ```rust,ignore
/// use chatterbox_gateway::core::tts::{create_speech_model, ModelBackend, ModelConfig};
///
/// let config = ModelConfig {
///     backend: ModelBackend::Remote,
///     url: Some("http://127.0.0.1:9000".to_string()),
///     ..Default::default()
/// };
///
/// let model = create_speech_model(&config)?;
/// ```
pub fn create_speech_model(config: &ModelConfig) -> ModelResult<Option<SharedSpeechModel>> {
    match config.backend {
        ModelBackend::None => Ok(None),
        ModelBackend::Remote => Ok(Some(Arc::new(RemoteSpeechModel::new(config)?))),
        ModelBackend::Command => Ok(Some(Arc::new(CommandSpeechModel::new(config)?))),
    }
}
