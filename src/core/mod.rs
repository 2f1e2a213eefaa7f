pub mod audio;
pub mod output;
pub mod tts;
pub mod upload;

// Re-export commonly used types for convenience
pub use audio::{AudioError, AudioFormat, decode_wav, encode_wav};
pub use output::{OutputError, OutputNaming, OutputStore, SHARED_OUTPUT_FILENAME, SavedOutput};
pub use tts::{
    GenerationParams, GenerationRequest, ModelBackend, ModelConfig, ModelDevice, ModelError,
    SharedSpeechModel, SpeechModel, Waveform, create_speech_model,
};
pub use upload::ReferenceAudio;
