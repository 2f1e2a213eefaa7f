//! HTTP request handlers
//!
//! - `api` - Health check and model description
//! - `generate` - Text-to-speech generation from form posts

pub mod api;
pub mod generate;

pub use generate::{GenerateAudioResponse, generate_audio};
