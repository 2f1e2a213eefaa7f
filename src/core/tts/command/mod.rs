//! Local executable backend.
//!
//! ```yaml
//! model:
//!   backend: command
//!   command: python3
//!   args: ["scripts/chatterbox_generate.py"]
//!   device: cuda
//! ```

mod provider;

pub use provider::CommandSpeechModel;
