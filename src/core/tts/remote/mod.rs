//! Remote speech model backend.
//!
//! Forwards each generation request to an HTTP inference service that hosts
//! the pretrained model, for example:
//!
//! ```yaml
//! model:
//!   backend: remote
//!   url: "http://127.0.0.1:9000"
//!   device: cpu
//! ```

mod provider;

pub(crate) use provider::parse_base_url;
pub use provider::RemoteSpeechModel;
