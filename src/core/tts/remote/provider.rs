//! HTTP speech model backend.
//!
//! # Wire format
//!
//! - `POST {url}/generate` multipart: `text`, `exaggeration`, `temperature`,
//!   `cfg_weight`, `device`, optional file part `audio_prompt`
//! - `200` answers carry a WAV body
//! - `GET {url}/health` for readiness probes

use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde_json::json;
use tracing::{debug, warn};
use url::Url;

use crate::core::audio::{AudioFormat, decode_wav};
use crate::core::tts::base::{
    ApiKey, GenerationRequest, ModelConfig, ModelDevice, ModelError, ModelResult, SpeechModel,
    Waveform,
};

/// Error bodies from the model service are cut to this many bytes.
const MAX_ERROR_BODY_BYTES: usize = 512;

/// Speech model reached over HTTP.
pub struct RemoteSpeechModel {
    client: reqwest::Client,
    generate_url: Url,
    health_url: Url,
    api_key: Option<ApiKey>,
    device: ModelDevice,
    sample_rate: u32,
    timeout_seconds: u64,
}

impl RemoteSpeechModel {
    pub fn new(config: &ModelConfig) -> ModelResult<Self> {
        let raw_url = config.url.as_deref().ok_or_else(|| {
            ModelError::InvalidConfiguration("remote backend requires model.url".to_string())
        })?;
        let base = parse_base_url(raw_url)?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| ModelError::InvalidConfiguration(format!("HTTP client: {e}")))?;

        Ok(Self {
            client,
            generate_url: endpoint(&base, "generate")?,
            health_url: endpoint(&base, "health")?,
            api_key: config.api_key.clone(),
            device: config.device,
            sample_rate: config.sample_rate,
            timeout_seconds: config.timeout_seconds,
        })
    }

    pub fn generate_url(&self) -> &Url {
        &self.generate_url
    }

    fn authorize(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => builder.bearer_auth(key.expose()),
            None => builder,
        }
    }

    /// Build the multipart generation request.
    async fn build_generate_request(
        &self,
        request: &GenerationRequest,
    ) -> ModelResult<reqwest::RequestBuilder> {
        let params = &request.params;
        let mut form = Form::new()
            .text("text", request.text.clone())
            .text("exaggeration", params.exaggeration.to_string())
            .text("temperature", params.temperature.to_string())
            .text("cfg_weight", params.cfg_weight.to_string())
            .text("device", self.device.as_str());

        if let Some(path) = &request.audio_prompt_path {
            let data = tokio::fs::read(path).await?;
            let format = AudioFormat::detect(&data);
            let part = Part::bytes(data)
                .file_name(format!("audio_prompt.{}", format.extension()))
                .mime_str(format.mime_type())
                .map_err(|e| ModelError::InvalidConfiguration(e.to_string()))?;
            form = form.part("audio_prompt", part);
        }

        Ok(self
            .authorize(self.client.post(self.generate_url.clone()))
            .multipart(form))
    }

    fn map_send_error(&self, error: reqwest::Error) -> ModelError {
        if error.is_timeout() {
            ModelError::Timeout(self.timeout_seconds)
        } else {
            ModelError::ConnectionFailed(error.to_string())
        }
    }
}

#[async_trait]
impl SpeechModel for RemoteSpeechModel {
    async fn generate(&self, request: &GenerationRequest) -> ModelResult<Waveform> {
        let builder = self.build_generate_request(request).await?;
        let response = builder.send().await.map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = truncate_utf8(body.trim(), MAX_ERROR_BODY_BYTES).to_string();
            warn!("Model service returned {status}: {message}");
            return Err(ModelError::RequestFailed {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.bytes().await.map_err(|e| self.map_send_error(e))?;
        let waveform = decode_wav(&body)?;
        if waveform.is_empty() {
            return Err(ModelError::EmptyOutput);
        }
        if waveform.sample_rate != self.sample_rate {
            debug!(
                "Model answered at {} Hz, configured rate is {} Hz; keeping the WAV header rate",
                waveform.sample_rate, self.sample_rate
            );
        }

        Ok(waveform)
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn device(&self) -> ModelDevice {
        self.device
    }

    async fn health_check(&self) -> ModelResult<()> {
        let response = self
            .authorize(self.client.get(self.health_url.clone()))
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(ModelError::RequestFailed {
                status: status.as_u16(),
                message: "health check failed".to_string(),
            })
        }
    }

    fn get_model_info(&self) -> serde_json::Value {
        json!({
            "backend": "remote",
            "endpoint": self.generate_url.as_str(),
            "device": self.device.as_str(),
            "sample_rate": self.sample_rate,
            "timeout_seconds": self.timeout_seconds,
            "authenticated": self.api_key.is_some(),
        })
    }
}

/// Parse and validate the service base URL.
pub(crate) fn parse_base_url(raw: &str) -> ModelResult<Url> {
    let url = Url::parse(raw.trim())
        .map_err(|e| ModelError::InvalidConfiguration(format!("invalid model.url '{raw}': {e}")))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        scheme => Err(ModelError::InvalidConfiguration(format!(
            "model.url must use http or https, got '{scheme}'"
        ))),
    }
}

/// Append `name` to the base path, keeping any path prefix the base carries.
fn endpoint(base: &Url, name: &str) -> ModelResult<Url> {
    let mut base = base.clone();
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base.join(name)
        .map_err(|e| ModelError::InvalidConfiguration(format!("invalid endpoint {name}: {e}")))
}

fn truncate_utf8(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
