//! `POST /generate_audio`
//!
//! Accepts the web client's `multipart/form-data` post (with an optional
//! `audio_prompt` file), a JSON body, or a urlencoded form, runs the speech
//! model and answers with the public path of the written WAV.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    Form, Json,
    extract::{FromRequest, Multipart, Request, State, multipart::MultipartError},
    http::{StatusCode, header},
};
use bytes::{Bytes, BytesMut};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::core::tts::{GenerationParams, GenerationRequest};
use crate::core::upload::ReferenceAudio;
use crate::errors::{AppError, AppResult};
use crate::state::AppState;

/// Characters of the input text included in log lines.
const LOG_PREVIEW_CHARS: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateAudioResponse {
    pub audio_file_path: String,
}

/// Raw generation inputs, before validation.
///
/// Float fields are kept as text so that absent, empty and malformed values
/// can be told apart.
#[derive(Debug, Default)]
pub struct GenerateForm {
    pub text: Option<String>,
    pub exaggeration: Option<String>,
    pub temperature: Option<String>,
    pub cfg_weight: Option<String>,
    pub audio_prompt: Option<Bytes>,
}

/// JSON request body. Numbers may be sent as JSON numbers or strings.
#[derive(Debug, Deserialize)]
struct GenerateJson {
    text: Option<String>,
    exaggeration: Option<serde_json::Value>,
    temperature: Option<serde_json::Value>,
    cfg_weight: Option<serde_json::Value>,
}

impl GenerateForm {
    /// Parse the three tuning fields, falling back to defaults.
    pub fn params(&self) -> AppResult<GenerationParams> {
        Ok(GenerationParams {
            exaggeration: parse_param(
                "exaggeration",
                self.exaggeration.as_deref(),
                GenerationParams::DEFAULT_EXAGGERATION,
            )?,
            temperature: parse_param(
                "temperature",
                self.temperature.as_deref(),
                GenerationParams::DEFAULT_TEMPERATURE,
            )?,
            cfg_weight: parse_param(
                "cfg_weight",
                self.cfg_weight.as_deref(),
                GenerationParams::DEFAULT_CFG_WEIGHT,
            )?,
        })
    }

    fn set_field(&mut self, name: &str, value: String) {
        match name {
            "text" => self.text = Some(value),
            "exaggeration" => self.exaggeration = Some(value),
            "temperature" => self.temperature = Some(value),
            "cfg_weight" => self.cfg_weight = Some(value),
            _ => {}
        }
    }

    async fn from_multipart(mut multipart: Multipart, max_upload_bytes: usize) -> AppResult<Self> {
        let mut form = Self::default();

        while let Some(mut field) = multipart.next_field().await.map_err(multipart_error)? {
            let name = field.name().unwrap_or("").to_string();
            match name.as_str() {
                "audio_prompt" => {
                    let mut data = BytesMut::new();
                    while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
                        if data.len() + chunk.len() > max_upload_bytes {
                            return Err(AppError::PayloadTooLarge(format!(
                                "Audio prompt is too large. Maximum size is {max_upload_bytes} bytes."
                            )));
                        }
                        data.extend_from_slice(&chunk);
                    }
                    // Browsers send an empty part when no file was chosen
                    if !data.is_empty() {
                        form.audio_prompt = Some(data.freeze());
                    }
                }
                "text" | "exaggeration" | "temperature" | "cfg_weight" => {
                    let value = field.text().await.map_err(multipart_error)?;
                    form.set_field(&name, value);
                }
                _ => {}
            }
        }

        Ok(form)
    }

    fn from_json(body: GenerateJson) -> AppResult<Self> {
        Ok(Self {
            text: body.text,
            exaggeration: json_number("exaggeration", body.exaggeration)?,
            temperature: json_number("temperature", body.temperature)?,
            cfg_weight: json_number("cfg_weight", body.cfg_weight)?,
            audio_prompt: None,
        })
    }

    fn from_fields(fields: HashMap<String, String>) -> Self {
        let mut form = Self::default();
        for (name, value) in fields {
            form.set_field(&name, value);
        }
        form
    }
}

impl FromRequest<Arc<AppState>> for GenerateForm {
    type Rejection = AppError;

    async fn from_request(req: Request, state: &Arc<AppState>) -> Result<Self, Self::Rejection> {
        let content_type = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_ascii_lowercase());

        let Some(content_type) = content_type else {
            // No body at all reads as an empty form
            return Ok(Self::default());
        };

        if content_type.starts_with("multipart/form-data") {
            let multipart = Multipart::from_request(req, state)
                .await
                .map_err(|e| AppError::BadRequest(e.body_text()))?;
            Self::from_multipart(multipart, state.config.max_upload_bytes).await
        } else if content_type.starts_with("application/json") {
            let Json(body) = Json::<GenerateJson>::from_request(req, state)
                .await
                .map_err(|e| AppError::BadRequest(e.body_text()))?;
            Self::from_json(body)
        } else if content_type.starts_with("application/x-www-form-urlencoded") {
            let Form(fields) = Form::<HashMap<String, String>>::from_request(req, state)
                .await
                .map_err(|e| AppError::BadRequest(e.body_text()))?;
            Ok(Self::from_fields(fields))
        } else {
            Err(AppError::UnsupportedMediaType(format!(
                "Unsupported content type '{content_type}'. Use multipart/form-data or application/json."
            )))
        }
    }
}

fn multipart_error(error: MultipartError) -> AppError {
    if error.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(error.body_text())
    } else {
        AppError::BadRequest(format!("Invalid multipart body: {}", error.body_text()))
    }
}

fn json_number(name: &str, value: Option<serde_json::Value>) -> AppResult<Option<String>> {
    match value {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::Number(n)) => Ok(Some(n.to_string())),
        Some(serde_json::Value::String(s)) => Ok(Some(s)),
        Some(other) => Err(AppError::BadRequest(format!(
            "Invalid value for {name}: {other}"
        ))),
    }
}

/// Check the text is present and within `max_chars` characters.
pub fn validate_text(text: Option<&str>, max_chars: usize) -> AppResult<&str> {
    let text = match text {
        Some(t) if !t.trim().is_empty() => t,
        _ => return Err(AppError::BadRequest("No text provided".to_string())),
    };

    if text.chars().count() > max_chars {
        return Err(AppError::BadRequest(format!(
            "Text is too long. Maximum length is {max_chars} characters."
        )));
    }

    Ok(text)
}

/// Parse an optional float field; absent or blank values use `default`.
pub fn parse_param(name: &str, raw: Option<&str>, default: f32) -> AppResult<f32> {
    let raw = match raw.map(str::trim) {
        None | Some("") => return Ok(default),
        Some(raw) => raw,
    };

    let value: f32 = raw
        .parse()
        .map_err(|_| AppError::BadRequest(format!("Invalid value for {name}: '{raw}'")))?;

    if !value.is_finite() {
        return Err(AppError::BadRequest(format!(
            "Invalid value for {name}: must be a finite number"
        )));
    }
    Ok(value)
}

fn preview(text: &str) -> String {
    let mut preview: String = text.chars().take(LOG_PREVIEW_CHARS).collect();
    if text.chars().nth(LOG_PREVIEW_CHARS).is_some() {
        preview.push_str("...");
    }
    preview
}

/// Generate speech for the posted text and save it as WAV.
///
/// The voice reference, when given, lives in a temp file that is removed as
/// soon as this handler returns, on every path.
pub async fn generate_audio(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> AppResult<Json<GenerateAudioResponse>> {
    let model = state.model.clone().ok_or(AppError::ModelNotLoaded)?;

    let form = GenerateForm::from_request(request, &state).await?;
    let text = validate_text(form.text.as_deref(), state.config.max_text_length)?;
    let params = form.params()?;

    info!("Generating audio for text: {}", preview(text));
    debug!(
        "exaggeration={} temperature={} cfg_weight={} audio_prompt={}",
        params.exaggeration,
        params.temperature,
        params.cfg_weight,
        form.audio_prompt.is_some()
    );

    let reference = match form.audio_prompt.clone() {
        Some(data) => Some(
            ReferenceAudio::persist(data, state.config.upload_dir.clone())
                .await
                .map_err(|e| {
                    AppError::Internal(format!("Failed to generate audio: could not store audio prompt: {e}"))
                })?,
        ),
        None => None,
    };

    let generation = GenerationRequest {
        text: text.to_string(),
        audio_prompt_path: reference.as_ref().map(|r| r.path().to_path_buf()),
        params,
    };

    let waveform = {
        let _permit = state
            .acquire_generation_permit()
            .await
            .map_err(|e| AppError::Internal(e.to_string()))?;
        model.generate(&generation).await?
    };
    drop(reference);

    let saved = state.output.save(&waveform).await?;

    info!(
        "Generated {:.2}s of audio at {}",
        waveform.duration_secs(),
        saved.public_path()
    );

    Ok(Json(GenerateAudioResponse {
        audio_file_path: saved.public_path(),
    }))
}
