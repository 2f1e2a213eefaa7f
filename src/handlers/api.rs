use axum::{Json, extract::State, response::IntoResponse};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::errors::{AppError, AppResult};
use crate::state::AppState;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub model_loaded: bool,
}

/// Liveness probe. Always `200`; `model_loaded` tells whether generation can succeed.
pub async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "OK".to_string(),
        model_loaded: state.is_model_loaded(),
    })
}

/// Describe the configured model backend, or `503` when there is none.
pub async fn model_info(State(state): State<Arc<AppState>>) -> AppResult<Json<serde_json::Value>> {
    let model = state
        .model
        .as_ref()
        .ok_or_else(|| AppError::ServiceUnavailable("TTS model not loaded".to_string()))?;

    let mut info = model.get_model_info();
    if let Some(object) = info.as_object_mut() {
        object.insert(
            "max_text_length".to_string(),
            state.config.max_text_length.into(),
        );
        object.insert(
            "output_naming".to_string(),
            state.config.output_naming.as_str().into(),
        );
    }
    Ok(Json(info))
}
