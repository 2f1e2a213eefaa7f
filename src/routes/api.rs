use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;
use crate::handlers::{api, generate};
use crate::state::AppState;
use std::sync::Arc;

/// Room for text fields and multipart framing on top of the upload itself.
const FORM_OVERHEAD_BYTES: usize = 64 * 1024;

/// Create the API router
pub fn create_api_router(config: &ServerConfig) -> Router<Arc<AppState>> {
    let body_limit = config.max_upload_bytes.saturating_add(FORM_OVERHEAD_BYTES);

    Router::new()
        .route("/health", get(api::health_check))
        .route("/model", get(api::model_info))
        .route(
            "/generate_audio",
            post(generate::generate_audio).layer(DefaultBodyLimit::max(body_limit)),
        )
        .layer(TraceLayer::new_for_http())
}
