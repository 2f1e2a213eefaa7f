pub mod api;
pub mod rate_limit;
pub mod static_files;

use axum::Router;
use std::sync::Arc;

use crate::state::AppState;

/// Build the full application router: API routes first, static and
/// generated files as the fallback.
pub fn create_router(state: Arc<AppState>) -> Router {
    api::create_api_router(&state.config)
        .fallback_service(static_files::static_file_service(&state.config))
        .with_state(state)
}
