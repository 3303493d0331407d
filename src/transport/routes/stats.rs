use std::sync::Arc;

use axum::{Json, extract::State, response::IntoResponse};

use crate::server::AppState;

pub async fn get_version() -> impl IntoResponse {
    Json(serde_json::json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "buildTime": env!("BUILD_TIME"),
        "commit": env!("GIT_COMMIT"),
    }))
}

pub async fn get_proxies(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.pool.stats())
}
