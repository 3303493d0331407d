use std::sync::Arc;

use axum::{Router, http::header, middleware, routing::get};
use tower_http::cors::{Any, CorsLayer};

use crate::{
    server::AppState,
    transport::{
        middleware::check_auth,
        routes::{stats, stream},
    },
};

pub fn router(state: Arc<AppState>) -> Router {
    // The relay is a proxy: its only gate is the password the routing layer
    // already forwarded, so CORS stays wide open and Range headers flow.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
        .expose_headers([
            header::CONTENT_LENGTH,
            header::CONTENT_RANGE,
            header::ACCEPT_RANGES,
        ]);

    Router::new()
        .route("/stream/{media_id}", get(stream::stream))
        .route("/proxies", get(stats::get_proxies))
        .route("/version", get(stats::get_version))
        .layer(middleware::from_fn_with_state(state.clone(), check_auth))
        .layer(cors)
        .with_state(state)
}
