use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use tracing::warn;

use crate::server::AppState;

/// Password check against the `Authorization` header or a `password` query
/// parameter. The query form exists because `<audio>` elements cannot set
/// headers. An empty configured password disables the check.
pub async fn check_auth(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let password = &state.config.server.password;
    if password.is_empty() {
        return Ok(next.run(req).await);
    }

    let header_ok = req
        .headers()
        .get("authorization")
        .and_then(|h| h.to_str().ok())
        .map(|h| h == password)
        .unwrap_or(false);

    let query_ok = req
        .uri()
        .query()
        .map(|query| {
            query.split('&').any(|pair| {
                pair.strip_prefix("password=")
                    .map(|value| value == password)
                    .unwrap_or(false)
            })
        })
        .unwrap_or(false);

    if header_ok || query_ok {
        Ok(next.run(req).await)
    } else {
        warn!("REST Authorization failed: invalid or missing password");
        Err(StatusCode::UNAUTHORIZED)
    }
}
