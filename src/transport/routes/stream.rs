use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Path, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};

use crate::{
    common::errors::ApiError,
    common::types::MediaId,
    relay::RelayError,
    resolver::ResolveError,
    server::AppState,
};

/// `GET /stream/{media_id}`: resolve and proxy the audio bytes, honoring
/// the caller's Range header for seeking.
pub async fn stream(
    Path(media_id): Path<String>,
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Response {
    let path = format!("/stream/{}", media_id);
    let media_id = MediaId::from(media_id);
    let range = headers.get(header::RANGE).and_then(|v| v.to_str().ok());

    tracing::info!("GET {} (range={:?})", path, range);

    match state.relay.relay(&media_id, range).await {
        Ok(upstream) => {
            let mut resp_headers = HeaderMap::new();

            let content_type = upstream.content_type.as_deref().unwrap_or("audio/webm");
            if let Ok(v) = HeaderValue::from_str(content_type) {
                resp_headers.insert(header::CONTENT_TYPE, v);
            }
            if let Some(len) = &upstream.content_length {
                if let Ok(v) = HeaderValue::from_str(len) {
                    resp_headers.insert(header::CONTENT_LENGTH, v);
                }
            }
            if let Some(content_range) = &upstream.content_range {
                if let Ok(v) = HeaderValue::from_str(content_range) {
                    resp_headers.insert(header::CONTENT_RANGE, v);
                }
            }
            resp_headers.insert(header::ACCEPT_RANGES, HeaderValue::from_static("bytes"));
            // Signed URLs expire; relayed bytes must never be cached.
            resp_headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));

            let status = StatusCode::from_u16(upstream.status).unwrap_or(StatusCode::OK);
            (status, resp_headers, Body::from_stream(upstream.body)).into_response()
        }
        Err(err) => {
            if let RelayError::Resolve(resolve_err) = &err {
                for failure in resolve_err.failures() {
                    tracing::warn!(
                        "GET {}: strategy '{}' failed: {}",
                        path,
                        failure.strategy,
                        failure.reason
                    );
                }
            }
            tracing::warn!("GET {}: {}", path, err);

            // Strategy internals stay in the logs; callers only see the
            // status category.
            let api_error = match err {
                RelayError::Resolve(ResolveError::Protected { .. }) => {
                    ApiError::unavailable_for_legal_reasons(
                        "content unavailable due to upstream restrictions",
                        path,
                    )
                }
                RelayError::Resolve(_) => {
                    ApiError::service_unavailable("no playable stream could be resolved", path)
                }
                RelayError::AccessDenied { .. } => {
                    ApiError::forbidden("stream access denied by upstream", path)
                }
                RelayError::Upstream(_) => {
                    ApiError::service_unavailable("streaming service unavailable", path)
                }
            };
            api_error.into_response()
        }
    }
}
