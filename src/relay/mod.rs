pub mod fetcher;

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use futures::FutureExt;
use futures::stream::BoxStream;
use thiserror::Error;

use crate::common::types::{AnyResult, MediaId};
use crate::resolver::retry::retry_bounded;
use crate::resolver::{ResolveError, StreamResolver};

pub use self::fetcher::ReqwestFetcher;

/// Upstream response head plus its body as a stream. The status is
/// inspected before a single body byte moves, so a failed fetch never
/// leaks a partial stream to the caller.
pub struct UpstreamResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub content_length: Option<String>,
    pub content_range: Option<String>,
    pub body: BoxStream<'static, AnyResult<Bytes>>,
}

impl std::fmt::Debug for UpstreamResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpstreamResponse")
            .field("status", &self.status)
            .field("content_type", &self.content_type)
            .field("content_length", &self.content_length)
            .field("content_range", &self.content_range)
            .field("body", &"<stream>")
            .finish()
    }
}

/// The relay's view of the upstream fetch, abstracted so tests can script
/// response sequences.
#[async_trait]
pub trait UpstreamFetcher: Send + Sync {
    async fn fetch(&self, url: &str, range: Option<&str>) -> AnyResult<UpstreamResponse>;
}

#[derive(Debug, Error)]
pub enum RelayError {
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    /// Every fetch attempt came back 403; the signed URLs keep expiring or
    /// the upstream refuses this egress entirely.
    #[error("upstream denied access for '{media_id}' after {attempts} attempt(s)")]
    AccessDenied { media_id: String, attempts: u32 },
    #[error("upstream fetch failed: {0}")]
    Upstream(String),
}

/// Serves playback bytes for a media identifier: resolve, fetch with the
/// caller's Range forwarded verbatim, and self-heal from URL expiry by
/// invalidating the cache and re-resolving on 403, bounded.
pub struct StreamRelay<F: UpstreamFetcher> {
    resolver: Arc<StreamResolver>,
    fetcher: F,
    max_attempts: u32,
}

impl<F: UpstreamFetcher> StreamRelay<F> {
    pub fn new(resolver: Arc<StreamResolver>, fetcher: F, max_attempts: u32) -> Self {
        Self {
            resolver,
            fetcher,
            max_attempts: max_attempts.max(1),
        }
    }

    pub async fn relay(
        &self,
        media_id: &MediaId,
        range: Option<&str>,
    ) -> Result<UpstreamResponse, RelayError> {
        retry_bounded(
            self.max_attempts,
            |attempt| {
                async move {
                    let info = self
                        .resolver
                        .resolve(media_id)
                        .await
                        .map_err(RelayError::Resolve)?;

                    tracing::debug!(
                        "Relay {}: attempt {} fetching via '{}' (range={:?})",
                        media_id,
                        attempt,
                        info.strategy,
                        range
                    );

                    match self.fetcher.fetch(&info.url, range).await {
                        Ok(response) if response.status == 403 => {
                            tracing::warn!(
                                "Relay {}: upstream 403, invalidating cached resolution",
                                media_id
                            );
                            self.resolver.invalidate(media_id);
                            Err(RelayError::AccessDenied {
                                media_id: media_id.to_string(),
                                attempts: attempt,
                            })
                        }
                        Ok(response) => Ok(response),
                        Err(e) => Err(RelayError::Upstream(e.to_string())),
                    }
                }
                .boxed()
            },
            |outcome| matches!(outcome, Err(RelayError::AccessDenied { .. })),
        )
        .await
    }
}
