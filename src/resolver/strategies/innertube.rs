use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde_json::Value;

use crate::common::http::HttpClient;
use crate::common::types::MediaId;
use crate::proxy::ProxyEndpoint;
use crate::resolver::{ResolveStrategy, StrategyOutcome, StreamInfo};
use crate::youtube::clients::ClientProfile;
use crate::youtube::clients::common::player_endpoint;
use crate::youtube::extractor::{ExtractError, extract_stream};

/// Client-impersonation strategy: one chain entry per persona, each sending
/// the player request the way that official client would.
pub struct InnertubeStrategy {
    profile: Arc<dyn ClientProfile>,
    label: String,
    timeout: Duration,
}

impl InnertubeStrategy {
    pub fn new(profile: Arc<dyn ClientProfile>, timeout: Duration) -> Self {
        let label = format!("innertube:{}", profile.name());
        Self {
            profile,
            label,
            timeout,
        }
    }
}

#[async_trait]
impl ResolveStrategy for InnertubeStrategy {
    fn name(&self) -> &str {
        &self.label
    }

    async fn attempt(&self, media_id: &MediaId, proxy: Option<&ProxyEndpoint>) -> StrategyOutcome {
        player_attempt(
            self.profile.as_ref(),
            None,
            media_id,
            proxy,
            self.timeout,
            &self.label,
        )
        .await
    }
}

/// One player call through a profile, classified per the resolver's outcome
/// taxonomy. The authenticated strategy reuses this with a cookie attached.
pub(crate) async fn player_attempt(
    profile: &dyn ClientProfile,
    cookie: Option<&str>,
    media_id: &MediaId,
    proxy: Option<&ProxyEndpoint>,
    timeout: Duration,
    strategy_name: &str,
) -> StrategyOutcome {
    let client = match HttpClient::through_proxy(proxy, timeout) {
        Ok(client) => client,
        Err(e) => return StrategyOutcome::Retryable(format!("http client build failed: {}", e)),
    };

    let mut request = client
        .post(player_endpoint(profile.api_key()))
        .json(&profile.player_body(media_id));
    for (name, value) in profile.headers() {
        request = request.header(name, value);
    }
    if let Some(cookie) = cookie {
        request = request.header("Cookie", cookie);
    }

    let response = match request.send().await {
        Ok(response) => response,
        Err(e) if e.is_timeout() => {
            return StrategyOutcome::Retryable(format!("player request timed out: {}", e));
        }
        Err(e) => return StrategyOutcome::Retryable(format!("player request failed: {}", e)),
    };

    let status = response.status();
    if !status.is_success() {
        return StrategyOutcome::Retryable(format!("player endpoint returned {}", status));
    }

    let body: Value = match response.json().await {
        Ok(body) => body,
        // A persona that answers 200 with garbage will keep doing so;
        // advance instead of burning attempts.
        Err(e) => return StrategyOutcome::Rejected(format!("unparseable player response: {}", e)),
    };

    match extract_stream(&body) {
        Ok(extracted) => StrategyOutcome::Success(StreamInfo {
            url: extracted.url,
            ext: extracted.ext,
            bitrate: extracted.bitrate,
            duration: extracted.duration,
            title: extracted.title,
            strategy: strategy_name.to_string(),
            resolved_at: Instant::now(),
        }),
        Err(ExtractError::Protected(reason)) => StrategyOutcome::Protected(reason),
        Err(ExtractError::NotPlayable(reason)) => StrategyOutcome::Rejected(reason),
        Err(ExtractError::NoAudioFormat) => {
            StrategyOutcome::Rejected("no usable audio format".to_string())
        }
    }
}
