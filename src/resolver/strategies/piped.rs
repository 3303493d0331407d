use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde_json::Value;

use crate::common::http::HttpClient;
use crate::common::types::MediaId;
use crate::proxy::ProxyEndpoint;
use crate::resolver::{ResolveStrategy, StrategyOutcome, StreamInfo};

/// Last-resort public mirror fallback. Public instances come and go, so
/// every configured one gets a try per attempt.
pub struct PipedStrategy {
    instances: Vec<String>,
    timeout: Duration,
}

impl PipedStrategy {
    pub fn new(instances: Vec<String>, timeout: Duration) -> Self {
        Self { instances, timeout }
    }
}

#[async_trait]
impl ResolveStrategy for PipedStrategy {
    fn name(&self) -> &str {
        "piped"
    }

    async fn attempt(&self, media_id: &MediaId, proxy: Option<&ProxyEndpoint>) -> StrategyOutcome {
        let client = match HttpClient::through_proxy(proxy, self.timeout) {
            Ok(client) => client,
            Err(e) => {
                return StrategyOutcome::Retryable(format!("http client build failed: {}", e));
            }
        };

        let mut last_reason = "no instances configured".to_string();
        let mut saw_unusable_payload = false;

        for instance in &self.instances {
            let url = format!("{}/streams/{}", instance, media_id);
            let response = match client.get(&url).send().await {
                Ok(response) => response,
                Err(e) => {
                    last_reason = format!("{}: {}", instance, e);
                    continue;
                }
            };

            let status = response.status();
            if !status.is_success() {
                last_reason = format!("{} returned {}", instance, status);
                continue;
            }

            let body: Value = match response.json().await {
                Ok(body) => body,
                Err(e) => {
                    last_reason = format!("{}: unparseable response: {}", instance, e);
                    continue;
                }
            };

            match stream_from_response(&body) {
                Some(info) => {
                    tracing::debug!("Piped: {} resolved {}", instance, media_id);
                    return StrategyOutcome::Success(info);
                }
                None => {
                    saw_unusable_payload = true;
                    last_reason = format!("{}: no usable audio stream in response", instance);
                }
            }
        }

        if saw_unusable_payload {
            StrategyOutcome::Rejected(last_reason)
        } else {
            StrategyOutcome::Retryable(last_reason)
        }
    }
}

/// Highest-bitrate entry of `audioStreams`. Responses without a title and
/// duration are stale instance shells, not real resolutions.
fn stream_from_response(body: &Value) -> Option<StreamInfo> {
    let title = body.get("title").and_then(|t| t.as_str())?;
    let duration = body.get("duration").and_then(|d| d.as_u64())?;

    let streams = body.get("audioStreams").and_then(|s| s.as_array())?;
    let best = streams
        .iter()
        .filter(|s| s.get("url").and_then(|u| u.as_str()).is_some())
        .max_by_key(|s| s.get("bitrate").and_then(|b| b.as_i64()).unwrap_or(0))?;

    Some(StreamInfo {
        url: best.get("url").and_then(|u| u.as_str())?.to_string(),
        ext: best
            .get("mimeType")
            .and_then(|m| m.as_str())
            .and_then(|m| m.split('/').nth(1))
            .unwrap_or("webm")
            .to_string(),
        bitrate: best.get("bitrate").and_then(|b| b.as_i64()),
        duration: Some(duration),
        title: Some(title.to_string()),
        strategy: "piped".to_string(),
        resolved_at: Instant::now(),
    })
}
