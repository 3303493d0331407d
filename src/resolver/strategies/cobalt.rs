use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::common::http::HttpClient;
use crate::common::types::MediaId;
use crate::proxy::ProxyEndpoint;
use crate::resolver::{ResolveStrategy, StrategyOutcome, StreamInfo};
use crate::youtube::watch_url;

/// Opaque external resolution service. The API contract is a JSON POST of
/// `{url, isAudioOnly}` answered by `{status, url?, text?}`; everything
/// behind it is the instance's problem.
pub struct CobaltStrategy {
    instances: Vec<String>,
    timeout: Duration,
}

impl CobaltStrategy {
    pub fn new(instances: Vec<String>, timeout: Duration) -> Self {
        Self { instances, timeout }
    }
}

#[async_trait]
impl ResolveStrategy for CobaltStrategy {
    fn name(&self) -> &str {
        "cobalt"
    }

    async fn attempt(&self, media_id: &MediaId, proxy: Option<&ProxyEndpoint>) -> StrategyOutcome {
        let client = match HttpClient::through_proxy(proxy, self.timeout) {
            Ok(client) => client,
            Err(e) => {
                return StrategyOutcome::Retryable(format!("http client build failed: {}", e));
            }
        };

        let payload = json!({
            "url": watch_url(media_id),
            "aFormat": "best",
            "isAudioOnly": true,
            "filenameStyle": "basic"
        });

        let mut last_reason = "no instances configured".to_string();
        let mut saw_explicit_error = false;

        for instance in &self.instances {
            let response = match client
                .post(instance)
                .header("Accept", "application/json")
                .json(&payload)
                .send()
                .await
            {
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

            if let Some(url) = stream_url_from_response(&body) {
                tracing::debug!("Cobalt: {} resolved {}", instance, media_id);
                return StrategyOutcome::Success(StreamInfo {
                    url,
                    ext: "m4a".to_string(),
                    bitrate: None,
                    duration: None,
                    title: None,
                    strategy: "cobalt".to_string(),
                    resolved_at: Instant::now(),
                });
            }

            saw_explicit_error = true;
            last_reason = format!(
                "{}: {}",
                instance,
                body.get("text")
                    .and_then(|t| t.as_str())
                    .unwrap_or("service declined the request")
            );
        }

        // An instance that understood the request and said no will keep
        // saying no; plain unavailability is worth another attempt.
        if saw_explicit_error {
            StrategyOutcome::Rejected(last_reason)
        } else {
            StrategyOutcome::Retryable(last_reason)
        }
    }
}

/// `stream`, `redirect` and `tunnel` responses all carry a playable URL.
fn stream_url_from_response(body: &Value) -> Option<String> {
    let status = body.get("status").and_then(|s| s.as_str())?;
    if !matches!(status, "stream" | "redirect" | "tunnel") {
        return None;
    }
    body.get("url")
        .and_then(|u| u.as_str())
        .map(|u| u.to_string())
}
