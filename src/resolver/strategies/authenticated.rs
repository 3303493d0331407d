use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::common::types::MediaId;
use crate::proxy::ProxyEndpoint;
use crate::resolver::{ResolveStrategy, StrategyOutcome};
use crate::youtube::clients::ClientProfile;

use super::innertube::player_attempt;

/// Head of the chain when a session cookie is configured: the same player
/// call the web profile makes, carrying the account's cookie so the
/// response reflects the session's entitlements.
pub struct AuthenticatedStrategy {
    profile: Arc<dyn ClientProfile>,
    cookie: String,
    timeout: Duration,
}

impl AuthenticatedStrategy {
    pub fn new(profile: Arc<dyn ClientProfile>, cookie: String, timeout: Duration) -> Self {
        Self {
            profile,
            cookie,
            timeout,
        }
    }
}

#[async_trait]
impl ResolveStrategy for AuthenticatedStrategy {
    fn name(&self) -> &str {
        "authenticated"
    }

    async fn attempt(&self, media_id: &MediaId, proxy: Option<&ProxyEndpoint>) -> StrategyOutcome {
        player_attempt(
            self.profile.as_ref(),
            Some(&self.cookie),
            media_id,
            proxy,
            self.timeout,
            "authenticated",
        )
        .await
    }
}
