pub mod android;
pub mod common;
pub mod ios;
pub mod web_remix;

use std::sync::Arc;

use serde_json::Value;

use crate::configs::YouTubeConfig;

/// An outbound impersonation persona for the player-info endpoint.
///
/// A profile is a pure data-to-request mapping: it builds the JSON payload
/// and header set a specific official client would send, and nothing else.
/// It holds no mutable state and performs no I/O; the resolver owns the
/// actual call.
pub trait ClientProfile: Send + Sync {
    fn name(&self) -> &str;
    fn client_name(&self) -> &str;
    fn client_id(&self) -> &str;
    fn client_version(&self) -> &str;
    fn api_key(&self) -> &str;
    fn user_agent(&self) -> &str;
    fn origin(&self) -> &str;
    fn referer(&self) -> &str;

    /// Build the player request body for a media identifier.
    fn player_body(&self, media_id: &str) -> Value;

    /// Header set sent alongside the player body.
    fn headers(&self) -> Vec<(&'static str, String)> {
        vec![
            ("User-Agent", self.user_agent().to_string()),
            ("Accept", "*/*".to_string()),
            ("Accept-Language", "en-US,en;q=0.9".to_string()),
            ("Origin", self.origin().to_string()),
            ("Referer", self.referer().to_string()),
            ("X-YouTube-Client-Name", self.client_id().to_string()),
            ("X-YouTube-Client-Version", self.client_version().to_string()),
            ("X-Goog-Visitor-Id", common::DEFAULT_VISITOR_ID.to_string()),
        ]
    }
}

/// The fixed persona table, in chain order. Three structurally different
/// client types, so a block against one shape still leaves the others.
pub fn default_profiles(config: &YouTubeConfig) -> Vec<Arc<dyn ClientProfile>> {
    vec![
        Arc::new(web_remix::WebRemixProfile::new(
            config.api_keys.web_remix.clone(),
        )),
        Arc::new(android::AndroidProfile::new(config.api_keys.android.clone())),
        Arc::new(ios::IosProfile::new(config.api_keys.ios.clone())),
    ]
}
