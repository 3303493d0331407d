use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct YouTubeConfig {
    /// Session cookie string for the authenticated extraction strategy.
    /// When unset, the chain starts at client impersonation.
    pub cookie: Option<String>,
    #[serde(default)]
    pub api_keys: ApiKeysConfig,
}

/// Per-profile InnerTube API key overrides. Unset keys fall back to the
/// well-known defaults each official client ships with.
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct ApiKeysConfig {
    pub web_remix: Option<String>,
    pub android: Option<String>,
    pub ios: Option<String>,
}
