use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ResolverConfig {
    /// Attempts per strategy before the chain advances.
    #[serde(default = "default_attempts_per_strategy")]
    pub attempts_per_strategy: u32,
    /// Per-attempt upstream call timeout, in seconds. Resolution calls fail
    /// fast so the next proxy/strategy gets a turn.
    #[serde(default = "default_strategy_timeout_secs")]
    pub strategy_timeout_secs: u64,
    /// Resolved-URL cache TTL, in seconds. Must stay below the shortest
    /// upstream URL lifetime observed in practice.
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
    /// Idle timeout for the byte relay, in seconds.
    #[serde(default = "default_relay_timeout_secs")]
    pub relay_timeout_secs: u64,
    /// Total upstream fetch attempts per relay call (the 403 re-resolve
    /// budget).
    #[serde(default = "default_relay_max_attempts")]
    pub relay_max_attempts: u32,
}

fn default_attempts_per_strategy() -> u32 {
    3
}

fn default_strategy_timeout_secs() -> u64 {
    10
}

fn default_cache_ttl_secs() -> u64 {
    300
}

fn default_relay_timeout_secs() -> u64 {
    60
}

fn default_relay_max_attempts() -> u32 {
    3
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            attempts_per_strategy: default_attempts_per_strategy(),
            strategy_timeout_secs: default_strategy_timeout_secs(),
            cache_ttl_secs: default_cache_ttl_secs(),
            relay_timeout_secs: default_relay_timeout_secs(),
            relay_max_attempts: default_relay_max_attempts(),
        }
    }
}
