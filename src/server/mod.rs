use std::sync::Arc;
use std::time::Duration;

use crate::common::types::AnyResult;
use crate::configs::Config;
use crate::proxy::ProxyPool;
use crate::relay::{ReqwestFetcher, StreamRelay};
use crate::resolver::{StreamResolver, strategies};

/// Process-wide shared state, constructed once at startup and injected by
/// reference everywhere. Pool and cache live here, not in module globals.
pub struct AppState {
    pub config: Config,
    pub pool: Arc<ProxyPool>,
    pub resolver: Arc<StreamResolver>,
    pub relay: StreamRelay<ReqwestFetcher>,
}

impl AppState {
    pub fn from_config(config: Config) -> AnyResult<Self> {
        if config.server.password.is_empty() {
            tracing::warn!("Server password is empty; request authentication is disabled");
        }

        let pool = Arc::new(ProxyPool::new(&config.proxy.urls));

        let resolver = Arc::new(StreamResolver::new(
            strategies::build_chain(&config),
            pool.clone(),
            Duration::from_secs(config.resolver.cache_ttl_secs),
            config.resolver.attempts_per_strategy,
        ));

        let fetcher = ReqwestFetcher::new(Duration::from_secs(config.resolver.relay_timeout_secs))?;
        let relay = StreamRelay::new(
            resolver.clone(),
            fetcher,
            config.resolver.relay_max_attempts,
        );

        Ok(Self {
            config,
            pool,
            resolver,
            relay,
        })
    }
}
