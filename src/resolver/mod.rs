pub mod cache;
pub mod retry;
pub mod strategies;

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures::FutureExt;
use thiserror::Error;

use crate::common::types::MediaId;
use crate::proxy::{ProxyEndpoint, ProxyPool};
use self::cache::ResolutionCache;
use self::retry::retry_bounded;

/// A resolved, time-limited direct stream URL plus format metadata.
/// Immutable once produced; the cache owns the copy of record.
#[derive(Debug, Clone)]
pub struct StreamInfo {
    pub url: String,
    pub ext: String,
    pub bitrate: Option<i64>,
    pub duration: Option<u64>,
    pub title: Option<String>,
    /// Name of the strategy that produced this resolution.
    pub strategy: String,
    pub resolved_at: Instant,
}

/// Classified outcome of a single strategy attempt. Every network or parse
/// error is converted into one of these at the strategy boundary; nothing
/// propagates raw.
#[derive(Debug)]
pub enum StrategyOutcome {
    Success(StreamInfo),
    /// Transport error or non-200, worth another attempt on a different
    /// egress path.
    Retryable(String),
    /// The strategy answered but cannot serve this media. The chain
    /// advances without burning further attempts.
    Rejected(String),
    /// Upstream content-protection rejection. Terminal for the whole chain's
    /// error classification, though later strategies still get their turn.
    Protected(String),
}

/// One method of turning a media identifier into a direct playable URL.
#[async_trait]
pub trait ResolveStrategy: Send + Sync {
    fn name(&self) -> &str;

    /// Issue one upstream call, optionally through the given egress path.
    async fn attempt(&self, media_id: &MediaId, proxy: Option<&ProxyEndpoint>) -> StrategyOutcome;
}

/// Why one strategy gave up, kept for the exhaustion report.
#[derive(Debug, Clone)]
pub struct StrategyFailure {
    pub strategy: String,
    pub reason: String,
    pub protected: bool,
}

#[derive(Debug, Error)]
pub enum ResolveError {
    /// Every strategy failed. Carries one entry per strategy, in chain
    /// order.
    #[error("every resolution strategy failed for '{media_id}'")]
    Exhausted {
        media_id: String,
        failures: Vec<StrategyFailure>,
    },
    /// At least one strategy hit an upstream content-protection wall, which
    /// no other strategy can get past.
    #[error("upstream refuses to serve '{media_id}': {reason}")]
    Protected {
        media_id: String,
        reason: String,
        failures: Vec<StrategyFailure>,
    },
}

impl ResolveError {
    pub fn failures(&self) -> &[StrategyFailure] {
        match self {
            Self::Exhausted { failures, .. } | Self::Protected { failures, .. } => failures,
        }
    }
}

/// Orchestrates the ordered strategy chain: cache short-circuit, then each
/// strategy in priority order with a bounded attempt budget and per-attempt
/// proxy rotation.
pub struct StreamResolver {
    strategies: Vec<Box<dyn ResolveStrategy>>,
    pool: Arc<ProxyPool>,
    cache: ResolutionCache,
    attempts_per_strategy: u32,
}

impl StreamResolver {
    pub fn new(
        strategies: Vec<Box<dyn ResolveStrategy>>,
        pool: Arc<ProxyPool>,
        cache_ttl: Duration,
        attempts_per_strategy: u32,
    ) -> Self {
        Self {
            strategies,
            pool,
            cache: ResolutionCache::new(cache_ttl),
            attempts_per_strategy: attempts_per_strategy.max(1),
        }
    }

    /// Produce a fresh `StreamInfo`, or a typed failure once every avenue is
    /// exhausted. Repeated calls within the cache TTL cost no upstream I/O.
    pub async fn resolve(&self, media_id: &MediaId) -> Result<StreamInfo, ResolveError> {
        if let Some(hit) = self.cache.get(media_id) {
            tracing::debug!("Resolve {}: cache hit via '{}'", media_id, hit.strategy);
            return Ok(hit);
        }

        let mut failures: Vec<StrategyFailure> = Vec::new();

        for strategy in &self.strategies {
            let outcome = retry_bounded(
                self.attempts_per_strategy,
                |attempt| {
                    async move {
                        let proxy = self.pool.acquire();
                        tracing::debug!(
                            "Resolve {}: strategy '{}' attempt {} ({})",
                            media_id,
                            strategy.name(),
                            attempt,
                            proxy
                                .as_ref()
                                .map(|p| p.url.as_str())
                                .unwrap_or("direct")
                        );

                        let started = Instant::now();
                        let outcome = strategy.attempt(media_id, proxy.as_ref()).await;

                        if let Some(endpoint) = &proxy {
                            match &outcome {
                                StrategyOutcome::Success(_) => self
                                    .pool
                                    .report_success(endpoint, started.elapsed().as_secs_f64()),
                                StrategyOutcome::Retryable(reason) => {
                                    self.pool.report_failure(endpoint, reason)
                                }
                                _ => {}
                            }
                        }

                        outcome
                    }
                    .boxed()
                },
                |outcome| matches!(outcome, StrategyOutcome::Retryable(_)),
            )
            .await;

            match outcome {
                StrategyOutcome::Success(info) => {
                    tracing::info!(
                        "Resolve {}: success via '{}' (ext={}, bitrate={:?})",
                        media_id,
                        info.strategy,
                        info.ext,
                        info.bitrate
                    );
                    self.cache.put(media_id, info.clone());
                    return Ok(info);
                }
                StrategyOutcome::Retryable(reason) => {
                    tracing::warn!(
                        "Resolve {}: strategy '{}' exhausted its attempts: {}",
                        media_id,
                        strategy.name(),
                        reason
                    );
                    failures.push(StrategyFailure {
                        strategy: strategy.name().to_string(),
                        reason,
                        protected: false,
                    });
                }
                StrategyOutcome::Rejected(reason) => {
                    tracing::warn!(
                        "Resolve {}: strategy '{}' rejected: {}",
                        media_id,
                        strategy.name(),
                        reason
                    );
                    failures.push(StrategyFailure {
                        strategy: strategy.name().to_string(),
                        reason,
                        protected: false,
                    });
                }
                StrategyOutcome::Protected(reason) => {
                    tracing::warn!(
                        "Resolve {}: strategy '{}' hit content protection: {}",
                        media_id,
                        strategy.name(),
                        reason
                    );
                    failures.push(StrategyFailure {
                        strategy: strategy.name().to_string(),
                        reason,
                        protected: true,
                    });
                }
            }
        }

        let protected_reason = failures
            .iter()
            .find(|f| f.protected)
            .map(|f| f.reason.clone());
        if let Some(reason) = protected_reason {
            return Err(ResolveError::Protected {
                media_id: media_id.to_string(),
                reason,
                failures,
            });
        }
        Err(ResolveError::Exhausted {
            media_id: media_id.to_string(),
            failures,
        })
    }

    /// Drop the cached resolution so the next `resolve` runs the chain
    /// again. The relay calls this on an upstream 403.
    pub fn invalidate(&self, media_id: &MediaId) {
        self.cache.invalidate(media_id);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    fn info(strategy: &str) -> StreamInfo {
        StreamInfo {
            url: format!("https://cdn/{}", strategy),
            ext: "webm".to_string(),
            bitrate: Some(160000),
            duration: Some(212),
            title: None,
            strategy: strategy.to_string(),
            resolved_at: Instant::now(),
        }
    }

    enum Script {
        Succeed,
        FailRetryable,
        Reject,
        Protect,
    }

    struct ScriptedStrategy {
        label: String,
        script: Script,
        calls: Arc<AtomicU32>,
    }

    impl ScriptedStrategy {
        fn new(label: &str, script: Script) -> (Box<dyn ResolveStrategy>, Arc<AtomicU32>) {
            let calls = Arc::new(AtomicU32::new(0));
            let strategy = Box::new(Self {
                label: label.to_string(),
                script,
                calls: calls.clone(),
            });
            (strategy, calls)
        }
    }

    #[async_trait]
    impl ResolveStrategy for ScriptedStrategy {
        fn name(&self) -> &str {
            &self.label
        }

        async fn attempt(
            &self,
            _media_id: &MediaId,
            _proxy: Option<&ProxyEndpoint>,
        ) -> StrategyOutcome {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.script {
                Script::Succeed => StrategyOutcome::Success(info(&self.label)),
                Script::FailRetryable => StrategyOutcome::Retryable("status 500".to_string()),
                Script::Reject => StrategyOutcome::Rejected("no usable audio".to_string()),
                Script::Protect => {
                    StrategyOutcome::Protected("sign in to confirm".to_string())
                }
            }
        }
    }

    fn resolver(strategies: Vec<Box<dyn ResolveStrategy>>) -> StreamResolver {
        StreamResolver::new(
            strategies,
            Arc::new(ProxyPool::new(&[])),
            Duration::from_secs(300),
            3,
        )
    }

    #[tokio::test]
    async fn second_resolve_within_ttl_hits_the_cache() {
        let (s, calls) = ScriptedStrategy::new("primary", Script::Succeed);
        let resolver = resolver(vec![s]);
        let id = MediaId::from("abc");

        let first = resolver.resolve(&id).await.unwrap();
        let second = resolver.resolve(&id).await.unwrap();

        assert_eq!(first.url, second.url);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failing_strategy_exhausts_its_budget_before_advancing() {
        let (s1, calls1) = ScriptedStrategy::new("flaky", Script::FailRetryable);
        let (s2, calls2) = ScriptedStrategy::new("backup", Script::Succeed);
        let resolver = resolver(vec![s1, s2]);

        let resolved = resolver.resolve(&MediaId::from("abc")).await.unwrap();

        assert_eq!(resolved.strategy, "backup");
        assert_eq!(calls1.load(Ordering::SeqCst), 3);
        assert_eq!(calls2.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn rejection_advances_without_further_attempts() {
        let (s1, calls1) = ScriptedStrategy::new("rejecting", Script::Reject);
        let (s2, _) = ScriptedStrategy::new("backup", Script::Succeed);
        let resolver = resolver(vec![s1, s2]);

        let resolved = resolver.resolve(&MediaId::from("abc")).await.unwrap();

        assert_eq!(resolved.strategy, "backup");
        assert_eq!(calls1.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn exhaustion_reports_every_strategy_in_chain_order() {
        let (s1, _) = ScriptedStrategy::new("first", Script::FailRetryable);
        let (s2, _) = ScriptedStrategy::new("second", Script::Reject);
        let resolver = resolver(vec![s1, s2]);

        let err = resolver.resolve(&MediaId::from("abc")).await.unwrap_err();

        let failures = err.failures();
        assert_eq!(failures.len(), 2);
        assert_eq!(failures[0].strategy, "first");
        assert_eq!(failures[1].strategy, "second");
        assert!(matches!(err, ResolveError::Exhausted { .. }));
    }

    #[tokio::test]
    async fn protection_dominates_the_aggregate_failure() {
        let (s1, _) = ScriptedStrategy::new("walled", Script::Protect);
        let (s2, _) = ScriptedStrategy::new("flaky", Script::FailRetryable);
        let resolver = resolver(vec![s1, s2]);

        let err = resolver.resolve(&MediaId::from("abc")).await.unwrap_err();

        match err {
            ResolveError::Protected { reason, failures, .. } => {
                assert!(reason.contains("sign in"));
                assert_eq!(failures.len(), 2);
            }
            other => panic!("expected Protected, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn retryable_attempts_feed_proxy_failure_reports() {
        let (s, _) = ScriptedStrategy::new("flaky", Script::FailRetryable);
        let pool = Arc::new(ProxyPool::new(&["http://egress:8080".to_string()]));
        let resolver = StreamResolver::new(vec![s], pool.clone(), Duration::from_secs(300), 3);

        let _ = resolver.resolve(&MediaId::from("abc")).await;

        assert_eq!(pool.stats().proxies[0].failures, 3);
    }

    #[tokio::test]
    async fn success_feeds_proxy_success_report() {
        let (s, _) = ScriptedStrategy::new("primary", Script::Succeed);
        let pool = Arc::new(ProxyPool::new(&["http://egress:8080".to_string()]));
        let resolver = StreamResolver::new(vec![s], pool.clone(), Duration::from_secs(300), 3);

        resolver.resolve(&MediaId::from("abc")).await.unwrap();

        let stats = pool.stats();
        assert_eq!(stats.proxies[0].failures, 0);
        assert!(stats.proxies[0].healthy);
    }

    #[tokio::test]
    async fn invalidate_forces_the_chain_to_run_again() {
        let (s, calls) = ScriptedStrategy::new("primary", Script::Succeed);
        let resolver = resolver(vec![s]);
        let id = MediaId::from("abc");

        resolver.resolve(&id).await.unwrap();
        resolver.invalidate(&id);
        resolver.resolve(&id).await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
