use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::Serialize;

/// Failure count above which a proxy stops being handed out.
const MAX_FAILURES: u32 = 5;

/// A proxy with no success inside this window is considered stale.
const STALE_AFTER: Duration = Duration::from_secs(300);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProxyProtocol {
    Http,
    Https,
    Socks5,
}

impl ProxyProtocol {
    fn from_url(url: &str) -> Self {
        if url.starts_with("socks5://") {
            Self::Socks5
        } else if url.starts_with("https://") {
            Self::Https
        } else {
            Self::Http
        }
    }
}

/// Identity of an egress path handed out by the pool. Callers keep this
/// around for the duration of one attempt and pass it back through
/// `report_success` / `report_failure`; the mutable health state never
/// leaves the pool.
#[derive(Debug, Clone)]
pub struct ProxyEndpoint {
    pub url: String,
    pub protocol: ProxyProtocol,
}

#[derive(Debug)]
struct ProxyState {
    endpoint: ProxyEndpoint,
    failures: u32,
    last_used: Option<Instant>,
    last_success: Option<Instant>,
    /// Exponential moving average, seeded by the first observed sample.
    avg_latency: f64,
}

impl ProxyState {
    fn new(url: &str) -> Self {
        Self {
            endpoint: ProxyEndpoint {
                url: url.to_string(),
                protocol: ProxyProtocol::from_url(url),
            },
            failures: 0,
            last_used: None,
            last_success: None,
            avg_latency: 0.0,
        }
    }

    /// Health is recomputed on every call; there is no persisted disabled
    /// flag. A proxy with no history is healthy by default so it gets an
    /// opportunistic trial.
    fn healthy(&self) -> bool {
        if self.failures > MAX_FAILURES {
            return false;
        }
        match self.last_success {
            Some(at) => at.elapsed() <= STALE_AFTER,
            None => true,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ProxySnapshot {
    pub url: String,
    pub protocol: ProxyProtocol,
    pub failures: u32,
    pub avg_latency: f64,
    pub healthy: bool,
}

#[derive(Debug, Serialize)]
pub struct PoolStats {
    pub total: usize,
    pub healthy: usize,
    pub proxies: Vec<ProxySnapshot>,
}

/// Pool of outbound egress paths shared by every concurrent resolution.
/// The single mutex covers the whole read-sort-pick-stamp sequence; the
/// critical section is O(pool size) and pools number in the tens.
pub struct ProxyPool {
    proxies: Mutex<Vec<ProxyState>>,
}

impl ProxyPool {
    pub fn new(urls: &[String]) -> Self {
        let proxies: Vec<ProxyState> = urls.iter().map(|url| ProxyState::new(url)).collect();
        tracing::info!("Proxy pool: loaded {} egress path(s)", proxies.len());
        Self {
            proxies: Mutex::new(proxies),
        }
    }

    /// Hand out the best healthy proxy, or `None` when every path is
    /// unhealthy or the pool is empty; the caller then goes direct.
    /// Ordering: least recently used, then fewest failures, then lowest
    /// average latency.
    pub fn acquire(&self) -> Option<ProxyEndpoint> {
        let mut proxies = self.proxies.lock();

        let mut healthy: Vec<&mut ProxyState> =
            proxies.iter_mut().filter(|p| p.healthy()).collect();
        if healthy.is_empty() {
            return None;
        }

        healthy.sort_by(|a, b| {
            a.last_used
                .cmp(&b.last_used)
                .then(a.failures.cmp(&b.failures))
                .then(
                    a.avg_latency
                        .partial_cmp(&b.avg_latency)
                        .unwrap_or(std::cmp::Ordering::Equal),
                )
        });

        let best = &mut healthy[0];
        best.last_used = Some(Instant::now());
        Some(best.endpoint.clone())
    }

    /// A proxy that just worked recovers one failure point and refreshes
    /// its latency average (`0.7 * old + 0.3 * new`).
    pub fn report_success(&self, endpoint: &ProxyEndpoint, elapsed_secs: f64) {
        let mut proxies = self.proxies.lock();
        let Some(proxy) = proxies.iter_mut().find(|p| p.endpoint.url == endpoint.url) else {
            return;
        };

        proxy.last_success = Some(Instant::now());
        proxy.failures = proxy.failures.saturating_sub(1);
        if proxy.avg_latency == 0.0 {
            proxy.avg_latency = elapsed_secs;
        } else {
            proxy.avg_latency = 0.7 * proxy.avg_latency + 0.3 * elapsed_secs;
        }

        tracing::debug!(
            "Proxy success: {} ({:.2}s, failures={})",
            proxy.endpoint.url,
            elapsed_secs,
            proxy.failures
        );
    }

    /// Failures accumulate but never evict: an unhealthy proxy stays in the
    /// pool, unselectable until later successes bring its count back down.
    pub fn report_failure(&self, endpoint: &ProxyEndpoint, reason: &str) {
        let mut proxies = self.proxies.lock();
        let Some(proxy) = proxies.iter_mut().find(|p| p.endpoint.url == endpoint.url) else {
            return;
        };

        proxy.failures += 1;
        tracing::warn!(
            "Proxy failure #{}: {} - {}",
            proxy.failures,
            proxy.endpoint.url,
            reason
        );
    }

    pub fn len(&self) -> usize {
        self.proxies.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.proxies.lock().is_empty()
    }

    pub fn stats(&self) -> PoolStats {
        let proxies = self.proxies.lock();
        let snapshots: Vec<ProxySnapshot> = proxies
            .iter()
            .map(|p| ProxySnapshot {
                url: p.endpoint.url.clone(),
                protocol: p.endpoint.protocol,
                failures: p.failures,
                avg_latency: p.avg_latency,
                healthy: p.healthy(),
            })
            .collect();

        PoolStats {
            total: snapshots.len(),
            healthy: snapshots.iter().filter(|s| s.healthy).count(),
            proxies: snapshots,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool(urls: &[&str]) -> ProxyPool {
        let urls: Vec<String> = urls.iter().map(|s| s.to_string()).collect();
        ProxyPool::new(&urls)
    }

    fn set_failures(pool: &ProxyPool, url: &str, failures: u32) {
        let mut proxies = pool.proxies.lock();
        let proxy = proxies
            .iter_mut()
            .find(|p| p.endpoint.url == url)
            .expect("unknown proxy");
        proxy.failures = failures;
    }

    #[test]
    fn protocol_inferred_from_scheme() {
        let pool = pool(&[
            "socks5://10.0.0.1:1080",
            "https://10.0.0.2:443",
            "http://10.0.0.3:8080",
            "10.0.0.4:8080",
        ]);
        let stats = pool.stats();
        assert_eq!(stats.proxies[0].protocol, ProxyProtocol::Socks5);
        assert_eq!(stats.proxies[1].protocol, ProxyProtocol::Https);
        assert_eq!(stats.proxies[2].protocol, ProxyProtocol::Http);
        assert_eq!(stats.proxies[3].protocol, ProxyProtocol::Http);
    }

    #[test]
    fn empty_pool_acquires_none() {
        let pool = pool(&[]);
        assert!(pool.acquire().is_none());
    }

    #[test]
    fn acquire_never_returns_unhealthy_while_healthy_exists() {
        let pool = pool(&["http://bad:1", "http://good:1"]);
        set_failures(&pool, "http://bad:1", 6);

        for _ in 0..10 {
            let picked = pool.acquire().expect("a healthy proxy exists");
            assert_eq!(picked.url, "http://good:1");
        }
    }

    #[test]
    fn acquire_prefers_least_recently_used() {
        let pool = pool(&["http://a:1", "http://b:1"]);

        let first = pool.acquire().unwrap();
        let second = pool.acquire().unwrap();
        assert_ne!(first.url, second.url);

        // Both stamped now; the next pick is the older of the two again.
        let third = pool.acquire().unwrap();
        assert_eq!(third.url, first.url);
    }

    #[test]
    fn acquire_breaks_ties_by_failure_count() {
        let pool = pool(&["http://a:1", "http://b:1"]);
        set_failures(&pool, "http://a:1", 3);

        // Neither has been used; ordering falls through to failures.
        assert_eq!(pool.acquire().unwrap().url, "http://b:1");
    }

    #[test]
    fn failures_decrement_on_success_and_floor_at_zero() {
        let pool = pool(&["http://a:1"]);
        let endpoint = pool.acquire().unwrap();

        pool.report_failure(&endpoint, "timeout");
        pool.report_failure(&endpoint, "timeout");
        assert_eq!(pool.stats().proxies[0].failures, 2);

        pool.report_success(&endpoint, 0.5);
        assert_eq!(pool.stats().proxies[0].failures, 1);

        pool.report_success(&endpoint, 0.5);
        pool.report_success(&endpoint, 0.5);
        assert_eq!(pool.stats().proxies[0].failures, 0);
    }

    #[test]
    fn unhealthy_proxy_recovers_through_successes() {
        let pool = pool(&["http://a:1"]);
        let endpoint = ProxyEndpoint {
            url: "http://a:1".to_string(),
            protocol: ProxyProtocol::Http,
        };
        set_failures(&pool, "http://a:1", 6);
        assert!(pool.acquire().is_none());

        pool.report_success(&endpoint, 0.2);
        assert_eq!(pool.acquire().unwrap().url, "http://a:1");
    }

    #[test]
    fn latency_average_follows_ema_formula() {
        let pool = pool(&["http://a:1"]);
        let endpoint = pool.acquire().unwrap();

        pool.report_success(&endpoint, 2.0);
        assert!((pool.stats().proxies[0].avg_latency - 2.0).abs() < 1e-9);

        pool.report_success(&endpoint, 1.0);
        let expected = 0.7 * 2.0 + 0.3 * 1.0;
        assert!((pool.stats().proxies[0].avg_latency - expected).abs() < 1e-9);
    }

    #[test]
    fn stale_proxy_is_unhealthy() {
        let pool = pool(&["http://a:1"]);
        let Some(past) = Instant::now().checked_sub(STALE_AFTER + Duration::from_secs(1)) else {
            // Host has been up for less than the staleness window.
            return;
        };
        {
            let mut proxies = pool.proxies.lock();
            proxies[0].last_success = Some(past);
        }
        assert!(pool.acquire().is_none());
        assert!(!pool.stats().proxies[0].healthy);
    }
}
