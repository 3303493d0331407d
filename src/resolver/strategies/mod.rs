pub mod authenticated;
pub mod cobalt;
pub mod innertube;
pub mod piped;

use std::time::Duration;

use crate::configs::Config;
use crate::resolver::ResolveStrategy;
use crate::youtube::clients;

pub use authenticated::AuthenticatedStrategy;
pub use cobalt::CobaltStrategy;
pub use innertube::InnertubeStrategy;
pub use piped::PipedStrategy;

/// Assemble the canonical strategy chain, cheapest and most authoritative
/// first: authenticated extraction (when a session cookie is configured),
/// one impersonation entry per client profile, then the external fallbacks.
pub fn build_chain(config: &Config) -> Vec<Box<dyn ResolveStrategy>> {
    let timeout = Duration::from_secs(config.resolver.strategy_timeout_secs);
    let profiles = clients::default_profiles(&config.youtube);
    let mut chain: Vec<Box<dyn ResolveStrategy>> = Vec::new();

    if let Some(cookie) = config
        .youtube
        .cookie
        .as_deref()
        .filter(|c| !c.trim().is_empty())
    {
        chain.push(Box::new(AuthenticatedStrategy::new(
            profiles[0].clone(),
            cookie.to_string(),
            timeout,
        )));
        tracing::info!("Loaded strategy: authenticated");
    }

    for profile in &profiles {
        tracing::info!("Loaded strategy: innertube:{}", profile.name());
        chain.push(Box::new(InnertubeStrategy::new(profile.clone(), timeout)));
    }

    if !config.mirrors.cobalt.is_empty() {
        tracing::info!(
            "Loaded strategy: cobalt ({} instance(s))",
            config.mirrors.cobalt.len()
        );
        chain.push(Box::new(CobaltStrategy::new(
            config.mirrors.cobalt.clone(),
            timeout,
        )));
    }

    if !config.mirrors.piped.is_empty() {
        tracing::info!(
            "Loaded strategy: piped ({} instance(s))",
            config.mirrors.piped.len()
        );
        chain.push(Box::new(PipedStrategy::new(
            config.mirrors.piped.clone(),
            timeout,
        )));
    }

    chain
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chain_order_without_cookie_starts_at_impersonation() {
        let config = Config::default();
        let chain = build_chain(&config);

        let names: Vec<&str> = chain.iter().map(|s| s.name()).collect();
        assert_eq!(
            names,
            vec![
                "innertube:web_remix",
                "innertube:android",
                "innertube:ios",
                "cobalt",
                "piped"
            ]
        );
    }

    #[test]
    fn cookie_prepends_the_authenticated_strategy() {
        let mut config = Config::default();
        config.youtube.cookie = Some("SID=abc; HSID=def".to_string());

        let chain = build_chain(&config);
        assert_eq!(chain[0].name(), "authenticated");
        assert_eq!(chain.len(), 6);
    }

    #[test]
    fn empty_mirror_lists_drop_the_fallback_strategies() {
        let mut config = Config::default();
        config.mirrors.cobalt.clear();
        config.mirrors.piped.clear();

        let chain = build_chain(&config);
        assert_eq!(chain.len(), 3);
        assert!(chain.iter().all(|s| s.name().starts_with("innertube:")));
    }
}
