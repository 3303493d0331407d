use std::time::Duration;

use reqwest::{Client, Error, Proxy};

use crate::proxy::ProxyEndpoint;

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/134.0.0.0 Safari/537.36";

pub struct HttpClient;

impl HttpClient {
    pub fn default_user_agent() -> String {
        DEFAULT_USER_AGENT.to_string()
    }

    /// Client for a single resolution attempt, routed through the given
    /// egress path when one was acquired. `reqwest::Proxy::all` handles the
    /// http/https/socks5 schemes the pool accepts.
    pub fn through_proxy(
        proxy: Option<&ProxyEndpoint>,
        timeout: Duration,
    ) -> Result<Client, Error> {
        let mut builder = Client::builder()
            .user_agent(Self::default_user_agent())
            .timeout(timeout);

        if let Some(endpoint) = proxy {
            builder = builder.proxy(Proxy::all(&endpoint.url)?);
        }

        builder.build()
    }
}
