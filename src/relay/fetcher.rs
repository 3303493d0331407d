use std::time::Duration;

use async_trait::async_trait;
use futures::{StreamExt, TryStreamExt};
use reqwest::header;

use crate::common::http::HttpClient;
use crate::common::types::{AnyError, AnyResult};

use super::{UpstreamFetcher, UpstreamResponse};

/// Production fetcher for the byte relay. Redirect-following stays on
/// (signed CDN URLs bounce through redirectors), the connect timeout is
/// short, and the read timeout bounds silence between chunks rather than
/// the whole transfer, since audio streams are held open far longer than any
/// sane total timeout.
pub struct ReqwestFetcher {
    client: reqwest::Client,
}

impl ReqwestFetcher {
    pub fn new(read_timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .user_agent(HttpClient::default_user_agent())
            .connect_timeout(Duration::from_secs(10))
            .read_timeout(read_timeout)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl UpstreamFetcher for ReqwestFetcher {
    async fn fetch(&self, url: &str, range: Option<&str>) -> AnyResult<UpstreamResponse> {
        let mut request = self
            .client
            .get(url)
            .header(header::ACCEPT, "*/*")
            .header(header::ACCEPT_LANGUAGE, "en-US,en;q=0.9")
            .header(header::ORIGIN, "https://music.youtube.com")
            .header(header::REFERER, "https://music.youtube.com/")
            .header("Sec-Fetch-Dest", "audio")
            .header("Sec-Fetch-Mode", "no-cors")
            .header("Sec-Fetch-Site", "cross-site");

        if let Some(range) = range {
            request = request.header(header::RANGE, range);
        }

        let response = request.send().await?;

        let header_string = |name: header::HeaderName| {
            response
                .headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(|v| v.to_string())
        };

        Ok(UpstreamResponse {
            status: response.status().as_u16(),
            content_type: header_string(header::CONTENT_TYPE),
            content_length: header_string(header::CONTENT_LENGTH),
            content_range: header_string(header::CONTENT_RANGE),
            body: response
                .bytes_stream()
                .map_err(|e| Box::new(e) as AnyError)
                .boxed(),
        })
    }
}
