use std::time::Duration;

use futures_util::StreamExt;
use serde::Deserialize;
use url::Url;

use crate::{FailureKind, LookupError};

#[derive(Debug, Clone)]
pub struct LookupSettings {
    /// oEmbed endpoint; the watch URL and `format=json` are appended as query.
    pub endpoint: String,
    pub connect_timeout: Duration,
    /// Whole-request timeout. `None` leaves it to the transport.
    pub request_timeout: Option<Duration>,
    pub max_bytes: u64,
}

impl Default for LookupSettings {
    fn default() -> Self {
        Self {
            endpoint: "https://www.youtube.com/oembed".to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: None,
            max_bytes: 1024 * 1024,
        }
    }
}

/// Turns a watch URL into the canonical title of the video.
#[async_trait::async_trait]
pub trait TitleLookup: Send + Sync {
    async fn lookup(&self, watch_url: &str) -> Result<String, LookupError>;
}

#[derive(Debug, Deserialize)]
struct OembedResponse {
    title: String,
}

/// Builds `<endpoint>?url=<percent-encoded watch url>&format=json`.
pub fn oembed_url(endpoint: &str, watch_url: &str) -> Result<Url, LookupError> {
    Url::parse_with_params(endpoint, &[("url", watch_url), ("format", "json")])
        .map_err(|err| LookupError::new(FailureKind::InvalidUrl, err.to_string()))
}

/// Single-attempt oEmbed lookup over HTTP.
#[derive(Debug, Clone)]
pub struct OembedLookup {
    settings: LookupSettings,
    client: reqwest::Client,
}

impl OembedLookup {
    pub fn new(settings: LookupSettings) -> Result<Self, LookupError> {
        let mut builder = reqwest::Client::builder().connect_timeout(settings.connect_timeout);
        if let Some(timeout) = settings.request_timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|err| LookupError::new(FailureKind::Network, err.to_string()))?;
        Ok(Self { settings, client })
    }

    fn too_large(&self, actual: u64) -> LookupError {
        LookupError::new(
            FailureKind::TooLarge {
                max_bytes: self.settings.max_bytes,
                actual: Some(actual),
            },
            "response too large",
        )
    }
}

#[async_trait::async_trait]
impl TitleLookup for OembedLookup {
    async fn lookup(&self, watch_url: &str) -> Result<String, LookupError> {
        let url = oembed_url(&self.settings.endpoint, watch_url)?;
        let response = self.client.get(url).send().await.map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(LookupError::new(
                FailureKind::HttpStatus(status.as_u16()),
                status.to_string(),
            ));
        }

        if let Some(content_len) = response.content_length() {
            if content_len > self.settings.max_bytes {
                return Err(self.too_large(content_len));
            }
        }

        let mut bytes = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(map_reqwest_error)?;
            let next_len = bytes.len() as u64 + chunk.len() as u64;
            if next_len > self.settings.max_bytes {
                return Err(self.too_large(next_len));
            }
            bytes.extend_from_slice(&chunk);
        }

        let body: OembedResponse = serde_json::from_slice(&bytes)
            .map_err(|err| LookupError::new(FailureKind::MalformedResponse, err.to_string()))?;
        Ok(body.title)
    }
}

fn map_reqwest_error(err: reqwest::Error) -> LookupError {
    if err.is_timeout() {
        return LookupError::new(FailureKind::Timeout, err.to_string());
    }
    LookupError::new(FailureKind::Network, err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn oembed_url_percent_encodes_the_watch_url() {
        let url = oembed_url(
            "https://www.youtube.com/oembed",
            "https://youtube.com/watch?v=dQw4w9WgXcQ",
        )
        .unwrap();
        assert_eq!(
            url.as_str(),
            "https://www.youtube.com/oembed?url=https%3A%2F%2Fyoutube.com%2Fwatch%3Fv%3DdQw4w9WgXcQ&format=json"
        );
    }

    #[test]
    fn oembed_url_rejects_a_bad_endpoint() {
        let err = oembed_url("not an endpoint", "https://youtube.com/watch?v=x").unwrap_err();
        assert_eq!(err.kind, FailureKind::InvalidUrl);
    }
}
