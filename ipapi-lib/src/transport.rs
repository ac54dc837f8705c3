//! The HTTP side of a lookup.
//!
//! The worker only ever sees an [`UpstreamReply`], which keeps the rate
//! limit logic independent of the HTTP client and lets callers plug in their
//! own [`Transport`].
use async_trait::async_trait;
use http::{
    HeaderMap, StatusCode,
    header::{self, HeaderValue},
};
use url::Url;

use crate::{Config, ErrorKind, Result};

/// A complete reply of the upstream service.
///
/// The body is read eagerly, since the status and the rate limit headers
/// must be inspected before deciding whether the body is of any use.
#[derive(Debug, Clone)]
pub struct UpstreamReply {
    /// HTTP status of the reply
    pub status: StatusCode,
    /// All reply headers, including the rate limit headers
    pub headers: HeaderMap,
    /// Raw reply body
    pub body: Vec<u8>,
}

/// Performs a single upstream attempt.
///
/// Implementations must not retry on their own; retries and rate limit
/// back-off are the worker's job.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Fetch `url` and return the complete reply.
    ///
    /// # Errors
    ///
    /// Returns an error if the upstream could not be reached or the reply
    /// could not be read completely (including timeouts).
    async fn fetch(&self, url: &Url) -> Result<UpstreamReply>;
}

/// Default [`Transport`] backed by a `reqwest` client
#[derive(Debug, Clone)]
pub struct HttpTransport {
    reqwest_client: reqwest::Client,
}

impl HttpTransport {
    /// Create a transport from the user agent and timeout of `config`.
    ///
    /// # Errors
    ///
    /// Returns an `Err` if:
    /// - The user-agent is invalid.
    /// - The request client cannot be created.
    ///   See [here](https://docs.rs/reqwest/latest/reqwest/struct.ClientBuilder.html#errors).
    pub fn new(config: &Config) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::USER_AGENT,
            HeaderValue::from_str(&config.user_agent).map_err(ErrorKind::InvalidHeader)?,
        );
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));

        let reqwest_client = reqwest::ClientBuilder::new()
            .gzip(true)
            .default_headers(headers)
            .timeout(config.timeout)
            .build()
            .map_err(ErrorKind::BuildClient)?;

        Ok(Self { reqwest_client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn fetch(&self, url: &Url) -> Result<UpstreamReply> {
        let response = self
            .reqwest_client
            .get(url.clone())
            .send()
            .await
            .map_err(ErrorKind::Transport)?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await.map_err(ErrorKind::Transport)?;

        Ok(UpstreamReply {
            status,
            headers,
            body: body.to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use http::StatusCode;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{header, method, path},
    };

    use super::{HttpTransport, Transport};
    use crate::{Config, ErrorKind};

    #[tokio::test]
    async fn test_fetch_keeps_headers_and_body() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/json/8.8.8.8"))
            .and(header("accept", "application/json"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("X-Rl", "44")
                    .insert_header("X-Ttl", "60")
                    .set_body_string(r#"{"status":"success"}"#),
            )
            .expect(1)
            .mount(&mock_server)
            .await;

        let config = Config::default();
        let transport = HttpTransport::new(&config).unwrap();
        let url = format!("{}/json/8.8.8.8", mock_server.uri()).parse().unwrap();
        let reply = transport.fetch(&url).await.unwrap();

        assert_eq!(reply.status, StatusCode::OK);
        assert_eq!(reply.headers.get("x-rl").unwrap(), "44");
        assert_eq!(reply.body, br#"{"status":"success"}"#);
    }

    #[tokio::test]
    async fn test_fetch_sends_user_agent() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(header("user-agent", "geo-test/1.0"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&mock_server)
            .await;

        let config = Config::builder().user_agent("geo-test/1.0").build();
        let transport = HttpTransport::new(&config).unwrap();
        let url = mock_server.uri().parse().unwrap();
        assert!(transport.fetch(&url).await.is_ok());
    }

    #[tokio::test]
    async fn test_fetch_timeout() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
            .mount(&mock_server)
            .await;

        let config = Config::builder().timeout(Duration::from_millis(50)).build();
        let transport = HttpTransport::new(&config).unwrap();
        let url = mock_server.uri().parse().unwrap();
        let err = transport.fetch(&url).await.unwrap_err();

        assert!(matches!(err, ErrorKind::Transport(ref e) if e.is_timeout()));
        assert!(err.details().ends_with("request timed out"));
    }

    #[test]
    fn test_invalid_user_agent() {
        let config = Config::builder().user_agent("bad\nagent").build();
        assert!(matches!(
            HttpTransport::new(&config),
            Err(ErrorKind::InvalidHeader(_))
        ));
    }
}
