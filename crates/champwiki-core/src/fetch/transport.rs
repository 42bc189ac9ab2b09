//! HTTP transport seam.
//!
//! [`PageFetcher`](super::PageFetcher) talks to the network only through
//! [`HttpTransport`], so tests can count or script requests without a socket.

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;
use url::Url;

use crate::config::HttpConfig;
use crate::{Error, Result};

/// Status and body of a completed GET.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// Decoded response body.
    pub body: String,
}

/// Minimal HTTP GET capability.
///
/// Implementations report connection-level failures as
/// [`Error::TransientFetch`] or [`Error::PermanentFetch`]; any response that
/// arrives, whatever its status, is returned as `Ok`.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Perform a GET request.
    async fn get(&self, url: &Url) -> Result<HttpResponse>;
}

/// Classify a response status, passing 2xx through.
///
/// 408, 429 and 5xx are transient; every other non-success status is permanent.
pub fn check_status(url: &Url, status: u16) -> Result<()> {
    match status {
        200..=299 => Ok(()),
        408 | 429 | 500..=599 => Err(Error::TransientFetch {
            url: url.to_string(),
            status: Some(status),
            reason: format!("server responded {status}"),
        }),
        _ => Err(Error::PermanentFetch {
            url: url.to_string(),
            status: Some(status),
            reason: if status == 404 {
                "page does not exist".to_string()
            } else {
                format!("server responded {status}")
            },
        }),
    }
}

/// [`HttpTransport`] backed by a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Build a client with the configured user agent and timeout.
    pub fn new(config: &HttpConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .user_agent(config.user_agent.as_str())
            .gzip(true)
            .brotli(true)
            .build()
            .map_err(Error::Network)?;
        Ok(Self { client })
    }

    fn classify(url: &Url, err: &reqwest::Error) -> Error {
        if err.is_builder() {
            return Error::PermanentFetch {
                url: url.to_string(),
                status: None,
                reason: format!("malformed request: {err}"),
            };
        }
        let reason = if err.is_timeout() {
            format!("timed out: {err}")
        } else if err.is_connect() {
            format!("connection failed: {err}")
        } else {
            err.to_string()
        };
        Error::TransientFetch {
            url: url.to_string(),
            status: err.status().map(|s| s.as_u16()),
            reason,
        }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get(&self, url: &Url) -> Result<HttpResponse> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| Self::classify(url, &e))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| Self::classify(url, &e))?;
        debug!(%url, status, bytes = body.len(), "received response");
        Ok(HttpResponse { status, body })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_status_classification() {
        let u = url("https://wiki.example/Ahri");
        assert!(check_status(&u, 200).is_ok());
        assert!(check_status(&u, 503).unwrap_err().is_recoverable());
        assert!(check_status(&u, 429).unwrap_err().is_recoverable());
        let not_found = check_status(&u, 404).unwrap_err();
        assert!(!not_found.is_recoverable());
        assert!(not_found.is_not_found());
        assert!(!check_status(&u, 403).unwrap_err().is_recoverable());
    }

    #[tokio::test]
    async fn test_returns_body_and_status() -> anyhow::Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/Ahri"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>ahri</html>"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/Missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let transport = ReqwestTransport::new(&HttpConfig::default())?;
        let ok = transport.get(&url(&format!("{}/Ahri", server.uri()))).await?;
        assert_eq!(ok.status, 200);
        assert_eq!(ok.body, "<html>ahri</html>");

        let missing = transport.get(&url(&format!("{}/Missing", server.uri()))).await?;
        assert_eq!(missing.status, 404);
        Ok(())
    }

    #[tokio::test]
    async fn test_timeout_is_transient() -> anyhow::Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
            .mount(&server)
            .await;

        let config = HttpConfig {
            timeout_secs: 1,
            ..HttpConfig::default()
        };
        let transport = ReqwestTransport::new(&config)?;
        let err = transport
            .get(&url(&format!("{}/Slow", server.uri())))
            .await
            .unwrap_err();
        assert!(err.is_recoverable(), "unexpected error: {err}");
        Ok(())
    }

    #[tokio::test]
    async fn test_connection_refused_is_transient() -> anyhow::Result<()> {
        let transport = ReqwestTransport::new(&HttpConfig::default())?;
        let err = transport.get(&url("http://127.0.0.1:1/Ahri")).await.unwrap_err();
        assert!(err.is_recoverable());
        Ok(())
    }
}
