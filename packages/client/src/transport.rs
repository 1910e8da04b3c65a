//! HTTP transport seam.
//!
//! [`ParkingClient`](crate::ParkingClient) never talks to `reqwest`
//! directly; it goes through [`HttpTransport`] so tests can substitute a
//! scripted transport and count requests. [`ReqwestTransport`] is the
//! production implementation.
//!
//! Transports perform exactly one attempt per call. Status codes are
//! returned as-is; interpreting them is the client's job.

use std::time::Duration;

use async_trait::async_trait;

use crate::TransportError;

/// Maximum length of the response body preview included in logs.
const BODY_PREVIEW_LEN: usize = 300;

/// A fully read HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    #[must_use]
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// Performs a single GET request.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Sends `GET url?query` and reads the whole body.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] when no complete response was obtained.
    async fn get(
        &self,
        url: &reqwest::Url,
        query: &[(&str, String)],
    ) -> Result<HttpResponse, TransportError>;
}

/// [`HttpTransport`] backed by a [`reqwest::Client`].
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Builds a transport whose requests give up after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Http`] if the TLS backend cannot be
    /// initialized.
    pub fn new(timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("parkendd/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .connect_timeout(timeout.min(Duration::from_secs(10)))
            .build()?;
        Ok(Self { client })
    }

    #[must_use]
    pub const fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get(
        &self,
        url: &reqwest::Url,
        query: &[(&str, String)],
    ) -> Result<HttpResponse, TransportError> {
        let response = self.client.get(url.clone()).query(query).send().await?;

        let status = response.status();
        let final_url = response.url().to_string();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(String::from);

        let body = response.text().await.inspect_err(|e| {
            log::warn!(
                "Response body read failed\n  \
                 url: {final_url}\n  \
                 status: {status}\n  \
                 content-type: {content_type:?}\n  \
                 error: {e}"
            );
        })?;

        if !status.is_success() {
            log::debug!(
                "HTTP {status} from {final_url}\n  \
                 content-type: {content_type:?}\n  \
                 body preview: {}",
                preview(&body)
            );
        }

        Ok(HttpResponse {
            status: status.as_u16(),
            body,
        })
    }
}

/// Truncates `body` for logging without splitting a UTF-8 character.
pub(crate) fn preview(body: &str) -> String {
    if body.len() <= BODY_PREVIEW_LEN {
        return body.to_string();
    }
    let mut end = BODY_PREVIEW_LEN;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &body[..end])
}
