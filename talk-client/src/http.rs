//! JSON-over-HTTP helper used by the login handshake.

use std::fmt;

use async_trait::async_trait;
use serde_json::Value;
use talk_proto::ChannelHeaders;

// ─── HttpError ────────────────────────────────────────────────────────────────

#[derive(Debug)]
pub enum HttpError {
    /// The request could not be sent or the connection failed.
    Request(String),
    /// The server answered with a non-success status.
    Status(u16),
    /// The body was not valid JSON.
    Body(String),
}

impl fmt::Display for HttpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Request(e) => write!(f, "HTTP request failed: {e}"),
            Self::Status(s)  => write!(f, "HTTP status {s}"),
            Self::Body(e)    => write!(f, "invalid JSON body: {e}"),
        }
    }
}

impl std::error::Error for HttpError {}

impl From<reqwest::Error> for HttpError {
    fn from(e: reqwest::Error) -> Self {
        if let Some(status) = e.status() {
            Self::Status(status.as_u16())
        } else if e.is_decode() {
            Self::Body(e.to_string())
        } else {
            Self::Request(e.to_string())
        }
    }
}

// ─── JsonFetcher ──────────────────────────────────────────────────────────────

/// GETs a URL with the channel headers and parses the body as JSON.
#[async_trait]
pub trait JsonFetcher: Send + Sync {
    async fn get_json(&self, url: &str, headers: &ChannelHeaders) -> Result<Value, HttpError>;
}

/// [`JsonFetcher`] backed by `reqwest`.
///
/// The certificate endpoint holds the request open until the user confirms the
/// PIN, so the default client has no request timeout.
#[derive(Clone, Debug, Default)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Self { Self::default() }

    pub fn with_client(client: reqwest::Client) -> Self { Self { client } }
}

#[async_trait]
impl JsonFetcher for HttpFetcher {
    async fn get_json(&self, url: &str, headers: &ChannelHeaders) -> Result<Value, HttpError> {
        let mut req = self.client.get(url);
        for (name, value) in headers.pairs() {
            req = req.header(name, value);
        }
        tracing::debug!("[talk] GET {url}");
        let value = req
            .send()
            .await?
            .error_for_status()?
            .json::<Value>()
            .await?;
        Ok(value)
    }
}
