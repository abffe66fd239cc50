//! HTTP seam used by the AI client.
//!
//! The client only ever needs three shapes of request: a JSON `POST` with a
//! buffered reply, a JSON `POST` whose reply body is consumed incrementally,
//! and a plain `GET`. Keeping them behind a trait lets tests observe exactly
//! which endpoints were contacted.

use std::fmt;
use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{Stream, StreamExt};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportError(pub String);

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for TransportError {}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError(format!("request timed out: {err}"))
        } else {
            TransportError(err.to_string())
        }
    }
}

/// A fully buffered response.
#[derive(Debug, Clone)]
pub struct HttpReply {
    pub status: u16,
    pub body: String,
}

impl HttpReply {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Vec<u8>, TransportError>> + Send>>;

/// A response whose body is delivered as it arrives.
pub struct StreamingReply {
    pub status: u16,
    pub body: ByteStream,
}

impl StreamingReply {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Drain the remaining body into a string, used for error payloads.
    pub async fn into_text(mut self) -> String {
        let mut bytes = Vec::new();
        while let Some(chunk) = self.body.next().await {
            match chunk {
                Ok(chunk) => bytes.extend_from_slice(&chunk),
                Err(_) => break,
            }
        }
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

pub type Headers<'a> = &'a [(&'static str, String)];

#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn post_json(
        &self,
        url: &str,
        headers: Headers<'_>,
        body: &serde_json::Value,
    ) -> Result<HttpReply, TransportError>;

    async fn post_json_streaming(
        &self,
        url: &str,
        headers: Headers<'_>,
        body: &serde_json::Value,
    ) -> Result<StreamingReply, TransportError>;

    async fn get(&self, url: &str) -> Result<HttpReply, TransportError>;
}

pub struct ReqwestTransport {
    client: reqwest::Client,
    timeout: Duration,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .connect_timeout(timeout)
            .user_agent(concat!("nexchat/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client, timeout })
    }

    fn with_headers(
        mut request: reqwest::RequestBuilder,
        headers: Headers<'_>,
    ) -> reqwest::RequestBuilder {
        for (name, value) in headers {
            request = request.header(*name, value);
        }
        request
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn post_json(
        &self,
        url: &str,
        headers: Headers<'_>,
        body: &serde_json::Value,
    ) -> Result<HttpReply, TransportError> {
        let request = self
            .client
            .post(url)
            .timeout(self.timeout)
            .header("Content-Type", "application/json");
        let response = Self::with_headers(request, headers)
            .json(body)
            .send()
            .await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(HttpReply { status, body })
    }

    async fn post_json_streaming(
        &self,
        url: &str,
        headers: Headers<'_>,
        body: &serde_json::Value,
    ) -> Result<StreamingReply, TransportError> {
        // No total timeout; the client bounds the wait for headers and each chunk gap.
        let request = self
            .client
            .post(url)
            .header("Content-Type", "application/json");
        let response = Self::with_headers(request, headers)
            .json(body)
            .send()
            .await?;
        let status = response.status().as_u16();
        let body = response
            .bytes_stream()
            .map(|chunk| chunk.map(|bytes| bytes.to_vec()).map_err(TransportError::from));
        Ok(StreamingReply {
            status,
            body: Box::pin(body),
        })
    }

    async fn get(&self, url: &str) -> Result<HttpReply, TransportError> {
        let response = self.client.get(url).timeout(self.timeout).send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(HttpReply { status, body })
    }
}
