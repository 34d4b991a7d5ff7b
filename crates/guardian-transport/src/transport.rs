//! HTTP transport seam
//!
//! The pipeline talks to the network only through [`HttpTransport`]. The default
//! implementation wraps a `reqwest` client; tests substitute their own.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Method;
use reqwest::header::{CONTENT_TYPE, HeaderMap};
use url::Url;

use crate::error::TransportError;

/// Media type of JSON request and response bodies
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Media type of plain-text error messages
pub const TEXT_CONTENT_TYPE: &str = "text/plain";

/// Outgoing request snapshot
#[derive(Debug, Clone)]
pub struct HttpRequest {
    /// HTTP method
    pub method: Method,

    /// Absolute request URL
    pub url: Url,

    /// Merged request headers
    pub headers: HeaderMap,

    /// Encoded body, if the request has one
    pub body: Option<Bytes>,
}

/// Raw response as delivered by a transport
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// Status code
    pub status: u16,

    /// Response headers
    pub headers: HeaderMap,

    /// Response body, empty if none was sent
    pub body: Bytes,
}

impl HttpResponse {
    /// Create a response from its parts
    pub fn new(status: u16, headers: HeaderMap, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers,
            body: body.into(),
        }
    }

    /// Check for a `2xx` status
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Check for a status a well-formed HTTP response can carry
    pub fn has_valid_status(&self) -> bool {
        (100..=599).contains(&self.status)
    }

    /// Check for a status that never carries content
    pub fn is_no_content(&self) -> bool {
        matches!(self.status, 204 | 205)
    }

    /// Media type without parameters, lowercased
    pub fn media_type(&self) -> Option<String> {
        let value = self.headers.get(CONTENT_TYPE)?.to_str().ok()?;
        let essence = value.split(';').next().unwrap_or_default().trim();
        Some(essence.to_ascii_lowercase())
    }

    /// Check whether the body is declared as JSON
    pub fn is_json(&self) -> bool {
        self.media_type().as_deref() == Some(JSON_CONTENT_TYPE)
    }

    /// Body as text when it is declared `text/plain` and is valid UTF-8
    pub fn text_message(&self) -> Option<String> {
        if self.media_type().as_deref() != Some(TEXT_CONTENT_TYPE) || self.body.is_empty() {
            return None;
        }
        String::from_utf8(self.body.to_vec()).ok()
    }
}

/// Something that can perform one HTTP exchange
#[async_trait]
pub trait HttpTransport: Send + Sync + fmt::Debug {
    /// Send `request` and wait for the complete response
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// [`HttpTransport`] backed by `reqwest`
///
/// Redirects are never followed and TLS is provided by rustls.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Build a client with the given request timeout
    pub fn new(timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::NoConnection {
                reason: format!("Failed to create HTTP client: {e}"),
            })?;

        Ok(Self { client })
    }

    /// Wrap an existing client
    ///
    /// The client should be configured with `redirect::Policy::none()`.
    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let mut builder = self
            .client
            .request(request.method, request.url)
            .headers(request.headers);
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(map_reqwest_error)?;

        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let body = response.bytes().await.map_err(map_reqwest_error)?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

fn map_reqwest_error(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout
    } else if err.is_connect() {
        TransportError::NoConnection {
            reason: err.to_string(),
        }
    } else {
        TransportError::NoResponse {
            reason: err.to_string(),
        }
    }
}
