//! Typed request/result pipeline
//!
//! A [`NetworkOperation`] is one HTTP exchange whose outcome is classified into a
//! [`NetworkResult`]. Each operation performs at most one transport call and never
//! retries. Construction never fails: an error while encoding the body or headers is
//! stored on the operation and reported when it runs, without touching the
//! transport.
//!
//! ```rust,no_run
//! use guardian_transport::{Method, NetworkConfig, NetworkOperation, Payload, Url};
//! use serde_json::{json, Value};
//!
//! # async fn example() -> guardian_transport::NetworkResult<()> {
//! let config = NetworkConfig::shared()?.clone();
//! let url = Url::parse("https://tenant.guardian.auth0.com/api/verify-otp").unwrap();
//! let operation = NetworkOperation::<Value>::new(
//!     config,
//!     Method::POST,
//!     url,
//!     [("Authorization", "Bearer transaction-token")],
//!     Some(&json!({"type": "push_notification", "code": "123456"})),
//! );
//!
//! match operation.execute().await? {
//!     Payload::Content(body) => println!("{body}"),
//!     Payload::NoContent => println!("done"),
//! }
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use bytes::Bytes;
use reqwest::Method;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use serde::Serialize;
use serde::de::DeserializeOwned;
use url::Url;

use crate::config::NetworkConfig;
use crate::error::{
    DecodeError, NetworkError, NetworkResult, ProtocolError, ResponseError, TransportError,
};
use crate::telemetry::TELEMETRY_HEADER;
use crate::transport::{HttpRequest, HttpResponse, JSON_CONTENT_TYPE};

/// Observer of the outgoing request
pub type RequestHook = Arc<dyn Fn(&HttpRequest) + Send + Sync>;

/// Observer of the raw response, fired for every status
pub type ResponseHook = Arc<dyn Fn(&HttpResponse) + Send + Sync>;

/// Custom classification of a non-success response; `None` defers to the next mapper
pub type ErrorMapper = Arc<dyn Fn(&HttpResponse) -> Option<NetworkError> + Send + Sync>;

/// Successful outcome of an operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload<T> {
    /// Decoded JSON body
    Content(T),

    /// The server answered with no content
    NoContent,
}

impl<T> Payload<T> {
    /// Check for the no-content sentinel
    pub fn is_no_content(&self) -> bool {
        matches!(self, Self::NoContent)
    }

    /// Decoded body, if any
    pub fn content(self) -> Option<T> {
        match self {
            Self::Content(value) => Some(value),
            Self::NoContent => None,
        }
    }

    /// Decoded body, treating no content as a schema mismatch
    pub fn require_content(self) -> NetworkResult<T> {
        self.content().ok_or_else(|| {
            DecodeError::SchemaMismatch {
                reason: "expected a response body but the server returned no content".to_string(),
            }
            .into()
        })
    }

    /// Transform the decoded body
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Payload<U> {
        match self {
            Self::Content(value) => Payload::Content(f(value)),
            Self::NoContent => Payload::NoContent,
        }
    }
}

/// One HTTP exchange producing a `NetworkResult<Payload<T>>`
///
/// The request body type is only needed while encoding, so it is a parameter of
/// [`NetworkOperation::new`] rather than of the operation.
pub struct NetworkOperation<T> {
    config: NetworkConfig,
    request: HttpRequest,
    deferred_error: Option<NetworkError>,
    on_request: Option<RequestHook>,
    on_response: Option<ResponseHook>,
    error_mappers: Vec<ErrorMapper>,
    _response: PhantomData<fn() -> T>,
}

impl<T: DeserializeOwned> NetworkOperation<T> {
    /// Build an operation
    ///
    /// Defaults (`Content-Type` for a body, the telemetry header, and the config's
    /// default headers) are applied first; `headers` then replace any default with
    /// the same name.
    pub fn new<B, I, K, V>(
        config: NetworkConfig,
        method: Method,
        url: Url,
        headers: I,
        body: Option<&B>,
    ) -> Self
    where
        B: Serialize + ?Sized,
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut deferred_error = None;

        let body = match body.map(serde_json::to_vec).transpose() {
            Ok(body) => body.map(Bytes::from),
            Err(e) => {
                deferred_error = Some(NetworkError::Encoding {
                    reason: format!("Failed to encode request body: {e}"),
                });
                None
            }
        };

        let mut merged = default_headers(&config, body.is_some());
        for (name, value) in headers {
            match encode_header(name.as_ref(), value.as_ref()) {
                Ok((name, value)) => {
                    merged.insert(name, value);
                }
                Err(err) => {
                    deferred_error.get_or_insert(err);
                }
            }
        }

        Self {
            config,
            request: HttpRequest {
                method,
                url,
                headers: merged,
                body,
            },
            deferred_error,
            on_request: None,
            on_response: None,
            error_mappers: Vec::new(),
            _response: PhantomData,
        }
    }

    /// Build a body-less `GET` operation
    pub fn get<I, K, V>(config: NetworkConfig, url: Url, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        Self::new::<(), _, _, _>(config, Method::GET, url, headers, None)
    }

    /// Build an operation that fails with `error` when run
    pub fn failed(config: NetworkConfig, method: Method, url: Url, error: NetworkError) -> Self {
        let mut operation = Self::new::<(), _, &str, &str>(
            config,
            method,
            url,
            std::iter::empty::<(&str, &str)>(),
            None,
        );
        operation.deferred_error = Some(error);
        operation
    }
}

impl<T> NetworkOperation<T> {
    /// Observe the outgoing request
    pub fn on_request(mut self, hook: impl Fn(&HttpRequest) + Send + Sync + 'static) -> Self {
        self.on_request = Some(Arc::new(hook));
        self
    }

    /// Observe the raw response
    pub fn on_response(mut self, hook: impl Fn(&HttpResponse) + Send + Sync + 'static) -> Self {
        self.on_response = Some(Arc::new(hook));
        self
    }

    /// Try `mapper` on non-success responses before any previously added mapper
    /// and before the status-code classification
    pub fn map_error(
        mut self,
        mapper: impl Fn(&HttpResponse) -> Option<NetworkError> + Send + Sync + 'static,
    ) -> Self {
        self.error_mappers.push(Arc::new(mapper));
        self
    }

    /// Request as it will be sent
    pub fn request(&self) -> &HttpRequest {
        &self.request
    }

    /// Error recorded while building the operation, if any
    pub fn deferred_error(&self) -> Option<&NetworkError> {
        self.deferred_error.as_ref()
    }

    fn fire_request_hook(&self) {
        if let Some(hook) = &self.on_request {
            hook(&self.request);
        }
    }
}

impl<T: DeserializeOwned + Send + 'static> NetworkOperation<T> {
    /// Run the operation and wait for its outcome
    ///
    /// The configured timeout runs on the tokio timer, so the awaiting runtime
    /// must be built with the time driver enabled (`enable_time` or `enable_all`).
    pub async fn execute(mut self) -> NetworkResult<Payload<T>> {
        self.fire_request_hook();
        match self.deferred_error.take() {
            Some(err) => {
                tracing::warn!(url = %self.request.url, error = %err, "Request not sent");
                Err(err)
            }
            None => self.perform().await,
        }
    }

    /// Run the operation in the background and deliver its outcome to `callback`
    ///
    /// The request hook fires before this returns. A deferred error is delivered
    /// synchronously; otherwise one task is spawned and `callback` runs on it once
    /// the exchange completes. There is no way to cancel a started operation.
    ///
    /// May be called from any thread. The task goes to the configured runtime, else
    /// the caller's runtime, else a background runtime built on first use. A
    /// configured or caller runtime needs the time driver, as for [`Self::execute`].
    pub fn start<F>(mut self, callback: F)
    where
        F: FnOnce(NetworkResult<Payload<T>>) + Send + 'static,
    {
        self.fire_request_hook();

        if let Some(err) = self.deferred_error.take() {
            tracing::warn!(url = %self.request.url, error = %err, "Request not sent");
            callback(Err(err));
            return;
        }

        match self.config.runtime() {
            Ok(handle) => {
                handle.spawn(async move {
                    callback(self.perform().await);
                });
            }
            Err(err) => callback(Err(err)),
        }
    }

    async fn perform(self) -> NetworkResult<Payload<T>> {
        let method = self.request.method.clone();
        let url = self.request.url.clone();
        tracing::debug!(method = %method, url = %url, "Sending request");

        let sent = tokio::time::timeout(
            self.config.timeout(),
            self.config.transport().send(self.request.clone()),
        )
        .await;

        let result = match sent {
            Err(_) => Err(TransportError::Timeout.into()),
            Ok(Err(err)) => Err(err.into()),
            Ok(Ok(response)) => self.classify(response),
        };

        match &result {
            Ok(_) => tracing::debug!(method = %method, url = %url, "Request succeeded"),
            Err(err) => tracing::warn!(
                method = %method,
                url = %url,
                status = ?err.status_code(),
                error = %err,
                "Request failed"
            ),
        }

        result
    }
}

impl<T: DeserializeOwned> NetworkOperation<T> {
    fn classify(&self, response: HttpResponse) -> NetworkResult<Payload<T>> {
        if !response.has_valid_status() {
            return Err(ProtocolError::InvalidHttpResponse {
                status: response.status,
            }
            .into());
        }

        if let Some(hook) = &self.on_response {
            hook(&response);
        }

        if !response.is_success() {
            let mapped = self
                .error_mappers
                .iter()
                .rev()
                .find_map(|mapper| mapper(&response));
            return Err(mapped.unwrap_or_else(|| {
                ResponseError::from_status(response.status, response.text_message()).into()
            }));
        }

        if response.is_no_content() {
            return Ok(Payload::NoContent);
        }
        if response.body.is_empty() {
            return Err(DecodeError::MissingBody.into());
        }
        if !response.is_json() {
            return Err(DecodeError::InvalidResponse {
                cause: format!(
                    "expected {JSON_CONTENT_TYPE}, got {}",
                    response.media_type().as_deref().unwrap_or("no content type")
                ),
            }
            .into());
        }

        serde_json::from_slice(&response.body)
            .map(Payload::Content)
            .map_err(|e| DecodeError::InvalidResponse { cause: e.to_string() }.into())
    }
}

impl<T> fmt::Debug for NetworkOperation<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NetworkOperation")
            .field("request", &self.request)
            .field("deferred_error", &self.deferred_error)
            .field("error_mappers", &self.error_mappers.len())
            .finish_non_exhaustive()
    }
}

fn default_headers(config: &NetworkConfig, has_body: bool) -> HeaderMap {
    let mut headers = HeaderMap::new();
    if has_body {
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));
    }
    if let Some(telemetry) = config.telemetry()
        && let Ok(name) = HeaderName::from_bytes(TELEMETRY_HEADER.as_bytes())
        && let Ok(value) = HeaderValue::from_str(&telemetry.header_value())
    {
        headers.insert(name, value);
    }
    for (name, value) in config.default_headers() {
        headers.insert(name.clone(), value.clone());
    }
    headers
}

fn encode_header(name: &str, value: &str) -> NetworkResult<(HeaderName, HeaderValue)> {
    let header_name =
        HeaderName::from_bytes(name.as_bytes()).map_err(|_| NetworkError::Encoding {
            reason: format!("Invalid header name: {name}"),
        })?;
    let header_value = HeaderValue::from_str(value).map_err(|_| NetworkError::Encoding {
        reason: format!("Invalid value for header {name}"),
    })?;
    Ok((header_name, header_value))
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use serde_json::{Value, json};

    use super::*;
    use crate::transport::HttpTransport;

    /// Answers every request with the same response and counts calls
    #[derive(Debug)]
    struct FixedTransport {
        status: u16,
        content_type: Option<&'static str>,
        body: &'static str,
        calls: AtomicUsize,
    }

    impl FixedTransport {
        fn new(status: u16, content_type: Option<&'static str>, body: &'static str) -> Arc<Self> {
            Arc::new(Self {
                status,
                content_type,
                body,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl HttpTransport for FixedTransport {
        async fn send(&self, _request: HttpRequest) -> Result<HttpResponse, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut headers = HeaderMap::new();
            if let Some(content_type) = self.content_type {
                headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
            }
            Ok(HttpResponse::new(self.status, headers, self.body))
        }
    }

    fn config(transport: Arc<FixedTransport>) -> NetworkConfig {
        NetworkConfig::builder().transport(transport).build().unwrap()
    }

    fn url() -> Url {
        Url::parse("https://tenant.guardian.auth0.com/api/resolve-transaction").unwrap()
    }

    fn post(transport: Arc<FixedTransport>) -> NetworkOperation<Value> {
        NetworkOperation::new(
            config(transport),
            Method::POST,
            url(),
            [("Authorization", "Bearer txtkn")],
            Some(&json!({"challenge_response": "a.b.c"})),
        )
    }

    #[tokio::test]
    async fn test_decodes_json_body() {
        let transport = FixedTransport::new(200, Some("application/json"), r#"{"ok":true}"#);
        let result = post(transport).execute().await.unwrap();
        assert_eq!(result, Payload::Content(json!({"ok": true})));
    }

    #[tokio::test]
    async fn test_no_content_ignores_body() {
        let transport = FixedTransport::new(204, Some("text/html"), "<garbage>");
        assert_eq!(post(transport).execute().await.unwrap(), Payload::NoContent);
    }

    #[tokio::test]
    async fn test_empty_success_body_is_missing_body() {
        let transport = FixedTransport::new(200, Some("application/json"), "");
        assert_eq!(
            post(transport).execute().await.unwrap_err(),
            NetworkError::Decode(DecodeError::MissingBody)
        );
    }

    #[tokio::test]
    async fn test_non_json_success_is_invalid_response() {
        let transport = FixedTransport::new(200, Some("text/plain"), "ok");
        assert!(matches!(
            post(transport).execute().await.unwrap_err(),
            NetworkError::Decode(DecodeError::InvalidResponse { .. })
        ));

        let transport = FixedTransport::new(200, Some("application/json"), "{not json");
        assert!(matches!(
            post(transport).execute().await.unwrap_err(),
            NetworkError::Decode(DecodeError::InvalidResponse { .. })
        ));
    }

    #[tokio::test]
    async fn test_status_classification_carries_text_message() {
        let transport = FixedTransport::new(403, Some("text/plain"), "enrollment revoked");
        assert_eq!(
            post(transport).execute().await.unwrap_err(),
            NetworkError::Response(ResponseError::NotAuthorized {
                status: 403,
                message: Some("enrollment revoked".to_string()),
            })
        );
    }

    #[tokio::test]
    async fn test_invalid_status_is_protocol_error() {
        let transport = FixedTransport::new(42, None, "");
        assert_eq!(
            post(transport).execute().await.unwrap_err(),
            NetworkError::Protocol(ProtocolError::InvalidHttpResponse { status: 42 })
        );
    }

    #[tokio::test]
    async fn test_error_mappers_newest_first() {
        let transport = FixedTransport::new(400, Some("application/json"), "{}");
        let err = post(transport)
            .map_error(|_| {
                Some(NetworkError::Configuration {
                    reason: "first".to_string(),
                })
            })
            .map_error(|_| {
                Some(NetworkError::Configuration {
                    reason: "second".to_string(),
                })
            })
            .execute()
            .await
            .unwrap_err();
        assert_eq!(
            err,
            NetworkError::Configuration {
                reason: "second".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_error_mappers_fall_through_to_default() {
        let transport = FixedTransport::new(404, None, "");
        let err = post(transport)
            .map_error(|_| None)
            .map_error(|_| None)
            .execute()
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            NetworkError::Response(ResponseError::NotFound { status: 404, .. })
        ));
    }

    #[tokio::test]
    async fn test_error_mapper_ignored_on_success() {
        let transport = FixedTransport::new(200, Some("application/json"), "[1]");
        let result = post(transport)
            .map_error(|_| {
                Some(NetworkError::Configuration {
                    reason: "never".to_string(),
                })
            })
            .execute()
            .await
            .unwrap();
        assert_eq!(result, Payload::Content(json!([1])));
    }

    #[tokio::test]
    async fn test_caller_headers_override_defaults() {
        let transport = FixedTransport::new(204, None, "");
        let config = NetworkConfig::builder()
            .transport(transport)
            .default_header("X-Tenant", "default")
            .build()
            .unwrap();

        let operation = NetworkOperation::<Value>::new(
            config,
            Method::POST,
            url(),
            [("Content-Type", "application/merge-patch+json"), ("x-tenant", "caller")],
            Some(&json!({})),
        );

        let headers = &operation.request().headers;
        assert_eq!(headers[CONTENT_TYPE], "application/merge-patch+json");
        assert_eq!(headers["X-Tenant"], "caller");
        assert!(headers.contains_key(TELEMETRY_HEADER));
    }

    #[tokio::test]
    async fn test_invalid_header_is_deferred_without_io() {
        let transport = FixedTransport::new(204, None, "");
        let operation = NetworkOperation::<Value>::new(
            config(transport.clone()),
            Method::POST,
            url(),
            [("Authorization", "Bearer bad\ntoken")],
            Some(&json!({})),
        );
        assert!(operation.deferred_error().is_some());

        let err = operation.execute().await.unwrap_err();
        assert!(matches!(err, NetworkError::Encoding { .. }));
        assert_eq!(transport.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unencodable_body_is_deferred_without_io() {
        use std::collections::HashMap;

        // JSON object keys must be strings
        let mut body = HashMap::new();
        body.insert(vec![1u8], "value");

        let transport = FixedTransport::new(204, None, "");
        let requests = Arc::new(AtomicUsize::new(0));
        let seen = requests.clone();

        let (sender, receiver) = tokio::sync::oneshot::channel();
        NetworkOperation::<Value>::new(
            config(transport.clone()),
            Method::POST,
            url(),
            std::iter::empty::<(&str, &str)>(),
            Some(&body),
        )
        .on_request(move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
        })
        .start(move |result| {
            let _ = sender.send(result);
        });

        let result = receiver.await.unwrap();
        assert!(matches!(result, Err(NetworkError::Encoding { .. })));
        assert_eq!(requests.load(Ordering::SeqCst), 1);
        assert_eq!(transport.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_start_delivers_exactly_once() {
        let transport = FixedTransport::new(200, Some("application/json"), r#"{"n":1}"#);
        let (sender, mut receiver) = tokio::sync::mpsc::unbounded_channel();

        post(transport.clone()).start(move |result| {
            let _ = sender.send(result);
        });

        let first = receiver.recv().await.unwrap();
        assert_eq!(first.unwrap(), Payload::Content(json!({"n": 1})));
        assert!(receiver.recv().await.is_none());
        assert_eq!(transport.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_start_from_plain_thread() {
        let transport = FixedTransport::new(200, Some("application/json"), r#"{"n":2}"#);
        let (sender, receiver) = std::sync::mpsc::channel();

        let operation = post(transport.clone());
        std::thread::spawn(move || {
            operation.start(move |result| {
                let _ = sender.send(result);
            });
        })
        .join()
        .unwrap();

        let result = receiver
            .recv_timeout(std::time::Duration::from_secs(5))
            .unwrap();
        assert_eq!(result.unwrap(), Payload::Content(json!({"n": 2})));
        assert_eq!(transport.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_execute_on_current_thread_runtime_with_timer() {
        let transport = FixedTransport::new(204, None, "");
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .unwrap();

        let result = runtime.block_on(post(transport.clone()).execute()).unwrap();
        assert!(result.is_no_content());
        assert_eq!(transport.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_hooks_fire_for_error_statuses() {
        let transport = FixedTransport::new(500, Some("text/plain"), "boom");
        let statuses = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let recorded = statuses.clone();

        let err = post(transport)
            .on_response(move |response| recorded.lock().push(response.status))
            .execute()
            .await
            .unwrap_err();

        assert_eq!(err.status_code(), Some(500));
        assert_eq!(*statuses.lock(), vec![500]);
    }

    #[test]
    fn test_payload_helpers() {
        assert!(Payload::<u8>::NoContent.is_no_content());
        assert_eq!(Payload::Content(2).map(|n| n * 2), Payload::Content(4));
        assert!(matches!(
            Payload::<u8>::NoContent.require_content(),
            Err(NetworkError::Decode(DecodeError::SchemaMismatch { .. }))
        ));
    }
}
