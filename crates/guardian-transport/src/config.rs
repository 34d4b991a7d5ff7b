//! Network configuration
//!
//! A [`NetworkConfig`] is passed explicitly to every operation. The process-wide
//! [`NetworkConfig::shared`] default is built once on first use and never changes
//! afterwards.
//!
//! Callback-style operations started outside any tokio runtime run on a small
//! background runtime owned by this crate, built on first use.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use once_cell::sync::OnceCell;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use tokio::runtime::{Builder, Handle, Runtime};

use crate::error::{NetworkError, NetworkResult};
use crate::telemetry::Telemetry;
use crate::transport::{HttpTransport, ReqwestTransport};

/// Default request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const MIN_TIMEOUT: Duration = Duration::from_millis(100);
const MAX_TIMEOUT: Duration = Duration::from_secs(300);

const FALLBACK_WORKERS: usize = 2;

static SHARED: OnceCell<NetworkConfig> = OnceCell::new();
static FALLBACK_RUNTIME: OnceCell<Runtime> = OnceCell::new();

/// Settings shared by every operation built from it
#[derive(Clone)]
pub struct NetworkConfig {
    timeout: Duration,
    telemetry: Option<Telemetry>,
    default_headers: HeaderMap,
    transport: Arc<dyn HttpTransport>,
    runtime: Option<Handle>,
}

impl NetworkConfig {
    /// Start building a configuration
    pub fn builder() -> NetworkConfigBuilder {
        NetworkConfigBuilder::new()
    }

    /// Process-wide default configuration
    ///
    /// Built on first call with [`NetworkConfigBuilder`] defaults.
    pub fn shared() -> NetworkResult<&'static Self> {
        SHARED.get_or_try_init(|| NetworkConfigBuilder::new().build())
    }

    /// Request timeout
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Telemetry sent with each request, if enabled
    pub fn telemetry(&self) -> Option<&Telemetry> {
        self.telemetry.as_ref()
    }

    /// Headers added to every request before caller headers
    pub fn default_headers(&self) -> &HeaderMap {
        &self.default_headers
    }

    /// Transport performing the exchanges
    pub fn transport(&self) -> &Arc<dyn HttpTransport> {
        &self.transport
    }

    /// Runtime that callback-style operations are spawned on
    ///
    /// Without a configured handle this is the runtime of the calling thread, or
    /// the crate's background runtime when the caller is not inside one.
    pub fn runtime(&self) -> NetworkResult<Handle> {
        if let Some(handle) = &self.runtime {
            return Ok(handle.clone());
        }
        if let Ok(handle) = Handle::try_current() {
            return Ok(handle);
        }
        fallback_runtime().map(|runtime| runtime.handle().clone())
    }
}

impl fmt::Debug for NetworkConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NetworkConfig")
            .field("timeout", &self.timeout)
            .field("telemetry", &self.telemetry)
            .field("default_headers", &self.default_headers.len())
            .field("transport", &self.transport)
            .field("runtime", &self.runtime.is_some())
            .finish()
    }
}

/// Builder for [`NetworkConfig`]
#[derive(Debug)]
pub struct NetworkConfigBuilder {
    timeout: Duration,
    telemetry: Option<Telemetry>,
    default_headers: Vec<(String, String)>,
    transport: Option<Arc<dyn HttpTransport>>,
    runtime: Option<Handle>,
}

impl NetworkConfigBuilder {
    /// Create a builder with default settings and telemetry enabled
    #[must_use]
    pub fn new() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            telemetry: Some(Telemetry::default()),
            default_headers: Vec::new(),
            transport: None,
            runtime: None,
        }
    }

    /// Set request timeout
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Report a custom client name and version
    #[must_use]
    pub fn telemetry(mut self, telemetry: Telemetry) -> Self {
        self.telemetry = Some(telemetry);
        self
    }

    /// Do not send the telemetry header
    #[must_use]
    pub fn disable_telemetry(mut self) -> Self {
        self.telemetry = None;
        self
    }

    /// Add a header sent with every request
    pub fn default_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.push((name.into(), value.into()));
        self
    }

    /// Use a custom transport instead of the `reqwest` client
    pub fn transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Spawn callback-style operations on this runtime
    pub fn runtime(mut self, handle: Handle) -> Self {
        self.runtime = Some(handle);
        self
    }

    /// Build the configuration
    pub fn build(self) -> NetworkResult<NetworkConfig> {
        if self.timeout < MIN_TIMEOUT {
            return Err(configuration("Timeout must be at least 100ms"));
        }
        if self.timeout > MAX_TIMEOUT {
            return Err(configuration("Timeout must not exceed 300s"));
        }

        let mut default_headers = HeaderMap::new();
        for (name, value) in self.default_headers {
            let header_name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| configuration(&format!("Invalid header name: {name}")))?;
            let header_value = HeaderValue::from_str(&value)
                .map_err(|_| configuration(&format!("Invalid value for header {name}")))?;
            default_headers.insert(header_name, header_value);
        }

        let transport = match self.transport {
            Some(transport) => transport,
            None => Arc::new(ReqwestTransport::new(self.timeout)?),
        };

        Ok(NetworkConfig {
            timeout: self.timeout,
            telemetry: self.telemetry,
            default_headers,
            transport,
            runtime: self.runtime,
        })
    }
}

impl Default for NetworkConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn fallback_runtime() -> NetworkResult<&'static Runtime> {
    FALLBACK_RUNTIME.get_or_try_init(|| {
        tracing::debug!(workers = FALLBACK_WORKERS, "Starting background network runtime");
        Builder::new_multi_thread()
            .worker_threads(FALLBACK_WORKERS)
            .thread_name("guardian-network")
            .enable_all()
            .build()
            .map_err(|e| NetworkError::Configuration {
                reason: format!("Failed to start background runtime: {e}"),
            })
    })
}

fn configuration(reason: &str) -> NetworkError {
    NetworkError::Configuration {
        reason: reason.to_string(),
    }
}
