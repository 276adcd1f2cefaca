//! Invocation client for a single named remote function.
//!
//! An [`InvokeClient`] is bound to one [`InvocationTarget`] and reused
//! for the lifetime of the process. Construction has no side effects;
//! the underlying connection pool is built lazily on the first
//! invocation and cached. For process-wide sharing keyed by target, use
//! [`crate::registry::shared_client`].
//!
//! Two invocation modes are supported, mirroring the backend's
//! function-invocation API:
//!
//! - [`InvokeClient::invoke_sync`] blocks the calling task for the full
//!   request/response round trip and always yields a structurally valid
//!   [`ResponseEnvelope`] — transport and serialization faults are
//!   folded into the synthetic failure envelope, never thrown.
//! - [`InvokeClient::invoke_async`] fires and forgets, returning the
//!   transport-assigned correlation id, or `None` on failure.
//!
//! Callers who want a typed error instead of the catch-all envelope use
//! [`InvokeClient::try_invoke_sync`].
//!
//! # Example
//!
//! ```rust,no_run
//! use quipu_invoke::{InvokeClient, RequestEnvelope};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = InvokeClient::new("sigma-inference")?;
//! let request = RequestEnvelope::query("PBI de Ica en el 2022", "s1");
//!
//! let response = client.invoke_sync(&request).await;
//! if response.is_error() {
//!     // UI substitutes its friendly fallback message here.
//! } else {
//!     let answer = response.body_json()?["answer"].clone();
//! }
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use parking_lot::Mutex;
use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::InvokeConfig;
use crate::envelope::{InvocationMetadata, RequestEnvelope, ResponseEnvelope, WireResponse};
use crate::error::{Error, Result};
use crate::retry::with_retry;

/// Region used when the caller does not specify one.
pub const DEFAULT_REGION: &str = "us-east-1";

/// Invocation API version segment of the request path.
const INVOCATION_API_VERSION: &str = "2015-03-31";

/// Header selecting request/response vs fire-and-forget execution.
const HEADER_INVOCATION_TYPE: &str = "x-amz-invocation-type";
/// Response header carrying the transport-assigned correlation id.
const HEADER_REQUEST_ID: &str = "x-amzn-requestid";
/// Response header carrying the executed target version, when reported.
const HEADER_EXECUTED_VERSION: &str = "x-amz-executed-version";

const INVOCATION_TYPE_SYNC: &str = "RequestResponse";
const INVOCATION_TYPE_EVENT: &str = "Event";

/// The named remote function a client is bound to.
///
/// Immutable after construction; owned by exactly one [`InvokeClient`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InvocationTarget {
    function_name: String,
    region: String,
}

impl InvocationTarget {
    /// Bind to `function_name` in `region`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] when the function name is empty.
    pub fn new(function_name: impl Into<String>, region: impl Into<String>) -> Result<Self> {
        let function_name = function_name.into();
        if function_name.trim().is_empty() {
            return Err(Error::invalid_input("function name must not be empty"));
        }
        Ok(Self {
            function_name,
            region: region.into(),
        })
    }

    /// The target function name.
    #[must_use]
    pub fn function_name(&self) -> &str {
        &self.function_name
    }

    /// The target region.
    #[must_use]
    pub fn region(&self) -> &str {
        &self.region
    }

    /// Regional endpoint the target resolves to by default.
    #[must_use]
    pub fn default_endpoint_url(&self) -> String {
        format!("https://lambda.{}.amazonaws.com", self.region)
    }
}

/// Lazily constructed transport pool.
enum Transport {
    Uninitialized,
    Ready(reqwest::Client),
}

/// Client for one remote function endpoint.
///
/// Cheap to share behind an `Arc`; the transport pool inside is
/// internally synchronized, so concurrent invocations need no external
/// locking.
pub struct InvokeClient {
    target: InvocationTarget,
    config: InvokeConfig,
    endpoint_url: String,
    transport: Mutex<Transport>,
}

impl std::fmt::Debug for InvokeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InvokeClient")
            .field("target", &self.target)
            .field("config", &self.config)
            .field("endpoint_url", &self.endpoint_url)
            .finish_non_exhaustive()
    }
}

impl InvokeClient {
    /// Client for `function_name` in the default region.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] when the function name is empty.
    pub fn new(function_name: impl Into<String>) -> Result<Self> {
        Self::with_region(function_name, DEFAULT_REGION)
    }

    /// Client for `function_name` in an explicit region.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] when the function name is empty.
    pub fn with_region(
        function_name: impl Into<String>,
        region: impl Into<String>,
    ) -> Result<Self> {
        let target = InvocationTarget::new(function_name, region)?;
        let endpoint_url = target.default_endpoint_url();
        Ok(Self {
            target,
            config: InvokeConfig::new(),
            endpoint_url,
            transport: Mutex::new(Transport::Uninitialized),
        })
    }

    /// Replace the configuration. Takes effect on the next transport
    /// build, so call before the first invocation.
    #[must_use]
    pub fn with_config(mut self, config: InvokeConfig) -> Self {
        self.config = config;
        self
    }

    /// Override the endpoint URL (used by tests to point at a stub
    /// server).
    #[must_use]
    pub fn with_endpoint_url(mut self, endpoint_url: impl Into<String>) -> Self {
        self.endpoint_url = endpoint_url.into();
        self
    }

    /// The target this client is bound to.
    #[must_use]
    pub fn target(&self) -> &InvocationTarget {
        &self.target
    }

    /// The active configuration.
    #[must_use]
    pub fn config(&self) -> &InvokeConfig {
        &self.config
    }

    fn invocation_url(&self) -> String {
        format!(
            "{}/{}/functions/{}/invocations",
            self.endpoint_url.trim_end_matches('/'),
            INVOCATION_API_VERSION,
            self.target.function_name
        )
    }

    /// Get the pooled transport, building it on first use.
    ///
    /// The two-state transition is guarded by the lock; concurrent first
    /// calls build the pool exactly once.
    fn transport(&self) -> Result<reqwest::Client> {
        let mut slot = self.transport.lock();
        match &*slot {
            Transport::Ready(client) => Ok(client.clone()),
            Transport::Uninitialized => {
                let client = reqwest::Client::builder()
                    .pool_max_idle_per_host(self.config.max_pool_connections)
                    .connect_timeout(self.config.connect_timeout)
                    .timeout(self.config.read_timeout)
                    .build()
                    .map_err(|e| Error::config(format!("failed to build transport: {e}")))?;
                debug!(
                    function = %self.target.function_name,
                    region = %self.target.region,
                    "transport pool initialized"
                );
                *slot = Transport::Ready(client.clone());
                Ok(client)
            }
        }
    }

    /// Synchronous invocation with a typed error channel.
    ///
    /// Transient transport failures are retried per the configured
    /// policy; serialization failures and target contract violations
    /// surface immediately.
    ///
    /// # Errors
    ///
    /// Any transport, serialization, or contract error after the retry
    /// budget is exhausted.
    pub async fn try_invoke_sync(&self, request: &RequestEnvelope) -> Result<ResponseEnvelope> {
        let payload = request.to_payload()?;
        let client = self.transport()?;
        let url = self.invocation_url();
        let policy = self.config.retry_policy();

        debug!(function = %self.target.function_name, "synchronous invocation");

        let response = with_retry(&policy, || {
            let client = client.clone();
            let payload = payload.clone();
            let url = url.clone();
            async move {
                let resp = client
                    .post(&url)
                    .header(CONTENT_TYPE, "application/json")
                    .header(HEADER_INVOCATION_TYPE, INVOCATION_TYPE_SYNC)
                    .body(payload)
                    .send()
                    .await
                    .map_err(Error::from)?;
                classify_status(resp)
            }
        })
        .await?;

        let transport_status = response.status().as_u16();
        let request_id = correlation_id(&response);
        let execution_version = header_string(&response, HEADER_EXECUTED_VERSION);

        let bytes = response.bytes().await.map_err(Error::from)?;
        let wire: WireResponse = serde_json::from_slice(&bytes)
            .map_err(|e| Error::api_format(format!("unexpected invocation payload: {e}")))?;

        Ok(ResponseEnvelope {
            status_code: wire.status_code,
            body: wire.body,
            metadata: InvocationMetadata {
                status_code: Some(transport_status),
                execution_version,
                request_id: Some(request_id),
                error: false,
            },
        })
    }

    /// Synchronous invocation with the never-throw envelope boundary.
    ///
    /// Always returns a structurally valid envelope: on any internal
    /// failure this is the synthetic envelope with `status_code == 500`
    /// and `metadata.error == true`.
    pub async fn invoke_sync(&self, request: &RequestEnvelope) -> ResponseEnvelope {
        match self.try_invoke_sync(request).await {
            Ok(envelope) => envelope,
            Err(err) => {
                warn!(
                    function = %self.target.function_name,
                    error = %err,
                    "synchronous invocation failed"
                );
                ResponseEnvelope::failure(&err.to_string())
            }
        }
    }

    /// Synchronous invocation bounded by an explicit deadline covering
    /// the whole call, retries included.
    ///
    /// Expiry is reported as the synthetic failure envelope, like every
    /// other failure on this path.
    pub async fn invoke_sync_within(
        &self,
        request: &RequestEnvelope,
        deadline: Duration,
    ) -> ResponseEnvelope {
        match tokio::time::timeout(deadline, self.try_invoke_sync(request)).await {
            Ok(Ok(envelope)) => envelope,
            Ok(Err(err)) => {
                warn!(
                    function = %self.target.function_name,
                    error = %err,
                    "synchronous invocation failed"
                );
                ResponseEnvelope::failure(&err.to_string())
            }
            Err(_) => {
                warn!(
                    function = %self.target.function_name,
                    deadline_ms = deadline.as_millis() as u64,
                    "synchronous invocation abandoned at deadline"
                );
                ResponseEnvelope::failure(&format!(
                    "invocation abandoned after {}ms deadline",
                    deadline.as_millis()
                ))
            }
        }
    }

    /// Fire-and-forget invocation.
    ///
    /// Returns as soon as the transport acknowledges receipt, yielding
    /// the correlation id. Failures are logged and reported as `None`;
    /// a successful empty-string id never occurs. The fire-and-forget
    /// path makes a single attempt so the caller is never held up by
    /// backoff.
    pub async fn invoke_async(&self, request: &RequestEnvelope) -> Option<String> {
        let payload = match request.to_payload() {
            Ok(payload) => payload,
            Err(err) => {
                warn!(
                    function = %self.target.function_name,
                    error = %err,
                    "fire-and-forget payload serialization failed"
                );
                return None;
            }
        };
        let client = match self.transport() {
            Ok(client) => client,
            Err(err) => {
                warn!(
                    function = %self.target.function_name,
                    error = %err,
                    "transport initialization failed"
                );
                return None;
            }
        };

        debug!(function = %self.target.function_name, "fire-and-forget invocation");

        let result = client
            .post(self.invocation_url())
            .header(CONTENT_TYPE, "application/json")
            .header(HEADER_INVOCATION_TYPE, INVOCATION_TYPE_EVENT)
            .body(payload)
            .send()
            .await;

        match result {
            Ok(response) if response.status().is_success() => Some(correlation_id(&response)),
            Ok(response) => {
                warn!(
                    function = %self.target.function_name,
                    status = response.status().as_u16(),
                    "fire-and-forget invocation rejected"
                );
                None
            }
            Err(err) => {
                warn!(
                    function = %self.target.function_name,
                    error = %Error::from(err),
                    "fire-and-forget invocation failed"
                );
                None
            }
        }
    }

    #[cfg(test)]
    fn transport_ready(&self) -> bool {
        matches!(&*self.transport.lock(), Transport::Ready(_))
    }
}

/// Map non-success transport statuses to the retryable/terminal split.
fn classify_status(resp: reqwest::Response) -> Result<reqwest::Response> {
    let status = resp.status();
    if status == StatusCode::TOO_MANY_REQUESTS {
        Err(Error::throttled(format!("invocation API returned {status}")))
    } else if status.is_server_error() {
        Err(Error::http(format!("invocation API returned {status}")))
    } else if !status.is_success() {
        // Remaining 4xx mean the target name or request is wrong; a
        // retry cannot fix that.
        Err(Error::config(format!("invocation API rejected call: {status}")))
    } else {
        Ok(resp)
    }
}

/// Correlation id from the transport, or a locally generated stand-in
/// when the header is absent or blank so the id is never empty.
fn correlation_id(response: &reqwest::Response) -> String {
    header_string(response, HEADER_REQUEST_ID)
        .unwrap_or_else(|| format!("local-{}", Uuid::new_v4()))
}

/// Header value as an owned string; blank values count as absent.
fn header_string(response: &reqwest::Response, name: &str) -> Option<String> {
    response
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
