//! Resilient function-invocation client for the Sigma statistical
//! chatbot backend.
//!
//! The chatbot frontend forwards each user question (and each feedback
//! submission) to a remote inference function. This crate is the one
//! component between the two: it shapes the request payload, performs
//! the network call with pooling, timeouts and adaptive retry, and
//! normalizes every outcome into a uniform response envelope the UI can
//! render without ever handling a raw error.
//!
//! # Contract
//!
//! - [`InvokeClient::invoke_sync`] never fails: transport faults,
//!   serialization faults and contract violations all come back as the
//!   synthetic failure envelope (`status_code == 500`,
//!   `metadata.error == true`). Callers branch on envelope fields, not
//!   on presence.
//! - [`InvokeClient::invoke_async`] fires and forgets, yielding the
//!   transport correlation id or `None`.
//! - [`registry::shared_client`] keeps one client (and one connection
//!   pool) per `(function name, region)` for the whole process.
//!
//! # Example
//!
//! ```rust,no_run
//! use quipu_invoke::{registry::shared_client, RequestEnvelope};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = shared_client("sigma-inference", "us-east-1")?;
//!
//! let response = client
//!     .invoke_sync(&RequestEnvelope::query("PBI de Ica en el 2022", "s1"))
//!     .await;
//!
//! if response.is_error() {
//!     // Show the friendly fallback message.
//! } else {
//!     let answer = response.body_json()?["answer"].clone();
//! }
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod envelope;
pub mod error;
pub mod registry;
pub mod retry;

pub use client::{InvocationTarget, InvokeClient, DEFAULT_REGION};
pub use config::InvokeConfig;
pub use envelope::{InvocationMetadata, RequestEnvelope, ResponseEnvelope, FAILURE_STATUS_CODE};
pub use error::{Error, Result};
pub use retry::{RetryMode, RetryPolicy};
