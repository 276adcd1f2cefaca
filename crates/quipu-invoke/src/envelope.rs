//! Request and response envelopes.
//!
//! Every synchronous invocation resolves to a [`ResponseEnvelope`] with
//! the same top-level shape (`status_code`, `body`, `metadata`) whether
//! the call succeeded or failed. Callers branch on
//! [`ResponseEnvelope::is_error`] (or `metadata.error`), never on the
//! envelope's presence.
//!
//! The request side is a thin immutable wrapper over the
//! `{"body": {<params>}}` payload the backend expects. Text passes
//! through as UTF-8 without ASCII escaping, so Spanish accents and emoji
//! arrive at the target exactly as typed.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// Synthetic status code used for the failure envelope.
pub const FAILURE_STATUS_CODE: u16 = 500;

/// Request payload for one invocation: `{"body": {<params>}}`.
///
/// Immutable once built. Use the convenience constructors for the two
/// payload shapes the chatbot frontend sends, or [`RequestEnvelope::new`]
/// plus [`RequestEnvelope::with_field`] for anything else.
///
/// # Example
///
/// ```rust
/// use quipu_invoke::RequestEnvelope;
///
/// let req = RequestEnvelope::query("PBI de Ica en el 2022", "s1");
/// let feedback = RequestEnvelope::feedback("Muy útil, gracias", "s1");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestEnvelope {
    body: Map<String, Value>,
}

impl RequestEnvelope {
    /// Create an empty envelope.
    #[must_use]
    pub fn new() -> Self {
        Self { body: Map::new() }
    }

    /// Envelope for an inference query:
    /// `{"body": {"query": .., "session_id": ..}}`.
    #[must_use]
    pub fn query(query: impl Into<String>, session_id: impl Into<String>) -> Self {
        Self::new()
            .with_field("query", query.into())
            .with_field("session_id", session_id.into())
    }

    /// Envelope for a feedback submission:
    /// `{"body": {"feedback": .., "session_id": ..}}`.
    #[must_use]
    pub fn feedback(feedback: impl Into<String>, session_id: impl Into<String>) -> Self {
        Self::new()
            .with_field("feedback", feedback.into())
            .with_field("session_id", session_id.into())
    }

    /// Add an arbitrary parameter to the nested body.
    #[must_use]
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.body.insert(key.into(), value.into());
        self
    }

    /// Access the nested parameter mapping.
    #[must_use]
    pub fn body(&self) -> &Map<String, Value> {
        &self.body
    }

    /// Serialize to the UTF-8 byte payload sent over the wire.
    pub fn to_payload(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(Error::from)
    }
}

impl Default for RequestEnvelope {
    fn default() -> Self {
        Self::new()
    }
}

/// Invocation metadata attached by the client, not the remote target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct InvocationMetadata {
    /// Transport-level status code of the invocation call.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    /// Version of the target that executed, when reported.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution_version: Option<String>,
    /// Transport-assigned request correlation id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    /// Set on the synthetic failure envelope.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub error: bool,
}

/// Uniform result of a synchronous invocation.
///
/// The three fields are always present; on failure the envelope is
/// synthesized with [`FAILURE_STATUS_CODE`], an `{"error": ..}` body and
/// `metadata.error == true`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    /// Status code reported by the remote target (distinct from the
    /// transport status in `metadata`).
    pub status_code: u16,
    /// Opaque response body. Inference responses carry nested JSON with
    /// an `answer` field; parse it with [`ResponseEnvelope::body_json`].
    pub body: String,
    /// Invocation metadata attached by the client.
    pub metadata: InvocationMetadata,
}

impl ResponseEnvelope {
    /// Build the synthetic failure envelope for an internal error.
    #[must_use]
    pub fn failure(message: &str) -> Self {
        let body = serde_json::json!({ "error": message }).to_string();
        Self {
            status_code: FAILURE_STATUS_CODE,
            body,
            metadata: InvocationMetadata {
                error: true,
                ..InvocationMetadata::default()
            },
        }
    }

    /// Whether this is the synthetic failure envelope.
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.metadata.error
    }

    /// Parse the opaque body as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Serialization`] when the body is not valid JSON.
    pub fn body_json(&self) -> Result<Value> {
        serde_json::from_str(&self.body).map_err(Error::from)
    }
}

/// Wire shape of a synchronous response payload from the target.
#[derive(Debug, Deserialize)]
pub(crate) struct WireResponse {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    #[serde(default)]
    pub body: String,
}
