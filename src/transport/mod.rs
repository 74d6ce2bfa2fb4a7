//! Transport adapter for the verification service
//!
//! The ceremony client only needs one operation from the network: POST a
//! JSON body to a path, optionally tagging the request with the device
//! fingerprint header, and get back the status and JSON body. The
//! [`Transport`] trait captures that so ceremonies can run against the real
//! [`HttpTransport`] or an in-memory double.

mod http;

pub use http::HttpTransport;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::fingerprint::DeviceFingerprint;

/// Errors raised before a response could be read
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// The configured base URL cannot be joined with an endpoint path
    #[error("invalid endpoint url {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    /// The request could not be built or sent
    #[error("request to {path} failed: {reason}")]
    Request { path: String, reason: String },

    /// The response body could not be read
    #[error("could not read response from {path}: {reason}")]
    Body { path: String, reason: String },
}

/// A response from the verification service
#[derive(Debug, Clone, PartialEq)]
pub struct TransportResponse {
    pub status: u16,
    /// Parsed JSON body; `Value::Null` when empty, `Value::String` for non-JSON text
    pub body: Value,
}

impl TransportResponse {
    /// Create a response from a status and body
    #[must_use]
    pub fn new(status: u16, body: Value) -> Self {
        Self { status, body }
    }

    /// Whether the status is in the 2xx range
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Best human-readable message carried by the body
    ///
    /// Looks for `error`, `message` and `detail` string fields in that order,
    /// then a plain-text body.
    #[must_use]
    pub fn error_message(&self) -> Option<String> {
        match &self.body {
            Value::Object(map) => ["error", "message", "detail"]
                .iter()
                .filter_map(|key| map.get(*key).and_then(Value::as_str))
                .map(str::trim)
                .find(|msg| !msg.is_empty())
                .map(ToString::to_string),
            Value::String(text) if !text.trim().is_empty() => Some(text.trim().to_string()),
            _ => None,
        }
    }

    /// Parse a raw response body
    ///
    /// Empty bodies become `Null`; bodies that are not JSON are kept as text.
    #[must_use]
    pub fn parse_body(raw: &str) -> Value {
        if raw.trim().is_empty() {
            return Value::Null;
        }
        serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
    }
}

/// Network access used by the ceremony client
#[async_trait]
pub trait Transport: Send + Sync {
    /// POST `body` as JSON to `path`
    ///
    /// When `device` is given, its token is sent in the fingerprint header.
    /// Credentials (cookies) are included on every call.
    ///
    /// # Errors
    ///
    /// Returns an error if the request cannot be sent or its body cannot be
    /// read. Non-2xx statuses are not errors at this layer.
    async fn post_json(
        &self,
        path: &str,
        body: &Value,
        device: Option<&DeviceFingerprint>,
    ) -> Result<TransportResponse, TransportError>;
}
