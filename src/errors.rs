//! Status-carrying transport errors.
//!
//! Every failure that reaches the HTTP layer is folded into [`Error`], which
//! carries the HTTP status `code`, a machine-readable `reason`, a human
//! `message` and free-form `metadata`. The default error encoder serializes
//! this struct with the codec negotiated from the request's `Accept` header.

use std::collections::BTreeMap;

use http::StatusCode;
use serde::{Deserialize, Serialize};

use crate::binding::BindingError;
use crate::encoding::CodecError;

/// Result alias used throughout the HTTP layer.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// An error with an HTTP status code attached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("error: code = {code} reason = {reason} message = {message}")]
pub struct Error {
    /// HTTP status code written by the error encoder
    pub code: u16,
    /// Machine-readable reason, e.g. `CODEC`
    #[serde(default)]
    pub reason: String,
    /// Human-readable message
    #[serde(default)]
    pub message: String,
    /// Additional key/value context
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
}

impl Error {
    pub fn new(code: u16, reason: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code,
            reason: reason.into(),
            message: message.into(),
            metadata: BTreeMap::new(),
        }
    }

    pub fn bad_request(reason: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(400, reason, message)
    }

    pub fn unauthorized(reason: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(401, reason, message)
    }

    pub fn forbidden(reason: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(403, reason, message)
    }

    pub fn not_found(reason: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(404, reason, message)
    }

    pub fn internal(reason: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(500, reason, message)
    }

    pub fn service_unavailable(reason: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(503, reason, message)
    }

    pub fn gateway_timeout(reason: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(504, reason, message)
    }

    /// Attach a metadata entry, returning the error for chaining.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// HTTP status for this error; invalid codes collapse to 500.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        StatusCode::from_u16(self.code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

impl From<CodecError> for Error {
    fn from(err: CodecError) -> Self {
        match err {
            CodecError::Decode(msg) => Error::bad_request("CODEC", msg),
            other => Error::internal("CODEC", other.to_string()),
        }
    }
}

impl From<BindingError> for Error {
    fn from(err: BindingError) -> Self {
        Error::bad_request("BINDING", err.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::internal("IO", err.to_string())
    }
}
