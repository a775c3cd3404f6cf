//! Error types for the API client toolkit.
//!
//! # Design
//! Every failure surfaces to the caller as an `ApiError`. Model lookup and
//! field access errors carry the names involved so callers can report which
//! model rejected which key. Transport failures keep the provider's error
//! code (curl-style numbering) next to its description.
//!
//! The one deliberate leniency lives outside this enum: a response body that
//! is not valid JSON parses to `Value::Null` instead of producing an error.

use std::path::PathBuf;

use thiserror::Error;

/// Errors returned by the client, its models and the request pipeline.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ApiError {
    /// No model is registered under the requested top-level name.
    #[error("model not exists: {0}")]
    ModelNotFound(String),

    /// The field is not declared on the model.
    #[error("parameter not exists in {model}: {field}")]
    FieldNotFound { model: String, field: String },

    /// A method-style call did not match any `get`/`set`/`new`/`create` form.
    #[error("method `{method}` is not available in {model}")]
    MethodNotAvailable { model: String, method: String },

    /// The request could not be assembled (empty endpoint or domain,
    /// parameters that are not an object, ...).
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The transport reported a failure before any response was received.
    #[error("network error {code}: {description}")]
    Network { description: String, code: i32 },

    /// No transport capability is available to open a connection.
    #[error("transport unavailable: {0}")]
    TransportUnavailable(String),

    /// The model outlived the client that created it.
    #[error("model is detached from its client")]
    Detached,

    /// The upload file is missing or unreadable.
    #[error("file {path}: {source}")]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An `If-Modified-Since` date string could not be parsed.
    #[error("invalid date: {0}")]
    InvalidDate(String),

    /// Request parameters could not be encoded.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// A configuration document could not be read.
    #[error("invalid client config: {0}")]
    Config(String),
}

impl ApiError {
    /// Provider error code for network failures, `None` otherwise.
    pub fn network_code(&self) -> Option<i32> {
        match self {
            ApiError::Network { code, .. } => Some(*code),
            _ => None,
        }
    }
}
