//! HTTP exchange types for the host-does-IO pattern.
//!
//! # Design
//! The request pipeline turns a model's configuration and the shared
//! parameter bag into an `HttpRequest` value. A `Connection` executes it and
//! hands back an `HttpResponse` or a `TransportFailure`. Keeping the exchange
//! as plain data lets tests script the transport and inspect exactly what
//! would have gone over the wire.

use std::fmt;
use std::path::PathBuf;

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payload of a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestBody {
    /// JSON-encoded POST parameters.
    Json(String),
    /// URL-encoded POST parameters.
    Form(String),
    /// Raw upload of a file from disk.
    File(FileUpload),
}

/// A file streamed as the request body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileUpload {
    pub path: PathBuf,
    pub size: u64,
}

/// An HTTP request described as plain data, including the per-call
/// transport options (proxy, TLS verification, cookie jar, basic auth).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<RequestBody>,
    pub proxy: Option<String>,
    pub verify_tls: bool,
    pub cookie_jar: Option<PathBuf>,
    pub basic_auth: Option<(String, String)>,
}

impl HttpRequest {
    /// Value of the first header named `name` (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// An HTTP response described as plain data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

/// A failure reported by the transport before a response was received.
///
/// `code` follows curl's error numbering so callers can match on familiar
/// values (`28` for a timeout, `6` for an unresolved host, ...).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportFailure {
    pub description: String,
    pub code: i32,
}

impl TransportFailure {
    pub fn new(description: impl Into<String>, code: i32) -> Self {
        Self {
            description: description.into(),
            code,
        }
    }
}
