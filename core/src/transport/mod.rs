//! Transport capability consumed by the request executor.
//!
//! # Design
//! The toolkit never talks to the network itself. A `Transport` opens a
//! `Connection`; the connection executes one `HttpRequest` at a time and is
//! reused for the whole lifetime of a client. Implementations decide what a
//! connection actually holds (an agent, a socket, a scripted queue in tests).

#[cfg(feature = "ureq")]
mod ureq_backend;

#[cfg(feature = "ureq")]
pub use ureq_backend::UreqTransport;

use crate::error::ApiError;
use crate::http::{HttpRequest, HttpResponse, TransportFailure};

/// Unknown or unclassified failure.
pub const ERR_OTHER: i32 = 0;
/// Host name could not be resolved.
pub const ERR_HOST_NOT_FOUND: i32 = 6;
/// Connection could not be established or broke mid-exchange.
pub const ERR_CONNECT: i32 = 7;
/// The exchange exceeded its time limit.
pub const ERR_TIMEOUT: i32 = 28;

/// Factory for reusable connections.
pub trait Transport {
    /// Open a new connection. Fails with `ApiError::TransportUnavailable`
    /// when the capability is missing.
    fn open(&self) -> Result<Box<dyn Connection>, ApiError>;
}

/// A reusable connection handle.
pub trait Connection {
    /// Execute one request to completion.
    fn execute(&mut self, request: &HttpRequest) -> Result<HttpResponse, TransportFailure>;

    /// Drop per-call state kept by the connection. The connection itself
    /// stays usable.
    fn reset(&mut self) {}

    /// Release the underlying resources. Called once, when the owning
    /// executor is closed.
    fn close(&mut self) {}
}

/// A transport that never yields a connection.
///
/// Stands in when the crate is built without a network backend.
#[derive(Debug, Default, Clone, Copy)]
pub struct Unavailable;

impl Transport for Unavailable {
    fn open(&self) -> Result<Box<dyn Connection>, ApiError> {
        Err(ApiError::TransportUnavailable(
            "no HTTP transport backend was compiled in".to_string(),
        ))
    }
}

/// The transport used by `Client::with_default_transport`.
#[cfg(feature = "ureq")]
pub fn default_transport() -> Result<Box<dyn Transport>, ApiError> {
    Ok(Box::new(UreqTransport::new()))
}

/// The transport used by `Client::with_default_transport`.
#[cfg(not(feature = "ureq"))]
pub fn default_transport() -> Result<Box<dyn Transport>, ApiError> {
    Err(ApiError::TransportUnavailable(
        "no HTTP transport backend was compiled in".to_string(),
    ))
}
