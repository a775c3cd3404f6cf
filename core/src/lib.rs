//! Synchronous client core for JSON/HTTP APIs built around named models.
//!
//! # Overview
//! A `Client` hands out models by name (`client.model("user")`). Each model
//! knows its endpoint, declares its fields and can issue GET/POST/PUT calls
//! relative to that endpoint. Sub-models are reached through field access
//! and prefix their parent's endpoint unless marked individual.
//!
//! # Design
//! - Request assembly is pure: `request::build_request` turns a context, a
//!   call and the parameter bag into an `HttpRequest` value. Only a
//!   `transport::Connection` touches the network.
//! - One `ParameterBag` and one `RequestExecutor` are shared by a client and
//!   all of its models. Per-call state is cleared after every request and
//!   whenever a model is resolved.
//! - Model types are looked up in a `ModelRegistry` populated at startup.

pub mod case;
pub mod client;
pub mod config;
pub mod context;
pub mod error;
pub mod executor;
pub mod http;
pub mod logging;
pub mod model;
pub mod params;
pub mod query;
pub mod registry;
pub mod request;
pub mod transport;

mod resolver;

pub use client::Client;
pub use config::ClientConfig;
pub use context::RequestContext;
pub use error::ApiError;
pub use http::{HttpMethod, HttpRequest, HttpResponse, RequestBody, TransportFailure};
pub use model::{FieldValue, Model};
pub use params::ParameterBag;
pub use registry::{ModelDefinition, ModelRegistry};
pub use request::{Call, IfModifiedSince, Payload};
pub use transport::{Connection, Transport};
