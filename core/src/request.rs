//! Request assembly and response parsing.
//!
//! # Design
//! A call is described by a `Call` value. `build_request` combines it with a
//! model's `RequestContext` and the shared `ParameterBag` into a plain
//! `HttpRequest`; `parse_payload` turns the response body back into a value.
//! Neither touches the network. `Model::execute` drives the two around the
//! executor.

use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::{Map, Value};

use crate::context::RequestContext;
use crate::error::ApiError;
use crate::http::{FileUpload, HttpMethod, HttpRequest, RequestBody};
use crate::params::ParameterBag;
use crate::query;

/// One verb invocation: what to send, before it is merged into the bag.
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub method: HttpMethod,
    pub url: String,
    pub params: Value,
    pub if_modified_since: Option<IfModifiedSince>,
    /// Overrides the context's debug flag for this call only.
    pub debug: Option<bool>,
}

impl Call {
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            params: Value::Null,
            if_modified_since: None,
            debug: None,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Post, url)
    }

    pub fn put(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Put, url)
    }

    pub fn params(mut self, params: Value) -> Self {
        self.params = params;
        self
    }

    pub fn if_modified_since(mut self, value: impl Into<IfModifiedSince>) -> Self {
        self.if_modified_since = Some(value.into());
        self
    }

    pub fn debug(mut self, flag: bool) -> Self {
        self.debug = Some(flag);
        self
    }

    /// The parameters as a map. `null` counts as no parameters; anything
    /// other than an object is rejected.
    pub fn param_map(&self) -> Result<Map<String, Value>, ApiError> {
        match &self.params {
            Value::Null => Ok(Map::new()),
            Value::Object(map) => Ok(map.clone()),
            other => Err(ApiError::Configuration(format!(
                "request parameters must be an object, got {other}"
            ))),
        }
    }
}

/// Value of the `If-Modified-Since` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IfModifiedSince {
    /// Sent verbatim.
    Timestamp(i64),
    /// Parsed, then reformatted as an HTTP date.
    Date(String),
    /// Formatted as an HTTP date.
    At(SystemTime),
}

impl From<i64> for IfModifiedSince {
    fn from(value: i64) -> Self {
        IfModifiedSince::Timestamp(value)
    }
}

impl From<&str> for IfModifiedSince {
    fn from(value: &str) -> Self {
        IfModifiedSince::Date(value.to_string())
    }
}

impl From<String> for IfModifiedSince {
    fn from(value: String) -> Self {
        IfModifiedSince::Date(value)
    }
}

impl From<SystemTime> for IfModifiedSince {
    fn from(value: SystemTime) -> Self {
        IfModifiedSince::At(value)
    }
}

impl IfModifiedSince {
    pub fn header_value(&self) -> Result<String, ApiError> {
        match self {
            IfModifiedSince::Timestamp(ts) => Ok(ts.to_string()),
            IfModifiedSince::Date(text) => format_http_date(parse_date(text)?, text),
            IfModifiedSince::At(time) => format_http_date(*time, "system time"),
        }
    }
}

/// Accepted forms: HTTP date, RFC 3339, `YYYY-MM-DD HH:MM:SS` and
/// `YYYY-MM-DD` (both read as UTC).
fn parse_date(text: &str) -> Result<SystemTime, ApiError> {
    let text = text.trim();
    if let Ok(time) = httpdate::parse_http_date(text) {
        return Ok(time);
    }
    if let Ok(time) = DateTime::parse_from_rfc3339(text) {
        return Ok(SystemTime::from(time));
    }
    if let Ok(time) = NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S") {
        return Ok(SystemTime::from(time.and_utc()));
    }
    if let Some(time) = NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
    {
        return Ok(SystemTime::from(time.and_utc()));
    }
    Err(ApiError::InvalidDate(text.to_string()))
}

fn format_http_date(time: SystemTime, source: &str) -> Result<String, ApiError> {
    if time < UNIX_EPOCH {
        return Err(ApiError::InvalidDate(source.to_string()));
    }
    Ok(httpdate::fmt_http_date(time))
}

/// Result of a call.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Decoded JSON body. Bodies that are not valid JSON decode to `Null`.
    Json(Value),
    /// Body returned untouched because response parsing is off.
    Raw(String),
}

impl Payload {
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Payload::Json(value) => Some(value),
            Payload::Raw(_) => None,
        }
    }

    pub fn into_json(self) -> Option<Value> {
        match self {
            Payload::Json(value) => Some(value),
            Payload::Raw(_) => None,
        }
    }

    pub fn as_raw(&self) -> Option<&str> {
        match self {
            Payload::Raw(body) => Some(body),
            Payload::Json(_) => None,
        }
    }
}

/// Header list: keep-alive, JSON content type (when enabled),
/// `If-Modified-Since`, then the context's extra headers.
pub fn prepare_headers(
    context: &RequestContext,
    json: bool,
    if_modified_since: Option<&IfModifiedSince>,
) -> Result<Vec<(String, String)>, ApiError> {
    let mut headers = vec![("Connection".to_string(), "keep-alive".to_string())];
    if json {
        headers.push(("Content-Type".to_string(), "application/json".to_string()));
    }
    if let Some(since) = if_modified_since {
        headers.push(("If-Modified-Since".to_string(), since.header_value()?));
    }
    headers.extend(context.extra_headers.iter().cloned());
    Ok(headers)
}

/// Absolute URL for `url` under `endpoint`, with GET params (and auth
/// params when GET auth is on) in the query string.
pub fn prepare_url(endpoint: &str, url: &str, bag: &ParameterBag) -> Result<String, ApiError> {
    let path = format!("{endpoint}{url}");
    let domain = bag.domain().unwrap_or_default();
    if path.is_empty() {
        return Err(ApiError::Configuration("can't prepare endpoint: empty path".to_string()));
    }
    if domain.is_empty() {
        return Err(ApiError::Configuration("can't prepare endpoint: empty domain".to_string()));
    }

    let mut params = bag.get_params().clone();
    if bag.get_auth() {
        for (name, value) in bag.query_auth() {
            params.insert(name, Value::String(value));
        }
    }
    let query = query::encode(&params)?;

    let scheme = if bag.https() { "https" } else { "http" };
    if query.is_empty() {
        Ok(format!("{scheme}://{domain}{path}"))
    } else {
        Ok(format!("{scheme}://{domain}{path}?{query}"))
    }
}

/// Assemble the full request for `call`. GET/POST params must already be
/// merged into `bag`.
pub fn build_request(
    context: &RequestContext,
    endpoint: &str,
    call: &Call,
    bag: &ParameterBag,
    cookie_jar: &Path,
) -> Result<HttpRequest, ApiError> {
    let headers = prepare_headers(context, bag.json(), call.if_modified_since.as_ref())?;
    let url = prepare_url(endpoint, &call.url, bag)?;

    let body = if bag.has_post() {
        Some(if bag.json() {
            let text = serde_json::to_string(bag.post_params())
                .map_err(|e| ApiError::Serialization(e.to_string()))?;
            RequestBody::Json(text)
        } else {
            RequestBody::Form(query::encode(bag.post_params())?)
        })
    } else {
        match (bag.file(), bag.file_size()?) {
            (Some(path), Some(size)) => Some(RequestBody::File(FileUpload {
                path: path.to_path_buf(),
                size,
            })),
            _ => None,
        }
    };

    let method = if body.is_some() {
        HttpMethod::Post
    } else {
        HttpMethod::Get
    };

    let basic_auth = context.http_auth.then(|| {
        (
            bag.login().unwrap_or_default().to_string(),
            bag.password().unwrap_or_default().to_string(),
        )
    });

    Ok(HttpRequest {
        method,
        url,
        headers,
        body,
        proxy: bag.proxy().map(str::to_string),
        verify_tls: bag.verify_tls(),
        cookie_jar: context.cookies.then(|| cookie_jar.to_path_buf()),
        basic_auth,
    })
}

/// Decode `body` as JSON when `parse` is set, otherwise hand it back as is.
pub fn parse_payload(body: String, parse: bool) -> Payload {
    if !parse {
        return Payload::Raw(body);
    }
    match serde_json::from_str(&body) {
        Ok(value) => Payload::Json(value),
        Err(e) => {
            if !body.is_empty() {
                tracing::warn!(error = %e, "response body is not valid JSON, returning null");
            }
            Payload::Json(Value::Null)
        }
    }
}
