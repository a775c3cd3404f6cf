//! Blocking transport backed by [`ureq`].
//!
//! A connection wraps one `ureq::Agent`, which keeps its own pool of
//! keep-alive sockets. The agent is rebuilt only when a request asks for a
//! different proxy or TLS verification mode than the agent was built with.

use std::collections::BTreeMap;
use std::io::Read as _;
use std::path::Path;
use std::time::Duration;

use base64::Engine as _;

use super::{Connection, Transport, ERR_CONNECT, ERR_HOST_NOT_FOUND, ERR_OTHER, ERR_TIMEOUT};
use crate::error::ApiError;
use crate::http::{HttpRequest, HttpResponse, RequestBody, TransportFailure};

/// Couldn't read the local file to upload.
const ERR_READ: i32 = 26;

/// A [`Transport`] implementation backed by [`ureq`] (blocking).
#[derive(Debug, Clone, Default)]
pub struct UreqTransport {
    timeout: Option<Duration>,
}

impl UreqTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bound every exchange (connect, send, receive) by `timeout`.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
        }
    }
}

impl Transport for UreqTransport {
    fn open(&self) -> Result<Box<dyn Connection>, ApiError> {
        Ok(Box::new(UreqConnection {
            timeout: self.timeout,
            agent: None,
        }))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct AgentSettings {
    proxy: Option<String>,
    verify_tls: bool,
}

struct UreqConnection {
    timeout: Option<Duration>,
    agent: Option<(AgentSettings, ureq::Agent)>,
}

impl UreqConnection {
    fn agent_for(&mut self, request: &HttpRequest) -> Result<ureq::Agent, TransportFailure> {
        let wanted = AgentSettings {
            proxy: request.proxy.clone(),
            verify_tls: request.verify_tls,
        };
        if let Some((settings, agent)) = &self.agent {
            if *settings == wanted {
                return Ok(agent.clone());
            }
        }

        let proxy = match &wanted.proxy {
            Some(uri) => Some(
                ureq::Proxy::new(uri)
                    .map_err(|e| TransportFailure::new(format!("invalid proxy {uri}: {e}"), ERR_OTHER))?,
            ),
            None => None,
        };
        let tls = ureq::tls::TlsConfig::builder()
            .disable_verification(!wanted.verify_tls)
            .build();
        let agent = ureq::Agent::config_builder()
            .timeout_global(self.timeout)
            // Status codes are data for the caller, never errors.
            .http_status_as_error(false)
            .proxy(proxy)
            .tls_config(tls)
            .build()
            .new_agent();

        tracing::debug!(proxy = ?wanted.proxy, verify_tls = wanted.verify_tls, "built ureq agent");
        self.agent = Some((wanted, agent.clone()));
        Ok(agent)
    }
}

impl Connection for UreqConnection {
    fn execute(&mut self, request: &HttpRequest) -> Result<HttpResponse, TransportFailure> {
        let agent = self.agent_for(request)?;

        let mut builder = ureq::http::Request::builder()
            .method(request.method.as_str())
            .uri(&request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        if let Some((login, password)) = &request.basic_auth {
            let token = base64::engine::general_purpose::STANDARD.encode(format!("{login}:{password}"));
            builder = builder.header("Authorization", format!("Basic {token}"));
        }
        if let Some(jar) = &request.cookie_jar {
            let cookies = read_cookie_jar(jar);
            if !cookies.is_empty() {
                builder = builder.header("Cookie", cookie_header(&cookies));
            }
        }

        let body = match &request.body {
            Some(RequestBody::Json(text)) | Some(RequestBody::Form(text)) => Some(text.clone().into_bytes()),
            Some(RequestBody::File(upload)) => Some(std::fs::read(&upload.path).map_err(|e| {
                TransportFailure::new(format!("{}: {e}", upload.path.display()), ERR_READ)
            })?),
            None => None,
        };
        if matches!(request.body, Some(RequestBody::Form(_))) {
            builder = builder.header("Content-Type", "application/x-www-form-urlencoded");
        }

        let result = if let Some(body) = body {
            let req = builder
                .body(body)
                .map_err(|e| TransportFailure::new(e.to_string(), ERR_OTHER))?;
            agent.run(req)
        } else {
            let req = builder
                .body(())
                .map_err(|e| TransportFailure::new(e.to_string(), ERR_OTHER))?;
            agent.run(req)
        };

        let response = match result {
            Ok(resp) => resp,
            Err(ureq::Error::Timeout(_)) => {
                return Err(TransportFailure::new("operation timed out", ERR_TIMEOUT))
            }
            Err(ureq::Error::HostNotFound) => {
                return Err(TransportFailure::new("host not found", ERR_HOST_NOT_FOUND))
            }
            Err(ureq::Error::Io(e)) => return Err(TransportFailure::new(e.to_string(), ERR_CONNECT)),
            Err(e) => return Err(TransportFailure::new(e.to_string(), ERR_OTHER)),
        };

        let response = convert_response(response)?;
        if let Some(jar) = &request.cookie_jar {
            store_cookies(jar, &response);
        }
        Ok(response)
    }

    fn close(&mut self) {
        self.agent = None;
    }
}

/// Convert a ureq `http::Response<Body>` into our [`HttpResponse`].
fn convert_response(
    response: ureq::http::Response<ureq::Body>,
) -> Result<HttpResponse, TransportFailure> {
    let (parts, body) = response.into_parts();

    let mut bytes = Vec::new();
    body.into_reader()
        .read_to_end(&mut bytes)
        .map_err(|e| TransportFailure::new(e.to_string(), ERR_CONNECT))?;

    let headers = parts
        .headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_string(), v.to_string()))
        })
        .collect();

    Ok(HttpResponse {
        status: parts.status.as_u16(),
        headers,
        body: String::from_utf8_lossy(&bytes).into_owned(),
    })
}

// -- cookie jar: one `name=value` per line ----------------------------------

fn read_cookie_jar(path: &Path) -> BTreeMap<String, String> {
    let Ok(text) = std::fs::read_to_string(path) else {
        return BTreeMap::new();
    };
    text.lines().filter_map(parse_cookie_pair).collect()
}

fn parse_cookie_pair(line: &str) -> Option<(String, String)> {
    let (name, value) = line.split_once('=')?;
    let name = name.trim();
    (!name.is_empty()).then(|| (name.to_string(), value.trim().to_string()))
}

fn cookie_header(cookies: &BTreeMap<String, String>) -> String {
    cookies
        .iter()
        .map(|(name, value)| format!("{name}={value}"))
        .collect::<Vec<_>>()
        .join("; ")
}

fn store_cookies(path: &Path, response: &HttpResponse) {
    let received: Vec<(String, String)> = response
        .headers
        .iter()
        .filter(|(name, _)| name.eq_ignore_ascii_case("set-cookie"))
        .filter_map(|(_, value)| parse_cookie_pair(value.split(';').next().unwrap_or_default()))
        .collect();
    if received.is_empty() {
        return;
    }

    let mut cookies = read_cookie_jar(path);
    cookies.extend(received);
    let text: String = cookies
        .iter()
        .map(|(name, value)| format!("{name}={value}\n"))
        .collect();
    if let Err(e) = std::fs::write(path, text) {
        tracing::warn!(path = %path.display(), error = %e, "failed to write cookie jar");
    }
}
