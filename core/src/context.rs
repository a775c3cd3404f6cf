//! Per-model request configuration.
//!
//! # Design
//! Each model owns one `RequestContext`. When a model creates a child, the
//! child's context is seeded with a copy of the parent's debug, cookie,
//! extra-header and response-parsing settings. The endpoint is never copied:
//! a child either appends its own segment to the parent's full endpoint or,
//! when marked individual, uses its own segment alone.

/// Endpoint, flags and headers applied to every request a model sends, plus
/// the status and body of the last response it received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    pub endpoint: Option<String>,
    pub endpoint_individual: bool,
    pub cookies: bool,
    pub debug: bool,
    pub http_auth: bool,
    pub parse_response: bool,
    pub extra_headers: Vec<(String, String)>,
    pub last_http_code: Option<u16>,
    pub last_http_response: Option<String>,
}

impl Default for RequestContext {
    fn default() -> Self {
        Self {
            endpoint: None,
            endpoint_individual: false,
            cookies: false,
            debug: false,
            http_auth: false,
            parse_response: true,
            extra_headers: Vec::new(),
            last_http_code: None,
            last_http_response: None,
        }
    }
}

impl RequestContext {
    /// Seed `child` with the settings a parent passes down.
    pub fn copy_to(&self, child: &mut RequestContext) {
        child.cookies = self.cookies;
        child.debug = self.debug;
        child.extra_headers = self.extra_headers.clone();
        child.parse_response = self.parse_response;
    }

    /// This context's own endpoint segment (no parent prefix).
    pub fn own_endpoint(&self) -> &str {
        self.endpoint.as_deref().unwrap_or_default()
    }

    /// Compose the full endpoint given the parent's full endpoint.
    pub fn compose_endpoint(&self, parent: Option<&str>) -> String {
        match parent {
            Some(prefix) if !self.endpoint_individual => format!("{prefix}{}", self.own_endpoint()),
            _ => self.own_endpoint().to_string(),
        }
    }

    pub(crate) fn record(&mut self, status: Option<u16>, body: Option<String>) {
        self.last_http_code = status;
        self.last_http_response = body;
    }
}
