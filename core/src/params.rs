//! Connection-wide parameter storage.
//!
//! # Design
//! One `ParameterBag` is shared by a client and every model it creates. It
//! mixes two lifetimes:
//! - per-call state (GET params, POST params, upload file) that `reset()`
//!   clears after every request and on every model resolution;
//! - connection state (domain, credentials, proxy, transport flags) that
//!   survives until changed explicitly.

use std::collections::BTreeMap;
use std::fs::File;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

use crate::error::ApiError;

/// Reserved auth parameter: login used for HTTP basic auth.
pub const AUTH_PARAM_LOGIN: &str = "login";
/// Reserved auth parameter: password used for HTTP basic auth.
pub const AUTH_PARAM_PASSWORD: &str = "password";
/// Reserved auth parameter: API domain. Prefer `ParameterBag::set_domain`.
pub const AUTH_PARAM_DOMAIN: &str = "domain";

/// GET/POST parameters, credentials, upload file and transport flags.
#[derive(Debug, Clone)]
pub struct ParameterBag {
    auth_params: BTreeMap<String, String>,
    login: Option<String>,
    password: Option<String>,
    domain: Option<String>,
    get_params: Map<String, Value>,
    post_params: Map<String, Value>,
    proxy: Option<String>,
    file: Option<PathBuf>,
    get_auth: bool,
    json: bool,
    https: bool,
    verify_tls: bool,
}

impl Default for ParameterBag {
    fn default() -> Self {
        Self {
            auth_params: BTreeMap::new(),
            login: None,
            password: None,
            domain: None,
            get_params: Map::new(),
            post_params: Map::new(),
            proxy: None,
            file: None,
            get_auth: false,
            json: true,
            https: true,
            verify_tls: true,
        }
    }
}

impl ParameterBag {
    pub fn new() -> Self {
        Self::default()
    }

    // -- auth -------------------------------------------------------------

    /// Add or overwrite an auth parameter. `login`, `password` and `domain`
    /// go to their dedicated slots; any other name is kept as a custom auth
    /// parameter (sent in the query string when GET auth is enabled).
    pub fn add_auth(&mut self, name: &str, value: impl Into<String>) -> &mut Self {
        let value = value.into();
        match name {
            AUTH_PARAM_LOGIN => self.login = Some(value),
            AUTH_PARAM_PASSWORD => self.password = Some(value),
            AUTH_PARAM_DOMAIN => self.domain = Some(value),
            _ => {
                self.auth_params.insert(name.to_string(), value);
            }
        }
        self
    }

    /// Look up one auth parameter, reserved names included.
    pub fn auth(&self, name: &str) -> Option<&str> {
        match name {
            AUTH_PARAM_LOGIN => self.login.as_deref(),
            AUTH_PARAM_PASSWORD => self.password.as_deref(),
            AUTH_PARAM_DOMAIN => self.domain.as_deref(),
            _ => self.auth_params.get(name).map(String::as_str),
        }
    }

    /// Custom (non-reserved) auth parameters.
    pub fn auth_params(&self) -> &BTreeMap<String, String> {
        &self.auth_params
    }

    /// Custom auth parameters as they are appended to a query string when
    /// GET auth is on. Login, password and domain are never included.
    pub fn query_auth(&self) -> Vec<(String, String)> {
        self.auth_params
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    pub fn login(&self) -> Option<&str> {
        self.login.as_deref()
    }

    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }

    pub fn set_domain(&mut self, domain: impl Into<String>) -> &mut Self {
        self.domain = Some(domain.into());
        self
    }

    pub fn domain(&self) -> Option<&str> {
        self.domain.as_deref()
    }

    // -- GET / POST ---------------------------------------------------------

    /// Set one GET parameter.
    pub fn add_get(&mut self, name: &str, value: impl Into<Value>) -> &mut Self {
        self.get_params.insert(name.to_string(), value.into());
        self
    }

    /// Merge GET parameters; existing keys are overwritten.
    pub fn merge_get(&mut self, params: Map<String, Value>) -> &mut Self {
        self.get_params.extend(params);
        self
    }

    pub fn get_param(&self, name: &str) -> Option<&Value> {
        self.get_params.get(name)
    }

    pub fn get_params(&self) -> &Map<String, Value> {
        &self.get_params
    }

    pub fn has_get(&self) -> bool {
        !self.get_params.is_empty()
    }

    pub fn clear_get(&mut self) -> &mut Self {
        self.get_params.clear();
        self
    }

    /// Set one POST parameter.
    pub fn add_post(&mut self, name: &str, value: impl Into<Value>) -> &mut Self {
        self.post_params.insert(name.to_string(), value.into());
        self
    }

    /// Merge POST parameters; existing keys are overwritten.
    pub fn merge_post(&mut self, params: Map<String, Value>) -> &mut Self {
        self.post_params.extend(params);
        self
    }

    pub fn post_param(&self, name: &str) -> Option<&Value> {
        self.post_params.get(name)
    }

    pub fn post_params(&self) -> &Map<String, Value> {
        &self.post_params
    }

    pub fn has_post(&self) -> bool {
        !self.post_params.is_empty()
    }

    pub fn clear_post(&mut self) -> &mut Self {
        self.post_params.clear();
        self
    }

    // -- proxy --------------------------------------------------------------

    pub fn set_proxy(&mut self, proxy: impl Into<String>) -> &mut Self {
        self.proxy = Some(proxy.into());
        self
    }

    pub fn proxy(&self) -> Option<&str> {
        self.proxy.as_deref()
    }

    pub fn has_proxy(&self) -> bool {
        self.proxy.is_some()
    }

    // -- file ---------------------------------------------------------------

    /// Attach the file to upload with the next request. Only one file can be
    /// attached; a second call replaces the first. The file must exist and be
    /// readable now.
    pub fn set_file(&mut self, path: impl AsRef<Path>) -> Result<&mut Self, ApiError> {
        let path = path.as_ref();
        let file_error = |source| ApiError::File {
            path: path.to_path_buf(),
            source,
        };
        let metadata = std::fs::metadata(path).map_err(file_error)?;
        if !metadata.is_file() {
            return Err(file_error(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "not a regular file",
            )));
        }
        File::open(path).map_err(file_error)?;
        self.file = Some(path.to_path_buf());
        Ok(self)
    }

    pub fn file(&self) -> Option<&Path> {
        self.file.as_deref()
    }

    pub fn has_file(&self) -> bool {
        self.file.is_some()
    }

    /// Size in bytes of the attached file, if any.
    pub fn file_size(&self) -> Result<Option<u64>, ApiError> {
        match &self.file {
            Some(path) => std::fs::metadata(path)
                .map(|m| Some(m.len()))
                .map_err(|source| ApiError::File {
                    path: path.clone(),
                    source,
                }),
            None => Ok(None),
        }
    }

    pub fn clear_file(&mut self) -> &mut Self {
        self.file = None;
        self
    }

    // -- transport flags ----------------------------------------------------

    /// Send the custom auth parameters in the query string.
    ///
    /// Credentials end up in URLs and in debug logs; keep this off unless the
    /// remote API requires it.
    pub fn set_get_auth(&mut self, flag: bool) -> &mut Self {
        self.get_auth = flag;
        self
    }

    pub fn get_auth(&self) -> bool {
        self.get_auth
    }

    pub fn set_json(&mut self, flag: bool) -> &mut Self {
        self.json = flag;
        self
    }

    pub fn json(&self) -> bool {
        self.json
    }

    pub fn set_https(&mut self, flag: bool) -> &mut Self {
        self.https = flag;
        self
    }

    pub fn https(&self) -> bool {
        self.https
    }

    /// Verify TLS certificates and host names. On by default.
    pub fn set_verify_tls(&mut self, flag: bool) -> &mut Self {
        self.verify_tls = flag;
        self
    }

    pub fn verify_tls(&self) -> bool {
        self.verify_tls
    }

    /// Clear GET params, POST params and the upload file ahead of the next
    /// request. Auth, domain, proxy and flags are kept.
    pub fn reset(&mut self) {
        self.clear_get().clear_post().clear_file();
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use serde_json::json;

    use super::*;

    fn obj(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn defaults() {
        let bag = ParameterBag::new();
        assert!(bag.json());
        assert!(bag.https());
        assert!(bag.verify_tls());
        assert!(!bag.get_auth());
        assert!(!bag.has_get());
        assert!(!bag.has_post());
        assert!(!bag.has_file());
        assert!(!bag.has_proxy());
        assert_eq!(bag.domain(), None);
    }

    #[test]
    fn reserved_auth_names_use_dedicated_slots() {
        let mut bag = ParameterBag::new();
        bag.add_auth("login", "alice")
            .add_auth("password", "secret")
            .add_auth("domain", "api.example.com")
            .add_auth("api_key", "k-1");

        assert_eq!(bag.login(), Some("alice"));
        assert_eq!(bag.password(), Some("secret"));
        assert_eq!(bag.domain(), Some("api.example.com"));
        assert_eq!(bag.auth("api_key"), Some("k-1"));
        assert_eq!(bag.auth("missing"), None);
        assert_eq!(bag.auth_params().len(), 1);
    }

    #[test]
    fn query_auth_holds_only_custom_params() {
        let mut bag = ParameterBag::new();
        bag.add_auth("login", "alice")
            .add_auth("password", "s3cret")
            .add_auth("domain", "api.example.com")
            .add_auth("token", "t");
        assert_eq!(bag.query_auth(), vec![("token".to_string(), "t".to_string())]);
    }

    #[test]
    fn merge_overwrites_existing_keys_and_keeps_order() {
        let mut bag = ParameterBag::new();
        bag.add_get("page", "1").add_get("sort", "name");
        bag.merge_get(obj(json!({"page": "2", "limit": 10})));

        let keys: Vec<&String> = bag.get_params().keys().collect();
        assert_eq!(keys, ["page", "sort", "limit"]);
        assert_eq!(bag.get_param("page"), Some(&json!("2")));
    }

    #[test]
    fn reset_clears_call_state_only() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"payload").unwrap();

        let mut bag = ParameterBag::new();
        bag.add_auth("login", "alice")
            .add_auth("password", "secret")
            .set_domain("api.example.com")
            .set_proxy("http://proxy:3128")
            .set_json(false)
            .set_https(false)
            .add_get("page", 1)
            .add_post("name", "x");
        bag.set_file(file.path()).unwrap();

        bag.reset();

        assert!(!bag.has_get());
        assert!(!bag.has_post());
        assert!(!bag.has_file());
        assert_eq!(bag.login(), Some("alice"));
        assert_eq!(bag.password(), Some("secret"));
        assert_eq!(bag.domain(), Some("api.example.com"));
        assert_eq!(bag.proxy(), Some("http://proxy:3128"));
        assert!(!bag.json());
        assert!(!bag.https());
    }

    #[test]
    fn set_file_rejects_missing_file() {
        let mut bag = ParameterBag::new();
        let err = bag.set_file("/definitely/not/here.bin").unwrap_err();
        assert!(matches!(err, ApiError::File { .. }));
        assert!(!bag.has_file());
    }

    #[test]
    fn set_file_rejects_directories() {
        let dir = tempfile::tempdir().unwrap();
        let mut bag = ParameterBag::new();
        assert!(bag.set_file(dir.path()).is_err());
    }

    #[test]
    fn only_one_file_is_attached() {
        let mut first = tempfile::NamedTempFile::new().unwrap();
        first.write_all(b"1").unwrap();
        let mut second = tempfile::NamedTempFile::new().unwrap();
        second.write_all(b"22").unwrap();

        let mut bag = ParameterBag::new();
        bag.set_file(first.path()).unwrap();
        bag.set_file(second.path()).unwrap();

        assert_eq!(bag.file(), Some(second.path()));
        assert_eq!(bag.file_size().unwrap(), Some(2));
    }
}
