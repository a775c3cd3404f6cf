//! Client configuration read from JSON.
//!
//! Every field is optional; missing fields keep the `ParameterBag` and
//! `RequestContext` defaults.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Deserialize;

use crate::error::ApiError;
use crate::params::ParameterBag;

/// Default cookie jar location, relative to the working directory.
pub const DEFAULT_COOKIE_JAR: &str = "cookie.txt";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClientConfig {
    pub domain: Option<String>,
    pub login: Option<String>,
    pub password: Option<String>,
    /// Custom auth parameters (API keys, tokens, ...).
    pub auth: BTreeMap<String, String>,
    pub proxy: Option<String>,
    pub json: bool,
    pub https: bool,
    pub get_auth: bool,
    pub verify_tls: bool,
    pub debug: bool,
    pub cookies: bool,
    pub cookie_jar: PathBuf,
    pub timeout_secs: Option<u64>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            domain: None,
            login: None,
            password: None,
            auth: BTreeMap::new(),
            proxy: None,
            json: true,
            https: true,
            get_auth: false,
            verify_tls: true,
            debug: false,
            cookies: false,
            cookie_jar: PathBuf::from(DEFAULT_COOKIE_JAR),
            timeout_secs: None,
        }
    }
}

impl ClientConfig {
    pub fn from_json_str(text: &str) -> Result<Self, ApiError> {
        serde_json::from_str(text).map_err(|e| ApiError::Config(e.to_string()))
    }

    /// Copy the connection-level settings into `bag`.
    pub fn apply(&self, bag: &mut ParameterBag) {
        if let Some(domain) = &self.domain {
            bag.set_domain(domain.clone());
        }
        if let Some(login) = &self.login {
            bag.add_auth(crate::params::AUTH_PARAM_LOGIN, login.clone());
        }
        if let Some(password) = &self.password {
            bag.add_auth(crate::params::AUTH_PARAM_PASSWORD, password.clone());
        }
        for (name, value) in &self.auth {
            bag.add_auth(name, value.clone());
        }
        if let Some(proxy) = &self.proxy {
            bag.set_proxy(proxy.clone());
        }
        bag.set_json(self.json)
            .set_https(self.https)
            .set_get_auth(self.get_auth)
            .set_verify_tls(self.verify_tls);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let config = ClientConfig::from_json_str("{}").unwrap();
        assert_eq!(config, ClientConfig::default());
        assert!(config.verify_tls);
        assert_eq!(config.cookie_jar, PathBuf::from("cookie.txt"));
    }

    #[test]
    fn applies_connection_settings_to_the_bag() {
        let config = ClientConfig::from_json_str(
            r#"{
                "domain": "api.example.com",
                "login": "alice",
                "password": "secret",
                "auth": {"api_key": "k-1"},
                "https": false,
                "get_auth": true
            }"#,
        )
        .unwrap();

        let mut bag = ParameterBag::new();
        config.apply(&mut bag);

        assert_eq!(bag.domain(), Some("api.example.com"));
        assert_eq!(bag.login(), Some("alice"));
        assert_eq!(bag.password(), Some("secret"));
        assert_eq!(bag.auth("api_key"), Some("k-1"));
        assert!(!bag.https());
        assert!(bag.get_auth());
        assert!(bag.json());
    }

    #[test]
    fn rejects_unknown_keys() {
        let err = ClientConfig::from_json_str(r#"{"domian": "typo"}"#).unwrap_err();
        assert!(matches!(err, ApiError::Config(_)));
    }
}
