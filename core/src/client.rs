//! Entry point: owns the shared resources and hands out models by name.
//!
//! # Design
//! `Client` owns the parameter bag, the request executor (and with it the
//! one connection) and the model registry. Models only hold a weak reference
//! back, so dropping the client closes the connection even while models are
//! still around; such models then fail with `ApiError::Detached`.
//!
//! Everything sits behind `Rc`/`RefCell`: a client and its models are
//! `!Send`, and one request runs to completion before the next can start.

use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::path::PathBuf;
use std::rc::Rc;

use crate::config::{ClientConfig, DEFAULT_COOKIE_JAR};
use crate::error::ApiError;
use crate::executor::RequestExecutor;
use crate::http::HttpResponse;
use crate::logging;
use crate::model::Model;
use crate::params::ParameterBag;
use crate::registry::ModelRegistry;
use crate::resolver;
use crate::transport::{self, Transport};

/// Client-wide defaults handed to every top-level model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ClientSettings {
    pub(crate) debug: bool,
    pub(crate) cookies: bool,
    pub(crate) cookie_jar: PathBuf,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            debug: false,
            cookies: false,
            cookie_jar: PathBuf::from(DEFAULT_COOKIE_JAR),
        }
    }
}

/// State shared by a client and all of its models.
pub(crate) struct Shared {
    pub(crate) registry: ModelRegistry,
    pub(crate) params: RefCell<ParameterBag>,
    pub(crate) executor: RefCell<RequestExecutor>,
    pub(crate) settings: RefCell<ClientSettings>,
}

impl Shared {
    pub(crate) fn executor_mut(&self) -> Result<RefMut<'_, RequestExecutor>, ApiError> {
        self.executor.try_borrow_mut().map_err(|_| {
            ApiError::Configuration("another request is already running on this client".to_string())
        })
    }

    pub(crate) fn params_mut(&self) -> Result<RefMut<'_, ParameterBag>, ApiError> {
        self.params.try_borrow_mut().map_err(|_| {
            ApiError::Configuration("parameter bag is borrowed elsewhere".to_string())
        })
    }
}

pub struct Client {
    shared: Rc<Shared>,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("registry", &self.shared.registry)
            .field("settings", &self.shared.settings.borrow())
            .finish()
    }
}

impl Client {
    pub fn new(registry: ModelRegistry, transport: impl Transport + 'static) -> Self {
        Self::with_transport(registry, Box::new(transport))
    }

    pub fn with_transport(registry: ModelRegistry, transport: Box<dyn Transport>) -> Self {
        Self {
            shared: Rc::new(Shared {
                registry,
                params: RefCell::new(ParameterBag::new()),
                executor: RefCell::new(RequestExecutor::new(transport)),
                settings: RefCell::new(ClientSettings::default()),
            }),
        }
    }

    /// Client over the built-in network transport.
    pub fn with_default_transport(registry: ModelRegistry) -> Result<Self, ApiError> {
        Ok(Self::with_transport(registry, transport::default_transport()?))
    }

    /// Client over the built-in network transport, configured from `config`.
    pub fn from_config(config: &ClientConfig, registry: ModelRegistry) -> Result<Self, ApiError> {
        let transport = config_transport(config)?;
        let client = Self::with_transport(registry, transport);
        client.configure(config)?;
        Ok(client)
    }

    /// Apply connection settings and client defaults from `config`.
    ///
    /// Fails with `Configuration` while the parameter bag is borrowed.
    pub fn configure(&self, config: &ClientConfig) -> Result<&Self, ApiError> {
        config.apply(&mut *self.shared.params_mut()?);
        {
            let mut settings = self.shared.settings.borrow_mut();
            settings.cookies = config.cookies;
            settings.cookie_jar = config.cookie_jar.clone();
        }
        Ok(self.set_debug(config.debug))
    }

    /// A fresh instance of the top-level model `name` (snake_case).
    ///
    /// Clears pending GET/POST/file state of the parameter bag.
    pub fn model(&self, name: &str) -> Result<Model, ApiError> {
        resolver::resolve_root(&self.shared, name)
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.shared.registry
    }

    pub fn params(&self) -> Ref<'_, ParameterBag> {
        self.shared.params.borrow()
    }

    /// # Panics
    /// If the bag is already borrowed, e.g. a `params()` guard is still
    /// alive. See `try_params_mut`.
    pub fn params_mut(&self) -> RefMut<'_, ParameterBag> {
        self.shared.params.borrow_mut()
    }

    pub fn try_params_mut(&self) -> Result<RefMut<'_, ParameterBag>, ApiError> {
        self.shared.params_mut()
    }

    /// Debug default for models created from now on. Also moves the log
    /// threshold to `Debug` (on) or `Info` (off).
    pub fn set_debug(&self, flag: bool) -> &Self {
        self.shared.settings.borrow_mut().debug = flag;
        logging::apply_debug(flag);
        self
    }

    /// Cookie default for models created from now on.
    pub fn set_cookies(&self, flag: bool) -> &Self {
        self.shared.settings.borrow_mut().cookies = flag;
        self
    }

    pub fn set_cookie_jar(&self, path: impl Into<PathBuf>) -> &Self {
        self.shared.settings.borrow_mut().cookie_jar = path.into();
        self
    }

    /// Run `hook` on the response of the next request only.
    pub fn on_response(&self, hook: impl FnMut(&HttpResponse) + 'static) -> Result<(), ApiError> {
        self.shared.executor_mut()?.on_response(hook);
        Ok(())
    }

    /// Whether the shared connection has been opened.
    pub fn is_connected(&self) -> bool {
        self.shared.executor.borrow().is_open()
    }
}

#[cfg(feature = "ureq")]
fn config_transport(config: &ClientConfig) -> Result<Box<dyn Transport>, ApiError> {
    Ok(match config.timeout_secs {
        Some(secs) => Box::new(transport::UreqTransport::with_timeout(
            std::time::Duration::from_secs(secs),
        )),
        None => Box::new(transport::UreqTransport::new()),
    })
}

#[cfg(not(feature = "ureq"))]
fn config_transport(_config: &ClientConfig) -> Result<Box<dyn Transport>, ApiError> {
    transport::default_transport()
}
