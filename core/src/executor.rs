//! The reusable connection handle shared by a client and all of its models.
//!
//! # Design
//! `RequestExecutor` owns one lazily opened `Connection` plus the per-call
//! options layered on top of it: a method override (how `put` reuses the
//! POST path) and response hooks. `reset()` drops those options after every
//! exchange so nothing leaks into the next call, while the connection stays
//! open until the executor is closed or dropped.

use std::fmt;

use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse, TransportFailure};
use crate::transport::{Connection, Transport};

/// Callback invoked with every successful response of the current call.
pub type ResponseHook = Box<dyn FnMut(&HttpResponse)>;

pub struct RequestExecutor {
    transport: Box<dyn Transport>,
    connection: Option<Box<dyn Connection>>,
    method_override: Option<HttpMethod>,
    hooks: Vec<ResponseHook>,
    closed: bool,
}

impl fmt::Debug for RequestExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestExecutor")
            .field("open", &self.connection.is_some())
            .field("method_override", &self.method_override)
            .field("hooks", &self.hooks.len())
            .field("closed", &self.closed)
            .finish()
    }
}

impl RequestExecutor {
    pub fn new(transport: Box<dyn Transport>) -> Self {
        Self {
            transport,
            connection: None,
            method_override: None,
            hooks: Vec::new(),
            closed: false,
        }
    }

    /// Return the open connection, opening one on first use.
    pub fn open(&mut self) -> Result<&mut dyn Connection, ApiError> {
        if self.closed {
            return Err(ApiError::TransportUnavailable("connection is closed".to_string()));
        }
        if self.connection.is_none() {
            tracing::debug!("opening transport connection");
            self.connection = Some(self.transport.open()?);
        }
        match self.connection.as_deref_mut() {
            Some(connection) => Ok(connection),
            None => Err(ApiError::TransportUnavailable("connection is closed".to_string())),
        }
    }

    pub fn is_open(&self) -> bool {
        self.connection.is_some()
    }

    /// Send the next request with `method` regardless of its body.
    pub fn set_method_override(&mut self, method: HttpMethod) {
        self.method_override = Some(method);
    }

    pub fn method_override(&self) -> Option<HttpMethod> {
        self.method_override
    }

    /// Register a hook for the next exchange. Hooks are cleared by `reset`.
    pub fn on_response(&mut self, hook: impl FnMut(&HttpResponse) + 'static) {
        self.hooks.push(Box::new(hook));
    }

    pub fn hook_count(&self) -> usize {
        self.hooks.len()
    }

    /// Execute `request` on the shared connection.
    ///
    /// The outer `Result` reports that no connection could be obtained; the
    /// inner one carries the transport's own outcome.
    pub fn execute(
        &mut self,
        mut request: HttpRequest,
    ) -> Result<Result<HttpResponse, TransportFailure>, ApiError> {
        if let Some(method) = self.method_override {
            request.method = method;
        }
        let outcome = self.open()?.execute(&request);
        if let Ok(response) = &outcome {
            for hook in &mut self.hooks {
                hook(response);
            }
        }
        Ok(outcome)
    }

    /// Clear per-call options. The connection stays open.
    pub fn reset(&mut self) {
        self.method_override = None;
        self.hooks.clear();
        if let Some(connection) = self.connection.as_deref_mut() {
            connection.reset();
        }
    }

    /// Close the connection. Later calls are no-ops.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.reset();
        if let Some(mut connection) = self.connection.take() {
            tracing::debug!("closing transport connection");
            connection.close();
        }
    }
}

impl Drop for RequestExecutor {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::transport::Unavailable;

    #[derive(Default)]
    struct Counters {
        opened: usize,
        resets: usize,
        closed: usize,
        methods: Vec<HttpMethod>,
    }

    struct CountingTransport(Rc<RefCell<Counters>>);

    struct CountingConnection(Rc<RefCell<Counters>>);

    impl Transport for CountingTransport {
        fn open(&self) -> Result<Box<dyn Connection>, ApiError> {
            self.0.borrow_mut().opened += 1;
            Ok(Box::new(CountingConnection(self.0.clone())))
        }
    }

    impl Connection for CountingConnection {
        fn execute(&mut self, request: &HttpRequest) -> Result<HttpResponse, TransportFailure> {
            self.0.borrow_mut().methods.push(request.method);
            Ok(HttpResponse {
                status: 200,
                headers: Vec::new(),
                body: "{}".to_string(),
            })
        }

        fn reset(&mut self) {
            self.0.borrow_mut().resets += 1;
        }

        fn close(&mut self) {
            self.0.borrow_mut().closed += 1;
        }
    }

    fn request(method: HttpMethod) -> HttpRequest {
        HttpRequest {
            method,
            url: "https://api.example.com/".to_string(),
            headers: Vec::new(),
            body: None,
            proxy: None,
            verify_tls: true,
            cookie_jar: None,
            basic_auth: None,
        }
    }

    fn executor() -> (RequestExecutor, Rc<RefCell<Counters>>) {
        let counters = Rc::new(RefCell::new(Counters::default()));
        let executor = RequestExecutor::new(Box::new(CountingTransport(counters.clone())));
        (executor, counters)
    }

    #[test]
    fn opens_lazily_and_reuses_the_connection() {
        let (mut executor, counters) = executor();
        assert!(!executor.is_open());

        executor.execute(request(HttpMethod::Get)).unwrap().unwrap();
        executor.execute(request(HttpMethod::Get)).unwrap().unwrap();

        assert!(executor.is_open());
        assert_eq!(counters.borrow().opened, 1);
    }

    #[test]
    fn method_override_applies_until_reset() {
        let (mut executor, counters) = executor();
        executor.set_method_override(HttpMethod::Put);
        executor.execute(request(HttpMethod::Post)).unwrap().unwrap();
        executor.reset();
        executor.execute(request(HttpMethod::Post)).unwrap().unwrap();

        assert_eq!(counters.borrow().methods, vec![HttpMethod::Put, HttpMethod::Post]);
        assert_eq!(executor.method_override(), None);
    }

    #[test]
    fn hooks_run_once_and_are_cleared_by_reset() {
        let (mut executor, _) = executor();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        executor.on_response(move |resp| sink.borrow_mut().push(resp.status));

        executor.execute(request(HttpMethod::Get)).unwrap().unwrap();
        executor.reset();
        executor.execute(request(HttpMethod::Get)).unwrap().unwrap();

        assert_eq!(*seen.borrow(), vec![200]);
        assert_eq!(executor.hook_count(), 0);
    }

    #[test]
    fn reset_keeps_the_connection_open() {
        let (mut executor, counters) = executor();
        executor.open().unwrap();
        executor.reset();
        assert!(executor.is_open());
        assert_eq!(counters.borrow().resets, 1);
        assert_eq!(counters.borrow().closed, 0);
    }

    #[test]
    fn closes_exactly_once() {
        let (mut executor, counters) = executor();
        executor.open().unwrap();
        executor.close();
        executor.close();
        drop(executor);
        assert_eq!(counters.borrow().closed, 1);
    }

    #[test]
    fn closed_executor_refuses_to_reopen() {
        let (mut executor, _) = executor();
        executor.close();
        assert!(matches!(
            executor.execute(request(HttpMethod::Get)),
            Err(ApiError::TransportUnavailable(_))
        ));
    }

    #[test]
    fn missing_transport_is_reported() {
        let mut executor = RequestExecutor::new(Box::new(Unavailable));
        assert!(matches!(executor.open(), Err(ApiError::TransportUnavailable(_))));
    }
}
