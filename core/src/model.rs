//! Models: named nodes of the request tree.
//!
//! # Design
//! A `Model` is a cheap handle to one node. The node keeps the declared
//! fields, the stored values, its `RequestContext` and two non-owning links:
//! to the client (for the shared bag, executor and registry) and to its
//! parent (for endpoint composition). Dropping a parent never invalidates a
//! child; the child falls back to the parent endpoint it captured at
//! creation.
//!
//! Field access is keyed by name. A declared field without a stored value is
//! looked up as a sub-model, freshly each time. `call` accepts the
//! `getField`/`setField`/`newField`/`createField` method style on top of that.

use std::cell::{Ref, RefCell, RefMut};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::{Rc, Weak};

use serde_json::{Map, Value};

use crate::case;
use crate::client::Shared;
use crate::context::RequestContext;
use crate::error::ApiError;
use crate::http::{HttpMethod, HttpResponse, TransportFailure};
use crate::logging;
use crate::registry::ModelDefinition;
use crate::request::{self, Call, Payload};
use crate::resolver;

/// A stored field value: plain JSON or a nested model.
#[derive(Debug, Clone)]
pub enum FieldValue {
    Value(Value),
    Model(Model),
}

impl FieldValue {
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            FieldValue::Value(value) => Some(value),
            FieldValue::Model(_) => None,
        }
    }

    pub fn as_model(&self) -> Option<&Model> {
        match self {
            FieldValue::Model(model) => Some(model),
            FieldValue::Value(_) => None,
        }
    }

    pub fn into_model(self) -> Option<Model> {
        match self {
            FieldValue::Model(model) => Some(model),
            FieldValue::Value(_) => None,
        }
    }

    /// Anything but a JSON `null`.
    pub fn is_set(&self) -> bool {
        !matches!(self, FieldValue::Value(Value::Null))
    }

    /// Plain JSON, nested models flattened recursively.
    pub fn flatten(&self) -> Value {
        match self {
            FieldValue::Value(value) => value.clone(),
            FieldValue::Model(model) => Value::Object(model.flattened_values()),
        }
    }
}

impl PartialEq for FieldValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (FieldValue::Value(a), FieldValue::Value(b)) => a == b,
            (FieldValue::Model(a), FieldValue::Model(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl From<Value> for FieldValue {
    fn from(value: Value) -> Self {
        FieldValue::Value(value)
    }
}

impl From<Model> for FieldValue {
    fn from(model: Model) -> Self {
        FieldValue::Model(model)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Value(Value::from(value))
    }
}

/// Weak link to a parent plus the parent's full endpoint at link time.
pub(crate) struct ParentLink {
    node: Weak<RefCell<ModelNode>>,
    endpoint: String,
}

impl ParentLink {
    pub(crate) fn new(parent: &Model) -> Self {
        Self {
            node: Rc::downgrade(&parent.node),
            endpoint: parent.full_endpoint(),
        }
    }
}

struct ModelNode {
    type_name: String,
    definition: ModelDefinition,
    values: BTreeMap<String, FieldValue>,
    context: RequestContext,
    parent: Option<ParentLink>,
    client: Weak<Shared>,
}

#[derive(Clone)]
pub struct Model {
    node: Rc<RefCell<ModelNode>>,
}

impl fmt::Debug for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let node = self.node.borrow();
        f.debug_struct("Model")
            .field("type", &node.type_name)
            .field("values", &node.values.keys().collect::<Vec<_>>())
            .field("endpoint", &node.context.endpoint)
            .finish()
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.node.borrow().type_name)
    }
}

/// Verb recognised by `Model::call`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Accessor {
    Get,
    Set,
    Create,
}

/// Split `getUserName` into (`Get`, `UserName`). The remainder must start
/// with an uppercase letter.
fn split_method(name: &str) -> Option<(Accessor, &str)> {
    const PREFIXES: [(&str, Accessor); 4] = [
        ("get", Accessor::Get),
        ("set", Accessor::Set),
        ("new", Accessor::Create),
        ("create", Accessor::Create),
    ];
    PREFIXES.iter().find_map(|(prefix, accessor)| {
        let rest = name.strip_prefix(prefix)?;
        rest.starts_with(|c: char| c.is_uppercase())
            .then_some((*accessor, rest))
    })
}

impl Model {
    pub(crate) fn new(
        type_name: String,
        definition: ModelDefinition,
        context: RequestContext,
        client: Weak<Shared>,
        parent: Option<ParentLink>,
    ) -> Self {
        Self {
            node: Rc::new(RefCell::new(ModelNode {
                type_name,
                definition,
                values: BTreeMap::new(),
                context,
                parent,
                client,
            })),
        }
    }

    pub(crate) fn shared(&self) -> Result<Rc<Shared>, ApiError> {
        self.node.borrow().client.upgrade().ok_or(ApiError::Detached)
    }

    /// Full registered type name, e.g. `shop::models::User`.
    pub fn type_name(&self) -> String {
        self.node.borrow().type_name.clone()
    }

    /// Whether both handles point at the same instance.
    pub fn ptr_eq(&self, other: &Model) -> bool {
        Rc::ptr_eq(&self.node, &other.node)
    }

    /// The parent model, if it is still alive.
    pub fn parent(&self) -> Option<Model> {
        let node = self.node.borrow();
        let link = node.parent.as_ref()?;
        link.node.upgrade().map(|node| Model { node })
    }

    // -- field proxy ----------------------------------------------------------

    pub fn field_exists(&self, key: &str) -> bool {
        self.node.borrow().definition.declares(key)
    }

    /// Declared and holding a non-null stored value.
    pub fn has_value(&self, key: &str) -> bool {
        let node = self.node.borrow();
        node.definition.declares(key) && node.values.get(key).is_some_and(FieldValue::is_set)
    }

    /// Stored value of `key`, or else the sub-model named `key`, or `None`.
    /// A stored `null` counts as no value.
    pub fn get_field(&self, key: &str) -> Result<Option<FieldValue>, ApiError> {
        self.require_field(key)?;
        let stored = self
            .node
            .borrow()
            .values
            .get(key)
            .filter(|value| value.is_set())
            .cloned();
        if stored.is_some() {
            return Ok(stored);
        }
        Ok(resolver::resolve_nested(self, key)?.map(FieldValue::Model))
    }

    pub fn set_field(&self, key: &str, value: impl Into<FieldValue>) -> Result<(), ApiError> {
        self.require_field(key)?;
        self.node
            .borrow_mut()
            .values
            .insert(key.to_string(), value.into());
        Ok(())
    }

    pub fn unset_field(&self, key: &str) {
        self.node.borrow_mut().values.remove(key);
    }

    /// Stored values as they are, nested models included.
    pub fn values(&self) -> BTreeMap<String, FieldValue> {
        self.node.borrow().values.clone()
    }

    /// Stored values as plain JSON; nested models become objects.
    pub fn flattened_values(&self) -> Map<String, Value> {
        self.node
            .borrow()
            .values
            .iter()
            .map(|(key, value)| (key.clone(), value.flatten()))
            .collect()
    }

    /// A fresh sub-model named `name`, `None` if no such type is registered.
    pub fn sub_model(&self, name: &str) -> Result<Option<Model>, ApiError> {
        resolver::resolve_nested(self, name)
    }

    /// Method-style access: `getUserName()`, `setUserName(v)`,
    /// `newProfile()` / `createProfile()`. Custom getters and setters from
    /// the model definition take precedence over plain field access.
    pub fn call(&self, method: &str, args: &[Value]) -> Result<Option<FieldValue>, ApiError> {
        let (accessor, rest) = split_method(method).ok_or_else(|| ApiError::MethodNotAvailable {
            model: self.type_name(),
            method: method.to_string(),
        })?;

        match accessor {
            Accessor::Get => {
                let field = self.field_key(rest);
                let getter = self.node.borrow().definition.getters.get(&field).copied();
                match getter {
                    Some(getter) => getter(self),
                    None => self.get_field(&field),
                }
            }
            Accessor::Set => {
                let field = self.field_key(rest);
                let value = args.first().cloned().unwrap_or(Value::Null);
                let setter = self.node.borrow().definition.setters.get(&field).copied();
                match setter {
                    Some(setter) => setter(self, value)?,
                    None => self.set_field(&field, value)?,
                }
                Ok(None)
            }
            Accessor::Create => Ok(self.sub_model(rest)?.map(FieldValue::Model)),
        }
    }

    /// `UserName` → `user_name`, unless only the raw name is declared.
    fn field_key(&self, camel: &str) -> String {
        let snake = case::snake_case(camel);
        if !self.field_exists(&snake) && self.field_exists(camel) {
            camel.to_string()
        } else {
            snake
        }
    }

    fn require_field(&self, key: &str) -> Result<(), ApiError> {
        if self.field_exists(key) {
            Ok(())
        } else {
            Err(ApiError::FieldNotFound {
                model: self.type_name(),
                field: key.to_string(),
            })
        }
    }

    // -- request context ----------------------------------------------------

    pub fn context(&self) -> Ref<'_, RequestContext> {
        Ref::map(self.node.borrow(), |node| &node.context)
    }

    pub fn context_mut(&self) -> RefMut<'_, RequestContext> {
        RefMut::map(self.node.borrow_mut(), |node| &mut node.context)
    }

    pub fn set_endpoint(&self, endpoint: impl Into<String>) -> &Self {
        self.context_mut().endpoint = Some(endpoint.into());
        self
    }

    pub fn set_endpoint_individual(&self, flag: bool) -> &Self {
        self.context_mut().endpoint_individual = flag;
        self
    }

    /// Also moves the log threshold to `Debug` (on) or `Info` (off).
    pub fn set_debug(&self, flag: bool) -> &Self {
        self.context_mut().debug = flag;
        logging::apply_debug(flag);
        self
    }

    pub fn set_cookies(&self, flag: bool) -> &Self {
        self.context_mut().cookies = flag;
        self
    }

    pub fn set_http_auth(&self, flag: bool) -> &Self {
        self.context_mut().http_auth = flag;
        self
    }

    pub fn set_parse_response(&self, flag: bool) -> &Self {
        self.context_mut().parse_response = flag;
        self
    }

    /// Replace the extra headers sent with every request.
    pub fn set_headers<I, K, V>(&self, headers: I) -> &Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.context_mut().extra_headers = headers
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self
    }

    /// Endpoint including every non-individual ancestor's endpoint.
    pub fn full_endpoint(&self) -> String {
        let node = self.node.borrow();
        let parent = match &node.parent {
            Some(link) if !node.context.endpoint_individual => Some(
                link.node
                    .upgrade()
                    .map(|parent| Model { node: parent }.full_endpoint())
                    .unwrap_or_else(|| link.endpoint.clone()),
            ),
            _ => None,
        };
        node.context.compose_endpoint(parent.as_deref())
    }

    pub fn last_http_code(&self) -> Option<u16> {
        self.context().last_http_code
    }

    pub fn last_http_response(&self) -> Option<String> {
        self.context().last_http_response.clone()
    }

    // -- verbs ----------------------------------------------------------------

    pub fn get(&self, url: &str, params: Value) -> Result<Payload, ApiError> {
        self.execute(Call::get(url).params(params))
    }

    pub fn post(&self, url: &str, params: Value) -> Result<Payload, ApiError> {
        self.execute(Call::post(url).params(params))
    }

    /// POST with the method overridden to PUT.
    pub fn put(&self, url: &str, params: Value) -> Result<Payload, ApiError> {
        self.execute(Call::put(url).params(params))
    }

    /// Run one call through the shared bag and connection.
    ///
    /// Whatever happens, the executor's per-call options and the bag's
    /// GET/POST/file state are cleared before this returns.
    pub fn execute(&self, call: Call) -> Result<Payload, ApiError> {
        let shared = self.shared()?;
        tracing::debug!(method = %call.method, url = %call.url, model = %self, "request called");

        let outcome = self.exchange(&shared, &call);

        if let Ok(mut executor) = shared.executor.try_borrow_mut() {
            executor.reset();
        }
        if let Ok(mut bag) = shared.params.try_borrow_mut() {
            bag.reset();
        }

        let response = match outcome? {
            Ok(response) => response,
            Err(failure) => {
                tracing::debug!(error = %failure.description, code = failure.code, "transport failure");
                self.context_mut().record(None, None);
                if !failure.description.is_empty() {
                    return Err(ApiError::Network {
                        description: failure.description,
                        code: failure.code,
                    });
                }
                return Ok(request::parse_payload(String::new(), self.context().parse_response));
            }
        };

        let debug = call.debug.unwrap_or(self.context().debug);
        if debug {
            tracing::debug!(status = response.status, body = %response.body, "response received");
        } else {
            tracing::debug!(status = response.status, "response received (body hidden, debug off)");
        }

        self.context_mut()
            .record(Some(response.status), Some(response.body.clone()));
        let parse = self.context().parse_response;
        Ok(request::parse_payload(response.body, parse))
    }

    /// Merge params, build the request and hand it to the executor.
    fn exchange(
        &self,
        shared: &Shared,
        call: &Call,
    ) -> Result<Result<HttpResponse, TransportFailure>, ApiError> {
        let params = call.param_map()?;
        {
            let mut bag = shared.params_mut()?;
            match call.method {
                HttpMethod::Get => bag.merge_get(params),
                HttpMethod::Post | HttpMethod::Put => bag.merge_post(params),
            };
        }
        if call.method == HttpMethod::Put {
            shared.executor_mut()?.set_method_override(HttpMethod::Put);
        }

        let endpoint = self.full_endpoint();
        let cookie_jar = shared.settings.borrow().cookie_jar.clone();
        let http_request = {
            let bag = shared.params.borrow();
            request::build_request(&self.context(), &endpoint, call, &bag, &cookie_jar)?
        };
        tracing::debug!(
            method = %http_request.method,
            url = %http_request.url,
            headers = ?http_request.headers,
            "prepared request"
        );

        shared.executor_mut()?.execute(http_request)
    }
}
