//! Model definitions and the name → factory registry.
//!
//! # Design
//! Models are found by name at runtime: `client.model("user_profile")` looks
//! for a registered type called `<namespace>::models::UserProfile`, and a
//! field access on a model of type `T` looks for `T::Field`, then `TField`.
//! The registry makes that lookup explicit: every model type is registered
//! at startup under its full name together with a factory producing a fresh
//! `ModelDefinition` for each instance.

use std::collections::HashMap;
use std::fmt;

use serde_json::Value;

use crate::case;
use crate::error::ApiError;
use crate::model::{FieldValue, Model};

/// Custom getter used by `get<Field>` calls.
pub type Getter = fn(&Model) -> Result<Option<FieldValue>, ApiError>;
/// Custom setter used by `set<Field>` calls.
pub type Setter = fn(&Model, Value) -> Result<(), ApiError>;
/// Produces the definition of a new model instance.
pub type ModelFactory = Box<dyn Fn() -> ModelDefinition>;

/// Declared shape of a model: its endpoint, its fields and its accessor
/// overrides.
#[derive(Clone, Default)]
pub struct ModelDefinition {
    pub endpoint: Option<String>,
    pub endpoint_individual: bool,
    pub http_auth: bool,
    pub fields: Vec<String>,
    pub custom_fields: Vec<String>,
    pub getters: HashMap<String, Getter>,
    pub setters: HashMap<String, Setter>,
}

impl fmt::Debug for ModelDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelDefinition")
            .field("endpoint", &self.endpoint)
            .field("endpoint_individual", &self.endpoint_individual)
            .field("http_auth", &self.http_auth)
            .field("fields", &self.fields)
            .field("custom_fields", &self.custom_fields)
            .field("getters", &self.getters.keys().collect::<Vec<_>>())
            .field("setters", &self.setters.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl ModelDefinition {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Do not prefix this model's endpoint with its parent's.
    pub fn individual(mut self) -> Self {
        self.endpoint_individual = true;
        self
    }

    /// Send the bag's login and password as HTTP basic auth.
    pub fn http_auth(mut self) -> Self {
        self.http_auth = true;
        self
    }

    pub fn fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields.extend(fields.into_iter().map(Into::into));
        self
    }

    /// Fields accepted in addition to the declared ones (account-specific
    /// custom fields and the like).
    pub fn custom_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.custom_fields.extend(fields.into_iter().map(Into::into));
        self
    }

    pub fn getter(mut self, field: impl Into<String>, getter: Getter) -> Self {
        self.getters.insert(field.into(), getter);
        self
    }

    pub fn setter(mut self, field: impl Into<String>, setter: Setter) -> Self {
        self.setters.insert(field.into(), setter);
        self
    }

    pub fn declares(&self, field: &str) -> bool {
        self.fields.iter().any(|f| f == field) || self.custom_fields.iter().any(|f| f == field)
    }
}

/// Registered model types of one API namespace.
pub struct ModelRegistry {
    namespace: String,
    factories: HashMap<String, ModelFactory>,
}

impl fmt::Debug for ModelRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.factories.keys().collect();
        names.sort();
        f.debug_struct("ModelRegistry")
            .field("namespace", &self.namespace)
            .field("types", &names)
            .finish()
    }
}

impl ModelRegistry {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            factories: HashMap::new(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Register `factory` under the full type name `type_name`.
    pub fn register(
        &mut self,
        type_name: impl Into<String>,
        factory: impl Fn() -> ModelDefinition + 'static,
    ) -> &mut Self {
        self.factories.insert(type_name.into(), Box::new(factory));
        self
    }

    /// Register a fixed definition; every instance gets a clone.
    pub fn define(&mut self, type_name: impl Into<String>, definition: ModelDefinition) -> &mut Self {
        self.register(type_name, move || definition.clone())
    }

    /// Register a top-level model: `User` becomes `<namespace>::models::User`.
    pub fn define_root(&mut self, camel_name: &str, definition: ModelDefinition) -> &mut Self {
        let type_name = format!("{}::models::{camel_name}", self.namespace);
        self.define(type_name, definition)
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.factories.contains_key(type_name)
    }

    /// Candidate type names for `name`, in lookup order. Without a current
    /// type this is the top-level candidate; from a model of type `current`
    /// it is the namespaced child followed by the prefixed child.
    pub fn candidates(&self, current: Option<&str>, name: &str) -> Vec<String> {
        let camel = case::upper_camel_case(name);
        match current {
            None => vec![format!("{}::models::{camel}", self.namespace)],
            Some(current) => vec![format!("{current}::{camel}"), format!("{current}{camel}")],
        }
    }

    /// First candidate that is registered, with a fresh definition.
    pub fn instantiate(&self, current: Option<&str>, name: &str) -> Option<(String, ModelDefinition)> {
        self.candidates(current, name)
            .into_iter()
            .find_map(|type_name| {
                let factory = self.factories.get(&type_name)?;
                Some((type_name, factory()))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> ModelRegistry {
        let mut registry = ModelRegistry::new("shop");
        registry
            .define_root("User", ModelDefinition::new().endpoint("/user").fields(["id", "name"]))
            .define("shop::models::User::Profile", ModelDefinition::new().endpoint("/profile"))
            .define("shop::models::UserProfile", ModelDefinition::new().endpoint("/prefixed"))
            .define("shop::models::UserOrders", ModelDefinition::new().endpoint("/orders"));
        registry
    }

    #[test]
    fn top_level_candidate_uses_namespace() {
        let registry = registry();
        assert_eq!(registry.candidates(None, "user_account"), ["shop::models::UserAccount"]);
        let (name, def) = registry.instantiate(None, "user").unwrap();
        assert_eq!(name, "shop::models::User");
        assert_eq!(def.endpoint.as_deref(), Some("/user"));
    }

    #[test]
    fn nested_candidates_prefer_the_namespaced_child() {
        let registry = registry();
        assert_eq!(
            registry.candidates(Some("shop::models::User"), "profile"),
            ["shop::models::User::Profile", "shop::models::UserProfile"]
        );
        let (name, _) = registry.instantiate(Some("shop::models::User"), "profile").unwrap();
        assert_eq!(name, "shop::models::User::Profile");
    }

    #[test]
    fn nested_lookup_falls_back_to_the_prefixed_child() {
        let (name, def) = registry()
            .instantiate(Some("shop::models::User"), "orders")
            .unwrap();
        assert_eq!(name, "shop::models::UserOrders");
        assert_eq!(def.endpoint.as_deref(), Some("/orders"));
    }

    #[test]
    fn unknown_names_resolve_to_nothing() {
        let registry = registry();
        assert!(registry.instantiate(None, "invoice").is_none());
        assert!(registry.instantiate(Some("shop::models::User"), "invoice").is_none());
    }

    #[test]
    fn declares_checks_custom_fields_too() {
        let def = ModelDefinition::new().fields(["id"]).custom_fields(["cf_42"]);
        assert!(def.declares("id"));
        assert!(def.declares("cf_42"));
        assert!(!def.declares("name"));
    }

    #[test]
    fn factories_produce_fresh_definitions() {
        let mut registry = ModelRegistry::new("shop");
        registry.register("shop::models::Counter", || {
            ModelDefinition::new().fields(["n"]).endpoint("/counter")
        });
        let (_, first) = registry.instantiate(None, "counter").unwrap();
        let (_, second) = registry.instantiate(None, "counter").unwrap();
        assert_eq!(first.fields, second.fields);
        assert!(registry.contains("shop::models::Counter"));
    }
}
