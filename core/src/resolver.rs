//! Name-based model resolution.
//!
//! Top-level lookups (`Client::model`) fail hard with `ModelNotFound`.
//! Nested lookups (field access, `new<Field>`/`create<Field>` calls) are soft:
//! a miss yields `None`. Either way a successful resolution clears the
//! shared bag's per-call state before the new model exists, so nothing queued
//! for an earlier call leaks into the new model's first request.

use std::rc::Rc;

use crate::client::Shared;
use crate::context::RequestContext;
use crate::error::ApiError;
use crate::model::{Model, ParentLink};
use crate::registry::ModelDefinition;

pub(crate) fn resolve_root(shared: &Rc<Shared>, name: &str) -> Result<Model, ApiError> {
    let Some((type_name, definition)) = shared.registry.instantiate(None, name) else {
        return Err(ApiError::ModelNotFound(name.to_string()));
    };

    shared.params_mut()?.reset();

    let mut context = context_for(&definition);
    {
        let settings = shared.settings.borrow();
        context.debug = settings.debug;
        context.cookies = settings.cookies;
    }

    tracing::debug!(model = %type_name, "created model instance");
    Ok(Model::new(type_name, definition, context, Rc::downgrade(shared), None))
}

pub(crate) fn resolve_nested(parent: &Model, name: &str) -> Result<Option<Model>, ApiError> {
    let shared = parent.shared()?;
    let parent_type = parent.type_name();
    let Some((type_name, definition)) = shared.registry.instantiate(Some(&parent_type), name) else {
        tracing::trace!(parent = %parent_type, name, "no sub-model");
        return Ok(None);
    };

    shared.params_mut()?.reset();

    let mut context = context_for(&definition);
    parent.context().copy_to(&mut context);
    let link = ParentLink::new(parent);

    tracing::debug!(model = %type_name, parent = %parent_type, "created sub-model instance");
    Ok(Some(Model::new(
        type_name,
        definition,
        context,
        Rc::downgrade(&shared),
        Some(link),
    )))
}

fn context_for(definition: &ModelDefinition) -> RequestContext {
    RequestContext {
        endpoint: definition.endpoint.clone(),
        endpoint_individual: definition.endpoint_individual,
        http_auth: definition.http_auth,
        ..RequestContext::default()
    }
}
