//! Invocation parameters
//!
//! Turns the raw, string-valued inputs of a workflow step into a typed
//! [`Request`]. Inputs come from an [`InputProvider`] so the caller decides
//! where they are read from (environment, command line, a test map).

use crate::error::ServiceError;
use crate::registry::{DeleteRequest, NamespaceSource, ServiceRequest, ServiceType, Tag};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use std::str::FromStr;

pub const NAME: &str = "name";
pub const DESCRIPTION: &str = "description";
pub const NAMESPACE_ID: &str = "namespace-id";
pub const TYPE: &str = "type";
pub const ACTION: &str = "action";
pub const ID: &str = "id";
pub const DNS_CONFIG: &str = "dns-config";
pub const HEALTH_CHECK_CONFIG: &str = "health-check-config";
pub const HEALTH_CHECK_CUSTOM_CONFIG: &str = "health-check-custom-config";
pub const TAGS: &str = "tags";

/// Source of named string inputs
pub trait InputProvider {
    /// Raw value of an input, `None` when it was not supplied
    fn get_input(&self, name: &str) -> Option<String>;
}

/// Reads workflow inputs from `INPUT_<NAME>` environment variables
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvInputs;

impl EnvInputs {
    fn variable_name(name: &str) -> String {
        format!("INPUT_{}", name.replace(' ', "_").to_uppercase())
    }
}

impl InputProvider for EnvInputs {
    fn get_input(&self, name: &str) -> Option<String> {
        std::env::var(Self::variable_name(name))
            .ok()
            .map(|v| v.trim().to_string())
    }
}

impl InputProvider for HashMap<String, String> {
    fn get_input(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}

/// Consults each provider in order and returns the first non-empty value
pub struct LayeredInputs<'a> {
    layers: Vec<&'a dyn InputProvider>,
}

impl<'a> LayeredInputs<'a> {
    pub fn new(layers: Vec<&'a dyn InputProvider>) -> Self {
        Self { layers }
    }
}

impl InputProvider for LayeredInputs<'_> {
    fn get_input(&self, name: &str) -> Option<String> {
        self.layers
            .iter()
            .find_map(|layer| layer.get_input(name).filter(|v| !v.is_empty()))
    }
}

/// Requested operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Create,
    Delete,
}

impl FromStr for Action {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "create" => Ok(Self::Create),
            "delete" => Ok(Self::Delete),
            other => Err(ServiceError::validation(
                ACTION,
                format!("Invalid action: {other} (expected `create` or `delete`)"),
            )),
        }
    }
}

/// A fully validated invocation
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    Create(ServiceRequest),
    Delete(DeleteRequest),
}

/// Non-empty value of an input. Empty and absent are the same thing.
fn input(inputs: &dyn InputProvider, name: &str) -> Option<String> {
    inputs.get_input(name).filter(|v| !v.is_empty())
}

fn json_input<T: DeserializeOwned>(
    inputs: &dyn InputProvider,
    name: &'static str,
) -> Result<Option<T>, ServiceError> {
    let Some(raw) = input(inputs, name) else {
        return Ok(None);
    };

    serde_json::from_str(&raw).map(Some).map_err(|e| {
        ServiceError::validation(name, format!("Invalid JSON for {}: {}: {}", name, e, raw))
    })
}

/// Pick the namespace id from exactly one of the `namespace-id` input and
/// `NamespaceId` inside `dns-config`.
pub fn resolve_namespace(
    namespace_id: Option<&str>,
    dns_config: Option<&Value>,
) -> Result<NamespaceSource, ServiceError> {
    let root = namespace_id.filter(|id| !id.is_empty());
    // Any non-null, non-empty value counts as set, whatever its type
    let nested = dns_config
        .and_then(|config| config.get("NamespaceId"))
        .filter(|id| !id.is_null() && id.as_str() != Some(""));

    match (root, nested) {
        (Some(id), None) => Ok(NamespaceSource::Input(id.to_string())),
        (None, Some(Value::String(id))) => Ok(NamespaceSource::DnsConfig(id.clone())),
        (None, Some(other)) => Err(ServiceError::validation(
            DNS_CONFIG,
            format!("`NamespaceId` in `dns-config` must be a string, got: {}", other),
        )),
        (Some(_), Some(_)) => Err(ServiceError::validation(
            NAMESPACE_ID,
            "`namespace-id` must be defined either as an input, or as part of `dns-config` (not both).",
        )),
        (None, None) => Err(ServiceError::validation(
            NAMESPACE_ID,
            "`namespace-id` must be defined either as an input, or as part of `dns-config`.",
        )),
    }
}

/// Build the request described by `inputs`
pub fn normalize(inputs: &dyn InputProvider) -> Result<Request, ServiceError> {
    let action = match input(inputs, ACTION) {
        Some(action) => action.parse()?,
        None => Action::Create,
    };

    tracing::debug!("Normalizing inputs for action {:?}", action);

    match action {
        Action::Create => normalize_service(inputs).map(Request::Create),
        Action::Delete => normalize_delete(inputs).map(Request::Delete),
    }
}

fn normalize_service(inputs: &dyn InputProvider) -> Result<ServiceRequest, ServiceError> {
    let dns_config: Option<Value> = json_input(inputs, DNS_CONFIG)?;
    let health_check_config = json_input(inputs, HEALTH_CHECK_CONFIG)?;
    let health_check_custom_config = json_input(inputs, HEALTH_CHECK_CUSTOM_CONFIG)?;
    let tags: Option<Vec<Tag>> = json_input(inputs, TAGS)?;

    let namespace = resolve_namespace(
        input(inputs, NAMESPACE_ID).as_deref(),
        dns_config.as_ref(),
    )?;

    let name = input(inputs, NAME).ok_or_else(|| {
        ServiceError::validation(NAME, "`name` is required to find or create a service.")
    })?;

    let service_type = input(inputs, TYPE)
        .map(|t| t.parse::<ServiceType>())
        .transpose()?;

    Ok(ServiceRequest {
        name,
        description: input(inputs, DESCRIPTION),
        namespace,
        dns_config,
        health_check_config,
        health_check_custom_config,
        tags,
        service_type,
    })
}

fn normalize_delete(inputs: &dyn InputProvider) -> Result<DeleteRequest, ServiceError> {
    let id = input(inputs, ID)
        .ok_or_else(|| ServiceError::validation(ID, "`id` is required to delete a service."))?;

    Ok(DeleteRequest { id })
}
