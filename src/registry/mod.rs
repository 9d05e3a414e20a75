//! Service registry model and reconciliation
//!
//! This module holds the data model shared by every reconciliation step and
//! the [`RegistryClient`] seam that the concrete AWS client implements.
//!
//! # Module Structure
//!
//! - [`search`] - Paginated lookup of a service by name within a namespace
//! - [`reconcile`] - Find-or-create and delete
//! - [`identity`] - ARN/Id extraction from found or created services
//!
//! # Example
//!
//! ```ignore
//! use cloudmap_service::registry::{reconcile, RegistryClient};
//!
//! async fn example(client: &impl RegistryClient, request: &ServiceRequest) -> anyhow::Result<()> {
//!     let outcome = reconcile::create_or_find(client, request).await?;
//!     let identity = outcome.identity()?;
//!     println!("{}", identity.id);
//!     Ok(())
//! }
//! ```

pub mod identity;
pub mod reconcile;
pub mod search;

pub use identity::{ServiceIdentity, ServiceOutcome};
pub use reconcile::{create_or_find, delete};
pub use search::find_service;

use crate::error::ServiceError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Routing type of a service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServiceType {
    Http,
    DnsHttp,
    Dns,
}

impl FromStr for ServiceType {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "HTTP" => Ok(Self::Http),
            "DNS_HTTP" => Ok(Self::DnsHttp),
            "DNS" => Ok(Self::Dns),
            other => Err(ServiceError::validation(
                "type",
                format!("Invalid type: {other} (expected one of HTTP, DNS_HTTP, DNS)"),
            )),
        }
    }
}

impl fmt::Display for ServiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Http => "HTTP",
            Self::DnsHttp => "DNS_HTTP",
            Self::Dns => "DNS",
        };
        f.write_str(s)
    }
}

/// A resource tag. Accepts both `{key, value}` and `{Key, Value}` on input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    #[serde(rename = "Key", alias = "key")]
    pub key: String,
    #[serde(rename = "Value", alias = "value")]
    pub value: String,
}

/// Where the effective namespace id was given
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NamespaceSource {
    /// The `namespace-id` input
    Input(String),
    /// `NamespaceId` inside `dns-config`
    DnsConfig(String),
}

impl NamespaceSource {
    pub fn id(&self) -> &str {
        match self {
            Self::Input(id) | Self::DnsConfig(id) => id,
        }
    }
}

/// Desired service, built once from the invocation inputs
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceRequest {
    pub name: String,
    pub description: Option<String>,
    pub namespace: NamespaceSource,
    pub dns_config: Option<Value>,
    pub health_check_config: Option<Value>,
    pub health_check_custom_config: Option<Value>,
    pub tags: Option<Vec<Tag>>,
    pub service_type: Option<ServiceType>,
}

impl ServiceRequest {
    /// Effective namespace id used for searching
    pub fn namespace_id(&self) -> &str {
        self.namespace.id()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteRequest {
    pub id: String,
}

/// Body of a CreateService call: only the properties the operation accepts
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreateServiceInput {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dns_config: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub health_check_config: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub health_check_custom_config: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<Tag>>,
    #[serde(rename = "Type", skip_serializing_if = "Option::is_none")]
    pub service_type: Option<ServiceType>,
}

impl From<&ServiceRequest> for CreateServiceInput {
    fn from(request: &ServiceRequest) -> Self {
        // A namespace given inside DnsConfig travels there, not at the top level
        let namespace_id = match &request.namespace {
            NamespaceSource::Input(id) => Some(id.clone()),
            NamespaceSource::DnsConfig(_) => None,
        };

        Self {
            name: request.name.clone(),
            description: request.description.clone(),
            dns_config: request.dns_config.clone(),
            health_check_config: request.health_check_config.clone(),
            health_check_custom_config: request.health_check_custom_config.clone(),
            namespace_id,
            tags: request.tags.clone(),
            service_type: request.service_type,
        }
    }
}

/// A service as the registry reports it. Fields we do not model are kept
/// in `extra` so the raw response can be echoed back unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ServiceRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arn: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "Type", default, skip_serializing_if = "Option::is_none")]
    pub service_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dns_config: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health_check_config: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health_check_custom_config: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One page of a ListServices call
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ServicePage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub services: Option<Vec<ServiceRecord>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_token: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Response of a CreateService call
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreateServiceOutput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<ServiceRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseMetadata {
    pub http_status_code: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

/// Response of a DeleteService call. The body is empty; only the
/// response metadata carries information.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteServiceOutput {
    #[serde(rename = "$metadata")]
    pub metadata: ResponseMetadata,
}

/// Registry payload as JSON text, for error messages that carry the raw response
pub(crate) fn raw_json<T: Serialize>(value: &T) -> Result<String, ServiceError> {
    serde_json::to_string(value)
        .map_err(|e| ServiceError::Registry(format!("Failed to encode response: {}", e)))
}

/// The three registry calls the reconciler depends on
#[async_trait]
pub trait RegistryClient: Send + Sync {
    /// List services in a namespace, one page at a time
    async fn list_services(
        &self,
        namespace_id: &str,
        next_token: Option<&str>,
    ) -> Result<ServicePage, ServiceError>;

    async fn create_service(
        &self,
        input: &CreateServiceInput,
    ) -> Result<CreateServiceOutput, ServiceError>;

    async fn delete_service(&self, id: &str) -> Result<DeleteServiceOutput, ServiceError>;
}
