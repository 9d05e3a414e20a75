//! Cloud Map Client
//!
//! Implements the registry operations on top of the signed HTTP client.

use super::credentials::{load_credentials, Credentials};
use super::http::{AwsHttpClient, AwsResponse};
use crate::config::Config;
use crate::error::ServiceError;
use crate::registry::{
    CreateServiceInput, CreateServiceOutput, DeleteServiceOutput, RegistryClient, ResponseMetadata,
    ServicePage,
};
use anyhow::Result;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// SigV4 signing name of Cloud Map
pub const SIGNING_NAME: &str = "servicediscovery";

/// `X-Amz-Target` prefix of the Cloud Map JSON API
const TARGET_PREFIX: &str = "Route53AutoNaming_v20170314";

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct ServiceFilter<'a> {
    name: &'static str,
    values: Vec<&'a str>,
    condition: &'static str,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct ListServicesInput<'a> {
    filters: Vec<ServiceFilter<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    next_token: Option<&'a str>,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct DeleteServiceInput<'a> {
    id: &'a str,
}

/// Cloud Map client
#[derive(Clone)]
pub struct ServiceDiscoveryClient {
    http: AwsHttpClient,
}

impl ServiceDiscoveryClient {
    pub fn new(config: &Config, credentials: Credentials) -> Result<Self> {
        let http = AwsHttpClient::new(
            credentials,
            &config.region,
            &config.endpoint(),
            SIGNING_NAME,
            &config.user_agent,
        )?;

        Ok(Self { http })
    }

    /// Create a client with credentials for the configured profile
    pub fn from_config(config: &Config) -> Result<Self> {
        let credentials = load_credentials(&config.profile)?;
        Self::new(config, credentials)
    }

    pub fn endpoint(&self) -> &str {
        self.http.endpoint()
    }

    async fn call<I: Serialize>(&self, operation: &str, input: &I) -> Result<AwsResponse, ServiceError> {
        let body = serde_json::to_string(input).map_err(|e| {
            ServiceError::Registry(format!("Failed to encode {} request: {}", operation, e))
        })?;
        let target = format!("{}.{}", TARGET_PREFIX, operation);

        Ok(self.http.json_request(&target, &body).await?)
    }
}

fn decode<T: DeserializeOwned>(operation: &str, response: &AwsResponse) -> Result<T, ServiceError> {
    serde_json::from_str(&response.body).map_err(|e| {
        ServiceError::Registry(format!(
            "Failed to parse {} response: {}: {}",
            operation, e, response.body
        ))
    })
}

#[async_trait]
impl RegistryClient for ServiceDiscoveryClient {
    async fn list_services(
        &self,
        namespace_id: &str,
        next_token: Option<&str>,
    ) -> Result<ServicePage, ServiceError> {
        let input = ListServicesInput {
            filters: vec![ServiceFilter {
                name: "NAMESPACE_ID",
                values: vec![namespace_id],
                condition: "EQ",
            }],
            next_token,
        };

        let response = self.call("ListServices", &input).await?;
        decode("ListServices", &response)
    }

    async fn create_service(
        &self,
        input: &CreateServiceInput,
    ) -> Result<CreateServiceOutput, ServiceError> {
        let response = self.call("CreateService", input).await?;
        decode("CreateService", &response)
    }

    async fn delete_service(&self, id: &str) -> Result<DeleteServiceOutput, ServiceError> {
        let response = self.call("DeleteService", &DeleteServiceInput { id }).await?;

        Ok(DeleteServiceOutput {
            metadata: ResponseMetadata {
                http_status_code: response.status,
                request_id: response.request_id,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_list_input_shape() {
        let input = ListServicesInput {
            filters: vec![ServiceFilter {
                name: "NAMESPACE_ID",
                values: vec!["ns-1"],
                condition: "EQ",
            }],
            next_token: None,
        };

        assert_eq!(
            serde_json::to_value(&input).unwrap(),
            json!({"Filters": [{"Name": "NAMESPACE_ID", "Values": ["ns-1"], "Condition": "EQ"}]})
        );
    }

    #[test]
    fn test_list_input_with_token() {
        let input = ListServicesInput {
            filters: vec![],
            next_token: Some("abc"),
        };
        assert_eq!(serde_json::to_value(&input).unwrap()["NextToken"], "abc");
    }

    #[test]
    fn test_decode_failure_is_registry_error() {
        let response = AwsResponse {
            status: 200,
            request_id: None,
            body: "<html>".to_string(),
        };

        let err = decode::<ServicePage>("ListServices", &response).unwrap_err();
        assert_eq!(err.kind(), "RegistryError");
        assert!(err.to_string().contains("<html>"));
    }
}
