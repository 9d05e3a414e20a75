//! Integration tests for the Cloud Map client using wiremock
//!
//! These tests drive complete reconciliations against a mocked Cloud Map
//! endpoint, checking the calls that reach the wire and the step outputs.

use cloudmap_service::action::{self, RunResult};
use cloudmap_service::aws::client::ServiceDiscoveryClient;
use cloudmap_service::aws::credentials::Credentials;
use cloudmap_service::config::{Config, USER_AGENT};
use cloudmap_service::error::failure_message;
use cloudmap_service::params::{self, Request};
use cloudmap_service::registry::{self, RegistryClient};
use serde_json::json;
use std::collections::{BTreeMap, HashMap};
use wiremock::matchers::{body_partial_json, header, header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const LIST: &str = "Route53AutoNaming_v20170314.ListServices";
const CREATE: &str = "Route53AutoNaming_v20170314.CreateService";
const DELETE: &str = "Route53AutoNaming_v20170314.DeleteService";

fn client_for(server: &MockServer) -> ServiceDiscoveryClient {
    let config = Config {
        region: "us-east-1".to_string(),
        endpoint_url: Some(server.uri()),
        profile: "default".to_string(),
        user_agent: USER_AGENT.to_string(),
    };
    let credentials = Credentials {
        access_key_id: "AKIATESTKEY".to_string(),
        secret_access_key: "test-secret".to_string(),
        session_token: None,
    };
    ServiceDiscoveryClient::new(&config, credentials).expect("client should build")
}

fn request(pairs: &[(&str, &str)]) -> Request {
    let inputs: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    params::normalize(&inputs).expect("inputs should be valid")
}

fn service(name: &str, id: &str) -> serde_json::Value {
    json!({
        "Id": id,
        "Arn": format!("arn:aws:servicediscovery:us-east-1:1234567890:service/{id}"),
        "Name": name,
        "Type": "HTTP",
        "InstanceCount": 0
    })
}

/// Test module for find-or-create against a mocked endpoint
mod create_or_find_tests {
    use super::*;

    /// No matching service: one list call, one create call, outputs from the created ARN
    #[tokio::test]
    async fn test_creates_missing_service() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/"))
            .and(header("x-amz-target", LIST))
            .and(header("content-type", "application/x-amz-json-1.1"))
            .and(header("user-agent", USER_AGENT))
            .and(header_exists("authorization"))
            .and(body_partial_json(json!({
                "Filters": [{"Name": "NAMESPACE_ID", "Values": ["ns-1"], "Condition": "EQ"}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "Services": [service("other-service", "srv-other001")]
            })))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(header("x-amz-target", CREATE))
            .and(body_partial_json(json!({"Name": "my-service", "NamespaceId": "ns-1"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "Service": service("my-service", "srv-abc12345")
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let request = request(&[
            ("name", "my-service"),
            ("namespace-id", "ns-1"),
            ("action", "create"),
        ]);
        let mut outputs: BTreeMap<String, String> = BTreeMap::new();

        let result = action::execute(&client, &request, &mut outputs)
            .await
            .expect("reconcile should succeed");

        assert!(matches!(result, RunResult::Reconciled(ref outcome, _) if outcome.was_created()));
        assert_eq!(outputs["id"], "srv-abc12345");
        assert_eq!(
            outputs["arn"],
            "arn:aws:servicediscovery:us-east-1:1234567890:service/srv-abc12345"
        );
        let response: serde_json::Value = serde_json::from_str(&outputs["response"]).unwrap();
        assert_eq!(response["Service"]["InstanceCount"], 0);
    }

    /// Existing service on the second page: two list calls, no create call
    #[tokio::test]
    async fn test_finds_service_on_later_page() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(header("x-amz-target", LIST))
            .and(body_partial_json(json!({"NextToken": "token-page-2"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "Services": [service("my-service", "srv-found001")]
            })))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(header("x-amz-target", LIST))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "Services": [service("api", "srv-api00001")],
                "NextToken": "token-page-2"
            })))
            .up_to_n_times(1)
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(header("x-amz-target", CREATE))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let request = request(&[("name", "my-service"), ("namespace-id", "ns-1")]);
        let mut outputs: BTreeMap<String, String> = BTreeMap::new();

        action::execute(&client, &request, &mut outputs)
            .await
            .expect("reconcile should succeed");

        assert_eq!(outputs["id"], "srv-found001");
        let response: serde_json::Value = serde_json::from_str(&outputs["response"]).unwrap();
        assert_eq!(response["Name"], "my-service");
    }

    /// A missing Services array fails without creating anything
    #[tokio::test]
    async fn test_malformed_listing_is_registry_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(header("x-amz-target", LIST))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"Unexpected": true})))
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(header("x-amz-target", CREATE))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let request = request(&[("name", "my-service"), ("namespace-id", "ns-1")]);
        let mut outputs: BTreeMap<String, String> = BTreeMap::new();

        let err = action::execute(&client, &request, &mut outputs)
            .await
            .unwrap_err();

        let message = failure_message(&err);
        assert!(message.starts_with("RegistryError (Status code: undefined): Error searching for Service"));
        assert!(message.contains("Unexpected"));
        assert!(outputs.is_empty());
    }

    /// Namespace given inside DnsConfig is searched and sent inside DnsConfig only
    #[tokio::test]
    async fn test_namespace_from_dns_config() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(header("x-amz-target", LIST))
            .and(body_partial_json(json!({
                "Filters": [{"Name": "NAMESPACE_ID", "Values": ["ns-dns"], "Condition": "EQ"}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"Services": []})))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(header("x-amz-target", CREATE))
            .and(body_partial_json(json!({
                "DnsConfig": {"NamespaceId": "ns-dns"},
                "Tags": [{"Key": "env", "Value": "ci"}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "Service": service("dns-service", "srv-dns00001")
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let request = request(&[
            ("name", "dns-service"),
            (
                "dns-config",
                r#"{"NamespaceId": "ns-dns", "DnsRecords": [{"TTL": 10, "Type": "SRV"}]}"#,
            ),
            ("tags", r#"[{"key": "env", "value": "ci"}]"#),
        ]);
        let mut outputs: BTreeMap<String, String> = BTreeMap::new();

        action::execute(&client, &request, &mut outputs)
            .await
            .expect("reconcile should succeed");

        let requests = server.received_requests().await.unwrap();
        let create_body: serde_json::Value = requests
            .iter()
            .find(|r| {
                r.headers
                    .get("x-amz-target")
                    .and_then(|v| v.to_str().ok())
                    == Some(CREATE)
            })
            .map(|r| serde_json::from_slice(&r.body).unwrap())
            .expect("create request should be sent");
        assert!(create_body.get("NamespaceId").is_none());
        assert_eq!(outputs["id"], "srv-dns00001");
    }
}

/// Test module for the delete path and error mapping
mod delete_and_error_tests {
    use super::*;

    /// 200 response: success, only `response` is set
    #[tokio::test]
    async fn test_delete_success() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(header("x-amz-target", DELETE))
            .and(body_partial_json(json!({"Id": "srv-abc12345"})))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("x-amzn-RequestId", "req-123")
                    .set_body_json(json!({})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let request = request(&[("action", "delete"), ("id", "srv-abc12345")]);
        let mut outputs: BTreeMap<String, String> = BTreeMap::new();

        action::execute(&client, &request, &mut outputs)
            .await
            .expect("delete should succeed");

        assert_eq!(outputs.len(), 1);
        let response: serde_json::Value = serde_json::from_str(&outputs["response"]).unwrap();
        assert_eq!(response["$metadata"]["httpStatusCode"], 200);
        assert_eq!(response["$metadata"]["requestId"], "req-123");
    }

    /// A 2xx status other than 200 is still a failed delete
    #[tokio::test]
    async fn test_delete_non_200_status_fails() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(header("x-amz-target", DELETE))
            .respond_with(ResponseTemplate::new(202))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = registry::delete(
            &client,
            &registry::DeleteRequest {
                id: "srv-abc12345".to_string(),
            },
        )
        .await
        .unwrap_err();

        assert_eq!(err.kind(), "RegistryError");
        assert!(err.to_string().contains("\"httpStatusCode\":202"));
    }

    /// API errors keep their AWS error name and status code
    #[tokio::test]
    async fn test_delete_api_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(header("x-amz-target", DELETE))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "__type": "com.amazonaws.servicediscovery#ResourceInUse",
                "Message": "Service srv-abc12345 has registered instances"
            })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let request = request(&[("action", "delete"), ("id", "srv-abc12345")]);
        let mut outputs: BTreeMap<String, String> = BTreeMap::new();

        let err = action::execute(&client, &request, &mut outputs)
            .await
            .unwrap_err();

        assert_eq!(
            failure_message(&err),
            "ResourceInUse (Status code: 400): Service srv-abc12345 has registered instances"
        );
        assert!(outputs.is_empty());
    }

    /// Test 403 from the list call propagates without a create
    #[tokio::test]
    async fn test_access_denied_on_list() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(header("x-amz-target", LIST))
            .respond_with(
                ResponseTemplate::new(403)
                    .insert_header("x-amzn-ErrorType", "AccessDeniedException:http://internal/")
                    .set_body_json(json!({"Message": "User is not authorized"})),
            )
            .expect(2)
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(header("x-amz-target", CREATE))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client.list_services("ns-1", None).await.unwrap_err();

        assert_eq!(err.kind(), "AccessDeniedException");
        assert_eq!(err.status_code(), Some(403));
        assert_eq!(err.to_string(), "User is not authorized");

        let Request::Create(service_request) = request(&[("name", "x"), ("namespace-id", "ns-1")])
        else {
            panic!("expected create request");
        };
        let err = registry::create_or_find(&client, &service_request)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "AccessDeniedException");
    }
}
