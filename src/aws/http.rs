//! HTTP utilities for signed AWS JSON 1.1 calls

use super::credentials::Credentials;
use crate::error::TransportError;
use anyhow::{Context, Result};
use aws_sigv4::http_request::{sign, SignableBody, SignableRequest, SigningSettings};
use aws_sigv4::sign::v4::SigningParams;
use aws_smithy_runtime_api::client::identity::Identity;
use reqwest::Client;
use serde_json::Value;
use std::time::SystemTime;
use tracing::{debug, trace};

const JSON_CONTENT_TYPE: &str = "application/x-amz-json-1.1";

/// Maximum length of response body to log (to avoid logging sensitive data)
const MAX_LOG_BODY_LENGTH: usize = 200;

/// Sanitize response body for logging
/// Truncates long responses and drops control characters
fn sanitize_for_log(body: &str) -> String {
    let truncated = if body.chars().count() > MAX_LOG_BODY_LENGTH {
        let head: String = body.chars().take(MAX_LOG_BODY_LENGTH).collect();
        format!("{}... [truncated, {} bytes total]", head, body.len())
    } else {
        body.to_string()
    };

    truncated.replace(|c: char| !c.is_ascii_graphic() && c != ' ', "")
}

/// Mask sensitive credential values for logging
fn mask_credential(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    if chars.len() <= 8 {
        "*".repeat(chars.len())
    } else {
        let head: String = chars[..4].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{}...{}", head, tail)
    }
}

/// Successful (2xx) response
#[derive(Debug, Clone)]
pub struct AwsResponse {
    pub status: u16,
    pub request_id: Option<String>,
    pub body: String,
}

/// HTTP client wrapper for SigV4-signed AWS JSON calls
#[derive(Clone)]
pub struct AwsHttpClient {
    client: Client,
    credentials: Credentials,
    region: String,
    endpoint: url::Url,
    signing_name: &'static str,
}

impl AwsHttpClient {
    /// Create a new HTTP client
    pub fn new(
        credentials: Credentials,
        region: &str,
        endpoint: &str,
        signing_name: &'static str,
        user_agent: &str,
    ) -> Result<Self> {
        debug!(
            "Creating AWS HTTP client for region: {}, access_key: {}, endpoint: {}",
            region,
            mask_credential(&credentials.access_key_id),
            endpoint
        );

        let endpoint = url::Url::parse(endpoint)
            .with_context(|| format!("Invalid endpoint URL: {}", endpoint))?;

        let client = Client::builder()
            .user_agent(user_agent)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            credentials,
            region: region.to_string(),
            endpoint,
            signing_name,
        })
    }

    pub fn endpoint(&self) -> &str {
        self.endpoint.as_str()
    }

    /// Make a JSON protocol request: `POST /` with an `X-Amz-Target` header
    pub async fn json_request(
        &self,
        target: &str,
        body: &str,
    ) -> Result<AwsResponse, TransportError> {
        debug!("POST {} ({})", self.endpoint, target);
        trace!("JSON body: {}", body);

        let headers = self.signed_headers(target, body)?;

        let mut request = self.client.post(self.endpoint.as_str());
        for (name, value) in &headers {
            if name != "host" {
                request = request.header(name.as_str(), value.as_str());
            }
        }

        let response = request
            .body(body.to_string())
            .send()
            .await
            .map_err(|e| {
                TransportError::new("RequestError", None, format!("Failed to send request: {}", e))
            })?;

        let status = response.status().as_u16();
        let request_id = header_value(response.headers(), "x-amzn-requestid");
        let error_type = header_value(response.headers(), "x-amzn-errortype");
        let body = response.text().await.map_err(|e| {
            TransportError::new(
                "RequestError",
                Some(status),
                format!("Failed to read response body: {}", e),
            )
        })?;

        debug!("Response status: {}", status);

        if !(200..300).contains(&status) {
            // Security: Only log sanitized/truncated error body to avoid leaking sensitive data
            tracing::error!("API error: {} - {}", status, sanitize_for_log(&body));
            return Err(parse_error(status, error_type.as_deref(), &body));
        }

        Ok(AwsResponse {
            status,
            request_id,
            body,
        })
    }

    /// Headers for a signed JSON request, including the SigV4 ones
    fn signed_headers(
        &self,
        target: &str,
        body: &str,
    ) -> Result<Vec<(String, String)>, TransportError> {
        let host = match (self.endpoint.host_str(), self.endpoint.port()) {
            (Some(host), Some(port)) => format!("{}:{}", host, port),
            (Some(host), None) => host.to_string(),
            (None, _) => return Err(signing_error("endpoint has no host")),
        };

        let mut headers = vec![
            ("host".to_string(), host),
            ("content-type".to_string(), JSON_CONTENT_TYPE.to_string()),
            ("x-amz-target".to_string(), target.to_string()),
        ];

        let creds = aws_credential_types::Credentials::new(
            &self.credentials.access_key_id,
            &self.credentials.secret_access_key,
            self.credentials.session_token.clone(),
            None,
            "cloudmap-service",
        );
        let identity: Identity = creds.into();

        let signing_params = SigningParams::builder()
            .identity(&identity)
            .region(&self.region)
            .name(self.signing_name)
            .time(SystemTime::now())
            .settings(SigningSettings::default())
            .build()
            .map_err(signing_error)?
            .into();

        let signable_request = SignableRequest::new(
            "POST",
            self.endpoint.path(),
            headers.iter().map(|(k, v)| (k.as_str(), v.as_str())),
            SignableBody::Bytes(body.as_bytes()),
        )
        .map_err(signing_error)?;

        let (instructions, _signature) = sign(signable_request, &signing_params)
            .map_err(signing_error)?
            .into_parts();

        for (name, value) in instructions.headers() {
            headers.push((name.to_lowercase(), value.to_string()));
        }

        Ok(headers)
    }
}

fn signing_error(e: impl std::fmt::Display) -> TransportError {
    TransportError::new("SigningError", None, format!("Failed to sign request: {}", e))
}

fn header_value(headers: &reqwest::header::HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string())
}

/// Strip the namespace (`com.amazonaws.servicediscovery#`) and any
/// trailing `:http://...` suffix from an AWS error type
fn error_name(raw: &str) -> &str {
    let raw = raw.split(':').next().unwrap_or(raw);
    raw.rsplit('#').next().unwrap_or(raw)
}

/// Build a transport error from a non-2xx response
fn parse_error(status: u16, error_type: Option<&str>, body: &str) -> TransportError {
    let json: Option<Value> = serde_json::from_str(body).ok();

    let name = error_type
        .or_else(|| json.as_ref().and_then(|j| j.get("__type")).and_then(Value::as_str))
        .map(error_name)
        .filter(|n| !n.is_empty())
        .unwrap_or("UnknownError")
        .to_string();

    let message = json
        .as_ref()
        .and_then(|j| j.get("message").or_else(|| j.get("Message")))
        .and_then(Value::as_str)
        .map(|m| m.to_string())
        .unwrap_or_else(|| format!("AWS request failed ({})", status));

    TransportError::new(name, Some(status), message)
}
