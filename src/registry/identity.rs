//! Service identity
//!
//! The found path yields a bare service record while the create path yields a
//! response wrapping one. [`ServiceOutcome`] keeps the two apart until the
//! identity is needed, and [`ServiceIdentity`] is what the caller reports.

use super::{raw_json, CreateServiceOutput, ServiceRecord};
use crate::error::ServiceError;
use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

const ARN_PATTERN: &str = r"^arn:aws:servicediscovery:[\w-]*:[0-9]*:service/(srv-\w+)";

fn arn_regex() -> Option<&'static Regex> {
    static ARN_REGEX: OnceLock<Option<Regex>> = OnceLock::new();
    ARN_REGEX
        .get_or_init(|| match Regex::new(ARN_PATTERN) {
            Ok(re) => Some(re),
            Err(e) => {
                tracing::error!("Invalid service ARN pattern {}: {}", ARN_PATTERN, e);
                None
            }
        })
        .as_ref()
}

/// Result of a find-or-create reconciliation
#[derive(Debug, Clone, PartialEq)]
pub enum ServiceOutcome {
    /// An existing service matched; nothing was changed
    Found(ServiceRecord),
    /// No service matched and one was created
    Created(CreateServiceOutput),
}

impl ServiceOutcome {
    pub fn record(&self) -> Option<&ServiceRecord> {
        match self {
            Self::Found(record) => Some(record),
            Self::Created(output) => output.service.as_ref(),
        }
    }

    pub fn was_created(&self) -> bool {
        matches!(self, Self::Created(_))
    }

    /// Raw response as returned by the registry
    pub fn to_response(&self) -> Result<Value, ServiceError> {
        let value = match self {
            Self::Found(record) => serde_json::to_value(record),
            Self::Created(output) => serde_json::to_value(output),
        };
        value.map_err(|e| ServiceError::Registry(format!("Failed to encode response: {}", e)))
    }

    pub fn identity(&self) -> Result<ServiceIdentity, ServiceError> {
        let arn = self
            .record()
            .and_then(|record| record.arn.as_deref())
            .filter(|arn| !arn.is_empty());

        match arn {
            Some(arn) => ServiceIdentity::from_arn(arn),
            None => Err(ServiceError::Registry(format!(
                "Unable to determine ARN: Response: {}",
                raw_json(&self.to_response()?)?
            ))),
        }
    }
}

/// Stable identity of a service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceIdentity {
    pub arn: String,
    /// Service id (`srv-...`) embedded in the ARN
    pub id: String,
}

impl ServiceIdentity {
    pub fn from_arn(arn: &str) -> Result<Self, ServiceError> {
        let id = arn_regex()
            .and_then(|re| re.captures(arn))
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
            .ok_or_else(|| {
                ServiceError::Registry(format!(
                    "ARN does not identify a Cloud Map service: {}",
                    arn
                ))
            })?;

        Ok(Self {
            arn: arn.to_string(),
            id,
        })
    }
}
