//! Error taxonomy
//!
//! Every failure the reconciliation core can produce is a [`ServiceError`].
//! Only [`ServiceError::NotFound`] is ever recovered from (by the create path);
//! everything else travels unchanged to the invocation boundary, where
//! [`failure_message`] renders it for the workflow log.

use thiserror::Error;

/// Failure surfaced by the registry transport: network errors, signing
/// errors and non-2xx API responses.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct TransportError {
    /// AWS error type name (e.g. `AccessDeniedException`), without namespace prefix
    pub name: String,
    /// HTTP status code, when a response was received at all
    pub status: Option<u16>,
    pub message: String,
}

impl TransportError {
    pub fn new(name: impl Into<String>, status: Option<u16>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status,
            message: message.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ServiceError {
    /// Malformed or conflicting input. The message always names the field.
    #[error("{message}")]
    Validation { field: &'static str, message: String },

    /// No service with this name exists in the namespace
    #[error("Service with Name: {name} not found.")]
    NotFound { name: String },

    /// A call succeeded but returned a shape we cannot use
    #[error("{0}")]
    Registry(String),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl ServiceError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }

    /// Error kind as reported to the workflow
    pub fn kind(&self) -> &str {
        match self {
            Self::Validation { .. } => "ValidationError",
            Self::NotFound { .. } => "NotFoundException",
            Self::Registry(_) => "RegistryError",
            Self::Transport(err) => &err.name,
        }
    }

    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Transport(err) => err.status,
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Render a failure as `<ErrorKind> (Status code: <code>): <message>`.
///
/// Errors that did not originate in the reconciliation core (configuration,
/// credentials, output files) are reported with the generic kind `Error`.
pub fn failure_message(error: &anyhow::Error) -> String {
    let service_error = error
        .chain()
        .find_map(|cause| cause.downcast_ref::<ServiceError>());

    let (kind, status) = match service_error {
        Some(err) => (err.kind().to_string(), err.status_code()),
        None => ("Error".to_string(), None),
    };

    let status = status
        .map(|code| code.to_string())
        .unwrap_or_else(|| "undefined".to_string());

    format!("{} (Status code: {}): {:#}", kind, status, error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn test_transport_failure_includes_status_code() {
        let err: anyhow::Error = ServiceError::from(TransportError::new(
            "AccessDeniedException",
            Some(400),
            "User is not authorized",
        ))
        .into();

        assert_eq!(
            failure_message(&err),
            "AccessDeniedException (Status code: 400): User is not authorized"
        );
    }

    #[test]
    fn test_validation_failure_has_undefined_status() {
        let err: anyhow::Error = ServiceError::validation("action", "Invalid action: update").into();

        assert_eq!(
            failure_message(&err),
            "ValidationError (Status code: undefined): Invalid action: update"
        );
    }

    #[test]
    fn test_not_found_kind() {
        let err = ServiceError::NotFound {
            name: "web".to_string(),
        };
        assert!(err.is_not_found());
        assert_eq!(err.kind(), "NotFoundException");
        assert_eq!(err.to_string(), "Service with Name: web not found.");
    }

    #[test]
    fn test_plain_error_reports_generic_kind() {
        let err = anyhow::anyhow!("No AWS region configured");
        assert_eq!(
            failure_message(&err),
            "Error (Status code: undefined): No AWS region configured"
        );
    }

    #[test]
    fn test_context_keeps_service_error_kind() {
        let result: Result<(), ServiceError> = Err(ServiceError::Registry("bad shape".into()));
        let err = result.context("Failed to reconcile service").unwrap_err();

        let message = failure_message(&err);
        assert!(message.starts_with("RegistryError (Status code: undefined): "));
        assert!(message.contains("bad shape"));
    }
}
