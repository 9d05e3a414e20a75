//! Reconciliation
//!
//! Brings the registry in line with a request: find-or-create for a
//! [`ServiceRequest`], removal for a [`DeleteRequest`].

use super::search::find_service;
use super::{
    raw_json, CreateServiceInput, DeleteRequest, DeleteServiceOutput, RegistryClient,
    ServiceOutcome, ServiceRequest,
};
use crate::error::ServiceError;

/// Return the service matching the request's name and namespace, creating
/// it only when no such service exists.
///
/// Only a not-found search result leads to a create call. Any other search
/// failure is returned as is.
pub async fn create_or_find<C: RegistryClient + ?Sized>(
    client: &C,
    request: &ServiceRequest,
) -> Result<ServiceOutcome, ServiceError> {
    match find_service(client, request.namespace_id(), &request.name).await {
        Ok(found) => {
            tracing::info!("Found {}", request.name);
            Ok(ServiceOutcome::Found(found))
        }
        Err(err) if err.is_not_found() => {
            tracing::info!("Unable to find {}. Creating newly.", request.name);
            let input = CreateServiceInput::from(request);
            let created = client.create_service(&input).await?;
            Ok(ServiceOutcome::Created(created))
        }
        Err(err) => Err(err),
    }
}

/// Delete the service with the request's id. Anything but a 200 response
/// is a failure.
pub async fn delete<C: RegistryClient + ?Sized>(
    client: &C,
    request: &DeleteRequest,
) -> Result<DeleteServiceOutput, ServiceError> {
    let response = client.delete_service(&request.id).await?;

    if response.metadata.http_status_code == 200 {
        tracing::info!("Successfully deleted service with Id: {}", request.id);
        Ok(response)
    } else {
        Err(ServiceError::Registry(format!(
            "Failed to delete service: {}",
            raw_json(&response)?
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportError;
    use crate::registry::testing::{record, request, FakeRegistry};

    #[tokio::test]
    async fn test_returns_existing_service_without_create() {
        let registry = FakeRegistry::with_pages(vec![vec![record("web", "srv-web00001")]]);

        let outcome = create_or_find(&registry, &request("web", "ns-1"))
            .await
            .unwrap();

        assert!(!outcome.was_created());
        assert_eq!(outcome.identity().unwrap().id, "srv-web00001");
        assert_eq!(registry.create_count(), 0);
    }

    #[tokio::test]
    async fn test_creates_when_missing() {
        let registry = FakeRegistry::with_pages(vec![vec![record("api", "srv-api00001")]]);

        let outcome = create_or_find(&registry, &request("web", "ns-1"))
            .await
            .unwrap();

        assert!(outcome.was_created());
        assert_eq!(registry.list_count(), 1);
        let created = registry.created.lock().unwrap().clone();
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].name, "web");
        assert_eq!(created[0].namespace_id.as_deref(), Some("ns-1"));
    }

    #[tokio::test]
    async fn test_search_failure_skips_create() {
        let registry = FakeRegistry {
            list_error: Some(TransportError::new(
                "NamespaceNotFound",
                Some(400),
                "Namespace not found",
            )),
            ..Default::default()
        };

        let err = create_or_find(&registry, &request("web", "ns-missing"))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), "NamespaceNotFound");
        assert_eq!(registry.create_count(), 0);
    }

    #[tokio::test]
    async fn test_malformed_listing_skips_create() {
        let registry = FakeRegistry::default();

        let err = create_or_find(&registry, &request("web", "ns-1"))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), "RegistryError");
        assert_eq!(registry.create_count(), 0);
    }

    #[tokio::test]
    async fn test_delete_success() {
        let registry = FakeRegistry::default();

        let response = delete(
            &registry,
            &DeleteRequest {
                id: "srv-abc12345".to_string(),
            },
        )
        .await
        .unwrap();

        assert_eq!(response.metadata.http_status_code, 200);
        assert_eq!(*registry.deleted.lock().unwrap(), vec!["srv-abc12345"]);
    }

    #[tokio::test]
    async fn test_delete_non_200_fails_with_response() {
        let registry = FakeRegistry {
            delete_status: Some(202),
            ..Default::default()
        };

        let err = delete(
            &registry,
            &DeleteRequest {
                id: "srv-abc12345".to_string(),
            },
        )
        .await
        .unwrap_err();

        let message = err.to_string();
        assert!(message.starts_with("Failed to delete service: "));
        assert!(message.contains("\"httpStatusCode\":202"));
    }
}
