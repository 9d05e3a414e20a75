//! Service Search
//!
//! Walks the pages of a namespace-filtered ListServices call until a service
//! with the requested name turns up.

use super::{raw_json, RegistryClient, ServiceRecord};
use crate::error::ServiceError;

/// Find the first service named `name` in `namespace_id`.
///
/// Pages are requested one at a time, each with the continuation token of the
/// previous page. Within a page the first match wins.
pub async fn find_service<C: RegistryClient + ?Sized>(
    client: &C,
    namespace_id: &str,
    name: &str,
) -> Result<ServiceRecord, ServiceError> {
    let mut next_token: Option<String> = None;
    let mut pages_seen = 0usize;

    loop {
        let page = client
            .list_services(namespace_id, next_token.as_deref())
            .await?;
        pages_seen += 1;

        let Some(services) = page.services.as_ref() else {
            return Err(ServiceError::Registry(format!(
                "Error searching for Service: Response: {}",
                raw_json(&page)?
            )));
        };

        tracing::debug!(
            "Searching page {} ({} services) for {}",
            pages_seen,
            services.len(),
            name
        );

        if let Some(found) = services.iter().find(|s| s.name.as_deref() == Some(name)) {
            return Ok(found.clone());
        }

        match page.next_token.filter(|token| !token.is_empty()) {
            Some(token) => next_token = Some(token),
            None => {
                tracing::debug!("{} not found after {} page(s)", name, pages_seen);
                return Err(ServiceError::NotFound {
                    name: name.to_string(),
                });
            }
        }
    }
}
