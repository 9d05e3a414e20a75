//! Action entrypoint
//!
//! Runs one validated [`Request`] against a registry and publishes the
//! step outputs.

use crate::output::OutputSink;
use crate::params::Request;
use crate::registry::{self, DeleteServiceOutput, RegistryClient, ServiceIdentity, ServiceOutcome};
use anyhow::{Context, Result};
use serde::Serialize;

/// What a run did
#[derive(Debug, Clone, PartialEq)]
pub enum RunResult {
    Reconciled(ServiceOutcome, ServiceIdentity),
    Deleted(DeleteServiceOutput),
}

pub async fn execute<C: RegistryClient + ?Sized>(
    client: &C,
    request: &Request,
    sink: &mut dyn OutputSink,
) -> Result<RunResult> {
    match request {
        Request::Create(service) => {
            let outcome = registry::create_or_find(client, service).await?;
            let identity = publish_service(sink, &outcome)?;
            Ok(RunResult::Reconciled(outcome, identity))
        }
        Request::Delete(delete) => {
            let response = registry::delete(client, delete).await?;
            sink.set_output("response", &to_output_json(&response)?)?;
            Ok(RunResult::Deleted(response))
        }
    }
}

/// Publish `response`, `arn` and `id` for a found or created service
fn publish_service(sink: &mut dyn OutputSink, outcome: &ServiceOutcome) -> Result<ServiceIdentity> {
    let identity = outcome.identity()?;
    tracing::info!("ARN found or created: {}", identity.arn);

    sink.set_output("response", &to_output_json(&outcome.to_response()?)?)?;
    sink.set_output("arn", &identity.arn)?;
    sink.set_output("id", &identity.id)?;

    Ok(identity)
}

fn to_output_json<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string(value).context("Failed to serialize response output")
}
