//! Reconcile a single AWS Cloud Map service from a CI workflow step.
//!
//! Given the step inputs, either make sure exactly one service with the
//! requested name exists in a namespace (creating it when absent) or delete a
//! service by id, then report the service's ARN and id back to the workflow.
//!
//! - [`params`] - Input normalization and validation
//! - [`registry`] - Data model, search, reconciliation and identity
//! - [`aws`] - Cloud Map client
//! - [`action`] - Runs a request and publishes the step outputs

pub mod action;
pub mod aws;
pub mod config;
pub mod error;
pub mod output;
pub mod params;
pub mod registry;

/// Version injected at compile time via CLOUDMAP_SERVICE_VERSION env var (set by CI/CD),
/// or "dev" for local builds.
pub const VERSION: &str = match option_env!("CLOUDMAP_SERVICE_VERSION") {
    Some(v) => v,
    None => "dev",
};
