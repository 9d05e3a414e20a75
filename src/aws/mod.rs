//! AWS Cloud Map interaction module
//!
//! This module provides the concrete registry client: credential loading,
//! SigV4-signed HTTP calls, and the Cloud Map (`servicediscovery`) operations
//! the reconciler needs.
//!
//! # Module Structure
//!
//! - [`credentials`] - Environment and shared-file credentials
//! - [`http`] - Signed AWS JSON 1.1 requests
//! - [`client`] - Cloud Map client implementing [`crate::registry::RegistryClient`]
//!
//! # Example
//!
//! ```ignore
//! use cloudmap_service::aws::client::ServiceDiscoveryClient;
//! use cloudmap_service::registry::RegistryClient;
//!
//! async fn example(config: &Config) -> anyhow::Result<()> {
//!     let client = ServiceDiscoveryClient::from_config(config)?;
//!     let page = client.list_services("ns-examplenamespace", None).await?;
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod credentials;
pub mod http;
