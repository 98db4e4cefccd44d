//! Sonatype IQ Server Provider
//!
//! Manages IQ Server configuration through its `/api/v2` REST API.
//!
//! ## Module Structure
//!
//! - `config` - Provider configuration (URL, credentials, environment fallback)
//! - `client` - HTTP client for the IQ Server REST API
//! - `models` - API payloads
//! - `identity` - Owner types, membership keys and other identifiers
//! - `resources` - Managed resource adapters
//! - `data_sources` - Read-only lookups
//! - `provider` - SonatypeIqProvider implementation

pub mod client;
pub mod config;
pub mod data_sources;
pub mod identity;
pub mod models;
pub mod provider;
pub mod resources;
pub mod utils;

#[cfg(test)]
pub(crate) mod testing;

// Re-export main types
pub use client::{ApiError, IqClient};
pub use config::{ConfigError, ProviderConfig};
pub use provider::SonatypeIqProvider;

use sonatypeiq_core::provider::{BoxFuture, Provider, ProviderResult, ResourceType};
use sonatypeiq_core::resource::{Diagnostic, Resource, ResourceId, State};

/// Provider name used in manifests
pub const PROVIDER_NAME: &str = "sonatypeiq";

// =============================================================================
// Provider Trait Implementation
// =============================================================================

impl Provider for SonatypeIqProvider {
    fn name(&self) -> &'static str {
        PROVIDER_NAME
    }

    fn resource_types(&self) -> Vec<Box<dyn ResourceType>> {
        resources::resource_types()
    }

    fn data_source_types(&self) -> Vec<Box<dyn ResourceType>> {
        data_sources::data_source_types()
    }

    fn read(&self, current: &State) -> BoxFuture<'_, ProviderResult<State>> {
        let current = current.clone();
        Box::pin(async move { self.read_resource(current).await })
    }

    fn create(&self, resource: &Resource) -> BoxFuture<'_, ProviderResult<State>> {
        let resource = resource.clone();
        Box::pin(async move { self.create_resource(resource).await })
    }

    fn update(
        &self,
        id: &ResourceId,
        from: &State,
        to: &Resource,
    ) -> BoxFuture<'_, ProviderResult<State>> {
        let id = id.clone();
        let from = from.clone();
        let to = to.clone();
        Box::pin(async move { self.update_resource(id, from, to).await })
    }

    fn delete(&self, current: &State) -> BoxFuture<'_, ProviderResult<Vec<Diagnostic>>> {
        let current = current.clone();
        Box::pin(async move { self.delete_resource(current).await })
    }

    fn import(&self, id: &ResourceId, import_id: &str) -> BoxFuture<'_, ProviderResult<State>> {
        let id = id.clone();
        let import_id = import_id.to_string();
        Box::pin(async move { self.import_resource(id, import_id).await })
    }

    fn read_data_source(&self, resource: &Resource) -> BoxFuture<'_, ProviderResult<State>> {
        let resource = resource.clone();
        Box::pin(async move { self.read_data_source_impl(resource).await })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::client_for;
    use wiremock::MockServer;

    #[tokio::test]
    async fn exposes_all_types() {
        let server = MockServer::start().await;
        let provider = SonatypeIqProvider::with_client(client_for(&server).await);
        assert_eq!(provider.name(), "sonatypeiq");
        assert_eq!(provider.resource_types().len(), 14);
        assert_eq!(provider.data_source_types().len(), 8);
        assert!(provider.resource_schema("config_saml").is_some());
        assert!(provider.data_source_schema("applications").is_some());
        assert!(provider.resource_schema("applications").is_none());
    }
}
