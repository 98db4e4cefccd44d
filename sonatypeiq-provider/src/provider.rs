//! IQ Server provider implementation
//!
//! Routes each operation to the adapter registered for the resource type,
//! after local schema checks, and normalises the returned state.

use std::collections::HashMap;
use std::sync::Arc;

use log::{debug, info, warn};
use sonatypeiq_core::provider::{ProviderError, ProviderResult};
use sonatypeiq_core::resource::{Diagnostic, Resource, ResourceId, State};
use sonatypeiq_core::schema::ResourceSchema;

use crate::client::IqClient;
use crate::config::{ConfigError, ProviderConfig};
use crate::data_sources::{self, DataSourceAdapter};
use crate::resources::{self, ResourceAdapter};

/// Sonatype IQ Server provider
pub struct SonatypeIqProvider {
    client: Arc<IqClient>,
    resources: HashMap<&'static str, Box<dyn ResourceAdapter>>,
    data_sources: HashMap<&'static str, Box<dyn DataSourceAdapter>>,
}

impl SonatypeIqProvider {
    /// Build the HTTP client from resolved configuration
    pub fn new(config: &ProviderConfig) -> Result<Self, ConfigError> {
        Ok(Self::with_client(IqClient::new(config)?))
    }

    pub fn with_client(client: IqClient) -> Self {
        let client = Arc::new(client);
        let resources = resources::adapters(client.clone())
            .into_iter()
            .map(|adapter| (adapter.name(), adapter))
            .collect();
        let data_sources = data_sources::adapters(client.clone())
            .into_iter()
            .map(|adapter| (adapter.name(), adapter))
            .collect();
        Self {
            client,
            resources,
            data_sources,
        }
    }

    pub fn client(&self) -> &IqClient {
        &self.client
    }

    fn adapter(&self, id: &ResourceId) -> ProviderResult<&dyn ResourceAdapter> {
        self.resources
            .get(id.resource_type.as_str())
            .map(|adapter| adapter.as_ref())
            .ok_or_else(|| {
                ProviderError::new(format!("Unknown resource type: {}", id.resource_type))
                    .for_resource(id.clone())
            })
    }

    // =========================================================================
    // Resource Operations
    // =========================================================================

    pub async fn create_resource(&self, resource: Resource) -> ProviderResult<State> {
        let adapter = self.adapter(&resource.id)?;
        let resource = prepare(&adapter.schema(), resource)?;
        info!("Creating {}", resource.id);

        adapter
            .create(&resource)
            .await
            .map(report)
            .map_err(|e| e.for_resource(resource.id.clone()))
    }

    pub async fn read_resource(&self, current: State) -> ProviderResult<State> {
        let adapter = self.adapter(&current.id)?;
        debug!(
            "Reading {} ({})",
            current.id,
            current.identifier.as_deref().unwrap_or("-")
        );

        let mut state = adapter
            .read(&current)
            .await
            .map_err(|e| e.for_resource(current.id.clone()))?;
        if state.exists {
            adapter
                .schema()
                .carry_write_only(&current.attributes, &mut state.attributes);
        } else {
            debug!("{} no longer exists on the server", current.id);
        }
        Ok(report(state))
    }

    pub async fn update_resource(
        &self,
        id: ResourceId,
        from: State,
        to: Resource,
    ) -> ProviderResult<State> {
        let adapter = self.adapter(&id)?;
        let to = prepare(&adapter.schema(), to)?;
        info!("Updating {}", id);

        adapter
            .update(&from, &to)
            .await
            .map(report)
            .map_err(|e| e.for_resource(id))
    }

    pub async fn delete_resource(&self, current: State) -> ProviderResult<Vec<Diagnostic>> {
        let adapter = self.adapter(&current.id)?;
        info!("Deleting {}", current.id);

        let diagnostics = adapter
            .delete(&current)
            .await
            .map_err(|e| e.for_resource(current.id.clone()))?;
        for diagnostic in &diagnostics {
            warn!("{}: {}", current.id, diagnostic);
        }
        Ok(diagnostics)
    }

    pub async fn import_resource(
        &self,
        id: ResourceId,
        import_id: String,
    ) -> ProviderResult<State> {
        let adapter = self.adapter(&id)?;
        info!("Importing {} from '{}'", id, import_id);

        adapter
            .import(&id, &import_id)
            .await
            .map(report)
            .map_err(|e| e.for_resource(id))
    }

    // =========================================================================
    // Data Sources
    // =========================================================================

    pub async fn read_data_source_impl(&self, resource: Resource) -> ProviderResult<State> {
        let adapter = self
            .data_sources
            .get(resource.id.resource_type.as_str())
            .ok_or_else(|| {
                ProviderError::new(format!(
                    "Unknown data source type: {}",
                    resource.id.resource_type
                ))
                .for_resource(resource.id.clone())
            })?;
        check(&adapter.schema(), &resource)?;
        debug!("Reading data source {}", resource.id);

        adapter
            .read(&resource)
            .await
            .map(report)
            .map_err(|e| e.for_resource(resource.id.clone()))
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Apply schema defaults and validate before any request is sent
fn prepare(schema: &ResourceSchema, mut resource: Resource) -> ProviderResult<Resource> {
    schema.apply_defaults(&mut resource.attributes);
    check(schema, &resource)?;
    Ok(resource)
}

fn check(schema: &ResourceSchema, resource: &Resource) -> ProviderResult<()> {
    schema.validate(&resource.attributes).map_err(|errors| {
        let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
        ProviderError::new(format!("Invalid configuration: {}", messages.join("; ")))
            .for_resource(resource.id.clone())
    })
}

/// Log the warnings an adapter attached to a state
fn report(state: State) -> State {
    for diagnostic in &state.diagnostics {
        warn!("{}: {}", state.id, diagnostic);
    }
    state
}
