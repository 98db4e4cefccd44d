//! `system_config` data source: current base URL settings

use std::sync::Arc;

use async_trait::async_trait;
use sonatypeiq_core::provider::ProviderResult;
use sonatypeiq_core::resource::{Resource, State, Value};
use sonatypeiq_core::schema::{AttributeSchema, AttributeType, ResourceSchema};

use super::DataSourceAdapter;
use crate::client::IqClient;
use crate::identity::PLACEHOLDER_ID;
use crate::resources::system_config::from_api;
use crate::utils::api_error;

pub const NAME: &str = "system_config";

pub fn schema() -> ResourceSchema {
    ResourceSchema::new(NAME)
        .with_description("Base URL settings of IQ Server")
        .attribute(AttributeSchema::new("id", AttributeType::String).computed())
        .attribute(AttributeSchema::new("base_url", AttributeType::String).computed())
        .attribute(AttributeSchema::new("force_base_url", AttributeType::Bool).computed())
}

pub struct SystemConfigDataSource {
    client: Arc<IqClient>,
}

impl SystemConfigDataSource {
    pub fn new(client: Arc<IqClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl DataSourceAdapter for SystemConfigDataSource {
    fn name(&self) -> &'static str {
        NAME
    }

    fn schema(&self) -> ResourceSchema {
        schema()
    }

    async fn read(&self, resource: &Resource) -> ProviderResult<State> {
        let config = self
            .client
            .get_system_config()
            .await
            .map_err(|e| api_error("Error reading System Configuration", e))?;

        let mut attrs = from_api(&config);
        attrs.insert("id".to_string(), Value::string(PLACEHOLDER_ID));
        Ok(State::existing(resource.id.clone(), attrs).with_identifier(PLACEHOLDER_ID))
    }
}
