//! `config_saml` data source: IQ Server's own SAML service provider metadata

use std::sync::Arc;

use async_trait::async_trait;
use sonatypeiq_core::provider::ProviderResult;
use sonatypeiq_core::resource::{Resource, State, Value};
use sonatypeiq_core::schema::{AttributeSchema, AttributeType, ResourceSchema};

use super::DataSourceAdapter;
use crate::client::IqClient;
use crate::identity::PLACEHOLDER_ID;
use crate::utils::{Attributes, api_error};

pub const NAME: &str = "config_saml";

pub fn schema() -> ResourceSchema {
    ResourceSchema::new(NAME)
        .with_description("SAML metadata to register IQ Server with an identity provider")
        .attribute(AttributeSchema::new("id", AttributeType::String).computed())
        .attribute(AttributeSchema::new("saml_metadata", AttributeType::String).computed())
}

pub struct ConfigSamlDataSource {
    client: Arc<IqClient>,
}

impl ConfigSamlDataSource {
    pub fn new(client: Arc<IqClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl DataSourceAdapter for ConfigSamlDataSource {
    fn name(&self) -> &'static str {
        NAME
    }

    fn schema(&self) -> ResourceSchema {
        schema()
    }

    async fn read(&self, resource: &Resource) -> ProviderResult<State> {
        let metadata = self
            .client
            .get_saml_metadata()
            .await
            .map_err(|e| api_error("Unable to read SAML Metadata", e))?;

        let mut attrs = Attributes::new();
        attrs.insert("id".to_string(), Value::string(PLACEHOLDER_ID));
        attrs.insert("saml_metadata".to_string(), Value::String(metadata));
        Ok(State::existing(resource.id.clone(), attrs).with_identifier(PLACEHOLDER_ID))
    }
}
