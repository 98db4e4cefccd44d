//! `config_crowd` resource: Atlassian Crowd connection (singleton)

use std::sync::Arc;

use async_trait::async_trait;
use log::warn;
use sonatypeiq_core::provider::ProviderResult;
use sonatypeiq_core::resource::{Diagnostic, Resource, ResourceId, State, Value};
use sonatypeiq_core::schema::{AttributeSchema, AttributeType, ResourceSchema, types};

use super::{ResourceAdapter, import_by_read, keep_last_updated, stamp_last_updated};
use crate::client::IqClient;
use crate::models::ApiCrowdConfiguration;
use crate::utils::{Attributes, api_error, require_string};

pub const NAME: &str = "config_crowd";

pub fn schema() -> ResourceSchema {
    ResourceSchema::new(NAME)
        .with_description("Atlassian Crowd server used for authentication")
        .attribute(AttributeSchema::new("id", AttributeType::String).computed())
        .attribute(
            AttributeSchema::new("server_url", types::url())
                .required()
                .with_provider_name("serverUrl"),
        )
        .attribute(
            AttributeSchema::new("application_name", AttributeType::String)
                .required()
                .with_provider_name("applicationName"),
        )
        .attribute(
            AttributeSchema::new("application_password", AttributeType::String)
                .required()
                .write_only()
                .with_provider_name("applicationPassword"),
        )
        .attribute(AttributeSchema::new("last_updated", AttributeType::String).computed())
}

fn from_api(config: &ApiCrowdConfiguration) -> Attributes {
    let mut attrs = Attributes::new();
    attrs.insert("id".to_string(), Value::string(NAME));
    attrs.insert("server_url".to_string(), Value::string(&config.server_url));
    attrs.insert(
        "application_name".to_string(),
        Value::string(&config.application_name),
    );
    attrs
}

pub struct ConfigCrowdResource {
    client: Arc<IqClient>,
}

impl ConfigCrowdResource {
    pub fn new(client: Arc<IqClient>) -> Self {
        Self { client }
    }

    async fn write(&self, resource: &Resource, summary: &str) -> ProviderResult<State> {
        let password = require_string(&resource.attributes, "application_password")?;
        let request = ApiCrowdConfiguration {
            server_url: require_string(&resource.attributes, "server_url")?,
            application_name: require_string(&resource.attributes, "application_name")?,
            application_password: Some(password.clone()),
        };
        self.client
            .set_crowd_config(&request)
            .await
            .map_err(|e| api_error(summary, e))?;

        let mut attrs = from_api(&request);
        attrs.insert("application_password".to_string(), Value::String(password));
        stamp_last_updated(&mut attrs);
        Ok(State::existing(resource.id.clone(), attrs).with_identifier(NAME))
    }
}

#[async_trait]
impl ResourceAdapter for ConfigCrowdResource {
    fn name(&self) -> &'static str {
        NAME
    }

    fn schema(&self) -> ResourceSchema {
        schema()
    }

    async fn create(&self, resource: &Resource) -> ProviderResult<State> {
        self.write(resource, "Error creating Crowd configuration")
            .await
    }

    async fn read(&self, current: &State) -> ProviderResult<State> {
        let config = match self.client.get_crowd_config().await {
            Ok(config) => config,
            Err(e) if e.is_not_found() => return Ok(State::not_found(current.id.clone())),
            Err(e) => return Err(api_error("Unable to read Crowd configuration", e)),
        };

        let mut attrs = from_api(&config);
        keep_last_updated(current, &mut attrs);
        Ok(State::existing(current.id.clone(), attrs).with_identifier(NAME))
    }

    async fn update(&self, _from: &State, to: &Resource) -> ProviderResult<State> {
        self.write(to, "Error updating Crowd configuration").await
    }

    async fn delete(&self, _current: &State) -> ProviderResult<Vec<Diagnostic>> {
        match self.client.delete_crowd_config().await {
            Ok(()) => Ok(Vec::new()),
            Err(e) if e.is_not_found() => {
                warn!("Crowd configuration was already removed");
                Ok(vec![Diagnostic::warning(
                    "Crowd configuration did not exist",
                    "Crowd configuration was already removed from IQ Server",
                )])
            }
            Err(e) => Err(api_error("Error deleting Crowd configuration", e)),
        }
    }

    async fn import(&self, id: &ResourceId, _import_id: &str) -> ProviderResult<State> {
        let seed = State::existing(id.clone(), Attributes::new()).with_identifier(NAME);
        import_by_read(self, seed).await
    }
}
