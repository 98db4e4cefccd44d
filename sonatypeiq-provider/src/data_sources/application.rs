//! `application` data source: look up one application by id or public id

use std::sync::Arc;

use async_trait::async_trait;
use log::debug;
use sonatypeiq_core::provider::{ProviderError, ProviderResult};
use sonatypeiq_core::resource::{Resource, State};
use sonatypeiq_core::schema::{AttributeSchema, AttributeType, ResourceSchema};

use super::{DataSourceAdapter, application_attributes, object_list};
use crate::client::IqClient;
use crate::utils::{api_error, get_string};

pub const NAME: &str = "application";

pub fn schema() -> ResourceSchema {
    ResourceSchema::new(NAME)
        .with_description("Look up an application by id or public id")
        .attribute(AttributeSchema::new("id", AttributeType::String).optional_computed())
        .attribute(AttributeSchema::new("public_id", AttributeType::String).optional_computed())
        .attribute(AttributeSchema::new("name", AttributeType::String).computed())
        .attribute(AttributeSchema::new("organization_id", AttributeType::String).computed())
        .attribute(AttributeSchema::new("contact_user_name", AttributeType::String).computed())
        .attribute(AttributeSchema::new("application_tags", object_list()).computed())
}

pub struct ApplicationDataSource {
    client: Arc<IqClient>,
}

impl ApplicationDataSource {
    pub fn new(client: Arc<IqClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl DataSourceAdapter for ApplicationDataSource {
    fn name(&self) -> &'static str {
        NAME
    }

    fn schema(&self) -> ResourceSchema {
        schema()
    }

    async fn read(&self, resource: &Resource) -> ProviderResult<State> {
        let application = if let Some(id) = get_string(&resource.attributes, "id") {
            self.client
                .get_application(&id)
                .await
                .map_err(|e| api_error("Error reading Application", e))?
        } else if let Some(public_id) = get_string(&resource.attributes, "public_id") {
            debug!("Looking up application by public id '{}'", public_id);
            let mut list = self
                .client
                .get_applications_by_public_id(&public_id)
                .await
                .map_err(|e| api_error("Error reading Applications", e))?;
            match list.applications.len() {
                0 => return Err(ProviderError::new("No Application found")),
                1 => list.applications.remove(0),
                _ => {
                    return Err(ProviderError::new(
                        "More than one Applications matched the Public ID",
                    ));
                }
            }
        } else {
            return Err(ProviderError::new(
                "No Application ID or Public ID provided: ID or Public ID must be provided",
            ));
        };

        let attrs = application_attributes(&application);
        let identifier = application.id.clone().unwrap_or_default();
        Ok(State::existing(resource.id.clone(), attrs).with_identifier(identifier))
    }
}
