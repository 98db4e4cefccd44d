//! `applications` data source: every application on the server

use std::sync::Arc;

use async_trait::async_trait;
use log::debug;
use sonatypeiq_core::provider::ProviderResult;
use sonatypeiq_core::resource::{Resource, State, Value};
use sonatypeiq_core::schema::{AttributeSchema, AttributeType, ResourceSchema};

use super::{DataSourceAdapter, application_attributes, object_list};
use crate::client::IqClient;
use crate::identity::PLACEHOLDER_ID;
use crate::utils::{Attributes, api_error};

pub const NAME: &str = "applications";

pub fn schema() -> ResourceSchema {
    ResourceSchema::new(NAME)
        .with_description("All applications")
        .attribute(AttributeSchema::new("id", AttributeType::String).computed())
        .attribute(
            AttributeSchema::new("applications", object_list())
                .computed()
                .with_description("Each entry carries the fields of the application data source"),
        )
}

pub struct ApplicationsDataSource {
    client: Arc<IqClient>,
}

impl ApplicationsDataSource {
    pub fn new(client: Arc<IqClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl DataSourceAdapter for ApplicationsDataSource {
    fn name(&self) -> &'static str {
        NAME
    }

    fn schema(&self) -> ResourceSchema {
        schema()
    }

    async fn read(&self, resource: &Resource) -> ProviderResult<State> {
        let list = self
            .client
            .get_applications()
            .await
            .map_err(|e| api_error("Unable to Read IQ Applications", e))?;
        debug!("Found {} applications", list.applications.len());

        let applications = list
            .applications
            .iter()
            .map(|app| Value::Map(application_attributes(app)))
            .collect();

        let mut attrs = Attributes::new();
        attrs.insert("id".to_string(), Value::string(PLACEHOLDER_ID));
        attrs.insert("applications".to_string(), Value::List(applications));
        Ok(State::existing(resource.id.clone(), attrs).with_identifier(PLACEHOLDER_ID))
    }
}
