//! `organizations` data source: every organization on the server

use std::sync::Arc;

use async_trait::async_trait;
use sonatypeiq_core::provider::ProviderResult;
use sonatypeiq_core::resource::{Resource, State, Value};
use sonatypeiq_core::schema::{AttributeSchema, AttributeType, ResourceSchema};

use super::{DataSourceAdapter, object_list, organization_attributes};
use crate::client::IqClient;
use crate::identity::PLACEHOLDER_ID;
use crate::utils::{Attributes, api_error};

pub const NAME: &str = "organizations";

pub fn schema() -> ResourceSchema {
    ResourceSchema::new(NAME)
        .with_description("All organizations")
        .attribute(AttributeSchema::new("id", AttributeType::String).computed())
        .attribute(AttributeSchema::new("organizations", object_list()).computed())
}

pub struct OrganizationsDataSource {
    client: Arc<IqClient>,
}

impl OrganizationsDataSource {
    pub fn new(client: Arc<IqClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl DataSourceAdapter for OrganizationsDataSource {
    fn name(&self) -> &'static str {
        NAME
    }

    fn schema(&self) -> ResourceSchema {
        schema()
    }

    async fn read(&self, resource: &Resource) -> ProviderResult<State> {
        let list = self
            .client
            .get_organizations()
            .await
            .map_err(|e| api_error("Unable to Read IQ Organizations", e))?;

        let organizations = list
            .organizations
            .iter()
            .map(|org| Value::Map(organization_attributes(org)))
            .collect();

        let mut attrs = Attributes::new();
        attrs.insert("id".to_string(), Value::string(PLACEHOLDER_ID));
        attrs.insert("organizations".to_string(), Value::List(organizations));
        Ok(State::existing(resource.id.clone(), attrs).with_identifier(PLACEHOLDER_ID))
    }
}
