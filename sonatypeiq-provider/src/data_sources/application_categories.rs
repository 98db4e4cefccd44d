//! `application_categories` data source: categories of one organization

use std::sync::Arc;

use async_trait::async_trait;
use sonatypeiq_core::provider::ProviderResult;
use sonatypeiq_core::resource::{Resource, State, Value};
use sonatypeiq_core::schema::{AttributeSchema, AttributeType, ResourceSchema};

use super::{DataSourceAdapter, category_attributes, object_list};
use crate::client::IqClient;
use crate::identity::PLACEHOLDER_ID;
use crate::utils::{api_error, require_string};

pub const NAME: &str = "application_categories";

pub fn schema() -> ResourceSchema {
    ResourceSchema::new(NAME)
        .with_description("Application categories defined on an organization")
        .attribute(AttributeSchema::new("id", AttributeType::String).computed())
        .attribute(
            AttributeSchema::new("organization_id", AttributeType::String)
                .required()
                .with_min_length(1),
        )
        .attribute(AttributeSchema::new("categories", object_list()).computed())
}

pub struct ApplicationCategoriesDataSource {
    client: Arc<IqClient>,
}

impl ApplicationCategoriesDataSource {
    pub fn new(client: Arc<IqClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl DataSourceAdapter for ApplicationCategoriesDataSource {
    fn name(&self) -> &'static str {
        NAME
    }

    fn schema(&self) -> ResourceSchema {
        schema()
    }

    async fn read(&self, resource: &Resource) -> ProviderResult<State> {
        let organization_id = require_string(&resource.attributes, "organization_id")?;
        let categories = self
            .client
            .get_application_categories(&organization_id)
            .await
            .map_err(|e| api_error("Error reading Application Categories", e))?;

        let mut attrs = resource.attributes.clone();
        attrs.insert("id".to_string(), Value::string(PLACEHOLDER_ID));
        attrs.insert(
            "categories".to_string(),
            Value::List(categories.iter().map(category_attributes).collect()),
        );
        Ok(State::existing(resource.id.clone(), attrs).with_identifier(PLACEHOLDER_ID))
    }
}
