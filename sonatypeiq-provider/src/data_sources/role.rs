//! `role` data source: resolve a role name to its id

use std::sync::Arc;

use async_trait::async_trait;
use sonatypeiq_core::provider::{ProviderError, ProviderResult};
use sonatypeiq_core::resource::{Resource, State, Value};
use sonatypeiq_core::schema::{AttributeSchema, AttributeType, ResourceSchema};

use super::DataSourceAdapter;
use crate::client::IqClient;
use crate::utils::{Attributes, api_error, require_string, set_string};

pub const NAME: &str = "role";

pub fn schema() -> ResourceSchema {
    ResourceSchema::new(NAME)
        .with_description("Look up a role by name")
        .attribute(AttributeSchema::new("id", AttributeType::String).computed())
        .attribute(
            AttributeSchema::new("name", AttributeType::String)
                .required()
                .with_min_length(1),
        )
        .attribute(AttributeSchema::new("description", AttributeType::String).computed())
}

pub struct RoleDataSource {
    client: Arc<IqClient>,
}

impl RoleDataSource {
    pub fn new(client: Arc<IqClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl DataSourceAdapter for RoleDataSource {
    fn name(&self) -> &'static str {
        NAME
    }

    fn schema(&self) -> ResourceSchema {
        schema()
    }

    async fn read(&self, resource: &Resource) -> ProviderResult<State> {
        let name = require_string(&resource.attributes, "name")?;
        let roles = self
            .client
            .get_roles()
            .await
            .map_err(|e| api_error("Unable to Read IQ Roles", e))?;

        let role = roles
            .roles
            .into_iter()
            .find(|role| role.name == name)
            .ok_or_else(|| {
                ProviderError::new(format!(
                    "Unable to find role: Role '{}' does not exist",
                    name
                ))
            })?;

        let mut attrs = Attributes::new();
        attrs.insert("id".to_string(), Value::string(&role.id));
        attrs.insert("name".to_string(), Value::String(role.name));
        set_string(&mut attrs, "description", role.description);
        Ok(State::existing(resource.id.clone(), attrs).with_identifier(role.id))
    }
}
