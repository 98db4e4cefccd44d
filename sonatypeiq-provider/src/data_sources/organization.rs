//! `organization` data source: look up one organization by id or name

use std::sync::Arc;

use async_trait::async_trait;
use sonatypeiq_core::provider::{ProviderError, ProviderResult};
use sonatypeiq_core::resource::{Resource, State};
use sonatypeiq_core::schema::{AttributeSchema, AttributeType, ResourceSchema};

use super::{DataSourceAdapter, object_list, organization_attributes};
use crate::client::IqClient;
use crate::utils::{api_error, get_string};

pub const NAME: &str = "organization";

pub fn schema() -> ResourceSchema {
    ResourceSchema::new(NAME)
        .with_description("Look up an organization by id or name")
        .attribute(AttributeSchema::new("id", AttributeType::String).optional_computed())
        .attribute(AttributeSchema::new("name", AttributeType::String).optional_computed())
        .attribute(
            AttributeSchema::new("parent_organization_id", AttributeType::String).computed(),
        )
        .attribute(AttributeSchema::new("tags", object_list()).computed())
}

pub struct OrganizationDataSource {
    client: Arc<IqClient>,
}

impl OrganizationDataSource {
    pub fn new(client: Arc<IqClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl DataSourceAdapter for OrganizationDataSource {
    fn name(&self) -> &'static str {
        NAME
    }

    fn schema(&self) -> ResourceSchema {
        schema()
    }

    async fn read(&self, resource: &Resource) -> ProviderResult<State> {
        let organization = if let Some(id) = get_string(&resource.attributes, "id") {
            self.client
                .get_organization(&id)
                .await
                .map_err(|e| api_error("Error reading Organization", e))?
        } else if let Some(name) = get_string(&resource.attributes, "name") {
            let mut list = self
                .client
                .get_organizations_by_name(&name)
                .await
                .map_err(|e| api_error("Error reading Organizations", e))?;
            match list.organizations.len() {
                0 => return Err(ProviderError::new("No Organization found")),
                1 => list.organizations.remove(0),
                _ => {
                    return Err(ProviderError::new(
                        "More than one Organization matched the supplied name",
                    ));
                }
            }
        } else {
            return Err(ProviderError::new(
                "No Organization ID or Name provided: ID or Name must be provided",
            ));
        };

        let attrs = organization_attributes(&organization);
        let identifier = organization.id.clone().unwrap_or_default();
        Ok(State::existing(resource.id.clone(), attrs).with_identifier(identifier))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{resource, shared_client};
    use serde_json::json;
    use sonatypeiq_core::resource::Value;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn root_has_no_parent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v2/organizations/ROOT_ORGANIZATION_ID"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "ROOT_ORGANIZATION_ID",
                "name": "Root Organization",
                "tags": [
                    {"id": "t1", "name": "Hosted", "description": "", "color": "light-green"}
                ]
            })))
            .mount(&server)
            .await;

        let source = OrganizationDataSource::new(shared_client(&server).await);
        let state = source
            .read(&resource(NAME, &[("id", Value::string("ROOT_ORGANIZATION_ID"))]))
            .await
            .unwrap();
        assert_eq!(state.get_str("name"), Some("Root Organization"));
        assert!(!state.attributes.contains_key("parent_organization_id"));
        assert!(matches!(state.attributes.get("tags"), Some(Value::List(tags)) if tags.len() == 1));
    }

    #[tokio::test]
    async fn reads_by_name() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v2/organizations"))
            .and(query_param("organizationName", "Engineering"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "organizations": [{
                    "id": "org-1",
                    "name": "Engineering",
                    "parentOrganizationId": "ROOT_ORGANIZATION_ID"
                }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let source = OrganizationDataSource::new(shared_client(&server).await);
        let state = source
            .read(&resource(NAME, &[("name", Value::string("Engineering"))]))
            .await
            .unwrap();
        assert_eq!(state.get_str("id"), Some("org-1"));
        assert_eq!(
            state.get_str("parent_organization_id"),
            Some("ROOT_ORGANIZATION_ID")
        );
    }

    #[tokio::test]
    async fn unknown_name_fails() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v2/organizations"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"organizations": []})))
            .mount(&server)
            .await;

        let source = OrganizationDataSource::new(shared_client(&server).await);
        let err = source
            .read(&resource(NAME, &[("name", Value::string("Nope"))]))
            .await
            .unwrap_err();
        assert_eq!(err.message, "No Organization found");
    }

    #[tokio::test]
    async fn requires_id_or_name() {
        let server = MockServer::start().await;
        let source = OrganizationDataSource::new(shared_client(&server).await);
        assert!(source.read(&resource(NAME, &[])).await.is_err());
    }
}
