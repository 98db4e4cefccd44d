//! `organization` resource
//!
//! IQ Server offers no API to rename or delete an organization, so every
//! input forces replacement and delete only forgets the object.

use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, warn};
use sonatypeiq_core::provider::{ProviderError, ProviderResult};
use sonatypeiq_core::resource::{Diagnostic, Resource, ResourceId, State, Value};
use sonatypeiq_core::schema::{AttributeSchema, AttributeType, ResourceSchema};

use super::{ResourceAdapter, import_by_read, keep_last_updated, server_id, stamp_last_updated};
use crate::client::IqClient;
use crate::models::ApiOrganization;
use crate::utils::{Attributes, api_error, require_string, set_string};

pub const NAME: &str = "organization";

pub fn schema() -> ResourceSchema {
    ResourceSchema::new(NAME)
        .with_description("An organization grouping applications")
        .attribute(AttributeSchema::new("id", AttributeType::String).computed())
        .attribute(
            AttributeSchema::new("name", AttributeType::String)
                .required()
                .with_min_length(1)
                .requires_replace(),
        )
        .attribute(
            AttributeSchema::new("parent_organization_id", AttributeType::String)
                .required()
                .requires_replace()
                .with_provider_name("parentOrganizationId")
                .with_description("Use ROOT_ORGANIZATION_ID for a top-level organization"),
        )
        .attribute(AttributeSchema::new("last_updated", AttributeType::String).computed())
}

pub(crate) fn from_api(org: &ApiOrganization) -> Attributes {
    let mut attrs = Attributes::new();
    set_string(&mut attrs, "id", org.id.clone());
    attrs.insert("name".to_string(), Value::string(&org.name));
    set_string(
        &mut attrs,
        "parent_organization_id",
        org.parent_organization_id.clone(),
    );
    attrs
}

pub struct OrganizationResource {
    client: Arc<IqClient>,
}

impl OrganizationResource {
    pub fn new(client: Arc<IqClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ResourceAdapter for OrganizationResource {
    fn name(&self) -> &'static str {
        NAME
    }

    fn schema(&self) -> ResourceSchema {
        schema()
    }

    async fn create(&self, resource: &Resource) -> ProviderResult<State> {
        let request = ApiOrganization {
            id: None,
            name: require_string(&resource.attributes, "name")?,
            parent_organization_id: Some(require_string(
                &resource.attributes,
                "parent_organization_id",
            )?),
            tags: Vec::new(),
        };

        let org = self
            .client
            .add_organization(&request)
            .await
            .map_err(|e| api_error("Error creating Organization", e))?;
        let id = org
            .id
            .clone()
            .ok_or_else(|| ProviderError::new("Error creating Organization: no id in response"))?;

        let mut attrs = from_api(&org);
        if !attrs.contains_key("parent_organization_id") {
            set_string(&mut attrs, "parent_organization_id", request.parent_organization_id);
        }
        stamp_last_updated(&mut attrs);
        Ok(State::existing(resource.id.clone(), attrs).with_identifier(id))
    }

    async fn read(&self, current: &State) -> ProviderResult<State> {
        let Some(id) = server_id(current, "id") else {
            return Ok(State::not_found(current.id.clone()));
        };

        let org = match self.client.get_organization(&id).await {
            Ok(org) => org,
            Err(e) if e.is_not_found() => {
                debug!("Organization {} no longer exists", id);
                return Ok(State::not_found(current.id.clone()));
            }
            Err(e) => return Err(api_error("Error reading Organization", e)),
        };

        let mut attrs = from_api(&org);
        attrs.insert("id".to_string(), Value::string(&id));
        keep_last_updated(current, &mut attrs);
        Ok(State::existing(current.id.clone(), attrs).with_identifier(id))
    }

    async fn update(&self, _from: &State, _to: &Resource) -> ProviderResult<State> {
        Err(ProviderError::new(
            "Organizations cannot be updated in place: IQ Server has no API to modify an Organization",
        ))
    }

    async fn delete(&self, current: &State) -> ProviderResult<Vec<Diagnostic>> {
        let id = server_id(current, "id").unwrap_or_default();
        warn!("Organization {} is only removed from state", id);
        Ok(vec![Diagnostic::warning(
            "Organization not deleted",
            format!(
                "IQ Server has no API to delete Organizations; '{}' was removed from state only",
                id
            ),
        )])
    }

    async fn import(&self, id: &ResourceId, import_id: &str) -> ProviderResult<State> {
        let seed = State::existing(id.clone(), Attributes::new()).with_identifier(import_id);
        import_by_read(self, seed).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{resource, shared_client, stored};
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn create_sends_parent() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v2/organizations"))
            .and(body_json(json!({
                "name": "Engineering",
                "parentOrganizationId": "ROOT_ORGANIZATION_ID"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "org-1",
                "name": "Engineering",
                "parentOrganizationId": "ROOT_ORGANIZATION_ID",
                "tags": []
            })))
            .expect(1)
            .mount(&server)
            .await;

        let adapter = OrganizationResource::new(shared_client(&server).await);
        let state = adapter
            .create(&resource(
                NAME,
                &[
                    ("name", Value::string("Engineering")),
                    ("parent_organization_id", Value::string("ROOT_ORGANIZATION_ID")),
                ],
            ))
            .await
            .unwrap();
        assert_eq!(state.identifier.as_deref(), Some("org-1"));
        assert_eq!(
            state.get_str("parent_organization_id"),
            Some("ROOT_ORGANIZATION_ID")
        );
    }

    #[tokio::test]
    async fn read_missing_organization_removes_it() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v2/organizations/org-1"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let adapter = OrganizationResource::new(shared_client(&server).await);
        let state = adapter.read(&stored(NAME, "org-1", &[])).await.unwrap();
        assert!(!state.exists);
    }

    #[tokio::test]
    async fn delete_only_warns() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .respond_with(ResponseTemplate::new(204))
            .expect(0)
            .mount(&server)
            .await;

        let adapter = OrganizationResource::new(shared_client(&server).await);
        let diagnostics = adapter.delete(&stored(NAME, "org-1", &[])).await.unwrap();
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].summary, "Organization not deleted");
    }

    #[test]
    fn all_inputs_force_replacement() {
        let schema = schema();
        assert!(schema.forces_replacement("name"));
        assert!(schema.forces_replacement("parent_organization_id"));
    }
}
