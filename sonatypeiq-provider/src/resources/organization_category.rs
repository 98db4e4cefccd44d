//! `organization_category` resource (application categories owned by an
//! organization)

use std::sync::Arc;

use async_trait::async_trait;
use log::warn;
use sonatypeiq_core::provider::{ProviderError, ProviderResult};
use sonatypeiq_core::resource::{Diagnostic, Resource, ResourceId, State, Value};
use sonatypeiq_core::schema::{AttributeSchema, AttributeType, ResourceSchema};

use super::{ResourceAdapter, import_by_read, keep_last_updated, server_id, stamp_last_updated};
use crate::client::IqClient;
use crate::models::ApiApplicationCategory;
use crate::utils::{Attributes, api_error, get_string, require_string};

pub const NAME: &str = "organization_category";

pub const COLORS: &[&str] = &[
    "dark-blue",
    "dark-green",
    "dark-purple",
    "dark-red",
    "light-blue",
    "light-green",
    "light-purple",
    "light-red",
    "orange",
    "yellow",
];

pub fn schema() -> ResourceSchema {
    ResourceSchema::new(NAME)
        .with_description("An application category defined in an organization")
        .attribute(AttributeSchema::new("id", AttributeType::String).computed())
        .attribute(
            AttributeSchema::new("name", AttributeType::String)
                .required()
                .with_min_length(1),
        )
        .attribute(AttributeSchema::new("description", AttributeType::String).required())
        .attribute(
            AttributeSchema::new("organization_id", AttributeType::String)
                .required()
                .requires_replace(),
        )
        .attribute(AttributeSchema::new("color", AttributeType::one_of(COLORS)).required())
        .attribute(AttributeSchema::new("last_updated", AttributeType::String).computed())
}

fn to_api(attrs: &Attributes) -> ProviderResult<ApiApplicationCategory> {
    Ok(ApiApplicationCategory {
        id: get_string(attrs, "id"),
        name: require_string(attrs, "name")?,
        description: require_string(attrs, "description")?,
        color: require_string(attrs, "color")?,
    })
}

fn from_api(category: &ApiApplicationCategory, organization_id: &str) -> Attributes {
    let mut attrs = Attributes::new();
    if let Some(id) = &category.id {
        attrs.insert("id".to_string(), Value::string(id));
    }
    attrs.insert("name".to_string(), Value::string(&category.name));
    attrs.insert(
        "description".to_string(),
        Value::string(&category.description),
    );
    attrs.insert("color".to_string(), Value::string(&category.color));
    attrs.insert(
        "organization_id".to_string(),
        Value::string(organization_id),
    );
    attrs
}

pub struct OrganizationCategoryResource {
    client: Arc<IqClient>,
}

impl OrganizationCategoryResource {
    pub fn new(client: Arc<IqClient>) -> Self {
        Self { client }
    }

    fn saved(
        &self,
        id: ResourceId,
        category: &ApiApplicationCategory,
        organization_id: &str,
    ) -> ProviderResult<State> {
        let category_id = category.id.clone().ok_or_else(|| {
            ProviderError::new("Error saving Application Category: no id in response")
        })?;
        let mut attrs = from_api(category, organization_id);
        stamp_last_updated(&mut attrs);
        Ok(State::existing(id, attrs).with_identifier(category_id))
    }
}

#[async_trait]
impl ResourceAdapter for OrganizationCategoryResource {
    fn name(&self) -> &'static str {
        NAME
    }

    fn schema(&self) -> ResourceSchema {
        schema()
    }

    async fn create(&self, resource: &Resource) -> ProviderResult<State> {
        let organization_id = require_string(&resource.attributes, "organization_id")?;
        let mut request = to_api(&resource.attributes)?;
        request.id = None;

        let category = self
            .client
            .add_application_category(&organization_id, &request)
            .await
            .map_err(|e| api_error("Error creating Application Category", e))?;
        self.saved(resource.id.clone(), &category, &organization_id)
    }

    async fn read(&self, current: &State) -> ProviderResult<State> {
        let (Some(id), Some(organization_id)) = (
            server_id(current, "id"),
            current.get_str("organization_id").map(str::to_string),
        ) else {
            return Ok(State::not_found(current.id.clone()));
        };

        let categories = match self.client.get_application_categories(&organization_id).await {
            Ok(categories) => categories,
            Err(e) if e.is_not_found() => {
                return Ok(State::not_found(current.id.clone()).with_warning(
                    "Organization does not exist",
                    format!("Organization with ID {} does not exist", organization_id),
                ));
            }
            Err(e) => return Err(api_error("Error reading Application Categories", e)),
        };

        if categories.is_empty() {
            return Ok(State::not_found(current.id.clone()).with_warning(
                "No Application Categories exist",
                format!("Organization with ID {} has no Application Categories", organization_id),
            ));
        }

        let Some(category) = categories.iter().find(|c| c.id.as_deref() == Some(id.as_str()))
        else {
            return Ok(State::not_found(current.id.clone()).with_warning(
                "Application Category not found",
                format!("Application Category with ID {} does not exist", id),
            ));
        };

        let mut attrs = from_api(category, &organization_id);
        keep_last_updated(current, &mut attrs);
        Ok(State::existing(current.id.clone(), attrs).with_identifier(id))
    }

    async fn update(&self, from: &State, to: &Resource) -> ProviderResult<State> {
        let id = server_id(from, "id").ok_or_else(|| {
            ProviderError::new("Error updating Application Category: unknown id")
        })?;
        let organization_id = require_string(&to.attributes, "organization_id")?;
        let mut request = to_api(&to.attributes)?;
        request.id = Some(id);

        let category = self
            .client
            .update_application_category(&organization_id, &request)
            .await
            .map_err(|e| api_error("Error updating Application Category", e))?;
        self.saved(to.id.clone(), &category, &organization_id)
    }

    async fn delete(&self, current: &State) -> ProviderResult<Vec<Diagnostic>> {
        let (Some(id), Some(organization_id)) =
            (server_id(current, "id"), current.get_str("organization_id"))
        else {
            return Ok(Vec::new());
        };

        match self
            .client
            .delete_application_category(organization_id, &id)
            .await
        {
            Ok(()) => Ok(Vec::new()),
            Err(e) if e.is_not_found() => {
                warn!("Application Category {} was already gone", id);
                Ok(vec![Diagnostic::warning(
                    "Application Category does not exist",
                    format!(
                        "Application Category {} does not exist in Organization {}",
                        id, organization_id
                    ),
                )])
            }
            Err(e) => Err(api_error(
                "Unexpected response code deleting Application Category",
                e,
            )),
        }
    }

    /// `organization_id:category_id`
    async fn import(&self, id: &ResourceId, import_id: &str) -> ProviderResult<State> {
        let Some((organization_id, category_id)) = import_id.split_once(':') else {
            return Err(ProviderError::new(format!(
                "Unexpected Import Identifier: expected organization_id:category_id. Got: {:?}",
                import_id
            )));
        };
        let mut attrs = Attributes::new();
        attrs.insert(
            "organization_id".to_string(),
            Value::string(organization_id),
        );
        let seed = State::existing(id.clone(), attrs).with_identifier(category_id);
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

    fn stored_category() -> State {
        stored(
            NAME,
            "cat-1",
            &[
                ("id", Value::string("cat-1")),
                ("organization_id", Value::string("org-1")),
            ],
        )
    }

    #[tokio::test]
    async fn create_posts_to_organization() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v2/applicationCategories/organization/org-1"))
            .and(body_json(json!({
                "name": "Internal",
                "description": "Internal tools",
                "color": "dark-blue"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "cat-1",
                "name": "Internal",
                "description": "Internal tools",
                "color": "dark-blue"
            })))
            .mount(&server)
            .await;

        let adapter = OrganizationCategoryResource::new(shared_client(&server).await);
        let state = adapter
            .create(&resource(
                NAME,
                &[
                    ("name", Value::string("Internal")),
                    ("description", Value::string("Internal tools")),
                    ("color", Value::string("dark-blue")),
                    ("organization_id", Value::string("org-1")),
                ],
            ))
            .await
            .unwrap();
        assert_eq!(state.identifier.as_deref(), Some("cat-1"));
        assert_eq!(state.get_str("organization_id"), Some("org-1"));
    }

    #[tokio::test]
    async fn create_requires_200() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({})))
            .mount(&server)
            .await;

        let adapter = OrganizationCategoryResource::new(shared_client(&server).await);
        let err = adapter
            .create(&resource(
                NAME,
                &[
                    ("name", Value::string("Internal")),
                    ("description", Value::string("")),
                    ("color", Value::string("orange")),
                    ("organization_id", Value::string("org-1")),
                ],
            ))
            .await
            .unwrap_err();
        assert!(err.message.starts_with("Error creating Application Category: 201"));
    }

    #[tokio::test]
    async fn read_of_empty_organization_warns() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v2/applicationCategories/organization/org-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        let adapter = OrganizationCategoryResource::new(shared_client(&server).await);
        let state = adapter.read(&stored_category()).await.unwrap();
        assert!(!state.exists);
        assert_eq!(state.diagnostics[0].summary, "No Application Categories exist");
    }

    #[tokio::test]
    async fn read_of_unknown_category_warns() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v2/applicationCategories/organization/org-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"id": "cat-2", "name": "Other", "description": "", "color": "yellow"}
            ])))
            .mount(&server)
            .await;

        let adapter = OrganizationCategoryResource::new(shared_client(&server).await);
        let state = adapter.read(&stored_category()).await.unwrap();
        assert!(!state.exists);
        assert_eq!(
            state.diagnostics[0].detail,
            "Application Category with ID cat-1 does not exist"
        );
    }

    #[tokio::test]
    async fn delete_of_missing_category_warns() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/api/v2/applicationCategories/organization/org-1/cat-1"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let adapter = OrganizationCategoryResource::new(shared_client(&server).await);
        let diagnostics = adapter.delete(&stored_category()).await.unwrap();
        assert_eq!(diagnostics.len(), 1);
    }

    #[tokio::test]
    async fn delete_expects_204() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let adapter = OrganizationCategoryResource::new(shared_client(&server).await);
        let err = adapter.delete(&stored_category()).await.unwrap_err();
        assert!(
            err.message
                .starts_with("Unexpected response code deleting Application Category")
        );
    }

    #[test]
    fn color_must_be_known() {
        let attrs = crate::testing::attrs(&[
            ("name", Value::string("Internal")),
            ("description", Value::string("")),
            ("color", Value::string("pink")),
            ("organization_id", Value::string("org-1")),
        ]);
        assert!(schema().validate(&attrs).is_err());
    }
}
