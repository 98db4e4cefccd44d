//! `application` resource

use std::sync::Arc;

use async_trait::async_trait;
use log::debug;
use sonatypeiq_core::provider::{ProviderError, ProviderResult};
use sonatypeiq_core::resource::{Diagnostic, Resource, ResourceId, State, Value};
use sonatypeiq_core::schema::{AttributeSchema, AttributeType, ResourceSchema};

use super::{ResourceAdapter, import_by_read, keep_last_updated, server_id, stamp_last_updated};
use crate::client::IqClient;
use crate::models::ApiApplication;
use crate::utils::{Attributes, api_error, get_string, require_string, set_string};

pub const NAME: &str = "application";

pub fn schema() -> ResourceSchema {
    ResourceSchema::new(NAME)
        .with_description("An application evaluated by IQ Server")
        .attribute(
            AttributeSchema::new("id", AttributeType::String)
                .computed()
                .with_description("Internal id of the application"),
        )
        .attribute(
            AttributeSchema::new("name", AttributeType::String)
                .required()
                .with_min_length(1),
        )
        .attribute(
            AttributeSchema::new("public_id", AttributeType::String)
                .required()
                .with_min_length(1)
                .with_provider_name("publicId"),
        )
        .attribute(
            AttributeSchema::new("organization_id", AttributeType::String)
                .required()
                .with_provider_name("organizationId")
                .with_description("Moving an application to another organization is done in place"),
        )
        .attribute(
            AttributeSchema::new("contact_user_name", AttributeType::String)
                .with_provider_name("contactUserName"),
        )
        .attribute(AttributeSchema::new("last_updated", AttributeType::String).computed())
}

fn to_api(attrs: &Attributes) -> ProviderResult<ApiApplication> {
    Ok(ApiApplication {
        id: get_string(attrs, "id"),
        public_id: require_string(attrs, "public_id")?,
        name: require_string(attrs, "name")?,
        organization_id: require_string(attrs, "organization_id")?,
        contact_user_name: get_string(attrs, "contact_user_name"),
        application_tags: Vec::new(),
    })
}

pub(crate) fn from_api(app: &ApiApplication) -> Attributes {
    let mut attrs = Attributes::new();
    set_string(&mut attrs, "id", app.id.clone());
    attrs.insert("name".to_string(), Value::string(&app.name));
    attrs.insert("public_id".to_string(), Value::string(&app.public_id));
    attrs.insert(
        "organization_id".to_string(),
        Value::string(&app.organization_id),
    );
    set_string(&mut attrs, "contact_user_name", app.contact_user_name.clone());
    attrs
}

pub struct ApplicationResource {
    client: Arc<IqClient>,
}

impl ApplicationResource {
    pub fn new(client: Arc<IqClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ResourceAdapter for ApplicationResource {
    fn name(&self) -> &'static str {
        NAME
    }

    fn schema(&self) -> ResourceSchema {
        schema()
    }

    async fn create(&self, resource: &Resource) -> ProviderResult<State> {
        let mut request = to_api(&resource.attributes)?;
        request.id = None;

        let app = self
            .client
            .add_application(&request)
            .await
            .map_err(|e| api_error("Error creating Application", e))?;
        let id = app
            .id
            .clone()
            .ok_or_else(|| ProviderError::new("Error creating Application: no id in response"))?;

        let mut attrs = from_api(&app);
        stamp_last_updated(&mut attrs);
        Ok(State::existing(resource.id.clone(), attrs).with_identifier(id))
    }

    async fn read(&self, current: &State) -> ProviderResult<State> {
        let Some(id) = server_id(current, "id") else {
            return Ok(State::not_found(current.id.clone()));
        };

        let app = match self.client.get_application(&id).await {
            Ok(app) => app,
            Err(e) if e.is_not_found() => {
                debug!("Application {} no longer exists", id);
                return Ok(State::not_found(current.id.clone()));
            }
            Err(e) => return Err(api_error("Error Reading IQ Application", e)),
        };

        let mut attrs = from_api(&app);
        attrs.insert("id".to_string(), Value::string(&id));
        keep_last_updated(current, &mut attrs);
        Ok(State::existing(current.id.clone(), attrs).with_identifier(id))
    }

    async fn update(&self, from: &State, to: &Resource) -> ProviderResult<State> {
        let id = server_id(from, "id")
            .ok_or_else(|| ProviderError::new("Error updating Application: unknown id"))?;
        let mut request = to_api(&to.attributes)?;
        request.id = Some(id.clone());

        if from.get_str("organization_id") != Some(request.organization_id.as_str()) {
            self.client
                .move_application(&id, &request.organization_id)
                .await
                .map_err(|e| api_error("Error moving application", e))?;
        }

        let app = self
            .client
            .update_application(&id, &request)
            .await
            .map_err(|e| api_error("Error updating Application", e))?;

        let mut attrs = from_api(&app);
        attrs.insert("id".to_string(), Value::string(&id));
        stamp_last_updated(&mut attrs);
        Ok(State::existing(to.id.clone(), attrs).with_identifier(id))
    }

    async fn delete(&self, current: &State) -> ProviderResult<Vec<Diagnostic>> {
        let Some(id) = server_id(current, "id") else {
            return Ok(Vec::new());
        };
        match self.client.delete_application(&id).await {
            Ok(()) => Ok(Vec::new()),
            Err(e) if e.is_not_found() => {
                debug!("Application {} was already deleted", id);
                Ok(Vec::new())
            }
            Err(e) => Err(api_error("Error deleting Application", e)),
        }
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
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn billing() -> Resource {
        resource(
            NAME,
            &[
                ("name", Value::string("Billing")),
                ("public_id", Value::string("billing")),
                ("organization_id", Value::string("org-1")),
            ],
        )
    }

    #[test]
    fn mapping() {
        let app = ApiApplication {
            id: Some("app-1".to_string()),
            public_id: "billing".to_string(),
            name: "Billing".to_string(),
            organization_id: "org-1".to_string(),
            contact_user_name: None,
            application_tags: Vec::new(),
        };
        let attrs = from_api(&app);
        assert!(!attrs.contains_key("contact_user_name"));
        assert_eq!(to_api(&attrs).unwrap(), app);
    }

    #[tokio::test]
    async fn create_records_server_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v2/applications"))
            .and(body_partial_json(json!({"publicId": "billing", "organizationId": "org-1"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "app-1",
                "publicId": "billing",
                "name": "Billing",
                "organizationId": "org-1"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let adapter = ApplicationResource::new(shared_client(&server).await);
        let state = adapter.create(&billing()).await.unwrap();
        assert_eq!(state.identifier.as_deref(), Some("app-1"));
        assert_eq!(state.get_str("id"), Some("app-1"));
        assert!(state.attributes.contains_key("last_updated"));
    }

    #[tokio::test]
    async fn create_failure_reports_status_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v2/applications"))
            .respond_with(ResponseTemplate::new(400).set_body_string("Duplicate public id"))
            .mount(&server)
            .await;

        let adapter = ApplicationResource::new(shared_client(&server).await);
        let err = adapter.create(&billing()).await.unwrap_err();
        assert_eq!(
            err.message,
            "Error creating Application: 400 Bad Request: Duplicate public id"
        );
    }

    #[tokio::test]
    async fn read_missing_application_removes_it() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v2/applications/app-1"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let adapter = ApplicationResource::new(shared_client(&server).await);
        let state = adapter
            .read(&stored(NAME, "app-1", &[("id", Value::string("app-1"))]))
            .await
            .unwrap();
        assert!(!state.exists);
    }

    #[tokio::test]
    async fn read_keeps_last_updated() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v2/applications/app-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "app-1",
                "publicId": "billing",
                "name": "Billing",
                "organizationId": "org-1",
                "contactUserName": "alice"
            })))
            .mount(&server)
            .await;

        let adapter = ApplicationResource::new(shared_client(&server).await);
        let current = stored(
            NAME,
            "app-1",
            &[("last_updated", Value::string("Monday, 05-Oct-26 10:00:00 UTC"))],
        );
        let state = adapter.read(&current).await.unwrap();
        assert_eq!(state.get_str("contact_user_name"), Some("alice"));
        assert_eq!(
            state.get_str("last_updated"),
            Some("Monday, 05-Oct-26 10:00:00 UTC")
        );
    }

    #[tokio::test]
    async fn update_moves_before_saving() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v2/applications/app-1/move/organization/org-1"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/api/v2/applications/app-1"))
            .and(body_partial_json(json!({"id": "app-1", "organizationId": "org-1"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "app-1",
                "publicId": "billing",
                "name": "Billing",
                "organizationId": "org-1"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let adapter = ApplicationResource::new(shared_client(&server).await);
        let from = stored(
            NAME,
            "app-1",
            &[
                ("id", Value::string("app-1")),
                ("organization_id", Value::string("org-0")),
            ],
        );
        let state = adapter.update(&from, &billing()).await.unwrap();
        assert_eq!(state.get_str("organization_id"), Some("org-1"));
    }

    #[tokio::test]
    async fn update_in_same_organization_does_not_move() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/api/v2/applications/app-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "app-1",
                "publicId": "billing",
                "name": "Billing",
                "organizationId": "org-1"
            })))
            .mount(&server)
            .await;

        let adapter = ApplicationResource::new(shared_client(&server).await);
        let from = stored(NAME, "app-1", &[("organization_id", Value::string("org-1"))]);
        adapter.update(&from, &billing()).await.unwrap();
    }

    #[tokio::test]
    async fn delete_tolerates_missing_application() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/api/v2/applications/app-1"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let adapter = ApplicationResource::new(shared_client(&server).await);
        let diagnostics = adapter.delete(&stored(NAME, "app-1", &[])).await.unwrap();
        assert!(diagnostics.is_empty());
    }

    #[tokio::test]
    async fn import_of_unknown_id_fails() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let adapter = ApplicationResource::new(shared_client(&server).await);
        let err = adapter
            .import(&ResourceId::new(NAME, "billing"), "nope")
            .await
            .unwrap_err();
        assert!(err.message.contains("non-existent"));
    }
}
