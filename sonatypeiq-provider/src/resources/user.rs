//! `user` resource: local IQ Server user accounts

use std::sync::Arc;

use async_trait::async_trait;
use log::warn;
use sonatypeiq_core::provider::{ProviderError, ProviderResult};
use sonatypeiq_core::resource::{Diagnostic, Resource, ResourceId, State, Value};
use sonatypeiq_core::schema::{AttributeSchema, AttributeType, ResourceSchema};

use super::{ResourceAdapter, import_by_read, keep_last_updated, server_id, stamp_last_updated};
use crate::client::IqClient;
use crate::identity::user_id;
use crate::models::ApiUser;
use crate::utils::{Attributes, api_error, get_string, require_string};

pub const NAME: &str = "user";

pub const INTERNAL_REALM: &str = "Internal";

pub fn schema() -> ResourceSchema {
    ResourceSchema::new(NAME)
        .with_description("User account in the Internal realm")
        .attribute(AttributeSchema::new("id", AttributeType::String).computed())
        .attribute(
            AttributeSchema::new("username", AttributeType::String)
                .required()
                .with_min_length(1),
        )
        .attribute(
            AttributeSchema::new("password", AttributeType::String)
                .write_only()
                .with_description("Only used on create; IQ Server cannot change it afterwards"),
        )
        .attribute(
            AttributeSchema::new("first_name", AttributeType::String)
                .required()
                .with_provider_name("firstName"),
        )
        .attribute(
            AttributeSchema::new("last_name", AttributeType::String)
                .required()
                .with_provider_name("lastName"),
        )
        .attribute(AttributeSchema::new("email", AttributeType::String).required())
        .attribute(
            AttributeSchema::new("realm", AttributeType::String)
                .optional_computed()
                .with_default(Value::string(INTERNAL_REALM)),
        )
        .attribute(AttributeSchema::new("last_updated", AttributeType::String).computed())
}

fn realm_of(attrs: &Attributes) -> ProviderResult<String> {
    let realm = get_string(attrs, "realm").unwrap_or_else(|| INTERNAL_REALM.to_string());
    if realm != INTERNAL_REALM {
        return Err(ProviderError::new(
            "Unsupported Realm: Only the 'Internal' Realm is supported currently.",
        ));
    }
    Ok(realm)
}

fn to_api(attrs: &Attributes, password: Option<String>) -> ProviderResult<ApiUser> {
    Ok(ApiUser {
        username: require_string(attrs, "username")?,
        password,
        first_name: require_string(attrs, "first_name")?,
        last_name: require_string(attrs, "last_name")?,
        email: require_string(attrs, "email")?,
        realm: Some(realm_of(attrs)?),
    })
}

fn from_api(user: &ApiUser) -> Attributes {
    let realm = user.realm.as_deref().unwrap_or(INTERNAL_REALM);
    let mut attrs = Attributes::new();
    attrs.insert("id".to_string(), Value::String(user_id(&user.username, realm)));
    attrs.insert("username".to_string(), Value::string(&user.username));
    attrs.insert("first_name".to_string(), Value::string(&user.first_name));
    attrs.insert("last_name".to_string(), Value::string(&user.last_name));
    attrs.insert("email".to_string(), Value::string(&user.email));
    attrs.insert("realm".to_string(), Value::string(realm));
    attrs
}

pub struct UserResource {
    client: Arc<IqClient>,
}

impl UserResource {
    pub fn new(client: Arc<IqClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ResourceAdapter for UserResource {
    fn name(&self) -> &'static str {
        NAME
    }

    fn schema(&self) -> ResourceSchema {
        schema()
    }

    async fn create(&self, resource: &Resource) -> ProviderResult<State> {
        let password = get_string(&resource.attributes, "password").ok_or_else(|| {
            ProviderError::new(
                "No Password supplied: Password is required when creating a User",
            )
        })?;
        let request = to_api(&resource.attributes, Some(password.clone()))?;
        self.client
            .add_user(&request)
            .await
            .map_err(|e| api_error("Error creating User", e))?;

        let mut attrs = from_api(&request);
        attrs.insert("password".to_string(), Value::String(password));
        stamp_last_updated(&mut attrs);
        Ok(State::existing(resource.id.clone(), attrs).with_identifier(&request.username))
    }

    async fn read(&self, current: &State) -> ProviderResult<State> {
        let username = server_id(current, "username")
            .ok_or_else(|| ProviderError::new("User has no username in state"))?;
        let user = match self.client.get_user(&username).await {
            Ok(user) => user,
            Err(e) if e.is_not_found() => return Ok(State::not_found(current.id.clone())),
            Err(e) => return Err(api_error("Error reading User", e)),
        };

        let mut attrs = from_api(&user);
        keep_last_updated(current, &mut attrs);
        Ok(State::existing(current.id.clone(), attrs).with_identifier(&user.username))
    }

    async fn update(&self, from: &State, to: &Resource) -> ProviderResult<State> {
        let username = server_id(from, "username")
            .ok_or_else(|| ProviderError::new("User has no username in state"))?;

        let mut diagnostics = Vec::new();
        let prior_password = from.attributes.get("password");
        let desired_password = to.attributes.get("password");
        if desired_password.is_some() && prior_password != desired_password {
            warn!("Password change for user '{}' skipped", username);
            diagnostics.push(Diagnostic::warning(
                "Cannot change User Password - will be skipped",
                "Changing User Password is not supported by Sonatype IQ Server",
            ));
        }

        let request = to_api(&to.attributes, None)?;
        let user = self
            .client
            .update_user(&username, &request)
            .await
            .map_err(|e| api_error("Error updating User", e))?;

        // Record the desired password so the skipped change does not plan again
        let mut attrs = from_api(&user);
        if let Some(password) = desired_password.or(prior_password) {
            attrs.insert("password".to_string(), password.clone());
        }
        stamp_last_updated(&mut attrs);
        Ok(State::existing(to.id.clone(), attrs)
            .with_identifier(&user.username)
            .with_diagnostics(diagnostics))
    }

    async fn delete(&self, current: &State) -> ProviderResult<Vec<Diagnostic>> {
        let Some(username) = server_id(current, "username") else {
            return Ok(Vec::new());
        };
        match self.client.delete_user(&username).await {
            Ok(()) => Ok(Vec::new()),
            Err(e) if e.is_not_found() => Ok(Vec::new()),
            Err(e) => Err(api_error("Error deleting User", e)),
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
    use sonatypeiq_core::differ::{Diff, diff};
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn alice(extra: &[(&str, Value)]) -> Resource {
        let mut pairs = vec![
            ("username", Value::string("alice")),
            ("first_name", Value::string("Alice")),
            ("last_name", Value::string("Smith")),
            ("email", Value::string("alice@example.com")),
        ];
        pairs.extend(extra.iter().cloned());
        resource(NAME, &pairs)
    }

    fn alice_json() -> serde_json::Value {
        json!({
            "username": "alice",
            "firstName": "Alice",
            "lastName": "Smith",
            "email": "alice@example.com",
            "realm": "Internal"
        })
    }

    #[tokio::test]
    async fn create_requires_password() {
        let server = MockServer::start().await;
        let adapter = UserResource::new(shared_client(&server).await);
        let err = adapter.create(&alice(&[])).await.unwrap_err();
        assert!(err.message.starts_with("No Password supplied"));
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn create_rejects_other_realms() {
        let server = MockServer::start().await;
        let adapter = UserResource::new(shared_client(&server).await);
        let err = adapter
            .create(&alice(&[
                ("password", Value::string("pw")),
                ("realm", Value::string("SAML")),
            ]))
            .await
            .unwrap_err();
        assert!(err.message.starts_with("Unsupported Realm"));
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn create_derives_id_from_username_and_realm() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v2/users"))
            .and(body_json(json!({
                "username": "alice",
                "password": "pw",
                "firstName": "Alice",
                "lastName": "Smith",
                "email": "alice@example.com",
                "realm": "Internal"
            })))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let adapter = UserResource::new(shared_client(&server).await);
        let state = adapter
            .create(&alice(&[("password", Value::string("pw"))]))
            .await
            .unwrap();
        assert_eq!(state.identifier.as_deref(), Some("alice"));
        assert_eq!(state.get_str("id"), Some(user_id("alice", "Internal").as_str()));
        assert_eq!(state.get_str("realm"), Some("Internal"));
    }

    #[tokio::test]
    async fn read_returns_fields_without_password() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v2/users/alice"))
            .respond_with(ResponseTemplate::new(200).set_body_json(alice_json()))
            .mount(&server)
            .await;

        let adapter = UserResource::new(shared_client(&server).await);
        let state = adapter.read(&stored(NAME, "alice", &[])).await.unwrap();
        assert_eq!(state.get_str("email"), Some("alice@example.com"));
        assert!(!state.attributes.contains_key("password"));
    }

    #[tokio::test]
    async fn update_skips_password_change_with_warning() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/api/v2/users/alice"))
            .respond_with(ResponseTemplate::new(200).set_body_json(alice_json()))
            .expect(1)
            .mount(&server)
            .await;

        let adapter = UserResource::new(shared_client(&server).await);
        let prior = stored(NAME, "alice", &[("password", Value::string("old"))]);
        let state = adapter
            .update(&prior, &alice(&[("password", Value::string("new"))]))
            .await
            .unwrap();
        assert_eq!(
            state.diagnostics[0].summary,
            "Cannot change User Password - will be skipped"
        );
        assert_eq!(state.get_str("password"), Some("new"));

        let requests = server.received_requests().await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
        assert!(body.get("password").is_none());
    }

    #[tokio::test]
    async fn skipped_password_change_converges() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/api/v2/users/alice"))
            .respond_with(ResponseTemplate::new(200).set_body_json(alice_json()))
            .mount(&server)
            .await;

        let adapter = UserResource::new(shared_client(&server).await);
        let prior = stored(NAME, "alice", &[("password", Value::string("old"))]);
        let desired = alice(&[("password", Value::string("new"))]);
        let after = adapter.update(&prior, &desired).await.unwrap();
        assert_eq!(diff(&desired, &after, Some(&schema())), Diff::NoChange(desired.id.clone()));
    }

    #[tokio::test]
    async fn delete_tolerates_missing_user() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/api/v2/users/alice"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let adapter = UserResource::new(shared_client(&server).await);
        assert!(adapter.delete(&stored(NAME, "alice", &[])).await.is_ok());
    }
}
