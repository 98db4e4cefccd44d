//! `user_token` resource: the API token of the authenticated user
//!
//! `generated_at` is an arbitrary caller-chosen marker; changing it rotates
//! the token.

use std::sync::Arc;

use async_trait::async_trait;
use sonatypeiq_core::provider::ProviderResult;
use sonatypeiq_core::resource::{Diagnostic, Resource, State, Value};
use sonatypeiq_core::schema::{AttributeSchema, AttributeType, ResourceSchema};

use super::{ResourceAdapter, stamp_last_updated};
use crate::client::IqClient;
use crate::utils::{Attributes, api_error, require_string};

pub const NAME: &str = "user_token";

pub fn schema() -> ResourceSchema {
    ResourceSchema::new(NAME)
        .with_description("User token for the user the provider authenticates as")
        .attribute(AttributeSchema::new("id", AttributeType::String).computed())
        .attribute(
            AttributeSchema::new("generated_at", AttributeType::String)
                .required()
                .with_min_length(1)
                .requires_replace(),
        )
        .attribute(
            AttributeSchema::new("user_code", AttributeType::String)
                .computed()
                .with_provider_name("userCode"),
        )
        .attribute(
            AttributeSchema::new("pass_code", AttributeType::String)
                .computed()
                .sensitive()
                .with_provider_name("passCode"),
        )
        .attribute(AttributeSchema::new("last_updated", AttributeType::String).computed())
}

pub struct UserTokenResource {
    client: Arc<IqClient>,
}

impl UserTokenResource {
    pub fn new(client: Arc<IqClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ResourceAdapter for UserTokenResource {
    fn name(&self) -> &'static str {
        NAME
    }

    fn schema(&self) -> ResourceSchema {
        schema()
    }

    async fn create(&self, resource: &Resource) -> ProviderResult<State> {
        let generated_at = require_string(&resource.attributes, "generated_at")?;
        let token = self
            .client
            .create_user_token()
            .await
            .map_err(|e| api_error("Error creating User Token", e))?;

        let mut attrs = Attributes::new();
        attrs.insert("id".to_string(), Value::string(NAME));
        attrs.insert("generated_at".to_string(), Value::String(generated_at));
        attrs.insert("user_code".to_string(), Value::String(token.user_code));
        attrs.insert("pass_code".to_string(), Value::String(token.pass_code));
        stamp_last_updated(&mut attrs);
        Ok(State::existing(resource.id.clone(), attrs).with_identifier(NAME))
    }

    /// The token itself cannot be read back; only its existence is checked
    async fn read(&self, current: &State) -> ProviderResult<State> {
        let exists = match self.client.user_token_exists().await {
            Ok(exists) => exists,
            Err(e) if e.is_not_found() => false,
            Err(e) => return Err(api_error("Error reading User Token", e)),
        };

        if exists {
            Ok(current.clone())
        } else {
            Ok(State::not_found(current.id.clone()).with_warning(
                "No User Token exists for User in Realm",
                "The User Token was removed outside of this tool",
            ))
        }
    }

    async fn update(&self, from: &State, to: &Resource) -> ProviderResult<State> {
        let diagnostics = self.delete(from).await?;
        let state = self.create(to).await?;
        Ok(state.with_diagnostics(diagnostics))
    }

    async fn delete(&self, _current: &State) -> ProviderResult<Vec<Diagnostic>> {
        match self.client.delete_user_token().await {
            Ok(()) => Ok(Vec::new()),
            Err(e) if e.is_not_found() => Ok(Vec::new()),
            Err(e) => Err(api_error("Error deleting User Token", e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{resource, shared_client, stored};
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn pass_code_is_sensitive() {
        let schema = schema();
        assert!(schema.is_sensitive("pass_code"));
        assert!(schema.forces_replacement("generated_at"));
    }

    #[tokio::test]
    async fn create_stores_codes() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v2/userTokens"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "userCode": "Xa1b2c3",
                "passCode": "secretpass"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let adapter = UserTokenResource::new(shared_client(&server).await);
        let state = adapter
            .create(&resource(NAME, &[("generated_at", Value::string("2024-01-01"))]))
            .await
            .unwrap();
        assert_eq!(state.get_str("user_code"), Some("Xa1b2c3"));
        assert_eq!(state.get_str("pass_code"), Some("secretpass"));
        assert_eq!(state.identifier.as_deref(), Some(NAME));
    }

    #[tokio::test]
    async fn read_missing_token_warns() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v2/userTokens/currentUser/hasToken"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "userTokenExists": false
            })))
            .mount(&server)
            .await;

        let adapter = UserTokenResource::new(shared_client(&server).await);
        let state = adapter.read(&stored(NAME, NAME, &[])).await.unwrap();
        assert!(!state.exists);
        assert_eq!(
            state.diagnostics[0].summary,
            "No User Token exists for User in Realm"
        );
    }

    #[tokio::test]
    async fn read_existing_token_keeps_state() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v2/userTokens/currentUser/hasToken"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "userTokenExists": true
            })))
            .mount(&server)
            .await;

        let adapter = UserTokenResource::new(shared_client(&server).await);
        let current = stored(NAME, NAME, &[("user_code", Value::string("Xa1b2c3"))]);
        assert_eq!(adapter.read(&current).await.unwrap(), current);
    }

    #[tokio::test]
    async fn delete_expects_204() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/api/v2/userTokens/currentUser"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let adapter = UserTokenResource::new(shared_client(&server).await);
        assert!(adapter.delete(&stored(NAME, NAME, &[])).await.is_err());
    }

    #[tokio::test]
    async fn delete_tolerates_missing_token() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/api/v2/userTokens/currentUser"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;

        let adapter = UserTokenResource::new(shared_client(&server).await);
        let diagnostics = adapter.delete(&stored(NAME, NAME, &[])).await.unwrap();
        assert!(diagnostics.is_empty());
    }
}
