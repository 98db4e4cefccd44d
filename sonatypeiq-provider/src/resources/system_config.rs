//! `system_config` resource: the server's base URL settings
//!
//! A singleton; the state id is the type name.

use std::sync::Arc;

use async_trait::async_trait;
use sonatypeiq_core::provider::ProviderResult;
use sonatypeiq_core::resource::{Diagnostic, Resource, ResourceId, State, Value};
use sonatypeiq_core::schema::{AttributeSchema, AttributeType, ResourceSchema, types};

use super::{ResourceAdapter, import_by_read, keep_last_updated, stamp_last_updated};
use crate::client::IqClient;
use crate::models::ApiSystemConfig;
use crate::utils::{Attributes, api_error, get_bool, require_string, set_bool, set_string};

pub const NAME: &str = "system_config";

pub fn schema() -> ResourceSchema {
    ResourceSchema::new(NAME)
        .with_description("Base URL settings of IQ Server")
        .attribute(AttributeSchema::new("id", AttributeType::String).computed())
        .attribute(
            AttributeSchema::new("base_url", types::url())
                .required()
                .with_provider_name("baseUrl"),
        )
        .attribute(
            AttributeSchema::new("force_base_url", AttributeType::Bool)
                .required()
                .with_provider_name("forceBaseUrl"),
        )
        .attribute(AttributeSchema::new("last_updated", AttributeType::String).computed())
}

pub(crate) fn from_api(config: &ApiSystemConfig) -> Attributes {
    let mut attrs = Attributes::new();
    set_string(&mut attrs, "base_url", config.base_url.clone());
    set_bool(&mut attrs, "force_base_url", config.force_base_url);
    attrs
}

pub struct SystemConfigResource {
    client: Arc<IqClient>,
}

impl SystemConfigResource {
    pub fn new(client: Arc<IqClient>) -> Self {
        Self { client }
    }

    async fn write(&self, resource: &Resource, summary: &str) -> ProviderResult<State> {
        let request = ApiSystemConfig {
            base_url: Some(require_string(&resource.attributes, "base_url")?),
            force_base_url: Some(get_bool(&resource.attributes, "force_base_url").unwrap_or(false)),
        };
        self.client
            .set_system_config(&request)
            .await
            .map_err(|e| api_error(summary, e))?;

        let mut attrs = from_api(&request);
        attrs.insert("id".to_string(), Value::string(NAME));
        stamp_last_updated(&mut attrs);
        Ok(State::existing(resource.id.clone(), attrs).with_identifier(NAME))
    }
}

#[async_trait]
impl ResourceAdapter for SystemConfigResource {
    fn name(&self) -> &'static str {
        NAME
    }

    fn schema(&self) -> ResourceSchema {
        schema()
    }

    async fn create(&self, resource: &Resource) -> ProviderResult<State> {
        self.write(resource, "Error creating System Configuration")
            .await
    }

    async fn read(&self, current: &State) -> ProviderResult<State> {
        let config = self
            .client
            .get_system_config()
            .await
            .map_err(|e| api_error("Error reading System Configuration", e))?;

        let mut attrs = from_api(&config);
        attrs.insert("id".to_string(), Value::string(NAME));
        keep_last_updated(current, &mut attrs);
        Ok(State::existing(current.id.clone(), attrs).with_identifier(NAME))
    }

    async fn update(&self, _from: &State, to: &Resource) -> ProviderResult<State> {
        self.write(to, "Error updating System Configuration").await
    }

    /// The base URL cannot be unset; forgetting it is enough
    async fn delete(&self, _current: &State) -> ProviderResult<Vec<Diagnostic>> {
        Ok(Vec::new())
    }

    async fn import(&self, id: &ResourceId, _import_id: &str) -> ProviderResult<State> {
        let seed = State::existing(id.clone(), Attributes::new()).with_identifier(NAME);
        import_by_read(self, seed).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{resource, shared_client, stored, writes_to};
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn create_puts_config() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/api/v2/config"))
            .and(body_json(json!({
                "baseUrl": "https://iq.example.com/",
                "forceBaseUrl": true
            })))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let adapter = SystemConfigResource::new(shared_client(&server).await);
        let state = adapter
            .create(&resource(
                NAME,
                &[
                    ("base_url", Value::string("https://iq.example.com/")),
                    ("force_base_url", Value::Bool(true)),
                ],
            ))
            .await
            .unwrap();
        assert_eq!(state.identifier.as_deref(), Some(NAME));
        assert_eq!(state.get_str("id"), Some(NAME));
    }

    #[tokio::test]
    async fn second_write_replaces_the_first() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/api/v2/config"))
            .respond_with(ResponseTemplate::new(204))
            .expect(2)
            .mount(&server)
            .await;

        let adapter = SystemConfigResource::new(shared_client(&server).await);
        let created = adapter
            .create(&resource(
                NAME,
                &[
                    ("base_url", Value::string("https://iq.example.com/")),
                    ("force_base_url", Value::Bool(true)),
                ],
            ))
            .await
            .unwrap();
        let updated = adapter
            .update(
                &created,
                &resource(
                    NAME,
                    &[
                        ("base_url", Value::string("https://iq.example.org/")),
                        ("force_base_url", Value::Bool(false)),
                    ],
                ),
            )
            .await
            .unwrap();
        assert_eq!(updated.get_str("base_url"), Some("https://iq.example.org/"));

        let bodies = writes_to(&server, "PUT", "/api/v2/config").await;
        assert_eq!(bodies.len(), 2);
        let last: serde_json::Value = serde_json::from_slice(&bodies[1]).unwrap();
        assert_eq!(
            last,
            json!({
                "baseUrl": "https://iq.example.org/",
                "forceBaseUrl": false
            })
        );
    }

    #[tokio::test]
    async fn read_requires_200() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v2/config"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        let adapter = SystemConfigResource::new(shared_client(&server).await);
        assert!(adapter.read(&stored(NAME, NAME, &[])).await.is_err());
    }

    #[tokio::test]
    async fn delete_is_a_no_op() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .respond_with(ResponseTemplate::new(204))
            .expect(0)
            .mount(&server)
            .await;

        let adapter = SystemConfigResource::new(shared_client(&server).await);
        assert!(adapter.delete(&stored(NAME, NAME, &[])).await.unwrap().is_empty());
    }

    #[test]
    fn base_url_must_be_a_url() {
        let attrs = crate::testing::attrs(&[
            ("base_url", Value::string("not a url")),
            ("force_base_url", Value::Bool(false)),
        ]);
        assert!(schema().validate(&attrs).is_err());
    }
}
