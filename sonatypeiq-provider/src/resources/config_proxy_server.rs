//! `config_proxy_server` resource: outbound HTTP proxy (singleton)

use std::sync::Arc;

use async_trait::async_trait;
use sonatypeiq_core::provider::{ProviderError, ProviderResult};
use sonatypeiq_core::resource::{Diagnostic, Resource, ResourceId, State, Value};
use sonatypeiq_core::schema::{AttributeSchema, AttributeType, ResourceSchema, types};

use super::{ResourceAdapter, import_by_read, keep_last_updated, stamp_last_updated};
use crate::client::IqClient;
use crate::models::ApiProxyServerConfiguration;
use crate::utils::{
    Attributes, api_error, get_bool, get_int, get_string, get_string_list, require_string,
    set_string, string_list,
};

pub const NAME: &str = "config_proxy_server";

pub fn schema() -> ResourceSchema {
    ResourceSchema::new(NAME)
        .with_description("HTTP proxy IQ Server uses for outbound connections")
        .attribute(AttributeSchema::new("id", AttributeType::String).computed())
        .attribute(
            AttributeSchema::new("hostname", AttributeType::String)
                .required()
                .with_min_length(1),
        )
        .attribute(AttributeSchema::new("port", types::port()).required())
        .attribute(AttributeSchema::new("username", AttributeType::String))
        .attribute(AttributeSchema::new("password", AttributeType::String).write_only())
        .attribute(
            AttributeSchema::new("password_is_included", AttributeType::Bool)
                .optional_computed()
                .with_default(Value::Bool(false))
                .with_provider_name("passwordIsIncluded"),
        )
        .attribute(
            AttributeSchema::new(
                "exclude_hosts",
                AttributeType::List(Box::new(AttributeType::String)),
            )
            .optional_computed()
            .with_provider_name("excludeHosts"),
        )
        .attribute(AttributeSchema::new("last_updated", AttributeType::String).computed())
}

fn to_api(attrs: &Attributes) -> ProviderResult<ApiProxyServerConfiguration> {
    let password = get_string(attrs, "password");
    Ok(ApiProxyServerConfiguration {
        hostname: require_string(attrs, "hostname")?,
        port: get_int(attrs, "port")
            .ok_or_else(|| ProviderError::new("Missing required attribute 'port'"))?,
        username: get_string(attrs, "username"),
        password_is_included: password.is_some(),
        password,
        exclude_hosts: get_string_list(attrs, "exclude_hosts"),
    })
}

fn from_api(config: &ApiProxyServerConfiguration) -> Attributes {
    let mut attrs = Attributes::new();
    attrs.insert("id".to_string(), Value::string(NAME));
    attrs.insert("hostname".to_string(), Value::string(&config.hostname));
    attrs.insert("port".to_string(), Value::Int(config.port));
    set_string(&mut attrs, "username", config.username.clone());
    attrs.insert(
        "password_is_included".to_string(),
        Value::Bool(config.password_is_included),
    );
    attrs.insert(
        "exclude_hosts".to_string(),
        string_list(&config.exclude_hosts),
    );
    attrs
}

fn keep_password_flag(configured: &Attributes, attrs: &mut Attributes) {
    if let Some(flag) = get_bool(configured, "password_is_included") {
        attrs.insert("password_is_included".to_string(), Value::Bool(flag));
    }
}

pub struct ConfigProxyServerResource {
    client: Arc<IqClient>,
}

impl ConfigProxyServerResource {
    pub fn new(client: Arc<IqClient>) -> Self {
        Self { client }
    }

    async fn write(&self, resource: &Resource, summary: &str) -> ProviderResult<State> {
        let request = to_api(&resource.attributes)?;
        self.client
            .set_proxy_server_config(&request)
            .await
            .map_err(|e| api_error(summary, e))?;

        let mut attrs = from_api(&request);
        set_string(&mut attrs, "password", request.password.clone());
        keep_password_flag(&resource.attributes, &mut attrs);
        stamp_last_updated(&mut attrs);
        Ok(State::existing(resource.id.clone(), attrs).with_identifier(NAME))
    }
}

#[async_trait]
impl ResourceAdapter for ConfigProxyServerResource {
    fn name(&self) -> &'static str {
        NAME
    }

    fn schema(&self) -> ResourceSchema {
        schema()
    }

    async fn create(&self, resource: &Resource) -> ProviderResult<State> {
        self.write(resource, "Error creating Proxy Server Configuration")
            .await
    }

    async fn read(&self, current: &State) -> ProviderResult<State> {
        let config = match self.client.get_proxy_server_config().await {
            Ok(config) => config,
            Err(e) if e.is_not_found() => return Ok(State::not_found(current.id.clone())),
            Err(e) => return Err(api_error("Error reading Proxy Server Configuration", e)),
        };

        let mut attrs = from_api(&config);
        keep_password_flag(&current.attributes, &mut attrs);
        keep_last_updated(current, &mut attrs);
        Ok(State::existing(current.id.clone(), attrs).with_identifier(NAME))
    }

    async fn update(&self, _from: &State, to: &Resource) -> ProviderResult<State> {
        self.write(to, "Error updating Proxy Server Configuration")
            .await
    }

    async fn delete(&self, _current: &State) -> ProviderResult<Vec<Diagnostic>> {
        match self.client.delete_proxy_server_config().await {
            Ok(()) => Ok(Vec::new()),
            Err(e) if e.is_not_found() => Ok(Vec::new()),
            Err(e) => Err(api_error("Error deleting Proxy Server Configuration", e)),
        }
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
    use sonatypeiq_core::differ::diff;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn exclude_hosts_are_plain_strings() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/api/v2/config/httpProxyServer"))
            .and(body_json(json!({
                "hostname": "proxy.internal",
                "port": 3128,
                "passwordIsIncluded": false,
                "excludeHosts": ["localhost", "*.internal"]
            })))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let adapter = ConfigProxyServerResource::new(shared_client(&server).await);
        let state = adapter
            .create(&resource(
                NAME,
                &[
                    ("hostname", Value::string("proxy.internal")),
                    ("port", Value::Int(3128)),
                    (
                        "exclude_hosts",
                        Value::List(vec![
                            Value::string("localhost"),
                            Value::string("*.internal"),
                        ]),
                    ),
                ],
            ))
            .await
            .unwrap();
        assert_eq!(
            get_string_list(&state.attributes, "exclude_hosts"),
            vec!["localhost".to_string(), "*.internal".to_string()]
        );
    }

    #[tokio::test]
    async fn read_maps_response() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v2/config/httpProxyServer"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "hostname": "proxy.internal",
                "port": 3128,
                "username": "svc",
                "passwordIsIncluded": true
            })))
            .mount(&server)
            .await;

        let adapter = ConfigProxyServerResource::new(shared_client(&server).await);
        let state = adapter.read(&stored(NAME, NAME, &[])).await.unwrap();
        assert_eq!(state.attributes.get("port"), Some(&Value::Int(3128)));
        assert_eq!(state.get_str("username"), Some("svc"));
        assert_eq!(state.attributes.get("exclude_hosts"), Some(&Value::List(vec![])));
    }

    #[tokio::test]
    async fn second_write_replaces_the_first() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/api/v2/config/httpProxyServer"))
            .respond_with(ResponseTemplate::new(204))
            .expect(2)
            .mount(&server)
            .await;

        let adapter = ConfigProxyServerResource::new(shared_client(&server).await);
        let first = resource(
            NAME,
            &[
                ("hostname", Value::string("proxy.internal")),
                ("port", Value::Int(3128)),
            ],
        );
        let second = resource(
            NAME,
            &[
                ("hostname", Value::string("squid.internal")),
                ("port", Value::Int(8080)),
                ("exclude_hosts", Value::List(vec![Value::string("localhost")])),
            ],
        );
        let created = adapter.create(&first).await.unwrap();
        let updated = adapter.update(&created, &second).await.unwrap();
        assert_eq!(updated.attributes.get("port"), Some(&Value::Int(8080)));

        let bodies = writes_to(&server, "PUT", "/api/v2/config/httpProxyServer").await;
        assert_eq!(bodies.len(), 2);
        let last: serde_json::Value = serde_json::from_slice(&bodies[1]).unwrap();
        assert_eq!(last, serde_json::to_value(to_api(&second.attributes).unwrap()).unwrap());
    }

    #[tokio::test]
    async fn empty_exclude_hosts_converge() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/api/v2/config/httpProxyServer"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        let adapter = ConfigProxyServerResource::new(shared_client(&server).await);
        let explicit = resource(
            NAME,
            &[
                ("hostname", Value::string("proxy.internal")),
                ("port", Value::Int(3128)),
                ("exclude_hosts", Value::List(vec![])),
            ],
        );
        let state = adapter.create(&explicit).await.unwrap();
        assert!(!diff(&explicit, &state, Some(&schema())).is_change());

        let omitted = resource(
            NAME,
            &[
                ("hostname", Value::string("proxy.internal")),
                ("port", Value::Int(3128)),
            ],
        );
        let state = adapter.create(&omitted).await.unwrap();
        assert!(!diff(&omitted, &state, Some(&schema())).is_change());
    }

    #[test]
    fn port_out_of_range() {
        let attrs = crate::testing::attrs(&[
            ("hostname", Value::string("proxy.internal")),
            ("port", Value::Int(70000)),
        ]);
        assert!(schema().validate(&attrs).is_err());
    }
}
