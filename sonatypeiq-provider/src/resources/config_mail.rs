//! `config_mail` resource: outgoing SMTP settings (singleton)

use std::sync::Arc;

use async_trait::async_trait;
use sonatypeiq_core::provider::ProviderResult;
use sonatypeiq_core::resource::{Diagnostic, Resource, ResourceId, State, Value};
use sonatypeiq_core::schema::{AttributeSchema, AttributeType, ResourceSchema, types};

use super::{ResourceAdapter, import_by_read, keep_last_updated, stamp_last_updated};
use crate::client::IqClient;
use crate::models::ApiMailConfiguration;
use crate::utils::{
    Attributes, api_error, get_bool, get_int, get_string, require_string, set_string,
};

pub const NAME: &str = "config_mail";

const DEFAULT_PORT: i64 = 465;

pub fn schema() -> ResourceSchema {
    ResourceSchema::new(NAME)
        .with_description("SMTP server IQ Server sends notifications through")
        .attribute(AttributeSchema::new("id", AttributeType::String).computed())
        .attribute(
            AttributeSchema::new("hostname", AttributeType::String)
                .required()
                .with_min_length(1),
        )
        .attribute(
            AttributeSchema::new("port", types::port())
                .optional_computed()
                .with_default(Value::Int(DEFAULT_PORT)),
        )
        .attribute(AttributeSchema::new("username", AttributeType::String))
        .attribute(AttributeSchema::new("password", AttributeType::String).write_only())
        .attribute(
            AttributeSchema::new("password_is_included", AttributeType::Bool)
                .optional_computed()
                .with_default(Value::Bool(false))
                .with_provider_name("passwordIsIncluded"),
        )
        .attribute(
            AttributeSchema::new("ssl_enabled", AttributeType::Bool)
                .optional_computed()
                .with_default(Value::Bool(true))
                .with_provider_name("sslEnabled"),
        )
        .attribute(
            AttributeSchema::new("start_tls_enabled", AttributeType::Bool)
                .optional_computed()
                .with_default(Value::Bool(true))
                .with_provider_name("startTlsEnabled"),
        )
        .attribute(
            AttributeSchema::new("system_email", AttributeType::String)
                .required()
                .with_provider_name("systemEmail"),
        )
        .attribute(AttributeSchema::new("last_updated", AttributeType::String).computed())
}

fn to_api(attrs: &Attributes) -> ProviderResult<ApiMailConfiguration> {
    let password = get_string(attrs, "password");
    Ok(ApiMailConfiguration {
        hostname: require_string(attrs, "hostname")?,
        port: get_int(attrs, "port").unwrap_or(DEFAULT_PORT),
        username: get_string(attrs, "username"),
        password_is_included: password.is_some(),
        password,
        ssl_enabled: get_bool(attrs, "ssl_enabled").unwrap_or(true),
        start_tls_enabled: get_bool(attrs, "start_tls_enabled").unwrap_or(true),
        system_email: require_string(attrs, "system_email")?,
    })
}

fn from_api(config: &ApiMailConfiguration) -> Attributes {
    let mut attrs = Attributes::new();
    attrs.insert("id".to_string(), Value::string(NAME));
    attrs.insert("hostname".to_string(), Value::string(&config.hostname));
    attrs.insert("port".to_string(), Value::Int(config.port));
    set_string(&mut attrs, "username", config.username.clone());
    attrs.insert(
        "password_is_included".to_string(),
        Value::Bool(config.password_is_included),
    );
    attrs.insert("ssl_enabled".to_string(), Value::Bool(config.ssl_enabled));
    attrs.insert(
        "start_tls_enabled".to_string(),
        Value::Bool(config.start_tls_enabled),
    );
    attrs.insert(
        "system_email".to_string(),
        Value::string(&config.system_email),
    );
    attrs
}

/// The server derives `passwordIsIncluded` from the request; state keeps the
/// configured flag
fn keep_password_flag(configured: &Attributes, attrs: &mut Attributes) {
    if let Some(flag) = get_bool(configured, "password_is_included") {
        attrs.insert("password_is_included".to_string(), Value::Bool(flag));
    }
}

pub struct ConfigMailResource {
    client: Arc<IqClient>,
}

impl ConfigMailResource {
    pub fn new(client: Arc<IqClient>) -> Self {
        Self { client }
    }

    async fn write(&self, resource: &Resource, summary: &str) -> ProviderResult<State> {
        let request = to_api(&resource.attributes)?;
        self.client
            .set_mail_config(&request)
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
impl ResourceAdapter for ConfigMailResource {
    fn name(&self) -> &'static str {
        NAME
    }

    fn schema(&self) -> ResourceSchema {
        schema()
    }

    async fn create(&self, resource: &Resource) -> ProviderResult<State> {
        self.write(resource, "Error creating Mail Configuration")
            .await
    }

    async fn read(&self, current: &State) -> ProviderResult<State> {
        let config = match self.client.get_mail_config().await {
            Ok(config) => config,
            Err(e) if e.is_not_found() => return Ok(State::not_found(current.id.clone())),
            Err(e) => return Err(api_error("Error reading Mail Configuration", e)),
        };

        let mut attrs = from_api(&config);
        keep_password_flag(&current.attributes, &mut attrs);
        keep_last_updated(current, &mut attrs);
        Ok(State::existing(current.id.clone(), attrs).with_identifier(NAME))
    }

    async fn update(&self, _from: &State, to: &Resource) -> ProviderResult<State> {
        self.write(to, "Error updating Mail Configuration").await
    }

    async fn delete(&self, _current: &State) -> ProviderResult<Vec<Diagnostic>> {
        match self.client.delete_mail_config().await {
            Ok(()) => Ok(Vec::new()),
            Err(e) if e.is_not_found() => Ok(Vec::new()),
            Err(e) => Err(api_error("Error deleting Mail Configuration", e)),
        }
    }

    async fn import(&self, id: &ResourceId, _import_id: &str) -> ProviderResult<State> {
        let seed = State::existing(id.clone(), Attributes::new()).with_identifier(NAME);
        import_by_read(self, seed).await
    }
}
