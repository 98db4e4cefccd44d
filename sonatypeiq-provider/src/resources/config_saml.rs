//! `config_saml` resource: SAML single sign-on (singleton)

use std::sync::Arc;

use async_trait::async_trait;
use sonatypeiq_core::provider::ProviderResult;
use sonatypeiq_core::resource::{Diagnostic, Resource, ResourceId, State, Value};
use sonatypeiq_core::schema::{AttributeSchema, AttributeType, ResourceSchema, types};

use super::{ResourceAdapter, import_by_read};
use crate::client::IqClient;
use crate::models::ApiSamlConfiguration;
use crate::utils::{
    Attributes, api_error, get_bool, get_string, require_string, set_bool, set_string,
};

pub const NAME: &str = "config_saml";

/// Optional assertion attribute-name mappings
const OPTIONAL_MAPPINGS: &[&str] = &[
    "first_name_attribute",
    "last_name_attribute",
    "email_attribute",
    "groups_attribute",
];

pub fn schema() -> ResourceSchema {
    let mut schema = ResourceSchema::new(NAME)
        .with_description("SAML identity provider used for single sign-on")
        .attribute(AttributeSchema::new("id", AttributeType::String).computed())
        .attribute(
            AttributeSchema::new("identity_provider_name", AttributeType::String)
                .required()
                .with_min_length(2)
                .with_provider_name("identityProviderName"),
        )
        .attribute(
            AttributeSchema::new("idp_metadata", types::xml_document())
                .required()
                .with_min_length(10)
                .with_provider_name("identityProviderXml"),
        )
        .attribute(
            AttributeSchema::new("entity_id", AttributeType::String)
                .with_min_length(1)
                .with_provider_name("entityId"),
        )
        .attribute(
            AttributeSchema::new("username_attribute", AttributeType::String)
                .required()
                .with_min_length(1)
                .with_provider_name("usernameAttributeName"),
        )
        .attribute(
            AttributeSchema::new("validate_response_signature", AttributeType::Bool)
                .with_provider_name("validateResponseSignature"),
        )
        .attribute(
            AttributeSchema::new("validate_assertion_signature", AttributeType::Bool)
                .with_provider_name("validateAssertionSignature"),
        );
    for name in OPTIONAL_MAPPINGS {
        schema = schema.attribute(
            AttributeSchema::new(*name, AttributeType::String).with_min_length(1),
        );
    }
    schema
}

fn to_api(attrs: &Attributes) -> ProviderResult<ApiSamlConfiguration> {
    Ok(ApiSamlConfiguration {
        identity_provider_name: require_string(attrs, "identity_provider_name")?,
        entity_id: get_string(attrs, "entity_id"),
        first_name_attribute_name: get_string(attrs, "first_name_attribute"),
        last_name_attribute_name: get_string(attrs, "last_name_attribute"),
        email_attribute_name: get_string(attrs, "email_attribute"),
        username_attribute_name: require_string(attrs, "username_attribute")?,
        groups_attribute_name: get_string(attrs, "groups_attribute"),
        validate_assertion_signature: get_bool(attrs, "validate_assertion_signature"),
        validate_response_signature: get_bool(attrs, "validate_response_signature"),
        identity_provider_metadata_xml: None,
    })
}

fn from_api(config: &ApiSamlConfiguration) -> Attributes {
    let mut attrs = Attributes::new();
    attrs.insert("id".to_string(), Value::string(NAME));
    attrs.insert(
        "identity_provider_name".to_string(),
        Value::string(&config.identity_provider_name),
    );
    set_string(
        &mut attrs,
        "idp_metadata",
        config.identity_provider_metadata_xml.clone(),
    );
    set_string(&mut attrs, "entity_id", config.entity_id.clone());
    attrs.insert(
        "username_attribute".to_string(),
        Value::string(&config.username_attribute_name),
    );
    set_string(
        &mut attrs,
        "first_name_attribute",
        config.first_name_attribute_name.clone(),
    );
    set_string(
        &mut attrs,
        "last_name_attribute",
        config.last_name_attribute_name.clone(),
    );
    set_string(&mut attrs, "email_attribute", config.email_attribute_name.clone());
    set_string(&mut attrs, "groups_attribute", config.groups_attribute_name.clone());
    set_bool(
        &mut attrs,
        "validate_assertion_signature",
        config.validate_assertion_signature,
    );
    set_bool(
        &mut attrs,
        "validate_response_signature",
        config.validate_response_signature,
    );
    attrs
}

pub struct ConfigSamlResource {
    client: Arc<IqClient>,
}

impl ConfigSamlResource {
    pub fn new(client: Arc<IqClient>) -> Self {
        Self { client }
    }

    async fn write(&self, resource: &Resource, summary: &str) -> ProviderResult<State> {
        let metadata = require_string(&resource.attributes, "idp_metadata")?;
        let mut request = to_api(&resource.attributes)?;
        self.client
            .set_saml_config(&metadata, &request)
            .await
            .map_err(|e| api_error(summary, e))?;

        request.identity_provider_metadata_xml = Some(metadata);
        Ok(State::existing(resource.id.clone(), from_api(&request)).with_identifier(NAME))
    }
}

#[async_trait]
impl ResourceAdapter for ConfigSamlResource {
    fn name(&self) -> &'static str {
        NAME
    }

    fn schema(&self) -> ResourceSchema {
        schema()
    }

    async fn create(&self, resource: &Resource) -> ProviderResult<State> {
        self.write(resource, "Error creating SAML Configuration")
            .await
    }

    async fn read(&self, current: &State) -> ProviderResult<State> {
        let config = match self.client.get_saml_config().await {
            Ok(config) => config,
            Err(e) if e.is_not_found() => {
                return Ok(State::not_found(current.id.clone()).with_warning(
                    "SAML Configuration did not exist",
                    "No SAML Configuration is set on IQ Server",
                ));
            }
            Err(e) => return Err(api_error("Error reading SAML Configuration", e)),
        };

        Ok(State::existing(current.id.clone(), from_api(&config)).with_identifier(NAME))
    }

    async fn update(&self, _from: &State, to: &Resource) -> ProviderResult<State> {
        self.write(to, "Error updating SAML Configuration").await
    }

    async fn delete(&self, _current: &State) -> ProviderResult<Vec<Diagnostic>> {
        self.client
            .delete_saml_config()
            .await
            .map_err(|e| api_error("Error deleting SAML Configuration", e))?;
        Ok(Vec::new())
    }

    async fn import(&self, id: &ResourceId, _import_id: &str) -> ProviderResult<State> {
        let seed = State::existing(id.clone(), Attributes::new()).with_identifier(NAME);
        import_by_read(self, seed).await
    }
}
