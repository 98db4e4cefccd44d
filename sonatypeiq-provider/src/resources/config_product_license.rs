//! `config_product_license` resource: the installed product license
//!
//! IQ Server cannot report which license is installed, so refresh keeps the
//! stored state as is.

use std::sync::Arc;

use async_trait::async_trait;
use base64::Engine;
use log::debug;
use sonatypeiq_core::provider::{ProviderError, ProviderResult};
use sonatypeiq_core::resource::{Diagnostic, Resource, ResourceId, State, Value};
use sonatypeiq_core::schema::{AttributeSchema, AttributeType, ResourceSchema, types};

use super::{ResourceAdapter, stamp_last_updated};
use crate::client::IqClient;
use crate::utils::{Attributes, api_error, require_string};

pub const NAME: &str = "config_product_license";

pub fn schema() -> ResourceSchema {
    ResourceSchema::new(NAME)
        .with_description("Product license installed on IQ Server")
        .attribute(AttributeSchema::new("id", AttributeType::String).computed())
        .attribute(
            AttributeSchema::new("license_data", types::base64())
                .required()
                .write_only()
                .with_description("Base64 encoded license file"),
        )
        .attribute(AttributeSchema::new("last_updated", AttributeType::String).computed())
}

fn decode_license(license_data: &str) -> ProviderResult<Vec<u8>> {
    base64::engine::general_purpose::STANDARD
        .decode(license_data.trim())
        .map_err(|e| {
            ProviderError::new(format!("Error decoding Product License: {}", e)).with_cause(e)
        })
}

pub struct ConfigProductLicenseResource {
    client: Arc<IqClient>,
}

impl ConfigProductLicenseResource {
    pub fn new(client: Arc<IqClient>) -> Self {
        Self { client }
    }

    async fn install(&self, resource: &Resource) -> ProviderResult<State> {
        let license_data = require_string(&resource.attributes, "license_data")?;
        let license = decode_license(&license_data)?;
        debug!("Uploading product license ({} bytes)", license.len());
        self.client
            .install_license(license)
            .await
            .map_err(|e| api_error("Error installing Product License", e))?;

        let mut attrs = Attributes::new();
        attrs.insert("id".to_string(), Value::string(NAME));
        attrs.insert("license_data".to_string(), Value::String(license_data));
        stamp_last_updated(&mut attrs);
        Ok(State::existing(resource.id.clone(), attrs).with_identifier(NAME))
    }
}

#[async_trait]
impl ResourceAdapter for ConfigProductLicenseResource {
    fn name(&self) -> &'static str {
        NAME
    }

    fn schema(&self) -> ResourceSchema {
        schema()
    }

    async fn create(&self, resource: &Resource) -> ProviderResult<State> {
        self.install(resource).await
    }

    async fn read(&self, current: &State) -> ProviderResult<State> {
        Ok(current.clone())
    }

    async fn update(&self, _from: &State, to: &Resource) -> ProviderResult<State> {
        self.install(to).await
    }

    async fn delete(&self, _current: &State) -> ProviderResult<Vec<Diagnostic>> {
        self.client
            .uninstall_license()
            .await
            .map_err(|e| api_error("Error removing Product License", e))?;
        Ok(Vec::new())
    }

    async fn import(&self, _id: &ResourceId, _import_id: &str) -> ProviderResult<State> {
        Err(ProviderError::new(
            "The installed Product License cannot be read back; declare license_data and apply instead",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{resource, shared_client, stored, writes_to};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn license_is_base64_decoded() {
        assert_eq!(decode_license("bGljZW5zZQ==\n").unwrap(), b"license");
        assert!(decode_license("not base64!").is_err());
    }

    #[tokio::test]
    async fn install_uploads_decoded_file() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v2/product/license"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let adapter = ConfigProductLicenseResource::new(shared_client(&server).await);
        let state = adapter
            .create(&resource(NAME, &[("license_data", Value::string("bGljZW5zZQ=="))]))
            .await
            .unwrap();
        assert_eq!(state.get_str("license_data"), Some("bGljZW5zZQ=="));

        let requests = server.received_requests().await.unwrap();
        let body = String::from_utf8_lossy(&requests[0].body);
        assert!(body.contains("name=\"file\""));
        assert!(body.contains("license"));
    }

    #[tokio::test]
    async fn update_uploads_the_new_license() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v2/product/license"))
            .respond_with(ResponseTemplate::new(200))
            .expect(2)
            .mount(&server)
            .await;

        let adapter = ConfigProductLicenseResource::new(shared_client(&server).await);
        let created = adapter
            .create(&resource(NAME, &[("license_data", Value::string("bGljZW5zZQ=="))]))
            .await
            .unwrap();
        // "renewed"
        let renewed = resource(NAME, &[("license_data", Value::string("cmVuZXdlZA=="))]);
        let updated = adapter.update(&created, &renewed).await.unwrap();
        assert_eq!(updated.get_str("license_data"), Some("cmVuZXdlZA=="));

        let bodies = writes_to(&server, "POST", "/api/v2/product/license").await;
        assert_eq!(bodies.len(), 2);
        assert!(String::from_utf8_lossy(&bodies[1]).contains("renewed"));
    }

    #[tokio::test]
    async fn install_expects_200() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        let adapter = ConfigProductLicenseResource::new(shared_client(&server).await);
        let err = adapter
            .create(&resource(NAME, &[("license_data", Value::string("bGljZW5zZQ=="))]))
            .await
            .unwrap_err();
        assert!(err.message.starts_with("Error installing Product License"));
    }

    #[tokio::test]
    async fn delete_expects_204() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/api/v2/product/license"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let adapter = ConfigProductLicenseResource::new(shared_client(&server).await);
        assert!(adapter.delete(&stored(NAME, NAME, &[])).await.unwrap().is_empty());
    }
}
