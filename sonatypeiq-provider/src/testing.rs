//! Shared fixtures for tests against a mocked IQ Server

use std::sync::Arc;

use sonatypeiq_core::resource::{Resource, ResourceId, State, Value};
use wiremock::MockServer;

use crate::client::IqClient;
use crate::config::ProviderConfig;
use crate::utils::Attributes;

pub(crate) async fn client_for(server: &MockServer) -> IqClient {
    let config = ProviderConfig::resolve_with(
        Some(&server.uri()),
        Some("admin"),
        Some("admin123"),
        |_| None,
    )
    .unwrap();
    IqClient::new(&config).unwrap()
}

pub(crate) async fn shared_client(server: &MockServer) -> Arc<IqClient> {
    Arc::new(client_for(server).await)
}

pub(crate) fn attrs(pairs: &[(&str, Value)]) -> Attributes {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

pub(crate) fn resource(resource_type: &str, pairs: &[(&str, Value)]) -> Resource {
    let mut resource = Resource::new(resource_type, "test");
    resource.attributes = attrs(pairs);
    resource
}

pub(crate) fn stored(resource_type: &str, identifier: &str, pairs: &[(&str, Value)]) -> State {
    State::existing(ResourceId::new(resource_type, "test"), attrs(pairs))
        .with_identifier(identifier)
}

/// Bodies of every request the server received, in order; each must be a
/// `method` request to `expected_path`
pub(crate) async fn writes_to(
    server: &MockServer,
    method: &str,
    expected_path: &str,
) -> Vec<Vec<u8>> {
    let requests = server.received_requests().await.unwrap();
    for request in &requests {
        assert_eq!(request.method.as_str(), method);
        assert_eq!(request.url.path(), expected_path);
    }
    requests.into_iter().map(|request| request.body).collect()
}
