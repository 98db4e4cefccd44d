//! Managed resource adapters
//!
//! Each module maps one IQ Server object onto manifest attributes and back.
//! Adapters hold the shared [`IqClient`] handed to them at construction.

use std::sync::Arc;

use async_trait::async_trait;
use sonatypeiq_core::provider::{ProviderError, ProviderResult, ResourceType};
use sonatypeiq_core::resource::{Diagnostic, Resource, ResourceId, State, Value};
use sonatypeiq_core::schema::ResourceSchema;

use crate::client::IqClient;
use crate::identity::{OwnerType, last_updated};
use crate::utils::Attributes;

pub mod application;
pub mod config_crowd;
pub mod config_mail;
pub mod config_product_license;
pub mod config_proxy_server;
pub mod config_saml;
pub mod organization;
pub mod organization_category;
pub mod role_membership;
pub mod source_control;
pub mod system_config;
pub mod user;
pub mod user_token;

/// CRUD operations for one managed resource type
#[async_trait]
pub trait ResourceAdapter: Send + Sync {
    fn name(&self) -> &'static str;

    fn schema(&self) -> ResourceSchema;

    async fn create(&self, resource: &Resource) -> ProviderResult<State>;

    /// Refresh; `State::not_found` when the object is gone
    async fn read(&self, current: &State) -> ProviderResult<State>;

    async fn update(&self, from: &State, to: &Resource) -> ProviderResult<State>;

    /// Delete, returning warnings for tolerated failures
    async fn delete(&self, current: &State) -> ProviderResult<Vec<Diagnostic>>;

    async fn import(&self, _id: &ResourceId, import_id: &str) -> ProviderResult<State> {
        Err(ProviderError::new(format!(
            "{} does not support import (identifier '{}')",
            self.name(),
            import_id
        )))
    }
}

// =============================================================================
// Resource Type Definitions
// =============================================================================

macro_rules! define_resource_type {
    ($name:ident, $type_name:expr, $schema:expr) => {
        pub struct $name;
        impl ResourceType for $name {
            fn name(&self) -> &'static str {
                $type_name
            }
            fn schema(&self) -> ResourceSchema {
                $schema
            }
        }
    };
}

define_resource_type!(ApplicationType, application::NAME, application::schema());
define_resource_type!(OrganizationType, organization::NAME, organization::schema());
define_resource_type!(
    OrganizationCategoryType,
    organization_category::NAME,
    organization_category::schema()
);
define_resource_type!(
    ApplicationRoleMembershipType,
    role_membership::APPLICATION_NAME,
    role_membership::schema(OwnerType::Application)
);
define_resource_type!(
    OrganizationRoleMembershipType,
    role_membership::ORGANIZATION_NAME,
    role_membership::schema(OwnerType::Organization)
);
define_resource_type!(SourceControlType, source_control::NAME, source_control::schema());
define_resource_type!(SystemConfigType, system_config::NAME, system_config::schema());
define_resource_type!(ConfigMailType, config_mail::NAME, config_mail::schema());
define_resource_type!(
    ConfigProxyServerType,
    config_proxy_server::NAME,
    config_proxy_server::schema()
);
define_resource_type!(ConfigCrowdType, config_crowd::NAME, config_crowd::schema());
define_resource_type!(ConfigSamlType, config_saml::NAME, config_saml::schema());
define_resource_type!(
    ConfigProductLicenseType,
    config_product_license::NAME,
    config_product_license::schema()
);
define_resource_type!(UserType, user::NAME, user::schema());
define_resource_type!(UserTokenType, user_token::NAME, user_token::schema());

/// Returns all managed resource types supported by this provider
pub fn resource_types() -> Vec<Box<dyn ResourceType>> {
    vec![
        Box::new(ApplicationType),
        Box::new(OrganizationType),
        Box::new(OrganizationCategoryType),
        Box::new(ApplicationRoleMembershipType),
        Box::new(OrganizationRoleMembershipType),
        Box::new(SourceControlType),
        Box::new(SystemConfigType),
        Box::new(ConfigMailType),
        Box::new(ConfigProxyServerType),
        Box::new(ConfigCrowdType),
        Box::new(ConfigSamlType),
        Box::new(ConfigProductLicenseType),
        Box::new(UserType),
        Box::new(UserTokenType),
    ]
}

/// One adapter per managed resource type, all sharing `client`
pub fn adapters(client: Arc<IqClient>) -> Vec<Box<dyn ResourceAdapter>> {
    vec![
        Box::new(application::ApplicationResource::new(client.clone())),
        Box::new(organization::OrganizationResource::new(client.clone())),
        Box::new(organization_category::OrganizationCategoryResource::new(
            client.clone(),
        )),
        Box::new(role_membership::RoleMembershipResource::new(
            client.clone(),
            OwnerType::Application,
        )),
        Box::new(role_membership::RoleMembershipResource::new(
            client.clone(),
            OwnerType::Organization,
        )),
        Box::new(source_control::SourceControlResource::new(client.clone())),
        Box::new(system_config::SystemConfigResource::new(client.clone())),
        Box::new(config_mail::ConfigMailResource::new(client.clone())),
        Box::new(config_proxy_server::ConfigProxyServerResource::new(
            client.clone(),
        )),
        Box::new(config_crowd::ConfigCrowdResource::new(client.clone())),
        Box::new(config_saml::ConfigSamlResource::new(client.clone())),
        Box::new(config_product_license::ConfigProductLicenseResource::new(
            client.clone(),
        )),
        Box::new(user::UserResource::new(client.clone())),
        Box::new(user_token::UserTokenResource::new(client)),
    ]
}

// =============================================================================
// Shared helpers
// =============================================================================

/// Server-side id of a stored object: its identifier, else attribute `attr`
pub(crate) fn server_id(state: &State, attr: &str) -> Option<String> {
    state
        .identifier
        .clone()
        .or_else(|| state.get_str(attr).map(str::to_string))
}

/// Keep the prior `last_updated` stamp on refresh
pub(crate) fn keep_last_updated(current: &State, attrs: &mut Attributes) {
    if let Some(stamp) = current.attributes.get("last_updated") {
        attrs.insert("last_updated".to_string(), stamp.clone());
    }
}

pub(crate) fn stamp_last_updated(attrs: &mut Attributes) {
    attrs.insert("last_updated".to_string(), Value::String(last_updated()));
}

/// Refresh a seeded state and fail when the object does not exist
pub(crate) async fn import_by_read<A>(adapter: &A, seed: State) -> ProviderResult<State>
where
    A: ResourceAdapter + ?Sized,
{
    let import_id = seed.identifier.clone().unwrap_or_default();
    let state = adapter.read(&seed).await?;
    if state.exists {
        Ok(state)
    } else {
        Err(ProviderError::new(format!(
            "Cannot import non-existent remote object '{}'",
            import_id
        )))
    }
}
