//! Read-only data sources
//!
//! A data source takes the manifest's lookup attributes and returns the
//! matching server object. Results are not persisted; the CLI reads them
//! before planning so managed objects can reference them.

use std::sync::Arc;

use async_trait::async_trait;
use sonatypeiq_core::provider::{ProviderResult, ResourceType};
use sonatypeiq_core::resource::{Resource, State, Value};
use sonatypeiq_core::schema::{AttributeType, ResourceSchema};

use crate::client::IqClient;
use crate::models::{ApiApplication, ApiApplicationCategory, ApiOrganization};
use crate::utils::{Attributes, set_string};

pub mod application;
pub mod application_categories;
pub mod applications;
pub mod config_saml;
pub mod organization;
pub mod organizations;
pub mod role;
pub mod system_config;

#[async_trait]
pub trait DataSourceAdapter: Send + Sync {
    fn name(&self) -> &'static str;

    fn schema(&self) -> ResourceSchema;

    async fn read(&self, resource: &Resource) -> ProviderResult<State>;
}

// =============================================================================
// Data Source Type Definitions
// =============================================================================

macro_rules! define_data_source_type {
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

define_data_source_type!(ApplicationDataSourceType, application::NAME, application::schema());
define_data_source_type!(
    ApplicationsDataSourceType,
    applications::NAME,
    applications::schema()
);
define_data_source_type!(
    ApplicationCategoriesDataSourceType,
    application_categories::NAME,
    application_categories::schema()
);
define_data_source_type!(
    OrganizationDataSourceType,
    organization::NAME,
    organization::schema()
);
define_data_source_type!(
    OrganizationsDataSourceType,
    organizations::NAME,
    organizations::schema()
);
define_data_source_type!(RoleDataSourceType, role::NAME, role::schema());
define_data_source_type!(ConfigSamlDataSourceType, config_saml::NAME, config_saml::schema());
define_data_source_type!(
    SystemConfigDataSourceType,
    system_config::NAME,
    system_config::schema()
);

pub fn data_source_types() -> Vec<Box<dyn ResourceType>> {
    vec![
        Box::new(ApplicationDataSourceType),
        Box::new(ApplicationsDataSourceType),
        Box::new(ApplicationCategoriesDataSourceType),
        Box::new(OrganizationDataSourceType),
        Box::new(OrganizationsDataSourceType),
        Box::new(RoleDataSourceType),
        Box::new(ConfigSamlDataSourceType),
        Box::new(SystemConfigDataSourceType),
    ]
}

pub fn adapters(client: Arc<IqClient>) -> Vec<Box<dyn DataSourceAdapter>> {
    vec![
        Box::new(application::ApplicationDataSource::new(client.clone())),
        Box::new(applications::ApplicationsDataSource::new(client.clone())),
        Box::new(application_categories::ApplicationCategoriesDataSource::new(
            client.clone(),
        )),
        Box::new(organization::OrganizationDataSource::new(client.clone())),
        Box::new(organizations::OrganizationsDataSource::new(client.clone())),
        Box::new(role::RoleDataSource::new(client.clone())),
        Box::new(config_saml::ConfigSamlDataSource::new(client.clone())),
        Box::new(system_config::SystemConfigDataSource::new(client)),
    ]
}

// =============================================================================
// Shared mapping
// =============================================================================

/// `List<Map<String>>`, the shape of nested object lists
pub(crate) fn object_list() -> AttributeType {
    AttributeType::List(Box::new(AttributeType::Map(Box::new(AttributeType::String))))
}

/// Application fields plus its `application_tags` links
pub(crate) fn application_attributes(app: &ApiApplication) -> Attributes {
    let mut attrs = crate::resources::application::from_api(app);
    let tags = app
        .application_tags
        .iter()
        .map(|tag| {
            let mut link = Attributes::new();
            set_string(&mut link, "id", tag.id.clone());
            link.insert("tag_id".to_string(), Value::string(&tag.tag_id));
            set_string(&mut link, "application_id", tag.application_id.clone());
            Value::Map(link)
        })
        .collect();
    attrs.insert("application_tags".to_string(), Value::List(tags));
    attrs
}

pub(crate) fn category_attributes(category: &ApiApplicationCategory) -> Value {
    let mut attrs = Attributes::new();
    set_string(&mut attrs, "id", category.id.clone());
    attrs.insert("name".to_string(), Value::string(&category.name));
    attrs.insert(
        "description".to_string(),
        Value::string(&category.description),
    );
    attrs.insert("color".to_string(), Value::string(&category.color));
    Value::Map(attrs)
}

/// Organization fields plus its `tags` (application categories)
pub(crate) fn organization_attributes(org: &ApiOrganization) -> Attributes {
    let mut attrs = crate::resources::organization::from_api(org);
    attrs.insert(
        "tags".to_string(),
        Value::List(org.tags.iter().map(category_attributes).collect()),
    );
    attrs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ApiApplicationTag;
    use std::collections::HashSet;

    #[test]
    fn data_source_names_are_unique() {
        let names: Vec<&str> = data_source_types().iter().map(|t| t.name()).collect();
        let unique: HashSet<&str> = names.iter().copied().collect();
        assert_eq!(names.len(), 8);
        assert_eq!(unique.len(), names.len());
    }

    #[test]
    fn application_tags_are_objects() {
        let app = ApiApplication {
            id: Some("app-1".to_string()),
            public_id: "my-app".to_string(),
            name: "My App".to_string(),
            organization_id: "ROOT_ORGANIZATION_ID".to_string(),
            contact_user_name: None,
            application_tags: vec![ApiApplicationTag {
                id: Some("link-1".to_string()),
                tag_id: "tag-1".to_string(),
                application_id: Some("app-1".to_string()),
            }],
        };
        let attrs = application_attributes(&app);
        let Some(Value::List(tags)) = attrs.get("application_tags") else {
            panic!("application_tags missing");
        };
        let Value::Map(link) = &tags[0] else {
            panic!("tag link is not an object");
        };
        assert_eq!(link.get("tag_id"), Some(&Value::string("tag-1")));
        assert!(!attrs.contains_key("contact_user_name"));
    }
}
