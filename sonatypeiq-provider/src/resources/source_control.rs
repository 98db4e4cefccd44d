//! `source_control` resource: SCM settings of an application or organization

use std::sync::Arc;

use async_trait::async_trait;
use sonatypeiq_core::provider::{ProviderError, ProviderResult};
use sonatypeiq_core::resource::{Diagnostic, Resource, ResourceId, State, Value};
use sonatypeiq_core::schema::{AttributeSchema, AttributeType, ResourceSchema};

use super::{ResourceAdapter, import_by_read};
use crate::client::IqClient;
use crate::identity::{OwnerType, parse_owner_import, trim_quotes};
use crate::models::ApiSourceControl;
use crate::utils::{
    Attributes, api_error, get_bool, get_string, require_string, set_bool, set_string,
};

pub const NAME: &str = "source_control";

pub const SCM_PROVIDERS: &[&str] = &["azure", "bitbucket", "github", "gitlab"];

pub fn schema() -> ResourceSchema {
    ResourceSchema::new(NAME)
        .with_description("Source control settings of an application or organization")
        .attribute(
            AttributeSchema::new("owner_id", AttributeType::String)
                .required()
                .requires_replace()
                .with_provider_name("ownerId"),
        )
        .attribute(
            AttributeSchema::new(
                "owner_type",
                AttributeType::one_of(&["application", "organization"]),
            )
            .required()
            .requires_replace(),
        )
        .attribute(
            AttributeSchema::new("repository_url", AttributeType::String)
                .with_provider_name("repositoryUrl")
                .with_description("Only valid when owner_type is application"),
        )
        .attribute(
            AttributeSchema::new("base_branch", AttributeType::String)
                .with_provider_name("baseBranch"),
        )
        .attribute(
            AttributeSchema::new("user_name", AttributeType::String)
                .also_requires("scm_provider")
                .with_provider_name("username"),
        )
        .attribute(
            AttributeSchema::new("token", AttributeType::String)
                .write_only()
                .also_requires("scm_provider"),
        )
        .attribute(
            AttributeSchema::new("remediation_pull_requests_enabled", AttributeType::Bool)
                .with_provider_name("remediationPullRequestsEnabled"),
        )
        .attribute(
            AttributeSchema::new("pull_request_commenting_enabled", AttributeType::Bool)
                .with_provider_name("pullRequestCommentingEnabled"),
        )
        .attribute(
            AttributeSchema::new("source_control_evaluation_enabled", AttributeType::Bool)
                .with_provider_name("sourceControlEvaluationsEnabled"),
        )
        .attribute(
            AttributeSchema::new("scm_provider", AttributeType::one_of(SCM_PROVIDERS))
                .with_provider_name("provider"),
        )
}

/// Owner addressed by a set of attributes, with stray quotes removed
fn owner_of(attrs: &Attributes) -> ProviderResult<(OwnerType, String)> {
    let raw_type = require_string(attrs, "owner_type")?;
    let owner_type = OwnerType::parse(trim_quotes(&raw_type)).ok_or_else(|| {
        ProviderError::new(format!(
            "owner_type must be 'application' or 'organization', got '{}'",
            raw_type
        ))
    })?;
    let owner_id = require_string(attrs, "owner_id")?;
    Ok((owner_type, trim_quotes(&owner_id).to_string()))
}

fn to_api(owner_type: OwnerType, attrs: &Attributes) -> ProviderResult<ApiSourceControl> {
    let repository_url = get_string(attrs, "repository_url");
    if repository_url.is_some() && owner_type != OwnerType::Application {
        return Err(ProviderError::new(
            "repository_url can only be set when owner_type is 'application'",
        ));
    }
    Ok(ApiSourceControl {
        owner_id: None,
        repository_url,
        base_branch: get_string(attrs, "base_branch"),
        username: get_string(attrs, "user_name"),
        token: get_string(attrs, "token"),
        provider: get_string(attrs, "scm_provider"),
        remediation_pull_requests_enabled: get_bool(attrs, "remediation_pull_requests_enabled"),
        pull_request_commenting_enabled: get_bool(attrs, "pull_request_commenting_enabled"),
        source_control_evaluations_enabled: get_bool(attrs, "source_control_evaluation_enabled"),
    })
}

fn from_api(owner_type: OwnerType, owner_id: &str, config: &ApiSourceControl) -> Attributes {
    let mut attrs = Attributes::new();
    attrs.insert(
        "owner_id".to_string(),
        Value::string(config.owner_id.as_deref().unwrap_or(owner_id)),
    );
    attrs.insert("owner_type".to_string(), Value::string(owner_type.as_str()));
    if owner_type == OwnerType::Application {
        set_string(&mut attrs, "repository_url", config.repository_url.clone());
    }
    set_string(&mut attrs, "base_branch", config.base_branch.clone());
    set_string(&mut attrs, "user_name", config.username.clone());
    set_string(&mut attrs, "scm_provider", config.provider.clone());
    set_bool(
        &mut attrs,
        "remediation_pull_requests_enabled",
        config.remediation_pull_requests_enabled,
    );
    set_bool(
        &mut attrs,
        "pull_request_commenting_enabled",
        config.pull_request_commenting_enabled,
    );
    set_bool(
        &mut attrs,
        "source_control_evaluation_enabled",
        config.source_control_evaluations_enabled,
    );
    attrs
}

fn identifier(owner_type: OwnerType, owner_id: &str) -> String {
    format!("{}:{}", owner_type, owner_id)
}

pub struct SourceControlResource {
    client: Arc<IqClient>,
}

impl SourceControlResource {
    pub fn new(client: Arc<IqClient>) -> Self {
        Self { client }
    }

    fn saved(
        &self,
        id: ResourceId,
        owner_type: OwnerType,
        owner_id: &str,
        config: &ApiSourceControl,
        desired: &Attributes,
    ) -> State {
        let mut attrs = from_api(owner_type, owner_id, config);
        // The server echoes nothing for the token
        set_string(&mut attrs, "token", get_string(desired, "token"));
        State::existing(id, attrs).with_identifier(identifier(owner_type, owner_id))
    }
}

#[async_trait]
impl ResourceAdapter for SourceControlResource {
    fn name(&self) -> &'static str {
        NAME
    }

    fn schema(&self) -> ResourceSchema {
        schema()
    }

    async fn create(&self, resource: &Resource) -> ProviderResult<State> {
        let (owner_type, owner_id) = owner_of(&resource.attributes)?;
        let request = to_api(owner_type, &resource.attributes)?;

        let config = self
            .client
            .add_source_control(owner_type, &owner_id, &request)
            .await
            .map_err(|e| api_error("Error creating Source Control configuration", e))?;
        Ok(self.saved(
            resource.id.clone(),
            owner_type,
            &owner_id,
            &config,
            &resource.attributes,
        ))
    }

    async fn read(&self, current: &State) -> ProviderResult<State> {
        let (owner_type, owner_id) = match owner_of(&current.attributes) {
            Ok(owner) => owner,
            Err(_) => match current.identifier.as_deref().map(parse_owner_import) {
                Some(Ok(owner)) => owner,
                _ => return Ok(State::not_found(current.id.clone())),
            },
        };

        let config = match self.client.get_source_control(owner_type, &owner_id).await {
            Ok(config) => config,
            Err(e) if e.is_not_found() => return Ok(State::not_found(current.id.clone())),
            Err(e) => return Err(api_error("Error reading Source Control configuration", e)),
        };

        let attrs = from_api(owner_type, &owner_id, &config);
        Ok(State::existing(current.id.clone(), attrs)
            .with_identifier(identifier(owner_type, &owner_id)))
    }

    async fn update(&self, _from: &State, to: &Resource) -> ProviderResult<State> {
        let (owner_type, owner_id) = owner_of(&to.attributes)?;
        let request = to_api(owner_type, &to.attributes)?;

        let config = self
            .client
            .update_source_control(owner_type, &owner_id, &request)
            .await
            .map_err(|e| api_error("Error updating Source Control configuration", e))?;
        Ok(self.saved(to.id.clone(), owner_type, &owner_id, &config, &to.attributes))
    }

    async fn delete(&self, current: &State) -> ProviderResult<Vec<Diagnostic>> {
        let (owner_type, owner_id) = owner_of(&current.attributes)?;
        match self.client.delete_source_control(owner_type, &owner_id).await {
            Ok(()) => Ok(Vec::new()),
            Err(e) if e.is_not_found() => Ok(Vec::new()),
            Err(e) => Err(api_error("Error deleting Source Control configuration", e)),
        }
    }

    /// `owner_type:owner_id`
    async fn import(&self, id: &ResourceId, import_id: &str) -> ProviderResult<State> {
        let (owner_type, owner_id) = parse_owner_import(import_id).map_err(ProviderError::new)?;
        let mut attrs = Attributes::new();
        attrs.insert("owner_type".to_string(), Value::string(owner_type.as_str()));
        attrs.insert("owner_id".to_string(), Value::string(&owner_id));
        let seed = State::existing(id.clone(), attrs).with_identifier(import_id);
        import_by_read(self, seed).await
    }
}
