//! `application_role_membership` and `organization_role_membership`
//!
//! A membership grants one role on one owner to exactly one user or group.
//! Memberships have no server-side id; the state id is a [`MembershipKey`].

use std::sync::Arc;

use async_trait::async_trait;
use log::debug;
use sonatypeiq_core::provider::{ProviderError, ProviderResult};
use sonatypeiq_core::resource::{Diagnostic, Resource, ResourceId, State, Value};
use sonatypeiq_core::schema::{AttributeSchema, AttributeType, ResourceSchema};

use super::{ResourceAdapter, import_by_read};
use crate::client::IqClient;
use crate::identity::{MemberType, MembershipKey, OwnerType};
use crate::models::ApiMemberMappingList;
use crate::utils::{Attributes, get_string, require_string};

pub const APPLICATION_NAME: &str = "application_role_membership";
pub const ORGANIZATION_NAME: &str = "organization_role_membership";

fn type_name(owner: OwnerType) -> &'static str {
    match owner {
        OwnerType::Application => APPLICATION_NAME,
        OwnerType::Organization => ORGANIZATION_NAME,
    }
}

/// Attribute holding the owner id
fn owner_attribute(owner: OwnerType) -> &'static str {
    match owner {
        OwnerType::Application => "application_id",
        OwnerType::Organization => "organization_id",
    }
}

fn owner_label(owner: OwnerType) -> &'static str {
    match owner {
        OwnerType::Application => "Application",
        OwnerType::Organization => "Organization",
    }
}

pub fn schema(owner: OwnerType) -> ResourceSchema {
    ResourceSchema::new(type_name(owner))
        .with_description(format!(
            "A role granted to a user or group on an {}",
            owner.as_str()
        ))
        .attribute(AttributeSchema::new("id", AttributeType::String).computed())
        .attribute(
            AttributeSchema::new("role_id", AttributeType::String)
                .required()
                .requires_replace(),
        )
        .attribute(
            AttributeSchema::new(owner_attribute(owner), AttributeType::String)
                .required()
                .requires_replace(),
        )
        .attribute(
            AttributeSchema::new("user_name", AttributeType::String)
                .requires_replace()
                .with_min_length(1),
        )
        .attribute(
            AttributeSchema::new("group_name", AttributeType::String)
                .requires_replace()
                .with_min_length(1),
        )
        .exactly_one_of(&["user_name", "group_name"])
}

/// Membership key described by a set of attributes
fn key_from(owner: OwnerType, attrs: &Attributes) -> ProviderResult<MembershipKey> {
    let (member_type, member_name) = match (
        get_string(attrs, "user_name"),
        get_string(attrs, "group_name"),
    ) {
        (Some(user), None) => (MemberType::User, user),
        (None, Some(group)) => (MemberType::Group, group),
        _ => {
            return Err(ProviderError::new(
                "Exactly one of 'user_name' or 'group_name' must be set",
            ));
        }
    };
    Ok(MembershipKey {
        owner_id: require_string(attrs, owner_attribute(owner))?,
        role_id: require_string(attrs, "role_id")?,
        member_type,
        member_name,
    })
}

fn attributes_for(owner: OwnerType, key: &MembershipKey) -> Attributes {
    let mut attrs = Attributes::new();
    attrs.insert("id".to_string(), Value::string(key.encode()));
    attrs.insert("role_id".to_string(), Value::string(&key.role_id));
    attrs.insert(
        owner_attribute(owner).to_string(),
        Value::string(&key.owner_id),
    );
    let member_attr = match key.member_type {
        MemberType::User => "user_name",
        MemberType::Group => "group_name",
    };
    attrs.insert(member_attr.to_string(), Value::string(&key.member_name));
    attrs
}

/// True when the server lists the membership described by `key`
fn is_granted(owner: OwnerType, key: &MembershipKey, mappings: &ApiMemberMappingList) -> bool {
    mappings
        .member_mappings
        .iter()
        .filter(|m| m.role_id == key.role_id)
        .flat_map(|m| m.members.iter())
        .any(|member| {
            member.member_type == key.member_type.api_name()
                && member.user_or_group_name == key.member_name
                && member
                    .owner_type
                    .as_deref()
                    .is_none_or(|t| t == owner.api_name())
                && member
                    .owner_id
                    .as_deref()
                    .is_none_or(|id| id == key.owner_id)
        })
}

pub struct RoleMembershipResource {
    client: Arc<IqClient>,
    owner: OwnerType,
}

impl RoleMembershipResource {
    pub fn new(client: Arc<IqClient>, owner: OwnerType) -> Self {
        Self { client, owner }
    }

    fn error(&self, action: &str, err: crate::client::ApiError) -> ProviderError {
        crate::utils::api_error(
            &format!(
                "Error {} {} Role Membership",
                action,
                owner_label(self.owner)
            ),
            err,
        )
    }
}

#[async_trait]
impl ResourceAdapter for RoleMembershipResource {
    fn name(&self) -> &'static str {
        type_name(self.owner)
    }

    fn schema(&self) -> ResourceSchema {
        schema(self.owner)
    }

    async fn create(&self, resource: &Resource) -> ProviderResult<State> {
        let key = key_from(self.owner, &resource.attributes)?;
        self.client
            .grant_role_membership(
                self.owner,
                &key.owner_id,
                &key.role_id,
                key.member_type,
                &key.member_name,
            )
            .await
            .map_err(|e| self.error("creating", e))?;

        Ok(
            State::existing(resource.id.clone(), attributes_for(self.owner, &key))
                .with_identifier(key.encode()),
        )
    }

    async fn read(&self, current: &State) -> ProviderResult<State> {
        // The key is recomputed from attributes; the stored id may predate
        // the current encoding.
        let key = match key_from(self.owner, &current.attributes) {
            Ok(key) => key,
            Err(_) => match current.identifier.as_deref().and_then(MembershipKey::decode) {
                Some(key) => key,
                None => return Ok(State::not_found(current.id.clone())),
            },
        };

        let mappings = match self
            .client
            .get_role_memberships(self.owner, &key.owner_id)
            .await
        {
            Ok(mappings) => mappings,
            Err(e) if e.is_not_found() => return Ok(State::not_found(current.id.clone())),
            Err(e) => return Err(self.error("reading", e)),
        };

        if !is_granted(self.owner, &key, &mappings) {
            debug!("Role membership {} is no longer granted", key);
            return Ok(State::not_found(current.id.clone()));
        }

        Ok(
            State::existing(current.id.clone(), attributes_for(self.owner, &key))
                .with_identifier(key.encode()),
        )
    }

    async fn update(&self, _from: &State, _to: &Resource) -> ProviderResult<State> {
        Err(ProviderError::new(
            "Role memberships cannot be updated in place; every attribute forces replacement",
        ))
    }

    async fn delete(&self, current: &State) -> ProviderResult<Vec<Diagnostic>> {
        let key = match key_from(self.owner, &current.attributes) {
            Ok(key) => key,
            Err(e) => match current.identifier.as_deref().and_then(MembershipKey::decode) {
                Some(key) => key,
                None => return Err(e),
            },
        };

        match self
            .client
            .revoke_role_membership(
                self.owner,
                &key.owner_id,
                &key.role_id,
                key.member_type,
                &key.member_name,
            )
            .await
        {
            Ok(()) => Ok(Vec::new()),
            Err(e) if e.is_not_found() => Ok(Vec::new()),
            Err(e) => Err(self.error("deleting", e)),
        }
    }

    /// Import by encoded membership key
    async fn import(&self, id: &ResourceId, import_id: &str) -> ProviderResult<State> {
        let key = MembershipKey::decode(import_id).ok_or_else(|| {
            ProviderError::new(format!(
                "Unexpected Import Identifier: expected owner_role_type_name. Got: {:?}",
                import_id
            ))
        })?;
        let seed = State::existing(id.clone(), attributes_for(self.owner, &key))
            .with_identifier(import_id);
        import_by_read(self, seed).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{attrs, resource, shared_client, stored};
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn alice_on_app() -> Resource {
        resource(
            APPLICATION_NAME,
            &[
                ("role_id", Value::string("role-1")),
                ("application_id", Value::string("app-1")),
                ("user_name", Value::string("alice")),
            ],
        )
    }

    fn mappings(owner_type: &str, member_type: &str, name: &str) -> serde_json::Value {
        json!({
            "memberMappings": [{
                "roleId": "role-1",
                "members": [{
                    "ownerId": "app-1",
                    "ownerType": owner_type,
                    "type": member_type,
                    "userOrGroupName": name
                }]
            }]
        })
    }

    #[test]
    fn exactly_one_member_is_enforced_by_schema() {
        let schema = schema(OwnerType::Application);
        let both = attrs(&[
            ("role_id", Value::string("role-1")),
            ("application_id", Value::string("app-1")),
            ("user_name", Value::string("alice")),
            ("group_name", Value::string("devs")),
        ]);
        assert!(schema.validate(&both).is_err());

        let neither = attrs(&[
            ("role_id", Value::string("role-1")),
            ("application_id", Value::string("app-1")),
        ]);
        assert!(schema.validate(&neither).is_err());
    }

    #[test]
    fn every_input_forces_replacement() {
        let schema = schema(OwnerType::Organization);
        for name in ["role_id", "organization_id", "user_name", "group_name"] {
            assert!(schema.forces_replacement(name), "{}", name);
        }
    }

    #[tokio::test]
    async fn create_grants_and_sets_id() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path(
                "/api/v2/roleMemberships/application/app-1/role/role-1/user/alice",
            ))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let adapter =
            RoleMembershipResource::new(shared_client(&server).await, OwnerType::Application);
        let state = adapter.create(&alice_on_app()).await.unwrap();
        assert_eq!(state.get_str("id"), Some("app-1_role-1_user_alice"));
        assert_eq!(state.identifier.as_deref(), Some("app-1_role-1_user_alice"));
    }

    #[tokio::test]
    async fn read_finds_matching_member() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v2/roleMemberships/application/app-1"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(mappings("APPLICATION", "USER", "alice")),
            )
            .mount(&server)
            .await;

        let adapter =
            RoleMembershipResource::new(shared_client(&server).await, OwnerType::Application);
        let current = State::existing(
            ResourceId::new(APPLICATION_NAME, "test"),
            alice_on_app().attributes,
        )
        .with_identifier("stale-id");
        let state = adapter.read(&current).await.unwrap();
        assert!(state.exists);
        assert_eq!(state.identifier.as_deref(), Some("app-1_role-1_user_alice"));
    }

    #[tokio::test]
    async fn read_ignores_group_with_same_name() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v2/roleMemberships/application/app-1"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(mappings("APPLICATION", "GROUP", "alice")),
            )
            .mount(&server)
            .await;

        let adapter =
            RoleMembershipResource::new(shared_client(&server).await, OwnerType::Application);
        let current = State::existing(
            ResourceId::new(APPLICATION_NAME, "test"),
            alice_on_app().attributes,
        );
        assert!(!adapter.read(&current).await.unwrap().exists);
    }

    #[tokio::test]
    async fn read_404_removes() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let adapter =
            RoleMembershipResource::new(shared_client(&server).await, OwnerType::Application);
        let current = stored(APPLICATION_NAME, "app-1_role-1_user_alice", &[]);
        assert!(!adapter.read(&current).await.unwrap().exists);
    }

    #[tokio::test]
    async fn delete_revokes_group() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path(
                "/api/v2/roleMemberships/organization/ROOT_ORGANIZATION_ID/role/role-1/group/dev_team",
            ))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let adapter =
            RoleMembershipResource::new(shared_client(&server).await, OwnerType::Organization);
        let current = stored(
            ORGANIZATION_NAME,
            "ROOT%5FORGANIZATION%5FID_role-1_group_dev%5Fteam",
            &[],
        );
        assert!(adapter.delete(&current).await.unwrap().is_empty());
    }
}
