//! IQ Server REST API payloads (`/api/v2`)
//!
//! Field names follow the server's camelCase JSON. Optional fields are
//! omitted from request bodies when unset.

use serde::{Deserialize, Serialize};

// =============================================================================
// Applications & Organizations
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiApplication {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub public_id: String,
    pub name: String,
    pub organization_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_user_name: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub application_tags: Vec<ApiApplicationTag>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiApplicationTag {
    #[serde(default)]
    pub id: Option<String>,
    pub tag_id: String,
    #[serde(default)]
    pub application_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiApplicationList {
    #[serde(default)]
    pub applications: Vec<ApiApplication>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiOrganization {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_organization_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<ApiApplicationCategory>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiOrganizationList {
    #[serde(default)]
    pub organizations: Vec<ApiOrganization>,
}

/// Application category, called a "tag" by the API
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiApplicationCategory {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub color: String,
}

// =============================================================================
// Roles & Memberships
// =============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiRole {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiRoleList {
    #[serde(default)]
    pub roles: Vec<ApiRole>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiMemberMappingList {
    #[serde(default)]
    pub member_mappings: Vec<ApiMemberMapping>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiMemberMapping {
    pub role_id: String,
    #[serde(default)]
    pub members: Vec<ApiMember>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiMember {
    #[serde(default)]
    pub owner_id: Option<String>,
    /// "APPLICATION", "ORGANIZATION", ...
    #[serde(default)]
    pub owner_type: Option<String>,
    /// "USER" or "GROUP"
    #[serde(rename = "type")]
    pub member_type: String,
    pub user_or_group_name: String,
}

// =============================================================================
// Source Control
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiSourceControl {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_branch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remediation_pull_requests_enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pull_request_commenting_enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_control_evaluations_enabled: Option<bool>,
}

// =============================================================================
// Server Configuration
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiSystemConfig {
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub force_base_url: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiMailConfiguration {
    pub hostname: String,
    pub port: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default)]
    pub password_is_included: bool,
    #[serde(default)]
    pub ssl_enabled: bool,
    #[serde(default)]
    pub start_tls_enabled: bool,
    pub system_email: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiProxyServerConfiguration {
    pub hostname: String,
    pub port: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default)]
    pub password_is_included: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude_hosts: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiCrowdConfiguration {
    pub server_url: String,
    pub application_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application_password: Option<String>,
}

/// SAML settings; the identity provider metadata travels as a separate
/// multipart part on write and comes back inline on read
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiSamlConfiguration {
    pub identity_provider_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name_attribute_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name_attribute_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_attribute_name: Option<String>,
    pub username_attribute_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub groups_attribute_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validate_assertion_signature: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validate_response_signature: Option<bool>,
    #[serde(default, skip_serializing)]
    pub identity_provider_metadata_xml: Option<String>,
}

// =============================================================================
// Users
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiUser {
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub realm: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiUserToken {
    pub user_code: String,
    pub pass_code: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiUserTokenExists {
    #[serde(default)]
    pub user_token_exists: Option<bool>,
}
