//! Identifiers and owner/member kinds shared by several resources

use std::fmt;

use chrono::Utc;
use percent_encoding::{AsciiSet, CONTROLS, percent_decode_str, utf8_percent_encode};
use sha1::{Digest, Sha1};

/// Id of the organization every IQ Server has
pub const ROOT_ORGANIZATION_ID: &str = "ROOT_ORGANIZATION_ID";

/// Fixed id reported by data sources that have no server-side id
pub const PLACEHOLDER_ID: &str = "placeholder";

/// Kind of object that owns role memberships and source control settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OwnerType {
    Application,
    Organization,
}

impl OwnerType {
    /// Lowercase name used in URLs and in the manifest
    pub fn as_str(self) -> &'static str {
        match self {
            OwnerType::Application => "application",
            OwnerType::Organization => "organization",
        }
    }

    /// Uppercase name used in API response bodies
    pub fn api_name(self) -> &'static str {
        match self {
            OwnerType::Application => "APPLICATION",
            OwnerType::Organization => "ORGANIZATION",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "application" => Some(OwnerType::Application),
            "organization" => Some(OwnerType::Organization),
            _ => None,
        }
    }
}

impl fmt::Display for OwnerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a role is granted to a user or a group
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberType {
    User,
    Group,
}

impl MemberType {
    pub fn as_str(self) -> &'static str {
        match self {
            MemberType::User => "user",
            MemberType::Group => "group",
        }
    }

    pub fn api_name(self) -> &'static str {
        match self {
            MemberType::User => "USER",
            MemberType::Group => "GROUP",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "user" => Some(MemberType::User),
            "group" => Some(MemberType::Group),
            _ => None,
        }
    }
}

/// Identity of one role membership
///
/// Encoded as `owner_role_type_name`. Components are percent-encoded with `%`
/// and `_` included, so names containing underscores decode unambiguously.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MembershipKey {
    pub owner_id: String,
    pub role_id: String,
    pub member_type: MemberType,
    pub member_name: String,
}

impl MembershipKey {
    pub fn encode(&self) -> String {
        [
            escape(&self.owner_id),
            escape(&self.role_id),
            self.member_type.as_str().to_string(),
            escape(&self.member_name),
        ]
        .join("_")
    }

    pub fn decode(s: &str) -> Option<Self> {
        let parts: Vec<&str> = s.split('_').collect();
        let [owner_id, role_id, member_type, member_name] = parts.as_slice() else {
            return None;
        };
        Some(Self {
            owner_id: unescape(owner_id)?,
            role_id: unescape(role_id)?,
            member_type: MemberType::parse(member_type)?,
            member_name: unescape(member_name)?,
        })
    }
}

impl fmt::Display for MembershipKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

/// Characters escaped inside a key component
const COMPONENT: &AsciiSet = &CONTROLS.add(b'%').add(b'_');

fn escape(component: &str) -> String {
    utf8_percent_encode(component, COMPONENT).to_string()
}

/// Only canonical encodings decode; anything `escape` would not produce is rejected
fn unescape(component: &str) -> Option<String> {
    let decoded = percent_decode_str(component).decode_utf8().ok()?;
    (escape(&decoded) == component).then(|| decoded.into_owned())
}

/// Strip surrounding double quotes left by some manifest interpolations
pub fn trim_quotes(s: &str) -> &str {
    s.trim_matches('"')
}

/// Parse a source control import identifier `owner_type:owner_id`
pub fn parse_owner_import(import_id: &str) -> Result<(OwnerType, String), String> {
    let Some((owner_type, owner_id)) = import_id.split_once(':') else {
        return Err(format!(
            "Unexpected Import Identifier: expected import identifier with format: owner_type:id. Got: {:?}",
            import_id
        ));
    };
    if owner_id.is_empty() {
        return Err(format!(
            "Unexpected Import Identifier: expected import identifier with format: owner_type:id. Got: {:?}",
            import_id
        ));
    }
    let owner_type = OwnerType::parse(trim_quotes(owner_type)).ok_or_else(|| {
        format!(
            "Unexpected Import Identifier: expected import identifier to start with 'application' or 'organization'. Got: {:?}",
            import_id
        )
    })?;
    Ok((owner_type, trim_quotes(owner_id).to_string()))
}

/// Stable user id: hex SHA-1 of username followed by realm
pub fn user_id(username: &str, realm: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(username.as_bytes());
    hasher.update(realm.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Timestamp stored in `last_updated` (RFC 850 style)
pub fn last_updated() -> String {
    Utc::now().format("%A, %d-%b-%y %H:%M:%S UTC").to_string()
}
