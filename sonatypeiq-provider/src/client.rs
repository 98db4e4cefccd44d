//! IQ Server REST client
//!
//! One method per `/api/v2` endpoint. Every call authenticates with HTTP
//! basic auth and checks the response status before decoding; a status the
//! endpoint does not document as success is returned as
//! [`ApiError::Status`] so callers can branch on 404.

use log::debug;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use url::Url;

use crate::config::{ConfigError, ProviderConfig};
use crate::identity::{MemberType, OwnerType};
use crate::models::*;

pub const USER_AGENT: &str = concat!("sonatypeiq-rs/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Transport(#[from] reqwest::Error),

    #[error("{status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("Failed to decode response: {0}")]
    Decode(String),

    /// The request could not be built (bad URL, unreadable local file)
    #[error("{0}")]
    Request(String),
}

impl ApiError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(StatusCode::NOT_FOUND)
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

/// Which response status counts as success
#[derive(Debug, Clone, Copy)]
enum Expect {
    Success,
    Status(StatusCode),
}

/// Authenticated client for one IQ Server
pub struct IqClient {
    http: Client,
    base_url: Url,
    username: String,
    password: String,
}

impl IqClient {
    pub fn new(config: &ProviderConfig) -> Result<Self, ConfigError> {
        let http = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| ConfigError::Client(e.to_string()))?;

        Ok(Self {
            http,
            base_url: config.url.clone(),
            username: config.username.clone(),
            password: config.password.clone(),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // =========================================================================
    // Request plumbing
    // =========================================================================

    /// `<base>/api/v2/<segments...>`, each segment percent-encoded
    fn endpoint(&self, segments: &[&str]) -> ApiResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                ApiError::Request(format!("{} cannot be used as a base URL", self.base_url))
            })?
            .pop_if_empty()
            .extend(["api", "v2"])
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        debug!("{} {}", method, url);
        self.http
            .request(method, url)
            .basic_auth(&self.username, Some(&self.password))
    }

    async fn execute(&self, request: RequestBuilder, expect: Expect) -> ApiResult<Response> {
        let response = request.send().await?;
        let status = response.status();
        let accepted = match expect {
            Expect::Success => status.is_success(),
            Expect::Status(expected) => status == expected,
        };
        if accepted {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        debug!("IQ Server responded {}: {}", status, body);
        Err(ApiError::Status { status, body })
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> ApiResult<T> {
        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| ApiError::Decode(e.to_string()))
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url, expect: Expect) -> ApiResult<T> {
        let response = self.execute(self.request(Method::GET, url), expect).await?;
        Self::decode(response).await
    }

    async fn send_json<B: Serialize + ?Sized>(
        &self,
        method: Method,
        url: Url,
        body: &B,
        expect: Expect,
    ) -> ApiResult<Response> {
        self.execute(self.request(method, url).json(body), expect)
            .await
    }

    async fn delete(&self, url: Url, expect: Expect) -> ApiResult<()> {
        self.execute(self.request(Method::DELETE, url), expect)
            .await
            .map(|_| ())
    }

    // =========================================================================
    // Applications
    // =========================================================================

    pub async fn add_application(&self, app: &ApiApplication) -> ApiResult<ApiApplication> {
        let url = self.endpoint(&["applications"])?;
        let response = self
            .send_json(Method::POST, url, app, Expect::Success)
            .await?;
        Self::decode(response).await
    }

    pub async fn get_applications(&self) -> ApiResult<ApiApplicationList> {
        let url = self.endpoint(&["applications"])?;
        self.get_json(url, Expect::Success).await
    }

    pub async fn get_applications_by_public_id(
        &self,
        public_id: &str,
    ) -> ApiResult<ApiApplicationList> {
        let mut url = self.endpoint(&["applications"])?;
        url.query_pairs_mut().append_pair("publicId", public_id);
        self.get_json(url, Expect::Success).await
    }

    pub async fn get_application(&self, id: &str) -> ApiResult<ApiApplication> {
        let url = self.endpoint(&["applications", id])?;
        self.get_json(url, Expect::Success).await
    }

    pub async fn update_application(
        &self,
        id: &str,
        app: &ApiApplication,
    ) -> ApiResult<ApiApplication> {
        let url = self.endpoint(&["applications", id])?;
        let response = self
            .send_json(Method::PUT, url, app, Expect::Success)
            .await?;
        Self::decode(response).await
    }

    pub async fn delete_application(&self, id: &str) -> ApiResult<()> {
        let url = self.endpoint(&["applications", id])?;
        self.delete(url, Expect::Success).await
    }

    pub async fn move_application(&self, id: &str, organization_id: &str) -> ApiResult<()> {
        let url = self.endpoint(&["applications", id, "move", "organization", organization_id])?;
        self.execute(self.request(Method::POST, url), Expect::Success)
            .await
            .map(|_| ())
    }

    // =========================================================================
    // Organizations
    // =========================================================================

    pub async fn add_organization(&self, org: &ApiOrganization) -> ApiResult<ApiOrganization> {
        let url = self.endpoint(&["organizations"])?;
        let response = self
            .send_json(Method::POST, url, org, Expect::Success)
            .await?;
        Self::decode(response).await
    }

    pub async fn get_organizations(&self) -> ApiResult<ApiOrganizationList> {
        let url = self.endpoint(&["organizations"])?;
        self.get_json(url, Expect::Success).await
    }

    pub async fn get_organizations_by_name(&self, name: &str) -> ApiResult<ApiOrganizationList> {
        let mut url = self.endpoint(&["organizations"])?;
        url.query_pairs_mut().append_pair("organizationName", name);
        self.get_json(url, Expect::Success).await
    }

    pub async fn get_organization(&self, id: &str) -> ApiResult<ApiOrganization> {
        let url = self.endpoint(&["organizations", id])?;
        self.get_json(url, Expect::Success).await
    }

    // =========================================================================
    // Application Categories
    // =========================================================================

    pub async fn get_application_categories(
        &self,
        organization_id: &str,
    ) -> ApiResult<Vec<ApiApplicationCategory>> {
        let url = self.endpoint(&["applicationCategories", "organization", organization_id])?;
        self.get_json(url, Expect::Success).await
    }

    pub async fn add_application_category(
        &self,
        organization_id: &str,
        category: &ApiApplicationCategory,
    ) -> ApiResult<ApiApplicationCategory> {
        let url = self.endpoint(&["applicationCategories", "organization", organization_id])?;
        let response = self
            .send_json(Method::POST, url, category, Expect::Status(StatusCode::OK))
            .await?;
        Self::decode(response).await
    }

    pub async fn update_application_category(
        &self,
        organization_id: &str,
        category: &ApiApplicationCategory,
    ) -> ApiResult<ApiApplicationCategory> {
        let url = self.endpoint(&["applicationCategories", "organization", organization_id])?;
        let response = self
            .send_json(Method::PUT, url, category, Expect::Status(StatusCode::OK))
            .await?;
        Self::decode(response).await
    }

    pub async fn delete_application_category(
        &self,
        organization_id: &str,
        id: &str,
    ) -> ApiResult<()> {
        let url = self.endpoint(&["applicationCategories", "organization", organization_id, id])?;
        self.delete(url, Expect::Status(StatusCode::NO_CONTENT))
            .await
    }

    // =========================================================================
    // Roles & Role Memberships
    // =========================================================================

    pub async fn get_roles(&self) -> ApiResult<ApiRoleList> {
        let url = self.endpoint(&["roles"])?;
        self.get_json(url, Expect::Success).await
    }

    pub async fn get_role_memberships(
        &self,
        owner_type: OwnerType,
        owner_id: &str,
    ) -> ApiResult<ApiMemberMappingList> {
        let url = self.endpoint(&["roleMemberships", owner_type.as_str(), owner_id])?;
        self.get_json(url, Expect::Success).await
    }

    fn membership_url(
        &self,
        owner_type: OwnerType,
        owner_id: &str,
        role_id: &str,
        member_type: MemberType,
        member_name: &str,
    ) -> ApiResult<Url> {
        self.endpoint(&[
            "roleMemberships",
            owner_type.as_str(),
            owner_id,
            "role",
            role_id,
            member_type.as_str(),
            member_name,
        ])
    }

    pub async fn grant_role_membership(
        &self,
        owner_type: OwnerType,
        owner_id: &str,
        role_id: &str,
        member_type: MemberType,
        member_name: &str,
    ) -> ApiResult<()> {
        let url = self.membership_url(owner_type, owner_id, role_id, member_type, member_name)?;
        self.execute(self.request(Method::PUT, url), Expect::Success)
            .await
            .map(|_| ())
    }

    pub async fn revoke_role_membership(
        &self,
        owner_type: OwnerType,
        owner_id: &str,
        role_id: &str,
        member_type: MemberType,
        member_name: &str,
    ) -> ApiResult<()> {
        let url = self.membership_url(owner_type, owner_id, role_id, member_type, member_name)?;
        self.delete(url, Expect::Success).await
    }

    // =========================================================================
    // Source Control
    // =========================================================================

    pub async fn add_source_control(
        &self,
        owner_type: OwnerType,
        owner_id: &str,
        config: &ApiSourceControl,
    ) -> ApiResult<ApiSourceControl> {
        let url = self.endpoint(&["sourceControl", owner_type.as_str(), owner_id])?;
        let response = self
            .send_json(Method::POST, url, config, Expect::Success)
            .await?;
        Self::decode(response).await
    }

    pub async fn get_source_control(
        &self,
        owner_type: OwnerType,
        owner_id: &str,
    ) -> ApiResult<ApiSourceControl> {
        let url = self.endpoint(&["sourceControl", owner_type.as_str(), owner_id])?;
        self.get_json(url, Expect::Success).await
    }

    pub async fn update_source_control(
        &self,
        owner_type: OwnerType,
        owner_id: &str,
        config: &ApiSourceControl,
    ) -> ApiResult<ApiSourceControl> {
        let url = self.endpoint(&["sourceControl", owner_type.as_str(), owner_id])?;
        let response = self
            .send_json(Method::PUT, url, config, Expect::Success)
            .await?;
        Self::decode(response).await
    }

    pub async fn delete_source_control(
        &self,
        owner_type: OwnerType,
        owner_id: &str,
    ) -> ApiResult<()> {
        let url = self.endpoint(&["sourceControl", owner_type.as_str(), owner_id])?;
        self.delete(url, Expect::Success).await
    }

    // =========================================================================
    // System Configuration
    // =========================================================================

    pub async fn get_system_config(&self) -> ApiResult<ApiSystemConfig> {
        let mut url = self.endpoint(&["config"])?;
        url.query_pairs_mut()
            .append_pair("property", "baseUrl")
            .append_pair("property", "forceBaseUrl");
        self.get_json(url, Expect::Status(StatusCode::OK)).await
    }

    pub async fn set_system_config(&self, config: &ApiSystemConfig) -> ApiResult<()> {
        let url = self.endpoint(&["config"])?;
        self.send_json(Method::PUT, url, config, Expect::Status(StatusCode::NO_CONTENT))
            .await
            .map(|_| ())
    }

    pub async fn get_mail_config(&self) -> ApiResult<ApiMailConfiguration> {
        let url = self.endpoint(&["config", "mail"])?;
        self.get_json(url, Expect::Success).await
    }

    pub async fn set_mail_config(&self, config: &ApiMailConfiguration) -> ApiResult<()> {
        let url = self.endpoint(&["config", "mail"])?;
        self.send_json(Method::PUT, url, config, Expect::Success)
            .await
            .map(|_| ())
    }

    pub async fn delete_mail_config(&self) -> ApiResult<()> {
        let url = self.endpoint(&["config", "mail"])?;
        self.delete(url, Expect::Success).await
    }

    pub async fn get_proxy_server_config(&self) -> ApiResult<ApiProxyServerConfiguration> {
        let url = self.endpoint(&["config", "httpProxyServer"])?;
        self.get_json(url, Expect::Success).await
    }

    pub async fn set_proxy_server_config(
        &self,
        config: &ApiProxyServerConfiguration,
    ) -> ApiResult<()> {
        let url = self.endpoint(&["config", "httpProxyServer"])?;
        self.send_json(Method::PUT, url, config, Expect::Success)
            .await
            .map(|_| ())
    }

    pub async fn delete_proxy_server_config(&self) -> ApiResult<()> {
        let url = self.endpoint(&["config", "httpProxyServer"])?;
        self.delete(url, Expect::Success).await
    }

    pub async fn get_crowd_config(&self) -> ApiResult<ApiCrowdConfiguration> {
        let url = self.endpoint(&["config", "crowd"])?;
        self.get_json(url, Expect::Success).await
    }

    pub async fn set_crowd_config(&self, config: &ApiCrowdConfiguration) -> ApiResult<()> {
        let url = self.endpoint(&["config", "crowd"])?;
        self.send_json(Method::PUT, url, config, Expect::Status(StatusCode::NO_CONTENT))
            .await
            .map(|_| ())
    }

    pub async fn delete_crowd_config(&self) -> ApiResult<()> {
        let url = self.endpoint(&["config", "crowd"])?;
        self.delete(url, Expect::Status(StatusCode::NO_CONTENT))
            .await
    }

    // =========================================================================
    // SAML
    // =========================================================================

    pub async fn get_saml_config(&self) -> ApiResult<ApiSamlConfiguration> {
        let url = self.endpoint(&["config", "saml"])?;
        self.get_json(url, Expect::Success).await
    }

    pub async fn set_saml_config(
        &self,
        identity_provider_xml: &str,
        config: &ApiSamlConfiguration,
    ) -> ApiResult<()> {
        let url = self.endpoint(&["config", "saml"])?;
        let json = serde_json::to_string(config).map_err(|e| ApiError::Request(e.to_string()))?;
        let form = Form::new()
            .text("identityProviderXml", identity_provider_xml.to_string())
            .part(
                "samlConfiguration",
                Part::text(json).mime_str("application/json")?,
            );
        self.execute(
            self.request(Method::PUT, url).multipart(form),
            Expect::Status(StatusCode::NO_CONTENT),
        )
        .await
        .map(|_| ())
    }

    pub async fn delete_saml_config(&self) -> ApiResult<()> {
        let url = self.endpoint(&["config", "saml"])?;
        self.delete(url, Expect::Status(StatusCode::NO_CONTENT))
            .await
    }

    pub async fn get_saml_metadata(&self) -> ApiResult<String> {
        let url = self.endpoint(&["config", "saml", "metadata"])?;
        let response = self
            .execute(self.request(Method::GET, url), Expect::Status(StatusCode::OK))
            .await?;
        Ok(response.text().await?)
    }

    // =========================================================================
    // Product License
    // =========================================================================

    pub async fn install_license(&self, license: Vec<u8>) -> ApiResult<()> {
        let url = self.endpoint(&["product", "license"])?;
        let form = Form::new().part("file", Part::bytes(license).file_name("license.lic"));
        self.execute(
            self.request(Method::POST, url).multipart(form),
            Expect::Status(StatusCode::OK),
        )
        .await
        .map(|_| ())
    }

    pub async fn uninstall_license(&self) -> ApiResult<()> {
        let url = self.endpoint(&["product", "license"])?;
        self.delete(url, Expect::Status(StatusCode::NO_CONTENT))
            .await
    }

    // =========================================================================
    // Users & User Tokens
    // =========================================================================

    pub async fn add_user(&self, user: &ApiUser) -> ApiResult<()> {
        let url = self.endpoint(&["users"])?;
        self.send_json(Method::POST, url, user, Expect::Status(StatusCode::NO_CONTENT))
            .await
            .map(|_| ())
    }

    pub async fn get_user(&self, username: &str) -> ApiResult<ApiUser> {
        let url = self.endpoint(&["users", username])?;
        self.get_json(url, Expect::Status(StatusCode::OK)).await
    }

    pub async fn update_user(&self, username: &str, user: &ApiUser) -> ApiResult<ApiUser> {
        let url = self.endpoint(&["users", username])?;
        let response = self
            .send_json(Method::PUT, url, user, Expect::Status(StatusCode::OK))
            .await?;
        Self::decode(response).await
    }

    pub async fn delete_user(&self, username: &str) -> ApiResult<()> {
        let url = self.endpoint(&["users", username])?;
        self.delete(url, Expect::Status(StatusCode::NO_CONTENT))
            .await
    }

    pub async fn create_user_token(&self) -> ApiResult<ApiUserToken> {
        let url = self.endpoint(&["userTokens"])?;
        let response = self
            .execute(self.request(Method::POST, url), Expect::Status(StatusCode::OK))
            .await?;
        Self::decode(response).await
    }

    pub async fn user_token_exists(&self) -> ApiResult<bool> {
        let url = self.endpoint(&["userTokens", "currentUser", "hasToken"])?;
        let exists: ApiUserTokenExists = self.get_json(url, Expect::Success).await?;
        exists
            .user_token_exists
            .ok_or_else(|| ApiError::Decode("missing field `userTokenExists`".to_string()))
    }

    pub async fn delete_user_token(&self) -> ApiResult<()> {
        let url = self.endpoint(&["userTokens", "currentUser"])?;
        self.delete(url, Expect::Status(StatusCode::NO_CONTENT))
            .await
    }
}
