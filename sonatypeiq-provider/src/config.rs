//! Provider configuration
//!
//! Connection settings come from the manifest `provider` block first and
//! fall back to the `IQ_SERVER_*` environment variables.

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use sonatypeiq_core::resource::Value;
use thiserror::Error;
use url::Url;

pub const ENV_URL: &str = "IQ_SERVER_URL";
pub const ENV_USERNAME: &str = "IQ_SERVER_USERNAME";
pub const ENV_PASSWORD: &str = "IQ_SERVER_PASSWORD";

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(
        "Unknown Sonatype IQ Server URL: the provider is unable to work without a Sonatype IQ Server URL which should begin http:// or https://"
    )]
    MissingUrl,

    #[error("Invalid Sonatype IQ Server URL: {0}")]
    InvalidUrl(String),

    #[error("Unknown Sonatype IQ Server Username: set `username` or IQ_SERVER_USERNAME")]
    MissingUsername,

    #[error("Unknown Sonatype IQ Server Password: set `password` or IQ_SERVER_PASSWORD")]
    MissingPassword,

    #[error("Failed to build HTTP client: {0}")]
    Client(String),
}

/// Connection settings for one IQ Server
#[derive(Clone)]
pub struct ProviderConfig {
    pub url: Url,
    pub username: String,
    pub password: String,
    pub timeout: Duration,
    pub connect_timeout: Duration,
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("url", &self.url.as_str())
            .field("username", &self.username)
            .field("password", &"(sensitive)")
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl ProviderConfig {
    /// Build from the manifest `provider` block, using the process environment
    /// for anything left unset
    pub fn from_values(values: &HashMap<String, Value>) -> Result<Self, ConfigError> {
        let get = |key: &str| values.get(key).and_then(Value::as_str);
        Self::resolve_with(get("url"), get("username"), get("password"), |name| {
            std::env::var(name).ok()
        })
    }

    /// Resolve settings; a non-empty explicit value wins over the environment
    pub fn resolve_with(
        url: Option<&str>,
        username: Option<&str>,
        password: Option<&str>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let pick = |explicit: Option<&str>, var: &str| {
            explicit
                .filter(|v| !v.is_empty())
                .map(str::to_string)
                .or_else(|| env(var).filter(|v| !v.is_empty()))
        };

        let url = pick(url, ENV_URL).ok_or(ConfigError::MissingUrl)?;
        let url = parse_server_url(&url)?;
        let username = pick(username, ENV_USERNAME).ok_or(ConfigError::MissingUsername)?;
        let password = pick(password, ENV_PASSWORD).ok_or(ConfigError::MissingPassword)?;

        Ok(Self {
            url,
            username,
            password,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

fn parse_server_url(raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw).map_err(|e| ConfigError::InvalidUrl(format!("{}: {}", raw, e)))?;
    if !matches!(url.scheme(), "http" | "https") || !url.has_host() {
        return Err(ConfigError::InvalidUrl(format!(
            "{}: expected an http:// or https:// URL",
            raw
        )));
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn explicit_values_win() {
        let env = env_of(&[
            (ENV_URL, "http://env:8070"),
            (ENV_USERNAME, "env-user"),
            (ENV_PASSWORD, "env-pass"),
        ]);
        let config =
            ProviderConfig::resolve_with(Some("https://iq.example.com"), Some("admin"), None, env)
                .unwrap();
        assert_eq!(config.url.as_str(), "https://iq.example.com/");
        assert_eq!(config.username, "admin");
        assert_eq!(config.password, "env-pass");
    }

    #[test]
    fn empty_explicit_value_falls_back_to_environment() {
        let env = env_of(&[
            (ENV_URL, "http://localhost:8070"),
            (ENV_USERNAME, "admin"),
            (ENV_PASSWORD, "admin123"),
        ]);
        let config = ProviderConfig::resolve_with(Some(""), None, None, env).unwrap();
        assert_eq!(config.url.as_str(), "http://localhost:8070/");
    }

    #[test]
    fn missing_url() {
        let err =
            ProviderConfig::resolve_with(None, Some("a"), Some("b"), env_of(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingUrl));
        assert!(err.to_string().starts_with("Unknown Sonatype IQ Server URL"));
    }

    #[test]
    fn invalid_url() {
        for raw in ["not a url", "ftp://iq.example.com"] {
            let err = ProviderConfig::resolve_with(Some(raw), Some("a"), Some("b"), env_of(&[]))
                .unwrap_err();
            assert!(matches!(err, ConfigError::InvalidUrl(_)), "{}", raw);
        }
    }

    #[test]
    fn missing_credentials() {
        let err = ProviderConfig::resolve_with(Some("http://iq"), None, Some("b"), env_of(&[]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::MissingUsername));

        let err = ProviderConfig::resolve_with(Some("http://iq"), Some("a"), None, env_of(&[]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::MissingPassword));
    }

    #[test]
    fn debug_hides_password() {
        let config =
            ProviderConfig::resolve_with(Some("http://iq"), Some("a"), Some("s3cret"), env_of(&[]))
                .unwrap();
        assert!(!format!("{:?}", config).contains("s3cret"));
    }
}
