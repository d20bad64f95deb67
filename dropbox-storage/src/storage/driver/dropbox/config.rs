use std::fmt::{self, Display, Formatter};
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "https://api.dropboxapi.com";
pub const DEFAULT_CONTENT_URL: &str = "https://content.dropboxapi.com";
pub const DEFAULT_OAUTH_URL: &str = "https://api.dropbox.com";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Who may open the URL returned for a stored object.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AccessPolicy {
    /// Short-lived direct links.
    #[default]
    Private,
    /// Public shared links.
    PublicRead,
}

impl FromStr for AccessPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "private" => Ok(AccessPolicy::Private),
            "public_read" => Ok(AccessPolicy::PublicRead),
            _ => Err("access policy must be `private` or `public_read`".to_string()),
        }
    }
}

impl Display for AccessPolicy {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            AccessPolicy::Private => write!(f, "private"),
            AccessPolicy::PublicRead => write!(f, "public_read"),
        }
    }
}

/// Either a ready access token, or an app key/secret pair with a refresh
/// token to exchange for one.
#[derive(Clone, Default)]
pub struct Credentials {
    pub app_key: Option<String>,
    pub app_secret: Option<String>,
    pub refresh_token: Option<String>,
    pub access_token: Option<String>,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let redact = |v: &Option<String>| v.as_ref().map(|_| "<redacted>");
        f.debug_struct("Credentials")
            .field("app_key", &self.app_key)
            .field("app_secret", &redact(&self.app_secret))
            .field("refresh_token", &redact(&self.refresh_token))
            .field("access_token", &redact(&self.access_token))
            .finish()
    }
}

#[derive(Clone, Debug)]
pub struct DropboxConfig {
    pub credentials: Credentials,
    pub access_policy: AccessPolicy,
    /// Remote folder all keys are placed under; empty for the namespace root.
    pub root: String,
    pub api_url: String,
    pub content_url: String,
    pub oauth_url: String,
    pub timeout: Duration,
}

impl Default for DropboxConfig {
    fn default() -> Self {
        Self {
            credentials: Credentials::default(),
            access_policy: AccessPolicy::default(),
            root: String::new(),
            api_url: DEFAULT_API_URL.to_string(),
            content_url: DEFAULT_CONTENT_URL.to_string(),
            oauth_url: DEFAULT_OAUTH_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl DropboxConfig {
    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.credentials.access_token = Some(token.into());
        self
    }

    pub fn with_refresh_token(
        mut self,
        app_key: impl Into<String>,
        app_secret: impl Into<String>,
        refresh_token: impl Into<String>,
    ) -> Self {
        self.credentials.app_key = Some(app_key.into());
        self.credentials.app_secret = Some(app_secret.into());
        self.credentials.refresh_token = Some(refresh_token.into());
        self
    }

    pub fn with_access_policy(mut self, policy: AccessPolicy) -> Self {
        self.access_policy = policy;
        self
    }

    pub fn with_root(mut self, root: impl Into<String>) -> Self {
        self.root = root.into();
        self
    }

    /// Points every endpoint at one base url, as a proxy or test server would.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        let url = url.into();
        self.api_url = url.clone();
        self.content_url = url.clone();
        self.oauth_url = url;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn access_policy_parses_loosely() {
        assert_eq!("private".parse::<AccessPolicy>(), Ok(AccessPolicy::Private));
        assert_eq!(
            " Public-Read ".parse::<AccessPolicy>(),
            Ok(AccessPolicy::PublicRead)
        );
        assert!("world".parse::<AccessPolicy>().is_err());
        assert_eq!(AccessPolicy::PublicRead.to_string(), "public_read");
    }

    #[test]
    fn debug_output_hides_secrets() {
        let config = DropboxConfig::default().with_refresh_token("key", "secret", "refresh");
        let out = format!("{config:?}");
        assert!(out.contains(r#"app_key: Some("key")"#));
        assert!(!out.contains("secret\""));
        assert!(!out.contains("refresh\""));
    }

    #[test]
    fn defaults_point_at_dropbox() {
        let config = DropboxConfig::default();
        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert_eq!(config.access_policy, AccessPolicy::Private);
        assert!(config.credentials.access_token.is_none());
    }
}
