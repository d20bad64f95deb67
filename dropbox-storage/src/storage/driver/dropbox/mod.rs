//! Dropbox storage adapter
//!
//! Submodules:
//! - `client`: authenticated calls against the Dropbox HTTP API
//! - `config`: credentials, access policy and endpoints
//! - `types`: request and response bodies
//!
//! [`DropboxStorage`] owns one session per instance. The session is created
//! on first use under a mutex, so concurrent first callers share a single
//! token exchange, and is reused until invalidated.

pub mod client;
pub mod config;
pub mod types;

pub use client::{ApiError, DropboxClient, Session, TokenOrigin};
pub use config::{AccessPolicy, Credentials, DropboxConfig};
pub use types::AccountInfo;

use crate::error::{Result, StorageError};
use crate::storage::paths::PathManager;
use crate::storage::{Storage, StoredFile};
use crate::upload::{LocalFile, UploadContext};
use bytes::Bytes;
use client::Endpoints;
use reqwest::Url;
use std::fmt;
use std::sync::Arc;
use tokio::sync::Mutex;

struct SessionState {
    credentials: Credentials,
    session: Option<Arc<Session>>,
}

struct Inner {
    http: reqwest::Client,
    endpoints: Endpoints,
    oauth_url: String,
    access_policy: AccessPolicy,
    path_manager: PathManager,
    uploader: Arc<dyn UploadContext>,
    state: Mutex<SessionState>,
}

/// Stores uploads in a Dropbox account. Clones share the session.
#[derive(Clone)]
pub struct DropboxStorage {
    inner: Arc<Inner>,
}

fn check_endpoint(name: &str, url: &str) -> Result<()> {
    let parsed = Url::parse(url)
        .map_err(|e| StorageError::Config(format!("invalid {name} url `{url}`: {e}")))?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        scheme => Err(StorageError::Config(format!(
            "unsupported scheme `{scheme}` for {name} url `{url}`"
        ))),
    }
}

impl DropboxStorage {
    /// Checks the endpoints and builds the HTTP client. No request is made.
    pub fn new(config: DropboxConfig, uploader: Arc<dyn UploadContext>) -> Result<Self> {
        check_endpoint("api", &config.api_url)?;
        check_endpoint("content", &config.content_url)?;
        check_endpoint("oauth", &config.oauth_url)?;

        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| StorageError::Config(format!("failed to build http client: {e}")))?;

        Ok(Self {
            inner: Arc::new(Inner {
                http,
                endpoints: Endpoints {
                    api: config.api_url,
                    content: config.content_url,
                },
                oauth_url: config.oauth_url,
                access_policy: config.access_policy,
                path_manager: PathManager::remote(&config.root),
                uploader,
                state: Mutex::new(SessionState {
                    credentials: config.credentials,
                    session: None,
                }),
            }),
        })
    }

    pub fn access_policy(&self) -> AccessPolicy {
        self.inner.access_policy
    }

    /// Pushes `file` to the target path of the current upload.
    pub async fn store(&self, file: &dyn LocalFile) -> Result<DropboxFile> {
        let f = self.retrieve();
        f.store(file).await?;
        Ok(f)
    }

    /// A handle to the target path of the current upload. Nothing is fetched.
    pub fn retrieve(&self) -> DropboxFile {
        DropboxFile {
            storage: self.clone(),
            path: self.inner.uploader.target_path(),
        }
    }

    /// Returns the cached session, creating it on first call.
    pub async fn session(&self) -> Result<Arc<Session>> {
        let mut state = self.inner.state.lock().await;
        if let Some(session) = &state.session {
            return Ok(session.clone());
        }

        let session = Arc::new(self.new_session(&state.credentials).await?);
        state.session = Some(session.clone());
        Ok(session)
    }

    async fn new_session(&self, credentials: &Credentials) -> Result<Session> {
        if let Some(token) = &credentials.access_token {
            tracing::info!("using configured dropbox access token");
            return Ok(Session::new(token.clone(), TokenOrigin::Configured));
        }

        match credentials {
            Credentials {
                app_key: Some(key),
                app_secret: Some(secret),
                refresh_token: Some(refresh_token),
                ..
            } => {
                let session = Session::refresh(
                    &self.inner.http,
                    &self.inner.oauth_url,
                    key,
                    secret,
                    refresh_token,
                )
                .await?;
                tracing::info!(app_key = %key, "exchanged dropbox refresh token");
                Ok(session)
            }
            _ => Err(StorageError::Authentication(
                "no dropbox credentials configured: set an access token, or an app key, app secret and refresh token"
                    .to_string(),
            )),
        }
    }

    /// A client signed with the cached session.
    pub async fn client(&self) -> Result<DropboxClient> {
        Ok(DropboxClient::new(
            self.inner.http.clone(),
            self.inner.endpoints.clone(),
            self.session().await?,
        ))
    }

    /// Asks Dropbox which account the session is linked to.
    pub async fn validate_session(&self) -> Result<AccountInfo> {
        let account = self
            .client()
            .await?
            .current_account()
            .await
            .map_err(|e| match e {
                ApiError::Unauthorized(msg) => {
                    StorageError::Authentication(format!("session validation failed: {msg}"))
                }
                e => e.into_read_error("users/get_current_account"),
            })?;
        tracing::info!(
            account_id = %account.account_id,
            name = %account.name.display_name,
            "linked dropbox account"
        );
        Ok(account)
    }

    /// Replaces the credentials with a ready access token. The next call
    /// creates a new session from it.
    pub async fn set_access_token(&self, token: impl Into<String>) {
        let mut state = self.inner.state.lock().await;
        state.credentials.access_token = Some(token.into());
        state.session = None;
    }

    /// Drops the cached session.
    pub async fn invalidate_session(&self) {
        self.inner.state.lock().await.session = None;
    }

    fn remote_path(&self, key: &str) -> Result<String> {
        self.inner.path_manager.object_path(key)
    }
}

#[async_trait::async_trait]
impl Storage for DropboxStorage {
    async fn store(&self, file: &dyn LocalFile) -> Result<Box<dyn StoredFile>> {
        Ok(Box::new(DropboxStorage::store(self, file).await?))
    }

    fn retrieve(&self) -> Box<dyn StoredFile> {
        Box::new(DropboxStorage::retrieve(self))
    }
}

/// A handle to one object in Dropbox.
#[derive(Clone)]
pub struct DropboxFile {
    storage: DropboxStorage,
    path: String,
}

impl fmt::Debug for DropboxFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DropboxFile")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

#[async_trait::async_trait]
impl StoredFile for DropboxFile {
    fn path(&self) -> &str {
        &self.path
    }

    async fn read(&self) -> Result<Bytes> {
        let remote = self.storage.remote_path(&self.path)?;
        self.storage
            .client()
            .await?
            .download(&remote)
            .await
            .map_err(|e| e.into_read_error(&self.path))
    }

    async fn delete(&self) -> Result<()> {
        let remote = self.storage.remote_path(&self.path)?;
        match self.storage.client().await?.delete(&remote).await {
            Ok(()) => Ok(()),
            Err(e) if e.is_not_found() => {
                tracing::warn!(path = %self.path, "delete of missing dropbox file ignored");
                Ok(())
            }
            Err(e) => Err(e.into_write_error(&self.path)),
        }
    }

    async fn url(&self) -> Result<String> {
        let remote = self.storage.remote_path(&self.path)?;
        let client = self.storage.client().await?;
        let link = match self.storage.access_policy() {
            AccessPolicy::Private => client.temporary_link(&remote).await,
            AccessPolicy::PublicRead => client.shared_link(&remote).await,
        };
        link.map_err(|e| e.into_read_error(&self.path))
    }

    async fn store(&self, file: &dyn LocalFile) -> Result<()> {
        let remote = self.storage.remote_path(&self.path)?;
        let data = file.local_content().await?;
        self.storage
            .client()
            .await?
            .upload(&remote, data)
            .await
            .map_err(|e| e.into_write_error(&self.path))
    }
}
