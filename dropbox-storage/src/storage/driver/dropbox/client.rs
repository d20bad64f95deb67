//! Authenticated calls against the Dropbox HTTP API (v2).
//!
//! Every method is a single request; failures are reported as [`ApiError`]
//! and never retried. Callers turn them into [`StorageError`]s that carry the
//! logical path of the object involved.

use super::types::{
    AccountInfo, ApiErrorBody, CreateSharedLinkArg, FileMetadata, ListSharedLinksArg,
    ListSharedLinksResponse, OAuthErrorBody, PathArg, SharedLink, SharedLinkSettings,
    TemporaryLinkResponse, TokenResponse, UploadArg,
};
use crate::error::StorageError;
use bytes::Bytes;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

const API_ARG_HEADER: &str = "Dropbox-API-Arg";

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// An endpoint-specific error (HTTP 409), identified by its summary.
    #[error("{summary}")]
    Endpoint { summary: String },

    #[error("unexpected status {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("failed to encode request argument: {0}")]
    Encode(#[from] serde_json::Error),
}

impl ApiError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::Endpoint { summary } if summary.contains("not_found"))
    }

    fn is_shared_link_conflict(&self) -> bool {
        matches!(self, ApiError::Endpoint { summary } if summary.starts_with("shared_link_already_exists"))
    }

    pub fn into_read_error(self, path: &str) -> StorageError {
        match self {
            ApiError::Unauthorized(msg) => StorageError::Authentication(msg),
            e if e.is_not_found() => StorageError::NotFound(path.to_string()),
            e => StorageError::remote_read(path, e),
        }
    }

    pub fn into_write_error(self, path: &str) -> StorageError {
        match self {
            ApiError::Unauthorized(msg) => StorageError::Authentication(msg),
            e => StorageError::remote_write(path, e),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenOrigin {
    Configured,
    Refreshed { expires_in: Option<u64> },
}

/// An authenticated session: the bearer token every call is signed with.
pub struct Session {
    access_token: String,
    origin: TokenOrigin,
}

impl Session {
    pub fn new(access_token: impl Into<String>, origin: TokenOrigin) -> Self {
        Self {
            access_token: access_token.into(),
            origin,
        }
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    pub fn origin(&self) -> TokenOrigin {
        self.origin
    }

    /// Exchanges a long-lived refresh token for a short-lived access token.
    pub async fn refresh(
        http: &Client,
        oauth_url: &str,
        app_key: &str,
        app_secret: &str,
        refresh_token: &str,
    ) -> Result<Self, StorageError> {
        let url = format!("{}/oauth2/token", oauth_url.trim_end_matches('/'));
        let res = http
            .post(url)
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
                ("client_id", app_key),
                ("client_secret", app_secret),
            ])
            .send()
            .await
            .map_err(|e| StorageError::Authentication(format!("token exchange failed: {e}")))?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            let reason = match serde_json::from_str::<OAuthErrorBody>(&body) {
                Ok(OAuthErrorBody {
                    error,
                    error_description: Some(desc),
                }) => format!("{error}: {desc}"),
                Ok(OAuthErrorBody { error, .. }) => error,
                Err(_) => format!("token endpoint returned {status}"),
            };
            return Err(StorageError::Authentication(reason));
        }

        let token = res
            .json::<TokenResponse>()
            .await
            .map_err(|e| StorageError::Authentication(format!("malformed token response: {e}")))?;
        Ok(Self::new(
            token.access_token,
            TokenOrigin::Refreshed {
                expires_in: token.expires_in,
            },
        ))
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("access_token", &"<redacted>")
            .field("origin", &self.origin)
            .finish()
    }
}

#[derive(Clone, Debug)]
pub(crate) struct Endpoints {
    pub(crate) api: String,
    pub(crate) content: String,
}

impl Endpoints {
    fn rpc(&self, route: &str) -> String {
        format!("{}/2/{}", self.api.trim_end_matches('/'), route)
    }

    fn content(&self, route: &str) -> String {
        format!("{}/2/{}", self.content.trim_end_matches('/'), route)
    }
}

/// A session bound to an HTTP client. Clones share the session.
#[derive(Clone, Debug)]
pub struct DropboxClient {
    http: Client,
    endpoints: Endpoints,
    session: Arc<Session>,
}

#[async_trait::async_trait]
trait RequestBuilderExt {
    async fn send_checked(self) -> Result<Response, ApiError>;

    async fn send_and_json<U>(self) -> Result<U, ApiError>
    where
        U: DeserializeOwned;
}

#[async_trait::async_trait]
impl RequestBuilderExt for RequestBuilder {
    async fn send_checked(self) -> Result<Response, ApiError> {
        let res = self.send().await?;
        let status = res.status();
        if status.is_success() {
            return Ok(res);
        }

        let body = res.text().await.unwrap_or_default();
        let summary = serde_json::from_str::<ApiErrorBody>(&body)
            .map(|b| b.error_summary)
            .unwrap_or_else(|_| body.clone());
        match status {
            StatusCode::UNAUTHORIZED => Err(ApiError::Unauthorized(summary)),
            StatusCode::CONFLICT => Err(ApiError::Endpoint { summary }),
            _ => Err(ApiError::Status { status, body }),
        }
    }

    async fn send_and_json<U>(self) -> Result<U, ApiError>
    where
        U: DeserializeOwned,
    {
        Ok(self.send_checked().await?.json::<U>().await?)
    }
}

/// Serializes a `Dropbox-API-Arg` header value. Header values must be
/// visible ASCII, so DEL and everything above it is written as JSON `\u`
/// escapes.
fn api_arg<T: Serialize>(arg: &T) -> Result<String, ApiError> {
    let json = serde_json::to_string(arg)?;
    let mut out = String::with_capacity(json.len());
    for c in json.chars() {
        if c.is_ascii() && c != '\u{7f}' {
            out.push(c);
        } else {
            let mut buf = [0u16; 2];
            for unit in c.encode_utf16(&mut buf) {
                out.push_str(&format!("\\u{unit:04x}"));
            }
        }
    }
    Ok(out)
}

impl DropboxClient {
    pub(crate) fn new(http: Client, endpoints: Endpoints, session: Arc<Session>) -> Self {
        Self {
            http,
            endpoints,
            session,
        }
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    fn post(&self, url: String) -> RequestBuilder {
        self.http
            .post(url)
            .bearer_auth(self.session.access_token())
    }

    /// Uploads `data` to `path`, replacing any existing file.
    pub async fn upload(&self, path: &str, data: Bytes) -> Result<(), ApiError> {
        tracing::debug!(path, size = data.len(), "dropbox upload");
        let meta: FileMetadata = self
            .post(self.endpoints.content("files/upload"))
            .header(API_ARG_HEADER, api_arg(&UploadArg::overwrite(path))?)
            .header(CONTENT_TYPE, "application/octet-stream")
            .body(data)
            .send_and_json()
            .await?;
        tracing::debug!(path, name = %meta.name, size = meta.size, "dropbox upload done");
        Ok(())
    }

    pub async fn download(&self, path: &str) -> Result<Bytes, ApiError> {
        tracing::debug!(path, "dropbox download");
        let res = self
            .post(self.endpoints.content("files/download"))
            .header(API_ARG_HEADER, api_arg(&PathArg { path })?)
            .send_checked()
            .await?;
        Ok(res.bytes().await?)
    }

    pub async fn delete(&self, path: &str) -> Result<(), ApiError> {
        tracing::debug!(path, "dropbox delete");
        self.post(self.endpoints.rpc("files/delete_v2"))
            .json(&PathArg { path })
            .send_checked()
            .await?;
        Ok(())
    }

    /// A direct link to the file content, valid for a few hours.
    pub async fn temporary_link(&self, path: &str) -> Result<String, ApiError> {
        tracing::debug!(path, "dropbox temporary link");
        let res: TemporaryLinkResponse = self
            .post(self.endpoints.rpc("files/get_temporary_link"))
            .json(&PathArg { path })
            .send_and_json()
            .await?;
        Ok(res.link)
    }

    /// A public shared link. An existing link for the file is reused.
    pub async fn shared_link(&self, path: &str) -> Result<String, ApiError> {
        tracing::debug!(path, "dropbox shared link");
        let created = self
            .post(self.endpoints.rpc("sharing/create_shared_link_with_settings"))
            .json(&CreateSharedLinkArg {
                path,
                settings: SharedLinkSettings {
                    requested_visibility: "public",
                },
            })
            .send_and_json::<SharedLink>()
            .await;

        match created {
            Ok(link) => Ok(link.url),
            Err(e) if e.is_shared_link_conflict() => {
                let res: ListSharedLinksResponse = self
                    .post(self.endpoints.rpc("sharing/list_shared_links"))
                    .json(&ListSharedLinksArg {
                        path,
                        direct_only: true,
                    })
                    .send_and_json()
                    .await?;
                res.links
                    .into_iter()
                    .next()
                    .map(|link| link.url)
                    .ok_or(e)
            }
            Err(e) => Err(e),
        }
    }

    pub async fn current_account(&self) -> Result<AccountInfo, ApiError> {
        self.post(self.endpoints.rpc("users/get_current_account"))
            .send_and_json()
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_arg_escapes_non_ascii() {
        let arg = api_arg(&PathArg {
            path: "/uploads/café ☃.txt",
        })
        .unwrap();
        assert_eq!(arg, r#"{"path":"/uploads/caf\u00e9 \u2603.txt"}"#);
    }

    #[test]
    fn api_arg_escapes_delete_char() {
        let arg = api_arg(&PathArg { path: "/a\u{7f}b.txt" }).unwrap();
        assert_eq!(arg, r#"{"path":"/a\u007fb.txt"}"#);
        assert!(reqwest::header::HeaderValue::from_str(&arg).is_ok());
    }

    #[test]
    fn api_arg_escapes_astral_chars_as_surrogates() {
        let arg = api_arg(&PathArg { path: "/😀" }).unwrap();
        assert_eq!(arg, r#"{"path":"/\ud83d\ude00"}"#);
    }

    #[test]
    fn not_found_is_recognised_from_the_summary() {
        let err = ApiError::Endpoint {
            summary: "path/not_found/..".into(),
        };
        assert!(err.is_not_found());
        assert!(err.into_read_error("a.txt").is_not_found());

        let err = ApiError::Endpoint {
            summary: "path/insufficient_space/..".into(),
        };
        assert!(matches!(
            err.into_write_error("a.txt"),
            StorageError::RemoteWrite { .. }
        ));

        // a write never reports a missing object
        let err = ApiError::Endpoint {
            summary: "path/not_found/..".into(),
        };
        assert!(matches!(
            err.into_write_error("a.txt"),
            StorageError::RemoteWrite { .. }
        ));
    }

    #[test]
    fn unauthorized_maps_to_authentication() {
        let err = ApiError::Unauthorized("invalid_access_token/".into());
        assert!(matches!(
            err.into_read_error("a.txt"),
            StorageError::Authentication(_)
        ));
    }

    #[test]
    fn session_debug_hides_token() {
        let session = Session::new("sl.secret", TokenOrigin::Configured);
        assert!(!format!("{session:?}").contains("sl.secret"));
    }
}
