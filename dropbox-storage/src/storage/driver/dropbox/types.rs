use serde::{Deserialize, Serialize};

#[derive(Serialize)]
pub struct PathArg<'a> {
    pub path: &'a str,
}

#[derive(Serialize)]
pub struct UploadArg<'a> {
    pub path: &'a str,
    pub mode: &'static str,
    pub autorename: bool,
    pub mute: bool,
}

impl<'a> UploadArg<'a> {
    pub fn overwrite(path: &'a str) -> Self {
        Self {
            path,
            mode: "overwrite",
            autorename: false,
            mute: true,
        }
    }
}

#[derive(Serialize)]
pub struct CreateSharedLinkArg<'a> {
    pub path: &'a str,
    pub settings: SharedLinkSettings,
}

#[derive(Serialize)]
pub struct SharedLinkSettings {
    pub requested_visibility: &'static str,
}

#[derive(Serialize)]
pub struct ListSharedLinksArg<'a> {
    pub path: &'a str,
    pub direct_only: bool,
}

#[derive(Deserialize, Debug)]
pub struct FileMetadata {
    pub name: String,
    #[serde(default)]
    pub size: u64,
}

#[derive(Deserialize)]
pub struct TemporaryLinkResponse {
    pub link: String,
}

#[derive(Deserialize)]
pub struct SharedLink {
    pub url: String,
}

#[derive(Deserialize)]
pub struct ListSharedLinksResponse {
    pub links: Vec<SharedLink>,
}

#[derive(Deserialize)]
pub struct ApiErrorBody {
    pub error_summary: String,
}

#[derive(Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub expires_in: Option<u64>,
}

#[derive(Deserialize)]
pub struct OAuthErrorBody {
    pub error: String,
    #[serde(default)]
    pub error_description: Option<String>,
}

/// The account a session is linked to.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct AccountInfo {
    pub account_id: String,
    #[serde(default)]
    pub email: Option<String>,
    pub name: AccountName,
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct AccountName {
    pub display_name: String,
}
