//! Types for Emby API requests and responses.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Configuration for connecting to an Emby server.
///
/// This is the blob the caller owns and persists. The client reads it once
/// at construction and can hand back an updated copy through
/// [`EmbyClient::to_config`](crate::EmbyClient::to_config).
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Base URL of the server (e.g., "http://media.local:8096")
    #[serde(default)]
    pub url: String,
    /// Long-lived API key; bypasses login entirely
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// User id cached from a previous login
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// Access token cached from a previous login
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    /// Device identifier sent with logins. A random one is generated when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
}

impl ServerConfig {
    /// Create a new server config with just the URL.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    /// Authenticate with a static API key.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Authenticate by logging in with username and password.
    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Resume a session obtained earlier.
    pub fn with_session(
        mut self,
        user_id: impl Into<String>,
        access_token: impl Into<String>,
    ) -> Self {
        self.user_id = Some(user_id.into());
        self.access_token = Some(access_token.into());
        self
    }

    pub fn with_device_id(mut self, device_id: impl Into<String>) -> Self {
        self.device_id = Some(device_id.into());
        self
    }
}

// =============================================================================
// Authentication Types
// =============================================================================

/// Form body for `Users/AuthenticateByName`.
#[derive(Serialize)]
pub(crate) struct LoginRequest<'a> {
    #[serde(rename = "Username")]
    pub username: &'a str,
    #[serde(rename = "Pw")]
    pub pw: &'a str,
}

impl fmt::Debug for LoginRequest<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginRequest")
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

/// Raw response from `Users/AuthenticateByName`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct AuthenticateResponse {
    pub access_token: String,
    pub user: AuthenticatedUser,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct AuthenticatedUser {
    pub id: String,
    pub name: Option<String>,
}

/// Outcome of a successful login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginResult {
    pub access_token: String,
    pub user_id: String,
    pub user_name: Option<String>,
}

impl From<AuthenticateResponse> for LoginResult {
    fn from(response: AuthenticateResponse) -> Self {
        Self {
            access_token: response.access_token,
            user_id: response.user.id,
            user_name: response.user.name,
        }
    }
}

// =============================================================================
// Server Info Types
// =============================================================================

/// Public information exposed by `System/Info/Public`.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct PublicSystemInfo {
    pub server_name: Option<String>,
    pub version: Option<String>,
    pub id: Option<String>,
    pub local_address: Option<String>,
}

// =============================================================================
// Item Types
// =============================================================================

/// Filters for the user-scoped item listing.
///
/// Serialized straight into the query string, so field names follow the
/// server's PascalCase parameter names.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ItemQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    /// Comma-separated item types, e.g. "Movie,Series"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_item_types: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recursive: Option<bool>,
    /// Comma-separated extra fields, e.g. "Overview,MediaSources"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_term: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_index: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

impl ItemQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    pub fn types(mut self, include_item_types: impl Into<String>) -> Self {
        self.include_item_types = Some(include_item_types.into());
        self
    }

    pub fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = Some(recursive);
        self
    }

    pub fn search(mut self, term: impl Into<String>) -> Self {
        self.search_term = Some(term.into());
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Envelope used by every list endpoint.
///
/// A body without `Items` is an empty page, not an error.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct ItemsResponse {
    #[serde(default)]
    pub items: Vec<BaseItem>,
}

/// An item (movie, series, season, episode, library view...) as returned
/// by the server. Only the fields the client itself relies on are typed.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct BaseItem {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "Type")]
    pub item_type: Option<String>,
    pub collection_type: Option<String>,
    pub parent_id: Option<String>,
    pub series_id: Option<String>,
    pub season_id: Option<String>,
    pub index_number: Option<i32>,
    pub parent_index_number: Option<i32>,
    pub production_year: Option<i32>,
    pub run_time_ticks: Option<u64>,
    pub overview: Option<String>,
    #[serde(default)]
    pub image_tags: HashMap<String, String>,
    #[serde(default)]
    pub media_sources: Vec<MediaSource>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct MediaSource {
    pub id: String,
    pub container: Option<String>,
    #[serde(default)]
    pub media_streams: Vec<MediaStream>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct MediaStream {
    /// "Video", "Audio" or "Subtitle"
    #[serde(rename = "Type")]
    pub stream_type: String,
    #[serde(default)]
    pub index: i32,
    pub codec: Option<String>,
    pub language: Option<String>,
    pub display_title: Option<String>,
    #[serde(default)]
    pub is_external: bool,
    pub delivery_url: Option<String>,
}

impl MediaStream {
    pub fn is_subtitle(&self) -> bool {
        self.stream_type.eq_ignore_ascii_case("Subtitle")
    }
}

// =============================================================================
// Resource Types
// =============================================================================

/// Image variants served by `Items/{id}/Images/{type}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum ImageType {
    Primary,
    Backdrop,
    Logo,
}

impl ImageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageType::Primary => "Primary",
            ImageType::Backdrop => "Backdrop",
            ImageType::Logo => "Logo",
        }
    }
}

impl fmt::Display for ImageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A subtitle track ready to hand to a player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubtitleTrack {
    pub url: String,
    pub language: String,
    pub label: String,
}
