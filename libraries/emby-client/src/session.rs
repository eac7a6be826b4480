//! Session state and credential resolution.
//!
//! A [`Session`] is derived once from a [`ServerConfig`] and then only
//! changes through [`Session::apply_login_result`].

use crate::types::{LoginResult, ServerConfig};

/// Path segment every API route lives under.
pub const API_ROOT: &str = "/emby";

/// Normalize a server URL into the API endpoint.
///
/// Strips one trailing `/` and appends [`API_ROOT`] when it is missing.
/// Normalizing an already normalized endpoint returns it unchanged.
pub fn normalize_endpoint(raw: &str) -> String {
    let trimmed = raw.strip_suffix('/').unwrap_or(raw);
    if trimmed.ends_with(API_ROOT) {
        trimmed.to_string()
    } else {
        format!("{trimmed}{API_ROOT}")
    }
}

/// The credential a request will carry, resolved from the session.
///
/// An API key always wins over a token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credential {
    ApiKey(String),
    Token(String),
    /// Nothing usable yet; a login may still produce a token.
    Pending,
}

impl Credential {
    /// Value to put in `X-Emby-Token` or `api_key`.
    pub fn value(&self) -> Option<&str> {
        match self {
            Credential::ApiKey(v) | Credential::Token(v) => Some(v),
            Credential::Pending => None,
        }
    }
}

/// In-memory authenticated state for one client.
#[derive(Debug, Clone)]
pub struct Session {
    endpoint: String,
    api_key: Option<String>,
    token: Option<String>,
    user_id: Option<String>,
    username: Option<String>,
    password: Option<String>,
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value.as_deref().filter(|v| !v.is_empty()).map(str::to_string)
}

impl Session {
    pub fn from_config(config: &ServerConfig) -> Self {
        Self {
            endpoint: normalize_endpoint(config.url.trim()),
            api_key: non_empty(&config.api_key),
            token: non_empty(&config.access_token),
            user_id: non_empty(&config.user_id),
            username: non_empty(&config.username),
            password: non_empty(&config.password),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn credential(&self) -> Credential {
        if let Some(key) = &self.api_key {
            Credential::ApiKey(key.clone())
        } else if let Some(token) = &self.token {
            Credential::Token(token.clone())
        } else {
            Credential::Pending
        }
    }

    /// Username and password, when both are configured.
    pub fn login_credentials(&self) -> Option<(&str, &str)> {
        match (&self.username, &self.password) {
            (Some(u), Some(p)) => Some((u.as_str(), p.as_str())),
            _ => None,
        }
    }

    /// Whether a 401 may be answered by logging in again.
    ///
    /// API keys never expire from the client's point of view, so a
    /// rejected key is final.
    pub fn can_relogin(&self) -> bool {
        self.api_key.is_none() && self.login_credentials().is_some()
    }

    /// The only transition that mutates the session.
    pub fn apply_login_result(&mut self, result: &LoginResult) {
        self.token = Some(result.access_token.clone());
        self.user_id = Some(result.user_id.clone());
    }

    /// Write the session's token and user id back into `config`.
    pub fn export_into(&self, config: &mut ServerConfig) {
        config.access_token = self.token.clone();
        config.user_id = self.user_id.clone();
    }
}
