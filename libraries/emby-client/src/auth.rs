//! Authentication against the Emby `Users/AuthenticateByName` endpoint.

use crate::error::{EmbyClientError, Result};
use crate::types::{AuthenticateResponse, LoginRequest, LoginResult};
use reqwest::Client;
use tracing::{debug, info, warn};

/// Header carrying the client identification on login.
pub const AUTHORIZATION_HEADER: &str = "X-Emby-Authorization";

/// Client name reported to the server.
pub const CLIENT_NAME: &str = "EmbyBridge";

/// Device name reported to the server.
pub const DEVICE_NAME: &str = "Web";

/// How this client identifies itself to the server.
#[derive(Debug, Clone)]
pub struct ClientIdentity {
    pub client: String,
    pub device: String,
    pub device_id: String,
    pub version: String,
}

impl ClientIdentity {
    pub fn new(device_id: impl Into<String>) -> Self {
        Self {
            client: CLIENT_NAME.to_string(),
            device: DEVICE_NAME.to_string(),
            device_id: device_id.into(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// Value of the `X-Emby-Authorization` header.
    pub fn authorization(&self) -> String {
        format!(
            r#"MediaBrowser Client="{}", Device="{}", DeviceId="{}", Version="{}""#,
            self.client, self.device, self.device_id, self.version
        )
    }
}

/// Authentication client for an Emby server.
pub struct AuthClient<'a> {
    http: &'a Client,
    endpoint: &'a str,
    identity: &'a ClientIdentity,
}

impl<'a> AuthClient<'a> {
    /// Borrow an HTTP client, a normalized endpoint (`.../emby`) and the
    /// identity sent in the authorization header.
    pub fn new(http: &'a Client, endpoint: &'a str, identity: &'a ClientIdentity) -> Self {
        Self {
            http,
            endpoint,
            identity,
        }
    }

    /// Exchange username and password for an access token.
    ///
    /// Does not touch any session state; the caller applies the result.
    pub async fn login(&self, username: &str, password: &str) -> Result<LoginResult> {
        let url = format!("{}/Users/AuthenticateByName", self.endpoint);
        debug!(url = %url, username = %username, "Attempting login");

        let response = self
            .http
            .post(&url)
            .header(AUTHORIZATION_HEADER, self.identity.authorization())
            .form(&LoginRequest {
                username,
                pw: password,
            })
            .send()
            .await
            .map_err(EmbyClientError::transport)?;

        let status = response.status();

        if status.is_success() {
            let body: AuthenticateResponse = response.json().await.map_err(|e| {
                EmbyClientError::ParseError(format!(
                    "Failed to parse login response: {}",
                    e.without_url()
                ))
            })?;
            let result = LoginResult::from(body);

            info!(user_id = %result.user_id, "Login successful");
            Ok(result)
        } else {
            let error_text = response.text().await.unwrap_or_default();
            warn!(status = %status, error = %error_text, "Login rejected");
            Err(EmbyClientError::Authentication {
                status: status.as_u16(),
                message: error_text,
            })
        }
    }
}
