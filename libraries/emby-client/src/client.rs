//! Main Emby client: session handling and the authenticated request path.

use crate::auth::{AuthClient, ClientIdentity};
use crate::error::{EmbyClientError, Result};
use crate::session::{Credential, Session};
use crate::types::{
    BaseItem, ItemQuery, ItemsResponse, LoginResult, PublicSystemInfo, ServerConfig,
};
use crate::urls::ResourceUrls;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, warn};
use uuid::Uuid;

/// Header carrying the credential on data requests.
pub const TOKEN_HEADER: &str = "X-Emby-Token";

/// Query parameter used by the legacy credential form.
pub const API_KEY_PARAM: &str = "api_key";

/// Credential snapshot captured when a request is built.
#[derive(Debug, Clone)]
struct RequestContext {
    endpoint: String,
    token: String,
    user_id: String,
    can_relogin: bool,
}

/// Client for an Emby server.
///
/// Holds one session for its whole lifetime. Credentials are resolved
/// lazily: an API key is used as is, a cached token is trusted until the
/// server answers 401, and username/password are exchanged for a token on
/// first use.
///
/// # Example
///
/// ```ignore
/// use emby_client::{EmbyClient, ItemQuery, ServerConfig};
///
/// let config = ServerConfig::new("http://media.local:8096")
///     .with_credentials("alice", "secret");
/// let client = EmbyClient::new(config)?;
///
/// // Logs in on first use
/// let movies = client
///     .list_items(&ItemQuery::new().types("Movie").recursive(true))
///     .await?;
///
/// // Persist the obtained token for next time
/// let updated = client.to_config().await;
/// ```
pub struct EmbyClient {
    http: Client,
    config: ServerConfig,
    identity: ClientIdentity,
    session: RwLock<Session>,
    /// Serializes logins so concurrent callers share one.
    login_gate: Mutex<()>,
}

impl EmbyClient {
    /// Create a new client with the given configuration.
    pub fn new(config: ServerConfig) -> Result<Self> {
        let url = config.url.trim();
        if url.is_empty() {
            return Err(EmbyClientError::configuration("server URL is required"));
        }
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(EmbyClientError::configuration(
                "server URL must start with http:// or https://",
            ));
        }

        let device_id = config
            .device_id
            .clone()
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(format!("EmbyBridge/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(EmbyClientError::Request)?;

        let session = Session::from_config(&config);
        debug!(endpoint = %session.endpoint(), "Created Emby client");

        Ok(Self {
            http,
            config,
            identity: ClientIdentity::new(device_id),
            session: RwLock::new(session),
            login_gate: Mutex::new(()),
        })
    }

    /// The normalized API endpoint.
    pub async fn endpoint(&self) -> String {
        self.session.read().await.endpoint().to_string()
    }

    /// Whether a credential (API key or token) is currently available.
    pub async fn is_authenticated(&self) -> bool {
        !matches!(self.session.read().await.credential(), Credential::Pending)
    }

    pub async fn user_id(&self) -> Option<String> {
        self.session.read().await.user_id().map(str::to_string)
    }

    /// The configuration this client was built from, updated with the
    /// current token, user id and device id. Persisting it is up to the
    /// caller.
    pub async fn to_config(&self) -> ServerConfig {
        let mut config = self.config.clone();
        self.session.read().await.export_into(&mut config);
        config.device_id = Some(self.identity.device_id.clone());
        config
    }

    /// Snapshot for building image, stream and subtitle URLs.
    pub async fn resource_urls(&self) -> ResourceUrls {
        let session = self.session.read().await;
        ResourceUrls::new(
            session.endpoint(),
            session.credential().value().map(str::to_string),
        )
    }

    // =========================================================================
    // Authentication
    // =========================================================================

    /// Login with username and password.
    ///
    /// On success the token and user id are stored in the session. A
    /// rejected login leaves the session untouched.
    pub async fn login(&self, username: &str, password: &str) -> Result<LoginResult> {
        let endpoint = self.endpoint().await;
        let result = AuthClient::new(&self.http, &endpoint, &self.identity)
            .login(username, password)
            .await?;

        self.session.write().await.apply_login_result(&result);
        Ok(result)
    }

    /// Make sure the session holds a usable credential, logging in if
    /// only username and password are configured.
    pub async fn ensure_authenticated(&self) -> Result<()> {
        let credential = self.session.read().await.credential();
        if !matches!(credential, Credential::Pending) {
            return Ok(());
        }

        let _gate = self.login_gate.lock().await;

        // Another caller may have logged in while we waited.
        let credentials = {
            let session = self.session.read().await;
            if !matches!(session.credential(), Credential::Pending) {
                return Ok(());
            }
            session
                .login_credentials()
                .map(|(u, p)| (u.to_string(), p.to_string()))
        };

        let Some((username, password)) = credentials else {
            return Err(EmbyClientError::configuration(
                "no usable credential: configure an API key or username and password",
            ));
        };

        self.login(&username, &password).await?;
        Ok(())
    }

    /// Log in again after `rejected` was refused by the server.
    ///
    /// If another caller already replaced the rejected token, its token is
    /// reused instead of logging in a second time.
    async fn reauthenticate(&self, rejected: &str) -> Result<RequestContext> {
        let _gate = self.login_gate.lock().await;

        let credentials = {
            let session = self.session.read().await;
            match session.credential() {
                Credential::Token(current) if current != rejected => None,
                _ => session
                    .login_credentials()
                    .map(|(u, p)| (u.to_string(), p.to_string())),
            }
        };

        if let Some((username, password)) = credentials {
            self.login(&username, &password).await?;
        }

        self.request_context().await
    }

    // =========================================================================
    // Request execution
    // =========================================================================

    async fn request_context(&self) -> Result<RequestContext> {
        let session = self.session.read().await;

        let token = session
            .credential()
            .value()
            .map(str::to_string)
            .ok_or_else(|| EmbyClientError::configuration("no usable credential"))?;
        let user_id = session
            .user_id()
            .map(str::to_string)
            .ok_or_else(|| {
                EmbyClientError::configuration("user id is unknown; log in or configure user_id")
            })?;

        Ok(RequestContext {
            endpoint: session.endpoint().to_string(),
            token,
            user_id,
            can_relogin: session.can_relogin(),
        })
    }

    async fn send<F>(&self, build: &F, context: &RequestContext) -> Result<Response>
    where
        F: Fn(&Client, &RequestContext) -> RequestBuilder,
    {
        build(&self.http, context)
            .header(TOKEN_HEADER, &context.token)
            .send()
            .await
            .map_err(EmbyClientError::transport)
    }

    /// Run a user-scoped request with the single-shot re-authentication
    /// protocol: one retry after a 401, never more.
    async fn execute<F>(&self, operation: &'static str, build: F) -> Result<Response>
    where
        F: Fn(&Client, &RequestContext) -> RequestBuilder,
    {
        self.ensure_authenticated().await?;
        let context = self.request_context().await?;

        let mut response = self.send(&build, &context).await?;

        if response.status() == StatusCode::UNAUTHORIZED && context.can_relogin {
            warn!(operation = %operation, "Session expired, re-authenticating once");
            let context = self.reauthenticate(&context.token).await?;
            response = self.send(&build, &context).await?;
        }

        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            let error_text = response.text().await.unwrap_or_default();
            Err(EmbyClientError::RequestFailed {
                operation,
                status: status.as_u16(),
                message: error_text,
            })
        }
    }

    async fn parse<T: DeserializeOwned>(operation: &'static str, response: Response) -> Result<T> {
        response.json().await.map_err(|e| {
            EmbyClientError::ParseError(format!(
                "Failed to parse {} response: {}",
                operation,
                e.without_url()
            ))
        })
    }

    async fn fetch_items<F>(&self, operation: &'static str, build: F) -> Result<Vec<BaseItem>>
    where
        F: Fn(&Client, &RequestContext) -> RequestBuilder,
    {
        let response = self.execute(operation, build).await?;
        let page: ItemsResponse = Self::parse(operation, response).await?;

        debug!(operation = %operation, count = page.items.len(), "Fetched items");
        Ok(page.items)
    }

    // =========================================================================
    // Data operations
    // =========================================================================

    /// List the user's items matching `query`.
    pub async fn list_items(&self, query: &ItemQuery) -> Result<Vec<BaseItem>> {
        self.fetch_items("List items", |http, ctx| {
            http.get(format!("{}/Users/{}/Items", ctx.endpoint, ctx.user_id))
                .query(query)
                .query(&[(TOKEN_HEADER, ctx.token.as_str())])
        })
        .await
    }

    /// Get a single item with its media sources.
    pub async fn get_item(&self, item_id: &str) -> Result<BaseItem> {
        let response = self
            .execute("Get item", |http, ctx| {
                http.get(format!(
                    "{}/Users/{}/Items/{}",
                    ctx.endpoint, ctx.user_id, item_id
                ))
                .query(&[(API_KEY_PARAM, ctx.token.as_str())])
            })
            .await?;

        Self::parse("Get item", response).await
    }

    /// List the seasons of a series.
    pub async fn list_seasons(&self, series_id: &str) -> Result<Vec<BaseItem>> {
        self.fetch_items("List seasons", |http, ctx| {
            http.get(format!("{}/Shows/{}/Seasons", ctx.endpoint, series_id))
                .query(&[
                    ("UserId", ctx.user_id.as_str()),
                    (API_KEY_PARAM, ctx.token.as_str()),
                ])
        })
        .await
    }

    /// List the episodes of a series, optionally restricted to one season.
    pub async fn list_episodes(
        &self,
        series_id: &str,
        season_id: Option<&str>,
    ) -> Result<Vec<BaseItem>> {
        self.fetch_items("List episodes", |http, ctx| {
            let mut params = vec![("UserId", ctx.user_id.as_str())];
            if let Some(season) = season_id {
                params.push(("SeasonId", season));
            }
            params.push((API_KEY_PARAM, ctx.token.as_str()));

            http.get(format!("{}/Shows/{}/Episodes", ctx.endpoint, series_id))
                .query(&params)
        })
        .await
    }

    /// List the user's library views (movies, shows, music...).
    pub async fn list_libraries(&self) -> Result<Vec<BaseItem>> {
        self.fetch_items("List libraries", |http, ctx| {
            http.get(format!("{}/Users/{}/Views", ctx.endpoint, ctx.user_id))
                .query(&[(TOKEN_HEADER, ctx.token.as_str())])
        })
        .await
    }

    // =========================================================================
    // Server status
    // =========================================================================

    async fn public_info_request(&self) -> RequestBuilder {
        let session = self.session.read().await;
        let request = self
            .http
            .get(format!("{}/System/Info/Public", session.endpoint()));

        match session.credential().value() {
            Some(credential) => request.query(&[(API_KEY_PARAM, credential)]),
            None => request,
        }
    }

    /// Best-effort health check.
    ///
    /// Returns whether the server answered with a success status. Every
    /// failure, transport errors included, is reported as `false`.
    pub async fn check_connectivity(&self) -> bool {
        match self.public_info_request().await.send().await {
            Ok(response) => {
                let status = response.status();
                debug!(status = %status, "Connectivity check answered");
                status.is_success()
            }
            Err(e) => {
                debug!(error = %e.without_url(), "Connectivity check failed");
                false
            }
        }
    }

    /// Fetch the server's public system information.
    pub async fn public_system_info(&self) -> Result<PublicSystemInfo> {
        const OPERATION: &str = "Get public system info";

        let response = self
            .public_info_request()
            .await
            .send()
            .await
            .map_err(EmbyClientError::transport)?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(EmbyClientError::RequestFailed {
                operation: OPERATION,
                status: status.as_u16(),
                message: error_text,
            });
        }

        Self::parse(OPERATION, response).await
    }
}
