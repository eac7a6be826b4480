//! Emby Client
//!
//! Credential-aware HTTP client for the Emby media server API.
//!
//! # Features
//!
//! - **Authentication**: API key, cached token, or username/password login
//! - **Session recovery**: one re-login and retry when a token expires
//! - **Browsing**: libraries, items, seasons, episodes
//! - **Resource URLs**: image, stream and subtitle URLs for players
//!
//! # Example
//!
//! ```ignore
//! use emby_client::{EmbyClient, ImageType, ItemQuery, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ServerConfig::new("http://media.local:8096")
//!         .with_credentials("alice", "secret");
//!     let client = EmbyClient::new(config)?;
//!
//!     if !client.check_connectivity().await {
//!         eprintln!("Server unreachable");
//!         return Ok(());
//!     }
//!
//!     let libraries = client.list_libraries().await?;
//!     let items = client
//!         .list_items(&ItemQuery::new().parent(&libraries[0].id))
//!         .await?;
//!
//!     let urls = client.resource_urls().await;
//!     println!("{}", urls.image(&items[0].id, ImageType::Primary, Some(300)));
//!
//!     Ok(())
//! }
//! ```

mod auth;
mod client;
mod error;
mod session;
mod types;
mod urls;

// Re-export main types
pub use client::{EmbyClient, API_KEY_PARAM, TOKEN_HEADER};
pub use error::{EmbyClientError, Result};
pub use session::{normalize_endpoint, Credential, Session, API_ROOT};
pub use types::{
    BaseItem, ImageType, ItemQuery, LoginResult, MediaSource, MediaStream, PublicSystemInfo,
    ServerConfig, SubtitleTrack,
};
pub use urls::ResourceUrls;

// Stateless login, for callers that manage their own session
pub use auth::{AuthClient, ClientIdentity, AUTHORIZATION_HEADER, CLIENT_NAME, DEVICE_NAME};
