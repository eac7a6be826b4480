//! Error types for the Emby client.

use thiserror::Error;

/// Errors that can occur when interacting with an Emby server.
#[derive(Error, Debug)]
pub enum EmbyClientError {
    /// HTTP request failed at the transport level
    ///
    /// The request URL is stripped first; it may carry the credential.
    #[error("HTTP request failed: {0}")]
    Request(#[source] reqwest::Error),

    /// A required configuration value is missing or invalid
    ///
    /// Never retried: re-authenticating cannot fix a missing server URL,
    /// credential or user id.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The login endpoint rejected the credentials
    #[error("Authentication failed ({status}): {message}")]
    Authentication { status: u16, message: String },

    /// A data operation failed after at most one re-authentication
    #[error("{operation} failed ({status}): {message}")]
    RequestFailed {
        operation: &'static str,
        status: u16,
        message: String,
    },

    /// Server is offline or unreachable
    #[error("Server unreachable: {0}")]
    ServerUnreachable(String),

    /// Failed to parse server response
    #[error("Failed to parse response: {0}")]
    ParseError(String),
}

impl EmbyClientError {
    pub(crate) fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Map a transport error, singling out connect failures and timeouts.
    ///
    /// Query strings hold `api_key`/`X-Emby-Token`, so the URL never
    /// reaches the message.
    pub(crate) fn transport(e: reqwest::Error) -> Self {
        let e = e.without_url();
        if e.is_connect() || e.is_timeout() {
            Self::ServerUnreachable(e.to_string())
        } else {
            Self::Request(e)
        }
    }

    /// HTTP status carried by the error, if the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Authentication { status, .. } | Self::RequestFailed { status, .. } => {
                Some(*status)
            }
            Self::Request(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// Result type for Emby client operations.
pub type Result<T> = std::result::Result<T, EmbyClientError>;
