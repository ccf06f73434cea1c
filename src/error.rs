//! Error types for the Quarters SDK

use thiserror::Error;

/// Main error type for the Quarters SDK
#[derive(Error, Debug)]
pub enum QuartersError {
    /// A required application credential was missing or empty
    #[error("{field} is required.")]
    MissingCredential {
        /// Name of the missing option (`app_id` or `app_secret`)
        field: &'static str,
    },

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Operation attempted in a state that cannot satisfy it
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Transfer request rejected before reaching the network
    #[error("Invalid transfer request: {0}")]
    InvalidTransfer(String),

    /// Token endpoint rejected an exchange
    #[error("Token exchange failed (status {status}): {message}")]
    TokenExchange {
        /// HTTP status returned by the token endpoint
        status: u16,
        /// Error description reported by the server
        message: String,
    },

    /// Resource API returned a non-success status
    #[error("API error (status {status}): {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Error message extracted from the body, or the raw body
        message: String,
        /// Parsed JSON body, when the server sent one
        body: Option<serde_json::Value>,
    },

    /// HTTP transport failure
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON decode error
    #[error("JSON decode error: {0}")]
    JsonDecode(#[from] serde_json::Error),

    /// URL could not be parsed or joined
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// The UI environment cannot present the requested channel
    #[error("Unsupported authorization channel: {0}")]
    UnsupportedChannel(String),

    /// The UI environment failed to open a window or frame
    #[error("Environment error: {0}")]
    Environment(String),
}

/// Result type alias for Quarters SDK operations
pub type Result<T> = std::result::Result<T, QuartersError>;

impl QuartersError {
    /// Create a missing credential error
    #[must_use]
    pub fn missing_credential(field: &'static str) -> Self {
        Self::MissingCredential { field }
    }

    /// Create an invalid configuration error
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Create an invalid state error
    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }

    /// Create an invalid transfer error
    pub fn invalid_transfer(msg: impl Into<String>) -> Self {
        Self::InvalidTransfer(msg.into())
    }

    /// Create a token exchange error
    pub fn token_exchange(status: u16, msg: impl Into<String>) -> Self {
        Self::TokenExchange {
            status,
            message: msg.into(),
        }
    }

    /// Create an API error
    pub fn api(status: u16, msg: impl Into<String>, body: Option<serde_json::Value>) -> Self {
        Self::Api {
            status,
            message: msg.into(),
            body,
        }
    }

    /// Create an unsupported channel error
    pub fn unsupported_channel(msg: impl Into<String>) -> Self {
        Self::UnsupportedChannel(msg.into())
    }

    /// Create an environment error
    pub fn environment(msg: impl Into<String>) -> Self {
        Self::Environment(msg.into())
    }

    /// HTTP status carried by the error, if it came from a server response
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } | Self::TokenExchange { status, .. } => Some(*status),
            Self::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
