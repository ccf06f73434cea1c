//! OAuth authorization for Quarters
//!
//! # Overview
//!
//! Signing a user in takes two steps:
//!
//! 1. [`AuthorizationChannel`] presents the Quarters authorization page in a
//!    popup, an embedded frame or a full-page redirect. The page answers
//!    with a JSON message carrying the authorization `code`.
//! 2. [`TokenManager`] exchanges the code (or a stored refresh token) at
//!    `{api_url}oauth/token` and installs a new [`crate::transport::ApiClient`]
//!    carrying the access token.
//!
//! Expired access tokens are refreshed transparently: the API client asks
//! the token manager for a new token once per failing request.
//!
//! # Example
//!
//! ```no_run
//! use quarters_sdk::auth::{AuthorizationChannel, ChannelType};
//! use quarters_sdk::environment::{MessageBus, SystemBrowser};
//! use std::sync::Arc;
//!
//! # fn example() -> quarters_sdk::Result<()> {
//! let environment = Arc::new(SystemBrowser::new("http://localhost:3000/".parse()?));
//! let channel = AuthorizationChannel::new(
//!     environment,
//!     MessageBus::new(),
//!     "https://pocketfulofquarters.com",
//! );
//!
//! let url = "https://pocketfulofquarters.com/oauth/authorize?response_type=code".parse()?;
//! channel.request_from_quarters(url, ChannelType::Popup, |payload| {
//!     println!("code: {:?}", payload.code());
//! })?;
//! # Ok(())
//! # }
//! ```

mod channel;
mod token;

pub use channel::{
    AuthorizationChannel, AuthorizationPayload, ChannelType, FRAME_ID_PREFIX, POPUP_HEIGHT,
    POPUP_WIDTH, POPUP_WINDOW_NAME, PendingAuthorization,
};
pub use token::{Credential, TokenManager, TokenResponse};
