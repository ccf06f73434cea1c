//! # Quarters SDK for Rust
//!
//! Client SDK for the [Quarters](https://pocketfulofquarters.com) token
//! service: OAuth sign-in, automatic access-token refresh, account and
//! balance lookup, and token-transfer requests.
//!
//! ## Quick Start
//!
//! ```no_run
//! use quarters_sdk::{ChannelType, Quarters, QuartersOptions};
//! use quarters_sdk::environment::{MessageBus, SystemBrowser};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let options = QuartersOptions::builder()
//!         .app_id("my-app-id")
//!         .app_secret("my-app-secret")
//!         .build();
//!     let environment = Arc::new(SystemBrowser::new("http://localhost:3000/".parse()?));
//!     let quarters = Quarters::new(options, environment, MessageBus::new())?;
//!
//!     quarters.authorize(ChannelType::Redirect, false, |_| {})?;
//!     // ...the user signs in and the redirect delivers ?code=...
//!     quarters.set_auth_code("code").await?;
//!
//!     let me = quarters.me().await?;
//!     println!("Signed in as {:?}", me.display_name);
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - [`auth`]: authorization channel (popup, frame, redirect) and token manager
//! - [`transport`]: API client with the expiry interceptor
//! - [`environment`]: host capabilities and the cross-window message bus
//! - [`client`]: the [`Quarters`] facade
//! - [`types`]: configuration and API payloads
//! - [`error`]: error types and handling
//!
//! ## Authorization Channels
//!
//! In a browser host, [`ChannelType::Frame`] and [`ChannelType::Popup`]
//! deliver the authorization code as a cross-window message. The host
//! forwards `message` events to [`Quarters::message_bus`]; only messages from
//! the configured Quarters origin are accepted, and each request's callback
//! runs at most once. [`ChannelType::Redirect`] navigates away and returns
//! to the current page with `?code=...`.
//!
//! ## Logging
//!
//! This crate uses [`tracing`](https://crates.io/crates/tracing) for structured logging.
//! Tracing events are always emitted but are zero-cost when no subscriber is attached.
//! Tokens and the application secret are never logged.
//!
//! ```rust,ignore
//! tracing_subscriber::fmt::init();
//! ```
//!
//! ## Error Handling
//!
//! All fallible operations return [`Result<T, QuartersError>`](Result):
//!
//! ```no_run
//! # use quarters_sdk::{Quarters, QuartersError};
//! # async fn example(quarters: Quarters) {
//! match quarters.refresh_access_token().await {
//!     Ok(_token) => { /* ... */ }
//!     Err(QuartersError::InvalidState(msg)) => eprintln!("Sign in first: {msg}"),
//!     Err(e) => eprintln!("Error: {e}"),
//! }
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod auth;
pub mod client;
pub mod environment;
pub mod error;
pub mod transport;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use auth::{AuthorizationPayload, ChannelType, Credential, PendingAuthorization, TokenResponse};
pub use client::Quarters;
pub use environment::{MessageBus, MessageEvent, UiEnvironment};
pub use error::{QuartersError, Result};
pub use types::{
    Account, Balance, CreatedRequest, QuartersConfig, QuartersOptions, RequestId, TokenAmount,
    TransferRequest, UserProfile,
};

/// Version of the SDK
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
