//! Transport layer for the Quarters resource API
//!
//! [`ApiClient`] binds a `reqwest` client to the API base URL and, once a
//! user has signed in, to a bearer token. Authenticated clients carry an
//! expiry interceptor: a 401 whose body reports an expired token triggers a
//! single refresh through the [`TokenRefresher`] and one retry of the
//! original request.

pub mod http;

use async_trait::async_trait;

use crate::error::Result;

/// Body error codes that mean the access token has expired
pub const TOKEN_EXPIRED_CODE: &str = "token_expired";

/// Body message that means the access token has expired
pub const TOKEN_EXPIRED_MESSAGE: &str = "token expired";

/// Source of fresh access tokens for the expiry interceptor
#[async_trait]
pub trait TokenRefresher: Send + Sync {
    /// Obtain a new access token
    ///
    /// # Errors
    /// Returns error if the refresh exchange fails or no refresh token is known
    async fn refresh(&self) -> Result<String>;
}

/// Whether an error body reports an expired access token
///
/// Matches `code` or `error` equal to `token_expired`, or `message` equal to
/// `Token expired`, ignoring case.
#[must_use]
pub fn is_token_expired(body: &serde_json::Value) -> bool {
    let field = |name: &str| body.get(name).and_then(serde_json::Value::as_str);

    ["code", "error"]
        .iter()
        .filter_map(|name| field(name))
        .any(|code| code.eq_ignore_ascii_case(TOKEN_EXPIRED_CODE))
        || field("message").is_some_and(|msg| msg.trim().eq_ignore_ascii_case(TOKEN_EXPIRED_MESSAGE))
}

pub use http::ApiClient;
