//! Credential lifecycle: code and refresh-token exchanges

use std::sync::{Arc, PoisonError, RwLock, Weak};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{QuartersError, Result};
use crate::transport::{ApiClient, TokenRefresher};
use crate::types::QuartersConfig;

/// Response of the token endpoint
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenResponse {
    /// Access token for API calls
    pub access_token: String,

    /// Refresh token for obtaining new access tokens
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,

    /// Token type (usually "Bearer")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,

    /// Lifetime of the access token in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<u64>,

    /// Scopes granted to this token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

#[allow(clippy::missing_fields_in_debug)]
impl std::fmt::Debug for TokenResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenResponse")
            .field("access_token", &"<redacted>")
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "<redacted>"),
            )
            .field("token_type", &self.token_type)
            .field("expires_in", &self.expires_in)
            .field("scope", &self.scope)
            .finish()
    }
}

/// Error response from token endpoint
#[derive(Debug, Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Current access/refresh credential pair
#[derive(Clone, Serialize, Deserialize)]
pub struct Credential {
    /// Access token for API calls
    pub access_token: String,

    /// Refresh token for obtaining new access tokens
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,

    /// Scopes granted to this token
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,

    /// Unix timestamp when the access token expires, if the server said
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<u64>,
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_secs()
}

impl Credential {
    fn new(response: &TokenResponse, refresh_token: Option<String>) -> Self {
        Self {
            access_token: response.access_token.clone(),
            refresh_token,
            scope: response.scope.clone(),
            expires_at: response
                .expires_in
                .map(|seconds| now_secs().saturating_add(seconds)),
        }
    }

    /// Whether the server-reported lifetime has passed
    ///
    /// Informational only; the API client detects expiry from responses.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|expires_at| now_secs() >= expires_at)
    }

    /// Get remaining validity duration, if known
    #[must_use]
    pub fn remaining_validity(&self) -> Option<Duration> {
        self.expires_at.and_then(|expires_at| {
            let now = now_secs();
            (expires_at > now).then(|| Duration::from_secs(expires_at - now))
        })
    }

    /// Value of the `Authorization` header
    #[must_use]
    pub fn authorization_header(&self) -> String {
        format!("Bearer {}", self.access_token)
    }
}

#[allow(clippy::missing_fields_in_debug)]
impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("access_token", &"<redacted>")
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "<redacted>"),
            )
            .field("scope", &self.scope)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

#[derive(Serialize)]
struct TokenRequest<'a> {
    client_id: &'a str,
    client_secret: &'a str,
    grant_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    refresh_token: Option<&'a str>,
}

#[derive(Debug, Clone, Copy)]
enum Grant<'a> {
    AuthorizationCode(&'a str),
    RefreshToken(&'a str),
}

impl Grant<'_> {
    fn grant_type(self) -> &'static str {
        match self {
            Self::AuthorizationCode(_) => "authorization_code",
            Self::RefreshToken(_) => "refresh_token",
        }
    }
}

struct TokenState {
    credential: Option<Credential>,
    refresh_token: Option<String>,
    client: Arc<ApiClient>,
}

/// Owner of the credential pair and of the active [`ApiClient`]
///
/// Every successful exchange replaces the client slot with a new client
/// carrying the new access token.
pub struct TokenManager {
    config: Arc<QuartersConfig>,
    http: reqwest::Client,
    state: RwLock<TokenState>,
    weak_self: Weak<TokenManager>,
}

impl TokenManager {
    /// Create a manager with no credential and an unauthenticated client
    #[must_use]
    pub fn new(config: Arc<QuartersConfig>, http: reqwest::Client) -> Arc<Self> {
        Arc::new_cyclic(|weak_self| {
            let client = ApiClient::new(http.clone(), config.api_url().clone());
            Self {
                config,
                http,
                state: RwLock::new(TokenState {
                    credential: None,
                    refresh_token: None,
                    client: Arc::new(client),
                }),
                weak_self: weak_self.clone(),
            }
        })
    }

    /// Client for the next request
    #[must_use]
    pub fn client(&self) -> Arc<ApiClient> {
        Arc::clone(&self.read().client)
    }

    /// Snapshot of the current credential
    #[must_use]
    pub fn credential(&self) -> Option<Credential> {
        self.read().credential.clone()
    }

    /// Stored refresh token
    #[must_use]
    pub fn refresh_token(&self) -> Option<String> {
        self.read().refresh_token.clone()
    }

    /// Exchange an authorization code for tokens
    ///
    /// # Errors
    ///
    /// Returns an error if the code is empty or the exchange fails.
    pub async fn set_auth_code(&self, code: &str) -> Result<TokenResponse> {
        let code = code.trim();
        if code.is_empty() {
            return Err(QuartersError::invalid_state("authorization code is required"));
        }

        let response = self.exchange(Grant::AuthorizationCode(code)).await?;
        {
            let mut state = self.write();
            if let Some(refresh_token) = &response.refresh_token {
                state.refresh_token = Some(refresh_token.clone());
            }
            self.install(&mut state, &response);
        }
        tracing::debug!("Authorization code exchanged for access token");
        Ok(response)
    }

    /// Store a refresh token and exchange it for an access token
    ///
    /// # Errors
    ///
    /// Returns an error if the token is empty or the exchange fails.
    pub async fn set_refresh_token(&self, refresh_token: &str) -> Result<TokenResponse> {
        let refresh_token = refresh_token.trim();
        if refresh_token.is_empty() {
            return Err(QuartersError::invalid_state("refresh token is required"));
        }
        self.write().refresh_token = Some(refresh_token.to_string());
        self.refresh_access_token().await
    }

    /// Exchange the stored refresh token for a new access token
    ///
    /// The stored refresh token is kept as is, even if the server returns a
    /// new one.
    ///
    /// # Errors
    ///
    /// Returns [`QuartersError::InvalidState`] if no refresh token is stored,
    /// or the exchange error.
    pub async fn refresh_access_token(&self) -> Result<TokenResponse> {
        let refresh_token = self.refresh_token().ok_or_else(|| {
            QuartersError::invalid_state(
                "refresh token is not set; call set_auth_code or set_refresh_token first",
            )
        })?;

        let response = self.exchange(Grant::RefreshToken(&refresh_token)).await?;
        {
            let mut state = self.write();
            self.install(&mut state, &response);
        }
        tracing::debug!("Access token refreshed");
        Ok(response)
    }

    fn install(&self, state: &mut TokenState, response: &TokenResponse) {
        let refresher: Weak<dyn TokenRefresher> = self.weak_self.clone();
        state.credential = Some(Credential::new(response, state.refresh_token.clone()));
        state.client = Arc::new(ApiClient::authenticated(
            self.http.clone(),
            self.config.api_url().clone(),
            response.access_token.clone(),
            refresher,
        ));
    }

    async fn exchange(&self, grant: Grant<'_>) -> Result<TokenResponse> {
        let (code, refresh_token) = match grant {
            Grant::AuthorizationCode(code) => (Some(code), None),
            Grant::RefreshToken(token) => (None, Some(token)),
        };
        let body = TokenRequest {
            client_id: self.config.app_id(),
            client_secret: self.config.app_secret(),
            grant_type: grant.grant_type(),
            code,
            refresh_token,
        };

        let url = self.config.token_url()?;
        tracing::debug!(grant_type = grant.grant_type(), %url, "Requesting token");

        let response = self.http.post(url).json(&body).send().await?;
        let status = response.status();
        let response_text = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorResponse>(&response_text)
                .ok()
                .and_then(|e| e.error_description.or(e.message).or(e.error))
                .unwrap_or_else(|| {
                    status
                        .canonical_reason()
                        .unwrap_or("token request failed")
                        .to_string()
                });
            tracing::warn!(status = status.as_u16(), "Token exchange rejected: {message}");
            return Err(QuartersError::token_exchange(status.as_u16(), message));
        }

        Ok(serde_json::from_str(&response_text)?)
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, TokenState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, TokenState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl TokenRefresher for TokenManager {
    async fn refresh(&self) -> Result<String> {
        Ok(self.refresh_access_token().await?.access_token)
    }
}

impl std::fmt::Debug for TokenManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.read();
        f.debug_struct("TokenManager")
            .field("credential", &state.credential)
            .field("has_refresh_token", &state.refresh_token.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::QuartersOptions;

    fn manager() -> Arc<TokenManager> {
        let options = QuartersOptions::builder()
            .app_id("app")
            .app_secret("secret")
            .api_url("http://127.0.0.1:9/")
            .build();
        let config = Arc::new(QuartersConfig::from_options(options).unwrap());
        TokenManager::new(config, reqwest::Client::new())
    }

    #[tokio::test]
    async fn test_refresh_without_token_is_invalid_state() {
        let manager = manager();
        let err = manager.refresh_access_token().await.unwrap_err();
        assert!(matches!(err, QuartersError::InvalidState(_)));
        assert!(!manager.client().is_authenticated());
    }

    #[tokio::test]
    async fn test_empty_auth_code_is_rejected() {
        let err = manager().set_auth_code("  ").await.unwrap_err();
        assert!(matches!(err, QuartersError::InvalidState(_)));
    }

    #[test]
    fn test_credential_expiry() {
        let response = TokenResponse {
            access_token: "access123".to_string(),
            refresh_token: None,
            token_type: Some("Bearer".to_string()),
            expires_in: Some(3600),
            scope: None,
        };
        let mut credential = Credential::new(&response, Some("refresh456".to_string()));
        assert!(!credential.is_expired());
        assert!(credential.remaining_validity().is_some());
        assert_eq!(credential.authorization_header(), "Bearer access123");

        credential.expires_at = Some(now_secs() - 100);
        assert!(credential.is_expired());
        assert!(credential.remaining_validity().is_none());
    }

    #[test]
    fn test_huge_expires_in_saturates() {
        let response = TokenResponse {
            access_token: "access123".to_string(),
            refresh_token: None,
            token_type: None,
            expires_in: Some(u64::MAX),
            scope: None,
        };
        let credential = Credential::new(&response, None);
        assert_eq!(credential.expires_at, Some(u64::MAX));
        assert!(!credential.is_expired());
    }

    #[test]
    fn test_token_request_body() {
        let body = TokenRequest {
            client_id: "app",
            client_secret: "secret",
            grant_type: Grant::RefreshToken("r1").grant_type(),
            code: None,
            refresh_token: Some("r1"),
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            serde_json::json!({
                "client_id": "app",
                "client_secret": "secret",
                "grant_type": "refresh_token",
                "refresh_token": "r1"
            })
        );
    }

    #[test]
    fn test_debug_redacts_tokens() {
        let response = TokenResponse {
            access_token: "access123".to_string(),
            refresh_token: Some("refresh456".to_string()),
            token_type: None,
            expires_in: None,
            scope: None,
        };
        let credential = Credential::new(&response, response.refresh_token.clone());
        let rendered = format!("{response:?} {credential:?}");
        assert!(!rendered.contains("access123"));
        assert!(!rendered.contains("refresh456"));
    }
}
