//! `Quarters` client: the SDK entry point
//!
//! Composes the authorization channel, the token manager and the API
//! client behind one object built from the application credentials.
//!
//! # Example: Sign in and read the balance
//!
//! ```no_run
//! use quarters_sdk::{ChannelType, Quarters, QuartersOptions};
//! use quarters_sdk::environment::{MessageBus, SystemBrowser};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let options = QuartersOptions::builder()
//!     .app_id("my-app-id")
//!     .app_secret("my-app-secret")
//!     .build();
//! let environment = Arc::new(SystemBrowser::new("http://localhost:3000/".parse()?));
//! let quarters = Quarters::new(options, environment, MessageBus::new())?;
//!
//! // The redirect comes back to http://localhost:3000/?code=...
//! quarters.authorize(ChannelType::Redirect, false, |_| {})?;
//!
//! quarters.set_auth_code("code-from-redirect").await?;
//! let balance = quarters.get_balance().await?;
//! println!("balance: {:?}", balance.balance);
//! # Ok(())
//! # }
//! ```
//!
//! # Example: Request a transfer
//!
//! ```no_run
//! use quarters_sdk::{ChannelType, Quarters, TransferRequest};
//!
//! # async fn example(quarters: Quarters) -> quarters_sdk::Result<()> {
//! let request = quarters
//!     .request_transfer(
//!         TransferRequest::builder()
//!             .tokens(25)
//!             .description("Extra lives")
//!             .build(),
//!     )
//!     .await?;
//!
//! quarters.authorize_transfer(request.id, ChannelType::Popup, |payload| {
//!     println!("transfer approved: {:?}", payload.as_value());
//! })?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use tokio::sync::OnceCell;

use crate::auth::{
    AuthorizationChannel, AuthorizationPayload, ChannelType, Credential, PendingAuthorization,
    TokenManager, TokenResponse,
};
use crate::environment::{MessageBus, UiEnvironment};
use crate::error::{QuartersError, Result};
use crate::types::{
    Account, Balance, CreatedRequest, QuartersConfig, QuartersOptions, RequestId,
    TransferRequest, UserProfile,
};

/// Client for the Quarters service
pub struct Quarters {
    config: Arc<QuartersConfig>,
    tokens: Arc<TokenManager>,
    channel: AuthorizationChannel,
    account: OnceCell<Account>,
}

impl Quarters {
    /// Create a client
    ///
    /// No network access happens here.
    ///
    /// # Errors
    ///
    /// Returns [`QuartersError::MissingCredential`] if the app id or secret is
    /// empty, [`QuartersError::InvalidConfig`] for malformed endpoint URLs,
    /// or [`QuartersError::Http`] if the HTTP client cannot be built.
    pub fn new(
        options: QuartersOptions,
        environment: Arc<dyn UiEnvironment>,
        bus: MessageBus,
    ) -> Result<Self> {
        let config = Arc::new(QuartersConfig::from_options(options)?);

        let mut http = reqwest::Client::builder();
        if let Some(timeout) = config.timeout() {
            http = http.timeout(timeout);
        }
        let http = http.build()?;

        let channel = AuthorizationChannel::new(environment, bus, config.quarters_origin());
        let tokens = TokenManager::new(Arc::clone(&config), http);

        tracing::debug!(app_id = config.app_id(), api_url = %config.api_url(), "Quarters client created");

        Ok(Self {
            config,
            tokens,
            channel,
            account: OnceCell::new(),
        })
    }

    /// Validated configuration
    #[must_use]
    pub fn config(&self) -> &QuartersConfig {
        &self.config
    }

    /// Bus on which the host delivers authorization messages
    #[must_use]
    pub fn message_bus(&self) -> &MessageBus {
        self.channel.bus()
    }

    /// Snapshot of the current credential
    #[must_use]
    pub fn credential(&self) -> Option<Credential> {
        self.tokens.credential()
    }

    /// Whether API calls carry an access token
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.tokens.client().is_authenticated()
    }

    /// Open the Quarters sign-in page
    ///
    /// `on_success` receives the page's response (with the authorization
    /// `code`) once; pass the code to [`Quarters::set_auth_code`]. There is no
    /// timeout: if the user never answers, the callback never runs.
    ///
    /// # Errors
    ///
    /// Returns an error if the environment cannot present the channel.
    pub fn authorize<F>(
        &self,
        channel: ChannelType,
        force_signup: bool,
        on_success: F,
    ) -> Result<Option<PendingAuthorization>>
    where
        F: FnOnce(AuthorizationPayload) + Send + 'static,
    {
        let url = self.config.authorize_url(force_signup)?;
        self.channel.request_from_quarters(url, channel, on_success)
    }

    /// Open the approval page of a transfer request
    ///
    /// # Errors
    ///
    /// Returns an error if the environment cannot present the channel.
    pub fn authorize_transfer<F>(
        &self,
        request_id: impl Into<RequestId>,
        channel: ChannelType,
        on_success: F,
    ) -> Result<Option<PendingAuthorization>>
    where
        F: FnOnce(AuthorizationPayload) + Send + 'static,
    {
        let url = self.config.transfer_url(&request_id.into())?;
        self.channel.request_from_quarters(url, channel, on_success)
    }

    /// Exchange an authorization code for tokens
    ///
    /// # Errors
    ///
    /// Returns an error if the code is empty or the token endpoint rejects it.
    pub async fn set_auth_code(&self, code: &str) -> Result<TokenResponse> {
        self.tokens.set_auth_code(code).await
    }

    /// Sign in with a refresh token saved from an earlier session
    ///
    /// # Errors
    ///
    /// Returns an error if the token is empty or the token endpoint rejects it.
    pub async fn set_refresh_token(&self, refresh_token: &str) -> Result<TokenResponse> {
        self.tokens.set_refresh_token(refresh_token).await
    }

    /// Get a new access token with the stored refresh token
    ///
    /// # Errors
    ///
    /// Returns [`QuartersError::InvalidState`] if no refresh token is known.
    pub async fn refresh_access_token(&self) -> Result<TokenResponse> {
        self.tokens.refresh_access_token().await
    }

    /// Profile of the signed-in user
    ///
    /// # Errors
    ///
    /// Returns the API or transport error.
    pub async fn me(&self) -> Result<UserProfile> {
        self.tokens.client().get(&["me"]).await
    }

    /// First account of the signed-in user
    ///
    /// Fetched once per client and cached for its lifetime.
    ///
    /// # Errors
    ///
    /// Returns the API error, or [`QuartersError::InvalidState`] if the user
    /// has no account.
    pub async fn get_account(&self) -> Result<Account> {
        self.account
            .get_or_try_init(|| async {
                let accounts: Vec<Account> = self.tokens.client().get(&["accounts"]).await?;
                let account = accounts
                    .into_iter()
                    .next()
                    .ok_or_else(|| QuartersError::invalid_state("user has no Quarters account"))?;
                tracing::debug!(address = %account.address, "Account cached");
                Ok::<_, QuartersError>(account)
            })
            .await
            .cloned()
    }

    /// Balance of the signed-in user's account
    ///
    /// # Errors
    ///
    /// Returns the API or transport error.
    pub async fn get_balance(&self) -> Result<Balance> {
        let account = self.get_account().await?;
        self.tokens
            .client()
            .get(&["accounts", account.address.as_str(), "balance"])
            .await
    }

    /// Create a transfer request for the user to approve
    ///
    /// # Errors
    ///
    /// Returns [`QuartersError::InvalidTransfer`] before any network call if
    /// `tokens` is missing or not an integer; otherwise the API error.
    pub async fn request_transfer(&self, request: TransferRequest) -> Result<CreatedRequest> {
        let payload = request.into_payload(self.config.app_id())?;
        tracing::debug!(tokens = payload.tokens, "Creating transfer request");
        self.tokens.client().post(&["requests"], &payload).await
    }
}

impl std::fmt::Debug for Quarters {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Quarters")
            .field("config", &self.config)
            .field("tokens", &self.tokens)
            .field("account", &self.account.get())
            .finish_non_exhaustive()
    }
}
