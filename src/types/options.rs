//! SDK configuration: the options bag and its validated form

use std::time::Duration;
use typed_builder::TypedBuilder;
use url::Url;

use super::identifiers::RequestId;
use crate::error::{QuartersError, Result};

/// Production Quarters site (authorization pages and message origin)
pub const DEFAULT_QUARTERS_URL: &str = "https://pocketfulofquarters.com";

/// Production Quarters resource API
pub const DEFAULT_API_URL: &str = "https://api.pocketfulofquarters.com/v1/";

const ENV_APP_ID: &str = "QUARTERS_APP_ID";
const ENV_APP_SECRET: &str = "QUARTERS_APP_SECRET";
const ENV_QUARTERS_URL: &str = "QUARTERS_URL";
const ENV_OAUTH_URL: &str = "QUARTERS_OAUTH_URL";
const ENV_API_URL: &str = "QUARTERS_API_URL";

// ============================================================================
// Quarters Options
// ============================================================================

/// Options used to construct a [`crate::Quarters`] client
///
/// Every endpoint is optional and falls back to the production service.
/// Validation happens once, in [`QuartersConfig::from_options`].
#[derive(Clone, Default, TypedBuilder)]
#[builder(
    builder_method(doc = "Create a new builder for QuartersOptions"),
    builder_type(doc = "Builder for QuartersOptions", vis = "pub"),
    build_method(doc = "Build the QuartersOptions")
)]
pub struct QuartersOptions {
    /// Application id (also called the app key); sent as `client_id`
    #[builder(default, setter(into))]
    pub app_id: String,

    /// Application secret; sent as `client_secret`
    #[builder(default, setter(into))]
    pub app_secret: String,

    /// Quarters site URL; also the only origin accepted for authorization messages
    #[builder(default, setter(strip_option, into))]
    pub quarters_url: Option<String>,

    /// Base URL of the authorization pages (defaults to `quarters_url`)
    #[builder(default, setter(strip_option, into))]
    pub oauth_url: Option<String>,

    /// Base URL of the resource API and token endpoint
    #[builder(default, setter(strip_option, into))]
    pub api_url: Option<String>,

    /// Overall timeout applied to every HTTP request
    #[builder(default, setter(strip_option))]
    pub timeout: Option<Duration>,
}

impl QuartersOptions {
    /// Read options from `QUARTERS_*` environment variables
    ///
    /// Unset or blank variables leave the corresponding option at its default.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            app_id: env_var(ENV_APP_ID).unwrap_or_default(),
            app_secret: env_var(ENV_APP_SECRET).unwrap_or_default(),
            quarters_url: env_var(ENV_QUARTERS_URL),
            oauth_url: env_var(ENV_OAUTH_URL),
            api_url: env_var(ENV_API_URL),
            timeout: None,
        }
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

#[allow(clippy::missing_fields_in_debug)]
impl std::fmt::Debug for QuartersOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuartersOptions")
            .field("app_id", &self.app_id)
            .field(
                "app_secret",
                &(!self.app_secret.is_empty()).then_some("<redacted>"),
            )
            .field("quarters_url", &self.quarters_url)
            .field("oauth_url", &self.oauth_url)
            .field("api_url", &self.api_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

// ============================================================================
// Validated Configuration
// ============================================================================

/// Validated, immutable client configuration
#[derive(Clone)]
pub struct QuartersConfig {
    app_id: String,
    app_secret: String,
    quarters_url: Url,
    oauth_url: Url,
    api_url: Url,
    timeout: Option<Duration>,
}

impl QuartersConfig {
    /// Validate options and apply endpoint defaults
    ///
    /// # Errors
    ///
    /// Returns [`QuartersError::MissingCredential`] when the app id or secret
    /// is empty, and [`QuartersError::InvalidConfig`] for malformed URLs.
    pub fn from_options(options: QuartersOptions) -> Result<Self> {
        let app_id = options.app_id.trim();
        if app_id.is_empty() {
            return Err(QuartersError::missing_credential("app_id"));
        }
        if options.app_secret.trim().is_empty() {
            return Err(QuartersError::missing_credential("app_secret"));
        }

        let quarters_url = parse_base_url(
            "quarters_url",
            options.quarters_url.as_deref().unwrap_or(DEFAULT_QUARTERS_URL),
        )?;
        let oauth_url = match options.oauth_url.as_deref() {
            Some(url) => parse_base_url("oauth_url", url)?,
            None => quarters_url.clone(),
        };
        let mut api_url =
            parse_base_url("api_url", options.api_url.as_deref().unwrap_or(DEFAULT_API_URL))?;
        // join() drops the last path segment unless the base ends with '/'
        if !api_url.path().ends_with('/') {
            let path = format!("{}/", api_url.path());
            api_url.set_path(&path);
        }

        Ok(Self {
            app_id: app_id.to_string(),
            app_secret: options.app_secret,
            quarters_url,
            oauth_url,
            api_url,
            timeout: options.timeout,
        })
    }

    /// Application id
    #[must_use]
    pub fn app_id(&self) -> &str {
        &self.app_id
    }

    pub(crate) fn app_secret(&self) -> &str {
        &self.app_secret
    }

    /// Quarters site URL
    #[must_use]
    pub fn quarters_url(&self) -> &Url {
        &self.quarters_url
    }

    /// Authorization pages base URL
    #[must_use]
    pub fn oauth_url(&self) -> &Url {
        &self.oauth_url
    }

    /// Resource API base URL (always ends with `/`)
    #[must_use]
    pub fn api_url(&self) -> &Url {
        &self.api_url
    }

    /// HTTP request timeout, if configured
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Serialized origin that authorization messages must come from
    #[must_use]
    pub fn quarters_origin(&self) -> String {
        self.quarters_url.origin().ascii_serialization()
    }

    /// Token endpoint, `{api_url}oauth/token`
    ///
    /// # Errors
    ///
    /// Returns an error if the path cannot be joined onto the API URL.
    pub fn token_url(&self) -> Result<Url> {
        Ok(self.api_url.join("oauth/token")?)
    }

    /// Authorization page for the code flow
    ///
    /// # Errors
    ///
    /// Returns an error if the OAuth base URL cannot be extended.
    pub fn authorize_url(&self, force_signup: bool) -> Result<Url> {
        let mut url = Url::parse(&format!("{}/oauth/authorize", trimmed(&self.oauth_url)))?;
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("response_type", "code")
                .append_pair("client_id", &self.app_id)
                .append_pair("inline", "true");
            if force_signup {
                query.append_pair("force_signup", "true");
            }
        }
        Ok(url)
    }

    /// Approval page for a previously created transfer request
    ///
    /// # Errors
    ///
    /// Returns an error if the OAuth base URL cannot be extended.
    pub fn transfer_url(&self, request_id: &RequestId) -> Result<Url> {
        let mut url = Url::parse(&format!("{}/requests", trimmed(&self.oauth_url)))?;
        url.path_segments_mut()
            .map_err(|()| QuartersError::invalid_config("oauth_url cannot be a base URL"))?
            .push(request_id.as_str());
        url.query_pairs_mut().append_pair("inline", "true");
        Ok(url)
    }
}

fn trimmed(url: &Url) -> &str {
    url.as_str().trim_end_matches('/')
}

fn parse_base_url(field: &str, raw: &str) -> Result<Url> {
    let url = Url::parse(raw.trim())
        .map_err(|e| QuartersError::invalid_config(format!("{field} '{raw}': {e}")))?;
    if !matches!(url.scheme(), "http" | "https") || url.cannot_be_a_base() {
        return Err(QuartersError::invalid_config(format!(
            "{field} must be an http(s) URL, got '{raw}'"
        )));
    }
    Ok(url)
}

#[allow(clippy::missing_fields_in_debug)]
impl std::fmt::Debug for QuartersConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuartersConfig")
            .field("app_id", &self.app_id)
            .field("app_secret", &"<redacted>")
            .field("quarters_url", &self.quarters_url.as_str())
            .field("oauth_url", &self.oauth_url.as_str())
            .field("api_url", &self.api_url.as_str())
            .field("timeout", &self.timeout)
            .finish()
    }
}
