//! HTTP client bound to the Quarters API base URL

use std::sync::{Arc, Weak};

use reqwest::header::ACCEPT;
use reqwest::{Method, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use url::Url;

use super::{TokenRefresher, is_token_expired};
use crate::error::{QuartersError, Result};
use crate::utils::truncate_for_display;

const MAX_ERROR_BODY_BYTES: usize = 512;

/// Client for the resource API
///
/// The bearer token is fixed at construction; a credential rotation builds
/// a new client instead of mutating this one, so requests already in flight
/// keep the token they started with.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
    access_token: Option<String>,
    refresher: Option<Weak<dyn TokenRefresher>>,
}

impl ApiClient {
    /// Create a client that sends requests without credentials
    #[must_use]
    pub fn new(http: reqwest::Client, base_url: Url) -> Self {
        Self {
            http,
            base_url,
            access_token: None,
            refresher: None,
        }
    }

    /// Create a client that sends `Authorization: Bearer <access_token>`
    /// and refreshes through `refresher` when the token expires
    #[must_use]
    pub fn authenticated(
        http: reqwest::Client,
        base_url: Url,
        access_token: impl Into<String>,
        refresher: Weak<dyn TokenRefresher>,
    ) -> Self {
        Self {
            http,
            base_url,
            access_token: Some(access_token.into()),
            refresher: Some(refresher),
        }
    }

    /// Whether requests carry a bearer token
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.access_token.is_some()
    }

    /// API base URL
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Build an endpoint URL from path segments, percent-encoding each one
    ///
    /// # Errors
    /// Returns error if the base URL cannot carry a path
    pub fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| QuartersError::invalid_config("api_url cannot be a base URL"))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// `GET` an endpoint and decode its JSON body
    ///
    /// # Errors
    /// Returns [`QuartersError::Api`] for non-success statuses and
    /// [`QuartersError::Http`] for transport failures
    pub async fn get<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T> {
        self.execute(Method::GET, segments, None).await
    }

    /// `POST` a JSON body to an endpoint and decode the JSON response
    ///
    /// # Errors
    /// Returns [`QuartersError::Api`] for non-success statuses and
    /// [`QuartersError::Http`] for transport failures
    pub async fn post<B, T>(&self, segments: &[&str], body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let body = serde_json::to_value(body)?;
        self.execute(Method::POST, segments, Some(body)).await
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        method: Method,
        segments: &[&str],
        body: Option<Value>,
    ) -> Result<T> {
        let url = self.endpoint(segments)?;
        let mut token = self.access_token.clone();
        let mut retried = false;

        loop {
            let response = self
                .send(method.clone(), &url, body.as_ref(), token.as_deref())
                .await?;
            let status = response.status();
            let text = response.text().await?;

            if status.is_success() {
                return decode(&text);
            }

            let parsed = serde_json::from_str::<Value>(&text).ok();
            let expired =
                status == StatusCode::UNAUTHORIZED && parsed.as_ref().is_some_and(is_token_expired);

            let refresher = match &self.refresher {
                Some(refresher) if expired && !retried => refresher,
                _ => return Err(api_error(status, &text, parsed)),
            };
            let refresher: Arc<dyn TokenRefresher> = refresher.upgrade().ok_or_else(|| {
                QuartersError::invalid_state(
                    "token manager was dropped before the access token could be refreshed",
                )
            })?;

            tracing::debug!(%method, %url, "Access token expired, refreshing before retry");
            retried = true;
            token = Some(refresher.refresh().await?);
        }
    }

    async fn send(
        &self,
        method: Method,
        url: &Url,
        body: Option<&Value>,
        token: Option<&str>,
    ) -> Result<reqwest::Response> {
        let mut request = self
            .http
            .request(method, url.clone())
            .header(ACCEPT, "application/json");
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }
        Ok(request.send().await?)
    }
}

fn decode<T: DeserializeOwned>(text: &str) -> Result<T> {
    if text.trim().is_empty() {
        return Ok(serde_json::from_value(Value::Null)?);
    }
    Ok(serde_json::from_str(text)?)
}

fn api_error(status: StatusCode, text: &str, body: Option<Value>) -> QuartersError {
    let message = body
        .as_ref()
        .and_then(|b| {
            ["message", "error_description", "error"]
                .iter()
                .find_map(|key| b.get(*key).and_then(Value::as_str))
        })
        .map(str::to_string)
        .unwrap_or_else(|| {
            if text.trim().is_empty() {
                status.canonical_reason().unwrap_or("request failed").to_string()
            } else {
                truncate_for_display(text, MAX_ERROR_BODY_BYTES)
            }
        });

    QuartersError::api(status.as_u16(), message, body)
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url.as_str())
            .field("authenticated", &self.is_authenticated())
            .finish()
    }
}
