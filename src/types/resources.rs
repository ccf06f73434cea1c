//! Resource API payloads: profile, accounts, balances and transfer requests

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use typed_builder::TypedBuilder;

use super::identifiers::RequestId;
use crate::error::{QuartersError, Result};
use crate::utils::parse_leading_int;

/// Profile of the authenticated user (`GET /me`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    /// User id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    /// Display name
    #[serde(
        default,
        rename = "displayName",
        skip_serializing_if = "Option::is_none"
    )]
    pub display_name: Option<String>,
    /// Email address
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Remaining fields as returned by the API
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Quarters account (`GET /accounts` entry)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    /// Account address, used to look up the balance
    pub address: String,
    /// Remaining fields as returned by the API
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Account balance (`GET /accounts/{address}/balance`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Balance {
    /// Balance amount; the API may encode it as a number or a string
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub balance: Option<Value>,
    /// Remaining fields as returned by the API
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Amount of tokens for a transfer request
///
/// Text amounts are coerced to an integer when the request is sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenAmount {
    /// Integer amount
    Count(i64),
    /// Textual amount, e.g. from a form field
    Text(String),
}

impl TokenAmount {
    /// Coerce to the integer sent on the wire
    ///
    /// # Errors
    ///
    /// Returns [`QuartersError::InvalidTransfer`] if the text has no leading integer.
    pub fn to_count(&self) -> Result<i64> {
        match self {
            Self::Count(n) => Ok(*n),
            Self::Text(s) => parse_leading_int(s).ok_or_else(|| {
                QuartersError::invalid_transfer(format!("tokens must be an integer, got '{s}'"))
            }),
        }
    }
}

impl From<i64> for TokenAmount {
    fn from(n: i64) -> Self {
        Self::Count(n)
    }
}

impl From<i32> for TokenAmount {
    fn from(n: i32) -> Self {
        Self::Count(i64::from(n))
    }
}

impl From<u32> for TokenAmount {
    fn from(n: u32) -> Self {
        Self::Count(i64::from(n))
    }
}

impl From<String> for TokenAmount {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<&str> for TokenAmount {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

/// Transfer request input for [`crate::Quarters::request_transfer`]
#[derive(Debug, Clone, Default, TypedBuilder)]
#[builder(
    builder_method(doc = "Create a new builder for TransferRequest"),
    builder_type(doc = "Builder for TransferRequest", vis = "pub"),
    build_method(doc = "Build the TransferRequest")
)]
pub struct TransferRequest {
    /// Number of tokens requested (required)
    #[builder(default, setter(strip_option, into))]
    pub tokens: Option<TokenAmount>,

    /// Description shown to the user on the approval page
    #[builder(default, setter(strip_option, into))]
    pub description: Option<String>,
}

impl TransferRequest {
    pub(crate) fn into_payload(self, app_id: &str) -> Result<TransferPayload> {
        let tokens = self
            .tokens
            .as_ref()
            .ok_or_else(|| QuartersError::invalid_transfer("tokens are required"))?
            .to_count()?;

        Ok(TransferPayload {
            tokens,
            description: self.description,
            app_id: app_id.to_string(),
        })
    }
}

/// Wire body of `POST /requests`
#[derive(Debug, Clone, Serialize)]
pub(crate) struct TransferPayload {
    pub tokens: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "appId")]
    pub app_id: String,
}

/// Transfer request created by the API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatedRequest {
    /// Id to pass to [`crate::Quarters::authorize_transfer`]
    pub id: RequestId,
    /// Remaining fields as returned by the API
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_tokens_are_coerced() {
        let payload = TransferRequest::builder()
            .tokens("10")
            .description("Power-up")
            .build()
            .into_payload("app-1")
            .unwrap();

        assert_eq!(
            serde_json::to_value(&payload).unwrap(),
            serde_json::json!({"tokens": 10, "description": "Power-up", "appId": "app-1"})
        );
    }

    #[test]
    fn test_missing_tokens_is_rejected() {
        let err = TransferRequest::default().into_payload("app-1").unwrap_err();
        assert!(matches!(err, QuartersError::InvalidTransfer(_)));
    }

    #[test]
    fn test_non_numeric_tokens_is_rejected() {
        let err = TransferRequest::builder()
            .tokens("lots")
            .build()
            .into_payload("app-1")
            .unwrap_err();
        assert!(matches!(err, QuartersError::InvalidTransfer(_)));
    }

    #[test]
    fn test_description_is_omitted_when_absent() {
        let payload = TransferRequest::builder()
            .tokens(5)
            .build()
            .into_payload("app-1")
            .unwrap();
        let body = serde_json::to_value(&payload).unwrap();
        assert!(body.get("description").is_none());
    }

    #[test]
    fn test_account_keeps_extra_fields() {
        let account: Account =
            serde_json::from_str(r#"{"address":"0xabc","label":"main"}"#).unwrap();
        assert_eq!(account.address, "0xabc");
        assert_eq!(account.extra["label"], "main");
    }
}
