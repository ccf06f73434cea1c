//! Authorization channel: popup, embedded frame or full-page redirect
//!
//! The authorization page answers by posting a JSON message to the opener
//! (popup) or parent (frame). Messages are accepted only from the Quarters
//! origin, and the success callback runs at most once per request.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};

use serde_json::Value;
use url::Url;

use crate::environment::{
    ListenerControl, MessageBus, MessageEvent, OverlayFrame, Subscription, UiEnvironment,
    WindowFeatures, WindowHandle,
};
use crate::error::{QuartersError, Result};

/// Popup width in pixels
pub const POPUP_WIDTH: u32 = 850;
/// Popup height in pixels
pub const POPUP_HEIGHT: u32 = 600;
/// Window name shared by all authorization popups
pub const POPUP_WINDOW_NAME: &str = "quarters-oauth";
/// Prefix of generated frame ids
pub const FRAME_ID_PREFIX: &str = "quarters_iframe_";

const FRAME_STYLE: &str = "position:fixed;top:0;left:0;width:100%;height:100%;\
                           border:none;z-index:2147483647;background:transparent;";

/// How the authorization page is presented
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChannelType {
    /// Separate window opened next to the current page
    Popup,
    /// Overlay frame embedded in the current page
    #[default]
    Frame,
    /// Navigate the current page away and come back with `redirect_uri`
    Redirect,
}

impl ChannelType {
    /// Lowercase name
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Popup => "popup",
            Self::Frame => "frame",
            Self::Redirect => "redirect",
        }
    }
}

impl std::fmt::Display for ChannelType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ChannelType {
    type Err = QuartersError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "popup" => Ok(Self::Popup),
            "frame" | "iframe" => Ok(Self::Frame),
            "redirect" => Ok(Self::Redirect),
            other => Err(QuartersError::unsupported_channel(format!(
                "unknown channel type '{other}'"
            ))),
        }
    }
}

/// JSON message delivered by the authorization page
#[derive(Debug, Clone, PartialEq)]
pub struct AuthorizationPayload(Value);

impl AuthorizationPayload {
    /// Authorization code, when the page reports one
    #[must_use]
    pub fn code(&self) -> Option<&str> {
        self.0.get("code").and_then(Value::as_str)
    }

    /// Id of the frame that carried the page, if any
    #[must_use]
    pub fn frame_id(&self) -> Option<&str> {
        self.0.get("frameId").and_then(Value::as_str)
    }

    /// Raw payload
    #[must_use]
    pub fn as_value(&self) -> &Value {
        &self.0
    }

    /// Consume into the raw payload
    #[must_use]
    pub fn into_value(self) -> Value {
        self.0
    }
}

type SuccessCallback = Box<dyn FnOnce(AuthorizationPayload) + Send>;

/// An authorization surface waiting for its response
///
/// Dropping the handle leaves the listener registered; the callback still
/// fires if the response arrives.
pub struct PendingAuthorization {
    channel: ChannelType,
    subscription: Subscription,
    window: Option<Arc<dyn WindowHandle>>,
    frame_id: Option<String>,
    environment: Arc<dyn UiEnvironment>,
}

impl PendingAuthorization {
    /// Channel used for this request
    #[must_use]
    pub fn channel_type(&self) -> ChannelType {
        self.channel
    }

    /// Generated frame id for [`ChannelType::Frame`]
    #[must_use]
    pub fn frame_id(&self) -> Option<&str> {
        self.frame_id.as_deref()
    }

    /// Whether the response is still awaited
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.subscription.is_active()
    }

    /// Stop waiting: close the popup or remove the frame and drop the listener
    ///
    /// Returns `false` if the request had already completed or been cancelled.
    pub fn cancel(&self) -> bool {
        if !self.subscription.cancel() {
            return false;
        }
        if let Some(window) = &self.window {
            window.close();
        }
        if let Some(id) = &self.frame_id {
            self.environment.remove_element(id);
        }
        tracing::debug!(channel = %self.channel, "Authorization request cancelled");
        true
    }
}

impl std::fmt::Debug for PendingAuthorization {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingAuthorization")
            .field("channel", &self.channel)
            .field("subscription", &self.subscription.id())
            .field("frame_id", &self.frame_id)
            .finish_non_exhaustive()
    }
}

/// Presents authorization pages and collects their responses
#[derive(Clone)]
pub struct AuthorizationChannel {
    environment: Arc<dyn UiEnvironment>,
    bus: MessageBus,
    quarters_origin: String,
}

impl AuthorizationChannel {
    /// Create a channel accepting messages from `quarters_origin` only
    pub fn new(
        environment: Arc<dyn UiEnvironment>,
        bus: MessageBus,
        quarters_origin: impl Into<String>,
    ) -> Self {
        Self {
            environment,
            bus,
            quarters_origin: quarters_origin.into(),
        }
    }

    /// Message bus the responses are read from
    #[must_use]
    pub fn bus(&self) -> &MessageBus {
        &self.bus
    }

    /// Open `url` on the given channel and call `on_success` with the response
    ///
    /// Returns `None` for [`ChannelType::Redirect`], which hands the page over
    /// to the authorization server.
    ///
    /// # Errors
    ///
    /// Returns an error if the environment cannot open the surface; no
    /// listener is left behind in that case.
    pub fn request_from_quarters<F>(
        &self,
        mut url: Url,
        channel: ChannelType,
        on_success: F,
    ) -> Result<Option<PendingAuthorization>>
    where
        F: FnOnce(AuthorizationPayload) + Send + 'static,
    {
        match channel {
            ChannelType::Redirect => {
                let mut location = self.environment.current_location()?;
                location.set_query(None);
                location.set_fragment(None);
                url.query_pairs_mut()
                    .append_pair("redirect_uri", location.as_str());
                tracing::debug!(%url, "Redirecting to authorization page");
                self.environment.navigate(&url)?;
                Ok(None)
            }
            ChannelType::Popup => {
                let features = popup_features(self.environment.screen_size());
                let subscription = self.listen(on_success);
                tracing::debug!(%url, "Opening authorization popup");
                let window =
                    match self
                        .environment
                        .open_window(&url, POPUP_WINDOW_NAME, &features)
                    {
                        Ok(window) => window,
                        Err(e) => {
                            subscription.cancel();
                            return Err(e);
                        }
                    };
                Ok(Some(PendingAuthorization {
                    channel,
                    subscription,
                    window: Some(window),
                    frame_id: None,
                    environment: Arc::clone(&self.environment),
                }))
            }
            ChannelType::Frame => {
                let frame_id = next_frame_id();
                url.query_pairs_mut().append_pair("frame_id", &frame_id);
                let frame = OverlayFrame {
                    id: frame_id.clone(),
                    src: url,
                    style: FRAME_STYLE.to_string(),
                };
                let subscription = self.listen(on_success);
                tracing::debug!(url = %frame.src, frame_id = %frame.id, "Embedding authorization frame");
                if let Err(e) = self.environment.create_overlay_frame(&frame) {
                    subscription.cancel();
                    return Err(e);
                }
                Ok(Some(PendingAuthorization {
                    channel,
                    subscription,
                    window: None,
                    frame_id: Some(frame_id),
                    environment: Arc::clone(&self.environment),
                }))
            }
        }
    }

    fn listen<F>(&self, on_success: F) -> Subscription
    where
        F: FnOnce(AuthorizationPayload) + Send + 'static,
    {
        let expected_origin = self.quarters_origin.clone();
        let environment = Arc::clone(&self.environment);
        let callback: Mutex<Option<SuccessCallback>> = Mutex::new(Some(Box::new(on_success)));

        self.bus.subscribe(move |event: &MessageEvent| {
            if !origin_matches(&event.origin, &expected_origin) {
                tracing::trace!(origin = %event.origin, "Ignoring message from foreign origin");
                return ListenerControl::Continue;
            }

            let payload: Value = match serde_json::from_str(&event.data) {
                Ok(payload) => payload,
                Err(e) => {
                    tracing::warn!(error = %e, "Discarding malformed authorization message");
                    return ListenerControl::Continue;
                }
            };
            if is_falsy(&payload) {
                tracing::debug!("Discarding empty authorization message");
                return ListenerControl::Continue;
            }

            let Some(callback) = callback
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .take()
            else {
                return ListenerControl::Remove;
            };

            if let Some(source) = &event.source {
                source.close();
            }
            if let Some(frame_id) = payload.get("frameId").and_then(Value::as_str) {
                if environment.remove_element(frame_id) {
                    tracing::debug!(frame_id, "Removed authorization frame");
                }
            }

            callback(AuthorizationPayload(payload));
            ListenerControl::Remove
        })
    }
}

impl std::fmt::Debug for AuthorizationChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthorizationChannel")
            .field("quarters_origin", &self.quarters_origin)
            .field("bus", &self.bus)
            .finish_non_exhaustive()
    }
}

fn popup_features(screen: crate::environment::ScreenSize) -> WindowFeatures {
    WindowFeatures {
        width: POPUP_WIDTH,
        height: POPUP_HEIGHT,
        left: screen.width.saturating_sub(POPUP_WIDTH) / 2,
        top: screen.height.saturating_sub(POPUP_HEIGHT) / 4,
    }
}

/// `quarters_iframe_<unix-millis>`, bumped past the last id handed out
fn next_frame_id() -> String {
    static LAST: AtomicU64 = AtomicU64::new(0);

    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or_default();
    let mut last = LAST.load(Ordering::Relaxed);
    loop {
        let next = now.max(last + 1);
        match LAST.compare_exchange_weak(last, next, Ordering::Relaxed, Ordering::Relaxed) {
            Ok(_) => return format!("{FRAME_ID_PREFIX}{next}"),
            Err(actual) => last = actual,
        }
    }
}

fn origin_matches(origin: &str, expected: &str) -> bool {
    match Url::parse(origin) {
        Ok(url) => url.origin().ascii_serialization() == expected,
        Err(_) => origin.trim_end_matches('/') == expected,
    }
}

fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64().is_none_or(|f| f == 0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(_) | Value::Object(_) => false,
    }
}
