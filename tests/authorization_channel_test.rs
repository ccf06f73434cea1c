//! Authorization channel behaviour against a recording host environment
//!
//! Messages are injected the way a browser host forwards `message` events:
//! through [`Quarters::message_bus`].

mod common;

use std::sync::{Arc, Mutex};

use serde_json::json;
use url::Url;

use common::{APP_ID, QUARTERS_ORIGIN, RecordingEnvironment, options, quarters};
use quarters_sdk::auth::{FRAME_ID_PREFIX, POPUP_HEIGHT, POPUP_WIDTH, POPUP_WINDOW_NAME};
use quarters_sdk::environment::UiEnvironment;
use quarters_sdk::{
    AuthorizationPayload, ChannelType, MessageBus, MessageEvent, Quarters, QuartersError,
};

const API_URL: &str = "http://127.0.0.1:9/v1/";

type Received = Arc<Mutex<Vec<AuthorizationPayload>>>;

fn recorder() -> (Received, impl FnOnce(AuthorizationPayload) + Send + 'static) {
    let received: Received = Arc::default();
    let sink = Arc::clone(&received);
    (received, move |payload| sink.lock().unwrap().push(payload))
}

fn query(url: &Url) -> Vec<(String, String)> {
    url.query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect()
}

// ---------------------------------------------------------------------------
// Popup
// ---------------------------------------------------------------------------

#[test]
fn test_popup_opens_centered_sign_in_page() {
    let (quarters, env) = quarters(API_URL);
    let (_received, on_success) = recorder();

    let pending = quarters
        .authorize(ChannelType::Popup, false, on_success)
        .unwrap()
        .expect("popup returns a pending authorization");
    assert_eq!(pending.channel_type(), ChannelType::Popup);
    assert!(pending.is_active());

    let opened = env.opened.lock().unwrap();
    let (url, name, features) = &opened[0];
    assert_eq!(name, POPUP_WINDOW_NAME);
    assert_eq!((features.width, features.height), (POPUP_WIDTH, POPUP_HEIGHT));
    assert_eq!((features.left, features.top), (535, 120));

    assert_eq!(url.path(), "/oauth/authorize");
    assert_eq!(
        query(url),
        vec![
            ("response_type".to_string(), "code".to_string()),
            ("client_id".to_string(), APP_ID.to_string()),
            ("inline".to_string(), "true".to_string()),
        ]
    );
}

#[test]
fn test_popup_message_delivers_code_and_closes_window() {
    let (quarters, env) = quarters(API_URL);
    let (received, on_success) = recorder();

    let pending = quarters
        .authorize(ChannelType::Popup, false, on_success)
        .unwrap()
        .unwrap();
    let window = env.last_window();

    let event = MessageEvent::new(QUARTERS_ORIGIN, r#"{"code":"abc"}"#)
        .with_source(Arc::clone(&window) as _);
    quarters.message_bus().dispatch(&event);

    assert!(window.is_closed());
    assert!(!pending.is_active());
    let received = received.lock().unwrap();
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].code(), Some("abc"));
}

#[test]
fn test_force_signup_is_forwarded() {
    let (quarters, env) = quarters(API_URL);
    let (_received, on_success) = recorder();

    quarters
        .authorize(ChannelType::Popup, true, on_success)
        .unwrap();

    let opened = env.opened.lock().unwrap();
    assert!(
        query(&opened[0].0).contains(&("force_signup".to_string(), "true".to_string())),
        "missing force_signup in {}",
        opened[0].0
    );
}

#[test]
fn test_blocked_popup_leaves_no_listener() {
    let environment = Arc::new(RecordingEnvironment {
        block_popups: true,
        ..RecordingEnvironment::default()
    });
    let quarters = Quarters::new(
        options(API_URL),
        Arc::clone(&environment) as Arc<dyn UiEnvironment>,
        MessageBus::new(),
    )
    .unwrap();
    let (received, on_success) = recorder();

    let err = quarters
        .authorize(ChannelType::Popup, false, on_success)
        .unwrap_err();

    assert!(matches!(err, QuartersError::Environment(_)));
    assert_eq!(quarters.message_bus().listener_count(), 0);

    quarters
        .message_bus()
        .dispatch(&MessageEvent::new(QUARTERS_ORIGIN, r#"{"code":"late"}"#));
    assert!(received.lock().unwrap().is_empty());
}

// ---------------------------------------------------------------------------
// Frame
// ---------------------------------------------------------------------------

#[test]
fn test_frame_is_created_and_removed_on_reply() {
    let (quarters, env) = quarters(API_URL);
    let (received, on_success) = recorder();

    let pending = quarters
        .authorize(ChannelType::Frame, false, on_success)
        .unwrap()
        .unwrap();
    let frame_id = pending.frame_id().unwrap().to_string();
    assert!(frame_id.starts_with(FRAME_ID_PREFIX));

    {
        let frames = env.frames.lock().unwrap();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].id, frame_id);
        assert!(
            query(&frames[0].src).contains(&("frame_id".to_string(), frame_id.clone())),
            "frame url should carry its id: {}",
            frames[0].src
        );
    }

    let data = json!({"code": "xyz", "frameId": frame_id}).to_string();
    quarters
        .message_bus()
        .dispatch(&MessageEvent::new(QUARTERS_ORIGIN, data));

    assert!(env.live_frame_ids().is_empty());
    assert_eq!(*env.removed.lock().unwrap(), vec![frame_id]);
    assert_eq!(received.lock().unwrap()[0].code(), Some("xyz"));
}

#[test]
fn test_callback_runs_exactly_once() {
    let (quarters, _env) = quarters(API_URL);
    let (received, on_success) = recorder();

    quarters
        .authorize(ChannelType::Frame, false, on_success)
        .unwrap();

    let bus = quarters.message_bus();
    bus.dispatch(&MessageEvent::new(QUARTERS_ORIGIN, r#"{"code":"first"}"#));
    bus.dispatch(&MessageEvent::new(QUARTERS_ORIGIN, r#"{"code":"second"}"#));

    let received = received.lock().unwrap();
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].code(), Some("first"));
    assert_eq!(bus.listener_count(), 0);
}

#[test]
fn test_foreign_and_malformed_messages_are_ignored() {
    let (quarters, _env) = quarters(API_URL);
    let (received, on_success) = recorder();

    quarters
        .authorize(ChannelType::Frame, false, on_success)
        .unwrap();

    let bus = quarters.message_bus();
    bus.dispatch(&MessageEvent::new("https://evil.example", r#"{"code":"stolen"}"#));
    bus.dispatch(&MessageEvent::new(QUARTERS_ORIGIN, "not json"));
    bus.dispatch(&MessageEvent::new(QUARTERS_ORIGIN, "null"));
    bus.dispatch(&MessageEvent::new(QUARTERS_ORIGIN, r#""""#));

    assert!(received.lock().unwrap().is_empty());
    assert_eq!(bus.listener_count(), 1, "listener stays until a valid reply");

    bus.dispatch(&MessageEvent::new(QUARTERS_ORIGIN, r#"{"code":"real"}"#));
    assert_eq!(received.lock().unwrap()[0].code(), Some("real"));
}

#[test]
fn test_concurrent_requests_are_independent() {
    let (quarters, env) = quarters(API_URL);
    let (first, first_cb) = recorder();
    let (second, second_cb) = recorder();

    quarters
        .authorize(ChannelType::Frame, false, first_cb)
        .unwrap();
    quarters
        .authorize(ChannelType::Frame, false, second_cb)
        .unwrap();

    let ids = env.live_frame_ids();
    assert_eq!(ids.len(), 2);
    assert_ne!(ids[0], ids[1]);

    // one message satisfies every pending listener
    quarters
        .message_bus()
        .dispatch(&MessageEvent::new(QUARTERS_ORIGIN, r#"{"code":"shared"}"#));
    assert_eq!(first.lock().unwrap().len(), 1);
    assert_eq!(second.lock().unwrap().len(), 1);
}

#[test]
fn test_cancel_removes_frame_and_listener() {
    let (quarters, env) = quarters(API_URL);
    let (received, on_success) = recorder();

    let pending = quarters
        .authorize(ChannelType::Frame, false, on_success)
        .unwrap()
        .unwrap();

    assert!(pending.cancel());
    assert!(!pending.is_active());
    assert!(env.live_frame_ids().is_empty());
    assert_eq!(quarters.message_bus().listener_count(), 0);

    quarters
        .message_bus()
        .dispatch(&MessageEvent::new(QUARTERS_ORIGIN, r#"{"code":"late"}"#));
    assert!(received.lock().unwrap().is_empty());
}

// ---------------------------------------------------------------------------
// Redirect and transfers
// ---------------------------------------------------------------------------

#[test]
fn test_redirect_uses_current_page_without_query() {
    let (quarters, env) = quarters(API_URL);

    let pending = quarters
        .authorize(ChannelType::Redirect, false, |_| {})
        .unwrap();
    assert!(pending.is_none());
    assert_eq!(quarters.message_bus().listener_count(), 0);

    let navigations = env.navigations.lock().unwrap();
    assert_eq!(navigations.len(), 1);
    let redirect_uri = navigations[0]
        .query_pairs()
        .find(|(k, _)| k == "redirect_uri")
        .map(|(_, v)| v.into_owned());
    assert_eq!(
        redirect_uri.as_deref(),
        Some("https://game.example/play/level-1")
    );
}

#[test]
fn test_authorize_transfer_opens_request_page() {
    let (quarters, env) = quarters(API_URL);
    let (received, on_success) = recorder();

    quarters
        .authorize_transfer(77_u64, ChannelType::Popup, on_success)
        .unwrap();

    let opened = env.opened.lock().unwrap();
    assert_eq!(
        opened[0].0.as_str(),
        format!("{QUARTERS_ORIGIN}/requests/77?inline=true")
    );
    drop(opened);

    let window = env.last_window();
    quarters.message_bus().dispatch(
        &MessageEvent::new(QUARTERS_ORIGIN, r#"{"txId":"0x1","requestId":77}"#)
            .with_source(Arc::clone(&window) as _),
    );
    assert!(window.is_closed());
    assert_eq!(received.lock().unwrap()[0].as_value()["txId"], "0x1");
}
