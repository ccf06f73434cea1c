//! Shared fixtures for integration tests

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use quarters_sdk::environment::{
    OverlayFrame, ScreenSize, UiEnvironment, WindowFeatures, WindowHandle,
};
use quarters_sdk::{MessageBus, Quarters, QuartersError, QuartersOptions};
use url::Url;

pub const QUARTERS_ORIGIN: &str = "https://pocketfulofquarters.com";
pub const APP_ID: &str = "test-app";
pub const APP_SECRET: &str = "test-secret";

/// Popup window that records whether it was closed
#[derive(Default)]
pub struct FakeWindow {
    closed: AtomicBool,
}

impl FakeWindow {
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl WindowHandle for FakeWindow {
    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

/// Records every call the authorization channel makes on the host
pub struct RecordingEnvironment {
    pub location: Url,
    pub screen: ScreenSize,
    pub block_popups: bool,
    pub opened: Mutex<Vec<(Url, String, WindowFeatures)>>,
    pub windows: Mutex<Vec<Arc<FakeWindow>>>,
    pub navigations: Mutex<Vec<Url>>,
    pub frames: Mutex<Vec<OverlayFrame>>,
    pub removed: Mutex<Vec<String>>,
}

impl Default for RecordingEnvironment {
    fn default() -> Self {
        Self {
            location: Url::parse("https://game.example/play/level-1?session=9#top").unwrap(),
            screen: ScreenSize {
                width: 1920,
                height: 1080,
            },
            block_popups: false,
            opened: Mutex::default(),
            windows: Mutex::default(),
            navigations: Mutex::default(),
            frames: Mutex::default(),
            removed: Mutex::default(),
        }
    }
}

impl RecordingEnvironment {
    pub fn live_frame_ids(&self) -> Vec<String> {
        self.frames
            .lock()
            .unwrap()
            .iter()
            .map(|f| f.id.clone())
            .collect()
    }

    pub fn last_window(&self) -> Arc<FakeWindow> {
        Arc::clone(self.windows.lock().unwrap().last().expect("no window opened"))
    }
}

impl UiEnvironment for RecordingEnvironment {
    fn current_location(&self) -> quarters_sdk::Result<Url> {
        Ok(self.location.clone())
    }

    fn screen_size(&self) -> ScreenSize {
        self.screen
    }

    fn open_window(
        &self,
        url: &Url,
        name: &str,
        features: &WindowFeatures,
    ) -> quarters_sdk::Result<Arc<dyn WindowHandle>> {
        if self.block_popups {
            return Err(QuartersError::environment("popup blocked"));
        }
        self.opened
            .lock()
            .unwrap()
            .push((url.clone(), name.to_string(), *features));
        let window = Arc::new(FakeWindow::default());
        self.windows.lock().unwrap().push(Arc::clone(&window));
        Ok(window)
    }

    fn navigate(&self, url: &Url) -> quarters_sdk::Result<()> {
        self.navigations.lock().unwrap().push(url.clone());
        Ok(())
    }

    fn create_overlay_frame(&self, frame: &OverlayFrame) -> quarters_sdk::Result<()> {
        self.frames.lock().unwrap().push(frame.clone());
        Ok(())
    }

    fn remove_element(&self, id: &str) -> bool {
        let mut frames = self.frames.lock().unwrap();
        let before = frames.len();
        frames.retain(|f| f.id != id);
        let removed = frames.len() != before;
        if removed {
            self.removed.lock().unwrap().push(id.to_string());
        }
        removed
    }
}

/// Route SDK logs to the test harness; `RUST_LOG` overrides the filter
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "quarters_sdk=debug".into());
    // a second call in the same binary finds the subscriber already set
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

pub fn options(api_url: &str) -> QuartersOptions {
    QuartersOptions::builder()
        .app_id(APP_ID)
        .app_secret(APP_SECRET)
        .quarters_url(QUARTERS_ORIGIN)
        .api_url(api_url)
        .build()
}

/// Client against `api_url` with a fresh recording environment
pub fn quarters(api_url: &str) -> (Quarters, Arc<RecordingEnvironment>) {
    init_tracing();
    let environment = Arc::new(RecordingEnvironment::default());
    let quarters = Quarters::new(
        options(api_url),
        Arc::clone(&environment) as Arc<dyn UiEnvironment>,
        MessageBus::new(),
    )
    .expect("valid test options");
    (quarters, environment)
}

pub fn token_body(access: &str, refresh: Option<&str>) -> serde_json::Value {
    let mut body = serde_json::json!({
        "access_token": access,
        "token_type": "Bearer",
        "expires_in": 3600
    });
    if let Some(refresh) = refresh {
        body["refresh_token"] = serde_json::json!(refresh);
    }
    body
}
