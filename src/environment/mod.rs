//! UI environment abstraction for the authorization handshake
//!
//! The authorization channel never touches a window, document or location
//! directly. Everything it needs from the host is expressed by the
//! [`UiEnvironment`] trait, and cross-window messages arrive through a
//! [`MessageBus`]. A browser host binds these to the real page; native
//! hosts can use [`SystemBrowser`]; tests inject a recording fake.

pub mod bus;
pub mod system;

use std::sync::Arc;
use url::Url;

use crate::error::Result;

pub use bus::{ListenerControl, MessageBus, MessageEvent, Subscription};
pub use system::SystemBrowser;

/// Screen dimensions in CSS pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenSize {
    /// Screen width
    pub width: u32,
    /// Screen height
    pub height: u32,
}

impl Default for ScreenSize {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
        }
    }
}

/// Size and position of a popup window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowFeatures {
    /// Window width
    pub width: u32,
    /// Window height
    pub height: u32,
    /// Distance from the left edge of the screen
    pub left: u32,
    /// Distance from the top edge of the screen
    pub top: u32,
}

impl WindowFeatures {
    /// Render as a `window.open` feature string
    #[must_use]
    pub fn to_feature_string(&self) -> String {
        format!(
            "width={},height={},left={},top={}",
            self.width, self.height, self.left, self.top
        )
    }
}

/// Embedded frame appended to the document body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlayFrame {
    /// Element id, echoed back by the remote page as `frameId`
    pub id: String,
    /// Page loaded in the frame
    pub src: Url,
    /// Inline CSS applied to the element
    pub style: String,
}

/// Handle to a window that can be closed, such as an authorization popup
pub trait WindowHandle: Send + Sync {
    /// Close the window
    fn close(&self);
}

/// Host capabilities needed to present the authorization surface
pub trait UiEnvironment: Send + Sync {
    /// Current page URL; its origin and path become the redirect target
    ///
    /// # Errors
    /// Returns an error if the host has no meaningful location.
    fn current_location(&self) -> Result<Url>;

    /// Screen size used to center popups
    fn screen_size(&self) -> ScreenSize;

    /// Open a named window
    ///
    /// # Errors
    /// Returns an error if the window cannot be opened (e.g. popup blocked).
    fn open_window(
        &self,
        url: &Url,
        name: &str,
        features: &WindowFeatures,
    ) -> Result<Arc<dyn WindowHandle>>;

    /// Navigate the current page away
    ///
    /// # Errors
    /// Returns an error if navigation is not possible.
    fn navigate(&self, url: &Url) -> Result<()>;

    /// Create an embedded frame and append it to the document body
    ///
    /// # Errors
    /// Returns an error if the host cannot embed frames.
    fn create_overlay_frame(&self, frame: &OverlayFrame) -> Result<()>;

    /// Remove the element with the given id; returns `false` if none was live
    fn remove_element(&self, id: &str) -> bool;
}
