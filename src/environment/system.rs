//! Native host environment backed by the system browser

use std::sync::Arc;
use url::Url;

use super::{OverlayFrame, ScreenSize, UiEnvironment, WindowFeatures, WindowHandle};
use crate::error::{QuartersError, Result};

/// [`UiEnvironment`] for native applications
///
/// Popups and redirects open the authorization page in the user's default
/// browser. Embedded frames are not available outside a browser host, and
/// the opened browser tab cannot be closed from here. The host is
/// responsible for feeding the authorization response back, e.g. by
/// dispatching it on the [`super::MessageBus`] or passing the code to
/// [`crate::Quarters::set_auth_code`].
#[derive(Debug, Clone)]
pub struct SystemBrowser {
    location: Url,
    screen: ScreenSize,
}

impl SystemBrowser {
    /// Create an environment whose redirect target is `location`
    #[must_use]
    pub fn new(location: Url) -> Self {
        Self {
            location,
            screen: ScreenSize::default(),
        }
    }

    /// Override the screen size reported for popup placement
    #[must_use]
    pub fn with_screen_size(mut self, screen: ScreenSize) -> Self {
        self.screen = screen;
        self
    }
}

/// Browser tab opened by the operating system; it cannot be closed by us
struct DetachedWindow;

impl WindowHandle for DetachedWindow {
    fn close(&self) {
        tracing::debug!("System browser windows are left open for the user to close");
    }
}

impl UiEnvironment for SystemBrowser {
    fn current_location(&self) -> Result<Url> {
        Ok(self.location.clone())
    }

    fn screen_size(&self) -> ScreenSize {
        self.screen
    }

    fn open_window(
        &self,
        url: &Url,
        name: &str,
        _features: &WindowFeatures,
    ) -> Result<Arc<dyn WindowHandle>> {
        tracing::debug!(window = name, "Opening authorization page in system browser");
        open_browser(url)?;
        Ok(Arc::new(DetachedWindow))
    }

    fn navigate(&self, url: &Url) -> Result<()> {
        open_browser(url)
    }

    fn create_overlay_frame(&self, _frame: &OverlayFrame) -> Result<()> {
        Err(QuartersError::unsupported_channel(
            "embedded frames need a browser host; use ChannelType::Popup or ChannelType::Redirect",
        ))
    }

    fn remove_element(&self, _id: &str) -> bool {
        false
    }
}

/// Open URL in default browser
fn open_browser(url: &Url) -> Result<()> {
    #[cfg(target_os = "macos")]
    {
        std::process::Command::new("open")
            .arg(url.as_str())
            .spawn()
            .map_err(|e| QuartersError::environment(format!("could not open browser: {e}")))?;
    }

    #[cfg(target_os = "linux")]
    {
        std::process::Command::new("xdg-open")
            .arg(url.as_str())
            .spawn()
            .map_err(|e| QuartersError::environment(format!("could not open browser: {e}")))?;
    }

    #[cfg(target_os = "windows")]
    {
        std::process::Command::new("cmd")
            .args(["/C", "start", "", url.as_str()])
            .spawn()
            .map_err(|e| QuartersError::environment(format!("could not open browser: {e}")))?;
    }

    #[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
    {
        return Err(QuartersError::unsupported_channel(format!(
            "no system browser integration for this platform; open {url} manually"
        )));
    }

    #[allow(unreachable_code)]
    Ok(())
}
