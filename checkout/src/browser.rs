//! Browser surface used by the checkout flow
//!
//! Navigation and popup windows sit behind traits so the reducers never touch
//! a real window.

use crate::routes::Route;
use reqwest::Url;
use std::fmt;
use std::sync::Arc;
use storefront_core::async_effect;
use storefront_core::effect::Effect;

/// Moves the current browsing context to another route
pub trait Navigator: Send + Sync {
    /// Navigate to `route`
    fn navigate(&self, route: &Route);
}

/// A secondary browsing context opened by this window
pub trait PopupWindow: Send + Sync {
    /// True once the window is gone, for any reason
    fn is_closed(&self) -> bool;

    /// Close the window (a popup may close itself)
    fn close(&self);
}

/// Opens popup windows
pub trait PopupHost: Send + Sync {
    /// Screen rectangle the opener is displayed on, used for centering
    fn screen(&self) -> ScreenRect;

    /// Open `url` in a new window named `name`
    ///
    /// Returns `None` when the browser blocked the popup.
    fn open(&self, url: &Url, name: &str, features: &PopupFeatures) -> Option<Arc<dyn PopupWindow>>;
}

/// Effect that moves the browsing context to `route` and feeds nothing back
pub fn navigate<A: Send + 'static>(navigator: &Arc<dyn Navigator>, route: Route) -> Effect<A> {
    let navigator = Arc::clone(navigator);
    async_effect! {
        navigator.navigate(&route);
        None
    }
}

/// Screen geometry in pixels
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScreenRect {
    /// Left edge
    pub left: i32,
    /// Top edge
    pub top: i32,
    /// Width
    pub width: u32,
    /// Height
    pub height: u32,
}

impl ScreenRect {
    /// Rectangle at the origin
    #[must_use]
    pub const fn sized(width: u32, height: u32) -> Self {
        Self {
            left: 0,
            top: 0,
            width,
            height,
        }
    }
}

/// Window features passed to `window.open`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PopupFeatures {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Left position in pixels
    pub left: i32,
    /// Top position in pixels
    pub top: i32,
}

impl PopupFeatures {
    /// Fixed-size popup centered on `screen`
    ///
    /// A popup larger than the screen is pinned to the screen's top-left
    /// corner instead of being pushed off it.
    #[must_use]
    pub fn centered(screen: ScreenRect, width: u32, height: u32) -> Self {
        let offset = |outer: u32, inner: u32| {
            i32::try_from(outer.saturating_sub(inner) / 2).unwrap_or(i32::MAX)
        };

        Self {
            width,
            height,
            left: screen.left.saturating_add(offset(screen.width, width)),
            top: screen.top.saturating_add(offset(screen.height, height)),
        }
    }
}

impl fmt::Display for PopupFeatures {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "width={},height={},left={},top={},resizable=yes,scrollbars=yes",
            self.width, self.height, self.left, self.top
        )
    }
}

/// Shared popup window handle that can live in reducer state
///
/// Two handles are equal when they refer to the same window.
#[derive(Clone)]
pub struct PopupHandle(Arc<dyn PopupWindow>);

impl PopupHandle {
    /// Wraps an opened window
    #[must_use]
    pub fn new(window: Arc<dyn PopupWindow>) -> Self {
        Self(window)
    }

    /// See [`PopupWindow::is_closed`]
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.0.is_closed()
    }
}

impl fmt::Debug for PopupHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PopupHandle")
            .field("closed", &self.0.is_closed())
            .finish()
    }
}

impl PartialEq for PopupHandle {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn popup_is_centered_on_screen() {
        let features = PopupFeatures::centered(ScreenRect::sized(1920, 1080), 500, 700);
        assert_eq!(features.left, 710);
        assert_eq!(features.top, 190);
        assert_eq!(
            features.to_string(),
            "width=500,height=700,left=710,top=190,resizable=yes,scrollbars=yes"
        );
    }

    #[test]
    fn centering_respects_screen_offset() {
        let screen = ScreenRect {
            left: 1920,
            top: 0,
            width: 1280,
            height: 800,
        };
        let features = PopupFeatures::centered(screen, 500, 700);
        assert_eq!((features.left, features.top), (2310, 50));
    }

    #[test]
    fn oversized_popup_is_clamped_to_screen_corner() {
        let features = PopupFeatures::centered(ScreenRect::sized(400, 600), 500, 700);
        assert_eq!((features.left, features.top), (0, 0));
    }
}
