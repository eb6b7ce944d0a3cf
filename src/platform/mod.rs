//! Window-system collaborator interface
//!
//! The core never talks to a native windowing API directly. A backend
//! implements [`WindowSystem`] and reports lifecycle events back into the
//! loop through the [`LocalQueue`] it is bound to.

pub mod headless;

use crate::ui::{EventSender, LocalQueue, Severity};
use crate::utils::Result;
use std::fmt;

/// Opaque identifier for one native window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WindowHandle(u64);

impl WindowHandle {
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for WindowHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Outer window size in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Client-area rectangle, in window coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Bounds {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Bounds {
    pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Rectangle at the origin covering `size`
    pub const fn from_size(size: Size) -> Self {
        Self::new(0, 0, size.width, size.height)
    }
}

/// Native windowing capability driven by the UI thread.
///
/// Every method is called on the UI thread. Destroying a window must post
/// [`crate::ui::WindowEvent::Destroyed`] for it and for any window it owns
/// to the local queue before returning; a size change must post
/// [`crate::ui::WindowEvent::Resized`]. Events the user or the platform
/// raises between loop calls go through the [`EventSender`] instead.
pub trait WindowSystem {
    /// Receive the queues used to report lifecycle events
    fn bind(&mut self, events: LocalQueue, native: EventSender);

    fn create_window(
        &mut self,
        title: &str,
        size: Size,
        parent: Option<WindowHandle>,
    ) -> Result<WindowHandle>;

    fn destroy_window(&mut self, window: WindowHandle);

    fn show_window(&mut self, window: WindowHandle);

    fn set_title(&mut self, window: WindowHandle, title: &str);

    fn set_size(&mut self, window: WindowHandle, size: Size);

    /// Current client area of `window`
    fn client_bounds(&self, window: WindowHandle) -> Bounds;

    /// Display a modal dialog and return once it is dismissed
    fn message_box(&mut self, window: WindowHandle, title: &str, body: &str, severity: Severity);
}
