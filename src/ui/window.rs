//! Window instance record

use crate::config::EngineSettings;
use crate::engine::{EngineHost, MessageCallback, SchemeTable, Wiring};
use crate::platform::{Bounds, WindowHandle};
use std::cell::RefCell;
use std::rc::Rc;

/// Everything the loop knows about one live window.
///
/// The scheme table and message callback are shared with the browser's
/// event channels, so both outlive any handler the engine holds.
pub(crate) struct WebWindow {
    pub title: String,
    pub parent: Option<WindowHandle>,
    pub host: EngineHost,
    pub schemes: Rc<RefCell<SchemeTable>>,
    pub on_message: MessageCallback,
}

impl WebWindow {
    pub fn new(title: String, parent: Option<WindowHandle>, on_message: MessageCallback) -> Self {
        Self {
            title,
            parent,
            host: EngineHost::new(),
            schemes: Rc::new(RefCell::new(SchemeTable::new())),
            on_message,
        }
    }

    pub fn wiring(&self, settings: EngineSettings, bounds: Bounds) -> Wiring {
        Wiring {
            schemes: Rc::clone(&self.schemes),
            on_message: Rc::clone(&self.on_message),
            settings,
            bounds,
        }
    }
}
