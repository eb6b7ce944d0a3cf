//! Handle → window registry
//!
//! Window-system events identify windows only by handle; the registry maps
//! them back to their [`WebWindow`]. Entries are added on creation and
//! removed when the window system reports destruction, so it holds exactly
//! the live windows. Owned by the UI thread.

use super::window::WebWindow;
use crate::platform::WindowHandle;
use std::collections::HashMap;

#[derive(Default)]
pub(crate) struct WindowRegistry {
    windows: HashMap<WindowHandle, WebWindow>,
}

impl WindowRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, handle: WindowHandle, window: WebWindow) {
        if self.windows.insert(handle, window).is_some() {
            log::warn!("[ui] window system reused live handle {}", handle);
        }
    }

    pub fn remove(&mut self, handle: WindowHandle) -> Option<WebWindow> {
        self.windows.remove(&handle)
    }

    pub fn get(&self, handle: WindowHandle) -> Option<&WebWindow> {
        self.windows.get(&handle)
    }

    pub fn get_mut(&mut self, handle: WindowHandle) -> Option<&mut WebWindow> {
        self.windows.get_mut(&handle)
    }

    pub fn contains(&self, handle: WindowHandle) -> bool {
        self.windows.contains_key(&handle)
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn handles(&self) -> impl Iterator<Item = WindowHandle> + '_ {
        self.windows.keys().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn record(title: &str) -> WebWindow {
        WebWindow::new(title.to_string(), None, Rc::new(RefCell::new(|_: &str| {})))
    }

    #[test]
    fn test_registry_tracks_live_windows() {
        let mut registry = WindowRegistry::new();
        let a = WindowHandle::from_raw(1);
        let b = WindowHandle::from_raw(2);
        registry.insert(a, record("a"));
        registry.insert(b, record("b"));
        assert_eq!(registry.len(), 2);

        let removed = registry.remove(a).unwrap();
        assert_eq!(removed.title, "a");
        assert!(!registry.contains(a));
        assert!(registry.remove(a).is_none());
        assert_eq!(registry.handles().collect::<Vec<_>>(), vec![b]);
    }

    #[test]
    fn test_registry_lookup_mut() {
        let mut registry = WindowRegistry::new();
        let a = WindowHandle::from_raw(9);
        registry.insert(a, record("before"));
        registry.get_mut(a).unwrap().title = "after".to_string();
        assert_eq!(registry.get(a).unwrap().title, "after");
    }
}
