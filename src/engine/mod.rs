//! Browser-engine host
//!
//! Each window owns an [`EngineHost`] that walks its browser instance
//! through startup:
//!
//! ```text
//! Uncreated -> EnvironmentPending -> BrowserPending -> Ready
//!                      \                  \
//!                       +-------> Failed <-+
//! ```
//!
//! Startup begins on the first `show` and is never repeated. Once `Ready`,
//! the browser instance stays attached until the window is destroyed.

mod backend;
mod bootstrap;
mod resource;
mod scheme;

pub use backend::{
    BrowserEngine, BrowserView, Completions, EngineEvent, Environment, MessageHandler,
    ResourceHandler,
};
pub use bootstrap::BOOTSTRAP_SCRIPT;
pub use resource::{ResourceRequest, ResourceResponse, SchemeResponse};
pub use scheme::{SchemeHandler, SchemeTable, scheme_of};

use crate::config::EngineSettings;
use crate::platform::{Bounds, WindowHandle};
use crate::utils::EngineError;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Where a window's browser instance is in its startup sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineStatus {
    Uncreated,
    EnvironmentPending,
    BrowserPending,
    Ready,
    /// Creation failed; the window has no browser surface
    Failed,
}

impl EngineStatus {
    /// Startup has finished, one way or the other
    pub fn is_settled(self) -> bool {
        matches!(self, Self::Ready | Self::Failed)
    }
}

/// Host callback for text posted by page script
pub(crate) type MessageCallback = Rc<RefCell<dyn FnMut(&str)>>;

/// Window state the browser's event channels are bound to
pub(crate) struct Wiring {
    pub schemes: Rc<RefCell<SchemeTable>>,
    pub on_message: MessageCallback,
    pub settings: EngineSettings,
    pub bounds: Bounds,
}

enum EngineState {
    Uncreated,
    EnvironmentPending,
    BrowserPending {
        environment: Box<dyn Environment>,
    },
    Ready {
        _environment: Box<dyn Environment>,
        view: Box<dyn BrowserView>,
    },
    Failed,
}

/// Per-window browser startup state machine
pub struct EngineHost {
    state: EngineState,
}

impl EngineHost {
    pub fn new() -> Self {
        Self {
            state: EngineState::Uncreated,
        }
    }

    pub fn status(&self) -> EngineStatus {
        match self.state {
            EngineState::Uncreated => EngineStatus::Uncreated,
            EngineState::EnvironmentPending => EngineStatus::EnvironmentPending,
            EngineState::BrowserPending { .. } => EngineStatus::BrowserPending,
            EngineState::Ready { .. } => EngineStatus::Ready,
            EngineState::Failed => EngineStatus::Failed,
        }
    }

    /// The browser instance, once `Ready`
    pub fn view_mut(&mut self) -> Option<&mut Box<dyn BrowserView>> {
        match &mut self.state {
            EngineState::Ready { view, .. } => Some(view),
            _ => None,
        }
    }

    /// `Uncreated -> EnvironmentPending`. Does nothing in any other state.
    pub(crate) fn begin(
        &mut self,
        window: WindowHandle,
        engine: &mut dyn BrowserEngine,
        completions: impl FnOnce() -> Completions,
    ) -> Result<(), EngineError> {
        if !matches!(self.state, EngineState::Uncreated) {
            return Ok(());
        }
        log::debug!("[engine] requesting environment for window {}", window);
        self.state = EngineState::EnvironmentPending;
        engine.create_environment(window, completions()).inspect_err(|_| {
            self.state = EngineState::Failed;
        })
    }

    /// `EnvironmentPending -> BrowserPending`
    pub(crate) fn environment_created(
        &mut self,
        window: WindowHandle,
        result: Result<Box<dyn Environment>, EngineError>,
        completions: impl FnOnce() -> Completions,
    ) -> Result<(), EngineError> {
        match std::mem::replace(&mut self.state, EngineState::Failed) {
            EngineState::EnvironmentPending => {
                let mut environment = result?;
                log::debug!("[engine] environment ready, creating browser for window {}", window);
                environment.create_browser(window, completions());
                self.state = EngineState::BrowserPending { environment };
                Ok(())
            }
            other => {
                log::warn!("[engine] unexpected environment completion for window {}", window);
                self.state = other;
                Ok(())
            }
        }
    }

    /// `BrowserPending -> Ready`: configure the browser and bind its channels
    pub(crate) fn browser_created(
        &mut self,
        result: Result<Box<dyn BrowserView>, EngineError>,
        wiring: Wiring,
    ) -> Result<(), EngineError> {
        match std::mem::replace(&mut self.state, EngineState::Failed) {
            EngineState::BrowserPending { environment } => {
                let mut view = result?;
                wire(view.as_mut(), wiring);
                self.state = EngineState::Ready {
                    _environment: environment,
                    view,
                };
                Ok(())
            }
            other => {
                log::warn!("[engine] unexpected browser completion");
                self.state = other;
                Ok(())
            }
        }
    }

    /// A pending step will never complete
    pub(crate) fn abandoned(&mut self) -> Result<(), EngineError> {
        match self.state {
            EngineState::EnvironmentPending | EngineState::BrowserPending { .. } => {
                self.state = EngineState::Failed;
                Err(EngineError::new("the browser engine abandoned a pending creation step"))
            }
            _ => Ok(()),
        }
    }

    /// Fit the rendered content to `bounds`. No-op before `Ready`.
    pub fn refit(&mut self, bounds: Bounds) {
        if let Some(view) = self.view_mut() {
            view.set_bounds(bounds);
        }
    }
}

impl Default for EngineHost {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EngineHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineHost")
            .field("status", &self.status())
            .finish()
    }
}

fn wire(view: &mut dyn BrowserView, wiring: Wiring) {
    let Wiring {
        schemes,
        on_message,
        settings,
        bounds,
    } = wiring;

    view.apply_settings(&settings);
    view.add_script_on_document_created(BOOTSTRAP_SCRIPT);
    view.set_message_handler(Box::new(move |message: &str| {
        (&mut *on_message.borrow_mut())(message);
    }));
    view.set_resource_handler(Box::new(move |request: &ResourceRequest| {
        schemes.borrow_mut().intercept(request)
    }));
    view.set_bounds(bounds);
}

#[cfg(test)]
mod tests {
    use super::backend::{MockBrowserView, MockEnvironment};
    use super::*;
    use crate::ui::{LocalEvent, LocalQueue};
    use mockall::predicate::eq;

    fn wiring(schemes: Rc<RefCell<SchemeTable>>, log: Rc<RefCell<Vec<String>>>) -> Wiring {
        Wiring {
            schemes,
            on_message: Rc::new(RefCell::new(move |message: &str| {
                log.borrow_mut().push(message.to_string());
            })),
            settings: EngineSettings::default(),
            bounds: Bounds::new(0, 0, 800, 600),
        }
    }

    struct RejectingEngine;

    impl BrowserEngine for RejectingEngine {
        fn create_environment(
            &mut self,
            _window: WindowHandle,
            _completions: Completions,
        ) -> Result<(), EngineError> {
            Err(EngineError::new("runtime not installed"))
        }
    }

    #[test]
    fn test_new_host_is_uncreated() {
        let mut host = EngineHost::new();
        assert_eq!(host.status(), EngineStatus::Uncreated);
        assert!(host.view_mut().is_none());
        // Resizing before the browser exists does nothing
        host.refit(Bounds::new(0, 0, 10, 10));
        assert_eq!(host.status(), EngineStatus::Uncreated);
    }

    #[test]
    fn test_rejected_environment_fails_host() {
        let queue = LocalQueue::new();
        let window = WindowHandle::from_raw(1);
        let mut host = EngineHost::new();
        let err = host
            .begin(window, &mut RejectingEngine, || Completions::new(window, queue.clone()))
            .unwrap_err();

        assert_eq!(err.message(), "runtime not installed");
        assert_eq!(host.status(), EngineStatus::Failed);
        // The rejected request also drops its completion sink
        assert!(matches!(
            queue.pop(),
            Some(LocalEvent::Engine { event: EngineEvent::Abandoned, .. })
        ));
        // A failed host stays failed
        assert!(host.abandoned().is_ok());
        assert_eq!(host.status(), EngineStatus::Failed);
    }

    #[test]
    fn test_environment_completion_requests_browser() {
        let queue = LocalQueue::new();
        let window = WindowHandle::from_raw(4);
        let mut environment = MockEnvironment::new();
        environment
            .expect_create_browser()
            .withf(move |w, c| *w == window && c.window() == window)
            .times(1)
            .returning(|_, completions| drop(completions));

        let mut host = EngineHost {
            state: EngineState::EnvironmentPending,
        };
        host.environment_created(window, Ok(Box::new(environment)), || {
            Completions::new(window, queue.clone())
        })
        .unwrap();
        assert_eq!(host.status(), EngineStatus::BrowserPending);
    }

    #[test]
    fn test_browser_completion_applies_configuration() {
        let mut view = MockBrowserView::new();
        view.expect_apply_settings()
            .withf(|s| s.script_enabled && s.default_script_dialogs && s.web_message_enabled)
            .times(1)
            .return_const(());
        view.expect_add_script_on_document_created()
            .with(eq(BOOTSTRAP_SCRIPT))
            .times(1)
            .return_const(());
        view.expect_set_message_handler().times(1).return_const(());
        view.expect_set_resource_handler().times(1).return_const(());
        view.expect_set_bounds()
            .with(eq(Bounds::new(0, 0, 800, 600)))
            .times(1)
            .return_const(());

        let mut host = EngineHost {
            state: EngineState::BrowserPending {
                environment: Box::new(MockEnvironment::new()),
            },
        };
        let schemes = Rc::new(RefCell::new(SchemeTable::new()));
        let log = Rc::new(RefCell::new(Vec::new()));
        host.browser_created(Ok(Box::new(view)), wiring(schemes, log)).unwrap();

        assert_eq!(host.status(), EngineStatus::Ready);
        assert!(host.view_mut().is_some());
    }

    #[test]
    fn test_browser_failure_is_reported_once() {
        let mut host = EngineHost {
            state: EngineState::BrowserPending {
                environment: Box::new(MockEnvironment::new()),
            },
        };
        let schemes = Rc::new(RefCell::new(SchemeTable::new()));
        let log = Rc::new(RefCell::new(Vec::new()));
        let err = host
            .browser_created(Err(EngineError::new("GPU process crashed")), wiring(schemes, log))
            .unwrap_err();

        assert_eq!(err.message(), "GPU process crashed");
        assert_eq!(host.status(), EngineStatus::Failed);
    }

    #[test]
    fn test_abandoned_pending_step_fails() {
        let mut host = EngineHost {
            state: EngineState::EnvironmentPending,
        };
        assert!(host.abandoned().is_err());
        assert_eq!(host.status(), EngineStatus::Failed);
    }

    #[test]
    fn test_status_settled() {
        assert!(EngineStatus::Ready.is_settled());
        assert!(EngineStatus::Failed.is_settled());
        assert!(!EngineStatus::BrowserPending.is_settled());
        assert!(!EngineStatus::Uncreated.is_settled());
    }
}
