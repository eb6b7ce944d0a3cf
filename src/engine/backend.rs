//! Browser-engine collaborator interface
//!
//! Creation is asynchronous: the engine reports each step through a
//! [`Completions`] sink, which queues the result on the UI thread. The step
//! may finish inside the call that started it or on any later loop turn.

use super::resource::{ResourceRequest, ResourceResponse};
use crate::config::EngineSettings;
use crate::platform::{Bounds, WindowHandle};
use crate::ui::{EventSender, LocalEvent, LocalQueue};
use crate::utils::EngineError;
use std::fmt;

/// Receives text posted by page script
pub type MessageHandler = Box<dyn FnMut(&str)>;

/// Decides whether a resource load gets a synthetic response
pub type ResourceHandler = Box<dyn FnMut(&ResourceRequest) -> Option<ResourceResponse>>;

/// Entry point of a browser engine.
///
/// Every method runs on the UI thread. An engine that finishes creation
/// steps later keeps their [`Completions`] on the UI thread, calls
/// [`EventSender::wake`] from wherever it learns a step is done, and fires
/// the completions from [`BrowserEngine::poll`].
pub trait BrowserEngine {
    /// Receive the loop's waker. Called once, before any other method.
    fn bind(&mut self, _waker: EventSender) {}

    /// Run deferred work after a wake-up
    fn poll(&mut self) {}

    /// Begin creating a rendering environment for `window`. An `Err` means
    /// the request was rejected outright and `completions` will not fire.
    fn create_environment(
        &mut self,
        window: WindowHandle,
        completions: Completions,
    ) -> Result<(), EngineError>;
}

/// Rendering environment able to create browser instances
#[cfg_attr(test, mockall::automock)]
pub trait Environment {
    /// Begin creating a browser instance attached to `window`
    fn create_browser(&mut self, window: WindowHandle, completions: Completions);
}

/// A browser instance hosted in a window
#[cfg_attr(test, mockall::automock)]
pub trait BrowserView {
    fn apply_settings(&mut self, settings: &EngineSettings);

    /// Run `script` at the start of every document
    fn add_script_on_document_created(&mut self, script: &str);

    fn set_message_handler(&mut self, handler: MessageHandler);

    fn set_resource_handler(&mut self, handler: ResourceHandler);

    /// Position the rendered content inside the window
    fn set_bounds(&mut self, bounds: Bounds);

    fn navigate(&mut self, url: &str);

    fn navigate_to_string(&mut self, html: &str);

    /// Deliver `message` to page script
    fn post_message(&mut self, message: &str);
}

/// Completion results delivered back to the engine host
pub enum EngineEvent {
    EnvironmentCreated(Result<Box<dyn Environment>, EngineError>),
    BrowserCreated(Result<Box<dyn BrowserView>, EngineError>),
    /// A [`Completions`] sink was dropped unused
    Abandoned,
}

impl fmt::Debug for EngineEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EnvironmentCreated(Ok(_)) => write!(f, "EnvironmentCreated(Ok)"),
            Self::EnvironmentCreated(Err(e)) => write!(f, "EnvironmentCreated(Err({}))", e),
            Self::BrowserCreated(Ok(_)) => write!(f, "BrowserCreated(Ok)"),
            Self::BrowserCreated(Err(e)) => write!(f, "BrowserCreated(Err({}))", e),
            Self::Abandoned => write!(f, "Abandoned"),
        }
    }
}

/// One-shot sink for an asynchronous creation step.
///
/// Dropping it unused queues [`EngineEvent::Abandoned`] so the window does
/// not wait forever on a step that will never finish.
pub struct Completions {
    window: WindowHandle,
    queue: Option<LocalQueue>,
}

impl Completions {
    pub(crate) fn new(window: WindowHandle, queue: LocalQueue) -> Self {
        Self {
            window,
            queue: Some(queue),
        }
    }

    /// Window the pending step belongs to
    pub fn window(&self) -> WindowHandle {
        self.window
    }

    pub fn environment_created(mut self, result: Result<Box<dyn Environment>, EngineError>) {
        self.complete(EngineEvent::EnvironmentCreated(result));
    }

    pub fn browser_created(mut self, result: Result<Box<dyn BrowserView>, EngineError>) {
        self.complete(EngineEvent::BrowserCreated(result));
    }

    fn complete(&mut self, event: EngineEvent) {
        if let Some(queue) = self.queue.take() {
            queue.post(LocalEvent::Engine {
                window: self.window,
                event,
            });
        }
    }
}

impl Drop for Completions {
    fn drop(&mut self) {
        self.complete(EngineEvent::Abandoned);
    }
}

impl fmt::Debug for Completions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Completions")
            .field("window", &self.window)
            .field("pending", &self.queue.is_some())
            .finish()
    }
}
