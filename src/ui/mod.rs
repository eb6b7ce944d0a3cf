//! UI event loop
//!
//! [`Ui`] owns every window, the window system and the browser engine. It
//! lives on one thread: all window mutation, browser interaction and scheme
//! handler calls happen there. Other threads reach it through
//! [`LoopProxy`](crate::ipc::LoopProxy).

mod event;
mod registry;
mod window;

pub use event::{EventSender, LocalEvent, LocalQueue, MessageRequest, Severity, WindowEvent};
pub(crate) use event::RemoteEvent;

use crate::config::{EngineSettings, WindowConfig};
use crate::engine::{
    BrowserEngine, BrowserView, Completions, EngineEvent, EngineStatus, MessageCallback,
    SchemeResponse,
};
use crate::ipc::LoopProxy;
use crate::platform::{Size, WindowHandle, WindowSystem};
use crate::utils::{EngineError, Result, WebWindowError};
use registry::WindowRegistry;
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::mpsc::{Receiver, Sender, channel};
use std::thread::{self, ThreadId};
use window::WebWindow;

/// Title of the dialog shown when a browser instance cannot be created
pub const ENGINE_FAILURE_TITLE: &str = "Error instantiating webview";

/// Why [`Ui::pump_until`] returned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pump {
    /// The predicate became true
    Satisfied,
    /// The loop is terminating and every queued event has been handled
    Exhausted,
}

enum Event {
    Local(LocalEvent),
    Remote(RemoteEvent),
}

/// The UI thread's event loop and window owner
pub struct Ui {
    windows: Box<dyn WindowSystem>,
    engine: Box<dyn BrowserEngine>,
    registry: WindowRegistry,
    settings: EngineSettings,
    local: LocalQueue,
    sender: Sender<RemoteEvent>,
    receiver: Receiver<RemoteEvent>,
    ui_thread: ThreadId,
    root: Option<WindowHandle>,
    terminating: bool,
}

impl Ui {
    /// Create the loop on the current thread, which becomes the UI thread
    pub fn new(windows: impl WindowSystem + 'static, engine: impl BrowserEngine + 'static) -> Self {
        Self::with_settings(windows, engine, EngineSettings::default())
    }

    /// Create the loop with custom browser settings
    pub fn with_settings(
        windows: impl WindowSystem + 'static,
        engine: impl BrowserEngine + 'static,
        settings: EngineSettings,
    ) -> Self {
        let local = LocalQueue::new();
        let (sender, receiver) = channel();
        let mut windows: Box<dyn WindowSystem> = Box::new(windows);
        windows.bind(local.clone(), EventSender::new(sender.clone()));
        let mut engine: Box<dyn BrowserEngine> = Box::new(engine);
        engine.bind(EventSender::new(sender.clone()));

        Self {
            windows,
            engine,
            registry: WindowRegistry::new(),
            settings,
            local,
            sender,
            receiver,
            ui_thread: thread::current().id(),
            root: None,
            terminating: false,
        }
    }

    /// Handle for reaching this loop from other threads
    pub fn proxy(&self) -> LoopProxy {
        LoopProxy::new(self.sender.clone(), self.ui_thread)
    }

    /// Create a window. `on_message` receives every message page script
    /// sends once the window's browser is ready.
    pub fn create_window(
        &mut self,
        config: &WindowConfig,
        parent: Option<WindowHandle>,
        on_message: impl FnMut(&str) + 'static,
    ) -> Result<WindowHandle> {
        if let Some(parent) = parent {
            self.window(parent)?;
        }
        let handle = self
            .windows
            .create_window(&config.title, config.size(), parent)?;
        let on_message: MessageCallback = Rc::new(RefCell::new(on_message));
        self.registry
            .insert(handle, WebWindow::new(config.title.clone(), parent, on_message));
        log::debug!("[ui] created window {} '{}'", handle, config.title);
        Ok(handle)
    }

    pub fn contains(&self, window: WindowHandle) -> bool {
        self.registry.contains(window)
    }

    /// Number of live windows
    pub fn window_count(&self) -> usize {
        self.registry.len()
    }

    /// Handles of all live windows, in no particular order
    pub fn window_handles(&self) -> Vec<WindowHandle> {
        self.registry.handles().collect()
    }

    pub fn title(&self, window: WindowHandle) -> Result<&str> {
        Ok(&self.window(window)?.title)
    }

    pub fn parent(&self, window: WindowHandle) -> Result<Option<WindowHandle>> {
        Ok(self.window(window)?.parent)
    }

    pub fn set_title(&mut self, window: WindowHandle, title: &str) -> Result<()> {
        self.window_mut(window)?.title = title.to_string();
        self.windows.set_title(window, title);
        Ok(())
    }

    pub fn engine_status(&self, window: WindowHandle) -> Result<EngineStatus> {
        Ok(self.window(window)?.host.status())
    }

    /// Show the window. The first call also creates its browser instance
    /// and keeps pumping the event queue until that browser is ready, so it
    /// returns with the browser usable.
    pub fn show(&mut self, window: WindowHandle) -> Result<()> {
        let status = self.engine_status(window)?;
        self.windows.show_window(window);

        if status == EngineStatus::Uncreated {
            let local = self.local.clone();
            let entry = self
                .registry
                .get_mut(window)
                .ok_or(WebWindowError::UnknownWindow(window))?;
            let started = entry
                .host
                .begin(window, self.engine.as_mut(), || Completions::new(window, local));
            if let Err(err) = started {
                self.report_engine_failure(window, &err);
                return Err(err.into());
            }
        }

        let pump = self.pump_until(|ui| {
            ui.registry
                .get(window)
                .is_none_or(|entry| entry.host.status().is_settled())
        });

        match self.registry.get(window).map(|entry| entry.host.status()) {
            None => Err(WebWindowError::UnknownWindow(window)),
            Some(EngineStatus::Ready) => Ok(()),
            Some(EngineStatus::Failed) => Err(WebWindowError::EngineUnavailable(window)),
            Some(status) => {
                log::warn!(
                    "[ui] queue exhausted with window {} still {:?} ({:?})",
                    window,
                    status,
                    pump
                );
                Err(WebWindowError::EngineStartup(window))
            }
        }
    }

    /// Ask the window system to resize the window
    pub fn resize(&mut self, window: WindowHandle, size: Size) -> Result<()> {
        self.window(window)?;
        self.windows.set_size(window, size);
        Ok(())
    }

    /// Destroy the window and the windows it owns. When this returns their
    /// registry entries and browser instances are gone.
    pub fn destroy(&mut self, window: WindowHandle) -> Result<()> {
        self.window(window)?;
        self.destroy_native(window);
        Ok(())
    }

    pub fn navigate(&mut self, window: WindowHandle, url: &str) -> Result<()> {
        url::Url::parse(url).map_err(|source| WebWindowError::InvalidUrl {
            url: url.to_string(),
            source,
        })?;
        self.view_mut(window)?.navigate(url);
        Ok(())
    }

    pub fn navigate_to_string(&mut self, window: WindowHandle, html: &str) -> Result<()> {
        self.view_mut(window)?.navigate_to_string(html);
        Ok(())
    }

    /// Deliver a message to page script
    pub fn send_message(&mut self, window: WindowHandle, message: &str) -> Result<()> {
        self.view_mut(window)?.post_message(message);
        Ok(())
    }

    /// Serve requests for `scheme` from `handler`, replacing any previous
    /// handler for it. The handler stays installed for the window's lifetime.
    pub fn add_custom_scheme(
        &mut self,
        window: WindowHandle,
        scheme: impl Into<String>,
        handler: impl FnMut(&str) -> Option<SchemeResponse> + 'static,
    ) -> Result<()> {
        let scheme = scheme.into();
        let entry = self.window(window)?;
        log::debug!("[ui] window {} serves scheme '{}'", window, scheme);
        entry.schemes.borrow_mut().register(scheme, Box::new(handler));
        Ok(())
    }

    /// Queue a modal dialog; it is displayed when the loop reaches it
    pub fn show_message(
        &self,
        window: WindowHandle,
        title: impl Into<String>,
        body: impl Into<String>,
        severity: Severity,
    ) -> Result<()> {
        self.window(window)?;
        self.sender
            .send(RemoteEvent::ShowMessage {
                window,
                request: MessageRequest::new(title, body, severity),
            })
            .map_err(|_| WebWindowError::LoopClosed)
    }

    /// Whether the root window is gone and the loop is draining
    pub fn is_terminating(&self) -> bool {
        self.terminating
    }

    /// Dispatch events until `done` holds or the loop runs dry.
    ///
    /// Blocks while the queues are empty. After the root window is
    /// destroyed, already-queued events are still handled and then
    /// [`Pump::Exhausted`] is returned.
    pub fn pump_until(&mut self, mut done: impl FnMut(&Ui) -> bool) -> Pump {
        loop {
            if done(self) {
                return Pump::Satisfied;
            }
            match self.next_event() {
                Some(Event::Local(event)) => self.dispatch_local(event),
                Some(Event::Remote(event)) => self.dispatch_remote(event),
                None => return Pump::Exhausted,
            }
        }
    }

    /// Run the loop until `root` is destroyed and the queue drained
    pub fn run(mut self, root: WindowHandle) -> Result<()> {
        self.window(root)?;
        self.root = Some(root);
        log::info!("[ui] event loop running with root window {}", root);
        self.pump_until(|_| false);
        log::info!("[ui] event loop finished");
        Ok(())
    }

    fn window(&self, window: WindowHandle) -> Result<&WebWindow> {
        self.registry
            .get(window)
            .ok_or(WebWindowError::UnknownWindow(window))
    }

    fn window_mut(&mut self, window: WindowHandle) -> Result<&mut WebWindow> {
        self.registry
            .get_mut(window)
            .ok_or(WebWindowError::UnknownWindow(window))
    }

    fn view_mut(&mut self, window: WindowHandle) -> Result<&mut Box<dyn BrowserView>> {
        let host = &mut self.window_mut(window)?.host;
        let missing = match host.status() {
            EngineStatus::Failed => WebWindowError::EngineUnavailable(window),
            _ => WebWindowError::EngineNotReady(window),
        };
        host.view_mut().ok_or(missing)
    }

    fn next_event(&mut self) -> Option<Event> {
        if let Some(event) = self.local.pop() {
            return Some(Event::Local(event));
        }
        if self.terminating {
            return self.receiver.try_recv().ok().map(Event::Remote);
        }
        self.receiver.recv().ok().map(Event::Remote)
    }

    fn dispatch_remote(&mut self, event: RemoteEvent) {
        let Some(window) = event.window() else {
            self.engine.poll();
            return;
        };
        if !self.registry.contains(window) {
            log::warn!("[ui] dropping {:?}: window {} is gone", event, window);
            return;
        }
        match event {
            RemoteEvent::Invoke { invocation, .. } => invocation.run(self),
            RemoteEvent::Post { task, .. } => task(self),
            RemoteEvent::ShowMessage { request, .. } => {
                self.windows
                    .message_box(window, request.title(), request.body(), request.severity());
            }
            RemoteEvent::Close(_) => self.destroy_native(window),
            RemoteEvent::Window { event, .. } => {
                self.dispatch_local(LocalEvent::Window { window, event })
            }
            RemoteEvent::Wake => self.engine.poll(),
        }
    }

    /// Destroy the native window, then handle the lifecycle events it raised
    /// so the registry matches the window system again.
    fn destroy_native(&mut self, window: WindowHandle) {
        self.windows.destroy_window(window);
        while let Some(event) = self.local.pop() {
            self.dispatch_local(event);
        }
    }

    fn dispatch_local(&mut self, event: LocalEvent) {
        match event {
            LocalEvent::Window {
                window,
                event: WindowEvent::Destroyed,
            } => self.on_destroyed(window),
            LocalEvent::Window {
                window,
                event: WindowEvent::Resized(_),
            } => self.refit(window),
            LocalEvent::Engine { window, event } => self.on_engine_event(window, event),
        }
    }

    fn on_destroyed(&mut self, window: WindowHandle) {
        if self.registry.remove(window).is_some() {
            log::debug!("[ui] window {} destroyed", window);
        }
        if self.root == Some(window) {
            log::debug!("[ui] root window gone, draining queue");
            self.terminating = true;
        }
    }

    fn refit(&mut self, window: WindowHandle) {
        let bounds = self.windows.client_bounds(window);
        if let Some(entry) = self.registry.get_mut(window) {
            entry.host.refit(bounds);
        }
    }

    fn on_engine_event(&mut self, window: WindowHandle, event: EngineEvent) {
        let Some(entry) = self.registry.get_mut(window) else {
            log::debug!("[engine] {:?} arrived after window {} was destroyed", event, window);
            return;
        };
        let result = match event {
            EngineEvent::EnvironmentCreated(result) => {
                let local = self.local.clone();
                entry
                    .host
                    .environment_created(window, result, || Completions::new(window, local))
            }
            EngineEvent::BrowserCreated(result) => {
                let wiring = entry.wiring(self.settings, self.windows.client_bounds(window));
                entry.host.browser_created(result, wiring)
            }
            EngineEvent::Abandoned => entry.host.abandoned(),
        };
        let ready = entry.host.status() == EngineStatus::Ready;
        match result {
            Ok(()) if ready => log::debug!("[engine] browser ready in window {}", window),
            Ok(()) => {}
            Err(err) => self.report_engine_failure(window, &err),
        }
    }

    fn report_engine_failure(&mut self, window: WindowHandle, err: &EngineError) {
        log::warn!("[engine] window {}: {}", window, err);
        self.windows
            .message_box(window, ENGINE_FAILURE_TITLE, err.message(), Severity::Error);
    }
}
