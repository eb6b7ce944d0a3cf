//! Headless backend
//!
//! A complete in-process window system and browser engine with no display.
//! It keeps text in native UTF-16 form like a real platform, completes
//! engine startup either inside the starting call or on later loop turns
//! ([`HeadlessEngine::deferred`]), and exposes probes ([`Desktop`],
//! [`PageDirectory`], [`HeadlessPage`]) that stand in for the user and for
//! page script.

use super::{Bounds, Size, WindowHandle, WindowSystem};
use crate::config::EngineSettings;
use crate::engine::{
    BrowserEngine, BrowserView, Completions, Environment, MessageHandler, ResourceHandler,
    ResourceRequest, ResourceResponse,
};
use crate::ui::{EventSender, LocalQueue, Severity, WindowEvent};
use crate::utils::encoding::NativeString;
use crate::utils::{EngineError, Result, WebWindowError};
use parking_lot::Mutex;
use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

/// First handle value handed out
const FIRST_HANDLE: u64 = 0x1_0000;

/// A dialog the headless window system displayed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dialog {
    pub window: WindowHandle,
    pub title: String,
    pub body: String,
    pub severity: Severity,
}

struct NativeWindow {
    title: NativeString,
    parent: Option<WindowHandle>,
    size: Size,
    visible: bool,
}

#[derive(Default)]
struct DesktopState {
    next_id: u64,
    windows: BTreeMap<WindowHandle, NativeWindow>,
    dialogs: Vec<Dialog>,
    native: Option<EventSender>,
}

impl DesktopState {
    /// Remove `window` and everything it owns, owner first
    fn remove_tree(&mut self, window: WindowHandle) -> Vec<WindowHandle> {
        if !self.windows.contains_key(&window) {
            return Vec::new();
        }
        let mut doomed = vec![window];
        let mut next = 0;
        while next < doomed.len() {
            let owner = doomed[next];
            doomed.extend(
                self.windows
                    .iter()
                    .filter(|(_, w)| w.parent == Some(owner))
                    .map(|(handle, _)| *handle),
            );
            next += 1;
        }
        for handle in &doomed {
            self.windows.remove(handle);
        }
        doomed
    }

    /// Report an event the way the platform does outside loop calls
    fn notify(&self, window: WindowHandle, event: WindowEvent) {
        let Some(native) = &self.native else {
            return;
        };
        if let Err(e) = native.post_window_event(window, event) {
            log::debug!("[headless] {:?} for {} not delivered: {}", event, window, e);
        }
    }
}

/// View of the headless window system's state, and the user's hands on it
#[derive(Clone, Default)]
pub struct Desktop(Rc<RefCell<DesktopState>>);

impl Desktop {
    pub fn exists(&self, window: WindowHandle) -> bool {
        self.0.borrow().windows.contains_key(&window)
    }

    pub fn window_count(&self) -> usize {
        self.0.borrow().windows.len()
    }

    pub fn title(&self, window: WindowHandle) -> Option<String> {
        self.0.borrow().windows.get(&window).map(|w| w.title.to_host())
    }

    pub fn size(&self, window: WindowHandle) -> Option<Size> {
        self.0.borrow().windows.get(&window).map(|w| w.size)
    }

    pub fn is_visible(&self, window: WindowHandle) -> bool {
        self.0
            .borrow()
            .windows
            .get(&window)
            .is_some_and(|w| w.visible)
    }

    /// Every dialog shown so far, oldest first
    pub fn dialogs(&self) -> Vec<Dialog> {
        self.0.borrow().dialogs.clone()
    }

    /// The user closes `window`. The loop hears about it on its next turn.
    pub fn user_close(&self, window: WindowHandle) {
        let mut state = self.0.borrow_mut();
        for handle in state.remove_tree(window) {
            state.notify(handle, WindowEvent::Destroyed);
        }
    }

    /// The user drags `window` to a new size
    pub fn user_resize(&self, window: WindowHandle, size: Size) {
        let mut state = self.0.borrow_mut();
        if let Some(w) = state.windows.get_mut(&window) {
            w.size = size;
            state.notify(window, WindowEvent::Resized(size));
        }
    }
}

impl fmt::Debug for Desktop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Desktop")
            .field("windows", &self.window_count())
            .finish()
    }
}

/// Window system that keeps windows in memory
#[derive(Default)]
pub struct HeadlessWindows {
    desktop: Desktop,
    events: Option<LocalQueue>,
}

impl HeadlessWindows {
    pub fn new() -> Self {
        Self::default()
    }

    /// Probe sharing this window system's state
    pub fn desktop(&self) -> Desktop {
        self.desktop.clone()
    }

    fn post(&self, window: WindowHandle, event: WindowEvent) {
        if let Some(events) = &self.events {
            events.post_window_event(window, event);
        }
    }
}

impl WindowSystem for HeadlessWindows {
    fn bind(&mut self, events: LocalQueue, native: EventSender) {
        self.events = Some(events);
        self.desktop.0.borrow_mut().native = Some(native);
    }

    fn create_window(
        &mut self,
        title: &str,
        size: Size,
        parent: Option<WindowHandle>,
    ) -> Result<WindowHandle> {
        let mut state = self.desktop.0.borrow_mut();
        if let Some(parent) = parent {
            if !state.windows.contains_key(&parent) {
                return Err(WebWindowError::Platform(format!(
                    "parent window {} does not exist",
                    parent
                )));
            }
        }
        let handle = WindowHandle::from_raw(FIRST_HANDLE + state.next_id);
        state.next_id += 1;
        state.windows.insert(
            handle,
            NativeWindow {
                title: NativeString::from_host(title),
                parent,
                size,
                visible: false,
            },
        );
        Ok(handle)
    }

    /// Owned windows are destroyed along with their owner, owner first
    fn destroy_window(&mut self, window: WindowHandle) {
        let doomed = self.desktop.0.borrow_mut().remove_tree(window);
        for handle in doomed {
            self.post(handle, WindowEvent::Destroyed);
        }
    }

    fn show_window(&mut self, window: WindowHandle) {
        if let Some(w) = self.desktop.0.borrow_mut().windows.get_mut(&window) {
            w.visible = true;
        }
    }

    fn set_title(&mut self, window: WindowHandle, title: &str) {
        if let Some(w) = self.desktop.0.borrow_mut().windows.get_mut(&window) {
            w.title = NativeString::from_host(title);
        }
    }

    fn set_size(&mut self, window: WindowHandle, size: Size) {
        let resized = match self.desktop.0.borrow_mut().windows.get_mut(&window) {
            Some(w) => {
                w.size = size;
                true
            }
            None => false,
        };
        if resized {
            self.post(window, WindowEvent::Resized(size));
        }
    }

    fn client_bounds(&self, window: WindowHandle) -> Bounds {
        self.desktop
            .0
            .borrow()
            .windows
            .get(&window)
            .map(|w| Bounds::from_size(w.size))
            .unwrap_or_default()
    }

    fn message_box(&mut self, window: WindowHandle, title: &str, body: &str, severity: Severity) {
        log::debug!("[headless] dialog on {}: {}", window, title);
        self.desktop.0.borrow_mut().dialogs.push(Dialog {
            window,
            title: NativeString::from_host(title).to_host(),
            body: NativeString::from_host(body).to_host(),
            severity,
        });
    }
}

/// Where the headless engine's startup should break
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    /// `create_environment` refuses the request synchronously
    EnvironmentRejected,
    /// The environment completion reports an error
    EnvironmentFailed,
    /// The browser completion reports an error
    BrowserFailed,
}

#[derive(Default)]
struct GateState {
    open: bool,
    waker: Option<EventSender>,
}

/// Holds back a deferred engine's creation steps until opened.
///
/// Cloneable and `Send`, so any thread can release a loop that is parked
/// waiting for startup.
#[derive(Clone, Default)]
pub struct StartupGate(Arc<Mutex<GateState>>);

impl StartupGate {
    /// Let pending and future steps complete on the loop's next turns
    pub fn open(&self) {
        let mut state = self.0.lock();
        state.open = true;
        Self::wake(&state);
    }

    pub fn is_open(&self) -> bool {
        self.0.lock().open
    }

    fn attach(&self, waker: EventSender) {
        self.0.lock().waker = Some(waker);
    }

    fn wake_if_open(&self) {
        let state = self.0.lock();
        if state.open {
            Self::wake(&state);
        }
    }

    fn wake(state: &GateState) {
        if let Some(waker) = &state.waker {
            if let Err(e) = waker.wake() {
                log::debug!("[headless] wake-up not delivered: {}", e);
            }
        }
    }
}

impl fmt::Debug for StartupGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StartupGate")
            .field("open", &self.is_open())
            .finish()
    }
}

type Step = Box<dyn FnOnce()>;

/// Creation steps parked on the UI thread until the gate lets them run
#[derive(Clone, Default)]
struct Deferral {
    gate: StartupGate,
    steps: Rc<RefCell<VecDeque<Step>>>,
}

impl Deferral {
    fn schedule(&self, step: Step) {
        self.steps.borrow_mut().push_back(step);
        self.gate.wake_if_open();
    }

    fn run_ready(&self) {
        if !self.gate.is_open() {
            return;
        }
        loop {
            let step = self.steps.borrow_mut().pop_front();
            match step {
                Some(step) => step(),
                None => break,
            }
        }
    }
}

/// Finish `step` now, or on a later loop turn when deferring
fn complete(deferral: Option<&Deferral>, step: Step) {
    match deferral {
        Some(deferral) => deferral.schedule(step),
        None => step(),
    }
}

/// Browser engine that renders nothing but honours the full protocol
#[derive(Default)]
pub struct HeadlessEngine {
    pages: PageDirectory,
    failure: Option<Failure>,
    deferral: Option<Deferral>,
}

impl HeadlessEngine {
    /// An engine that completes each creation step inside the call that
    /// starts it
    pub fn new() -> Self {
        Self::default()
    }

    /// An engine whose startup fails at `failure`
    pub fn failing(failure: Failure) -> Self {
        Self {
            failure: Some(failure),
            ..Self::default()
        }
    }

    /// An engine that completes creation steps on later loop turns, and
    /// only once the returned gate is open
    pub fn deferred() -> (Self, StartupGate) {
        let deferral = Deferral::default();
        let gate = deferral.gate.clone();
        let engine = Self {
            deferral: Some(deferral),
            ..Self::default()
        };
        (engine, gate)
    }

    /// Probe for the pages this engine creates
    pub fn pages(&self) -> PageDirectory {
        self.pages.clone()
    }
}

impl BrowserEngine for HeadlessEngine {
    fn bind(&mut self, waker: EventSender) {
        if let Some(deferral) = &self.deferral {
            deferral.gate.attach(waker);
        }
    }

    fn poll(&mut self) {
        if let Some(deferral) = &self.deferral {
            deferral.run_ready();
        }
    }

    fn create_environment(
        &mut self,
        _window: WindowHandle,
        completions: Completions,
    ) -> std::result::Result<(), EngineError> {
        let deferral = self.deferral.as_ref();
        match self.failure {
            Some(Failure::EnvironmentRejected) => {
                Err(EngineError::new("no browser runtime is installed"))
            }
            Some(Failure::EnvironmentFailed) => {
                complete(
                    deferral,
                    Box::new(move || {
                        completions.environment_created(Err(EngineError::new(
                            "the browser environment could not be initialised",
                        )))
                    }),
                );
                Ok(())
            }
            _ => {
                let environment = HeadlessEnvironment {
                    pages: self.pages.clone(),
                    fail_browser: self.failure == Some(Failure::BrowserFailed),
                    deferral: self.deferral.clone(),
                };
                complete(
                    deferral,
                    Box::new(move || completions.environment_created(Ok(Box::new(environment)))),
                );
                Ok(())
            }
        }
    }
}

struct HeadlessEnvironment {
    pages: PageDirectory,
    fail_browser: bool,
    deferral: Option<Deferral>,
}

impl Environment for HeadlessEnvironment {
    fn create_browser(&mut self, window: WindowHandle, completions: Completions) {
        if self.fail_browser {
            complete(
                self.deferral.as_ref(),
                Box::new(move || {
                    completions.browser_created(Err(EngineError::new("the browser process exited")))
                }),
            );
            return;
        }
        let pages = self.pages.clone();
        complete(
            self.deferral.as_ref(),
            Box::new(move || {
                let page = HeadlessPage::default();
                pages.0.borrow_mut().insert(window, page.clone());
                completions.browser_created(Ok(Box::new(HeadlessView { page })));
            }),
        );
    }
}

/// Pages created by a [`HeadlessEngine`], keyed by window
#[derive(Clone, Default)]
pub struct PageDirectory(Rc<RefCell<HashMap<WindowHandle, HeadlessPage>>>);

impl PageDirectory {
    pub fn page(&self, window: WindowHandle) -> Option<HeadlessPage> {
        self.0.borrow().get(&window).cloned()
    }

    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }
}

/// What the page is displaying
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    Url(String),
    Document(String),
}

/// Outcome of a resource load as seen by the page
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceLoad {
    /// The host supplied this response
    Synthetic(ResourceResponse),
    /// The engine loaded the resource itself
    Default,
}

#[derive(Default)]
struct PageState {
    settings: Cell<Option<EngineSettings>>,
    scripts: RefCell<Vec<NativeString>>,
    bounds: Cell<Bounds>,
    location: RefCell<Option<Location>>,
    inbox: RefCell<Vec<NativeString>>,
    message_handler: RefCell<Option<MessageHandler>>,
    resource_handler: RefCell<Option<ResourceHandler>>,
    closed: Cell<bool>,
}

/// The document inside one headless browser instance, seen from page script
#[derive(Clone, Default)]
pub struct HeadlessPage(Rc<PageState>);

impl HeadlessPage {
    /// Settings the host applied, if any
    pub fn settings(&self) -> Option<EngineSettings> {
        self.0.settings.get()
    }

    /// Scripts registered to run on document creation
    pub fn scripts(&self) -> Vec<String> {
        self.0.scripts.borrow().iter().map(NativeString::to_host).collect()
    }

    pub fn bounds(&self) -> Bounds {
        self.0.bounds.get()
    }

    pub fn location(&self) -> Option<Location> {
        self.0.location.borrow().clone()
    }

    /// Messages the host delivered to page script, oldest first
    pub fn received(&self) -> Vec<String> {
        self.0.inbox.borrow().iter().map(NativeString::to_host).collect()
    }

    /// The browser instance was torn down with its window
    pub fn is_closed(&self) -> bool {
        self.0.closed.get()
    }

    /// Page script calls `window.external.sendMessage(message)`.
    /// Returns whether the host received it.
    pub fn post_to_host(&self, message: &str) -> bool {
        if self.is_closed() || !self.messaging_enabled() || !self.has_bridge() {
            return false;
        }
        let native = NativeString::from_host(message);
        with_handler(&self.0.message_handler, |handler| handler(&native.to_host())).is_some()
    }

    /// The page references `uri`
    pub fn request(&self, uri: &str) -> ResourceLoad {
        if self.is_closed() {
            return ResourceLoad::Default;
        }
        let request = ResourceRequest::new(NativeString::from_host(uri).to_host());
        match with_handler(&self.0.resource_handler, |handler| handler(&request)) {
            Some(Some(response)) => ResourceLoad::Synthetic(response),
            _ => ResourceLoad::Default,
        }
    }

    fn messaging_enabled(&self) -> bool {
        self.settings().is_some_and(|s| s.web_message_enabled)
    }

    fn has_bridge(&self) -> bool {
        self.0
            .scripts
            .borrow()
            .iter()
            .any(|script| script.to_host().contains("sendMessage"))
    }

    fn close(&self) {
        self.0.closed.set(true);
        self.0.message_handler.borrow_mut().take();
        self.0.resource_handler.borrow_mut().take();
    }
}

impl fmt::Debug for HeadlessPage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HeadlessPage")
            .field("location", &self.location())
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// Call the handler in `slot` without holding the borrow, so the handler
/// may replace itself.
fn with_handler<H, R>(slot: &RefCell<Option<H>>, call: impl FnOnce(&mut H) -> R) -> Option<R> {
    let mut handler = slot.borrow_mut().take()?;
    let result = call(&mut handler);
    let mut slot = slot.borrow_mut();
    if slot.is_none() {
        *slot = Some(handler);
    }
    Some(result)
}

struct HeadlessView {
    page: HeadlessPage,
}

impl BrowserView for HeadlessView {
    fn apply_settings(&mut self, settings: &EngineSettings) {
        self.page.0.settings.set(Some(*settings));
    }

    fn add_script_on_document_created(&mut self, script: &str) {
        self.page.0.scripts.borrow_mut().push(NativeString::from_host(script));
    }

    fn set_message_handler(&mut self, handler: MessageHandler) {
        *self.page.0.message_handler.borrow_mut() = Some(handler);
    }

    fn set_resource_handler(&mut self, handler: ResourceHandler) {
        *self.page.0.resource_handler.borrow_mut() = Some(handler);
    }

    fn set_bounds(&mut self, bounds: Bounds) {
        self.page.0.bounds.set(bounds);
    }

    fn navigate(&mut self, url: &str) {
        *self.page.0.location.borrow_mut() = Some(Location::Url(url.to_string()));
    }

    fn navigate_to_string(&mut self, html: &str) {
        *self.page.0.location.borrow_mut() = Some(Location::Document(html.to_string()));
    }

    fn post_message(&mut self, message: &str) {
        if self.page.messaging_enabled() {
            self.page.0.inbox.borrow_mut().push(NativeString::from_host(message));
        }
    }
}

impl Drop for HeadlessView {
    fn drop(&mut self) {
        self.page.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::EngineEvent;
    use crate::ui::{LocalEvent, RemoteEvent};
    use std::sync::mpsc::{Receiver, channel};

    fn bound() -> (HeadlessWindows, LocalQueue) {
        let (windows, queue, _native) = bound_with_native();
        (windows, queue)
    }

    fn bound_with_native() -> (HeadlessWindows, LocalQueue, Receiver<RemoteEvent>) {
        let mut windows = HeadlessWindows::new();
        let queue = LocalQueue::new();
        let (sender, receiver) = channel();
        windows.bind(queue.clone(), EventSender::new(sender));
        (windows, queue, receiver)
    }

    fn drain(queue: &LocalQueue) -> Vec<(WindowHandle, WindowEvent)> {
        let mut events = Vec::new();
        while let Some(event) = queue.pop() {
            if let LocalEvent::Window { window, event } = event {
                events.push((window, event));
            }
        }
        events
    }

    #[test]
    fn test_titles_round_trip_through_native_form() {
        let (mut windows, _queue) = bound();
        let desktop = windows.desktop();
        let window = windows
            .create_window("Grüße 🚀", Size::new(100, 100), None)
            .unwrap();
        assert_eq!(desktop.title(window).as_deref(), Some("Grüße 🚀"));
        assert!(!desktop.is_visible(window));
        windows.show_window(window);
        assert!(desktop.is_visible(window));
    }

    #[test]
    fn test_destroy_cascades_to_owned_windows() {
        let (mut windows, queue) = bound();
        let desktop = windows.desktop();
        let owner = windows.create_window("owner", Size::default(), None).unwrap();
        let child = windows.create_window("child", Size::default(), Some(owner)).unwrap();
        let grandchild = windows
            .create_window("grandchild", Size::default(), Some(child))
            .unwrap();
        let unrelated = windows.create_window("unrelated", Size::default(), None).unwrap();

        windows.destroy_window(owner);

        let destroyed: Vec<_> = drain(&queue).into_iter().map(|(w, _)| w).collect();
        assert_eq!(destroyed, vec![owner, child, grandchild]);
        assert!(desktop.exists(unrelated));
        assert_eq!(desktop.window_count(), 1);

        // Destroying twice is harmless
        windows.destroy_window(owner);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_child_of_missing_parent_is_refused() {
        let (mut windows, _queue) = bound();
        let orphan_of = Some(WindowHandle::from_raw(5));
        let result = windows.create_window("orphan", Size::default(), orphan_of);
        assert!(matches!(result, Err(WebWindowError::Platform(_))));
    }

    #[test]
    fn test_resize_reports_event_and_bounds() {
        let (mut windows, queue) = bound();
        let window = windows.create_window("w", Size::new(10, 10), None).unwrap();
        windows.set_size(window, Size::new(300, 200));

        assert_eq!(
            drain(&queue),
            vec![(window, WindowEvent::Resized(Size::new(300, 200)))]
        );
        assert_eq!(windows.client_bounds(window), Bounds::new(0, 0, 300, 200));
        assert_eq!(windows.client_bounds(WindowHandle::from_raw(1)), Bounds::default());
    }

    #[test]
    fn test_page_without_bridge_cannot_post() {
        let page = HeadlessPage::default();
        assert!(!page.post_to_host("hi"));
        assert_eq!(page.request("app://x"), ResourceLoad::Default);
    }

    #[test]
    fn test_dropped_view_closes_page() {
        let page = HeadlessPage::default();
        let mut view = HeadlessView { page: page.clone() };
        view.apply_settings(&EngineSettings::default());
        view.add_script_on_document_created(crate::engine::BOOTSTRAP_SCRIPT);
        view.set_resource_handler(Box::new(|request: &ResourceRequest| {
            Some(ResourceResponse::ok(request.uri().as_bytes().to_vec(), "text/plain"))
        }));
        assert!(matches!(page.request("app://echo"), ResourceLoad::Synthetic(_)));

        drop(view);
        assert!(page.is_closed());
        assert_eq!(page.request("app://echo"), ResourceLoad::Default);
        assert!(!page.post_to_host("late"));
    }

    #[test]
    fn test_messages_to_page_respect_settings() {
        let page = HeadlessPage::default();
        let mut view = HeadlessView { page: page.clone() };
        view.post_message("before settings");
        view.apply_settings(&EngineSettings {
            web_message_enabled: true,
            ..EngineSettings::default()
        });
        view.post_message("after settings");
        assert_eq!(page.received(), vec!["after settings".to_string()]);
    }

    #[test]
    fn test_user_actions_arrive_through_native_channel() {
        let (mut windows, queue, native) = bound_with_native();
        let desktop = windows.desktop();
        let owner = windows.create_window("owner", Size::new(10, 10), None).unwrap();
        let child = windows
            .create_window("child", Size::default(), Some(owner))
            .unwrap();

        desktop.user_resize(owner, Size::new(640, 480));
        desktop.user_close(owner);

        assert!(queue.is_empty());
        assert!(!desktop.exists(child));
        let events: Vec<_> = native
            .try_iter()
            .map(|event| match event {
                RemoteEvent::Window { window, event } => (window, event),
                other => panic!("unexpected {:?}", other),
            })
            .collect();
        assert_eq!(
            events,
            vec![
                (owner, WindowEvent::Resized(Size::new(640, 480))),
                (owner, WindowEvent::Destroyed),
                (child, WindowEvent::Destroyed),
            ]
        );
    }

    #[test]
    fn test_deferred_engine_waits_for_gate_and_poll() {
        let (mut engine, gate) = HeadlessEngine::deferred();
        let (sender, native) = channel();
        engine.bind(EventSender::new(sender));
        let queue = LocalQueue::new();
        let window = WindowHandle::from_raw(3);

        engine
            .create_environment(window, Completions::new(window, queue.clone()))
            .unwrap();
        engine.poll();
        assert!(queue.is_empty());
        assert!(native.try_recv().is_err());

        gate.open();
        assert!(matches!(native.try_recv(), Ok(RemoteEvent::Wake)));
        assert!(queue.is_empty());
        engine.poll();
        assert!(matches!(
            queue.pop(),
            Some(LocalEvent::Engine {
                event: EngineEvent::EnvironmentCreated(Ok(_)),
                ..
            })
        ));
    }
}
