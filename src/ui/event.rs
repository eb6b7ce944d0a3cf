//! Events dispatched by the UI event loop
//!
//! Two queues feed the loop. [`RemoteEvent`]s come from any thread through a
//! channel; [`LocalEvent`]s are posted on the UI thread itself by the window
//! system and the browser engine, and may carry values that cannot leave it.

use crate::engine::EngineEvent;
use crate::ipc::{PendingInvocation, Task};
use crate::platform::{Size, WindowHandle};
use crate::utils::{Result, WebWindowError};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;
use std::sync::mpsc::Sender;

/// Dialog icon and tone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Severity {
    #[default]
    Info,
    Warning,
    Error,
}

/// Parameters of a queued modal dialog
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageRequest {
    title: String,
    body: String,
    severity: Severity,
}

impl MessageRequest {
    pub fn new(title: impl Into<String>, body: impl Into<String>, severity: Severity) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            severity,
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }
}

/// Window lifecycle notifications from the window system
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowEvent {
    /// The native window is gone
    Destroyed,
    /// The window now has this outer size
    Resized(Size),
}

/// Requests posted from arbitrary threads
pub(crate) enum RemoteEvent {
    /// Run a task and release the blocked caller
    Invoke {
        window: WindowHandle,
        invocation: PendingInvocation,
    },
    /// Run a task nobody waits on
    Post { window: WindowHandle, task: Task },
    /// Show a modal dialog
    ShowMessage {
        window: WindowHandle,
        request: MessageRequest,
    },
    /// Destroy a window
    Close(WindowHandle),
    /// Lifecycle event the window system raised outside a loop call
    Window {
        window: WindowHandle,
        event: WindowEvent,
    },
    /// The browser engine has deferred work ready to run
    Wake,
}

impl RemoteEvent {
    /// Window the event is addressed to. `Wake` targets the engine.
    pub(crate) fn window(&self) -> Option<WindowHandle> {
        match self {
            Self::Invoke { window, .. }
            | Self::Post { window, .. }
            | Self::ShowMessage { window, .. }
            | Self::Window { window, .. } => Some(*window),
            Self::Close(window) => Some(*window),
            Self::Wake => None,
        }
    }
}

impl fmt::Debug for RemoteEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Invoke { window, .. } => write!(f, "Invoke({})", window),
            Self::Post { window, .. } => write!(f, "Post({})", window),
            Self::ShowMessage { window, request } => {
                write!(f, "ShowMessage({}, {:?})", window, request.title())
            }
            Self::Close(window) => write!(f, "Close({})", window),
            Self::Window { window, event } => write!(f, "Window({}, {:?})", window, event),
            Self::Wake => write!(f, "Wake"),
        }
    }
}

/// Thread-safe way for backends to reach a loop parked on its queue.
///
/// Window systems report native events through it, and browser engines use
/// [`EventSender::wake`] to get [`BrowserEngine::poll`](crate::engine::BrowserEngine::poll)
/// called on the UI thread, where they can fire stored completions.
#[derive(Clone)]
pub struct EventSender {
    sender: Sender<RemoteEvent>,
}

impl EventSender {
    pub(crate) fn new(sender: Sender<RemoteEvent>) -> Self {
        Self { sender }
    }

    /// Deliver a window lifecycle event from any thread
    pub fn post_window_event(&self, window: WindowHandle, event: WindowEvent) -> Result<()> {
        self.send(RemoteEvent::Window { window, event })
    }

    /// Ask the loop to poll the browser engine on its next turn
    pub fn wake(&self) -> Result<()> {
        self.send(RemoteEvent::Wake)
    }

    fn send(&self, event: RemoteEvent) -> Result<()> {
        self.sender
            .send(event)
            .map_err(|_| WebWindowError::LoopClosed)
    }
}

impl fmt::Debug for EventSender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventSender").finish_non_exhaustive()
    }
}

/// Notifications raised on the UI thread
#[derive(Debug)]
pub enum LocalEvent {
    Window {
        window: WindowHandle,
        event: WindowEvent,
    },
    Engine {
        window: WindowHandle,
        event: EngineEvent,
    },
}

/// FIFO of UI-thread events, shared with the backends that produce them
#[derive(Clone, Default)]
pub struct LocalQueue(Rc<RefCell<VecDeque<LocalEvent>>>);

impl LocalQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report a window lifecycle event
    pub fn post_window_event(&self, window: WindowHandle, event: WindowEvent) {
        self.post(LocalEvent::Window { window, event });
    }

    pub(crate) fn post(&self, event: LocalEvent) {
        self.0.borrow_mut().push_back(event);
    }

    pub(crate) fn pop(&self) -> Option<LocalEvent> {
        self.0.borrow_mut().pop_front()
    }

    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }
}

impl fmt::Debug for LocalQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalQueue").field("len", &self.len()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_queue_is_fifo_across_clones() {
        let queue = LocalQueue::new();
        let producer = queue.clone();
        let a = WindowHandle::from_raw(1);

        producer.post_window_event(a, WindowEvent::Resized(Size::new(10, 10)));
        producer.post_window_event(a, WindowEvent::Destroyed);
        assert_eq!(queue.len(), 2);

        assert!(matches!(
            queue.pop(),
            Some(LocalEvent::Window { event: WindowEvent::Resized(_), .. })
        ));
        assert!(matches!(
            queue.pop(),
            Some(LocalEvent::Window { event: WindowEvent::Destroyed, .. })
        ));
        assert!(queue.pop().is_none());
    }

    #[test]
    fn test_event_sender_crosses_threads() {
        let (sender, receiver) = std::sync::mpsc::channel();
        let events = EventSender::new(sender);
        let a = WindowHandle::from_raw(7);

        std::thread::spawn(move || {
            events.post_window_event(a, WindowEvent::Destroyed).unwrap();
            events.wake().unwrap();
        })
        .join()
        .unwrap();

        let first = receiver.recv().unwrap();
        assert_eq!(first.window(), Some(a));
        assert!(matches!(
            first,
            RemoteEvent::Window { event: WindowEvent::Destroyed, .. }
        ));
        let second = receiver.recv().unwrap();
        assert!(matches!(second, RemoteEvent::Wake));
        assert_eq!(second.window(), None);
    }

    #[test]
    fn test_event_sender_reports_closed_loop() {
        let (sender, receiver) = std::sync::mpsc::channel();
        drop(receiver);
        let events = EventSender::new(sender);
        assert!(matches!(events.wake(), Err(WebWindowError::LoopClosed)));
    }

    #[test]
    fn test_message_request_accessors() {
        let request = MessageRequest::new("Saved", "All changes written", Severity::Info);
        assert_eq!(request.title(), "Saved");
        assert_eq!(request.body(), "All changes written");
        assert_eq!(request.severity(), Severity::Info);
    }
}
