//! Cross-thread invoker
//!
//! Work is posted into the UI thread's queue as a boxed closure paired with
//! a [`Signal`]. The UI thread runs the closure and raises the signal; the
//! calling thread stays blocked in [`LoopProxy::invoke`] until then.

use super::signal::{Completion, Signal};
use crate::platform::WindowHandle;
use crate::ui::{MessageRequest, RemoteEvent, Severity, Ui};
use crate::utils::{Result, WebWindowError};
use std::fmt;
use std::sync::Arc;
use std::sync::mpsc::Sender;
use std::thread::{self, ThreadId};

/// Unit of work executed on the UI thread
pub type Task = Box<dyn FnOnce(&mut Ui) + Send>;

/// A queued invocation waiting for the UI thread.
///
/// Dropping it without running the task abandons the paired signal, so the
/// waiting caller is released with an error instead of hanging.
pub(crate) struct PendingInvocation {
    task: Option<Task>,
    done: Arc<Signal>,
}

impl PendingInvocation {
    pub(crate) fn new(task: Task) -> (Self, Arc<Signal>) {
        let done = Arc::new(Signal::new());
        let invocation = Self {
            task: Some(task),
            done: Arc::clone(&done),
        };
        (invocation, done)
    }

    /// Execute the task on the UI thread, then release the caller
    pub(crate) fn run(mut self, ui: &mut Ui) {
        if let Some(task) = self.task.take() {
            task(ui);
            self.done.signal();
        }
    }
}

impl Drop for PendingInvocation {
    fn drop(&mut self) {
        self.done.abandon();
    }
}

impl fmt::Debug for PendingInvocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingInvocation")
            .field("queued", &self.task.is_some())
            .finish()
    }
}

/// Thread-safe handle for posting work and requests to the UI thread
#[derive(Clone)]
pub struct LoopProxy {
    sender: Sender<RemoteEvent>,
    ui_thread: ThreadId,
}

impl LoopProxy {
    pub(crate) fn new(sender: Sender<RemoteEvent>, ui_thread: ThreadId) -> Self {
        Self { sender, ui_thread }
    }

    /// Run `task` on the UI thread and block until it has finished.
    ///
    /// Tasks from all threads execute one at a time, in the order they were
    /// queued. There is no timeout: a task that never returns blocks the
    /// caller forever. Nothing the task returns or raises is propagated.
    pub fn invoke<F>(&self, window: WindowHandle, task: F) -> Result<()>
    where
        F: FnOnce(&mut Ui) + Send + 'static,
    {
        if self.is_ui_thread() {
            return Err(WebWindowError::InvokeOnUiThread);
        }

        let (invocation, done) = PendingInvocation::new(Box::new(task));
        self.send(RemoteEvent::Invoke { window, invocation })?;

        match done.wait() {
            Completion::Done => Ok(()),
            Completion::Abandoned => Err(WebWindowError::InvocationDropped(window)),
        }
    }

    /// Queue `task` for the UI thread without waiting for it
    pub fn post<F>(&self, window: WindowHandle, task: F) -> Result<()>
    where
        F: FnOnce(&mut Ui) + Send + 'static,
    {
        self.send(RemoteEvent::Post {
            window,
            task: Box::new(task),
        })
    }

    /// Queue a modal informational dialog
    pub fn show_message(
        &self,
        window: WindowHandle,
        title: impl Into<String>,
        body: impl Into<String>,
        severity: Severity,
    ) -> Result<()> {
        self.send(RemoteEvent::ShowMessage {
            window,
            request: MessageRequest::new(title, body, severity),
        })
    }

    /// Ask the UI thread to destroy `window`
    pub fn close(&self, window: WindowHandle) -> Result<()> {
        self.send(RemoteEvent::Close(window))
    }

    /// Whether the current thread is the one running the event loop
    pub fn is_ui_thread(&self) -> bool {
        thread::current().id() == self.ui_thread
    }

    fn send(&self, event: RemoteEvent) -> Result<()> {
        self.sender
            .send(event)
            .map_err(|_| WebWindowError::LoopClosed)
    }
}

impl fmt::Debug for LoopProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoopProxy")
            .field("ui_thread", &self.ui_thread)
            .finish()
    }
}
