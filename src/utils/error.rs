//! Error types for WebWindow

use crate::platform::WindowHandle;
use thiserror::Error;

/// Main error type for WebWindow operations
#[derive(Debug, Error)]
pub enum WebWindowError {
    /// The handle does not name a live window
    #[error("unknown window {0}")]
    UnknownWindow(WindowHandle),
    /// The window has no browser instance yet (it was never shown)
    #[error("window {0} has no browser instance yet")]
    EngineNotReady(WindowHandle),
    /// Browser creation failed earlier; the window has no browser surface
    #[error("browser instance for window {0} is unavailable")]
    EngineUnavailable(WindowHandle),
    /// The event queue ran dry before the browser became ready
    #[error("event loop terminated before the browser for window {0} became ready")]
    EngineStartup(WindowHandle),
    /// Environment or browser creation failure reported by the engine
    #[error(transparent)]
    Engine(#[from] EngineError),
    /// Window system failure
    #[error("window system error: {0}")]
    Platform(String),
    /// Navigation target is not a valid URL
    #[error("invalid URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    /// The UI event loop is no longer accepting events
    #[error("the UI event loop has shut down")]
    LoopClosed,
    /// A queued invocation was discarded before it finished running
    #[error("invocation on window {0} was dropped before it completed")]
    InvocationDropped(WindowHandle),
    /// `invoke` was called from the UI thread, which would wait on itself
    #[error("invoke called from the UI thread")]
    InvokeOnUiThread,
    /// Configuration could not be parsed
    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure reported by a browser engine while creating an environment or a
/// browser instance. Displayed verbatim in the error dialog.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct EngineError {
    message: String,
}

impl EngineError {
    /// Create an engine error with the platform's message
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// The platform error message
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Convenience Result type for WebWindow operations
pub type Result<T> = std::result::Result<T, WebWindowError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_error_displays_message_verbatim() {
        let err =
            WebWindowError::from(EngineError::new("The system cannot find the file specified."));
        assert_eq!(err.to_string(), "The system cannot find the file specified.");
    }

    #[test]
    fn test_invalid_url_keeps_source() {
        let source = url::Url::parse("not a url").unwrap_err();
        let err = WebWindowError::InvalidUrl {
            url: "not a url".to_string(),
            source,
        };
        assert!(err.to_string().starts_with("invalid URL 'not a url'"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
