//! # WebWindow - native windows hosting a browser surface
//!
//! Embeds a browser engine inside native windows and passes messages both
//! ways between host code and page script.
//!
//! ## Architecture
//!
//! - **ui**: the single-threaded event loop that owns every window
//! - **ipc**: blocking cross-thread invocation onto the UI thread
//! - **engine**: browser startup state machine, message channels and
//!   custom-scheme resource interception
//! - **platform**: window-system interface and a headless backend
//! - **config**: window and browser settings
//! - **utils**: shared error types and native text transcoding
//!
//! ## Threading
//!
//! Create the [`Ui`] on the thread that will run it. Hand
//! [`LoopProxy`] clones to other threads; [`LoopProxy::invoke`] runs a
//! closure on the UI thread and returns once it has finished.

pub mod config;
pub mod engine;
pub mod ipc;
pub mod platform;
pub mod ui;
pub mod utils;

// Re-export main types for convenience
pub use config::{Config, EngineSettings, WindowConfig};
pub use engine::{EngineStatus, SchemeResponse};
pub use ipc::LoopProxy;
pub use platform::{Size, WindowHandle};
pub use ui::{Pump, Severity, Ui};
pub use utils::error::{EngineError, Result, WebWindowError};

/// Library version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = "WebWindow";
