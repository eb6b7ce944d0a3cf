//! Shared utilities: error types and text transcoding

pub mod encoding;
pub mod error;

pub use error::{EngineError, Result, WebWindowError};
