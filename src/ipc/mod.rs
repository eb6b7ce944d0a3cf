//! Cross-thread communication with the UI thread
//!
//! - **signal**: one-shot blocking completion primitive
//! - **invoke**: queued invocations and the [`LoopProxy`] handle that posts them

mod invoke;
mod signal;

pub use invoke::{LoopProxy, Task};
pub(crate) use invoke::PendingInvocation;
pub use signal::{Completion, Signal};
