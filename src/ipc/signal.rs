//! Marshaling primitive: make one thread wait until another reports that a
//! unit of work has finished.

use parking_lot::{Condvar, Mutex};

/// How a waited-on unit of work ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// `signal` was called
    Done,
    /// The work was discarded without running to completion
    Abandoned,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Pending,
    Finished(Completion),
}

/// One-shot wait/notify object.
///
/// The first of [`Signal::signal`] or [`Signal::abandon`] wins; later calls
/// are ignored. A signal raised before `wait` is still observed by it.
#[derive(Debug)]
pub struct Signal {
    state: Mutex<State>,
    cond: Condvar,
}

impl Signal {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::Pending),
            cond: Condvar::new(),
        }
    }

    /// Report completion. Callable from any thread.
    pub fn signal(&self) {
        self.finish(Completion::Done);
    }

    /// Report that the work will never run
    pub fn abandon(&self) {
        self.finish(Completion::Abandoned);
    }

    fn finish(&self, completion: Completion) {
        let mut state = self.state.lock();
        if *state == State::Pending {
            *state = State::Finished(completion);
            drop(state);
            self.cond.notify_one();
        }
    }

    /// Block until the work is finished. Never returns if nobody signals.
    pub fn wait(&self) -> Completion {
        let mut state = self.state.lock();
        loop {
            match *state {
                State::Finished(completion) => return completion,
                State::Pending => self.cond.wait(&mut state),
            }
        }
    }

    /// Non-blocking check
    pub fn is_finished(&self) -> bool {
        *self.state.lock() != State::Pending
    }
}

impl Default for Signal {
    fn default() -> Self {
        Self::new()
    }
}
