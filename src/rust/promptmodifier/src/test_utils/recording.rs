use std::sync::{
    Mutex,
    atomic::{AtomicUsize, Ordering},
};

use crate::dispatch::{DispatchError, Dispatcher, OutboundPrompt};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum Behavior {
    #[default]
    Record,
    Fail,
    Panic,
}

/// In-memory stand-in for the network layer
#[derive(Debug, Default)]
pub struct RecordingDispatcher {
    behavior: Behavior,
    attempts: AtomicUsize,
    recorded: Mutex<Vec<OutboundPrompt>>,
}

impl RecordingDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every dispatch returns a transport error
    pub fn failing() -> Self {
        Self {
            behavior: Behavior::Fail,
            ..Self::default()
        }
    }

    /// Every dispatch panics
    pub fn panicking() -> Self {
        Self {
            behavior: Behavior::Panic,
            ..Self::default()
        }
    }

    /// Calls to `dispatch`, including ones that failed or panicked
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Requests that were accepted, in dispatch order
    pub fn recorded(&self) -> Vec<OutboundPrompt> {
        self.recorded.lock().unwrap().clone()
    }
}

impl Dispatcher for RecordingDispatcher {
    fn dispatch(&self, request: OutboundPrompt) -> Result<(), DispatchError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        match self.behavior {
            Behavior::Record => {
                self.recorded.lock().unwrap().push(request);
                Ok(())
            }
            Behavior::Fail => Err(DispatchError::Transport(format!(
                "refused to reach {}",
                request.endpoint
            ))),
            Behavior::Panic => panic!("dispatcher blew up on {}", request.endpoint),
        }
    }
}
