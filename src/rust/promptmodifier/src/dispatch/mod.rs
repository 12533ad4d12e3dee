use std::{
    panic::{AssertUnwindSafe, catch_unwind},
    sync::Arc,
};

use tracing::debug;

use crate::config::Endpoint;

#[cfg(feature = "native")]
pub mod native;

/// One outbound copy of a prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundPrompt {
    pub endpoint: Endpoint,
    pub content_type: &'static str,
    pub body: String,
}

/// Starts delivery of an [`OutboundPrompt`].
///
/// Implementations must return as soon as the request has been handed off.
/// They never wait for, or look at, the response.
pub trait Dispatcher {
    fn dispatch(&self, request: OutboundPrompt) -> Result<(), DispatchError>;
}

impl<D: Dispatcher + ?Sized> Dispatcher for &D {
    fn dispatch(&self, request: OutboundPrompt) -> Result<(), DispatchError> {
        (**self).dispatch(request)
    }
}

impl<D: Dispatcher + ?Sized> Dispatcher for Box<D> {
    fn dispatch(&self, request: OutboundPrompt) -> Result<(), DispatchError> {
        (**self).dispatch(request)
    }
}

impl<D: Dispatcher + ?Sized> Dispatcher for Arc<D> {
    fn dispatch(&self, request: OutboundPrompt) -> Result<(), DispatchError> {
        (**self).dispatch(request)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("No async runtime available to carry the request")]
    NoRuntime,

    #[error("Failed to build request: {0}")]
    Request(String),

    #[error("Transport error: {0}")]
    Transport(String),
}

/// Hands `request` to `dispatcher` and discards the outcome.
///
/// Errors returned by the dispatcher are dropped after a `debug` line. Panics
/// are caught the same way only where panics unwind; on `panic = "abort"`
/// targets such as wasm32-wasip2 a panicking dispatcher still aborts.
pub fn fire_and_forget<D: Dispatcher + ?Sized>(dispatcher: &D, request: OutboundPrompt) {
    let endpoint = request.endpoint.to_string();
    let bytes = request.body.len();

    match catch_unwind(AssertUnwindSafe(|| dispatcher.dispatch(request))) {
        Ok(Ok(())) => debug!(%endpoint, bytes, "prompt dispatched"),
        Ok(Err(e)) => debug!(%endpoint, error = %e, "prompt dispatch failed"),
        Err(_) => debug!(%endpoint, "prompt dispatch panicked"),
    }
}
