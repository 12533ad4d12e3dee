use std::cell::RefCell;

use promptmodifier::{DispatchError, Dispatcher, OutboundPrompt};
use wasi::http::{
    outgoing_handler,
    types::{Fields, FutureIncomingResponse, Method, OutgoingBody, OutgoingRequest, Scheme},
};

/// Pending responses kept alive at once; the oldest is given up beyond this
const MAX_IN_FLIGHT: usize = 64;

thread_local! {
    // Pending responses are parked here rather than dropped, since dropping
    // the future cancels the request in the host.
    static IN_FLIGHT: RefCell<Vec<FutureIncomingResponse>> = const { RefCell::new(Vec::new()) };
}

/// Sends prompts through the host's `wasi:http/outgoing-handler`.
///
/// The whole body is handed over in a single non-blocking write, so a prompt
/// has to fit in the write budget the host grants up front. Larger prompts
/// are not sent at all.
#[derive(Debug, Clone, Copy, Default)]
pub struct WasiHttpDispatcher;

impl Dispatcher for WasiHttpDispatcher {
    fn dispatch(&self, request: OutboundPrompt) -> Result<(), DispatchError> {
        let headers = Fields::from_list(&[(
            "content-type".to_string(),
            request.content_type.as_bytes().to_vec(),
        )])
        .map_err(|e| DispatchError::Request(format!("{e:?}")))?;

        let outgoing = OutgoingRequest::new(headers);
        let scheme = if request.endpoint.is_https() {
            Scheme::Https
        } else {
            Scheme::Http
        };
        let authority = request.endpoint.authority();
        let path = request.endpoint.path_with_query();

        outgoing
            .set_method(&Method::Post)
            .and_then(|_| outgoing.set_scheme(Some(&scheme)))
            .and_then(|_| outgoing.set_authority(Some(&authority)))
            .and_then(|_| outgoing.set_path_with_query(Some(&path)))
            .map_err(|_| DispatchError::Request(format!("rejected target {}", request.endpoint)))?;

        let body = outgoing
            .body()
            .map_err(|_| DispatchError::Request("request body already taken".into()))?;
        let stream = body
            .write()
            .map_err(|_| DispatchError::Transport("body stream unavailable".into()))?;

        // Never wait on the stream: write only what the host accepts right now
        let bytes = request.body.as_bytes();
        let budget = stream
            .check_write()
            .map_err(|e| DispatchError::Transport(format!("{e:?}")))?;
        if !fits_budget(bytes.len(), budget) {
            return Err(DispatchError::Request(format!(
                "prompt of {} bytes exceeds the {budget} byte write budget",
                bytes.len()
            )));
        }
        if !bytes.is_empty() {
            stream
                .write(bytes)
                .and_then(|_| stream.flush())
                .map_err(|e| DispatchError::Transport(format!("{e:?}")))?;
        }
        drop(stream);

        let response = outgoing_handler::handle(outgoing, None)
            .map_err(|e| DispatchError::Transport(format!("{e:?}")))?;
        park(response);

        OutgoingBody::finish(body, None).map_err(|e| DispatchError::Transport(format!("{e:?}")))
    }
}

fn fits_budget(len: usize, budget: u64) -> bool {
    u64::try_from(len).is_ok_and(|len| len <= budget)
}

fn park(response: FutureIncomingResponse) {
    IN_FLIGHT.with_borrow_mut(|in_flight| {
        park_bounded(in_flight, response, |pending| pending.get().is_some(), MAX_IN_FLIGHT)
    });
}

/// Drops finished entries, then the oldest ones until `item` fits under `cap`.
fn park_bounded<T>(list: &mut Vec<T>, item: T, is_done: impl Fn(&T) -> bool, cap: usize) {
    list.retain(|pending| !is_done(pending));
    if list.len() >= cap {
        let excess = list.len() + 1 - cap;
        list.drain(..excess);
    }
    list.push(item);
}
