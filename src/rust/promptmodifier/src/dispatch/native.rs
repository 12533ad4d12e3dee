use reqwest::{Client, header::CONTENT_TYPE};
use tokio::runtime::Handle;
use tokio_util::task::TaskTracker;
use tracing::trace;

use super::{DispatchError, Dispatcher, OutboundPrompt};

/// Posts prompts with reqwest on a tokio runtime without awaiting them.
///
/// Every delivery is spawned onto the runtime and tracked so a harness can
/// [`drain`](Self::drain) before it exits. The hook side never waits.
#[derive(Clone)]
pub struct ReqwestDispatcher {
    client: Client,
    handle: Handle,
    tracker: TaskTracker,
}

impl ReqwestDispatcher {
    /// Binds to the tokio runtime the caller is running on
    pub fn new() -> Result<Self, DispatchError> {
        let handle = Handle::try_current().map_err(|_| DispatchError::NoRuntime)?;
        Self::with_handle(handle)
    }

    pub fn with_handle(handle: Handle) -> Result<Self, DispatchError> {
        let client = Client::builder()
            .build()
            .map_err(|e| DispatchError::Request(e.to_string()))?;
        Ok(Self::with_client(client, handle))
    }

    pub fn with_client(client: Client, handle: Handle) -> Self {
        Self {
            client,
            handle,
            tracker: TaskTracker::new(),
        }
    }

    /// Deliveries spawned but not yet finished
    pub fn in_flight(&self) -> usize {
        self.tracker.len()
    }

    /// Waits until every delivery spawned so far has finished, successfully or not.
    pub async fn drain(&self) {
        self.tracker.close();
        self.tracker.wait().await;
        self.tracker.reopen();
    }
}

impl Dispatcher for ReqwestDispatcher {
    fn dispatch(&self, request: OutboundPrompt) -> Result<(), DispatchError> {
        let OutboundPrompt {
            endpoint,
            content_type,
            body,
        } = request;

        let pending = self
            .client
            .post(endpoint.as_str())
            .header(CONTENT_TYPE, content_type)
            .body(body);

        self.tracker.spawn_on(
            async move {
                // The response is dropped unread
                match pending.send().await {
                    Ok(response) => trace!(%endpoint, status = %response.status(), "delivered"),
                    Err(e) => trace!(%endpoint, error = %e, "delivery failed"),
                }
            },
            &self.handle,
        );

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_outside_runtime_is_no_runtime() {
        let result = ReqwestDispatcher::new();
        assert!(matches!(result, Err(DispatchError::NoRuntime)));
    }

    #[tokio::test]
    async fn test_dispatch_returns_before_delivery() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("promptmodifier=trace")
            .try_init();

        let dispatcher = ReqwestDispatcher::new().unwrap();
        let request = OutboundPrompt {
            // Nothing listens on the discard port
            endpoint: "http://127.0.0.1:9/".parse().unwrap(),
            content_type: crate::PLAIN_TEXT,
            body: "unheard".to_string(),
        };

        dispatcher.dispatch(request).unwrap();
        assert_eq!(dispatcher.in_flight(), 1);

        dispatcher.drain().await;
        assert_eq!(dispatcher.in_flight(), 0);
    }
}
