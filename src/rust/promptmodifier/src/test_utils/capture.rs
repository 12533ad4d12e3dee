use std::{
    collections::HashMap,
    net::SocketAddr,
    sync::{Arc, Mutex},
    time::Duration,
};

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::{Request, Response, body::Incoming};
use hyper_util::rt::TokioIo;
use tokio::{net::TcpListener, sync::oneshot};
use tracing::error;

/// What the capture endpoint saw for one request
#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub method: String,
    pub path: String,
    pub headers: HashMap<String, String>,
    pub body: String,
}

/// Plain HTTP/1 server that records every request it receives
pub struct CaptureServer {
    listen_addr: SocketAddr,
    shutdown_tx: oneshot::Sender<()>,
    task: tokio::task::JoinHandle<()>,
    captured: Arc<Mutex<Vec<CapturedRequest>>>,
}

impl CaptureServer {
    /// URL to configure as `exfiltration_endpoint`
    pub fn endpoint(&self) -> String {
        format!("http://{}/capture", self.listen_addr)
    }

    pub fn requests(&self) -> Vec<CapturedRequest> {
        self.captured.lock().unwrap().clone()
    }

    /// Polls until at least `count` requests arrived; false on timeout
    pub async fn wait_for(&self, count: usize, timeout: Duration) -> bool {
        tokio::time::timeout(timeout, async {
            while self.captured.lock().unwrap().len() < count {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .is_ok()
    }

    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(());
        let _ = self.task.await;
    }
}

pub async fn create_capture_server() -> CaptureServer {
    let listener = TcpListener::bind(("127.0.0.1", 0))
        .await
        .expect("bind capture listener");
    let listen_addr = listener.local_addr().unwrap();
    let (shutdown_tx, mut shutdown_rx) = oneshot::channel();
    let captured = Arc::new(Mutex::new(Vec::new()));

    let sink = captured.clone();
    let task = tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = &mut shutdown_rx => {
                    break;
                }
                result = listener.accept() => {
                    let (stream, _) = match result {
                        Ok(s) => s,
                        Err(e) => {
                            error!("accept error: {e}");
                            continue;
                        }
                    };

                    let sink = sink.clone();
                    tokio::spawn(async move {
                        let io = TokioIo::new(stream);

                        let svc = hyper::service::service_fn(move |req: Request<Incoming>| {
                            let sink = sink.clone();
                            async move {
                                let (parts, body) = req.into_parts();
                                let body = body.collect().await?.to_bytes();

                                let headers = parts
                                    .headers
                                    .iter()
                                    .map(|(k, v)| {
                                        (
                                            k.as_str().to_string(),
                                            v.to_str().unwrap_or_default().to_string(),
                                        )
                                    })
                                    .collect();

                                sink.lock().unwrap().push(CapturedRequest {
                                    method: parts.method.to_string(),
                                    path: parts.uri.path().to_string(),
                                    headers,
                                    body: String::from_utf8_lossy(&body).into_owned(),
                                });

                                Ok::<_, hyper::Error>(Response::new(Full::new(
                                    Bytes::from_static(b"captured"),
                                )))
                            }
                        });

                        if let Err(e) = hyper::server::conn::http1::Builder::new()
                            .serve_connection(io, svc)
                            .await
                        {
                            error!("http1 error: {e}");
                        }
                    });
                }
            }
        }
    });

    CaptureServer {
        listen_addr,
        shutdown_tx,
        task,
        captured,
    }
}
