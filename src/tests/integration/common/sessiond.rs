//! Fake sessiond
//!
//! Accepts HTTP/2 connections on a loopback port, records every request and
//! answers each with a fixed status after an optional delay.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::server::conn::http2;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::{TokioExecutor, TokioIo};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use ngcore_n11::ServiceEndpoint;

/// One request as seen by the fake
#[derive(Debug, Clone)]
pub struct ReceivedCall {
    pub path: String,
    pub body: serde_json::Value,
}

#[derive(Debug, Clone, Copy)]
pub struct Reply {
    pub status: u16,
    pub delay: Duration,
}

impl Reply {
    pub fn ok() -> Self {
        Self {
            status: 200,
            delay: Duration::ZERO,
        }
    }

    pub fn status(status: u16) -> Self {
        Self {
            status,
            delay: Duration::ZERO,
        }
    }

    pub fn delayed(delay: Duration) -> Self {
        Self { status: 200, delay }
    }
}

pub struct FakeSessiond {
    addr: SocketAddr,
    received: Arc<Mutex<Vec<ReceivedCall>>>,
    task: JoinHandle<()>,
}

impl FakeSessiond {
    pub async fn start(reply: Reply) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let received = Arc::new(Mutex::new(Vec::new()));

        let calls = Arc::clone(&received);
        let task = tokio::spawn(async move {
            loop {
                let (stream, _) = match listener.accept().await {
                    Ok(accepted) => accepted,
                    Err(e) => {
                        log::warn!("fake sessiond accept error: {e}");
                        continue;
                    }
                };
                let calls = Arc::clone(&calls);
                let service = service_fn(move |req: Request<Incoming>| {
                    let calls = Arc::clone(&calls);
                    async move { Ok::<_, Infallible>(handle(req, reply, calls).await) }
                });
                tokio::spawn(async move {
                    if let Err(e) = http2::Builder::new(TokioExecutor::new())
                        .serve_connection(TokioIo::new(stream), service)
                        .await
                    {
                        log::debug!("fake sessiond connection closed: {e}");
                    }
                });
            }
        });

        Self { addr, received, task }
    }

    pub fn endpoint(&self) -> ServiceEndpoint {
        ServiceEndpoint::new(self.addr.ip().to_string(), self.addr.port())
    }

    pub fn received(&self) -> Vec<ReceivedCall> {
        self.received.lock().unwrap().clone()
    }
}

impl Drop for FakeSessiond {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn handle(req: Request<Incoming>, reply: Reply, calls: Arc<Mutex<Vec<ReceivedCall>>>) -> Response<Full<Bytes>> {
    let path = req.uri().path().to_string();
    let body = match req.into_body().collect().await {
        Ok(body) => serde_json::from_slice(&body.to_bytes()).unwrap_or(serde_json::Value::Null),
        Err(_) => serde_json::Value::Null,
    };
    calls.lock().unwrap().push(ReceivedCall { path, body });

    if !reply.delay.is_zero() {
        tokio::time::sleep(reply.delay).await;
    }

    let mut response = Response::new(Full::new(Bytes::from_static(b"{}")));
    *response.status_mut() = StatusCode::from_u16(reply.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    response
}
