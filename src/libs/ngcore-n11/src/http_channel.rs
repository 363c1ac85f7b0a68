//! HTTP/2 transport to sessiond
//!
//! Each call is a JSON `POST` to the method path over one shared HTTP/2
//! connection, reconnected lazily when it is no longer ready.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::client::conn::http2::SendRequest;
use hyper::header::CONTENT_TYPE;
use hyper::{Method, Request};
use hyper_util::rt::{TokioExecutor, TokioIo};
use tokio::net::TcpStream;
use tokio::runtime::Handle;
use tokio::sync::Mutex;

use crate::channel::{OutboundCall, ResponseReader, SmfChannel};
use crate::config::{ServiceEndpoint, ServiceRegistry};
use crate::error::N11Result;
use crate::proto::SmContextVoid;
use crate::status::{RpcCode, RpcStatus};

/// Default connection timeout in seconds
const DEFAULT_CONNECT_TIMEOUT: u64 = 5;

struct Connection {
    endpoint: ServiceEndpoint,
    connect_timeout: Duration,
    sender: Mutex<Option<SendRequest<Full<Bytes>>>>,
}

impl Connection {
    async fn connect(&self) -> Result<SendRequest<Full<Bytes>>, RpcStatus> {
        let addr = self.endpoint.authority();

        let stream = tokio::time::timeout(self.connect_timeout, TcpStream::connect(&addr))
            .await
            .map_err(|_| RpcStatus::unavailable(format!("connect to {addr} timed out")))?
            .map_err(|e| RpcStatus::unavailable(format!("connect to {addr}: {e}")))?;

        let (sender, conn) = hyper::client::conn::http2::handshake(TokioExecutor::new(), TokioIo::new(stream))
            .await
            .map_err(|e| RpcStatus::unavailable(format!("HTTP/2 handshake with {addr}: {e}")))?;

        tokio::spawn(async move {
            if let Err(e) = conn.await {
                log::warn!("sessiond HTTP/2 connection error: {e}");
            }
        });

        log::debug!("Connected to sessiond at {addr}");
        Ok(sender)
    }

    /// Get or create a connection
    async fn get_connection(&self) -> Result<SendRequest<Full<Bytes>>, RpcStatus> {
        let mut guard = self.sender.lock().await;

        if let Some(sender) = guard.as_ref() {
            if sender.is_ready() {
                return Ok(sender.clone());
            }
        }

        let sender = self.connect().await?;
        *guard = Some(sender.clone());
        Ok(sender)
    }

    async fn call(&self, call: &OutboundCall) -> RpcStatus {
        let body = match call.request.to_json() {
            Ok(body) => body,
            Err(e) => return RpcStatus::new(RpcCode::Internal, format!("request encoding: {e}")),
        };

        let mut sender = match self.get_connection().await {
            Ok(sender) => sender,
            Err(status) => return status,
        };

        let uri = format!("http://{}{}", self.endpoint.authority(), call.request.method().full_path());
        let request = match Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(CONTENT_TYPE, "application/json")
            .body(Full::new(Bytes::from(body)))
        {
            Ok(request) => request,
            Err(e) => return RpcStatus::new(RpcCode::Internal, e.to_string()),
        };

        let response = match sender.send_request(request).await {
            Ok(response) => response,
            Err(e) => return RpcStatus::unavailable(e.to_string()),
        };

        let status = response.status();
        if status.is_success() {
            return RpcStatus::ok();
        }

        let detail = match response.into_body().collect().await {
            Ok(body) => String::from_utf8_lossy(&body.to_bytes()).into_owned(),
            Err(e) => e.to_string(),
        };
        RpcStatus::from_http_status(status.as_u16(), detail)
    }
}

/// [`SmfChannel`] speaking HTTP/2 + JSON
pub struct HttpSmfChannel {
    connection: Arc<Connection>,
    runtime: Handle,
}

impl HttpSmfChannel {
    /// Calls run as tasks on `runtime`.
    pub fn new(endpoint: ServiceEndpoint, runtime: Handle) -> Self {
        Self {
            connection: Arc::new(Connection {
                endpoint,
                connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT),
                sender: Mutex::new(None),
            }),
            runtime,
        }
    }

    /// Resolve `service` in `registry` and build a channel to it
    pub fn for_service(registry: &ServiceRegistry, service: &str, runtime: Handle) -> N11Result<Self> {
        let endpoint = registry.lookup(service)?.clone();
        log::info!("N11 channel for '{}' at {}", service, endpoint.authority());
        Ok(Self::new(endpoint, runtime))
    }

    pub fn endpoint(&self) -> &ServiceEndpoint {
        &self.connection.endpoint
    }
}

impl SmfChannel for HttpSmfChannel {
    fn start_call(&self, call: OutboundCall, reader: ResponseReader) {
        let connection = Arc::clone(&self.connection);
        self.runtime.spawn(async move {
            let status = match tokio::time::timeout_at(call.deadline, connection.call(&call)).await {
                Ok(status) => status,
                Err(_) => RpcStatus::deadline_exceeded(),
            };
            reader.finish(status, SmContextVoid::default());
        });
    }
}
