//! Transport seam between the RPC client and sessiond

use std::fmt;

use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::error::N11Result;
use crate::proto::{SetSmNotificationContext, SetSmSessionContext, SmContextVoid};
use crate::status::RpcStatus;

/// sessiond service carrying the AMF session RPCs
pub const SMF_SERVICE_NAME: &str = "magma.lte.AmfPduSessionSmContext";

/// Unary RPCs of the session manager service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SmfMethod {
    SetAmfSessionContext,
    SetSmfNotification,
}

impl SmfMethod {
    pub fn name(&self) -> &'static str {
        match self {
            Self::SetAmfSessionContext => "SetAmfSessionContext",
            Self::SetSmfNotification => "SetSmfNotification",
        }
    }

    /// Full method path (/package.Service/Method).
    pub fn full_path(&self) -> String {
        format!("/{}/{}", SMF_SERVICE_NAME, self.name())
    }
}

impl fmt::Display for SmfMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A request bound for sessiond
#[derive(Debug, Clone, PartialEq)]
pub enum SmfRequest {
    SessionContext(SetSmSessionContext),
    Notification(SetSmNotificationContext),
}

impl SmfRequest {
    pub fn method(&self) -> SmfMethod {
        match self {
            Self::SessionContext(_) => SmfMethod::SetAmfSessionContext,
            Self::Notification(_) => SmfMethod::SetSmfNotification,
        }
    }

    /// JSON body for the request
    pub fn to_json(&self) -> N11Result<Vec<u8>> {
        let body = match self {
            Self::SessionContext(req) => serde_json::to_vec(req)?,
            Self::Notification(notify) => serde_json::to_vec(notify)?,
        };
        Ok(body)
    }
}

impl From<SetSmSessionContext> for SmfRequest {
    fn from(req: SetSmSessionContext) -> Self {
        Self::SessionContext(req)
    }
}

impl From<SetSmNotificationContext> for SmfRequest {
    fn from(notify: SetSmNotificationContext) -> Self {
        Self::Notification(notify)
    }
}

/// Identifies one in-flight call on the completion queue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CallId(pub u64);

impl fmt::Display for CallId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One finished call as posted to the completion queue
#[derive(Debug, Clone)]
pub struct Completion {
    pub tag: CallId,
    pub status: RpcStatus,
    pub response: SmContextVoid,
}

/// Per-call context handed to the transport
#[derive(Debug, Clone)]
pub struct OutboundCall {
    pub request: SmfRequest,
    /// Point after which the caller has already been told the call timed out
    pub deadline: Instant,
}

/// Posts the result of exactly one call to the completion queue
#[derive(Debug)]
pub struct ResponseReader {
    tag: CallId,
    queue: mpsc::UnboundedSender<Completion>,
}

impl ResponseReader {
    pub fn new(tag: CallId, queue: mpsc::UnboundedSender<Completion>) -> Self {
        Self { tag, queue }
    }

    pub fn tag(&self) -> CallId {
        self.tag
    }

    pub fn finish(self, status: RpcStatus, response: SmContextVoid) {
        let completion = Completion {
            tag: self.tag,
            status,
            response,
        };
        // The loop has stopped; every pending call was already resolved
        if self.queue.send(completion).is_err() {
            log::debug!("Completion for call {} dropped, queue closed", self.tag);
        }
    }
}

/// Issues calls to sessiond.
///
/// `start_call` must return without waiting on the network. The transport
/// reports the outcome through `reader` at most once; a call the transport
/// never finishes is resolved by the client at its deadline.
pub trait SmfChannel: Send + Sync {
    fn start_call(&self, call: OutboundCall, reader: ResponseReader);
}
