//! NGCore N11 client
//!
//! Builds PDU session requests for the session manager (sessiond) and sends
//! them asynchronously, correlating each call with exactly one callback.
//!
//! - [`types`]: AMF-side session parameters
//! - [`proto`]: sessiond message schema
//! - [`builder`]: parameter to request mapping
//! - [`client`]: fire-and-forget RPC client with a completion loop thread
//! - [`channel`] / [`http_channel`]: transport seam and its HTTP/2 implementation

pub mod builder;
pub mod channel;
pub mod client;
pub mod config;
pub mod error;
pub mod http_channel;
pub mod legacy;
pub mod proto;
pub mod status;
pub mod types;


pub use builder::{create_sm_notification, create_sm_pdu_session};
pub use channel::{CallId, Completion, OutboundCall, ResponseReader, SmfChannel, SmfMethod, SmfRequest};
pub use client::{handle_session_context_response, AsyncSmfServiceClient, RpcCallback};
pub use config::{N11Config, ServiceEndpoint, ServiceRegistry, SESSIOND_SERVICE};
pub use error::{N11Error, N11Result};
pub use http_channel::HttpSmfChannel;
pub use legacy::{S6aUpdateLocation, S6aUpdateLocationReq};
pub use status::{RpcCode, RpcStatus};
pub use types::{
    AllocationRetentionPriority, Ambr, Apn, Imsi, PduSessionParams, PreemptionCapability,
    PreemptionVulnerability, SmNotificationParams, SubscribedQosProfile,
};
