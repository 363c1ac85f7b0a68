//! Session manager (sessiond) N11 message schema
//!
//! Field names and enumeration values follow the peer's
//! `AmfPduSessionSmContext` service schema. Enumerations serialize as their
//! integer value so the wire form matches the peer's encoding.

use serde::{Deserialize, Serialize};

/// Defines a C-like enum with an explicit wire integer per variant and
/// integer (de)serialization.
macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident = $value:expr ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(into = "i32", try_from = "i32")]
        #[repr(i32)]
        pub enum $name {
            $( $(#[$vmeta])* $variant = $value ),+
        }

        impl $name {
            /// Integer carried on the wire
            pub fn value(self) -> i32 {
                self as i32
            }
        }

        impl From<$name> for i32 {
            fn from(v: $name) -> i32 {
                v as i32
            }
        }

        impl TryFrom<i32> for $name {
            type Error = String;

            fn try_from(v: i32) -> Result<Self, Self::Error> {
                match v {
                    $( x if x == $value => Ok($name::$variant), )+
                    other => Err(format!(concat!("invalid ", stringify!($name), " value {}"), other)),
                }
            }
        }
    };
}

wire_enum! {
    /// SubscriberID.IDType
    pub enum SubscriberIdType {
        Imsi = 0,
    }
}

wire_enum! {
    /// RATType
    pub enum RatType {
        TgppLte = 0,
        TgppWlan = 1,
        TgppNr = 2,
    }
}

wire_enum! {
    /// SMSessionFSMState
    pub enum SmSessionFsmState {
        Creating0 = 0,
        Create1 = 1,
        Active2 = 2,
        Inactive3 = 3,
        Released4 = 4,
    }
}

wire_enum! {
    /// RequestType of a 5GSM session request
    pub enum RequestType {
        InitialRequest = 0,
        ExistingPduSession = 1,
        InitialEmergencyRequest = 2,
        ExistingEmergencyPduSession = 3,
        ModificationRequest = 4,
    }
}

wire_enum! {
    /// PduSessionType
    pub enum PduSessionType {
        Ipv4 = 0,
        Ipv6 = 1,
        Ipv4Ipv6 = 2,
        Unstructured = 3,
    }
}

wire_enum! {
    /// QosInformationRequest.BitrateUnitsAMBR
    pub enum BitrateUnitsAmbr {
        Bps = 0,
        Kbps = 1,
    }
}

wire_enum! {
    /// NotifyUeEvents
    pub enum NotifyUeEvent {
        PduSessionInactiveNotify = 0,
        UeIdleModeNotify = 1,
        UeServiceRequestOnPaging = 2,
        UePeriodicRegUpdate = 3,
        PduSessionStateNotify = 4,
    }
}

/// SubscriberID
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriberId {
    pub id: String,
    #[serde(rename = "type")]
    pub id_type: SubscriberIdType,
}

/// CommonSessionContext
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommonSessionContext {
    pub sid: SubscriberId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ue_ipv4: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ue_ipv6: Option<String>,
    pub apn: String,
    pub rat_type: RatType,
    pub sm_session_state: SmSessionFsmState,
    pub sm_session_version: u32,
}

/// TeidSet: peer tunnel endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeidSet {
    pub teid: u32,
    pub end_ipv4_addr: String,
}

/// QosInformationRequest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QosInformationRequest {
    pub qos_class_id: u32,
    pub priority_level: u32,
    pub preemption_capability: u32,
    pub preemption_vulnerability: u32,
    pub apn_ambr_ul: u32,
    pub apn_ambr_dl: u32,
    pub br_unit: BitrateUnitsAmbr,
}

/// M5GSMSessionContext
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct M5GSmSessionContext {
    pub pdu_session_id: u32,
    pub request_type: RequestType,
    pub pdu_session_type: PduSessionType,
    pub gnode_endpoint: TeidSet,
    /// PTI octet as a byte string; empty when the PTI is zero
    pub procedure_trans_identity: Vec<u8>,
    pub subscribed_qos: QosInformationRequest,
}

/// RatSpecificContext
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatSpecificContext {
    pub m5gsm_session_context: M5GSmSessionContext,
}

/// SetSMSessionContext: request of `SetAmfSessionContext`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetSmSessionContext {
    pub common_context: CommonSessionContext,
    pub rat_specific_context: RatSpecificContext,
}

/// RatSpecificNotification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatSpecificNotification {
    pub pdu_session_id: u32,
    pub request_type: RequestType,
    pub notify_ue_event: NotifyUeEvent,
}

/// SetSmNotificationContext: request of `SetSmfNotification`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetSmNotificationContext {
    pub common_context: CommonSessionContext,
    pub rat_specific_notification: RatSpecificNotification,
}

/// SmContextVoid: empty response of both N11 RPCs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SmContextVoid {}
