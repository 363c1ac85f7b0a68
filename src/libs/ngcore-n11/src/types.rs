//! AMF-side session parameters handed to the N11 builders

use std::fmt;
use std::net::Ipv4Addr;

use crate::error::{N11Error, N11Result};
use crate::proto::{BitrateUnitsAmbr, NotifyUeEvent, PduSessionType, RequestType, SmSessionFsmState};

/// Subscriber IMSI: 5 to 15 decimal digits, without any prefix
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Imsi(String);

impl Imsi {
    pub const MIN_LEN: usize = 5;
    pub const MAX_LEN: usize = 15;

    pub fn new(digits: impl Into<String>) -> N11Result<Self> {
        let digits = digits.into();
        let len_ok = (Self::MIN_LEN..=Self::MAX_LEN).contains(&digits.len());
        if !len_ok || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(N11Error::InvalidImsi(digits));
        }
        Ok(Self(digits))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Imsi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for Imsi {
    type Err = N11Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// Access point name (data network name)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Apn(String);

impl Apn {
    /// Build from NUL-terminated octets. Anything after the first zero octet
    /// is ignored; a buffer without one is used whole.
    pub fn from_cstr(raw: &[u8]) -> N11Result<Self> {
        let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
        std::str::from_utf8(&raw[..end])
            .map(|s| Self(s.to_owned()))
            .map_err(|e| N11Error::InvalidApn(e.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Truncates at the first NUL, like [`Apn::from_cstr`]
impl From<&str> for Apn {
    fn from(s: &str) -> Self {
        let end = s.find('\0').unwrap_or(s.len());
        Self(s[..end].to_owned())
    }
}

impl fmt::Display for Apn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Session AMBR
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ambr {
    pub br_ul: u32,
    pub br_dl: u32,
    pub br_unit: BitrateUnitsAmbr,
}

impl Default for Ambr {
    fn default() -> Self {
        Self {
            br_ul: 0,
            br_dl: 0,
            br_unit: BitrateUnitsAmbr::Kbps,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u32)]
pub enum PreemptionCapability {
    #[default]
    Enabled = 0,
    Disabled = 1,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u32)]
pub enum PreemptionVulnerability {
    #[default]
    Enabled = 0,
    Disabled = 1,
}

/// ARP
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AllocationRetentionPriority {
    pub priority_level: u8,
    pub pre_emp_capability: PreemptionCapability,
    pub pre_emp_vulnerability: PreemptionVulnerability,
}

/// Subscribed default QoS of the session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SubscribedQosProfile {
    pub qci: u8,
    pub arp: AllocationRetentionPriority,
}

/// Inputs for a PDU session establishment request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PduSessionParams {
    pub imsi: Imsi,
    pub apn: Apn,
    pub pdu_session_id: u32,
    pub pdu_session_type: PduSessionType,
    pub gnb_gtp_teid: u32,
    /// Procedure transaction identity; zero means none
    pub pti: u8,
    /// gNB tunnel address, network byte order
    pub gnb_gtp_teid_ip_addr: [u8; 4],
    /// UE IPv4 address text; empty when unassigned
    pub ue_ipv4: String,
    /// UE IPv6 address text; empty when unassigned
    pub ue_ipv6: String,
    pub version: u32,
    pub state_ambr: Ambr,
    pub qos_profile: SubscribedQosProfile,
}

impl PduSessionParams {
    /// Parameters with the mandatory identifiers set and everything else
    /// zeroed or empty.
    pub fn new(imsi: Imsi, apn: Apn, pdu_session_id: u32) -> Self {
        Self {
            imsi,
            apn,
            pdu_session_id,
            pdu_session_type: PduSessionType::Ipv4,
            gnb_gtp_teid: 0,
            pti: 0,
            gnb_gtp_teid_ip_addr: [0; 4],
            ue_ipv4: String::new(),
            ue_ipv6: String::new(),
            version: 0,
            state_ambr: Ambr::default(),
            qos_profile: SubscribedQosProfile::default(),
        }
    }

    pub fn gnb_address(&self) -> Ipv4Addr {
        Ipv4Addr::from(self.gnb_gtp_teid_ip_addr)
    }
}

/// Inputs for a session notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmNotificationParams {
    pub imsi: Imsi,
    pub apn: Apn,
    pub pdu_session_id: u32,
    pub request_type: RequestType,
    pub sm_session_state: SmSessionFsmState,
    pub version: u32,
    pub event: NotifyUeEvent,
}
