//! Session context builders
//!
//! Pure mappings from AMF session parameters to sessiond requests.

use std::net::Ipv4Addr;

use crate::proto::{
    CommonSessionContext, M5GSmSessionContext, QosInformationRequest, RatSpecificContext,
    RatSpecificNotification, RatType, RequestType, SetSmNotificationContext, SetSmSessionContext,
    SmSessionFsmState, SubscriberId, SubscriberIdType, TeidSet,
};
use crate::types::{Imsi, PduSessionParams, SmNotificationParams};

const SUBSCRIBER_ID_PREFIX: &str = "IMSI";

fn subscriber_id(imsi: &Imsi) -> SubscriberId {
    SubscriberId {
        id: format!("{SUBSCRIBER_ID_PREFIX}{imsi}"),
        id_type: SubscriberIdType::Imsi,
    }
}

fn non_empty(addr: &str) -> Option<String> {
    (!addr.is_empty()).then(|| addr.to_owned())
}

/// The PTI octet read as a one-character string; a zero PTI terminates
/// immediately and yields an empty value.
fn procedure_trans_identity(pti: u8) -> Vec<u8> {
    if pti == 0 {
        Vec::new()
    } else {
        vec![pti]
    }
}

/// Build a `SetAmfSessionContext` request for an initial PDU session
/// establishment.
pub fn create_sm_pdu_session(params: &PduSessionParams) -> SetSmSessionContext {
    let common_context = CommonSessionContext {
        sid: subscriber_id(&params.imsi),
        ue_ipv4: non_empty(&params.ue_ipv4),
        ue_ipv6: non_empty(&params.ue_ipv6),
        apn: params.apn.as_str().to_owned(),
        rat_type: RatType::TgppNr,
        sm_session_state: SmSessionFsmState::Creating0,
        sm_session_version: params.version,
    };

    let qos = &params.qos_profile;
    let subscribed_qos = QosInformationRequest {
        qos_class_id: u32::from(qos.qci),
        priority_level: u32::from(qos.arp.priority_level),
        preemption_capability: qos.arp.pre_emp_capability as u32,
        preemption_vulnerability: qos.arp.pre_emp_vulnerability as u32,
        apn_ambr_ul: params.state_ambr.br_ul,
        apn_ambr_dl: params.state_ambr.br_dl,
        br_unit: params.state_ambr.br_unit,
    };

    let m5gsm_session_context = M5GSmSessionContext {
        pdu_session_id: params.pdu_session_id,
        request_type: RequestType::InitialRequest,
        pdu_session_type: params.pdu_session_type,
        gnode_endpoint: TeidSet {
            teid: params.gnb_gtp_teid,
            end_ipv4_addr: Ipv4Addr::from(params.gnb_gtp_teid_ip_addr).to_string(),
        },
        procedure_trans_identity: procedure_trans_identity(params.pti),
        subscribed_qos,
    };

    SetSmSessionContext {
        common_context,
        rat_specific_context: RatSpecificContext { m5gsm_session_context },
    }
}

/// Build a `SetSmfNotification` request.
pub fn create_sm_notification(params: &SmNotificationParams) -> SetSmNotificationContext {
    SetSmNotificationContext {
        common_context: CommonSessionContext {
            sid: subscriber_id(&params.imsi),
            ue_ipv4: None,
            ue_ipv6: None,
            apn: params.apn.as_str().to_owned(),
            rat_type: RatType::TgppNr,
            sm_session_state: params.sm_session_state,
            sm_session_version: params.version,
        },
        rat_specific_notification: RatSpecificNotification {
            pdu_session_id: params.pdu_session_id,
            request_type: params.request_type,
            notify_ue_event: params.event,
        },
    }
}
