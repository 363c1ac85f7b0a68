//! N2 decoding integration tests

use ngcore_asn1c::ngap::{Criticality, MessageKind, ProcedureCode, ProtocolIeId};
use ngcore_ngap::{decode_ngap_pdu, DecodeError, Recovery, CORRECTED_TAG};

use crate::common::*;

#[test]
fn test_ng_setup_request_decodes_first_time() {
    let _ = env_logger::try_init();

    let mut raw = NG_SETUP_REQUEST_EMPTY.to_vec();
    let decoded = decode_ngap_pdu(&mut raw).unwrap();

    assert_eq!(decoded.recovery, Recovery::None);
    assert_eq!(decoded.pdu.kind(), MessageKind::InitiatingMessage);
    assert_eq!(decoded.pdu.procedure_code(), ProcedureCode::NG_SETUP);
    assert_eq!(raw, NG_SETUP_REQUEST_EMPTY);
}

#[test]
fn test_initial_ue_message_summary() {
    let _ = env_logger::try_init();

    let mut raw = initial_ue_message();
    let decoded = decode_ngap_pdu(&mut raw).unwrap();

    assert_eq!(decoded.pdu.procedure_code(), ProcedureCode::INITIAL_UE_MESSAGE);
    assert_eq!(decoded.pdu.message().criticality, Criticality::Ignore);
    assert_eq!(
        decoded.pdu.ies().ie_ids(),
        vec![
            ProtocolIeId::RAN_UE_NGAP_ID,
            ProtocolIeId::NAS_PDU,
            ProtocolIeId::USER_LOCATION_INFORMATION
        ]
    );
}

#[test]
fn test_defective_encoding_recovered() {
    let _ = env_logger::try_init();

    let (mut raw, at) = initial_ue_message_with_defect();
    let decoded = decode_ngap_pdu(&mut raw).unwrap();

    assert_eq!(decoded.recovery, Recovery::Patched { offsets: vec![at] });
    assert_eq!(raw[at], CORRECTED_TAG);
    assert_eq!(raw, initial_ue_message());
    assert_eq!(decoded.pdu.to_bytes().unwrap().as_ref(), raw.as_slice());
}

#[test]
fn test_truncated_pdu_is_malformed() {
    let _ = env_logger::try_init();

    let mut raw = initial_ue_message();
    raw.truncate(raw.len() - 10);
    let before = raw.clone();

    let err = decode_ngap_pdu(&mut raw).unwrap_err();
    assert!(matches!(err, DecodeError::Malformed(_)));
    // nothing matched the defect pattern, so nothing was rewritten
    assert_eq!(raw, before);
}
