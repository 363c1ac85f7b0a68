//! NGAP test vectors

use ngcore_asn1c::ngap::{
    Criticality, NgapMessage, NgapPdu, ProcedureCode, ProtocolIeContainer, ProtocolIeField, ProtocolIeId,
};
use ngcore_ngap::{CORRECTED_TAG, DEFECT_SIGNATURE, DEFECT_TAG};

/// NGSetupRequest with an empty IE container
pub const NG_SETUP_REQUEST_EMPTY: [u8; 7] = [0x00, 0x15, 0x00, 0x03, 0x00, 0x00, 0x00];

/// InitialUEMessage carrying a RAN UE id, a NAS-PDU and a 72-octet user
/// location IE whose value starts with the defect signature. The IE's
/// length octet (0x48) is what the faulty encoder emits as 0x50.
pub fn initial_ue_message() -> Vec<u8> {
    let mut location = DEFECT_SIGNATURE.to_vec();
    location.resize(72, 0x00);

    let ies = ProtocolIeContainer::new()
        .with_ie(ProtocolIeField::new(ProtocolIeId::RAN_UE_NGAP_ID, Criticality::Reject, vec![0x01]))
        .with_ie(ProtocolIeField::new(ProtocolIeId::NAS_PDU, Criticality::Reject, vec![0x7e, 0x00, 0x41]))
        .with_ie(ProtocolIeField::new(ProtocolIeId::USER_LOCATION_INFORMATION, Criticality::Reject, location));

    NgapPdu::InitiatingMessage(NgapMessage::new(ProcedureCode::INITIAL_UE_MESSAGE, Criticality::Ignore, ies))
        .to_bytes()
        .unwrap()
        .to_vec()
}

/// Offset of the octet preceding the first defect signature
pub fn defect_offset(buf: &[u8]) -> usize {
    let at = buf.windows(3).position(|w| w == DEFECT_SIGNATURE).unwrap();
    assert_eq!(buf[at - 1], CORRECTED_TAG);
    at - 1
}

/// `initial_ue_message` as sent by the faulty encoder
pub fn initial_ue_message_with_defect() -> (Vec<u8>, usize) {
    let mut raw = initial_ue_message();
    let at = defect_offset(&raw);
    raw[at] = DEFECT_TAG;
    (raw, at)
}
