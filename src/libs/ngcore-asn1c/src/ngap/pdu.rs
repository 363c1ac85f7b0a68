//! NGAP-PDU (NGAP-PDU-Descriptions)
//!
//! All three elementary-procedure message kinds share one shape:
//! `SEQUENCE { procedureCode, criticality, value }` where `value` is an open
//! type holding the message's IE container.

use std::fmt;

use crate::per::{AperDecode, AperDecoder, AperEncode, AperEncoder, PerError, PerResult};
use super::ies::ProtocolIeContainer;
use super::types::{Criticality, ProcedureCode};

/// Which CHOICE alternative of NGAP-PDU a message was carried in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    InitiatingMessage,
    SuccessfulOutcome,
    UnsuccessfulOutcome,
}

impl MessageKind {
    fn index(self) -> usize {
        match self {
            MessageKind::InitiatingMessage => 0,
            MessageKind::SuccessfulOutcome => 1,
            MessageKind::UnsuccessfulOutcome => 2,
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MessageKind::InitiatingMessage => "initiatingMessage",
            MessageKind::SuccessfulOutcome => "successfulOutcome",
            MessageKind::UnsuccessfulOutcome => "unsuccessfulOutcome",
        };
        f.write_str(name)
    }
}

/// One elementary-procedure message
#[derive(Debug, Clone, PartialEq)]
pub struct NgapMessage {
    pub procedure_code: ProcedureCode,
    pub criticality: Criticality,
    pub value: ProtocolIeContainer,
}

impl NgapMessage {
    pub fn new(procedure_code: ProcedureCode, criticality: Criticality, value: ProtocolIeContainer) -> Self {
        Self {
            procedure_code,
            criticality,
            value,
        }
    }
}

impl AperEncode for NgapMessage {
    fn encode_aper(&self, encoder: &mut AperEncoder) -> PerResult<()> {
        self.procedure_code.encode_aper(encoder)?;
        self.criticality.encode_aper(encoder)?;
        encoder.encode_open_type(&self.value)
    }
}

impl AperDecode for NgapMessage {
    fn decode_aper(decoder: &mut AperDecoder) -> PerResult<Self> {
        let procedure_code = ProcedureCode::decode_aper(decoder)?;
        let criticality = Criticality::decode_aper(decoder)?;
        let value = decoder.decode_open_type::<ProtocolIeContainer>()?;
        Ok(NgapMessage {
            procedure_code,
            criticality,
            value,
        })
    }
}

/// NGAP-PDU ::= CHOICE { initiatingMessage, successfulOutcome, unsuccessfulOutcome, ... }
#[derive(Debug, Clone, PartialEq)]
pub enum NgapPdu {
    InitiatingMessage(NgapMessage),
    SuccessfulOutcome(NgapMessage),
    UnsuccessfulOutcome(NgapMessage),
}

impl NgapPdu {
    pub const NUM_ALTERNATIVES: usize = 3;
    pub const EXTENSIBLE: bool = true;

    pub fn kind(&self) -> MessageKind {
        match self {
            NgapPdu::InitiatingMessage(_) => MessageKind::InitiatingMessage,
            NgapPdu::SuccessfulOutcome(_) => MessageKind::SuccessfulOutcome,
            NgapPdu::UnsuccessfulOutcome(_) => MessageKind::UnsuccessfulOutcome,
        }
    }

    pub fn message(&self) -> &NgapMessage {
        match self {
            NgapPdu::InitiatingMessage(m)
            | NgapPdu::SuccessfulOutcome(m)
            | NgapPdu::UnsuccessfulOutcome(m) => m,
        }
    }

    pub fn procedure_code(&self) -> ProcedureCode {
        self.message().procedure_code
    }

    pub fn ies(&self) -> &ProtocolIeContainer {
        &self.message().value
    }

    /// Complete aligned encoding of the PDU
    pub fn to_bytes(&self) -> PerResult<bytes::Bytes> {
        let mut encoder = AperEncoder::new();
        self.encode_aper(&mut encoder)?;
        Ok(encoder.into_bytes())
    }
}

impl AperEncode for NgapPdu {
    fn encode_aper(&self, encoder: &mut AperEncoder) -> PerResult<()> {
        encoder.encode_choice_index(self.kind().index(), Self::NUM_ALTERNATIVES, Self::EXTENSIBLE)?;
        self.message().encode_aper(encoder)
    }
}

impl AperDecode for NgapPdu {
    fn decode_aper(decoder: &mut AperDecoder) -> PerResult<Self> {
        let index = decoder.decode_choice_index(Self::NUM_ALTERNATIVES, Self::EXTENSIBLE)?;
        let wrap = match index {
            0 => NgapPdu::InitiatingMessage,
            1 => NgapPdu::SuccessfulOutcome,
            2 => NgapPdu::UnsuccessfulOutcome,
            _ => {
                return Err(PerError::InvalidChoiceIndex {
                    index,
                    max: Self::NUM_ALTERNATIVES - 1,
                })
            }
        };
        Ok(wrap(NgapMessage::decode_aper(decoder)?))
    }
}
