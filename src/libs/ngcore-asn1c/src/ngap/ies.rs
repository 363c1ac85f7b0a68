//! Protocol IE containers (NGAP-Containers)
//!
//! IE values are kept as their raw open-type octets. Interpreting a value is
//! left to whoever dispatches on the IE id.

use crate::per::{AperDecode, AperDecoder, AperEncode, AperEncoder, PerResult};
use super::types::{Criticality, ProtocolIeId};

/// ProtocolIE-Field ::= SEQUENCE { id, criticality, value }
#[derive(Debug, Clone, PartialEq)]
pub struct ProtocolIeField {
    pub id: ProtocolIeId,
    pub criticality: Criticality,
    pub value: Vec<u8>,
}

impl ProtocolIeField {
    pub fn new(id: ProtocolIeId, criticality: Criticality, value: impl Into<Vec<u8>>) -> Self {
        Self {
            id,
            criticality,
            value: value.into(),
        }
    }
}

impl AperEncode for ProtocolIeField {
    fn encode_aper(&self, encoder: &mut AperEncoder) -> PerResult<()> {
        self.id.encode_aper(encoder)?;
        self.criticality.encode_aper(encoder)?;
        encoder.encode_length_determinant(self.value.len())?;
        encoder.write_bytes(&self.value);
        Ok(())
    }
}

impl AperDecode for ProtocolIeField {
    fn decode_aper(decoder: &mut AperDecoder) -> PerResult<Self> {
        let id = ProtocolIeId::decode_aper(decoder)?;
        let criticality = Criticality::decode_aper(decoder)?;
        let value = decoder.decode_open_type_bytes()?;
        Ok(ProtocolIeField { id, criticality, value })
    }
}

/// ProtocolIE-Container ::= SEQUENCE (SIZE (0..maxProtocolIEs)) OF ProtocolIE-Field
///
/// Encoded here together with the extension bit of the message SEQUENCE
/// that owns it (`XxxRequest ::= SEQUENCE { protocolIEs, ... }`).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProtocolIeContainer {
    pub ies: Vec<ProtocolIeField>,
}

impl ProtocolIeContainer {
    pub const MAX_PROTOCOL_IES: usize = 65535;

    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, ie: ProtocolIeField) {
        self.ies.push(ie);
    }

    pub fn with_ie(mut self, ie: ProtocolIeField) -> Self {
        self.ies.push(ie);
        self
    }

    pub fn len(&self) -> usize {
        self.ies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ies.is_empty()
    }

    pub fn find(&self, id: ProtocolIeId) -> Option<&ProtocolIeField> {
        self.ies.iter().find(|ie| ie.id == id)
    }

    /// IE ids in wire order
    pub fn ie_ids(&self) -> Vec<ProtocolIeId> {
        self.ies.iter().map(|ie| ie.id).collect()
    }
}

impl AperEncode for ProtocolIeContainer {
    fn encode_aper(&self, encoder: &mut AperEncoder) -> PerResult<()> {
        // message SEQUENCE extension bit: no extension additions
        encoder.write_bit(false);
        encoder.encode_constrained_length(self.ies.len(), 0, Self::MAX_PROTOCOL_IES)?;
        for ie in &self.ies {
            ie.encode_aper(encoder)?;
        }
        Ok(())
    }
}

impl AperDecode for ProtocolIeContainer {
    fn decode_aper(decoder: &mut AperDecoder) -> PerResult<Self> {
        // Extension additions to the message SEQUENCE are not modelled
        let _extended = decoder.read_bit()?;
        let count = decoder.decode_constrained_length(0, Self::MAX_PROTOCOL_IES)?;
        let mut ies = Vec::with_capacity(count.min(64));
        for _ in 0..count {
            ies.push(ProtocolIeField::decode_aper(decoder)?);
        }
        Ok(ProtocolIeContainer { ies })
    }
}
