//! N2 PDU decoder
//!
//! Decodes an inbound NGAP buffer, falling back once to a byte-level fixup
//! for a known gNB encoder defect: a discriminator octet sent as `0x50`
//! where `0x48` is meant, immediately ahead of the octets `13 F1 84`.
//! The fixup rewrites the caller's buffer in place, which is why the buffer
//! is borrowed mutably.

use ngcore_asn1c::ngap::NgapPdu;
use ngcore_asn1c::{AperDecode, AperDecoder, PerResult};

use crate::error::{DecodeError, DecodeResult};

/// Octets that follow the mis-tagged discriminator
pub const DEFECT_SIGNATURE: [u8; 3] = [0x13, 0xF1, 0x84];
/// Discriminator as emitted by the faulty encoder
pub const DEFECT_TAG: u8 = 0x50;
/// Discriminator the faulty encoder should have emitted
pub const CORRECTED_TAG: u8 = 0x48;

/// The leaf wire codec the decoder drives
pub trait PduCodec {
    type Pdu;

    fn decode(&self, data: &[u8]) -> PerResult<Self::Pdu>;
}

/// Aligned-PER NGAP-PDU codec
#[derive(Debug, Clone, Copy, Default)]
pub struct AperNgapCodec;

impl PduCodec for AperNgapCodec {
    type Pdu = NgapPdu;

    fn decode(&self, data: &[u8]) -> PerResult<NgapPdu> {
        NgapPdu::decode_aper(&mut AperDecoder::new(data))
    }
}

/// How a successful decode was reached
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recovery {
    /// The first attempt succeeded; the buffer was not touched
    None,
    /// The first attempt failed and the retry succeeded. `offsets` lists the
    /// octets rewritten from `DEFECT_TAG` to `CORRECTED_TAG` (may be empty).
    Patched { offsets: Vec<usize> },
}

impl Recovery {
    pub fn was_patched(&self) -> bool {
        matches!(self, Recovery::Patched { .. })
    }
}

/// A decoded PDU together with how it was obtained
#[derive(Debug, Clone, PartialEq)]
pub struct Decoded<P> {
    pub pdu: P,
    pub recovery: Recovery,
}

/// Rewrites every `DEFECT_TAG` octet found immediately before
/// `DEFECT_SIGNATURE` and returns the rewritten offsets.
///
/// Signature positions `1 .. len - 3` (exclusive) are examined, matching the
/// deployed fixup; a signature ending on the last octet is not considered.
pub fn patch_known_encoder_defect(buf: &mut [u8]) -> Vec<usize> {
    let mut offsets = Vec::new();
    let end = buf.len().saturating_sub(3);
    for i in 1..end {
        if buf[i..i + 3] == DEFECT_SIGNATURE && buf[i - 1] == DEFECT_TAG {
            buf[i - 1] = CORRECTED_TAG;
            offsets.push(i - 1);
        }
    }
    offsets
}

/// NGAP decoder with a single patch-and-retry fallback
#[derive(Debug, Clone, Default)]
pub struct NgapDecoder<C = AperNgapCodec> {
    codec: C,
}

impl NgapDecoder<AperNgapCodec> {
    pub fn new() -> Self {
        Self { codec: AperNgapCodec }
    }
}

impl<C: PduCodec> NgapDecoder<C> {
    pub fn with_codec(codec: C) -> Self {
        Self { codec }
    }

    pub fn codec(&self) -> &C {
        &self.codec
    }

    /// Decode `raw`, trying at most twice.
    ///
    /// # Panics
    ///
    /// Panics if `raw` is empty; callers validate length before decoding.
    pub fn decode(&self, raw: &mut [u8]) -> DecodeResult<Decoded<C::Pdu>> {
        assert!(!raw.is_empty(), "NGAP decode called with an empty buffer");

        match self.codec.decode(raw) {
            Ok(pdu) => {
                return Ok(Decoded {
                    pdu,
                    recovery: Recovery::None,
                })
            }
            Err(e) => log::debug!("NGAP decode failed ({e}), retrying after defect fixup"),
        }

        let offsets = patch_known_encoder_defect(raw);
        for offset in &offsets {
            log::debug!(
                "Rewrote octet {offset} from 0x{DEFECT_TAG:02x} to 0x{CORRECTED_TAG:02x}"
            );
        }

        match self.codec.decode(raw) {
            Ok(pdu) => Ok(Decoded {
                pdu,
                recovery: Recovery::Patched { offsets },
            }),
            Err(e) => {
                log::error!("Failed to decode NGAP PDU ({} octets): {}", raw.len(), e);
                Err(DecodeError::Malformed(e))
            }
        }
    }
}

/// Decode an NGAP-PDU with the aligned-PER codec
pub fn decode_ngap_pdu(raw: &mut [u8]) -> DecodeResult<Decoded<NgapPdu>> {
    NgapDecoder::new().decode(raw)
}
