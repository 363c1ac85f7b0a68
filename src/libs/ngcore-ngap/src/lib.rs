//! NGCore N2 decoding
//!
//! Turns inbound NGAP buffers delivered by the SCTP layer into
//! [`NgapPdu`](ngcore_asn1c::ngap::NgapPdu) values. Interpreting the decoded
//! message (dispatch on procedure code, IE extraction) belongs to the caller.
//!
//! ```
//! use ngcore_ngap::{decode_ngap_pdu, Recovery};
//!
//! let mut raw = vec![0x00, 0x15, 0x00, 0x03, 0x00, 0x00, 0x00];
//! let decoded = decode_ngap_pdu(&mut raw).unwrap();
//! assert_eq!(decoded.recovery, Recovery::None);
//! assert_eq!(decoded.pdu.procedure_code().0, 21);
//! ```

pub mod decoder;
pub mod error;


pub use decoder::{
    decode_ngap_pdu, patch_known_encoder_defect, AperNgapCodec, Decoded, NgapDecoder, PduCodec,
    Recovery, CORRECTED_TAG, DEFECT_SIGNATURE, DEFECT_TAG,
};
pub use error::{DecodeError, DecodeResult};
