//! NGCore ASN.1 codec library
//!
//! Aligned PER primitives and the NGAP-PDU structure decoded by the AMF
//! on its N2 interface.
//!
//! # Modules
//!
//! - `per` - Aligned PER (APER) encoder/decoder
//! - `ngap` - NGAP-PDU, message and IE container types

pub mod per;
pub mod ngap;


pub use per::{AperDecode, AperDecoder, AperEncode, AperEncoder, Constraint, PerError, PerResult};
