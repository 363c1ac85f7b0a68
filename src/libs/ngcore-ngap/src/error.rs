//! NGAP decode error types

use ngcore_asn1c::PerError;
use thiserror::Error;

/// Errors surfaced by the N2 PDU decoder
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DecodeError {
    /// Both the primary attempt and the retry on the patched buffer failed.
    /// Carries the error of the retry.
    #[error("Failed to decode NGAP PDU: {0}")]
    Malformed(#[source] PerError),
}

impl DecodeError {
    /// Codec error of the final attempt
    pub fn per_error(&self) -> &PerError {
        match self {
            DecodeError::Malformed(e) => e,
        }
    }
}

pub type DecodeResult<T> = Result<T, DecodeError>;
