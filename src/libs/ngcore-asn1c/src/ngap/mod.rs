//! NGAP codec (3GPP TS 38.413)

pub mod types;
pub mod ies;
pub mod pdu;

pub use ies::{ProtocolIeContainer, ProtocolIeField};
pub use pdu::{MessageKind, NgapMessage, NgapPdu};
pub use types::{Criticality, ProcedureCode, ProtocolIeId};
