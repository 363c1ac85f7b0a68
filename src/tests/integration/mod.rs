//! NGCore integration tests
//!
//! ## Test Categories
//!
//! - `decode`: N2 NGAP decoding including encoder-defect recovery
//! - `session`: N11 session signaling against a fake sessiond over HTTP/2

pub mod common;
pub mod decode;
pub mod session;

pub use common::*;
