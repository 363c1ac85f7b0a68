//! Common test utilities
//!
//! - NGAP test vectors
//! - A fake sessiond speaking HTTP/2 + JSON

pub mod sessiond;
pub mod vectors;

pub use sessiond::*;
pub use vectors::*;
