//! N11 error types

use thiserror::Error;

/// Errors raised while preparing, configuring or starting N11 signaling.
///
/// Outcomes of RPCs already submitted are never reported here; they reach
/// the caller's callback as an [`RpcStatus`](crate::status::RpcStatus).
#[derive(Error, Debug)]
pub enum N11Error {
    /// IMSI is not 5 to 15 decimal digits
    #[error("Invalid IMSI: {0:?}")]
    InvalidImsi(String),

    /// APN octets are not valid UTF-8
    #[error("Invalid APN: {0}")]
    InvalidApn(String),

    /// Configuration could not be used
    #[error("Configuration error: {0}")]
    Config(String),

    /// No endpoint registered under the requested service name
    #[error("Service not found: {0}")]
    ServiceNotFound(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parse error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization error
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for N11 operations
pub type N11Result<T> = Result<T, N11Error>;
