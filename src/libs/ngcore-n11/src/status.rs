//! RPC completion status

use std::fmt;

/// Standard RPC status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RpcCode {
    Ok = 0,
    Cancelled = 1,
    Unknown = 2,
    InvalidArgument = 3,
    DeadlineExceeded = 4,
    NotFound = 5,
    AlreadyExists = 6,
    PermissionDenied = 7,
    ResourceExhausted = 8,
    FailedPrecondition = 9,
    Aborted = 10,
    OutOfRange = 11,
    Unimplemented = 12,
    Internal = 13,
    Unavailable = 14,
    DataLoss = 15,
    Unauthenticated = 16,
}

impl RpcCode {
    /// Returns the status code number.
    pub fn code(&self) -> u32 {
        *self as u32
    }

    /// Returns the status name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::Cancelled => "CANCELLED",
            Self::Unknown => "UNKNOWN",
            Self::InvalidArgument => "INVALID_ARGUMENT",
            Self::DeadlineExceeded => "DEADLINE_EXCEEDED",
            Self::NotFound => "NOT_FOUND",
            Self::AlreadyExists => "ALREADY_EXISTS",
            Self::PermissionDenied => "PERMISSION_DENIED",
            Self::ResourceExhausted => "RESOURCE_EXHAUSTED",
            Self::FailedPrecondition => "FAILED_PRECONDITION",
            Self::Aborted => "ABORTED",
            Self::OutOfRange => "OUT_OF_RANGE",
            Self::Unimplemented => "UNIMPLEMENTED",
            Self::Internal => "INTERNAL",
            Self::Unavailable => "UNAVAILABLE",
            Self::DataLoss => "DATA_LOSS",
            Self::Unauthenticated => "UNAUTHENTICATED",
        }
    }

    /// Whether this is a success status.
    pub fn is_ok(&self) -> bool {
        *self == Self::Ok
    }
}

impl fmt::Display for RpcCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Outcome of one RPC as seen by its callback
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RpcStatus {
    pub code: RpcCode,
    pub message: String,
}

impl RpcStatus {
    pub fn new(code: RpcCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn ok() -> Self {
        Self::new(RpcCode::Ok, "")
    }

    /// Reported when a call's deadline passes before a response arrives
    pub fn deadline_exceeded() -> Self {
        Self::new(RpcCode::DeadlineExceeded, "Deadline Exceeded")
    }

    pub fn cancelled(message: impl Into<String>) -> Self {
        Self::new(RpcCode::Cancelled, message)
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(RpcCode::Unavailable, message)
    }

    /// Map an HTTP response status onto an RPC code.
    ///
    /// Follows the usual HTTP-to-RPC mapping: 2xx is OK, unknown statuses
    /// are `Unknown`.
    pub fn from_http_status(status: u16, message: impl Into<String>) -> Self {
        let code = match status {
            200..=299 => RpcCode::Ok,
            400 => RpcCode::InvalidArgument,
            401 => RpcCode::Unauthenticated,
            403 => RpcCode::PermissionDenied,
            404 => RpcCode::NotFound,
            408 | 504 => RpcCode::DeadlineExceeded,
            409 => RpcCode::Aborted,
            412 => RpcCode::FailedPrecondition,
            429 => RpcCode::ResourceExhausted,
            499 => RpcCode::Cancelled,
            500 => RpcCode::Internal,
            501 => RpcCode::Unimplemented,
            502 | 503 => RpcCode::Unavailable,
            _ => RpcCode::Unknown,
        };
        Self::new(code, message)
    }

    pub fn is_ok(&self) -> bool {
        self.code.is_ok()
    }

    /// Numeric status code
    pub fn error_code(&self) -> u32 {
        self.code.code()
    }
}

impl fmt::Display for RpcStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.message.is_empty() {
            write!(f, "{}", self.code)
        } else {
            write!(f, "{}: {}", self.code, self.message)
        }
    }
}
