// Copyright (c) 2022-2023 The MobileCoin Foundation

use keychain_proto::{MessageType, ProtoError};
use tokio::time::error::Elapsed;

/// Keychain API Error Type
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Transport (stream) error
    #[error("Transport error: {0}")]
    Io(#[from] std::io::Error),

    /// Protocol encoding / decoding error
    #[error("Protocol error: {0}")]
    Proto(#[from] ProtoError),

    /// Error response from the device
    #[error("Device error {code}: {reason}")]
    Device { code: u8, reason: String },

    /// Account index out of range
    #[error("Invalid account index: {0}")]
    InvalidIndex(i32),

    /// Unexpected response type
    #[error("Unexpected response: {0}")]
    UnexpectedResponse(MessageType),

    /// Timeout waiting for user
    #[error("Timeout waiting for user interaction")]
    UserTimeout,

    /// Request timeout
    #[error("Timeout waiting for device response")]
    RequestTimeout,

    /// User denied operation
    #[error("Operation rejected by user")]
    UserDenied,

    /// Device closed the connection
    #[error("Device connection closed")]
    Closed,
}

impl Error {
    /// Fetch the device error code, for errors reported by the device
    pub fn device_code(&self) -> Option<u8> {
        match self {
            Error::Device { code, .. } => Some(*code),
            _ => None,
        }
    }
}

impl From<Elapsed> for Error {
    fn from(_: Elapsed) -> Self {
        Error::RequestTimeout
    }
}
