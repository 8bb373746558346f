// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Protocol errors and the device [`ErrorResp`] message

use alloc::string::String;
use core::fmt;

use serde::{Deserialize, Serialize};

use crate::MessageType;

/// Protocol encoding / decoding errors
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum ProtoError {
    /// Frame is not a valid JSON message object
    InvalidEncoding,
    /// Unrecognised message type
    UnknownType(i64),
    /// Message type is valid but not expected in this direction
    UnexpectedType(MessageType),
    /// Payload does not match the message type
    InvalidPayload(MessageType),
    /// Message encoding failed
    EncodingFailed,
    /// Encoded frame exceeds [`MAX_FRAME_LEN`][crate::MAX_FRAME_LEN]
    FrameOverflow,
}

impl fmt::Display for ProtoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtoError::InvalidEncoding => write!(f, "invalid frame encoding"),
            ProtoError::UnknownType(t) => write!(f, "unknown message type {t}"),
            ProtoError::UnexpectedType(t) => write!(f, "unexpected message type {t}"),
            ProtoError::InvalidPayload(t) => write!(f, "invalid payload for {t}"),
            ProtoError::EncodingFailed => write!(f, "message encoding failed"),
            ProtoError::FrameOverflow => write!(f, "frame length exceeded"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ProtoError {}

/// Error response message
///
/// ## Encoding:
/// ```text
/// {"type":10,"data":{"code":2,"error":"Invalid public key"}}
/// ```
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct ErrorResp {
    /// Device error code
    #[serde(default)]
    pub code: u8,

    /// Human readable reason
    pub error: String,
}

impl ErrorResp {
    /// Create a new [`ErrorResp`] message
    pub fn new(code: u8, error: &str) -> Self {
        Self {
            code,
            error: error.into(),
        }
    }
}
