// Copyright (c) 2022-2023 The MobileCoin Foundation

use strum::{EnumCount, EnumIter};

/// [Engine][super::Engine] errors, reported to clients via
/// [`ErrorResp`][keychain_proto::error::ErrorResp] frames and counted by
/// [`Telemetry`][crate::telemetry::Telemetry].
#[derive(Copy, Clone, PartialEq, Eq, Debug, EnumCount, EnumIter)]
#[cfg_attr(feature = "thiserror", derive(thiserror::Error))]
#[repr(u8)]
pub enum Error {
    /// Unrecognised command type
    #[cfg_attr(feature = "thiserror", error("Unknown command"))]
    UnknownCommand = 0x00,

    /// Frame could not be parsed
    #[cfg_attr(feature = "thiserror", error("Malformed message"))]
    MalformedMessage = 0x01,

    /// Supplied public key does not match the stored account key
    #[cfg_attr(feature = "thiserror", error("Invalid public key"))]
    InvalidPublicKey = 0x02,

    /// Account slot has never been generated
    #[cfg_attr(feature = "thiserror", error("Account not initialized"))]
    AccountNotInitialized = 0x03,

    /// Request is not valid in the current device status
    #[cfg_attr(feature = "thiserror", error("Unexpected request for device status"))]
    InvalidStateForRequest = 0x04,

    /// Produced signature failed verification
    #[cfg_attr(feature = "thiserror", error("Signature verification failed"))]
    SignatureVerificationFailed = 0x05,

    /// Account index out of range
    #[cfg_attr(feature = "thiserror", error("Invalid account index"))]
    InvalidIndex = 0x06,

    /// Invalid argument length
    #[cfg_attr(feature = "thiserror", error("Invalid argument length"))]
    InvalidLength = 0x07,

    /// Invalid argument encoding
    #[cfg_attr(feature = "thiserror", error("Invalid argument"))]
    InvalidArgument = 0x08,

    /// Message encoding failed
    #[cfg_attr(feature = "thiserror", error("Message encoding failed"))]
    EncodingFailed = 0x09,
}

impl Error {
    /// Numeric error code, sent in error responses
    pub const fn code(&self) -> u8 {
        *self as u8
    }

    /// Human readable reason, sent in error responses
    pub const fn reason(&self) -> &'static str {
        match self {
            Error::UnknownCommand => "Unknown command",
            Error::MalformedMessage => "Malformed message",
            Error::InvalidPublicKey => "Invalid public key",
            Error::AccountNotInitialized => "Account not initialized",
            Error::InvalidStateForRequest => "Unexpected request for device status",
            Error::SignatureVerificationFailed => "Signature verification failed",
            Error::InvalidIndex => "Invalid account index",
            Error::InvalidLength => "Invalid argument length",
            Error::InvalidArgument => "Invalid argument",
            Error::EncodingFailed => "Message encoding failed",
        }
    }
}
