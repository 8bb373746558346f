// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Protocol / message definitions for keychain communication
//!
//! This module provides a protocol specification and reference implementation for
//! communication with the keychain over its command channel (USB serial on hardware,
//! TCP for the simulator).
//!
//! Messages are newline-delimited JSON objects carrying a numeric `type` discriminant
//! and an optional `data` payload, for example:
//!
//! ```text
//! {"type":3,"data":{"index":2}}
//! ```
//!
//! Byte arrays (keys, salts, messages, signatures) are encoded as ordered sequences of
//! integers in the range 0-255, which keeps the format trivially consumable from
//! browser and scripting environments.
//!
//! The only exception to JSON framing is artifact transfer, where a
//! [`GetArtifactResponseStart`][MessageType::GetArtifactResponseStart] frame announces
//! the artifact length and is followed by exactly that many raw bytes.
//!

#![no_std]

extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

use num_enum::TryFromPrimitive;
use strum::{Display, EnumIter, EnumString};

pub mod account;
pub mod artifact;
pub mod error;
pub mod frame;
pub mod prelude;
pub mod sender;
pub mod settings;
pub mod signature;

mod helpers;

pub use error::ProtoError;
pub use frame::{Request, Response};

/// Maximum number of accounts held by the device
pub const MAX_ACCOUNTS: usize = 5;

/// Secret key length
pub const SK_LEN: usize = 32;

/// Uncompressed public key length (x || y, no SEC1 tag)
pub const PK_LEN: usize = 64;

/// Derived secret (msk) length
pub const MSK_LEN: usize = 32;

/// Account salt length
pub const SALT_LEN: usize = 32;

/// Signing message length
pub const MSG_LEN: usize = 64;

/// Signature length (r || s)
pub const SIG_LEN: usize = 64;

/// Sender identifier length (`0x` followed by 64 hex digits)
pub const SENDER_LEN: usize = 66;

/// Maximum SSID / password length
pub const SETTING_LEN: usize = 32;

/// Maximum encoded frame length (excluding the newline delimiter)
pub const MAX_FRAME_LEN: usize = 1024;

/// Keychain message types, sent as the `type` field of each frame
#[derive(
    Copy, Clone, Debug, PartialEq, Eq, Display, EnumString, EnumIter, TryFromPrimitive,
)]
#[repr(u8)]
pub enum MessageType {
    /// Request a signature over a message (pending user approval)
    SignatureRequest = 0,

    /// Approved signature
    Signature = 1,

    /// Signature request rejected by the user
    SignatureRejected = 2,

    /// Fetch account keys (or enter account selection with index -1)
    GetAccountRequest = 3,

    /// Account keys
    GetAccountResponse = 4,

    /// Account not initialised
    GetAccountRejected = 5,

    /// Fetch the stored artifact
    GetArtifactRequest = 6,

    /// Artifact length header, followed by raw artifact bytes
    GetArtifactResponseStart = 7,

    /// Fetch the selected sender identifier
    GetSenderRequest = 8,

    /// Selected sender identifier
    GetSenderResponse = 9,

    /// Error response
    Error = 10,

    /// User approval decision for the pending signature request
    SignatureApprovalDecision = 11,

    /// Generate a fresh account at the provided index
    GenerateAccount = 12,

    /// Generic acknowledgement
    Ok = 13,

    /// Confirm account selection (from the provisioning interface)
    SelectAccount = 14,

    /// Fetch device settings
    GetSettingsRequest = 15,

    /// Device settings
    GetSettingsResponse = 16,

    /// Write device settings
    WriteSettings = 17,
}

#[cfg(test)]
pub(crate) mod test {
    use serde::{de::DeserializeOwned, Serialize};

    /// Helper for payload encode / decode tests
    pub fn encode_decode<T: Serialize + DeserializeOwned + PartialEq + core::fmt::Debug>(
        v: &T,
    ) -> alloc::vec::Vec<u8> {
        let encoded = serde_json::to_vec(v).expect("encode failed");

        assert!(
            encoded.len() < super::MAX_FRAME_LEN,
            "encoded length {} exceeds maximum frame length",
            encoded.len()
        );

        let decoded: T = serde_json::from_slice(&encoded).expect("decode failed");
        assert_eq!(v, &decoded);

        encoded
    }
}
