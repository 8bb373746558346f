// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Signature request / approval messages
//!
//! A signing operation is a two step exchange, the client issues a
//! [`SignatureReq`] proving ownership of the account by including the
//! account public key, the device then waits for an out-of-band user
//! decision ([`ApprovalDecision`], forwarded from the provisioning interface)
//! before responding with either a [`SignatureResp`] or a
//! [`SignatureRejected`][crate::MessageType::SignatureRejected] frame.

use serde::{Deserialize, Serialize};

use crate::{helpers::arr, MSG_LEN, PK_LEN, SIG_LEN};

/// Signature request message
///
/// ## Encoding:
/// ```text
/// {"type":0,"data":{"index":0,"pk":[69,99,...],"msg":[97,109,...]}}
/// ```
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct SignatureReq {
    /// Account index
    pub index: i32,

    /// Account public key, must match the stored key for `index`
    #[serde(with = "arr")]
    pub pk: [u8; PK_LEN],

    /// Message to be signed
    #[serde(with = "arr")]
    pub msg: [u8; MSG_LEN],
}

impl SignatureReq {
    /// Create a new [`SignatureReq`] message
    pub fn new(index: i32, pk: [u8; PK_LEN], msg: [u8; MSG_LEN]) -> Self {
        Self { index, pk, msg }
    }
}

/// User approval decision for a pending signature request
///
/// ## Encoding:
/// ```text
/// {"type":11,"data":{"approve":true}}
/// ```
#[derive(Copy, Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct ApprovalDecision {
    pub approve: bool,
}

/// Signature response message
///
/// ## Encoding:
/// ```text
/// {"type":1,"data":{"signature":[12,250,...]}}
/// ```
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct SignatureResp {
    /// ECDSA signature (r || s)
    #[serde(with = "arr")]
    pub signature: [u8; SIG_LEN],
}
