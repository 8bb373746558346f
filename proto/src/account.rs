// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Account messages, for fetching, generating, and selecting accounts

use alloc::string::String;

use serde::{Deserialize, Serialize};

use crate::{helpers::arr, MSK_LEN, PK_LEN, SALT_LEN};

/// Index value used to request account selection mode
pub const SELECT_INDEX: i32 = -1;

/// Account request message.
///
/// Requests public account material for the provided index, or
/// switches the device into account selection mode when the
/// index is [`SELECT_INDEX`].
///
/// ## Encoding:
/// ```text
/// {"type":3,"data":{"index":-1}}
/// ```
#[derive(Copy, Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct GetAccountReq {
    pub index: i32,
}

impl GetAccountReq {
    /// Create a new [`GetAccountReq`] message
    pub fn new(index: i32) -> Self {
        Self { index }
    }

    /// Create a [`GetAccountReq`] requesting account selection mode
    pub fn select() -> Self {
        Self {
            index: SELECT_INDEX,
        }
    }
}

/// Account response message
///
/// Contains the public key, derived secret, and salt for an initialised account.
///
/// ## Encoding:
/// ```text
/// {"type":4,"data":{"index":2,"pk":[...64],"msk":[...32],"salt":[...32]}}
/// ```
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct GetAccountResp {
    pub index: i32,

    #[serde(with = "arr")]
    pub pk: [u8; PK_LEN],

    #[serde(with = "arr")]
    pub msk: [u8; MSK_LEN],

    #[serde(with = "arr")]
    pub salt: [u8; SALT_LEN],
}

/// Account rejected message, returned for uninitialised accounts
#[derive(Copy, Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct GetAccountRejected {
    pub index: i32,
}

/// Account generation request
///
/// ## Encoding:
/// ```text
/// {"type":12,"data":{"index":2}}
/// ```
#[derive(Copy, Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct GenerateAccountReq {
    pub index: i32,
}

/// Account selection, issued by the provisioning interface while the
/// device is in account selection mode.
///
/// An index of [`SELECT_INDEX`] cancels selection.
///
/// ## Encoding:
/// ```text
/// {"type":14,"data":{"index":1,"sender":"0x2a1f..."}}
/// ```
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct SelectAccountReq {
    pub index: i32,

    /// Sender identifier for the selected account
    #[serde(default)]
    pub sender: String,
}

impl SelectAccountReq {
    /// Create a [`SelectAccountReq`] cancelling selection
    pub fn cancel() -> Self {
        Self {
            index: SELECT_INDEX,
            sender: String::new(),
        }
    }
}
