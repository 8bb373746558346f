// Copyright (c) 2022-2023 The MobileCoin Foundation

use alloc::string::String;

use serde::{Deserialize, Serialize};

/// Sender response, containing the identifier of the account selected
/// via the provisioning interface.
///
/// ## Encoding:
/// ```text
/// {"type":9,"data":{"sender":"0x0bad...c0de"}}
/// ```
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct SenderResp {
    pub sender: String,
}
