// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Device settings messages (provisioning access point configuration)

use alloc::string::String;

use serde::{Deserialize, Serialize};

/// Device settings, used both for [`WriteSettings`][crate::MessageType::WriteSettings]
/// requests and [`GetSettingsResponse`][crate::MessageType::GetSettingsResponse] frames.
///
/// ## Encoding:
/// ```text
/// {"type":17,"data":{"SSID":"Keychain","password":"hunter22"}}
/// ```
#[derive(Clone, PartialEq, Debug, Default, Serialize, Deserialize)]
pub struct Settings {
    /// Access point SSID
    #[serde(rename = "SSID", alias = "ssid")]
    pub ssid: String,

    /// Access point password
    pub password: String,
}
