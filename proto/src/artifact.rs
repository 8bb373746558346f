// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Artifact transfer messages
//!
//! The artifact is a fixed binary blob stored alongside device firmware
//! (a compressed contract artifact on hardware). Following a
//! [`GetArtifactRequest`][crate::MessageType::GetArtifactRequest] the device
//! responds with an [`ArtifactStart`] frame, followed by exactly `size` raw
//! bytes and a trailing newline.

use serde::{Deserialize, Serialize};

/// Artifact transfer header
///
/// ## Encoding:
/// ```text
/// {"type":7,"data":{"size":4213}}
/// <4213 raw bytes>\n
/// ```
#[derive(Copy, Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct ArtifactStart {
    /// Length of the raw artifact following this frame
    pub size: u32,
}
