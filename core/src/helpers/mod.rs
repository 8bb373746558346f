// Copyright (c) 2022-2023 The MobileCoin Foundation

use heapless::String;

use keychain_proto::SENDER_LEN;

use crate::engine::Error;

mod noise;
pub use noise::{Conditioned, NoiseSource};

#[cfg(feature = "p256")]
mod curve;
#[cfg(feature = "p256")]
pub use curve::P256Curve;

/// Sender identifier, `0x` followed by 64 hex digits
pub type Sender = String<SENDER_LEN>;

const SENDER_PREFIX: &str = "0x";

/// Parse and validate a sender identifier
pub fn parse_sender(s: &str) -> Result<Sender, Error> {
    if s.len() != SENDER_LEN {
        return Err(Error::InvalidLength);
    }

    let digits = s.strip_prefix(SENDER_PREFIX).ok_or(Error::InvalidArgument)?;

    // Check digits decode, the identifier itself is forwarded as text
    let mut buff = [0u8; (SENDER_LEN - SENDER_PREFIX.len()) / 2];
    hex::decode_to_slice(digits, &mut buff).map_err(|_| Error::InvalidArgument)?;

    String::try_from(s).map_err(|_| Error::InvalidLength)
}
