// Copyright (c) 2022-2023 The MobileCoin Foundation

use keychain_proto::{prelude::*, MSK_LEN, SALT_LEN};

use super::Error;
use crate::{
    helpers::Sender,
    keystore::AccountIndex,
    settings::DeviceSettings,
    signer::{PublicKey, Signature},
};

/// [`Engine`][super::Engine] outputs (in response to events), typically encoded to [`Response`] frames
#[derive(Clone, PartialEq, Debug)]
pub enum Output {
    /// No response is sent
    None,

    /// Approved signature
    Signature {
        signature: Signature,
        /// Set when the signature verified against the account public key
        verified: bool,
    },

    /// Signature rejected by the user
    SignatureRejected,

    /// Account material
    Account {
        index: AccountIndex,
        pk: PublicKey,
        msk: [u8; MSK_LEN],
        salt: [u8; SALT_LEN],
    },

    /// Account not initialised
    AccountRejected { index: AccountIndex },

    /// Artifact header, to be followed by `size` raw artifact bytes
    ArtifactStart { size: usize },

    /// Selected sender
    Sender { sender: Sender },

    /// Device settings
    Settings(DeviceSettings),

    /// Generic acknowledgement
    Ok,
}

impl Output {
    /// Build the [`Response`] frame for this output, `None` if no response is sent
    pub fn response(&self) -> Result<Option<Response>, Error> {
        let r = match self {
            Output::None => return Ok(None),
            Output::Signature { signature, .. } => Response::Signature(SignatureResp {
                signature: *signature,
            }),
            Output::SignatureRejected => Response::SignatureRejected,
            Output::Account {
                index,
                pk,
                msk,
                salt,
            } => Response::Account(GetAccountResp {
                index: i32::from(*index),
                pk: *pk,
                msk: *msk,
                salt: *salt,
            }),
            Output::AccountRejected { index } => Response::AccountRejected(GetAccountRejected {
                index: i32::from(*index),
            }),
            Output::ArtifactStart { size } => Response::ArtifactStart(ArtifactStart {
                size: u32::try_from(*size).map_err(|_| Error::EncodingFailed)?,
            }),
            Output::Sender { sender } => Response::Sender(SenderResp {
                sender: sender.as_str().into(),
            }),
            Output::Settings(s) => Response::Settings(Settings {
                ssid: s.ssid().into(),
                password: s.password().into(),
            }),
            Output::Ok => Response::Ok,
        };

        Ok(Some(r))
    }
}

/// Build an error [`Response`] frame
pub fn error_response(e: Error) -> Response {
    Response::Error(ErrorResp::new(e.code(), e.reason()))
}
