// Copyright (c) 2022-2023 The MobileCoin Foundation

use keychain_proto::prelude::*;

use super::Error;
use crate::{
    helpers::{parse_sender, Sender},
    keystore::AccountIndex,
    settings::DeviceSettings,
    signer::{Message, PublicKey},
};

/// [`Engine`][super::Engine] input events, typically decoded from [`Request`] frames
#[derive(Clone, PartialEq, Debug)]
pub enum Event {
    /// Request a signature, pending user approval
    SignatureRequest {
        index: AccountIndex,
        pk: PublicKey,
        msg: Message,
    },

    /// User decision for the pending signature request
    ApprovalDecision { approve: bool },

    /// Fetch account material
    GetAccount { index: AccountIndex },

    /// Enter account selection mode
    StartSelection,

    /// Generate (or regenerate) an account
    GenerateAccount { index: AccountIndex },

    /// Fetch the stored proving artifact
    GetArtifact,

    /// Fetch the selected sender
    GetSender,

    /// Confirm account selection
    SelectAccount { index: AccountIndex, sender: Sender },

    /// Abandon account selection
    CancelSelection,

    /// Fetch device settings
    GetSettings,

    /// Write device settings
    WriteSettings(DeviceSettings),
}

impl Event {
    /// Parse an [`Event`] from a decoded [`Request`], validating arguments
    pub fn parse(req: &Request) -> Result<Self, Error> {
        let evt = match req {
            Request::SignatureRequest(r) => Event::SignatureRequest {
                index: AccountIndex::try_from(r.index)?,
                pk: r.pk,
                msg: r.msg,
            },
            Request::SignatureApprovalDecision(d) => Event::ApprovalDecision { approve: d.approve },
            Request::GetAccount(r) if r.index == SELECT_INDEX => Event::StartSelection,
            Request::GetAccount(r) => Event::GetAccount {
                index: AccountIndex::try_from(r.index)?,
            },
            Request::GenerateAccount(r) => Event::GenerateAccount {
                index: AccountIndex::try_from(r.index)?,
            },
            Request::GetArtifact => Event::GetArtifact,
            Request::GetSender => Event::GetSender,
            Request::SelectAccount(r) if r.index == SELECT_INDEX => Event::CancelSelection,
            Request::SelectAccount(r) => Event::SelectAccount {
                index: AccountIndex::try_from(r.index)?,
                sender: parse_sender(&r.sender)?,
            },
            Request::GetSettings => Event::GetSettings,
            Request::WriteSettings(s) => {
                Event::WriteSettings(DeviceSettings::new(&s.ssid, &s.password)?)
            }
        };

        Ok(evt)
    }
}

impl TryFrom<&Request> for Event {
    type Error = Error;

    fn try_from(req: &Request) -> Result<Self, Self::Error> {
        Event::parse(req)
    }
}
