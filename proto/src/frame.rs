// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Framed [`Request`] and [`Response`] messages
//!
//! Each frame is a JSON object containing a `type` discriminant and an
//! optional `data` payload. Frames are decoded into tagged unions so
//! payload shapes are validated once, at the channel boundary.

use alloc::vec::Vec;

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;

use crate::{
    account::{GenerateAccountReq, GetAccountRejected, GetAccountReq, GetAccountResp, SelectAccountReq},
    artifact::ArtifactStart,
    error::{ErrorResp, ProtoError},
    sender::SenderResp,
    settings::Settings,
    signature::{ApprovalDecision, SignatureReq, SignatureResp},
    MessageType, MAX_FRAME_LEN,
};

/// Incoming frame, payload decoding is deferred until the type is known
#[derive(Deserialize)]
struct RawFrame {
    #[serde(rename = "type")]
    kind: i64,
    #[serde(default)]
    data: Value,
}

/// Outgoing frame
#[derive(Serialize)]
struct Frame<'a, T: Serialize> {
    #[serde(rename = "type")]
    kind: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<&'a T>,
}

/// Requests sent to the device
#[derive(Clone, PartialEq, Debug)]
pub enum Request {
    SignatureRequest(SignatureReq),
    SignatureApprovalDecision(ApprovalDecision),
    GetAccount(GetAccountReq),
    GenerateAccount(GenerateAccountReq),
    GetArtifact,
    GetSender,
    SelectAccount(SelectAccountReq),
    GetSettings,
    WriteSettings(Settings),
}

/// Responses sent by the device
#[derive(Clone, PartialEq, Debug)]
pub enum Response {
    Signature(SignatureResp),
    SignatureRejected,
    Account(GetAccountResp),
    AccountRejected(GetAccountRejected),
    ArtifactStart(ArtifactStart),
    Sender(SenderResp),
    Error(ErrorResp),
    Ok,
    Settings(Settings),
}

/// Decode a raw frame, returning the message type and payload
fn decode_raw(buff: &[u8]) -> Result<(MessageType, Value), ProtoError> {
    let raw: RawFrame = serde_json::from_slice(buff).map_err(|_| ProtoError::InvalidEncoding)?;

    let kind = u8::try_from(raw.kind)
        .ok()
        .and_then(|k| MessageType::try_from(k).ok())
        .ok_or(ProtoError::UnknownType(raw.kind))?;

    Ok((kind, raw.data))
}

/// Decode a typed payload
fn payload<T: DeserializeOwned>(kind: MessageType, data: Value) -> Result<T, ProtoError> {
    serde_json::from_value(data).map_err(|_| ProtoError::InvalidPayload(kind))
}

/// Encode a frame with an optional payload, checking the encoded length
fn encode_frame<T: Serialize>(kind: MessageType, data: Option<&T>) -> Result<Vec<u8>, ProtoError> {
    let f = Frame {
        kind: kind as u8,
        data,
    };

    let v = serde_json::to_vec(&f).map_err(|_| ProtoError::EncodingFailed)?;

    if v.len() > MAX_FRAME_LEN {
        return Err(ProtoError::FrameOverflow);
    }

    Ok(v)
}

impl Request {
    /// Fetch the [`MessageType`] for a request
    pub fn kind(&self) -> MessageType {
        match self {
            Request::SignatureRequest(_) => MessageType::SignatureRequest,
            Request::SignatureApprovalDecision(_) => MessageType::SignatureApprovalDecision,
            Request::GetAccount(_) => MessageType::GetAccountRequest,
            Request::GenerateAccount(_) => MessageType::GenerateAccount,
            Request::GetArtifact => MessageType::GetArtifactRequest,
            Request::GetSender => MessageType::GetSenderRequest,
            Request::SelectAccount(_) => MessageType::SelectAccount,
            Request::GetSettings => MessageType::GetSettingsRequest,
            Request::WriteSettings(_) => MessageType::WriteSettings,
        }
    }

    /// Decode a request from a single frame (without the newline delimiter)
    pub fn decode(buff: &[u8]) -> Result<Self, ProtoError> {
        let (kind, data) = decode_raw(buff)?;

        let r = match kind {
            MessageType::SignatureRequest => Request::SignatureRequest(payload(kind, data)?),
            MessageType::SignatureApprovalDecision => {
                Request::SignatureApprovalDecision(payload(kind, data)?)
            }
            MessageType::GetAccountRequest => Request::GetAccount(payload(kind, data)?),
            MessageType::GenerateAccount => Request::GenerateAccount(payload(kind, data)?),
            MessageType::GetArtifactRequest => Request::GetArtifact,
            MessageType::GetSenderRequest => Request::GetSender,
            MessageType::SelectAccount => Request::SelectAccount(payload(kind, data)?),
            MessageType::GetSettingsRequest => Request::GetSettings,
            MessageType::WriteSettings => Request::WriteSettings(payload(kind, data)?),
            _ => return Err(ProtoError::UnexpectedType(kind)),
        };

        Ok(r)
    }

    /// Encode a request to a single frame (without the newline delimiter)
    pub fn encode(&self) -> Result<Vec<u8>, ProtoError> {
        let kind = self.kind();

        match self {
            Request::SignatureRequest(r) => encode_frame(kind, Some(r)),
            Request::SignatureApprovalDecision(r) => encode_frame(kind, Some(r)),
            Request::GetAccount(r) => encode_frame(kind, Some(r)),
            Request::GenerateAccount(r) => encode_frame(kind, Some(r)),
            Request::SelectAccount(r) => encode_frame(kind, Some(r)),
            Request::WriteSettings(r) => encode_frame(kind, Some(r)),
            Request::GetArtifact | Request::GetSender | Request::GetSettings => {
                encode_frame::<()>(kind, None)
            }
        }
    }
}

impl Response {
    /// Fetch the [`MessageType`] for a response
    pub fn kind(&self) -> MessageType {
        match self {
            Response::Signature(_) => MessageType::Signature,
            Response::SignatureRejected => MessageType::SignatureRejected,
            Response::Account(_) => MessageType::GetAccountResponse,
            Response::AccountRejected(_) => MessageType::GetAccountRejected,
            Response::ArtifactStart(_) => MessageType::GetArtifactResponseStart,
            Response::Sender(_) => MessageType::GetSenderResponse,
            Response::Error(_) => MessageType::Error,
            Response::Ok => MessageType::Ok,
            Response::Settings(_) => MessageType::GetSettingsResponse,
        }
    }

    /// Decode a response from a single frame (without the newline delimiter)
    pub fn decode(buff: &[u8]) -> Result<Self, ProtoError> {
        let (kind, data) = decode_raw(buff)?;

        let r = match kind {
            MessageType::Signature => Response::Signature(payload(kind, data)?),
            MessageType::SignatureRejected => Response::SignatureRejected,
            MessageType::GetAccountResponse => Response::Account(payload(kind, data)?),
            MessageType::GetAccountRejected => Response::AccountRejected(payload(kind, data)?),
            MessageType::GetArtifactResponseStart => Response::ArtifactStart(payload(kind, data)?),
            MessageType::GetSenderResponse => Response::Sender(payload(kind, data)?),
            MessageType::Error => Response::Error(payload(kind, data)?),
            MessageType::Ok => Response::Ok,
            MessageType::GetSettingsResponse => Response::Settings(payload(kind, data)?),
            _ => return Err(ProtoError::UnexpectedType(kind)),
        };

        Ok(r)
    }

    /// Encode a response to a single frame (without the newline delimiter)
    pub fn encode(&self) -> Result<Vec<u8>, ProtoError> {
        let kind = self.kind();

        match self {
            Response::Signature(r) => encode_frame(kind, Some(r)),
            Response::Account(r) => encode_frame(kind, Some(r)),
            Response::AccountRejected(r) => encode_frame(kind, Some(r)),
            Response::ArtifactStart(r) => encode_frame(kind, Some(r)),
            Response::Sender(r) => encode_frame(kind, Some(r)),
            Response::Error(r) => encode_frame(kind, Some(r)),
            Response::Settings(r) => encode_frame(kind, Some(r)),
            Response::SignatureRejected | Response::Ok => encode_frame::<()>(kind, None),
        }
    }
}
