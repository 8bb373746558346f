//! Prelude to simplify downstream use of protocol objects
//!

pub use crate::{
    account::{
        GenerateAccountReq, GetAccountRejected, GetAccountReq, GetAccountResp, SelectAccountReq,
        SELECT_INDEX,
    },
    artifact::ArtifactStart,
    error::{ErrorResp, ProtoError},
    frame::{Request, Response},
    sender::SenderResp,
    settings::Settings,
    signature::{ApprovalDecision, SignatureReq, SignatureResp},
    MessageType,
};
