// Copyright (c) 2022-2023 The MobileCoin Foundation

//! The [Engine] implements the keychain protocol state machine.
//!
//! This handles [Event] inputs and returns [Output] responses to the caller,
//! see [keychain_proto] for message / encoding specifications.
//!
//! Signing requires an out-of-band user decision, so the engine moves to
//! [`DeviceStatus::Signing`] on a valid [`Event::SignatureRequest`] and only
//! returns a signature once an [`Event::ApprovalDecision`] is received.

use heapless::Deque;
use num_enum::TryFromPrimitive;
use strum::{Display, EnumIter, EnumString, EnumVariantNames};

use crate::{
    helpers::Sender,
    keystore::{AccountIndex, Keystore, Storage},
    settings::DeviceSettings,
    signer::{Curve, Message, PublicKey, Signer},
};

mod event;
pub use event::Event;

mod output;
pub use output::{error_response, Output};

mod error;
pub use error::Error;

/// Number of status transitions retained for the provisioning interface
pub const TRANSITION_LOG_LEN: usize = 8;

/// Device status, reported to the provisioning interface
#[derive(
    Copy,
    Clone,
    PartialEq,
    Eq,
    Debug,
    EnumString,
    Display,
    EnumVariantNames,
    EnumIter,
    TryFromPrimitive,
)]
#[repr(u8)]
pub enum DeviceStatus {
    /// Awaiting requests
    Idle = 0,
    /// Generating an account
    GeneratingAccount = 1,
    /// Awaiting account selection via the provisioning interface
    SelectingAccount = 2,
    /// Signature request pending user approval
    Signing = 3,
    /// Account selected, awaiting a sender request
    WaitingForSenderRequest = 4,
}

impl Default for DeviceStatus {
    fn default() -> Self {
        DeviceStatus::Idle
    }
}

/// Accepted signature request
#[derive(Clone, PartialEq, Debug)]
pub struct SignatureRequest {
    pub index: AccountIndex,
    pub msg: Message,
}

/// [Engine] provides hardware-independent keychain operations
pub struct Engine<S: Storage, C: Curve> {
    status: DeviceStatus,

    request: Option<SignatureRequest>,
    sender: Option<Sender>,

    transitions: Deque<DeviceStatus, TRANSITION_LOG_LEN>,

    keystore: Keystore<S>,
    signer: Signer<C>,
}

impl<S: Storage, C: Curve> Engine<S, C> {
    /// Create a new engine instance with the provided storage and curve
    pub fn new(storage: S, curve: C) -> Self {
        Self {
            status: DeviceStatus::Idle,
            request: None,
            sender: None,
            transitions: Deque::new(),
            keystore: Keystore::new(storage),
            signer: Signer::new(curve),
        }
    }

    /// Handle incoming events
    pub fn update(&mut self, evt: &Event) -> Result<Output, Error> {
        #[cfg(feature = "log")]
        log::debug!("event: {:02x?} (status: {})", evt, self.status);

        match (self.status, evt) {
            // Accept a signature request for later approval
            (DeviceStatus::Idle, Event::SignatureRequest { index, pk, msg }) => {
                self.signature_request(*index, pk, msg)
            }

            // Resolve the pending signature request
            (DeviceStatus::Signing, Event::ApprovalDecision { approve }) => {
                self.signature_decision(*approve)
            }

            // Account reads do not affect status
            (_, Event::GetAccount { index }) => Ok(self.get_account(*index)),

            (DeviceStatus::Idle | DeviceStatus::SelectingAccount, Event::StartSelection) => {
                self.set_status(DeviceStatus::SelectingAccount);
                Ok(Output::None)
            }

            (
                DeviceStatus::Idle | DeviceStatus::SelectingAccount,
                Event::GenerateAccount { index },
            ) => {
                self.set_status(DeviceStatus::GeneratingAccount);

                let record = self.signer.generate();
                self.keystore.write(*index, &record);

                #[cfg(feature = "log")]
                log::info!("generated account {}", index);

                self.set_status(DeviceStatus::Idle);
                Ok(Output::Ok)
            }

            (_, Event::GetArtifact) => Ok(Output::ArtifactStart {
                size: self.keystore.artifact_len(),
            }),

            (DeviceStatus::SelectingAccount, Event::SelectAccount { index, sender }) => {
                if !self.keystore.is_initialized(*index) {
                    return Err(Error::AccountNotInitialized);
                }

                self.sender = Some(sender.clone());
                self.set_status(DeviceStatus::WaitingForSenderRequest);

                Ok(Output::Ok)
            }

            (DeviceStatus::SelectingAccount, Event::CancelSelection) => {
                self.set_status(DeviceStatus::Idle);
                Ok(Output::Ok)
            }

            (DeviceStatus::WaitingForSenderRequest, Event::GetSender) => {
                let sender = self.sender.take();
                self.set_status(DeviceStatus::Idle);

                match sender {
                    Some(sender) => Ok(Output::Sender { sender }),
                    None => Err(Error::InvalidStateForRequest),
                }
            }

            (_, Event::GetSettings) => Ok(Output::Settings(
                self.keystore.settings().unwrap_or_default(),
            )),

            (_, Event::WriteSettings(s)) => {
                self.keystore.write_settings(s);
                Ok(Output::Ok)
            }

            // Reject unexpected events
            (_, _evt) => {
                #[cfg(feature = "log")]
                log::warn!("unexpected event in status {}", self.status);

                Err(Error::InvalidStateForRequest)
            }
        }
    }

    /// Validate and store a signature request, moving to [`DeviceStatus::Signing`]
    fn signature_request(
        &mut self,
        index: AccountIndex,
        pk: &PublicKey,
        msg: &Message,
    ) -> Result<Output, Error> {
        let stored = self.keystore.public_key(index);

        if !crate::keystore::is_initialized(&stored) {
            return Err(Error::AccountNotInitialized);
        }

        // Compare all bytes, no early exit on mismatch
        let diff = stored
            .iter()
            .zip(pk.iter())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b));
        if diff != 0 {
            return Err(Error::InvalidPublicKey);
        }

        self.request = Some(SignatureRequest { index, msg: *msg });
        self.set_status(DeviceStatus::Signing);

        Ok(Output::None)
    }

    /// Apply a user decision to the pending signature request
    fn signature_decision(&mut self, approve: bool) -> Result<Output, Error> {
        let r = match &self.request {
            Some(r) => r,
            None => {
                self.set_status(DeviceStatus::Idle);
                return Err(Error::InvalidStateForRequest);
            }
        };

        if !approve {
            #[cfg(feature = "log")]
            log::info!("signature request rejected");

            self.set_status(DeviceStatus::Idle);
            return Ok(Output::SignatureRejected);
        }

        let record = self.keystore.read(r.index);
        let signed = self.signer.sign(&record.key_pair, &r.msg);

        #[cfg(feature = "log")]
        if !signed.verified {
            log::error!("signature verification failed for account {}", r.index);
        }

        self.set_status(DeviceStatus::Idle);

        Ok(Output::Signature {
            signature: signed.signature,
            verified: signed.verified,
        })
    }

    fn get_account(&self, index: AccountIndex) -> Output {
        let record = self.keystore.read(index);

        if !record.is_initialized() {
            return Output::AccountRejected { index };
        }

        Output::Account {
            index,
            pk: record.key_pair.pk,
            msk: record.msk,
            salt: record.salt,
        }
    }

    fn set_status(&mut self, status: DeviceStatus) {
        if status == self.status {
            return;
        }

        #[cfg(feature = "log")]
        log::debug!("status: {} -> {}", self.status, status);

        if self.transitions.is_full() {
            let _ = self.transitions.pop_front();
        }
        let _ = self.transitions.push_back(status);

        self.status = status;
    }

    /// Fetch the current device status
    pub fn status(&self) -> DeviceStatus {
        self.status
    }

    /// Fetch the signature request awaiting approval, if any
    pub fn pending(&self) -> Option<&SignatureRequest> {
        match self.status {
            DeviceStatus::Signing => self.request.as_ref(),
            _ => None,
        }
    }

    /// Fetch the most recently accepted signature request
    ///
    /// This is retained after the request is resolved, use [`Engine::pending`]
    /// to fetch only requests awaiting approval.
    pub fn last_request(&self) -> Option<&SignatureRequest> {
        self.request.as_ref()
    }

    /// Fetch the selected sender, if awaiting a sender request
    pub fn sender(&self) -> Option<&str> {
        self.sender.as_deref()
    }

    /// Drain status transitions recorded since the last call
    pub fn drain_transitions(&mut self) -> impl Iterator<Item = DeviceStatus> + '_ {
        core::iter::from_fn(move || self.transitions.pop_front())
    }

    /// Stored device settings, defaults if never written
    pub fn settings(&self) -> DeviceSettings {
        self.keystore.settings().unwrap_or_default()
    }

    /// Access the account keystore
    pub fn keystore(&self) -> &Keystore<S> {
        &self.keystore
    }

    /// Mutably access the account keystore
    pub fn keystore_mut(&mut self) -> &mut Keystore<S> {
        &mut self.keystore
    }
}

#[cfg(test)]
mod test {
    use keychain_proto::{MSG_LEN, PK_LEN};
    use strum::IntoEnumIterator;

    use super::*;
    use crate::test::{MemStorage, TestCurve};

    const MSG: Message = [0x61; MSG_LEN];

    const SENDER: &str = "0x00112233445566778899aabbccddeeff00112233445566778899aabbccddeeff";

    fn setup() -> Engine<MemStorage, TestCurve> {
        let _ = simplelog::SimpleLogger::init(log::LevelFilter::Debug, Default::default());

        Engine::new(MemStorage::default(), TestCurve::default())
    }

    fn index(n: usize) -> AccountIndex {
        AccountIndex::new(n).unwrap()
    }

    fn generate(e: &mut Engine<MemStorage, TestCurve>, n: usize) -> PublicKey {
        assert_eq!(
            e.update(&Event::GenerateAccount { index: index(n) }),
            Ok(Output::Ok)
        );
        e.keystore().public_key(index(n))
    }

    /// Events and the statuses in which they are accepted
    fn status_gated_events() -> [(&'static [DeviceStatus], Event); 6] {
        use DeviceStatus::*;

        [
            (
                &[Idle],
                Event::SignatureRequest {
                    index: index(0),
                    pk: [0u8; PK_LEN],
                    msg: MSG,
                },
            ),
            (&[Signing], Event::ApprovalDecision { approve: false }),
            (&[Idle, SelectingAccount], Event::StartSelection),
            (
                &[Idle, SelectingAccount],
                Event::GenerateAccount { index: index(0) },
            ),
            (&[SelectingAccount], Event::CancelSelection),
            (&[WaitingForSenderRequest], Event::GetSender),
        ]
    }

    #[test]
    fn events_rejected_in_invalid_status() {
        for (valid, evt) in status_gated_events() {
            for s in DeviceStatus::iter().filter(|s| !valid.contains(s)) {
                let mut e = setup();
                e.status = s;

                assert_eq!(
                    e.update(&evt),
                    Err(Error::InvalidStateForRequest),
                    "event {evt:?} in status {s}"
                );
                assert_eq!(e.status(), s, "status changed on rejected event {evt:?}");
            }
        }
    }

    #[test]
    fn status_independent_events() {
        for s in DeviceStatus::iter() {
            let mut e = setup();
            e.status = s;

            assert_eq!(
                e.update(&Event::GetAccount { index: index(1) }),
                Ok(Output::AccountRejected { index: index(1) })
            );
            assert_eq!(
                e.update(&Event::GetArtifact),
                Ok(Output::ArtifactStart { size: 0 })
            );
            assert_eq!(
                e.update(&Event::GetSettings),
                Ok(Output::Settings(DeviceSettings::default()))
            );
            assert_eq!(e.status(), s);
        }
    }

    #[test]
    fn sign_approve() {
        let mut e = setup();
        let pk = generate(&mut e, 0);

        let r = e.update(&Event::SignatureRequest {
            index: index(0),
            pk,
            msg: MSG,
        });
        assert_eq!(r, Ok(Output::None));
        assert_eq!(e.status(), DeviceStatus::Signing);
        assert_eq!(e.pending().map(|r| r.msg), Some(MSG));

        let r = e.update(&Event::ApprovalDecision { approve: true });
        let expected = TestCurve::default().sign(&e.keystore().read(index(0)).key_pair.sk, &MSG);
        assert_eq!(
            r,
            Ok(Output::Signature {
                signature: expected,
                verified: true
            })
        );
        assert_eq!(e.status(), DeviceStatus::Idle);
        assert_eq!(e.pending(), None);
    }

    #[test]
    fn sign_reject() {
        let mut e = setup();
        let pk = generate(&mut e, 1);
        let before = e.keystore().storage().clone();

        e.update(&Event::SignatureRequest {
            index: index(1),
            pk,
            msg: MSG,
        })
        .unwrap();

        let r = e.update(&Event::ApprovalDecision { approve: false });
        assert_eq!(r, Ok(Output::SignatureRejected));
        assert_eq!(e.status(), DeviceStatus::Idle);

        assert_eq!(e.keystore().storage(), &before);
        assert_eq!(e.last_request().map(|r| r.msg), Some(MSG));
    }

    #[test]
    fn sign_unverified() {
        let mut e = setup();
        let pk = generate(&mut e, 0);
        e.signer.curve_mut().fail_verify = true;

        e.update(&Event::SignatureRequest {
            index: index(0),
            pk,
            msg: MSG,
        })
        .unwrap();

        let r = e.update(&Event::ApprovalDecision { approve: true });
        assert!(matches!(r, Ok(Output::Signature { verified: false, .. })));
        assert_eq!(e.status(), DeviceStatus::Idle);
    }

    #[test]
    fn sign_key_checks() {
        let mut e = setup();

        // Uninitialised accounts are rejected, even with a matching erased key
        for pk in [[0xffu8; PK_LEN], [0u8; PK_LEN]] {
            let r = e.update(&Event::SignatureRequest {
                index: index(2),
                pk,
                msg: MSG,
            });
            assert_eq!(r, Err(Error::AccountNotInitialized));
        }

        let pk = generate(&mut e, 2);

        // Any single byte mismatch is rejected
        for i in 0..PK_LEN {
            let mut bad = pk;
            bad[i] ^= 0x01;

            let r = e.update(&Event::SignatureRequest {
                index: index(2),
                pk: bad,
                msg: MSG,
            });
            assert_eq!(r, Err(Error::InvalidPublicKey), "byte {i}");
            assert_eq!(e.status(), DeviceStatus::Idle);
        }
    }

    #[test]
    fn second_request_keeps_pending() {
        let mut e = setup();
        let pk = generate(&mut e, 0);

        e.update(&Event::SignatureRequest {
            index: index(0),
            pk,
            msg: MSG,
        })
        .unwrap();

        let r = e.update(&Event::SignatureRequest {
            index: index(0),
            pk,
            msg: [0x62; MSG_LEN],
        });
        assert_eq!(r, Err(Error::InvalidStateForRequest));
        assert_eq!(e.pending().map(|r| r.msg), Some(MSG));
    }

    #[test]
    fn account_generation() {
        let mut e = setup();

        assert_eq!(
            e.update(&Event::GetAccount { index: index(2) }),
            Ok(Output::AccountRejected { index: index(2) })
        );

        let pk = generate(&mut e, 2);
        assert_eq!(e.status(), DeviceStatus::Idle);

        match e.update(&Event::GetAccount { index: index(2) }) {
            Ok(Output::Account { index: i, pk: p, .. }) => {
                assert_eq!(i, index(2));
                assert_eq!(p, pk);
            }
            r => panic!("unexpected output: {r:?}"),
        }

        // Regeneration replaces the key
        let pk2 = generate(&mut e, 2);
        assert_ne!(pk, pk2);
    }

    #[test]
    fn account_selection() {
        let mut e = setup();
        generate(&mut e, 1);

        assert_eq!(e.update(&Event::StartSelection), Ok(Output::None));
        assert_eq!(e.status(), DeviceStatus::SelectingAccount);

        // Uninitialised accounts can not be selected
        let sender = crate::helpers::parse_sender(SENDER).unwrap();
        assert_eq!(
            e.update(&Event::SelectAccount {
                index: index(0),
                sender: sender.clone()
            }),
            Err(Error::AccountNotInitialized)
        );
        assert_eq!(e.status(), DeviceStatus::SelectingAccount);

        assert_eq!(
            e.update(&Event::SelectAccount {
                index: index(1),
                sender
            }),
            Ok(Output::Ok)
        );
        assert_eq!(e.status(), DeviceStatus::WaitingForSenderRequest);
        assert_eq!(e.sender(), Some(SENDER));

        match e.update(&Event::GetSender) {
            Ok(Output::Sender { sender }) => assert_eq!(sender.as_str(), SENDER),
            r => panic!("unexpected output: {r:?}"),
        }
        assert_eq!(e.status(), DeviceStatus::Idle);
        assert_eq!(e.sender(), None);

        let transitions: heapless::Vec<_, 8> = e.drain_transitions().collect();
        assert_eq!(
            &transitions[..],
            &[
                DeviceStatus::GeneratingAccount,
                DeviceStatus::Idle,
                DeviceStatus::SelectingAccount,
                DeviceStatus::WaitingForSenderRequest,
                DeviceStatus::Idle,
            ]
        );
        assert_eq!(e.drain_transitions().count(), 0);
    }

    #[test]
    fn transition_log_bounded() {
        let mut e = setup();

        for _ in 0..TRANSITION_LOG_LEN {
            e.update(&Event::StartSelection).unwrap();
            e.update(&Event::CancelSelection).unwrap();
        }

        let transitions: heapless::Vec<_, TRANSITION_LOG_LEN> = e.drain_transitions().collect();
        assert_eq!(transitions.len(), TRANSITION_LOG_LEN);
        assert_eq!(transitions.last(), Some(&DeviceStatus::Idle));
    }

    #[test]
    fn settings() {
        let mut e = setup();
        let s = DeviceSettings::new("keychain", "hunter2222").unwrap();

        assert_eq!(e.update(&Event::WriteSettings(s.clone())), Ok(Output::Ok));
        assert_eq!(e.update(&Event::GetSettings), Ok(Output::Settings(s)));
        assert!(e.settings().is_provisioned());
    }

    #[test]
    fn status_codes() {
        for s in DeviceStatus::iter() {
            assert_eq!(DeviceStatus::try_from(s as u8), Ok(s));
        }
        assert_eq!(DeviceStatus::Signing as u8, 3);
    }
}
