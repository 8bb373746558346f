// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Hardware keychain core
//!
//! This provides a hardware-independent [Engine][engine] for account management
//! and message signing, along with the [Device][device] context and
//! [Scheduler][scheduler] used to run the engine on a microcontroller (or the
//! host simulator).
//!
//! Interactions with the [Engine][engine] are performed via [Event][engine::Event]s
//! and [Output][engine::Output]s, see [keychain_proto] for message objects and
//! wire encodings.
//!
//! ## Operations
//!
//! ### Requesting account keys
//!
//! Account material can be requested via
//! [`GetAccountReq`][keychain_proto::account::GetAccountReq], returning a
//! [`GetAccountResp`][keychain_proto::account::GetAccountResp] containing the
//! public key, derived secret and salt for initialised accounts, or a
//! [`GetAccountRejected`][keychain_proto::account::GetAccountRejected] for
//! accounts that have never been generated.
//!
//! Accounts are (re)generated via
//! [`GenerateAccountReq`][keychain_proto::account::GenerateAccountReq].
//!
//! ### Signing a message
//!
//! 1. Issue [`SignatureReq`][keychain_proto::signature::SignatureReq] with the account
//!    index, the account public key, and the message. The device does not respond
//!    to accepted requests until a decision is made.
//! 2. The user approves or rejects the request via the provisioning interface,
//!    which forwards an [`ApprovalDecision`][keychain_proto::signature::ApprovalDecision].
//! 3. The device responds with a [`SignatureResp`][keychain_proto::signature::SignatureResp]
//!    or a [`SignatureRejected`][keychain_proto::MessageType::SignatureRejected] frame.
//!
//! ### Selecting an account
//!
//! 1. Issue [`GetAccountReq::select`][keychain_proto::account::GetAccountReq::select]
//!    to enter account selection mode.
//! 2. The user selects an account via the provisioning interface, which forwards a
//!    [`SelectAccountReq`][keychain_proto::account::SelectAccountReq].
//! 3. Issue a [`GetSenderRequest`][keychain_proto::MessageType::GetSenderRequest] to
//!    fetch the selected [`SenderResp`][keychain_proto::sender::SenderResp].
//!

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub use keychain_proto as proto;

pub mod device;
pub mod engine;
pub mod helpers;
pub mod keystore;
pub mod scheduler;
pub mod settings;
pub mod signer;
pub mod telemetry;

#[cfg(test)]
pub(crate) mod test {
    use alloc::vec::Vec;

    use keychain_proto::{PK_LEN, SIG_LEN, SK_LEN};

    use crate::{
        keystore::{Storage, ERASED, STORAGE_LEN},
        signer::{Curve, KeyPair, Message, PublicKey, SecretKey, Signature},
    };

    /// In-memory [`Storage`], erased on creation
    #[derive(Clone, PartialEq, Debug)]
    pub struct MemStorage {
        pub data: Vec<u8>,
        pub artifact: Vec<u8>,
        pub commits: usize,
    }

    impl Default for MemStorage {
        fn default() -> Self {
            Self {
                data: alloc::vec![ERASED; STORAGE_LEN],
                artifact: Vec::new(),
                commits: 0,
            }
        }
    }

    impl Storage for MemStorage {
        fn read_bytes(&self, offset: usize, buff: &mut [u8]) {
            buff.copy_from_slice(&self.data[offset..][..buff.len()]);
        }

        fn write_bytes(&mut self, offset: usize, data: &[u8]) {
            self.data[offset..][..data.len()].copy_from_slice(data);
        }

        fn commit(&mut self) {
            self.commits += 1;
        }

        fn artifact_len(&self) -> usize {
            self.artifact.len()
        }

        fn read_artifact(&self, offset: usize, buff: &mut [u8]) -> usize {
            let d = self.artifact.get(offset..).unwrap_or_default();
            let n = d.len().min(buff.len());
            buff[..n].copy_from_slice(&d[..n]);
            n
        }
    }

    /// Trivial reversible [`Curve`] for state machine tests
    #[derive(Default)]
    pub struct TestCurve {
        counter: u8,
        pub fail_verify: bool,
    }

    fn public_key(sk: &SecretKey) -> PublicKey {
        let mut pk = [0u8; PK_LEN];
        for (p, s) in pk.iter_mut().zip(sk.iter().cycle()) {
            *p = s ^ 0xa5;
        }
        pk
    }

    impl Curve for TestCurve {
        fn generate_key_pair(&mut self) -> KeyPair {
            self.counter = self.counter.wrapping_add(1).max(1);

            let sk = [self.counter; SK_LEN];
            KeyPair {
                sk,
                pk: public_key(&sk),
            }
        }

        fn sign(&mut self, sk: &SecretKey, msg: &Message) -> Signature {
            let mut sig = [0u8; SIG_LEN];
            for (i, s) in sig.iter_mut().enumerate() {
                *s = msg[i] ^ sk[i % SK_LEN];
            }
            sig
        }

        fn verify(&self, pk: &PublicKey, msg: &Message, sig: &Signature) -> bool {
            let mut sk = [0u8; SK_LEN];
            for (s, p) in sk.iter_mut().zip(pk.iter()) {
                *s = p ^ 0xa5;
            }

            !self.fail_verify && Self::default().sign(&sk, msg) == *sig
        }

        fn random_bytes(&mut self, buff: &mut [u8]) {
            for b in buff.iter_mut() {
                self.counter = self.counter.wrapping_add(1);
                *b = self.counter;
            }
        }
    }
}
