// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Account generation and message signing
//!
//! Curve operations are provided by a [`Curve`] implementation, allowing
//! platforms to substitute hardware accelerated primitives. A software
//! secp256r1 implementation is available via
//! [`P256Curve`][crate::helpers::P256Curve] with the `p256` feature.

use zeroize::Zeroize;

use keychain_proto::{MSG_LEN, MSK_LEN, PK_LEN, SALT_LEN, SIG_LEN, SK_LEN};

use crate::keystore::AccountRecord;

/// Raw secret key scalar
pub type SecretKey = [u8; SK_LEN];

/// Uncompressed public key (x || y)
pub type PublicKey = [u8; PK_LEN];

/// Message to be signed
pub type Message = [u8; MSG_LEN];

/// ECDSA signature (r || s)
pub type Signature = [u8; SIG_LEN];

/// Account key pair
#[derive(Clone, PartialEq)]
pub struct KeyPair {
    pub sk: SecretKey,
    pub pk: PublicKey,
}

impl Default for KeyPair {
    fn default() -> Self {
        Self {
            sk: [0u8; SK_LEN],
            pk: [0u8; PK_LEN],
        }
    }
}

impl core::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("KeyPair")
            .field("pk", &self.pk)
            .finish_non_exhaustive()
    }
}

impl Drop for KeyPair {
    fn drop(&mut self) {
        self.sk.zeroize();
    }
}

/// [`Curve`] trait provides elliptic curve primitives for [`Signer`] instances
pub trait Curve {
    /// Generate a fresh key pair
    fn generate_key_pair(&mut self) -> KeyPair;

    /// Sign a message with the provided secret key
    fn sign(&mut self, sk: &SecretKey, msg: &Message) -> Signature;

    /// Verify a signature over a message
    fn verify(&self, pk: &PublicKey, msg: &Message, sig: &Signature) -> bool;

    /// Fill `buff` with random bytes
    fn random_bytes(&mut self, buff: &mut [u8]);
}

impl<T: Curve> Curve for &mut T {
    fn generate_key_pair(&mut self) -> KeyPair {
        T::generate_key_pair(self)
    }

    fn sign(&mut self, sk: &SecretKey, msg: &Message) -> Signature {
        T::sign(self, sk, msg)
    }

    fn verify(&self, pk: &PublicKey, msg: &Message, sig: &Signature) -> bool {
        T::verify(self, pk, msg, sig)
    }

    fn random_bytes(&mut self, buff: &mut [u8]) {
        T::random_bytes(self, buff)
    }
}

/// Signing result
#[derive(Clone, PartialEq, Debug)]
pub struct Signed {
    pub signature: Signature,
    /// Set when the signature verified against the account public key
    pub verified: bool,
}

/// [`Signer`] generates accounts and signs messages using a [`Curve`]
pub struct Signer<C: Curve> {
    curve: C,
}

impl<C: Curve> Signer<C> {
    /// Create a new [`Signer`]
    pub fn new(curve: C) -> Self {
        Self { curve }
    }

    /// Generate a fresh account record (key pair, derived secret, and salt)
    pub fn generate(&mut self) -> AccountRecord {
        let key_pair = self.curve.generate_key_pair();

        let mut msk = [0u8; MSK_LEN];
        self.curve.random_bytes(&mut msk);

        let mut salt = [0u8; SALT_LEN];
        self.curve.random_bytes(&mut salt);

        AccountRecord {
            key_pair,
            msk,
            salt,
        }
    }

    /// Sign a message, verifying the result against the account public key
    pub fn sign(&mut self, key_pair: &KeyPair, msg: &Message) -> Signed {
        let signature = self.curve.sign(&key_pair.sk, msg);
        let verified = self.curve.verify(&key_pair.pk, msg, &signature);

        Signed {
            signature,
            verified,
        }
    }

    /// Access the underlying curve
    pub fn curve(&self) -> &C {
        &self.curve
    }

    /// Mutably access the underlying curve
    pub fn curve_mut(&mut self) -> &mut C {
        &mut self.curve
    }
}
