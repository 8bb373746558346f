// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Software secp256r1 (NIST P-256) [`Curve`] implementation

use p256::ecdsa::{
    signature::hazmat::{PrehashSigner, PrehashVerifier},
    Signature as EcdsaSignature, SigningKey, VerifyingKey,
};
use rand_core::CryptoRngCore;

use keychain_proto::{PK_LEN, SIG_LEN, SK_LEN};

use crate::signer::{Curve, KeyPair, Message, PublicKey, SecretKey, Signature};

/// SEC1 tag for uncompressed points
const SEC1_UNCOMPRESSED: u8 = 0x04;

/// secp256r1 [`Curve`] using the RustCrypto `p256` crate.
///
/// Messages are used directly as the ECDSA prehash, truncated to the
/// leftmost 256 bits, and nonces are derived deterministically (RFC6979)
/// so signature safety does not depend on RNG quality.
pub struct P256Curve<R: CryptoRngCore> {
    rng: R,
}

impl<R: CryptoRngCore> P256Curve<R> {
    /// Create a new [`P256Curve`] using the provided RNG for key generation
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

fn public_key(signing_key: &SigningKey) -> PublicKey {
    let p = VerifyingKey::from(signing_key).to_encoded_point(false);

    let mut pk = [0u8; PK_LEN];
    pk.copy_from_slice(&p.as_bytes()[1..]);
    pk
}

impl<R: CryptoRngCore> Curve for P256Curve<R> {
    fn generate_key_pair(&mut self) -> KeyPair {
        let signing_key = SigningKey::random(&mut self.rng);

        let mut key_pair = KeyPair::default();
        key_pair.sk.copy_from_slice(&signing_key.to_bytes()[..SK_LEN]);
        key_pair.pk = public_key(&signing_key);

        key_pair
    }

    fn sign(&mut self, sk: &SecretKey, msg: &Message) -> Signature {
        let mut signature = [0u8; SIG_LEN];

        let signing_key = match SigningKey::from_slice(sk) {
            Ok(k) => k,
            Err(_e) => {
                #[cfg(feature = "log")]
                log::error!("invalid secret key");

                return signature;
            }
        };

        match PrehashSigner::<EcdsaSignature>::sign_prehash(&signing_key, msg) {
            Ok(s) => signature.copy_from_slice(&s.to_bytes()),
            Err(_e) => {
                #[cfg(feature = "log")]
                log::error!("signing failed");
            }
        }

        signature
    }

    fn verify(&self, pk: &PublicKey, msg: &Message, sig: &Signature) -> bool {
        let mut sec1 = [0u8; PK_LEN + 1];
        sec1[0] = SEC1_UNCOMPRESSED;
        sec1[1..].copy_from_slice(pk);

        let verifying_key = match VerifyingKey::from_sec1_bytes(&sec1) {
            Ok(k) => k,
            Err(_) => return false,
        };
        let signature = match EcdsaSignature::from_slice(sig) {
            Ok(s) => s,
            Err(_) => return false,
        };

        verifying_key.verify_prehash(msg, &signature).is_ok()
    }

    fn random_bytes(&mut self, buff: &mut [u8]) {
        self.rng.fill_bytes(buff);
    }
}

#[cfg(test)]
mod test {
    use rand::{rngs::StdRng, SeedableRng};

    use super::*;

    fn curve() -> P256Curve<StdRng> {
        P256Curve::new(StdRng::seed_from_u64(7))
    }

    #[test]
    fn sign_verify() {
        let mut c = curve();
        let kp = c.generate_key_pair();

        let msg = *b"amessagewith32charactersforsure1amessagewith32charactersforsure1";
        let sig = c.sign(&kp.sk, &msg);

        assert!(c.verify(&kp.pk, &msg, &sig));

        // Only the leftmost 32 bytes are signed
        let mut tail = msg;
        tail[63] ^= 0xff;
        assert!(c.verify(&kp.pk, &tail, &sig));

        let mut head = msg;
        head[0] ^= 0xff;
        assert!(!c.verify(&kp.pk, &head, &sig));
    }

    #[test]
    fn verify_rejects_invalid_inputs() {
        let mut c = curve();
        let kp = c.generate_key_pair();
        let msg = [0x42u8; 64];
        let sig = c.sign(&kp.sk, &msg);

        let mut bad_sig = sig;
        bad_sig[10] ^= 0x01;
        assert!(!c.verify(&kp.pk, &msg, &bad_sig));

        // Not a curve point
        assert!(!c.verify(&[0xff; PK_LEN], &msg, &sig));

        // Zero signature scalars
        assert!(!c.verify(&kp.pk, &msg, &[0u8; SIG_LEN]));
    }

    #[test]
    fn keys_are_distinct() {
        let mut c = curve();
        let a = c.generate_key_pair();
        let b = c.generate_key_pair();

        assert_ne!(a.sk, b.sk);
        assert_ne!(a.pk, b.pk);
    }
}
