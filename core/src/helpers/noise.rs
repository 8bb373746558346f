// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Entropy conditioning for raw platform noise sources

use rand_core::{impls, CryptoRng, Error, RngCore};
use sha2::{Digest, Sha256};
use zeroize::Zeroize;

/// Number of raw noise bytes consumed per output block
const NOISE_BLOCK: usize = 64;

/// [`NoiseSource`] trait provides raw (unconditioned) platform entropy,
/// such as sampled ADC jitter
pub trait NoiseSource {
    /// Fill `buff` with raw noise
    fn fill_noise(&mut self, buff: &mut [u8]);
}

impl<T: NoiseSource> NoiseSource for &mut T {
    fn fill_noise(&mut self, buff: &mut [u8]) {
        T::fill_noise(self, buff)
    }
}

/// [`Conditioned`] whitens a [`NoiseSource`] through SHA-256, producing
/// one 32 byte output block per [`NOISE_BLOCK`] bytes of raw noise.
///
/// Output quality is bounded by the entropy of the underlying source.
pub struct Conditioned<N: NoiseSource> {
    noise: N,
    counter: u64,
}

impl<N: NoiseSource> Conditioned<N> {
    /// Create a new conditioned RNG over the provided noise source
    pub fn new(noise: N) -> Self {
        Self { noise, counter: 0 }
    }

    fn block(&mut self) -> [u8; 32] {
        let mut raw = [0u8; NOISE_BLOCK];
        self.noise.fill_noise(&mut raw);

        let h = Sha256::new()
            .chain_update(self.counter.to_le_bytes())
            .chain_update(raw)
            .finalize();

        raw.zeroize();
        self.counter = self.counter.wrapping_add(1);

        let mut out = [0u8; 32];
        out.copy_from_slice(&h);
        out
    }
}

impl<N: NoiseSource> RngCore for Conditioned<N> {
    fn next_u32(&mut self) -> u32 {
        impls::next_u32_via_fill(self)
    }

    fn next_u64(&mut self) -> u64 {
        impls::next_u64_via_fill(self)
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        for chunk in dest.chunks_mut(32) {
            let mut b = self.block();
            chunk.copy_from_slice(&b[..chunk.len()]);
            b.zeroize();
        }
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}

impl<N: NoiseSource> CryptoRng for Conditioned<N> {}
