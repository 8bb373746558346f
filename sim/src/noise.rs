// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Timing jitter [`NoiseSource`], standing in for sampled ADC noise

use std::{hint::black_box, time::Instant};

use keychain_core::helpers::NoiseSource;

/// Iterations of busy work per sample
const SPIN: u64 = 64;

/// [`JitterNoise`] samples execution time jitter of a short busy loop,
/// one bit per sample.
///
/// Output is raw and must be conditioned before use
/// (see [`Conditioned`][keychain_core::helpers::Conditioned]).
pub struct JitterNoise {
    origin: Instant,
    acc: u64,
}

impl JitterNoise {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            acc: 0,
        }
    }

    fn sample(&mut self) -> u8 {
        let t = Instant::now();

        for i in 0..SPIN {
            self.acc = black_box(
                self.acc
                    .wrapping_mul(6364136223846793005)
                    .wrapping_add(i),
            );
        }

        let dt = t.elapsed().subsec_nanos() ^ self.origin.elapsed().subsec_nanos();
        (dt ^ (dt >> 8)) as u8
    }
}

impl Default for JitterNoise {
    fn default() -> Self {
        Self::new()
    }
}

impl NoiseSource for JitterNoise {
    fn fill_noise(&mut self, buff: &mut [u8]) {
        for b in buff.iter_mut() {
            let mut v = 0u8;
            for _ in 0..8 {
                v = v.rotate_left(1) ^ self.sample();
            }
            *b = v;
        }
    }
}
