//! Seeded random streams for the synthetic data generator.
//!
//! RULE: generated data never touches a platform RNG.
//! One master seed fans out into independent streams, one per `Stream`.
//! A stream's seed is master XOR (index * golden ratio), so adding a stream
//! leaves the others untouched.

use rand::{RngCore, SeedableRng};
use rand_pcg::Pcg64Mcg;

/// Stable stream slots. Never renumber; append new ones at the end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stream {
    Chains,
    Disputes,
    Ids,
}

impl Stream {
    fn index(self) -> u64 {
        match self {
            Stream::Chains   => 0,
            Stream::Disputes => 1,
            Stream::Ids      => 2,
        }
    }
}

pub struct SeededRng {
    inner: Pcg64Mcg,
}

impl SeededRng {
    pub fn for_stream(master_seed: u64, stream: Stream) -> Self {
        let derived = master_seed ^ stream.index().wrapping_mul(0x9e37_79b9_7f4a_7c15);
        Self {
            inner: Pcg64Mcg::seed_from_u64(derived),
        }
    }

    /// Uniform float in [0.0, 1.0) from the top 53 bits.
    pub fn unit(&mut self) -> f64 {
        (self.inner.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Uniform integer in [lo, hi]. Returns `lo` for an empty range.
    pub fn between(&mut self, lo: u64, hi: u64) -> u64 {
        if hi <= lo {
            return lo;
        }
        lo + self.inner.next_u64() % (hi - lo + 1)
    }

    pub fn chance(&mut self, p: f64) -> bool {
        self.unit() < p
    }

    /// Pick an item with probability proportional to its weight.
    /// Panics if `items` is empty.
    pub fn weighted<'a, T>(&mut self, items: &'a [(T, f64)]) -> &'a T {
        let total: f64 = items.iter().map(|(_, w)| w).sum();
        let mut roll = self.unit() * total;
        for (item, weight) in items {
            if roll < *weight {
                return item;
            }
            roll -= weight;
        }
        &items[items.len() - 1].0
    }

    pub fn bytes16(&mut self) -> [u8; 16] {
        let mut out = [0u8; 16];
        self.inner.fill_bytes(&mut out);
        out
    }
}
