//! Counter-based randomness and the continuous seed
//!
//! Every random draw is a pure function of `(seed, counter, stream)`: a
//! murmur3 hash over the little-endian 32-bit words of the three inputs. Draws
//! are therefore independent of thread scheduling, and the same function is
//! implemented in the GPU shader so both backends agree bit for bit.

// The murmur3 core below is derived from stusmall/murmur3 (murmur3_32.rs):
//
// Copyright (c) 2020 Stu Small
//
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or http://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. All files in the project carrying such notice may not be copied,
// modified, or distributed except according to those terms.
//
// Modified to hash little-endian 32-bit words and to expose the word mixer
// that the WGSL reservoir kernel reproduces.

use std::f64::consts::{FRAC_PI_2, PI, SQRT_2};

const C1: u32 = 0x85eb_ca6b;
const C2: u32 = 0xc2b2_ae35;
const R1: u32 = 16;
const R2: u32 = 13;
const M: u32 = 5;
const N: u32 = 0xe654_6b64;

/// Murmur3 (x86, 32-bit, seed 0) over the little-endian bytes of three `u64`s
///
/// Equal to `murmurhash3_x86_32(&[s1, s2, s3].map(u64::to_le_bytes).concat(), 0)`.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn murmur3_32_3(s1: u64, s2: u64, s3: u64) -> u32 {
    let mut state = 0_u32;
    for word in [s1, s2, s3] {
        for k in [word as u32, (word >> 32) as u32] {
            state ^= calc_k(k);
            state = state.rotate_left(R2);
            state = state.wrapping_mul(M).wrapping_add(N);
        }
    }
    finish(state, 24)
}

fn finish(state: u32, processed: u32) -> u32 {
    let mut hash = state ^ processed;
    hash ^= hash >> R1;
    hash = hash.wrapping_mul(C1);
    hash ^= hash >> R2;
    hash = hash.wrapping_mul(C2);
    hash ^= hash >> R1;
    hash
}

fn calc_k(k: u32) -> u32 {
    const KC1: u32 = 0xcc9e_2d51;
    const KC2: u32 = 0x1b87_3593;
    const KR1: u32 = 15;
    k.wrapping_mul(KC1).rotate_left(KR1).wrapping_mul(KC2)
}

/// Uniform integer in `[0, bound)`; `bound` must be non-zero
///
/// Bounds that fit in 32 bits use a single hash (this is the form the GPU
/// kernel implements); larger bounds combine two hashes.
#[must_use]
pub fn random_below(seed: u64, counter: u64, bound: u64) -> u64 {
    debug_assert!(bound > 0);
    if bound <= 1 << 32 {
        u64::from(murmur3_32_3(seed, counter, 0)) % bound
    } else {
        let hi = u64::from(murmur3_32_3(seed, counter, 0));
        let lo = u64::from(murmur3_32_3(seed, counter, 1));
        ((hi << 32) | lo) % bound
    }
}

/// Uniform value in `(0, 1]`
#[must_use]
pub fn uniform_open(seed: u64, counter: u64, stream: u64) -> f64 {
    (f64::from(murmur3_32_3(seed, counter, stream)) + 1.0) / 4_294_967_296.0
}

/// Standard normal draw (Box-Muller)
#[must_use]
pub fn standard_normal(seed: u64, counter: u64) -> f64 {
    let u1 = uniform_open(seed, counter, 1);
    let u2 = uniform_open(seed, counter, 2);
    (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
}

/// Complementary error function, fractional error below 1.2e-7
fn erfc(x: f64) -> f64 {
    let z = x.abs();
    let t = 1.0 / (1.0 + 0.5 * z);
    let poly = -z * z - 1.265_512_23
        + t * (1.000_023_68
            + t * (0.374_091_96
                + t * (0.096_784_18
                    + t * (-0.186_288_06
                        + t * (0.278_868_07
                            + t * (-1.135_203_98
                                + t * (1.488_515_87
                                    + t * (-0.822_152_23 + t * 0.170_872_77))))))));
    let r = t * poly.exp();
    if x >= 0.0 {
        r
    } else {
        2.0 - r
    }
}

/// Standard normal CDF
#[must_use]
pub fn normal_cdf(z: f64) -> f64 {
    0.5 * erfc(-z / SQRT_2)
}

/// Seed supplied by the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RandomSeed {
    /// Independent sampling
    Single(u64),
    /// Two components blended by `seed2_contribution` (LABOR across layers)
    Pair(u64, u64),
}

/// Seed able to blend two independent streams
///
/// With distinct components the uniform draw for counter `t` is
/// `Φ(c0·N(s0, t) + c1·N(s1, t))` with `c0 = cos(r·π/2)`, `c1 = sin(r·π/2)`.
/// Since `c0² + c1² = 1` the blend is again standard normal, so the result
/// stays uniform while its correlation with the `s0` stream falls as `r`
/// grows.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContinuousSeed {
    s: [u64; 2],
    c: [f64; 2],
}

impl ContinuousSeed {
    /// Single-component seed
    #[must_use]
    pub const fn new(seed: u64) -> Self {
        Self {
            s: [seed, seed],
            c: [1.0, 0.0],
        }
    }

    /// Two-component seed with contribution `r` of the second component
    ///
    /// Distinct components always draw through the normal blend, so
    /// `r <= 0` gives `Φ(N(s0, t))`: the limit of the blend as `r → 0`,
    /// independent of `s1`.
    #[must_use]
    pub fn blended(s0: u64, s1: u64, r: f32) -> Self {
        let angle = f64::from(r.max(0.0)) * FRAC_PI_2;
        Self {
            s: [s0, s1],
            c: [angle.cos(), angle.sin()],
        }
    }

    /// Resolve a caller seed; `None` draws a fresh one
    #[must_use]
    pub fn resolve(seed: Option<RandomSeed>, seed2_contribution: f32) -> Self {
        match seed {
            Some(RandomSeed::Single(s)) => Self::new(s),
            Some(RandomSeed::Pair(s0, s1)) => Self::blended(s0, s1, seed2_contribution),
            None => Self::new(rand::random()),
        }
    }

    /// Seed component `i` (0 or 1)
    #[must_use]
    pub const fn seed(&self, i: usize) -> u64 {
        self.s[if i == 0 { 0 } else { 1 }]
    }

    /// True when both components coincide (plain independent stream)
    #[must_use]
    pub const fn is_single(&self) -> bool {
        self.s[0] == self.s[1]
    }

    /// Uniform draw in `(0, 1]` for counter `t`
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn uniform(&self, t: u64) -> f32 {
        let u = if self.is_single() {
            uniform_open(self.s[0], t, 0)
        } else {
            let z = self.c[0] * standard_normal(self.s[0], t)
                + self.c[1] * standard_normal(self.s[1], t);
            normal_cdf(z)
        };
        (u as f32).clamp(f32::MIN_POSITIVE, 1.0)
    }
}
