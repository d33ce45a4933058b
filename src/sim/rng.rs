//! Deterministic random stream
//!
//! Every roll in a match comes from one `Lcg`, advanced once per draw. The
//! order of calls into the stream is part of the determinism contract, so
//! nothing in the simulation may draw speculatively or reseed mid-match.

use rand::RngCore;
use serde::{Deserialize, Serialize};

/// Source of uniform rolls in `[0, 1)` consumed by the combat engine
pub trait CombatRng {
    fn next_f64(&mut self) -> f64;
}

/// Linear congruential generator with 32-bit state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lcg {
    state: u32,
}

impl Lcg {
    const MULTIPLIER: u32 = 1_664_525;
    const INCREMENT: u32 = 1_013_904_223;
    const MODULUS: f64 = 4_294_967_296.0;

    /// Seed a fresh stream (match start only)
    pub fn new(seed: u32) -> Self {
        Self { state: seed }
    }

    /// Current internal state
    pub fn state(&self) -> u32 {
        self.state
    }

    #[inline]
    fn step(&mut self) -> u32 {
        self.state = self
            .state
            .wrapping_mul(Self::MULTIPLIER)
            .wrapping_add(Self::INCREMENT);
        self.state
    }
}

impl CombatRng for Lcg {
    #[inline]
    fn next_f64(&mut self) -> f64 {
        self.step() as f64 / Self::MODULUS
    }
}

/// Lets satellite code use `rand::Rng` helpers on the same stream.
/// Each `next_u32` is exactly one LCG step.
impl RngCore for Lcg {
    fn next_u32(&mut self) -> u32 {
        self.step()
    }

    fn next_u64(&mut self) -> u64 {
        let hi = self.step() as u64;
        let lo = self.step() as u64;
        (hi << 32) | lo
    }

    fn fill_bytes(&mut self, dst: &mut [u8]) {
        for chunk in dst.chunks_mut(4) {
            let bytes = self.step().to_le_bytes();
            chunk.copy_from_slice(&bytes[..chunk.len()]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lcg_first_draws() {
        let mut rng = Lcg::new(0);
        // 0 * a + c
        assert_eq!(rng.next_f64(), 1_013_904_223.0 / 4_294_967_296.0);
        let expected = 1_013_904_223u32
            .wrapping_mul(1_664_525)
            .wrapping_add(1_013_904_223);
        rng.next_f64();
        assert_eq!(rng.state(), expected);
    }

    #[test]
    fn test_lcg_range() {
        let mut rng = Lcg::new(12345);
        for _ in 0..10_000 {
            let v = rng.next_f64();
            assert!((0.0..1.0).contains(&v));
        }
    }

    #[test]
    fn test_same_seed_same_stream() {
        let mut a = Lcg::new(42);
        let mut b = Lcg::new(42);
        for _ in 0..100 {
            assert_eq!(a.next_f64().to_bits(), b.next_f64().to_bits());
        }
    }

    #[test]
    fn test_rng_core_shares_stream() {
        let mut a = Lcg::new(7);
        let mut b = Lcg::new(7);
        let raw = a.next_u32();
        assert_eq!(raw as f64 / 4_294_967_296.0, b.next_f64());
        assert_eq!(a, b);
    }
}
