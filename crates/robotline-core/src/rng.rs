//! Deterministic PRNG for simulation use (assembly success rolls).
//!
//! Uses the SplitMix64 algorithm: fast, 8 bytes of state, excellent
//! statistical properties, and trivially serializable for snapshots. The RNG
//! lives inside the [`World`](crate::world::World) and is part of the state
//! hash, so identical runs stay byte-identical even with chance rolls.

use crate::fixed::Fixed64;

/// SplitMix64 pseudo-random number generator.
///
/// Deterministic across platforms, which is required for reproducible
/// autonomous-agent evaluation.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SimRng {
    state: u64,
}

impl SimRng {
    /// Create a new RNG with the given seed.
    pub fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    /// Generate the next `u64` in the sequence.
    pub fn next_u64(&mut self) -> u64 {
        self.state = self.state.wrapping_add(0x9E37_79B9_7F4A_7C15);
        let mut z = self.state;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^ (z >> 31)
    }

    /// Returns `true` with the given probability (Fixed64 in [0, 1]).
    ///
    /// - probability <= 0 always returns false, without consuming a draw
    /// - probability >= 1 always returns true, without consuming a draw
    pub fn chance(&mut self, probability: Fixed64) -> bool {
        if probability <= Fixed64::ZERO {
            return false;
        }
        if probability >= Fixed64::from_num(1) {
            return true;
        }
        // Fixed64 is Q32.32. For p in (0,1) the raw bits hold the fractional
        // part scaled to [0, 2^32). Compare against a uniform u32 draw.
        let r = self.next_u64();
        let upper = (r >> 32) as u32;
        let raw = probability.to_bits() as u64;
        (upper as u64) < raw
    }

    /// Get the internal state (for hashing/serialization).
    pub fn state(&self) -> u64 {
        self.state
    }
}
