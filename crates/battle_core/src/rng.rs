//! Injectable randomness for attack rolls and AI tie-breaking.
//!
//! The battle never touches system randomness. Every roll goes through a
//! [`BattleRng`] handed to the battle at construction, so a seed (or a
//! scripted stub in tests) fully determines the outcome.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Source of randomness used by the battle.
pub trait BattleRng {
    /// Return a value in `0..upper`. Returns 0 when `upper` is 0.
    fn roll(&mut self, upper: u32) -> u32;

    /// Roll a percentage and report whether it falls under `chance`.
    ///
    /// A chance of 100 or more always succeeds without consuming a roll.
    fn chance(&mut self, chance: u8) -> bool {
        if chance >= 100 {
            return true;
        }
        self.roll(100) < u32::from(chance)
    }
}

/// Seeded ChaCha-based generator.
#[derive(Debug, Clone)]
pub struct SeededRng {
    seed: u64,
    inner: ChaCha8Rng,
}

impl SeededRng {
    /// Create a generator from a seed.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            inner: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Seed this generator was created with.
    #[must_use]
    pub const fn seed(&self) -> u64 {
        self.seed
    }
}

impl BattleRng for SeededRng {
    fn roll(&mut self, upper: u32) -> u32 {
        if upper == 0 {
            return 0;
        }
        self.inner.gen_range(0..upper)
    }
}

impl<R: BattleRng + ?Sized> BattleRng for Box<R> {
    fn roll(&mut self, upper: u32) -> u32 {
        (**self).roll(upper)
    }
}
