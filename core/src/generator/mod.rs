use serde::{Deserialize, Serialize};
use smallvec::{SmallVec, smallvec};

use crate::*;
pub use random::*;
pub use seeded::*;

mod random;
mod seeded;

/// Decides the contents of a cell the first time it is resolved.
pub trait CellGenerator {
    fn generate(&mut self, addr: CellAddress) -> CellOutcome;
}

/// Probability of a cell holding a token and how its tier is picked.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpawnPolicy {
    pub spawn_chance: f64,
    /// Cumulative thresholds, a tier sample below the `k`-th entry yields tier
    /// `k + 1`; samples past the last entry yield the tier after it.
    pub tier_thresholds: SmallVec<[f64; 4]>,
}

impl SpawnPolicy {
    /// Policy that always spawns a token of the given tier.
    pub fn always(tier: Tier) -> Self {
        let thresholds = (1..tier.get()).map(|_| 0.0).collect();
        Self {
            spawn_chance: 1.0,
            tier_thresholds: thresholds,
        }
    }

    pub fn never() -> Self {
        Self {
            spawn_chance: 0.0,
            ..Default::default()
        }
    }

    /// Maps two uniform samples in `[0, 1)` to an outcome.
    pub fn outcome(&self, spawn_sample: f64, tier_sample: f64) -> CellOutcome {
        if spawn_sample >= self.spawn_chance {
            return CellOutcome::Empty;
        }
        let index = self
            .tier_thresholds
            .iter()
            .position(|&threshold| tier_sample < threshold)
            .unwrap_or(self.tier_thresholds.len());
        let tier = u8::try_from(index + 1).unwrap_or(MAX_TIER);
        CellOutcome::Token(Tier::saturating(tier))
    }
}

impl Default for SpawnPolicy {
    fn default() -> Self {
        Self {
            spawn_chance: 0.25,
            tier_thresholds: smallvec![0.75, 0.95],
        }
    }
}

/// Which generation strategy a session uses.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize, Default)]
pub enum GeneratorConfig {
    /// One random stream per session, seeded by the host.
    #[default]
    Random,
    /// Every cell is a pure function of `(seed, i, j)`.
    Seeded { seed: u64 },
}

/// The configured generator.
#[derive(Clone, Debug)]
pub enum Generator {
    Random(RandomCellGenerator),
    Seeded(SeededCellGenerator),
}

impl Generator {
    pub fn new(config: GeneratorConfig, policy: SpawnPolicy, session_seed: u64) -> Self {
        match config {
            GeneratorConfig::Random => Self::Random(RandomCellGenerator::new(session_seed, policy)),
            GeneratorConfig::Seeded { seed } => Self::Seeded(SeededCellGenerator::new(seed, policy)),
        }
    }

    pub fn is_deterministic(&self) -> bool {
        matches!(self, Self::Seeded(_))
    }
}

impl CellGenerator for Generator {
    fn generate(&mut self, addr: CellAddress) -> CellOutcome {
        match self {
            Self::Random(generator) => generator.generate(addr),
            Self::Seeded(generator) => generator.generate(addr),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(tier: u8) -> CellOutcome {
        CellOutcome::Token(Tier::new(tier).unwrap())
    }

    #[test]
    fn default_policy_uses_cumulative_thresholds() {
        let policy = SpawnPolicy::default();

        assert_eq!(policy.outcome(0.30, 0.0), CellOutcome::Empty);
        assert_eq!(policy.outcome(0.10, 0.50), token(1));
        assert_eq!(policy.outcome(0.10, 0.80), token(2));
        assert_eq!(policy.outcome(0.10, 0.99), token(3));
    }

    #[test]
    fn always_policy_spawns_requested_tier() {
        for tier in 1..=MAX_TIER {
            let policy = SpawnPolicy::always(Tier::new(tier).unwrap());
            assert_eq!(policy.outcome(0.999, 0.999), token(tier));
            assert_eq!(policy.outcome(0.0, 0.0), token(tier));
        }
    }

    #[test]
    fn never_policy_stays_empty() {
        assert_eq!(SpawnPolicy::never().outcome(0.0, 0.0), CellOutcome::Empty);
    }

    #[test]
    fn tiers_past_max_are_clamped() {
        let policy = SpawnPolicy {
            spawn_chance: 1.0,
            tier_thresholds: smallvec![0.0, 0.0, 0.0, 0.0, 0.0],
        };

        assert_eq!(policy.outcome(0.0, 0.5), token(MAX_TIER));
    }
}
