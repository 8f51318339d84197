use rand::prelude::*;

use super::*;

/// Draws cell contents from a single random stream; revisiting a cell that has
/// no memento rolls it again.
#[derive(Clone, Debug)]
pub struct RandomCellGenerator {
    rng: SmallRng,
    policy: SpawnPolicy,
}

impl RandomCellGenerator {
    pub fn new(seed: u64, policy: SpawnPolicy) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(seed),
            policy,
        }
    }

    pub fn policy(&self) -> &SpawnPolicy {
        &self.policy
    }
}

impl CellGenerator for RandomCellGenerator {
    fn generate(&mut self, addr: CellAddress) -> CellOutcome {
        let spawn_sample: f64 = self.rng.random_range(0.0..1.0);
        // the tier roll is only drawn for spawning cells
        let outcome = if spawn_sample < self.policy.spawn_chance {
            let tier_sample: f64 = self.rng.random_range(0.0..1.0);
            self.policy.outcome(spawn_sample, tier_sample)
        } else {
            CellOutcome::Empty
        };
        log::trace!("rolled {:?} for cell {}", outcome, addr);
        outcome
    }
}
