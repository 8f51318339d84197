use rand::prelude::*;

use super::*;

/// Independent roll made for a cell.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u64)]
pub enum SamplePurpose {
    Spawn = 1,
    Tier = 2,
}

/// Derives every roll from a hash of `(seed, i, j, purpose)`, so the same cell
/// always generates the same outcome regardless of visiting order.
#[derive(Clone, Debug, PartialEq)]
pub struct SeededCellGenerator {
    seed: u64,
    policy: SpawnPolicy,
}

impl SeededCellGenerator {
    pub fn new(seed: u64, policy: SpawnPolicy) -> Self {
        Self { seed, policy }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Uniform sample in `[0, 1)` for the given cell and purpose.
    pub fn sample(&self, addr: CellAddress, purpose: SamplePurpose) -> f64 {
        let mut rng = SmallRng::seed_from_u64(cell_hash(self.seed, addr, purpose));
        rng.random_range(0.0..1.0)
    }

    pub fn outcome_at(&self, addr: CellAddress) -> CellOutcome {
        self.policy.outcome(
            self.sample(addr, SamplePurpose::Spawn),
            self.sample(addr, SamplePurpose::Tier),
        )
    }
}

impl CellGenerator for SeededCellGenerator {
    fn generate(&mut self, addr: CellAddress) -> CellOutcome {
        self.outcome_at(addr)
    }
}

fn splitmix64(mut z: u64) -> u64 {
    z = z.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

fn cell_hash(seed: u64, addr: CellAddress, purpose: SamplePurpose) -> u64 {
    // sign-extension is irrelevant here, only distinctness matters
    let i = u64::from(addr.i as u32);
    let j = u64::from(addr.j as u32);
    let h = splitmix64(seed);
    let h = splitmix64(h ^ i);
    let h = splitmix64(h ^ j.rotate_left(32));
    splitmix64(h ^ purpose as u64)
}
