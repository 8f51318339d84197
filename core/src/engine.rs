use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use crate::*;

/// When a merge that reaches [`MAX_TIER`] announces the win.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum WinBanner {
    /// Every merge into the top tier announces it again.
    #[default]
    EveryMaxMerge,
    /// Only the first top-tier merge of the running session announces it.
    OncePerSession,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum InteractOutcome {
    NoChange,
    PickedUp {
        cell: CellAddress,
        tier: Tier,
    },
    Merged {
        cell: CellAddress,
        tier: Tier,
        announce_win: bool,
    },
}

impl InteractOutcome {
    pub const fn has_update(self) -> bool {
        use InteractOutcome::*;
        match self {
            NoChange => false,
            PickedUp { .. } => true,
            Merged { .. } => true,
        }
    }
}

/// Live tokens, the hand, and the win flag.
///
/// Live tokens are a projection of the memento: every mutation writes the
/// memento first and then re-derives the affected token from it.
#[derive(Clone, Debug)]
pub struct TokenEngine {
    live: HashMap<CellAddress, Token>,
    hand: Option<Tier>,
    has_won: bool,
    announced: bool,
    win_banner: WinBanner,
    collect_radius_m: f64,
}

impl TokenEngine {
    pub fn new(collect_radius_m: f64, win_banner: WinBanner) -> Self {
        Self {
            live: HashMap::new(),
            hand: None,
            has_won: false,
            announced: false,
            win_banner,
            collect_radius_m,
        }
    }

    /// Restores hand and win flag from a saved session.
    pub fn restore(&mut self, hand: Option<Tier>, has_won: bool) {
        self.hand = hand;
        self.has_won = has_won;
    }

    pub fn hand(&self) -> Option<Tier> {
        self.hand
    }

    pub fn has_won(&self) -> bool {
        self.has_won
    }

    pub fn collect_radius_m(&self) -> f64 {
        self.collect_radius_m
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    pub fn live_tokens(&self) -> impl Iterator<Item = &Token> {
        self.live.values()
    }

    pub fn token_at(&self, addr: CellAddress) -> Option<&Token> {
        self.live.get(&addr)
    }

    /// Makes the token for a cell entering view live, if it has one.
    pub fn materialize(&mut self, addr: CellAddress, position: LatLng, outcome: CellOutcome) -> Option<Token> {
        match outcome {
            CellOutcome::Token(tier) => {
                let token = Token::new(addr, position, tier);
                self.live.insert(addr, token.clone());
                Some(token)
            }
            CellOutcome::Empty => {
                self.live.remove(&addr);
                None
            }
        }
    }

    pub fn dematerialize(&mut self, addr: CellAddress) -> Option<Token> {
        self.live.remove(&addr)
    }

    /// Drops all live tokens, the hand, and the win flag.
    pub fn reset(&mut self) {
        self.live.clear();
        self.hand = None;
        self.has_won = false;
        self.announced = false;
    }

    /// Picks up or merges the live token at `addr`.
    pub fn interact(
        &mut self,
        addr: CellAddress,
        player: LatLng,
        memento: &mut CellMementoStore,
    ) -> Result<InteractOutcome> {
        let token = self.live.get(&addr).ok_or(GameError::NoToken(addr))?;

        let distance_m = distance_m(player, token.position);
        if distance_m > self.collect_radius_m {
            return Err(GameError::TooFar {
                distance_m,
                radius_m: self.collect_radius_m,
            });
        }

        let found = token.tier;
        match self.hand {
            None => {
                memento.set(addr, CellOutcome::Empty);
                self.project(addr, memento);
                self.hand = Some(found);
                log::debug!("picked up tier {} from {}", found, addr);
                Ok(InteractOutcome::PickedUp {
                    cell: addr,
                    tier: found,
                })
            }
            Some(held) if held == found => {
                let merged = found.merged();
                memento.set(addr, CellOutcome::Token(merged));
                self.project(addr, memento);
                self.hand = None;
                let announce_win = merged.is_max() && self.raise_win();
                log::debug!("merged tier {} into tier {} at {}", found, merged, addr);
                Ok(InteractOutcome::Merged {
                    cell: addr,
                    tier: merged,
                    announce_win,
                })
            }
            Some(held) => Err(GameError::TierMismatch { held, found }),
        }
    }

    /// Closest live token, unless it is farther than `radius_m`.
    pub fn nearest_in_range(&self, player: LatLng, radius_m: f64) -> Option<(CellAddress, f64)> {
        self.live
            .values()
            .map(|token| (token.cell, distance_m(player, token.position)))
            .min_by(|(a_cell, a), (b_cell, b)| a.total_cmp(b).then(a_cell.cmp(b_cell)))
            .filter(|&(_, distance)| distance <= radius_m)
    }

    /// Interacts with the closest token in range, doing nothing when there is
    /// none.
    pub fn interact_nearest(&mut self, player: LatLng, memento: &mut CellMementoStore) -> Result<InteractOutcome> {
        match self.nearest_in_range(player, self.collect_radius_m) {
            Some((addr, _)) => self.interact(addr, player, memento),
            None => Ok(InteractOutcome::NoChange),
        }
    }

    /// Re-derives the live token at `addr` from its memento entry.
    fn project(&mut self, addr: CellAddress, memento: &CellMementoStore) {
        match memento.get(addr) {
            Some(CellOutcome::Token(tier)) => {
                if let Some(token) = self.live.get_mut(&addr) {
                    token.tier = tier;
                }
            }
            Some(CellOutcome::Empty) | None => {
                self.live.remove(&addr);
            }
        }
    }

    /// Sets the win flag, returning whether the banner should be shown.
    fn raise_win(&mut self) -> bool {
        self.has_won = true;
        let announce = match self.win_banner {
            WinBanner::EveryMaxMerge => true,
            WinBanner::OncePerSession => !self.announced,
        };
        self.announced = true;
        announce
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tier(value: u8) -> Tier {
        Tier::new(value).unwrap()
    }

    fn engine_with(tokens: &[(CellAddress, u8)]) -> (TokenEngine, GridMapper, CellMementoStore) {
        let grid = GridMapper::default();
        let mut engine = TokenEngine::new(60.0, WinBanner::EveryMaxMerge);
        let mut memento = CellMementoStore::new();
        for &(addr, t) in tokens {
            memento.set(addr, CellOutcome::Token(tier(t)));
            engine.materialize(addr, grid.cell_center(addr), CellOutcome::Token(tier(t)));
        }
        (engine, grid, memento)
    }

    #[test]
    fn pickup_moves_tier_into_hand_and_empties_cell() {
        let addr = CellAddress::new(0, 0);
        let (mut engine, grid, mut memento) = engine_with(&[(addr, 2)]);

        let outcome = engine.interact(addr, grid.cell_center(addr), &mut memento).unwrap();

        assert_eq!(outcome, InteractOutcome::PickedUp { cell: addr, tier: tier(2) });
        assert_eq!(engine.hand(), Some(tier(2)));
        assert_eq!(memento.get(addr), Some(CellOutcome::Empty));
        assert!(engine.token_at(addr).is_none());
    }

    #[test]
    fn merge_upgrades_in_place_and_clears_hand() {
        let addr = CellAddress::new(0, 1);
        let (mut engine, grid, mut memento) = engine_with(&[(addr, 1)]);
        engine.restore(Some(tier(1)), false);

        let outcome = engine.interact(addr, grid.cell_center(addr), &mut memento).unwrap();

        assert_eq!(
            outcome,
            InteractOutcome::Merged {
                cell: addr,
                tier: tier(2),
                announce_win: false
            }
        );
        assert_eq!(engine.hand(), None);
        assert_eq!(engine.token_at(addr).map(|t| t.tier), Some(tier(2)));
        assert_eq!(memento.get(addr), Some(CellOutcome::Token(tier(2))));
    }

    #[test]
    fn mismatched_tiers_change_nothing() {
        let addr = CellAddress::new(0, 0);
        let (mut engine, grid, mut memento) = engine_with(&[(addr, 3)]);
        engine.restore(Some(tier(1)), false);

        let err = engine.interact(addr, grid.cell_center(addr), &mut memento).unwrap_err();

        assert_eq!(
            err,
            GameError::TierMismatch {
                held: tier(1),
                found: tier(3)
            }
        );
        assert_eq!(engine.hand(), Some(tier(1)));
        assert_eq!(memento.get(addr), Some(CellOutcome::Token(tier(3))));
    }

    #[test]
    fn far_tokens_are_rejected_with_distance() {
        let addr = CellAddress::new(10, 0);
        let (mut engine, grid, mut memento) = engine_with(&[(addr, 1)]);
        let player = grid.cell_center(CellAddress::new(0, 0));

        let err = engine.interact(addr, player, &mut memento).unwrap_err();

        match err {
            GameError::TooFar { distance_m, radius_m } => {
                assert!(distance_m > 100.0 && distance_m < 120.0, "{distance_m}");
                assert_eq!(radius_m, 60.0);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(engine.hand(), None);
    }

    #[test]
    fn interacting_with_empty_cell_is_an_error() {
        let (mut engine, grid, mut memento) = engine_with(&[]);
        let addr = CellAddress::new(0, 0);

        assert_eq!(
            engine.interact(addr, grid.cell_center(addr), &mut memento),
            Err(GameError::NoToken(addr))
        );
    }

    #[test]
    fn reaching_max_tier_raises_win_per_banner_policy() {
        let a = CellAddress::new(0, 0);
        let b = CellAddress::new(0, 1);
        for (policy, second_announce) in [(WinBanner::EveryMaxMerge, true), (WinBanner::OncePerSession, false)] {
            let grid = GridMapper::default();
            let mut engine = TokenEngine::new(60.0, policy);
            let mut memento = CellMementoStore::new();
            for addr in [a, b] {
                engine.materialize(addr, grid.cell_center(addr), CellOutcome::Token(tier(3)));
                memento.set(addr, CellOutcome::Token(tier(3)));
            }
            let player = grid.cell_center(a);

            engine.restore(Some(tier(3)), false);
            let first = engine.interact(a, player, &mut memento).unwrap();
            engine.restore(Some(tier(3)), engine.has_won());
            let second = engine.interact(b, player, &mut memento).unwrap();

            assert!(matches!(first, InteractOutcome::Merged { announce_win: true, .. }));
            assert!(matches!(
                second,
                InteractOutcome::Merged { announce_win, .. } if announce_win == second_announce
            ));
            assert!(engine.has_won());
        }
    }

    #[test]
    fn max_tier_merge_stays_at_max() {
        let addr = CellAddress::new(0, 0);
        let (mut engine, grid, mut memento) = engine_with(&[(addr, MAX_TIER)]);
        engine.restore(Some(Tier::MAX), true);

        engine.interact(addr, grid.cell_center(addr), &mut memento).unwrap();

        assert_eq!(engine.token_at(addr).map(|t| t.tier), Some(Tier::MAX));
        assert!(engine.has_won());
    }

    #[test]
    fn nearest_picks_closest_token_within_radius() {
        let near = CellAddress::new(1, 0);
        let far = CellAddress::new(3, 0);
        let (engine, grid, _) = engine_with(&[(far, 1), (near, 2)]);
        let player = grid.cell_center(CellAddress::new(0, 0));

        assert_eq!(engine.nearest_in_range(player, 60.0).map(|(c, _)| c), Some(near));
        assert_eq!(engine.nearest_in_range(player, 5.0), None);
    }

    #[test]
    fn nearest_without_tokens_is_a_no_op() {
        let (mut engine, grid, mut memento) = engine_with(&[]);

        let outcome = engine
            .interact_nearest(grid.cell_center(CellAddress::new(0, 0)), &mut memento)
            .unwrap();

        assert_eq!(outcome, InteractOutcome::NoChange);
        assert!(memento.is_empty());
    }
}
