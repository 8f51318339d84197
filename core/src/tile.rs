use core::fmt;
use serde::{Deserialize, Serialize};

use crate::{CellAddress, GameError, LatLng, Result};

/// Highest tier a token can reach, merging at this tier keeps it there.
pub const MAX_TIER: u8 = 4;

/// Token progression level, always within `1..=MAX_TIER`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Tier(u8);

impl Tier {
    pub const MIN: Tier = Tier(1);
    pub const MAX: Tier = Tier(MAX_TIER);

    pub const fn new(value: u8) -> Result<Self> {
        if value >= 1 && value <= MAX_TIER {
            Ok(Self(value))
        } else {
            Err(GameError::InvalidTier(value))
        }
    }

    /// Like [`Tier::new`] but clamps into range instead of failing.
    pub const fn saturating(value: u8) -> Self {
        if value < 1 {
            Self::MIN
        } else if value > MAX_TIER {
            Self::MAX
        } else {
            Self(value)
        }
    }

    pub const fn get(self) -> u8 {
        self.0
    }

    pub const fn is_max(self) -> bool {
        self.0 == MAX_TIER
    }

    /// Tier produced by merging two tokens of this tier.
    pub const fn merged(self) -> Self {
        Self::saturating(self.0.saturating_add(1))
    }
}

impl TryFrom<u8> for Tier {
    type Error = GameError;

    fn try_from(value: u8) -> Result<Self> {
        Self::new(value)
    }
}

impl From<Tier> for u8 {
    fn from(tier: Tier) -> Self {
        tier.0
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Durable outcome recorded for a touched cell.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CellOutcome {
    /// No token spawned, or its token was picked up.
    Empty,
    Token(Tier),
}

impl CellOutcome {
    pub const fn tier(self) -> Option<Tier> {
        match self {
            Self::Empty => None,
            Self::Token(tier) => Some(tier),
        }
    }

    pub const fn from_tier(tier: Option<Tier>) -> Self {
        match tier {
            None => Self::Empty,
            Some(tier) => Self::Token(tier),
        }
    }
}

/// A collectible on a visible cell, derived from the cell's outcome.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub id: String,
    pub cell: CellAddress,
    pub position: LatLng,
    pub tier: Tier,
}

impl Token {
    pub fn new(cell: CellAddress, position: LatLng, tier: Tier) -> Self {
        Self {
            id: cell.key(),
            cell,
            position,
            tier,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tier_rejects_out_of_range_values() {
        assert_eq!(Tier::new(0), Err(GameError::InvalidTier(0)));
        assert_eq!(Tier::new(MAX_TIER + 1), Err(GameError::InvalidTier(MAX_TIER + 1)));
        assert_eq!(Tier::new(2).map(Tier::get), Ok(2));
    }

    #[test]
    fn merging_caps_at_max_tier() {
        assert_eq!(Tier::MIN.merged().get(), 2);
        assert_eq!(Tier::MAX.merged(), Tier::MAX);
    }

    #[test]
    fn tier_deserializes_as_validated_integer() {
        assert_eq!(serde_json::from_str::<Tier>("3").unwrap().get(), 3);
        assert!(serde_json::from_str::<Tier>("9").is_err());
        assert_eq!(serde_json::to_string(&Tier::MAX).unwrap(), "4");
    }
}
