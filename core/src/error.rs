use thiserror::Error;

use crate::{CellAddress, Tier};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum GameError {
    #[error("Too far ({distance_m:.0}m), need to be within {radius_m:.0}m")]
    TooFar { distance_m: f64, radius_m: f64 },
    #[error("Tiers must match to merge, holding tier {held} but found tier {found}")]
    TierMismatch { held: Tier, found: Tier },
    #[error("No token at cell {0}")]
    NoToken(CellAddress),
    #[error("Invalid tier {0}")]
    InvalidTier(u8),
    #[error("Invalid cell key {0:?}")]
    InvalidCellKey(String),
    #[error("Position source unavailable: {0}")]
    PositionUnavailable(String),
    #[error("Manual steps are disabled while following the live position feed")]
    WrongMovementMode,
}

pub type Result<T> = core::result::Result<T, GameError>;
