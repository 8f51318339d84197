extern crate alloc;

use serde::{Deserialize, Serialize};

pub use engine::*;
pub use error::*;
pub use generator::*;
pub use grid::*;
pub use memento::*;
pub use movement::*;
pub use persistence::*;
pub use session::*;
pub use tile::*;
pub use types::*;
pub use viewport::*;

mod engine;
mod error;
mod generator;
mod grid;
mod memento;
mod movement;
mod persistence;
mod session;
mod tile;
mod types;
mod viewport;

/// Tunables of a world, everything has a sensible default.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Position of cell `(0, 0)`'s south-west corner.
    pub origin: LatLng,
    /// Cell edge length in degrees.
    pub cell_deg: f64,
    pub collect_radius_m: f64,
    /// Where new and reset sessions place the player.
    pub start_position: LatLng,
    pub spawn: SpawnPolicy,
    pub generator: GeneratorConfig,
    /// Record generated outcomes on first sight so revisits restore them,
    /// otherwise only pickups and merges are remembered.
    pub record_generated: bool,
    pub win_banner: WinBanner,
    /// Viewport size in cells as `(rows, cols)`, centred on the player.
    pub viewport_cells: (u16, u16),
}

impl WorldConfig {
    pub const fn grid(&self) -> GridMapper {
        GridMapper::new(self.origin, self.cell_deg)
    }

    pub fn viewport_around(&self, center: LatLng) -> Bounds {
        let (rows, cols) = self.viewport_cells;
        Bounds::around(
            center,
            f64::from(rows) * self.cell_deg / 2.0,
            f64::from(cols) * self.cell_deg / 2.0,
        )
    }
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            origin: LatLng::new(0.0, 0.0),
            cell_deg: 1e-4,
            collect_radius_m: 60.0,
            start_position: LatLng::new(36.997936938057016, -122.05703507501151),
            spawn: SpawnPolicy::default(),
            generator: GeneratorConfig::default(),
            record_generated: true,
            win_banner: WinBanner::default(),
            viewport_cells: (21, 31),
        }
    }
}
