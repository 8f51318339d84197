use serde::{Deserialize, Serialize};

use crate::*;

/// Mean earth radius used for great-circle distances.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Maps world positions to grid cells of a fixed angular size.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GridMapper {
    origin: LatLng,
    step: f64,
}

impl GridMapper {
    pub const fn new(origin: LatLng, step: f64) -> Self {
        Self { origin, step }
    }

    pub const fn origin(&self) -> LatLng {
        self.origin
    }

    pub const fn step(&self) -> f64 {
        self.step
    }

    pub fn to_cell_address(&self, position: LatLng) -> CellAddress {
        CellAddress::new(
            self.axis_index(position.lat, self.origin.lat),
            self.axis_index(position.lng, self.origin.lng),
        )
    }

    pub fn cell_bounds(&self, addr: CellAddress) -> Bounds {
        Bounds {
            south: self.axis_min(addr.i, self.origin.lat),
            west: self.axis_min(addr.j, self.origin.lng),
            north: self.axis_max(addr.i, self.origin.lat),
            east: self.axis_max(addr.j, self.origin.lng),
        }
    }

    pub fn cell_center(&self, addr: CellAddress) -> LatLng {
        self.cell_bounds(addr).center()
    }

    /// Inclusive range of cells overlapping `viewport`.
    pub fn visible_range(&self, viewport: Bounds) -> CellRange {
        if viewport.is_empty() {
            return CellRange::EMPTY;
        }
        let south_west = self.to_cell_address(viewport.south_west());
        let north_east = self.to_cell_address(viewport.north_east());
        CellRange {
            i_min: south_west.i,
            i_max: north_east.i,
            j_min: south_west.j,
            j_max: north_east.j,
        }
    }

    /// Moves `position` exactly one cell along `direction`.
    pub fn step_position(&self, position: LatLng, direction: Direction) -> LatLng {
        let (di, dj) = direction.delta();
        LatLng::new(
            position.lat + f64::from(di) * self.step,
            position.lng + f64::from(dj) * self.step,
        )
    }

    fn axis_min(&self, index: Coord, origin: f64) -> f64 {
        origin + f64::from(index) * self.step
    }

    fn axis_max(&self, index: Coord, origin: f64) -> f64 {
        origin + (f64::from(index) + 1.0) * self.step
    }

    /// Floor division, nudged so the value always lies inside the bounds that
    /// `axis_min`/`axis_max` report for the resulting index.
    fn axis_index(&self, value: f64, origin: f64) -> Coord {
        let mut index = ((value - origin) / self.step).floor() as Coord;
        for _ in 0..2 {
            if self.axis_min(index, origin) > value && index > Coord::MIN {
                index -= 1;
            } else if self.axis_max(index, origin) < value && index < Coord::MAX {
                index += 1;
            } else {
                break;
            }
        }
        index
    }
}

impl Default for GridMapper {
    fn default() -> Self {
        Self::new(LatLng::new(0.0, 0.0), 1e-4)
    }
}

/// Great-circle distance in meters (haversine).
pub fn distance_m(a: LatLng, b: LatLng) -> f64 {
    let lat_a = a.lat.to_radians();
    let lat_b = b.lat.to_radians();
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lng = (b.lng - a.lng).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat_a.cos() * lat_b.cos() * (d_lng / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * h.sqrt().min(1.0).asin()
}
