use core::fmt;
use core::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::{GameError, Result};

/// Single grid axis, cells extend without bound in both directions.
pub type Coord = i32;

/// Geographic position in degrees.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

/// Axis-aligned lat/lng rectangle, inclusive on every edge.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub south: f64,
    pub west: f64,
    pub north: f64,
    pub east: f64,
}

impl Bounds {
    pub const fn new(south_west: LatLng, north_east: LatLng) -> Self {
        Self {
            south: south_west.lat,
            west: south_west.lng,
            north: north_east.lat,
            east: north_east.lng,
        }
    }

    /// Rectangle of `half_lat`/`half_lng` degrees around `center`.
    pub fn around(center: LatLng, half_lat: f64, half_lng: f64) -> Self {
        Self {
            south: center.lat - half_lat,
            west: center.lng - half_lng,
            north: center.lat + half_lat,
            east: center.lng + half_lng,
        }
    }

    pub const fn south_west(&self) -> LatLng {
        LatLng::new(self.south, self.west)
    }

    pub const fn north_east(&self) -> LatLng {
        LatLng::new(self.north, self.east)
    }

    pub fn center(&self) -> LatLng {
        LatLng::new(
            (self.south + self.north) / 2.0,
            (self.west + self.east) / 2.0,
        )
    }

    /// Zero-area or inverted bounds cover no cells.
    pub fn is_empty(&self) -> bool {
        !(self.north > self.south && self.east > self.west)
    }

    pub fn contains(&self, position: LatLng) -> bool {
        (self.south..=self.north).contains(&position.lat)
            && (self.west..=self.east).contains(&position.lng)
    }
}

/// Integer cell coordinates. `i` grows northwards, `j` eastwards.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CellAddress {
    pub i: Coord,
    pub j: Coord,
}

impl CellAddress {
    pub const fn new(i: Coord, j: Coord) -> Self {
        Self { i, j }
    }

    /// Stable textual key, `"{i},{j}"`.
    pub fn key(self) -> String {
        self.to_string()
    }
}

impl fmt::Display for CellAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.i, self.j)
    }
}

impl FromStr for CellAddress {
    type Err = GameError;

    fn from_str(key: &str) -> Result<Self> {
        let invalid = || GameError::InvalidCellKey(key.to_string());
        let (i, j) = key.split_once(',').ok_or_else(invalid)?;
        let i = i.trim().parse().map_err(|_| invalid())?;
        let j = j.trim().parse().map_err(|_| invalid())?;
        Ok(Self { i, j })
    }
}

/// Inclusive range of cell addresses.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct CellRange {
    pub i_min: Coord,
    pub i_max: Coord,
    pub j_min: Coord,
    pub j_max: Coord,
}

impl CellRange {
    pub const EMPTY: Self = Self {
        i_min: 0,
        i_max: -1,
        j_min: 0,
        j_max: -1,
    };

    pub const fn is_empty(&self) -> bool {
        self.i_min > self.i_max || self.j_min > self.j_max
    }

    pub const fn contains(&self, addr: CellAddress) -> bool {
        addr.i >= self.i_min && addr.i <= self.i_max && addr.j >= self.j_min && addr.j <= self.j_max
    }

    pub fn len(&self) -> usize {
        if self.is_empty() {
            0
        } else {
            let rows = (self.i_max as i64 - self.i_min as i64 + 1) as usize;
            let cols = (self.j_max as i64 - self.j_min as i64 + 1) as usize;
            rows.saturating_mul(cols)
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = CellAddress> + use<> {
        let CellRange {
            i_min,
            i_max,
            j_min,
            j_max,
        } = *self;
        (i_min..=i_max).flat_map(move |i| (j_min..=j_max).map(move |j| CellAddress::new(i, j)))
    }
}

/// One of the four manual step directions.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    North,
    South,
    East,
    West,
}

impl Direction {
    /// Cell displacement as `(di, dj)`.
    pub const fn delta(self) -> (Coord, Coord) {
        use Direction::*;
        match self {
            North => (1, 0),
            South => (-1, 0),
            East => (0, 1),
            West => (0, -1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cell_key_round_trips_negative_coordinates() {
        let addr = CellAddress::new(-12, 345);

        assert_eq!(addr.key(), "-12,345");
        assert_eq!("-12,345".parse::<CellAddress>().unwrap(), addr);
    }

    #[test]
    fn malformed_cell_keys_are_rejected() {
        for key in ["", "1", "1;2", "a,b", "1,2,3"] {
            assert_eq!(
                key.parse::<CellAddress>(),
                Err(GameError::InvalidCellKey(key.to_string())),
                "{key:?}"
            );
        }
    }

    #[test]
    fn zero_area_bounds_are_empty() {
        let p = LatLng::new(1.0, 2.0);

        assert!(Bounds::new(p, p).is_empty());
        assert!(!Bounds::around(p, 0.1, 0.1).is_empty());
    }

    #[test]
    fn range_iterates_row_major_inclusive() {
        let range = CellRange {
            i_min: 0,
            i_max: 1,
            j_min: -1,
            j_max: 0,
        };

        let cells: Vec<_> = range.iter().collect();

        assert_eq!(range.len(), 4);
        assert_eq!(
            cells,
            vec![
                CellAddress::new(0, -1),
                CellAddress::new(0, 0),
                CellAddress::new(1, -1),
                CellAddress::new(1, 0),
            ]
        );
        assert_eq!(CellRange::EMPTY.iter().count(), 0);
    }
}
