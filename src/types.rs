//! Core value types: positions, stored entries and database statistics.

use crate::geohash::GeoHash;
use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};

/// A geographic position in degrees.
///
/// Equality and hashing compare the exact bit patterns of both coordinates,
/// with `-0.0` treated as `0.0`, so positions can key hash maps.
///
/// # Examples
///
/// ```
/// use geoprox::Position;
///
/// let nashville = Position::new(36.1627, -86.7816);
/// assert_eq!(nashville.latitude(), 36.1627);
/// assert_eq!(nashville, Position::new(36.1627, -86.7816));
/// ```
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Position {
    latitude: f64,
    longitude: f64,
}

impl Position {
    #[inline]
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    #[inline]
    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    #[inline]
    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    fn key(&self) -> (u64, u64) {
        // Adding 0.0 folds -0.0 into +0.0.
        (
            (self.latitude + 0.0).to_bits(),
            (self.longitude + 0.0).to_bits(),
        )
    }
}

impl PartialEq for Position {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for Position {}

impl Hash for Position {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

impl From<geo::Point<f64>> for Position {
    /// `geo` points are `(x, y)` = `(longitude, latitude)`.
    fn from(point: geo::Point<f64>) -> Self {
        Self::new(point.y(), point.x())
    }
}

impl From<Position> for geo::Point<f64> {
    fn from(position: Position) -> Self {
        geo::Point::new(position.longitude, position.latitude)
    }
}

impl From<(f64, f64)> for Position {
    /// Interprets the tuple as `(latitude, longitude)`.
    fn from((latitude, longitude): (f64, f64)) -> Self {
        Self::new(latitude, longitude)
    }
}

/// A stored data item with the full-resolution geohash it was indexed under.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry<T> {
    pub geohash: GeoHash,
    pub position: Position,
    pub data: T,
}

impl<T> Entry<T> {
    pub fn new(geohash: GeoHash, position: Position, data: T) -> Self {
        Self {
            geohash,
            position,
            data,
        }
    }

    pub fn data(&self) -> &T {
        &self.data
    }

    pub fn into_data(self) -> T {
        self.data
    }
}

/// Database statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DbStats {
    /// Number of stored entries
    pub entry_count: usize,
    /// Number of slots holding at least one entry
    pub occupied_slots: usize,
    /// Total number of slots (`2^resolution`)
    pub slot_count: usize,
    /// Bits of precision the index was built with
    pub resolution: usize,
    /// Total number of mutations applied
    pub operations_count: u64,
}

impl DbStats {
    /// Fraction of slots that hold data.
    pub fn occupancy(&self) -> f64 {
        if self.slot_count == 0 {
            return 0.0;
        }
        self.occupied_slots as f64 / self.slot_count as f64
    }
}
