//! Bit-level geohashes and the providers that produce them.
//!
//! A [`GeoHash`] is an ordered sequence of up to 64 bits. Bits alternate
//! between longitude and latitude, longitude first, each bit halving the
//! remaining interval. Two positions that agree on the first `k` bits lie in
//! the same cell at precision `k`, which is what the precision index relies
//! on.
//!
//! ```text
//! bits:   1    0    1    1    0
//! axis:  lon  lat  lon  lat  lon
//! ```
//!
//! The index never encodes coordinates itself; it asks a [`GeohashProvider`].
//! [`Base32Geohash`] is the default provider and delegates to the `geohash`
//! crate. Any `Fn(&Position, usize) -> Result<GeoHash>` closure is also a
//! provider, which is handy for fixed mappings in tests.

use crate::error::{GeoproxError, Result};
use crate::types::Position;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum number of bits a [`GeoHash`] can hold.
pub const MAX_GEOHASH_BITS: usize = 64;

/// Maximum precision supported by [`Base32Geohash`] (12 base32 characters).
pub const MAX_BASE32_BITS: usize = 60;

const BASE32_ALPHABET: &[u8; 32] = b"0123456789bcdefghjkmnpqrstuvwxyz";

/// Distance the north and east edges are pulled inside the grid before
/// encoding. Far below the 30-bit cell size, so the top edge stays in the
/// last cell instead of wrapping to the first one.
const TOP_EDGE_INSET: f64 = 1e-9;

/// An ordered, finite sequence of bits, stored MSB-first.
///
/// # Examples
///
/// ```
/// use geoprox::GeoHash;
///
/// let hash = GeoHash::parse("1101")?;
/// assert_eq!(hash.bits_of_precision(), 4);
/// assert_eq!(hash.prefix(2)?.to_bit_string(), "11");
/// assert_eq!(hash.as_u64(), 0b1101);
/// # Ok::<(), geoprox::GeoproxError>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GeoHash {
    bits: u64,
    len: u8,
}

/// Cardinal direction for [`GeoHash::neighbor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    North,
    South,
    East,
    West,
}

impl GeoHash {
    /// Build a hash from the low `len` bits of `bits`.
    pub fn new(bits: u64, len: usize) -> Result<Self> {
        if len > MAX_GEOHASH_BITS {
            return Err(GeoproxError::InvalidGeohash(format!(
                "length {} exceeds {} bits",
                len, MAX_GEOHASH_BITS
            )));
        }
        if len < MAX_GEOHASH_BITS && bits >> len != 0 {
            return Err(GeoproxError::InvalidGeohash(format!(
                "value {:#b} does not fit in {} bits",
                bits, len
            )));
        }
        Ok(Self {
            bits,
            len: len as u8,
        })
    }

    /// The zero-length hash, which is a prefix of every hash.
    pub const fn empty() -> Self {
        Self { bits: 0, len: 0 }
    }

    pub fn from_bits(bits: &[bool]) -> Result<Self> {
        if bits.len() > MAX_GEOHASH_BITS {
            return Err(GeoproxError::InvalidGeohash(format!(
                "length {} exceeds {} bits",
                bits.len(),
                MAX_GEOHASH_BITS
            )));
        }
        let value = bits
            .iter()
            .fold(0u64, |acc, &bit| (acc << 1) | u64::from(bit));
        Ok(Self {
            bits: value,
            len: bits.len() as u8,
        })
    }

    /// Parse a string of `'0'` and `'1'` characters.
    pub fn parse(s: &str) -> Result<Self> {
        let bits = s
            .chars()
            .map(|c| match c {
                '0' => Ok(false),
                '1' => Ok(true),
                other => Err(GeoproxError::InvalidInput(format!(
                    "unexpected character '{}' in bit string",
                    other
                ))),
            })
            .collect::<Result<Vec<_>>>()?;
        Self::from_bits(&bits)
    }

    #[inline]
    pub fn bits_of_precision(&self) -> usize {
        self.len as usize
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The bit string read as an unsigned integer.
    #[inline]
    pub fn as_u64(&self) -> u64 {
        self.bits
    }

    /// Bit `i`, counting from the most significant (first) bit.
    pub fn bit(&self, i: usize) -> Option<bool> {
        if i >= self.bits_of_precision() {
            return None;
        }
        let shift = self.bits_of_precision() - 1 - i;
        Some((self.bits >> shift) & 1 == 1)
    }

    /// The first `n` bits of this hash.
    pub fn prefix(&self, n: usize) -> Result<Self> {
        GeoproxError::check_precision(n, self.bits_of_precision())?;
        if n == 0 {
            return Ok(Self::empty());
        }
        Ok(Self {
            bits: self.bits >> (self.bits_of_precision() - n),
            len: n as u8,
        })
    }

    /// Whether `self` starts with all bits of `other`.
    pub fn starts_with(&self, other: &GeoHash) -> bool {
        self.prefix(other.bits_of_precision())
            .is_ok_and(|prefix| prefix == *other)
    }

    pub fn iter(&self) -> impl Iterator<Item = bool> + '_ {
        (0..self.bits_of_precision()).filter_map(|i| self.bit(i))
    }

    pub fn to_bit_string(&self) -> String {
        self.iter().map(|bit| if bit { '1' } else { '0' }).collect()
    }

    /// The adjacent cell of the same precision in `direction`.
    ///
    /// Longitude wraps around the antimeridian. Latitude does not wrap, so
    /// cells on the top row have no northern neighbor and cells on the bottom
    /// row have no southern one.
    ///
    /// ```
    /// use geoprox::{Direction, GeoHash};
    ///
    /// let hash = GeoHash::parse("10")?;
    /// assert_eq!(hash.neighbor(Direction::North), Some(GeoHash::parse("11")?));
    /// assert_eq!(hash.neighbor(Direction::East), Some(GeoHash::parse("00")?));
    /// assert_eq!(hash.neighbor(Direction::South), None);
    /// # Ok::<(), geoprox::GeoproxError>(())
    /// ```
    pub fn neighbor(&self, direction: Direction) -> Option<GeoHash> {
        let len = self.bits_of_precision();
        let lon_bits = len.div_ceil(2);
        let lat_bits = len / 2;
        let (mut lon, mut lat) = self.deinterleave();

        match direction {
            Direction::North => {
                if lat_bits == 0 || lat + 1 >= 1u64 << lat_bits {
                    return None;
                }
                lat += 1;
            }
            Direction::South => {
                if lat_bits == 0 || lat == 0 {
                    return None;
                }
                lat -= 1;
            }
            Direction::East | Direction::West => {
                if lon_bits == 0 {
                    return None;
                }
                let mask = (1u64 << lon_bits) - 1;
                lon = match direction {
                    Direction::East => (lon + 1) & mask,
                    _ => (lon + mask) & mask,
                };
            }
        }

        Some(Self::interleave(lon, lat, len))
    }

    pub fn north_neighbor(&self) -> Option<GeoHash> {
        self.neighbor(Direction::North)
    }

    pub fn south_neighbor(&self) -> Option<GeoHash> {
        self.neighbor(Direction::South)
    }

    pub fn east_neighbor(&self) -> Option<GeoHash> {
        self.neighbor(Direction::East)
    }

    pub fn west_neighbor(&self) -> Option<GeoHash> {
        self.neighbor(Direction::West)
    }

    /// Split into (longitude cell, latitude cell). Even bits are longitude.
    fn deinterleave(&self) -> (u64, u64) {
        let mut lon = 0u64;
        let mut lat = 0u64;
        for (i, bit) in self.iter().enumerate() {
            if i % 2 == 0 {
                lon = (lon << 1) | u64::from(bit);
            } else {
                lat = (lat << 1) | u64::from(bit);
            }
        }
        (lon, lat)
    }

    fn interleave(lon: u64, lat: u64, len: usize) -> Self {
        let lon_bits = len.div_ceil(2);
        let lat_bits = len / 2;
        let mut bits = 0u64;
        for i in 0..len {
            let bit = if i % 2 == 0 {
                (lon >> (lon_bits - 1 - i / 2)) & 1
            } else {
                (lat >> (lat_bits - 1 - i / 2)) & 1
            };
            bits = (bits << 1) | bit;
        }
        Self {
            bits,
            len: len as u8,
        }
    }
}

impl fmt::Display for GeoHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_bit_string())
    }
}

/// Converts positions into geohashes.
///
/// Implementations must be deterministic: the operation log replays inserts
/// by encoding their positions again.
pub trait GeohashProvider: Send + Sync {
    /// Encode `position` into a hash of exactly `bits` bits.
    fn encode(&self, position: &Position, bits: usize) -> Result<GeoHash>;
}

impl<F> GeohashProvider for F
where
    F: Fn(&Position, usize) -> Result<GeoHash> + Send + Sync,
{
    fn encode(&self, position: &Position, bits: usize) -> Result<GeoHash> {
        self(position, bits)
    }
}

/// Default provider backed by the `geohash` crate.
///
/// The crate produces base32 character geohashes (5 bits per character);
/// they are decoded back into bits and truncated to the requested precision.
///
/// # Examples
///
/// ```
/// use geoprox::{Base32Geohash, GeohashProvider, Position};
///
/// let provider = Base32Geohash::default();
/// let hash = provider.encode(&Position::new(57.64911, 10.40744), 10)?;
/// // "u4" in base32
/// assert_eq!(hash.to_bit_string(), "1101000100");
/// # Ok::<(), geoprox::GeoproxError>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Base32Geohash {
    clamp_coordinates: bool,
}

impl Base32Geohash {
    pub fn new(clamp_coordinates: bool) -> Self {
        Self { clamp_coordinates }
    }

    /// Reject coordinates outside `[-90, 90]` x `[-180, 180]` instead of
    /// clamping them.
    pub fn strict() -> Self {
        Self::new(false)
    }

    pub fn clamps_coordinates(&self) -> bool {
        self.clamp_coordinates
    }

    fn normalize(&self, position: &Position) -> Result<(f64, f64)> {
        let (lat, lon) = (position.latitude(), position.longitude());

        if !lat.is_finite() || !lon.is_finite() {
            return Err(GeoproxError::InvalidInput(format!(
                "coordinates must be finite, got ({}, {})",
                lat, lon
            )));
        }

        let in_range = (-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lon);
        if in_range {
            return Ok((lat, lon));
        }

        if !self.clamp_coordinates {
            return Err(GeoproxError::InvalidInput(format!(
                "coordinates out of range: ({}, {})",
                lat, lon
            )));
        }

        let clamped = (lat.clamp(-90.0, 90.0), lon.clamp(-180.0, 180.0));
        log::warn!(
            "Clamping out-of-range position ({}, {}) to ({}, {})",
            lat,
            lon,
            clamped.0,
            clamped.1
        );
        Ok(clamped)
    }
}

impl Default for Base32Geohash {
    fn default() -> Self {
        Self::new(true)
    }
}

impl GeohashProvider for Base32Geohash {
    fn encode(&self, position: &Position, bits: usize) -> Result<GeoHash> {
        GeoproxError::check_precision(bits, MAX_BASE32_BITS)?;
        let (lat, lon) = self.normalize(position)?;
        // The top edges are inclusive: 90 and 180 belong to the last cell.
        let lat = lat.min(90.0 - TOP_EDGE_INSET);
        let lon = lon.min(180.0 - TOP_EDGE_INSET);

        let chars = bits.div_ceil(5).max(1);
        let encoded = geohash::encode(geohash::Coord { x: lon, y: lat }, chars)
            .map_err(|e| GeoproxError::InvalidGeohash(format!("{:?}", e)))?;

        decode_base32(&encoded)?.prefix(bits)
    }
}

/// Provider backed by a fixed position → hash table.
///
/// Positions missing from the table cannot be encoded. Useful when the
/// grouping of positions must be known in advance.
///
/// ```
/// use geoprox::{GeoHash, GeohashProvider, GeohashTable, Position};
///
/// let table = GeohashTable::new().with(Position::new(36.14, -86.80), GeoHash::parse("110")?);
/// let hash = table.encode(&Position::new(36.14, -86.80), 2)?;
/// assert_eq!(hash.to_bit_string(), "11");
/// assert!(table.encode(&Position::new(0.0, 0.0), 2).is_err());
/// # Ok::<(), geoprox::GeoproxError>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct GeohashTable {
    hashes: FxHashMap<Position, GeoHash>,
}

impl GeohashTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, position: Position, hash: GeoHash) -> Self {
        self.insert(position, hash);
        self
    }

    pub fn insert(&mut self, position: Position, hash: GeoHash) -> Option<GeoHash> {
        self.hashes.insert(position, hash)
    }

    pub fn len(&self) -> usize {
        self.hashes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hashes.is_empty()
    }
}

impl FromIterator<(Position, GeoHash)> for GeohashTable {
    fn from_iter<I: IntoIterator<Item = (Position, GeoHash)>>(iter: I) -> Self {
        Self {
            hashes: iter.into_iter().collect(),
        }
    }
}

impl GeohashProvider for GeohashTable {
    fn encode(&self, position: &Position, bits: usize) -> Result<GeoHash> {
        self.hashes
            .get(position)
            .ok_or_else(|| {
                GeoproxError::InvalidInput(format!(
                    "no geohash registered for ({}, {})",
                    position.latitude(),
                    position.longitude()
                ))
            })
            .and_then(|hash| {
                if hash.bits_of_precision() < bits {
                    return Err(GeoproxError::InvalidGeohash(format!(
                        "registered hash has {} bits, {} requested",
                        hash.bits_of_precision(),
                        bits
                    )));
                }
                hash.prefix(bits)
            })
    }
}

/// Decode a base32 geohash string into its bit sequence.
pub fn decode_base32(hash: &str) -> Result<GeoHash> {
    let mut bits = Vec::with_capacity(hash.len() * 5);
    for c in hash.bytes() {
        let value = BASE32_ALPHABET
            .iter()
            .position(|&a| a == c.to_ascii_lowercase())
            .ok_or_else(|| {
                GeoproxError::InvalidGeohash(format!(
                    "'{}' is not a base32 geohash character",
                    c as char
                ))
            })?;
        bits.extend((0..5).rev().map(|shift| (value >> shift) & 1 == 1));
    }
    GeoHash::from_bits(&bits)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_display() {
        let hash = GeoHash::parse("01101").unwrap();
        assert_eq!(hash.bits_of_precision(), 5);
        assert_eq!(hash.as_u64(), 0b01101);
        assert_eq!(hash.to_string(), "01101");
        assert_eq!(hash.bit(0), Some(false));
        assert_eq!(hash.bit(1), Some(true));
        assert_eq!(hash.bit(5), None);

        assert!(GeoHash::parse("0120").is_err());
    }

    #[test]
    fn test_new_rejects_overflowing_values() {
        assert!(GeoHash::new(0b111, 3).is_ok());
        assert!(GeoHash::new(0b1000, 3).is_err());
        assert!(GeoHash::new(u64::MAX, 64).is_ok());
        assert!(GeoHash::new(0, 65).is_err());
    }

    #[test]
    fn test_prefix() {
        let hash = GeoHash::parse("110101").unwrap();
        assert_eq!(hash.prefix(0).unwrap(), GeoHash::empty());
        assert_eq!(hash.prefix(3).unwrap().to_bit_string(), "110");
        assert_eq!(hash.prefix(6).unwrap(), hash);
        assert_eq!(
            hash.prefix(7),
            Err(GeoproxError::InvalidPrecision {
                precision: 7,
                resolution: 6
            })
        );
    }

    #[test]
    fn test_prefix_of_full_width_hash() {
        let hash = GeoHash::new(u64::MAX, 64).unwrap();
        assert_eq!(hash.prefix(1).unwrap().as_u64(), 1);
        assert_eq!(hash.prefix(0).unwrap(), GeoHash::empty());
    }

    #[test]
    fn test_starts_with() {
        let hash = GeoHash::parse("1011").unwrap();
        assert!(hash.starts_with(&GeoHash::parse("10").unwrap()));
        assert!(hash.starts_with(&GeoHash::empty()));
        assert!(!hash.starts_with(&GeoHash::parse("11").unwrap()));
        assert!(!hash.starts_with(&GeoHash::parse("10110").unwrap()));
    }

    #[test]
    fn test_neighbors_wrap_longitude() {
        // lon cell 0 of 2, lat cell 0 of 2
        let hash = GeoHash::parse("00").unwrap();
        assert_eq!(hash.west_neighbor(), Some(GeoHash::parse("10").unwrap()));
        assert_eq!(hash.east_neighbor(), Some(GeoHash::parse("10").unwrap()));
        assert_eq!(hash.north_neighbor(), Some(GeoHash::parse("01").unwrap()));
        assert_eq!(hash.south_neighbor(), None);
    }

    #[test]
    fn test_neighbors_stop_at_poles() {
        // lon = 0b11, lat = 0b11: top row
        let hash = GeoHash::parse("1111").unwrap();
        assert_eq!(hash.north_neighbor(), None);
        assert_eq!(hash.south_neighbor(), Some(GeoHash::parse("1110").unwrap()));
        assert_eq!(hash.east_neighbor(), Some(GeoHash::parse("0101").unwrap()));
        assert_eq!(hash.west_neighbor(), Some(GeoHash::parse("1101").unwrap()));
    }

    #[test]
    fn test_neighbors_odd_length() {
        // lon = 0b10, lat = 0b1
        let hash = GeoHash::parse("110").unwrap();
        assert_eq!(hash.north_neighbor(), None);
        assert_eq!(hash.south_neighbor(), Some(GeoHash::parse("100").unwrap()));
        assert_eq!(hash.east_neighbor(), Some(GeoHash::parse("111").unwrap()));

        let single = GeoHash::parse("1").unwrap();
        assert_eq!(single.north_neighbor(), None);
        assert_eq!(single.east_neighbor(), Some(GeoHash::parse("0").unwrap()));
        assert_eq!(GeoHash::empty().east_neighbor(), None);
    }

    #[test]
    fn test_neighbors_are_inverse() {
        let hash = GeoHash::parse("0110100111").unwrap();
        let east = hash.east_neighbor().unwrap();
        assert_eq!(east.west_neighbor(), Some(hash));
        let north = hash.north_neighbor().unwrap();
        assert_eq!(north.south_neighbor(), Some(hash));
    }

    #[test]
    fn test_decode_base32() {
        assert_eq!(decode_base32("u").unwrap().to_bit_string(), "11010");
        assert_eq!(decode_base32("0z").unwrap().to_bit_string(), "0000011111");
        assert!(decode_base32("a").is_err());
    }

    #[test]
    fn test_base32_provider_matches_known_hash() {
        let provider = Base32Geohash::default();
        let jutland = Position::new(57.64911, 10.40744);
        let hash = provider.encode(&jutland, 25).unwrap();
        assert_eq!(hash, decode_base32("u4pru").unwrap());

        let shorter = provider.encode(&jutland, 7).unwrap();
        assert_eq!(shorter, hash.prefix(7).unwrap());
    }

    #[test]
    fn test_base32_provider_first_bits_split_hemispheres() {
        let provider = Base32Geohash::default();
        let east = provider.encode(&Position::new(10.0, 100.0), 2).unwrap();
        let west = provider.encode(&Position::new(10.0, -100.0), 2).unwrap();
        let south_west = provider.encode(&Position::new(-10.0, -100.0), 2).unwrap();
        assert_eq!(east.to_bit_string(), "11");
        assert_eq!(west.to_bit_string(), "01");
        assert_eq!(south_west.to_bit_string(), "00");
    }

    #[test]
    fn test_base32_provider_corners_are_distinct() {
        let provider = Base32Geohash::default();
        let corner = |lat: f64, lon: f64| {
            provider
                .encode(&Position::new(lat, lon), MAX_BASE32_BITS)
                .unwrap()
                .to_bit_string()
        };

        assert_eq!(corner(-90.0, -180.0), "0".repeat(60));
        assert_eq!(corner(90.0, 180.0), "1".repeat(60));
        // Longitude takes the even bits.
        assert_eq!(corner(90.0, -180.0), "01".repeat(30));
        assert_eq!(corner(-90.0, 180.0), "10".repeat(30));

        // The inset never moves an interior position out of its cell.
        let near_pole = provider.encode(&Position::new(89.99, 179.99), 25).unwrap();
        assert_eq!(near_pole, decode_base32("zzzzz").unwrap());
    }

    #[test]
    fn test_base32_provider_clamps_or_rejects() {
        let clamping = Base32Geohash::default();
        let edge = clamping.encode(&Position::new(90.0, -180.0), 16).unwrap();
        let beyond = clamping.encode(&Position::new(90.5, -180.5), 16).unwrap();
        assert_eq!(edge, beyond);

        let strict = Base32Geohash::strict();
        assert!(matches!(
            strict.encode(&Position::new(90.5, -180.5), 16),
            Err(GeoproxError::InvalidInput(_))
        ));
        assert!(matches!(
            clamping.encode(&Position::new(f64::NAN, 0.0), 16),
            Err(GeoproxError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_base32_provider_precision_limit() {
        let provider = Base32Geohash::default();
        let origin = Position::new(0.0, 0.0);
        assert_eq!(provider.encode(&origin, 0).unwrap(), GeoHash::empty());
        assert_eq!(
            provider.encode(&origin, 60).unwrap().bits_of_precision(),
            60
        );
        assert!(matches!(
            provider.encode(&origin, 61),
            Err(GeoproxError::InvalidPrecision { .. })
        ));
    }

    #[test]
    fn test_table_provider() {
        let table: GeohashTable = [
            (Position::new(1.0, 100.0), GeoHash::parse("01110").unwrap()),
            (Position::new(-20.0, 25.0), GeoHash::parse("11001").unwrap()),
        ]
        .into_iter()
        .collect();

        assert_eq!(table.len(), 2);
        let hash = table.encode(&Position::new(1.0, 100.0), 3).unwrap();
        assert_eq!(hash.to_bit_string(), "011");
        assert!(matches!(
            table.encode(&Position::new(-20.0, 25.0), 6),
            Err(GeoproxError::InvalidGeohash(_))
        ));
        assert!(matches!(
            table.encode(&Position::new(0.0, 0.0), 3),
            Err(GeoproxError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_closure_provider() {
        let provider =
            |_: &Position, bits: usize| GeoHash::parse("1010").and_then(|hash| hash.prefix(bits));
        let hash = provider.encode(&Position::new(0.0, 0.0), 3).unwrap();
        assert_eq!(hash.to_bit_string(), "101");
    }
}
