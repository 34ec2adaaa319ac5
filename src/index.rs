//! Fixed-resolution precision index.
//!
//! The index is a flat array of `2^resolution` slots. A full-resolution
//! geohash read as an unsigned integer is its slot number, so every position
//! sharing a `k`-bit prefix lives in one contiguous run of slots:
//!
//! ```text
//! resolution = 3, prefix "11" (k = 2)
//!
//! slot:   000 001 010 011 100 101 110 111
//!                                 [-------]   start = 0b110, len = 2^(3-2)
//! ```
//!
//! Prefix queries are therefore slice operations; stored geohashes are never
//! compared against each other.

use crate::error::{GeoproxError, Result};
use crate::geohash::GeoHash;
use smallvec::SmallVec;
use std::collections::VecDeque;
use std::ops::Range;

/// Largest resolution an index can be allocated with.
pub const MAX_RESOLUTION: usize = 32;

/// Zero-argument constructor for empty slot containers.
pub type SlotFactory<C> = fn() -> C;

/// A per-slot multiset that keeps insertion order.
pub trait SlotContainer {
    type Item;
    type Iter<'a>: Iterator<Item = &'a Self::Item>
    where
        Self: 'a;

    fn push(&mut self, item: Self::Item);

    /// Items in insertion order.
    fn iter(&self) -> Self::Iter<'_>;

    /// Remove every item, returning them in insertion order.
    fn drain_all(&mut self) -> Vec<Self::Item>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<E> SlotContainer for Vec<E> {
    type Item = E;
    type Iter<'a>
        = std::slice::Iter<'a, E>
    where
        Self: 'a;

    fn push(&mut self, item: E) {
        Vec::push(self, item);
    }

    fn iter(&self) -> Self::Iter<'_> {
        self.as_slice().iter()
    }

    fn drain_all(&mut self) -> Vec<E> {
        std::mem::take(self)
    }

    fn len(&self) -> usize {
        Vec::len(self)
    }
}

impl<E> SlotContainer for VecDeque<E> {
    type Item = E;
    type Iter<'a>
        = std::collections::vec_deque::Iter<'a, E>
    where
        Self: 'a;

    fn push(&mut self, item: E) {
        self.push_back(item);
    }

    fn iter(&self) -> Self::Iter<'_> {
        VecDeque::iter(self)
    }

    fn drain_all(&mut self) -> Vec<E> {
        self.drain(..).collect()
    }

    fn len(&self) -> usize {
        VecDeque::len(self)
    }
}

impl<A: smallvec::Array> SlotContainer for SmallVec<A> {
    type Item = A::Item;
    type Iter<'a>
        = std::slice::Iter<'a, A::Item>
    where
        Self: 'a;

    fn push(&mut self, item: A::Item) {
        SmallVec::push(self, item);
    }

    fn iter(&self) -> Self::Iter<'_> {
        self.as_slice().iter()
    }

    fn drain_all(&mut self) -> Vec<A::Item> {
        self.drain(..).collect()
    }

    fn len(&self) -> usize {
        SmallVec::len(self)
    }
}

/// Flat array of `2^resolution` slot containers addressed by geohash bits.
///
/// # Examples
///
/// ```
/// use geoprox::{GeoHash, PrecisionIndex};
///
/// let mut index: PrecisionIndex<Vec<&str>> = PrecisionIndex::new(3, Vec::new)?;
/// let hash = GeoHash::parse("110")?;
/// index.slot_at_mut(&hash)?.push("kirkland");
///
/// assert_eq!(index.slot_index(&hash, 2)?, 0b110);
/// assert_eq!(index.range_of_prefix(&hash, 1)?, 4..8);
/// assert_eq!(index.slots_in_range(&hash, 2)?.len(), 2);
/// # Ok::<(), geoprox::GeoproxError>(())
/// ```
#[derive(Debug, Clone)]
pub struct PrecisionIndex<C> {
    resolution: usize,
    slots: Vec<C>,
}

impl<C: SlotContainer> PrecisionIndex<C> {
    /// Allocate `2^resolution` empty containers built by `factory`.
    ///
    /// Fails with [`GeoproxError::InvalidResolution`] when the resolution is
    /// above [`MAX_RESOLUTION`], when `2^resolution` does not fit in `usize`,
    /// or when the slot array cannot be allocated.
    pub fn new(resolution: usize, factory: impl Fn() -> C) -> Result<Self> {
        let invalid = || GeoproxError::InvalidResolution {
            resolution,
            max: MAX_RESOLUTION.min(usize::BITS as usize - 1),
        };
        if resolution > MAX_RESOLUTION {
            return Err(invalid());
        }

        let capacity = u32::try_from(resolution)
            .ok()
            .and_then(|shift| 1usize.checked_shl(shift))
            .ok_or_else(invalid)?;
        let mut slots = Vec::new();
        slots.try_reserve_exact(capacity).map_err(|err| {
            log::warn!("Cannot allocate {} slots for resolution {}: {}", capacity, resolution, err);
            invalid()
        })?;
        slots.resize_with(capacity, factory);

        Ok(Self { resolution, slots })
    }

    pub fn resolution(&self) -> usize {
        self.resolution
    }

    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Slot number of `geohash` truncated to `precision` bits and padded
    /// with zeros up to the resolution.
    pub fn slot_index(&self, geohash: &GeoHash, precision: usize) -> Result<usize> {
        GeoproxError::check_precision(precision, self.resolution)?;
        if geohash.bits_of_precision() < precision {
            return Err(GeoproxError::InvalidGeohash(format!(
                "hash has {} bits, {} requested",
                geohash.bits_of_precision(),
                precision
            )));
        }

        let prefix = geohash.prefix(precision)?.as_u64();
        Ok((prefix << (self.resolution - precision)) as usize)
    }

    /// Half-open slot range holding every address that shares the first
    /// `precision` bits of `geohash`.
    pub fn range_of_prefix(&self, geohash: &GeoHash, precision: usize) -> Result<Range<usize>> {
        let start = self.slot_index(geohash, precision)?;
        Ok(start..start + (1usize << (self.resolution - precision)))
    }

    pub fn slot_at(&self, geohash: &GeoHash) -> Result<&C> {
        let index = self.slot_index(geohash, self.resolution)?;
        Ok(&self.slots[index])
    }

    pub fn slot_at_mut(&mut self, geohash: &GeoHash) -> Result<&mut C> {
        let index = self.slot_index(geohash, self.resolution)?;
        Ok(&mut self.slots[index])
    }

    pub fn slots_in_range(&self, geohash: &GeoHash, precision: usize) -> Result<&[C]> {
        let range = self.range_of_prefix(geohash, precision)?;
        Ok(&self.slots[range])
    }

    pub fn slots_in_range_mut(&mut self, geohash: &GeoHash, precision: usize) -> Result<&mut [C]> {
        let range = self.range_of_prefix(geohash, precision)?;
        Ok(&mut self.slots[range])
    }

    /// Every slot in address order.
    pub fn slots(&self) -> &[C] {
        &self.slots
    }

    pub fn slots_mut(&mut self) -> &mut [C] {
        &mut self.slots
    }

    pub fn occupied_slots(&self) -> usize {
        self.slots.iter().filter(|slot| !slot.is_empty()).count()
    }
}
