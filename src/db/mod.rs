//! Proximity database built on the precision index.
//!
//! [`ProximityDB`] stores `(position, data)` items in a [`PrecisionIndex`]
//! and answers "what is near this position" at any precision up to its
//! resolution. [`StreamDB`] decorates it with attribute aggregates and an
//! operation log for time travel.

use crate::error::{GeoproxError, Result};
use crate::geohash::{GeoHash, GeohashProvider};
use crate::index::{PrecisionIndex, SlotContainer, SlotFactory};
use crate::types::{DbStats, Entry, Position};
use std::marker::PhantomData;
use std::sync::Arc;

pub mod history;
mod stream;

#[cfg(feature = "sync")]
mod sync;

pub use history::{OpRecord, Operation, OperationLog};
pub use stream::StreamDB;

#[cfg(feature = "sync")]
pub use sync::SyncStreamDB;

/// In-memory proximity database (single writer by design).
///
/// Every item is indexed under the full-resolution geohash of its position.
/// Queries take a precision `k` and match every item whose geohash shares
/// the first `k` bits with the query position's geohash:
///
/// - `k = resolution` matches items in exactly the same cell
/// - smaller `k` widens the group
/// - `k = 0` matches everything
///
/// Items at the same position form a multiset; queries and deletions report
/// them in insertion order. Groups come back in ascending slot order.
///
/// # Thread Safety
///
/// Mutations take `&mut self` and queries `&self`, so the borrow checker
/// enforces a single writer. To share one database between threads, enable
/// the `sync` feature and use [`SyncStreamDB`](crate::SyncStreamDB), or wrap
/// it in your own lock.
///
/// # Examples
///
/// ```rust
/// use geoprox::{Base32Geohash, Position, ProximityDB};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let mut db = ProximityDB::new(Base32Geohash::default(), 16)?;
///
/// db.insert(Position::new(36.1447, -86.8027), "Kirkland Hall")?;
/// db.insert(Position::new(36.1445, -86.8035), "Featheringill Hall")?;
/// db.insert(Position::new(-33.8568, 151.2153), "Sydney Opera House")?;
///
/// let campus = db.nearby(&Position::new(36.1447, -86.8027), 10)?;
/// assert_eq!(campus.len(), 2);
///
/// // Precision 0 matches every slot.
/// assert_eq!(db.nearby(&Position::new(0.0, 0.0), 0)?.len(), 3);
/// # Ok(())
/// # }
/// ```
pub struct ProximityDB<T, C = Vec<Entry<T>>> {
    index: PrecisionIndex<C>,
    provider: Arc<dyn GeohashProvider>,
    factory: SlotFactory<C>,
    len: usize,
    operations: u64,
    _data: PhantomData<T>,
}

impl<T> ProximityDB<T> {
    /// Create a database whose slots are plain vectors.
    pub fn new<P>(provider: P, resolution: usize) -> Result<Self>
    where
        P: GeohashProvider + 'static,
    {
        Self::from_parts(Arc::new(provider), resolution, Vec::new)
    }
}

impl<T, C> ProximityDB<T, C>
where
    C: SlotContainer<Item = Entry<T>>,
{
    /// Create a database with a custom slot container built by `factory`.
    ///
    /// ```rust
    /// use geoprox::{Base32Geohash, Entry, ProximityDB};
    /// use smallvec::SmallVec;
    ///
    /// # fn main() -> Result<(), geoprox::GeoproxError> {
    /// let db: ProximityDB<u32, SmallVec<[Entry<u32>; 2]>> =
    ///     ProximityDB::with_container(Base32Geohash::default(), 12, SmallVec::new)?;
    /// assert_eq!(db.stats().slot_count, 4096);
    /// # Ok(())
    /// # }
    /// ```
    pub fn with_container<P>(
        provider: P,
        resolution: usize,
        factory: SlotFactory<C>,
    ) -> Result<Self>
    where
        P: GeohashProvider + 'static,
    {
        Self::from_parts(Arc::new(provider), resolution, factory)
    }

    pub(crate) fn from_parts(
        provider: Arc<dyn GeohashProvider>,
        resolution: usize,
        factory: SlotFactory<C>,
    ) -> Result<Self> {
        let index = PrecisionIndex::new(resolution, factory)?;
        log::debug!(
            "Allocated precision index with {} slots ({} bits)",
            index.slot_count(),
            resolution
        );

        Ok(Self {
            index,
            provider,
            factory,
            len: 0,
            operations: 0,
            _data: PhantomData,
        })
    }

    /// A new, empty database with the same provider, resolution and slot
    /// container.
    pub fn empty_like(&self) -> Result<Self> {
        Self::from_parts(
            Arc::clone(&self.provider),
            self.resolution(),
            self.factory,
        )
    }

    pub fn resolution(&self) -> usize {
        self.index.resolution()
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Full-resolution geohash of `position`, as entries are indexed.
    pub fn geohash(&self, position: &Position) -> Result<GeoHash> {
        let resolution = self.resolution();
        let hash = self.provider.encode(position, resolution)?;
        if hash.bits_of_precision() < resolution {
            return Err(GeoproxError::InvalidGeohash(format!(
                "provider returned {} bits, index needs {}",
                hash.bits_of_precision(),
                resolution
            )));
        }
        hash.prefix(resolution)
    }

    /// Store `data` at `position`.
    pub fn insert(&mut self, position: Position, data: T) -> Result<()> {
        let geohash = self.geohash(&position)?;
        self.index
            .slot_at_mut(&geohash)?
            .push(Entry::new(geohash, position, data));

        self.len += 1;
        self.operations += 1;
        log::trace!("Inserted entry at {} ({} entries)", geohash, self.len);
        Ok(())
    }

    /// Whether any entry shares the first `precision` bits of `position`.
    pub fn contains(&self, position: &Position, precision: usize) -> Result<bool> {
        GeoproxError::check_precision(precision, self.resolution())?;
        let geohash = self.geohash(position)?;
        Ok(self
            .index
            .slots_in_range(&geohash, precision)?
            .iter()
            .any(|slot| !slot.is_empty()))
    }

    /// Lazy form of [`nearby`](Self::nearby).
    pub fn nearby_iter(
        &self,
        position: &Position,
        precision: usize,
    ) -> Result<impl Iterator<Item = &Entry<T>>> {
        GeoproxError::check_precision(precision, self.resolution())?;
        let geohash = self.geohash(position)?;
        Ok(self
            .index
            .slots_in_range(&geohash, precision)?
            .iter()
            .flat_map(|slot| slot.iter()))
    }

    /// Every entry sharing the first `precision` bits of `position`, in
    /// ascending slot order with insertion order kept inside each slot.
    pub fn nearby(&self, position: &Position, precision: usize) -> Result<Vec<&Entry<T>>> {
        Ok(self.nearby_iter(position, precision)?.collect())
    }

    /// Remove and return every entry stored at exactly `position`'s cell.
    pub fn delete(&mut self, position: &Position) -> Result<Vec<Entry<T>>> {
        self.delete_within(position, self.resolution())
    }

    /// Remove and return the whole group sharing the first `precision` bits
    /// of `position`.
    pub fn delete_within(&mut self, position: &Position, precision: usize) -> Result<Vec<Entry<T>>> {
        GeoproxError::check_precision(precision, self.resolution())?;
        let geohash = self.geohash(position)?;

        let removed: Vec<Entry<T>> = self
            .index
            .slots_in_range_mut(&geohash, precision)?
            .iter_mut()
            .flat_map(|slot| slot.drain_all())
            .collect();

        self.len -= removed.len();
        self.operations += 1;
        log::trace!(
            "Deleted {} entries sharing {} bits with {}",
            removed.len(),
            precision,
            geohash
        );
        Ok(removed)
    }

    /// Every entry in slot order.
    pub fn iter(&self) -> impl Iterator<Item = &Entry<T>> {
        self.index.slots().iter().flat_map(|slot| slot.iter())
    }

    /// Remove every entry.
    pub fn clear(&mut self) {
        for slot in self.index.slots_mut() {
            slot.drain_all();
        }
        self.len = 0;
        self.operations += 1;
    }

    pub fn stats(&self) -> DbStats {
        DbStats {
            entry_count: self.len,
            occupied_slots: self.index.occupied_slots(),
            slot_count: self.index.slot_count(),
            resolution: self.resolution(),
            operations_count: self.operations,
        }
    }
}
