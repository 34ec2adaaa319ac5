//! Attribute streaming and time travel on top of [`ProximityDB`].

use super::ProximityDB;
use super::history::{OpRecord, Operation, OperationLog};
use crate::attributes::{AttributeStrategy, AttributeValue};
use crate::error::{GeoproxError, Result};
use crate::geohash::GeohashProvider;
use crate::index::{SlotContainer, SlotFactory};
use crate::types::{DbStats, Entry, Position};
use rustc_hash::FxHashMap;
use std::sync::Arc;

/// A [`ProximityDB`] that aggregates attributes over nearby groups and logs
/// every mutation so any past state can be rebuilt.
///
/// Attributes are looked up by name through the [`AttributeStrategy`] the
/// database was built with. Entries that do not carry the requested
/// attribute are skipped; an aggregate over a group where nothing carries
/// it is `None`, not an error.
///
/// Each successful `insert`, `delete` or `delete_within` is appended to the
/// operation log with the next sequence number. [`database_state_at_time`]
/// replays the first `t` records into a fresh database, so snapshots never
/// share state with the live one.
///
/// [`database_state_at_time`]: StreamDB::database_state_at_time
///
/// # Examples
///
/// ```rust
/// use geoprox::{AttributeTable, Base32Geohash, Position, StreamDB};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let strategy = AttributeTable::new().with("sqft", |sqft: &f64| Some((*sqft).into()));
/// let mut db = StreamDB::new(strategy, Base32Geohash::default(), 16)?;
///
/// let here = Position::new(36.1447, -86.8027);
/// db.insert(here, 150_000.0)?;
/// db.insert(Position::new(36.1445, -86.8035), 95_023.4)?;
///
/// assert_eq!(db.max_nearby("sqft", &here, 10)?, Some(150_000.0));
/// assert_eq!(db.average_nearby("height", &here, 10)?, None);
///
/// let before = db.database_state_at_time(1)?;
/// assert_eq!(before.len(), 1);
/// # Ok(())
/// # }
/// ```
pub struct StreamDB<T, C = Vec<Entry<T>>> {
    db: ProximityDB<T, C>,
    strategy: Arc<dyn AttributeStrategy<T>>,
    log: OperationLog<T>,
}

impl<T> StreamDB<T> {
    pub fn new<S, P>(strategy: S, provider: P, resolution: usize) -> Result<Self>
    where
        S: AttributeStrategy<T> + 'static,
        P: GeohashProvider + 'static,
    {
        let db = ProximityDB::new(provider, resolution)?;
        Ok(Self::from_parts(db, Arc::new(strategy)))
    }
}

impl<T, C> StreamDB<T, C>
where
    C: SlotContainer<Item = Entry<T>>,
{
    pub fn with_container<S, P>(
        strategy: S,
        provider: P,
        resolution: usize,
        factory: SlotFactory<C>,
    ) -> Result<Self>
    where
        S: AttributeStrategy<T> + 'static,
        P: GeohashProvider + 'static,
    {
        let db = ProximityDB::with_container(provider, resolution, factory)?;
        Ok(Self::from_parts(db, Arc::new(strategy)))
    }

    /// `db` must be empty: the log has to describe its whole content.
    pub(crate) fn from_parts(db: ProximityDB<T, C>, strategy: Arc<dyn AttributeStrategy<T>>) -> Self {
        debug_assert!(db.is_empty());
        Self {
            db,
            strategy,
            log: OperationLog::new(),
        }
    }

    /// Read-only access to the underlying proximity database.
    pub fn proximity_db(&self) -> &ProximityDB<T, C> {
        &self.db
    }

    pub fn resolution(&self) -> usize {
        self.db.resolution()
    }

    pub fn len(&self) -> usize {
        self.db.len()
    }

    pub fn is_empty(&self) -> bool {
        self.db.is_empty()
    }

    pub fn stats(&self) -> DbStats {
        self.db.stats()
    }

    // ===== Mutations (logged) =====

    /// Store `data` at `position` and log the insert.
    pub fn insert(&mut self, position: Position, data: T) -> Result<()>
    where
        T: Clone,
    {
        self.db.insert(position, data.clone())?;
        let seq = self.log.append(Operation::Insert { position, data });
        log::trace!("Logged insert #{}", seq);
        Ok(())
    }

    /// Remove every entry in `position`'s full-resolution cell and log it.
    pub fn delete(&mut self, position: &Position) -> Result<Vec<Entry<T>>> {
        self.delete_within(position, self.resolution())
    }

    /// Remove the group sharing `precision` bits with `position` and log it.
    pub fn delete_within(&mut self, position: &Position, precision: usize) -> Result<Vec<Entry<T>>> {
        let removed = self.db.delete_within(position, precision)?;
        let seq = self.log.append(Operation::Delete {
            position: *position,
            precision,
        });
        log::trace!("Logged delete #{} ({} entries)", seq, removed.len());
        Ok(removed)
    }

    // ===== Proximity queries =====

    pub fn contains(&self, position: &Position, precision: usize) -> Result<bool> {
        self.db.contains(position, precision)
    }

    pub fn nearby(&self, position: &Position, precision: usize) -> Result<Vec<&Entry<T>>> {
        self.db.nearby(position, precision)
    }

    pub fn nearby_iter(
        &self,
        position: &Position,
        precision: usize,
    ) -> Result<impl Iterator<Item = &Entry<T>>> {
        self.db.nearby_iter(position, precision)
    }

    // ===== Attribute streams and aggregates =====

    /// Lazily yield `attribute` for every nearby entry that carries it.
    ///
    /// The iterator borrows the database and is consumed once; call again to
    /// query again.
    pub fn stream_nearby(
        &self,
        attribute: &str,
        position: &Position,
        precision: usize,
    ) -> Result<impl Iterator<Item = AttributeValue>> {
        let strategy = &self.strategy;
        Ok(self
            .db
            .nearby_iter(position, precision)?
            .filter_map(move |entry| strategy.extract(&entry.data, attribute)))
    }

    fn numeric_nearby(
        &self,
        attribute: &str,
        position: &Position,
        precision: usize,
    ) -> Result<impl Iterator<Item = f64>> {
        Ok(self
            .stream_nearby(attribute, position, precision)?
            .filter_map(|value| value.as_f64()))
    }

    /// Arithmetic mean of the numeric values of `attribute` in the group.
    pub fn average_nearby(
        &self,
        attribute: &str,
        position: &Position,
        precision: usize,
    ) -> Result<Option<f64>> {
        let (sum, count) = self
            .numeric_nearby(attribute, position, precision)?
            .fold((0.0, 0usize), |(sum, count), value| (sum + value, count + 1));

        Ok((count > 0).then(|| sum / count as f64))
    }

    pub fn max_nearby(
        &self,
        attribute: &str,
        position: &Position,
        precision: usize,
    ) -> Result<Option<f64>> {
        Ok(self
            .numeric_nearby(attribute, position, precision)?
            .reduce(f64::max))
    }

    pub fn min_nearby(
        &self,
        attribute: &str,
        position: &Position,
        precision: usize,
    ) -> Result<Option<f64>> {
        Ok(self
            .numeric_nearby(attribute, position, precision)?
            .reduce(f64::min))
    }

    pub fn sum_nearby(
        &self,
        attribute: &str,
        position: &Position,
        precision: usize,
    ) -> Result<Option<f64>> {
        Ok(self
            .numeric_nearby(attribute, position, precision)?
            .reduce(|a, b| a + b))
    }

    /// Number of nearby entries carrying `attribute`.
    pub fn count_nearby(
        &self,
        attribute: &str,
        position: &Position,
        precision: usize,
    ) -> Result<usize> {
        Ok(self.stream_nearby(attribute, position, precision)?.count())
    }

    /// Occurrences of each distinct value of `attribute` in the group.
    /// Buckets use exact equality.
    pub fn histogram_nearby(
        &self,
        attribute: &str,
        position: &Position,
        precision: usize,
    ) -> Result<FxHashMap<AttributeValue, usize>> {
        let mut histogram = FxHashMap::default();
        for value in self.stream_nearby(attribute, position, precision)? {
            *histogram.entry(value).or_insert(0) += 1;
        }
        Ok(histogram)
    }

    // ===== Operation log =====

    pub fn log(&self) -> &OperationLog<T> {
        &self.log
    }

    pub fn log_len(&self) -> usize {
        self.log.len()
    }

    /// Logged operations that targeted exactly `position`.
    pub fn history_for(&self, position: &Position) -> Vec<&OpRecord<T>> {
        self.log.records_for(*position).collect()
    }

    /// Rebuild the database as it was after the first `t` logged mutations.
    ///
    /// The result is a new, independent `StreamDB` whose log holds exactly
    /// those `t` records. `t = 0` gives an empty database and `t` equal to
    /// [`log_len`](Self::log_len) gives a copy of the current content.
    pub fn database_state_at_time(&self, t: usize) -> Result<Self>
    where
        T: Clone,
    {
        let records = self
            .log
            .first(t)
            .ok_or(GeoproxError::SnapshotOutOfRange {
                requested: t,
                available: self.log.len(),
            })?;

        let mut snapshot = Self::from_parts(self.db.empty_like()?, Arc::clone(&self.strategy));
        for record in records {
            snapshot.apply(&record.op)?;
        }

        log::debug!(
            "Replayed {} of {} operations into snapshot ({} entries)",
            t,
            self.log.len(),
            snapshot.len()
        );
        Ok(snapshot)
    }

    fn apply(&mut self, op: &Operation<T>) -> Result<()>
    where
        T: Clone,
    {
        match op {
            Operation::Insert { position, data } => self.insert(*position, data.clone()),
            Operation::Delete {
                position,
                precision,
            } => self.delete_within(position, *precision).map(|_| ()),
        }
    }
}
