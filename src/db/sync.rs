//! Thread-safe wrapper for sharing one [`StreamDB`] between threads.
//!
//! `SyncStreamDB` keeps the store behind `Arc<RwLock<..>>`. A mutation and
//! its log append happen under a single write lock, so sequence numbers are
//! gap-free and in the order the writes took the lock. Queries share the
//! read lock and return owned data.
//!
//! # Features
//!
//! Enable the `sync` feature to use this module:
//!
//! ```toml
//! [dependencies]
//! geoprox = { version = "0.1", features = ["sync"] }
//! ```
//!
//! # Examples
//!
//! ```rust
//! use geoprox::{AttributeTable, Base32Geohash, Position, SyncStreamDB};
//! use std::thread;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let strategy = AttributeTable::new().with("riders", |n: &u32| Some((*n).into()));
//! let db = SyncStreamDB::new(strategy, Base32Geohash::default(), 16)?;
//!
//! let writer = db.clone();
//! let handle = thread::spawn(move || {
//!     writer.insert(Position::new(40.7128, -74.0060), 12).unwrap();
//! });
//!
//! db.insert(Position::new(40.7130, -74.0062), 30)?;
//! handle.join().unwrap();
//!
//! assert_eq!(db.log_len(), 2);
//! assert_eq!(db.sum_nearby("riders", &Position::new(40.7128, -74.0060), 12)?, Some(42.0));
//! # Ok(())
//! # }
//! ```

use super::StreamDB;
use crate::attributes::{AttributeStrategy, AttributeValue};
use crate::error::Result;
use crate::geohash::GeohashProvider;
use crate::types::{DbStats, Entry, Position};
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::sync::Arc;

/// Thread-safe handle to a [`StreamDB`] using `Arc<RwLock<StreamDB>>`.
///
/// Cloning is cheap and every clone sees the same store. Reads run
/// concurrently; writes take exclusive access.
pub struct SyncStreamDB<T> {
    inner: Arc<RwLock<StreamDB<T>>>,
}

impl<T> Clone for SyncStreamDB<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> From<StreamDB<T>> for SyncStreamDB<T> {
    fn from(db: StreamDB<T>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(db)),
        }
    }
}

impl<T> SyncStreamDB<T> {
    pub fn new<S, P>(strategy: S, provider: P, resolution: usize) -> Result<Self>
    where
        S: AttributeStrategy<T> + 'static,
        P: GeohashProvider + 'static,
    {
        Ok(StreamDB::new(strategy, provider, resolution)?.into())
    }

    /// Run `f` against the store while holding the read lock.
    pub fn with_read<R>(&self, f: impl FnOnce(&StreamDB<T>) -> R) -> R {
        let guard = self.inner.read();
        f(&*guard)
    }

    // ===== Mutations =====

    pub fn insert(&self, position: Position, data: T) -> Result<()>
    where
        T: Clone,
    {
        self.inner.write().insert(position, data)
    }

    pub fn delete(&self, position: &Position) -> Result<Vec<Entry<T>>> {
        self.inner.write().delete(position)
    }

    pub fn delete_within(&self, position: &Position, precision: usize) -> Result<Vec<Entry<T>>> {
        self.inner.write().delete_within(position, precision)
    }

    // ===== Queries =====

    pub fn contains(&self, position: &Position, precision: usize) -> Result<bool> {
        self.inner.read().contains(position, precision)
    }

    /// Cloned entries of the prefix group.
    pub fn nearby(&self, position: &Position, precision: usize) -> Result<Vec<Entry<T>>>
    where
        T: Clone,
    {
        Ok(self
            .inner
            .read()
            .nearby_iter(position, precision)?
            .cloned()
            .collect())
    }

    /// Collected form of [`StreamDB::stream_nearby`].
    pub fn stream_nearby(
        &self,
        attribute: &str,
        position: &Position,
        precision: usize,
    ) -> Result<Vec<AttributeValue>> {
        Ok(self
            .inner
            .read()
            .stream_nearby(attribute, position, precision)?
            .collect())
    }

    pub fn average_nearby(
        &self,
        attribute: &str,
        position: &Position,
        precision: usize,
    ) -> Result<Option<f64>> {
        self.inner
            .read()
            .average_nearby(attribute, position, precision)
    }

    pub fn max_nearby(
        &self,
        attribute: &str,
        position: &Position,
        precision: usize,
    ) -> Result<Option<f64>> {
        self.inner.read().max_nearby(attribute, position, precision)
    }

    pub fn min_nearby(
        &self,
        attribute: &str,
        position: &Position,
        precision: usize,
    ) -> Result<Option<f64>> {
        self.inner.read().min_nearby(attribute, position, precision)
    }

    pub fn sum_nearby(
        &self,
        attribute: &str,
        position: &Position,
        precision: usize,
    ) -> Result<Option<f64>> {
        self.inner.read().sum_nearby(attribute, position, precision)
    }

    pub fn count_nearby(
        &self,
        attribute: &str,
        position: &Position,
        precision: usize,
    ) -> Result<usize> {
        self.inner
            .read()
            .count_nearby(attribute, position, precision)
    }

    pub fn histogram_nearby(
        &self,
        attribute: &str,
        position: &Position,
        precision: usize,
    ) -> Result<FxHashMap<AttributeValue, usize>> {
        self.inner
            .read()
            .histogram_nearby(attribute, position, precision)
    }

    // ===== Snapshots and stats =====

    /// Independent, unshared snapshot after the first `t` mutations.
    pub fn database_state_at_time(&self, t: usize) -> Result<StreamDB<T>>
    where
        T: Clone,
    {
        self.inner.read().database_state_at_time(t)
    }

    pub fn log_len(&self) -> usize {
        self.inner.read().log_len()
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    pub fn resolution(&self) -> usize {
        self.inner.read().resolution()
    }

    pub fn stats(&self) -> DbStats {
        self.inner.read().stats()
    }
}
