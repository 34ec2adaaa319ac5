//! Append-only operation log used to rebuild past database states.

use crate::types::Position;
use serde::{Deserialize, Serialize};

/// A logged mutation and the input it was applied with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Operation<T> {
    Insert { position: Position, data: T },
    Delete { position: Position, precision: usize },
}

impl<T> Operation<T> {
    pub fn position(&self) -> &Position {
        match self {
            Self::Insert { position, .. } | Self::Delete { position, .. } => position,
        }
    }

    pub fn is_insert(&self) -> bool {
        matches!(self, Self::Insert { .. })
    }
}

/// One log record. Sequence numbers start at 1 and increase by one per
/// mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpRecord<T> {
    pub seq: u64,
    pub op: Operation<T>,
}

/// Append-only sequence of [`OpRecord`]s. Never pruned or rewritten.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationLog<T> {
    records: Vec<OpRecord<T>>,
}

impl<T> OperationLog<T> {
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
        }
    }

    /// Append `op` with the next sequence number and return that number.
    pub fn append(&mut self, op: Operation<T>) -> u64 {
        let seq = self.records.len() as u64 + 1;
        self.records.push(OpRecord { seq, op });
        seq
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Sequence number of the latest record, 0 when empty.
    pub fn last_seq(&self) -> u64 {
        self.records.last().map_or(0, |record| record.seq)
    }

    pub fn records(&self) -> &[OpRecord<T>] {
        &self.records
    }

    /// The first `count` records, or `None` if the log is shorter.
    pub fn first(&self, count: usize) -> Option<&[OpRecord<T>]> {
        self.records.get(..count)
    }

    /// Records with `from <= seq <= to`.
    pub fn records_between(&self, from: u64, to: u64) -> &[OpRecord<T>] {
        if from > to || self.records.is_empty() {
            return &[];
        }
        let start = from.saturating_sub(1).min(self.records.len() as u64) as usize;
        let end = to.min(self.records.len() as u64) as usize;
        &self.records[start..end.max(start)]
    }

    /// Records whose operation targeted exactly `position`.
    pub fn records_for(&self, position: Position) -> impl Iterator<Item = &OpRecord<T>> + '_ {
        self.records
            .iter()
            .filter(move |record| *record.op.position() == position)
    }
}

impl<T> Default for OperationLog<T> {
    fn default() -> Self {
        Self::new()
    }
}
