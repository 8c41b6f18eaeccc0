//! Storage abstractions for the apnea pipeline.
//!
//! The core algorithms are storage-agnostic: segmentation writes epochs
//! through an [`EpochStore`], batch inference appends to an [`AlertLog`],
//! and any backing store (per-epoch files, embedded DB, in-memory fixture)
//! can implement these traits.

use crate::error::StorageError;
use crate::types::{AlertRecord, Epoch};

/// Ordered, index-addressable storage for segmented epochs.
///
/// Indices are 1-based and assigned in signal order by the segmenter;
/// `indices()` returns them ascending so batch consumers can iterate the
/// recording deterministically.
pub trait EpochStore: Send + Sync {
    /// Retrieve epoch `index` (1-based).
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::EpochNotFound`] when no epoch with that
    /// index exists, or an I/O error from the backing store.
    fn get(&self, index: u64) -> Result<Epoch, StorageError>;

    /// All stored epoch indices, ascending.
    fn indices(&self) -> Vec<u64>;

    /// Number of stored epochs.
    fn len(&self) -> usize;

    /// Whether the store holds no epochs.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Append-only log of per-epoch classification records.
pub trait AlertLog: Send + Sync {
    /// Append one classified-epoch record.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store rejects the write.
    fn append(&mut self, record: AlertRecord) -> Result<(), StorageError>;

    /// The last `n` records in append order (oldest of the `n` first).
    ///
    /// Returns fewer than `n` when the log is shorter.
    fn tail(&self, n: usize) -> Vec<AlertRecord>;

    /// Number of records in the log.
    fn len(&self) -> usize;

    /// Whether the log is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
