//! The document store seam.

use entgraph_common::types::{DocId, Document, Fields, Timestamp};
use entgraph_common::utils::error::StorageError;

use super::index::{IndexKey, IndexScan, TableLayout};

/// Iterator over `(key, document)` pairs produced by an index scan.
pub type ScanIter<'a> = Box<dyn Iterator<Item = (IndexKey, Document)> + 'a>;

/// A transactional document store.
pub trait DocumentStore: Send + Sync {
    /// Registers a table and its indexes. Re-registering an identical
    /// layout is a no-op; new indexes are backfilled.
    fn define_table(&self, layout: &TableLayout) -> Result<(), StorageError>;

    /// Begins a transaction with a serializable view of the store.
    fn begin(&self) -> Result<Box<dyn StoreTransaction + '_>, StorageError>;
}

/// One atomic unit of work against a [`DocumentStore`].
///
/// Writes are visible to later reads of the same transaction. Dropping a
/// transaction without committing rolls it back.
pub trait StoreTransaction {
    /// The transaction's logical time; used for deletion markers.
    fn timestamp(&self) -> Timestamp;

    /// Point read. `None` if the document does not exist in `table`.
    fn get(&self, table: &str, id: DocId) -> Result<Option<Document>, StorageError>;

    /// Inserts a document, assigning its ID and creation time.
    fn insert(&mut self, table: &str, fields: Fields) -> Result<DocId, StorageError>;

    /// Sets `set` and removes `unset`, keeping every other field.
    fn patch(
        &mut self,
        table: &str,
        id: DocId,
        set: Fields,
        unset: &[String],
    ) -> Result<(), StorageError>;

    /// Overwrites all fields; ID and creation time are kept.
    fn replace(&mut self, table: &str, id: DocId, fields: Fields) -> Result<(), StorageError>;

    /// Removes a document.
    fn delete(&mut self, table: &str, id: DocId) -> Result<(), StorageError>;

    /// Scans an index range in order.
    fn scan(&self, table: &str, scan: &IndexScan) -> Result<ScanIter<'_>, StorageError>;

    /// Makes all writes durable and visible to other transactions.
    fn commit(self: Box<Self>) -> Result<(), StorageError>;

    /// Discards all writes.
    fn rollback(self: Box<Self>);
}
