//! In-process document store.
//!
//! Documents live in hash maps keyed by [`DocId`]; every index is a
//! `BTreeSet<IndexKey>`. A transaction holds the store mutex for its whole
//! lifetime, so transactions are serialized and each one observes a stable
//! view. Writes apply in place and are recorded in an undo log; rollback
//! (explicit or on drop) replays the log backwards.

use std::collections::BTreeSet;

use entgraph_common::types::{DocId, Document, Fields, Timestamp};
use entgraph_common::utils::error::StorageError;
use entgraph_common::utils::hash::FastHashMap;
use parking_lot::{Mutex, MutexGuard};

use super::index::{IndexKey, IndexScan, Order, TableLayout};
use super::traits::{DocumentStore, ScanIter, StoreTransaction};

/// A table's documents and index contents.
struct TableData {
    layout: TableLayout,
    docs: FastHashMap<DocId, Document>,
    indexes: FastHashMap<String, BTreeSet<IndexKey>>,
}

impl TableData {
    fn new(layout: TableLayout) -> Self {
        let indexes = layout
            .indexes
            .iter()
            .map(|def| (def.name.clone(), BTreeSet::new()))
            .collect();
        Self {
            layout,
            docs: FastHashMap::default(),
            indexes,
        }
    }

    fn index_doc(&mut self, doc: &Document) {
        for def in &self.layout.indexes {
            if let Some(set) = self.indexes.get_mut(&def.name) {
                set.insert(IndexKey::for_document(&def.fields, doc));
            }
        }
    }

    fn unindex_doc(&mut self, doc: &Document) {
        for def in &self.layout.indexes {
            if let Some(set) = self.indexes.get_mut(&def.name) {
                set.remove(&IndexKey::for_document(&def.fields, doc));
            }
        }
    }

    /// Stores `doc`, replacing any previous version.
    fn put(&mut self, doc: Document) {
        if let Some(prev) = self.docs.remove(&doc.id) {
            self.unindex_doc(&prev);
        }
        self.index_doc(&doc);
        self.docs.insert(doc.id, doc);
    }

    fn remove(&mut self, id: DocId) -> Option<Document> {
        let prev = self.docs.remove(&id)?;
        self.unindex_doc(&prev);
        Some(prev)
    }

    /// Adds indexes present in `layout` but not yet built.
    fn extend_layout(&mut self, layout: &TableLayout) {
        for def in &layout.indexes {
            if self.layout.index(&def.name).is_some() {
                continue;
            }
            let set = self
                .docs
                .values()
                .map(|doc| IndexKey::for_document(&def.fields, doc))
                .collect();
            self.indexes.insert(def.name.clone(), set);
            self.layout.indexes.push(def.clone());
        }
    }
}

#[derive(Default)]
struct StoreState {
    tables: FastHashMap<String, TableData>,
    next_id: u64,
    last_timestamp: Timestamp,
}

impl StoreState {
    /// Returns a timestamp strictly greater than any handed out before.
    fn tick(&mut self) -> Timestamp {
        let ts = Timestamp::now().max(self.last_timestamp.next());
        self.last_timestamp = ts;
        ts
    }

    fn table(&self, name: &str) -> Result<&TableData, StorageError> {
        self.tables
            .get(name)
            .ok_or_else(|| StorageError::TableNotFound(name.to_string()))
    }

    fn table_mut(&mut self, name: &str) -> Result<&mut TableData, StorageError> {
        self.tables
            .get_mut(name)
            .ok_or_else(|| StorageError::TableNotFound(name.to_string()))
    }
}

/// The in-process document store.
pub struct MemoryStore {
    state: Mutex<StoreState>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(StoreState::default()),
        }
    }

    /// Returns the number of documents physically present in `table`.
    ///
    /// Blocks while a transaction is open.
    #[must_use]
    pub fn document_count(&self, table: &str) -> usize {
        self.state
            .lock()
            .tables
            .get(table)
            .map_or(0, |t| t.docs.len())
    }

    /// Returns the names of all defined tables.
    #[must_use]
    pub fn table_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.state.lock().tables.keys().cloned().collect();
        names.sort();
        names
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentStore for MemoryStore {
    fn define_table(&self, layout: &TableLayout) -> Result<(), StorageError> {
        let mut state = self.state.lock();
        match state.tables.get_mut(&layout.name) {
            Some(existing) => existing.extend_layout(layout),
            None => {
                state
                    .tables
                    .insert(layout.name.clone(), TableData::new(layout.clone()));
            }
        }
        Ok(())
    }

    fn begin(&self) -> Result<Box<dyn StoreTransaction + '_>, StorageError> {
        let mut state = self.state.lock();
        let timestamp = state.tick();
        Ok(Box::new(MemoryTransaction {
            state,
            timestamp,
            undo: Vec::new(),
            finished: false,
        }))
    }
}

enum Undo {
    Insert { table: String, id: DocId },
    Restore { table: String, prev: Document },
}

/// A transaction over a [`MemoryStore`].
pub struct MemoryTransaction<'a> {
    state: MutexGuard<'a, StoreState>,
    timestamp: Timestamp,
    undo: Vec<Undo>,
    finished: bool,
}

impl MemoryTransaction<'_> {
    fn undo_all(&mut self) {
        while let Some(entry) = self.undo.pop() {
            match entry {
                Undo::Insert { table, id } => {
                    if let Some(data) = self.state.tables.get_mut(&table) {
                        data.remove(id);
                    }
                }
                Undo::Restore { table, prev } => {
                    if let Some(data) = self.state.tables.get_mut(&table) {
                        data.put(prev);
                    }
                }
            }
        }
    }

    fn existing(&self, table: &str, id: DocId) -> Result<Document, StorageError> {
        self.state
            .table(table)?
            .docs
            .get(&id)
            .cloned()
            .ok_or_else(|| StorageError::DocumentNotFound {
                table: table.to_string(),
                id,
            })
    }
}

impl StoreTransaction for MemoryTransaction<'_> {
    fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    fn get(&self, table: &str, id: DocId) -> Result<Option<Document>, StorageError> {
        Ok(self.state.table(table)?.docs.get(&id).cloned())
    }

    fn insert(&mut self, table: &str, fields: Fields) -> Result<DocId, StorageError> {
        self.state.table(table)?;
        let id = DocId::new(self.state.next_id);
        self.state.next_id += 1;
        let creation_time = self.state.tick();
        self.state
            .table_mut(table)?
            .put(Document::new(id, creation_time, fields));
        self.undo.push(Undo::Insert {
            table: table.to_string(),
            id,
        });
        Ok(id)
    }

    fn patch(
        &mut self,
        table: &str,
        id: DocId,
        set: Fields,
        unset: &[String],
    ) -> Result<(), StorageError> {
        let prev = self.existing(table, id)?;
        let mut next = prev.clone();
        for field in unset {
            next.fields.remove(field);
        }
        next.fields.extend(set);
        self.state.table_mut(table)?.put(next);
        self.undo.push(Undo::Restore {
            table: table.to_string(),
            prev,
        });
        Ok(())
    }

    fn replace(&mut self, table: &str, id: DocId, fields: Fields) -> Result<(), StorageError> {
        let prev = self.existing(table, id)?;
        let next = Document::new(id, prev.creation_time, fields);
        self.state.table_mut(table)?.put(next);
        self.undo.push(Undo::Restore {
            table: table.to_string(),
            prev,
        });
        Ok(())
    }

    fn delete(&mut self, table: &str, id: DocId) -> Result<(), StorageError> {
        let prev = self
            .state
            .table_mut(table)?
            .remove(id)
            .ok_or_else(|| StorageError::DocumentNotFound {
                table: table.to_string(),
                id,
            })?;
        self.undo.push(Undo::Restore {
            table: table.to_string(),
            prev,
        });
        Ok(())
    }

    fn scan(&self, table: &str, scan: &IndexScan) -> Result<ScanIter<'_>, StorageError> {
        let data = self.state.table(table)?;
        let index = data
            .indexes
            .get(&scan.index)
            .ok_or_else(|| StorageError::IndexNotFound {
                table: table.to_string(),
                index: scan.index.clone(),
            })?;
        let docs = &data.docs;

        let keys: Box<dyn Iterator<Item = &IndexKey> + '_> = match scan.order {
            Order::Asc => Box::new(index.range(IndexKey::lower_bound(scan.range.prefix())..)),
            Order::Desc => Box::new(index.iter().rev()),
        };

        // The accepted keys form one contiguous run in scan order.
        let before = scan.clone();
        let within = scan.clone();
        Ok(Box::new(
            keys.skip_while(move |key| !before.accepts(key))
                .take_while(move |key| within.accepts(key))
                .filter_map(move |key| docs.get(&key.id).map(|doc| (key.clone(), doc.clone()))),
        ))
    }

    fn commit(mut self: Box<Self>) -> Result<(), StorageError> {
        self.finished = true;
        self.undo.clear();
        Ok(())
    }

    fn rollback(mut self: Box<Self>) {
        self.undo_all();
        self.finished = true;
    }
}

impl Drop for MemoryTransaction<'_> {
    fn drop(&mut self) {
        if !self.finished {
            self.undo_all();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::index::{CREATION_INDEX, IndexDef, IndexRange};
    use entgraph_common::types::Value;
    use proptest::prelude::*;

    fn store_with_users() -> MemoryStore {
        let store = MemoryStore::new();
        let mut layout = TableLayout::new("users");
        layout.add_index(IndexDef::new("by_age", ["age"]));
        store.define_table(&layout).unwrap();
        store
    }

    fn fields(pairs: &[(&str, Value)]) -> Fields {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_insert_get_commit() {
        let store = store_with_users();
        let mut tx = store.begin().unwrap();
        let id = tx
            .insert("users", fields(&[("name", Value::from("Alice"))]))
            .unwrap();
        let doc = tx.get("users", id).unwrap().unwrap();
        assert_eq!(doc.get("name"), Some(Value::from("Alice")));
        assert!(doc.creation_time > tx.timestamp());
        tx.commit().unwrap();

        assert_eq!(store.document_count("users"), 1);
    }

    #[test]
    fn test_drop_rolls_back() {
        let store = store_with_users();
        {
            let mut tx = store.begin().unwrap();
            tx.insert("users", Fields::new()).unwrap();
        }
        assert_eq!(store.document_count("users"), 0);
    }

    #[test]
    fn test_rollback_restores_patch_and_delete() {
        let store = store_with_users();
        let mut tx = store.begin().unwrap();
        let a = tx.insert("users", fields(&[("age", Value::Int64(1))])).unwrap();
        let b = tx.insert("users", fields(&[("age", Value::Int64(2))])).unwrap();
        tx.commit().unwrap();

        let mut tx = store.begin().unwrap();
        tx.patch("users", a, fields(&[("age", Value::Int64(10))]), &[])
            .unwrap();
        tx.delete("users", b).unwrap();
        tx.rollback();

        let tx = store.begin().unwrap();
        assert_eq!(
            tx.get("users", a).unwrap().unwrap().get("age"),
            Some(Value::Int64(1))
        );
        assert!(tx.get("users", b).unwrap().is_some());
        let ages: Vec<_> = tx
            .scan("users", &IndexScan::new("by_age"))
            .unwrap()
            .map(|(k, _)| k.values[0].clone())
            .collect();
        assert_eq!(ages, vec![Value::Int64(1), Value::Int64(2)]);
    }

    #[test]
    fn test_patch_unset_and_replace() {
        let store = store_with_users();
        let mut tx = store.begin().unwrap();
        let id = tx
            .insert(
                "users",
                fields(&[("a", Value::Int64(1)), ("b", Value::Int64(2))]),
            )
            .unwrap();
        let created = tx.get("users", id).unwrap().unwrap().creation_time;

        tx.patch("users", id, fields(&[("c", Value::Int64(3))]), &["a".to_string()])
            .unwrap();
        let doc = tx.get("users", id).unwrap().unwrap();
        assert!(doc.field("a").is_none());
        assert_eq!(doc.field("b"), Some(&Value::Int64(2)));
        assert_eq!(doc.field("c"), Some(&Value::Int64(3)));

        tx.replace("users", id, fields(&[("z", Value::Bool(true))]))
            .unwrap();
        let doc = tx.get("users", id).unwrap().unwrap();
        assert_eq!(doc.fields.len(), 1);
        assert_eq!(doc.creation_time, created);
    }

    #[test]
    fn test_missing_table_and_document() {
        let store = store_with_users();
        let mut tx = store.begin().unwrap();
        assert!(matches!(
            tx.get("nope", DocId::new(0)),
            Err(StorageError::TableNotFound(_))
        ));
        assert!(matches!(
            tx.delete("users", DocId::new(99)),
            Err(StorageError::DocumentNotFound { .. })
        ));
        assert!(matches!(
            tx.scan("users", &IndexScan::new("missing")).map(|_| ()),
            Err(StorageError::IndexNotFound { .. })
        ));
    }

    #[test]
    fn test_scan_creation_order_desc() {
        let store = store_with_users();
        let mut tx = store.begin().unwrap();
        let ids: Vec<_> = (0..3)
            .map(|_| tx.insert("users", Fields::new()).unwrap())
            .collect();
        let scanned: Vec<_> = tx
            .scan("users", &IndexScan::new(CREATION_INDEX).order(Order::Desc))
            .unwrap()
            .map(|(_, d)| d.id)
            .collect();
        assert_eq!(scanned, ids.into_iter().rev().collect::<Vec<_>>());
    }

    #[test]
    fn test_define_table_backfills_new_index() {
        let store = store_with_users();
        let mut tx = store.begin().unwrap();
        tx.insert("users", fields(&[("name", Value::from("x"))]))
            .unwrap();
        tx.commit().unwrap();

        let mut layout = TableLayout::new("users");
        layout.add_index(IndexDef::new("by_name", ["name"]));
        store.define_table(&layout).unwrap();

        let tx = store.begin().unwrap();
        let scan = IndexScan::new("by_name").range(IndexRange::all().eq("x"));
        assert_eq!(tx.scan("users", &scan).unwrap().count(), 1);
    }

    proptest! {
        #[test]
        fn prop_scan_matches_naive_filter(
            ages in prop::collection::vec(0i64..8, 0..40),
            lo in 0i64..8,
            width in 0i64..5,
            desc in any::<bool>(),
        ) {
            let store = store_with_users();
            let mut tx = store.begin().unwrap();
            for age in &ages {
                tx.insert("users", fields(&[("age", Value::Int64(*age))])).unwrap();
            }
            let order = if desc { Order::Desc } else { Order::Asc };
            let range = IndexRange::all().gte(lo).lt(lo + width);
            let scan = IndexScan::new("by_age").range(range).order(order);

            let got: Vec<IndexKey> = tx.scan("users", &scan).unwrap().map(|(k, _)| k).collect();

            let mut expected: Vec<IndexKey> = tx
                .scan("users", &IndexScan::new("by_age"))
                .unwrap()
                .map(|(k, _)| k)
                .filter(|k| {
                    let age = k.values[0].as_int64().unwrap();
                    age >= lo && age < lo + width
                })
                .collect();
            if desc {
                expected.reverse();
            }
            prop_assert_eq!(got, expected);
        }
    }
}
