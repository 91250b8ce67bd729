use super::{DocumentStore, PostingStore, StoredDocument};
use crate::error::StoreError;
use parking_lot::RwLock;
use std::collections::hash_map::Entry;
use std::collections::{BTreeSet, HashMap};

/// Non-durable document store, same write-once contract as the sled one.
#[derive(Default)]
pub struct MemoryDocumentStore {
    docs: RwLock<HashMap<String, StoredDocument>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self { Self::default() }
}

impl DocumentStore for MemoryDocumentStore {
    fn get(&self, doc_id: &str) -> Result<Option<StoredDocument>, StoreError> {
        Ok(self.docs.read().get(doc_id).cloned())
    }

    fn put_once(&self, doc_id: &str, doc: StoredDocument) -> Result<(), StoreError> {
        match self.docs.write().entry(doc_id.to_string()) {
            Entry::Occupied(_) => Err(StoreError::AlreadyExists(doc_id.to_string())),
            Entry::Vacant(slot) => {
                slot.insert(doc);
                Ok(())
            }
        }
    }
}

#[derive(Default)]
pub struct MemoryPostingStore {
    postings: RwLock<HashMap<String, BTreeSet<String>>>,
}

impl MemoryPostingStore {
    pub fn new() -> Self { Self::default() }

    pub fn num_terms(&self) -> usize { self.postings.read().len() }
}

impl PostingStore for MemoryPostingStore {
    fn add_member(&self, term: &str, doc_id: &str) -> Result<(), StoreError> {
        self.postings.write().entry(term.to_string()).or_default().insert(doc_id.to_string());
        Ok(())
    }

    fn members(&self, term: &str) -> Result<BTreeSet<String>, StoreError> {
        Ok(self.postings.read().get(term).cloned().unwrap_or_default())
    }
}
