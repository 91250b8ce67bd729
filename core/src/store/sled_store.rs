use super::{DocumentStore, PostingStore, StoredDocument};
use crate::error::StoreError;
use sled::{Batch, Tree};
use std::collections::BTreeSet;

pub const DOCUMENTS_TREE: &str = "documents";
pub const POSTINGS_TREE: &str = "postings";

/// Document store over a sled tree: id bytes → bincode `StoredDocument`.
#[derive(Clone)]
pub struct SledDocumentStore {
    tree: Tree,
}

impl SledDocumentStore {
    pub fn new(tree: Tree) -> Self { Self { tree } }

    pub fn open(db: &sled::Db) -> Result<Self, StoreError> {
        Ok(Self::new(db.open_tree(DOCUMENTS_TREE)?))
    }
}

impl DocumentStore for SledDocumentStore {
    fn get(&self, doc_id: &str) -> Result<Option<StoredDocument>, StoreError> {
        match self.tree.get(doc_id.as_bytes())? {
            Some(bytes) => Ok(Some(bincode::deserialize(&bytes)?)),
            None => Ok(None),
        }
    }

    fn put_once(&self, doc_id: &str, doc: StoredDocument) -> Result<(), StoreError> {
        let bytes = bincode::serialize(&doc)?;
        match self.tree.compare_and_swap(doc_id.as_bytes(), None::<&[u8]>, Some(bytes))? {
            Ok(()) => Ok(()),
            Err(_) => Err(StoreError::AlreadyExists(doc_id.to_string())),
        }
    }

    fn is_processed(&self, doc_id: &str) -> Result<bool, StoreError> {
        Ok(self.tree.contains_key(doc_id.as_bytes())?)
    }

    fn flush(&self) -> Result<(), StoreError> {
        self.tree.flush()?;
        Ok(())
    }
}

/// Posting store over a sled tree. Each (term, doc) pair is one key with an
/// empty value, so adding a member twice rewrites the same key.
#[derive(Clone)]
pub struct SledPostingStore {
    tree: Tree,
}

/// `len(term)` as u32 BE, then the term. Length-prefixing keeps "cat" from
/// matching the prefix scan of "cats".
fn term_prefix(term: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(4 + term.len());
    key.extend_from_slice(&(term.len() as u32).to_be_bytes());
    key.extend_from_slice(term.as_bytes());
    key
}

fn member_key(term: &str, doc_id: &str) -> Vec<u8> {
    let mut key = term_prefix(term);
    key.extend_from_slice(doc_id.as_bytes());
    key
}

impl SledPostingStore {
    pub fn new(tree: Tree) -> Self { Self { tree } }

    pub fn open(db: &sled::Db) -> Result<Self, StoreError> {
        Ok(Self::new(db.open_tree(POSTINGS_TREE)?))
    }
}

impl PostingStore for SledPostingStore {
    fn add_member(&self, term: &str, doc_id: &str) -> Result<(), StoreError> {
        self.tree.insert(member_key(term, doc_id), Vec::new())?;
        Ok(())
    }

    fn members(&self, term: &str) -> Result<BTreeSet<String>, StoreError> {
        let prefix = term_prefix(term);
        let mut out = BTreeSet::new();
        for entry in self.tree.scan_prefix(&prefix) {
            let (key, _) = entry?;
            out.insert(String::from_utf8_lossy(&key[prefix.len()..]).into_owned());
        }
        Ok(out)
    }

    /// All members go in one atomic batch.
    fn add_to_all<'a, I>(&self, terms: I, doc_id: &str) -> Result<(), StoreError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut batch = Batch::default();
        for term in terms {
            batch.insert(member_key(term, doc_id), Vec::new());
        }
        self.tree.apply_batch(batch)?;
        Ok(())
    }

    fn flush(&self) -> Result<(), StoreError> {
        self.tree.flush()?;
        Ok(())
    }
}
