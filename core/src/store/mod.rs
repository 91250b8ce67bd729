//! The two storage roles behind the [`Index`](crate::Index).
//!
//! Only the index writes to these stores; writing to them directly can break
//! the rule that a posting lists a document exactly when its stored text
//! contains the term.

pub mod memory;
pub mod sled_store;

use crate::error::StoreError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

pub use self::memory::{MemoryDocumentStore, MemoryPostingStore};
pub use self::sled_store::{SledDocumentStore, SledPostingStore};

/// What the document store holds for one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StoredDocument {
    Text(String),
    /// Processed, but no text could be extracted.
    NoText,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DocState {
    Unprocessed,
    ProcessedWithText,
    ProcessedNoText,
}

impl From<Option<&StoredDocument>> for DocState {
    fn from(doc: Option<&StoredDocument>) -> Self {
        match doc {
            None => DocState::Unprocessed,
            Some(StoredDocument::Text(_)) => DocState::ProcessedWithText,
            Some(StoredDocument::NoText) => DocState::ProcessedNoText,
        }
    }
}

/// Document id → extracted text, written at most once per id.
pub trait DocumentStore: Send + Sync {
    fn get(&self, doc_id: &str) -> Result<Option<StoredDocument>, StoreError>;

    /// Store `doc` unless `doc_id` already has an entry, in which case
    /// `AlreadyExists` is returned and nothing changes.
    fn put_once(&self, doc_id: &str, doc: StoredDocument) -> Result<(), StoreError>;

    fn flush(&self) -> Result<(), StoreError> { Ok(()) }

    fn is_processed(&self, doc_id: &str) -> Result<bool, StoreError> {
        Ok(self.get(doc_id)?.is_some())
    }

    /// Stored text; an empty string for documents recorded without text.
    fn get_text(&self, doc_id: &str) -> Result<Option<String>, StoreError> {
        Ok(self.get(doc_id)?.map(|doc| match doc {
            StoredDocument::Text(text) => text,
            StoredDocument::NoText => String::new(),
        }))
    }

    fn state(&self, doc_id: &str) -> Result<DocState, StoreError> {
        Ok(DocState::from(self.get(doc_id)?.as_ref()))
    }

    fn record_text(&self, doc_id: &str, text: &str) -> Result<(), StoreError> {
        self.put_once(doc_id, StoredDocument::Text(text.to_string()))
    }

    fn record_no_text(&self, doc_id: &str) -> Result<(), StoreError> {
        self.put_once(doc_id, StoredDocument::NoText)
    }
}

/// Term → set of document ids. Grows only.
pub trait PostingStore: Send + Sync {
    /// Idempotent.
    fn add_member(&self, term: &str, doc_id: &str) -> Result<(), StoreError>;

    /// Empty when the term has never been seen.
    fn members(&self, term: &str) -> Result<BTreeSet<String>, StoreError>;

    fn add_to_all<'a, I>(&self, terms: I, doc_id: &str) -> Result<(), StoreError>
    where
        I: IntoIterator<Item = &'a str>,
        Self: Sized,
    {
        for term in terms {
            self.add_member(term, doc_id)?;
        }
        Ok(())
    }

    fn flush(&self) -> Result<(), StoreError> { Ok(()) }
}
