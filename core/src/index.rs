use crate::error::IndexError;
use crate::store::{
    DocState, DocumentStore, MemoryDocumentStore, MemoryPostingStore, PostingStore,
    SledDocumentStore, SledPostingStore, StoredDocument,
};
use crate::tokenizer::Normalizer;
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::{BTreeSet, HashSet};

pub type SledIndex = Index<SledDocumentStore, SledPostingStore>;
pub type MemoryIndex = Index<MemoryDocumentStore, MemoryPostingStore>;

/// One lookup result.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Hit {
    pub doc_id: String,
    pub text: String,
}

/// Inverted index over a document store and a posting store.
///
/// A document goes from unprocessed to either indexed (`add`) or
/// indexed-without-text (`mark_empty`), and never back.
pub struct Index<D, P> {
    normalizer: Normalizer,
    documents: D,
    postings: P,
    in_flight: Mutex<HashSet<String>>,
}

/// Exclusive right to write one document; released on drop.
struct Claim<'a> {
    in_flight: &'a Mutex<HashSet<String>>,
    doc_id: &'a str,
}

impl Drop for Claim<'_> {
    fn drop(&mut self) {
        self.in_flight.lock().remove(self.doc_id);
    }
}

impl MemoryIndex {
    pub fn in_memory(normalizer: Normalizer) -> Self {
        Self::new(normalizer, MemoryDocumentStore::new(), MemoryPostingStore::new())
    }
}

impl<D: DocumentStore, P: PostingStore> Index<D, P> {
    pub fn new(normalizer: Normalizer, documents: D, postings: P) -> Self {
        Self { normalizer, documents, postings, in_flight: Mutex::new(HashSet::new()) }
    }

    pub fn normalizer(&self) -> &Normalizer { &self.normalizer }

    /// Read access to the stores. Writing through these bypasses the index
    /// and can leave postings and documents out of step.
    pub fn documents(&self) -> &D { &self.documents }

    pub fn postings(&self) -> &P { &self.postings }

    fn claim<'a>(&'a self, doc_id: &'a str) -> Result<Claim<'a>, IndexError> {
        if !self.in_flight.lock().insert(doc_id.to_string()) {
            return Err(IndexError::AlreadyIndexed(doc_id.to_string()));
        }
        let claim = Claim { in_flight: &self.in_flight, doc_id };
        if self.documents.is_processed(doc_id)? {
            return Err(IndexError::AlreadyIndexed(doc_id.to_string()));
        }
        Ok(claim)
    }

    pub fn is_processed(&self, doc_id: &str) -> Result<bool, IndexError> {
        Ok(self.documents.is_processed(doc_id)?)
    }

    pub fn state(&self, doc_id: &str) -> Result<DocState, IndexError> {
        Ok(self.documents.state(doc_id)?)
    }

    /// Index `text` under `doc_id`. Postings are written before the text, so
    /// a document only counts as processed once all of its terms are in.
    pub fn add(&self, doc_id: &str, text: &str) -> Result<(), IndexError> {
        let _claim = self.claim(doc_id)?;
        let terms: BTreeSet<String> = self.normalizer.normalize(text).into_iter().collect();
        self.postings.add_to_all(terms.iter().map(String::as_str), doc_id)?;
        self.documents.record_text(doc_id, text)?;
        tracing::debug!(doc_id, terms = terms.len(), "document indexed");
        Ok(())
    }

    /// Record that `doc_id` was processed and has no text.
    pub fn mark_empty(&self, doc_id: &str) -> Result<(), IndexError> {
        let _claim = self.claim(doc_id)?;
        self.documents.record_no_text(doc_id)?;
        tracing::debug!(doc_id, "document marked empty");
        Ok(())
    }

    /// Documents containing every query word.
    ///
    /// Each word contributes its first normalized term; words that normalize
    /// to nothing (stopwords, punctuation) add no constraint. A query with no
    /// terms at all matches nothing.
    pub fn lookup<S: AsRef<str>>(&self, words: &[S]) -> Result<BTreeSet<Hit>, IndexError> {
        let terms: Vec<String> = words
            .iter()
            .filter_map(|w| self.normalizer.normalize_term(w.as_ref()))
            .collect();

        // `None` until the first term has been looked up; an empty set after
        // that is a real, empty intersection.
        let mut matched: Option<BTreeSet<String>> = None;
        for term in &terms {
            let members = self.postings.members(term)?;
            let next = match matched {
                None => members,
                Some(prev) => prev.intersection(&members).cloned().collect(),
            };
            let exhausted = next.is_empty();
            matched = Some(next);
            if exhausted { break; }
        }

        let Some(doc_ids) = matched else { return Ok(BTreeSet::new()) };
        let mut hits = BTreeSet::new();
        for doc_id in doc_ids {
            // Checked before the read: a claim covers every posting write up to
            // the text write, so a document missing here and not pending now was
            // never going to arrive.
            let pending = self.in_flight.lock().contains(&doc_id);
            match self.documents.get(&doc_id)? {
                Some(StoredDocument::Text(text)) => {
                    hits.insert(Hit { doc_id, text });
                }
                None if pending => continue,
                _ => {
                    return Err(IndexError::InconsistentIndex { term: terms[0].clone(), doc_id });
                }
            }
        }
        Ok(hits)
    }

    pub fn flush(&self) -> Result<(), IndexError> {
        self.postings.flush()?;
        self.documents.flush()?;
        Ok(())
    }
}
