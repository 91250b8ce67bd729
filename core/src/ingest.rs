//! Resumable ingestion: feed every not-yet-processed document through an
//! extractor into the index.

use crate::error::IndexError;
use crate::index::Index;
use crate::store::{DocumentStore, PostingStore};
use rayon::prelude::*;
use serde::Serialize;
use thiserror::Error;

/// Result of a successful extraction call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    /// Detected text, in the order the extractor reported it.
    Fragments(Vec<String>),
    /// The extractor ran and found no text.
    Empty,
}

impl Extraction {
    /// Fragments joined into one document; `None` when there is no usable text.
    pub fn into_text(self) -> Option<String> {
        match self {
            Extraction::Fragments(fragments) => {
                let text = fragments.join("\n");
                if text.trim().is_empty() { None } else { Some(text) }
            }
            Extraction::Empty => None,
        }
    }
}

/// A failed extraction. Always treated as transient: the document is left
/// unprocessed and retried on the next run.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("could not read document: {0}")]
    Read(#[from] std::io::Error),
    #[error("extraction failed: {0}")]
    Failed(#[from] anyhow::Error),
}

/// Turns document bytes into text.
pub trait Extractor: Send + Sync {
    fn extract(&self, bytes: &[u8]) -> Result<Extraction, ExtractError>;
}

/// Supplies the bytes of a document by id.
pub trait DocumentSource: Send + Sync {
    fn read(&self, doc_id: &str) -> std::io::Result<Vec<u8>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Indexed,
    Empty,
    Skipped,
    Failed,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub indexed: usize,
    pub empty: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl IngestReport {
    fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Indexed => self.indexed += 1,
            Outcome::Empty => self.empty += 1,
            Outcome::Skipped => self.skipped += 1,
            Outcome::Failed => self.failed += 1,
        }
    }

    pub fn total(&self) -> usize { self.indexed + self.empty + self.skipped + self.failed }
}

/// Process one document. Only already-indexed races are folded into
/// `Skipped`; every other failure leaves the document unprocessed.
pub fn ingest_one<D, P, S, E>(
    index: &Index<D, P>,
    doc_id: &str,
    source: &S,
    extractor: &E,
) -> Outcome
where
    D: DocumentStore,
    P: PostingStore,
    S: DocumentSource + ?Sized,
    E: Extractor + ?Sized,
{
    match index.is_processed(doc_id) {
        Ok(true) => {
            tracing::debug!(doc_id, "already added to index");
            return Outcome::Skipped;
        }
        Ok(false) => {}
        Err(error) => {
            tracing::warn!(doc_id, %error, "could not check document state");
            return Outcome::Failed;
        }
    }

    let extracted = source
        .read(doc_id)
        .map_err(ExtractError::from)
        .and_then(|bytes| extractor.extract(&bytes));
    let result = match extracted {
        Ok(extraction) => match extraction.into_text() {
            Some(text) => index.add(doc_id, &text).map(|_| Outcome::Indexed),
            None => {
                tracing::info!(doc_id, "had no discernible text");
                index.mark_empty(doc_id).map(|_| Outcome::Empty)
            }
        },
        Err(error) => {
            tracing::warn!(doc_id, %error, "text extraction failed, will retry on next run");
            return Outcome::Failed;
        }
    };

    match result {
        Ok(outcome) => outcome,
        Err(IndexError::AlreadyIndexed(_)) => {
            tracing::debug!(doc_id, "indexed concurrently, skipping");
            Outcome::Skipped
        }
        Err(error) => {
            tracing::warn!(doc_id, %error, "could not store document");
            Outcome::Failed
        }
    }
}

/// Run every id through [`ingest_one`] on `jobs` worker threads, then flush.
///
/// Failures stay per document; the only error returned is a failed pool
/// setup or final flush.
pub fn ingest<D, P, S, E>(
    index: &Index<D, P>,
    doc_ids: &[String],
    source: &S,
    extractor: &E,
    jobs: usize,
) -> Result<IngestReport, IndexError>
where
    D: DocumentStore,
    P: PostingStore,
    S: DocumentSource + ?Sized,
    E: Extractor + ?Sized,
{
    let pool = rayon::ThreadPoolBuilder::new().num_threads(jobs.max(1)).build();
    let outcomes: Vec<Outcome> = match pool {
        Ok(pool) => pool.install(|| {
            doc_ids
                .par_iter()
                .map(|id| ingest_one(index, id, source, extractor))
                .collect()
        }),
        Err(error) => {
            tracing::warn!(%error, "could not start worker pool, ingesting sequentially");
            doc_ids.iter().map(|id| ingest_one(index, id, source, extractor)).collect()
        }
    };

    let mut report = IngestReport::default();
    for outcome in outcomes {
        report.record(outcome);
    }
    index.flush()?;
    tracing::info!(
        indexed = report.indexed,
        empty = report.empty,
        skipped = report.skipped,
        failed = report.failed,
        "ingestion finished"
    );
    Ok(report)
}
