//! Persistent inverted text index.
//!
//! Documents (usually image files run through OCR) are keyed by a stable id.
//! Their text is normalized into terms, each term maps to the set of
//! documents containing it, and lookups intersect those sets.

pub mod config;
pub mod error;
pub mod index;
pub mod ingest;
pub mod persist;
pub mod store;
pub mod tokenizer;

pub use config::{AnalyzerSettings, IndexConfig, StemmerKind, StopwordSet};
pub use error::{IndexError, StoreError};
pub use index::{Hit, Index, MemoryIndex, SledIndex};
pub use ingest::{
    ingest, ingest_one, DocumentSource, ExtractError, Extraction, Extractor, IngestReport, Outcome,
};
pub use persist::{open_index, open_index_at, IndexMeta};
pub use store::{DocState, DocumentStore, PostingStore, StoredDocument};
pub use tokenizer::{Normalizer, NormalizerConfig};
