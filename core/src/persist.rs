use crate::config::{AnalyzerSettings, IndexConfig};
use crate::error::{IndexError, StoreError};
use crate::index::SledIndex;
use crate::store::{SledDocumentStore, SledPostingStore};
use serde::{Deserialize, Serialize};
use std::path::Path;

const META_KEY: &[u8] = b"meta";
pub const META_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexMeta {
    pub version: u32,
    pub created_at: String,
    pub analyzer: AnalyzerSettings,
}

impl IndexMeta {
    pub fn new(analyzer: AnalyzerSettings) -> Self {
        let created_at = time::OffsetDateTime::now_utc()
            .format(&time::format_description::well_known::Rfc3339)
            .unwrap_or_default();
        Self { version: META_VERSION, created_at, analyzer }
    }
}

pub fn load_meta(db: &sled::Db) -> Result<Option<IndexMeta>, IndexError> {
    match db.get(META_KEY)? {
        Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        None => Ok(None),
    }
}

/// Write metadata for a fresh database, or check that an existing one was
/// built with the same analyzer.
pub fn ensure_meta(db: &sled::Db, analyzer: &AnalyzerSettings) -> Result<IndexMeta, IndexError> {
    if let Some(meta) = load_meta(db)? {
        if &meta.analyzer != analyzer {
            return Err(IndexError::AnalyzerMismatch {
                stored: meta.analyzer.to_string(),
                configured: analyzer.to_string(),
            });
        }
        return Ok(meta);
    }
    let meta = IndexMeta::new(analyzer.clone());
    let json = serde_json::to_vec_pretty(&meta)?;
    // Another opener may have raced us; theirs wins if so.
    if db.compare_and_swap(META_KEY, None::<&[u8]>, Some(json))?.is_err() {
        return ensure_meta(db, analyzer);
    }
    Ok(meta)
}

/// Open (or create) the sled-backed index at `path`. Failing here means the
/// store is unreachable and nothing can be indexed or queried.
pub fn open_index_at(path: &Path, analyzer: &AnalyzerSettings) -> Result<SledIndex, IndexError> {
    let db = sled::open(path).map_err(StoreError::Unavailable)?;
    open_index_in(&db, analyzer)
}

pub fn open_index_in(db: &sled::Db, analyzer: &AnalyzerSettings) -> Result<SledIndex, IndexError> {
    let meta = ensure_meta(db, analyzer)?;
    tracing::info!(
        version = meta.version,
        created_at = %meta.created_at,
        analyzer = %meta.analyzer,
        "index opened"
    );
    let documents = SledDocumentStore::open(db)?;
    let postings = SledPostingStore::open(db)?;
    Ok(SledIndex::new(analyzer.build(), documents, postings))
}

pub fn open_index(config: &IndexConfig) -> Result<SledIndex, IndexError> {
    open_index_at(&config.db_path, &config.analyzer)
}
