use thiserror::Error;

/// Failures of the backing key-value stores.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A write-once key was written a second time.
    #[error("document {0} already has an entry")]
    AlreadyExists(String),
    #[error("store unavailable: {0}")]
    Unavailable(#[from] sled::Error),
    #[error("corrupt store value: {0}")]
    Codec(#[from] bincode::Error),
}

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("document {0} is already indexed")]
    AlreadyIndexed(String),
    #[error("inconsistent index: term {term:?} lists document {doc_id} which has no stored text")]
    InconsistentIndex { term: String, doc_id: String },
    #[error("index was built with analyzer {stored}, but {configured} is configured")]
    AnalyzerMismatch { stored: String, configured: String },
    #[error("unreadable index metadata: {0}")]
    Meta(#[from] serde_json::Error),
    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for IndexError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::AlreadyExists(id) => IndexError::AlreadyIndexed(id),
            other => IndexError::Store(other),
        }
    }
}

impl From<sled::Error> for IndexError {
    fn from(err: sled::Error) -> Self { IndexError::Store(StoreError::Unavailable(err)) }
}

impl IndexError {
    /// Whether the error means "someone already handled this document".
    pub fn is_already_indexed(&self) -> bool { matches!(self, IndexError::AlreadyIndexed(_)) }
}
