use std::path::{Path, PathBuf};
use textindex_core::DocumentSource;
use walkdir::WalkDir;

/// Every regular file under a directory; the document id is the file's path.
pub struct DirectorySource {
    root: PathBuf,
    exclude: Option<PathBuf>,
}

impl DirectorySource {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self { root: root.as_ref().to_path_buf(), exclude: None }
    }

    /// Leave out `path` (typically the index database) if it lies under the root.
    pub fn excluding<P: AsRef<Path>>(mut self, path: P) -> Self {
        if let (Ok(root), Ok(skip)) = (self.root.canonicalize(), path.as_ref().canonicalize()) {
            if let Ok(rel) = skip.strip_prefix(&root) {
                self.exclude = Some(self.root.join(rel));
            }
        }
        self
    }

    /// File paths in walk order. Unreadable entries and paths that are not
    /// valid UTF-8 are logged and skipped.
    pub fn doc_ids(&self) -> Vec<String> {
        let mut ids = Vec::new();
        let walk = WalkDir::new(&self.root).sort_by_file_name().into_iter();
        for entry in walk.filter_entry(|e| Some(e.path()) != self.exclude.as_deref()) {
            let entry = match entry {
                Ok(e) => e,
                Err(error) => {
                    tracing::warn!(%error, "skipping unreadable entry");
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            match entry.path().to_str() {
                Some(id) => ids.push(id.to_string()),
                None => tracing::warn!(path = %entry.path().display(), "skipping non UTF-8 path"),
            }
        }
        ids
    }
}

impl DocumentSource for DirectorySource {
    fn read(&self, doc_id: &str) -> std::io::Result<Vec<u8>> {
        std::fs::read(doc_id)
    }
}
