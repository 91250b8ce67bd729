use crate::tokenizer::{
    english_stem, english_stopwords, tokenize, Normalizer, NormalizerConfig, StemmerFn,
};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StemmerKind {
    #[default]
    English,
    None,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StopwordSet {
    #[default]
    English,
    None,
    Custom(Vec<String>),
}

/// Serializable description of a [`Normalizer`]. Stored alongside the index
/// so that queries are analyzed the same way documents were.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerSettings {
    pub stemmer: StemmerKind,
    pub stopwords: StopwordSet,
}

impl AnalyzerSettings {
    pub fn build(&self) -> Normalizer {
        let stemmer: Option<StemmerFn> = match self.stemmer {
            StemmerKind::English => Some(Arc::new(english_stem)),
            StemmerKind::None => None,
        };
        let stopwords = match &self.stopwords {
            StopwordSet::English => english_stopwords(),
            StopwordSet::None => Default::default(),
            StopwordSet::Custom(words) => words.iter().cloned().collect(),
        };
        Normalizer::new(NormalizerConfig { tokenizer: Arc::new(tokenize), stemmer, stopwords })
    }
}

impl fmt::Display for AnalyzerSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stopwords = match &self.stopwords {
            StopwordSet::English => "english".to_string(),
            StopwordSet::None => "none".to_string(),
            StopwordSet::Custom(words) => format!("custom({})", words.len()),
        };
        write!(f, "stemmer={:?} stopwords={}", self.stemmer, stopwords)
    }
}

fn default_db_path() -> PathBuf { PathBuf::from("./textindex.db") }
fn default_jobs() -> usize { 1 }

/// Settings shared by the command-line tool and the server, read from a JSON
/// file. Missing fields take their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexConfig {
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,
    #[serde(default)]
    pub analyzer: AnalyzerSettings,
    /// Worker threads used for ingestion.
    #[serde(default = "default_jobs")]
    pub jobs: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            analyzer: AnalyzerSettings::default(),
            jobs: default_jobs(),
        }
    }
}

impl IndexConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config = serde_json::from_str(&raw)
            .with_context(|| format!("parsing config {}", path.display()))?;
        Ok(config)
    }

    /// The file's settings when a path is given, defaults otherwise.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::from_file(p),
            None => Ok(Self::default()),
        }
    }
}
