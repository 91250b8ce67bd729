use anyhow::{bail, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::collections::BTreeSet;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use textindex_core::{ingest, open_index, Extractor, Hit, IndexConfig};
use tracing_subscriber::{fmt, EnvFilter};

mod extract;
mod source;

use extract::{TextExtractor, VisionExtractor};
use source::DirectorySource;

#[derive(Parser)]
#[command(name = "textindex")]
#[command(about = "Index the text found in images and look it up by word", long_about = None)]
struct Cli {
    /// JSON config file
    #[arg(long, env = "TEXTINDEX_CONFIG", global = true)]
    config: Option<PathBuf>,
    /// Index database directory (overrides the config file)
    #[arg(long, env = "TEXTINDEX_DB", global = true)]
    db: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum ExtractorKind {
    /// Cloud Vision text detection
    Vision,
    /// Files are plain UTF-8 text
    Text,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract and index the text of every file under a directory
    Index {
        /// Directory to walk
        input: PathBuf,
        #[arg(long, value_enum, default_value_t = ExtractorKind::Vision)]
        extractor: ExtractorKind,
        /// Worker threads (overrides the config file)
        #[arg(long)]
        jobs: Option<usize>,
        /// Vision API key
        #[arg(long, env = "VISION_API_KEY", hide_env_values = true)]
        api_key: Option<String>,
        /// Vision endpoint, for proxies and testing
        #[arg(long)]
        endpoint: Option<String>,
        /// Per-request timeout in seconds
        #[arg(long, default_value_t = 30)]
        timeout_secs: u64,
    },
    /// Print the documents whose text contains all the given words
    Lookup {
        #[arg(required = true)]
        words: Vec<String>,
    },
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    let mut config = IndexConfig::load(cli.config.as_deref())?;
    if let Some(db) = cli.db {
        config.db_path = db;
    }

    match cli.command {
        Commands::Index { input, extractor, jobs, api_key, endpoint, timeout_secs } => {
            if let Some(jobs) = jobs {
                config.jobs = jobs;
            }
            let extractor: Box<dyn Extractor> = match extractor {
                ExtractorKind::Vision => {
                    let Some(key) = api_key else {
                        bail!("--api-key or VISION_API_KEY is required for the vision extractor")
                    };
                    let timeout = Duration::from_secs(timeout_secs);
                    Box::new(VisionExtractor::new(key, endpoint, timeout)?)
                }
                ExtractorKind::Text => Box::new(TextExtractor),
            };
            index_directory(&config, &input, extractor.as_ref())
        }
        Commands::Lookup { words } => print_lookup(&config, &words),
    }
}

fn index_directory(config: &IndexConfig, input: &Path, extractor: &dyn Extractor) -> Result<()> {
    if !input.is_dir() {
        bail!("{} is not a directory", input.display());
    }
    let index = open_index(config)?;
    let source = DirectorySource::new(input).excluding(&config.db_path);
    let doc_ids = source.doc_ids();
    tracing::info!(files = doc_ids.len(), input = %input.display(), "starting ingestion");
    let report = ingest(&index, &doc_ids, &source, extractor, config.jobs)?;
    println!(
        "{} files: indexed {} / no text {} / already done {} / failed {}",
        report.total(),
        report.indexed,
        report.empty,
        report.skipped,
        report.failed
    );
    Ok(())
}

fn print_lookup(config: &IndexConfig, words: &[String]) -> Result<()> {
    let index = open_index(config)?;
    let hits = index.lookup(words)?;
    write_hits(&mut io::stdout().lock(), &hits)?;
    Ok(())
}

fn write_hits<W: Write>(out: &mut W, hits: &BTreeSet<Hit>) -> io::Result<()> {
    if hits.is_empty() {
        return writeln!(out, "No hits found.");
    }
    for hit in hits {
        writeln!(out, "***Image {} has text:\n{}", hit.doc_id, hit.text)?;
    }
    Ok(())
}
