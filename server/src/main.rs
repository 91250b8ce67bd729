use anyhow::Result;
use axum::Router;
use clap::Parser;
use server::build_app;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use textindex_core::{open_index, IndexConfig};
use tokio::net::TcpListener;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
struct Args {
    /// JSON config file
    #[arg(long, env = "TEXTINDEX_CONFIG")]
    config: Option<PathBuf>,
    /// Index database directory (overrides the config file)
    #[arg(long, env = "TEXTINDEX_DB")]
    db: Option<PathBuf>,
    /// Host to bind
    #[arg(long, default_value = "0.0.0.0")]
    host: String,
    /// Port to bind
    #[arg(long, default_value_t = 8080)]
    port: u16,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Args::parse();
    let mut config = IndexConfig::load(args.config.as_deref())?;
    if let Some(db) = args.db {
        config.db_path = db;
    }
    let index = Arc::new(open_index(&config)?);
    let app: Router = build_app(index);

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "server listening");
    axum::serve(listener, app).await?;
    Ok(())
}
