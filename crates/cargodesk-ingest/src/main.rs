//! `cargodesk-ingest`: batch loader for customs and manifest documents.
//!
//! ```
//! cargodesk-ingest --config cargodesk.toml manifests
//! cargodesk-ingest reference --kind ports data/reference/ports.json
//! ```

use std::{path::PathBuf, process::ExitCode};

use anyhow::Context as _;
use cargodesk_core::reference::ReferenceKind;
use cargodesk_ingest::{IngestConfig, Ingestor, RunSummary};
use cargodesk_store_sqlite::SqliteStore;
use clap::{Parser, Subcommand};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "cargodesk batch ingestion")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "cargodesk.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Ingest customs declaration (BOE) JSON files.
  Declarations,
  /// Ingest manifest XML files, base documents first.
  Manifests,
  /// Stream header-feed XML exports into the flat feed table.
  HeaderFeed,
  /// Bulk-load one reference-data JSON file.
  Reference {
    #[arg(long)]
    kind: ReferenceKind,
    file: PathBuf,
  },
  /// Declarations, then manifests, then the header feed.
  All,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let cfg = IngestConfig::load(&cli.config).context("failed to load configuration")?;
  let store = SqliteStore::open(&cfg.store_path)
    .await
    .with_context(|| format!("failed to open store at {:?}", cfg.store_path))?;
  let ingestor = Ingestor::new(store);

  let summaries: Vec<RunSummary> = match cli.command {
    Command::Declarations => vec![ingestor.declarations(&cfg.declarations).await?],
    Command::Manifests => vec![ingestor.manifests(&cfg.manifests).await?],
    Command::HeaderFeed => vec![ingestor.header_feed(&cfg.header_feed).await?],
    Command::Reference { kind, file } => vec![ingestor.reference(kind, &file).await],
    Command::All => vec![
      ingestor.declarations(&cfg.declarations).await?,
      ingestor.manifests(&cfg.manifests).await?,
      ingestor.header_feed(&cfg.header_feed).await?,
    ],
  };

  for summary in &summaries {
    println!("{summary}");
  }

  if summaries.iter().any(|s| s.failed > 0) {
    Ok(ExitCode::FAILURE)
  } else {
    Ok(ExitCode::SUCCESS)
  }
}
