//! cargodesk-server binary.
//!
//! Reads `cargodesk.toml` (or the path given with `--config`), opens the
//! SQLite store written by `cargodesk-ingest`, and serves the reporting API.
//!
//! # Adding users
//!
//! Generate the argon2 PHC string for a `[[users]]` entry in the credential
//! file with:
//!
//! ```
//! cargo run -p cargodesk-api --bin cargodesk-server -- --hash-password
//! ```

use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::Context as _;
use argon2::{Argon2, PasswordHasher, password_hash::SaltString};
use cargodesk_api::{
  AppState, ServerConfig,
  auth::{Credentials, SessionStore},
};
use cargodesk_store_sqlite::SqliteStore;
use clap::Parser;
use rand_core::OsRng;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "cargodesk reporting API")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "cargodesk.toml")]
  config: PathBuf,

  /// Print the argon2 hash for a password entered on stdin and exit.
  #[arg(long)]
  hash_password: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  if cli.hash_password {
    let password = read_password()?;
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
      .hash_password(password.as_bytes(), &salt)
      .map_err(|e| anyhow::anyhow!("argon2 error: {e}"))?
      .to_string();
    println!("{hash}");
    return Ok(());
  }

  let cfg = ServerConfig::load(&cli.config).context("failed to load configuration")?;

  let store = SqliteStore::open(&cfg.store_path)
    .await
    .with_context(|| format!("failed to open store at {:?}", cfg.store_path))?;

  let credentials = Credentials::load(&cfg.credentials_path).with_context(|| {
    format!("failed to read credential file {:?}", cfg.credentials_path)
  })?;
  if credentials.is_empty() {
    tracing::warn!(path = ?cfg.credentials_path, "no users configured; every login will fail");
  }

  let state = AppState {
    store:       Arc::new(store),
    credentials: Arc::new(credentials),
    sessions:    Arc::new(SessionStore::new(Duration::from_secs(cfg.session_ttl_secs))),
  };

  let app = cargodesk_api::router(state).layer(TraceLayer::new_for_http());
  let address = format!("{}:{}", cfg.host, cfg.port);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

/// Read a password from stdin.
fn read_password() -> anyhow::Result<String> {
  use std::io::{self, BufRead, Write};
  print!("Password: ");
  io::stdout().flush().ok();
  let mut line = String::new();
  io::stdin().lock().read_line(&mut line)?;
  Ok(line.trim_end_matches(['\n', '\r']).to_owned())
}
