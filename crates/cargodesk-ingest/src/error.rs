//! Error type for `cargodesk-ingest`.

use std::path::PathBuf;

use cargodesk_core::store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("{}: {source}", path.display())]
  Io {
    path:   PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("parse error: {0}")]
  Parse(#[from] cargodesk_parse::Error),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("configuration error: {0}")]
  Config(#[from] config::ConfigError),

  /// The file parsed but cannot be accepted as a whole.
  #[error("rejected: {0}")]
  Rejected(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
  pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
    let path = path.into();
    move |source| Error::Io { path, source }
  }

  pub(crate) fn store(e: impl StoreError) -> Self { Error::Store(Box::new(e)) }
}
