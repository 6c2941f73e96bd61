//! Error types for `cargodesk-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// The document as a whole could not be read (bad XML/JSON structure).
  #[error("malformed document: {0}")]
  MalformedDocument(String),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
