//! Error types for the cargodesk document parsers.
//!
//! Only document-level problems are errors. A bad field degrades to a default
//! and a bad record is skipped; neither ever reaches this type.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("malformed XML: {0}")]
  Xml(String),

  #[error("malformed JSON: {0}")]
  Json(#[from] serde_json::Error),

  #[error("unexpected document structure: {0}")]
  Structure(String),

  #[error("io error: {0}")]
  Io(#[from] std::io::Error),
}

impl From<quick_xml::Error> for Error {
  fn from(e: quick_xml::Error) -> Self { Error::Xml(e.to_string()) }
}

impl From<Error> for cargodesk_core::Error {
  fn from(e: Error) -> Self { cargodesk_core::Error::MalformedDocument(e.to_string()) }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
