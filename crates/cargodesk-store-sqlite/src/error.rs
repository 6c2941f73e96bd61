//! Error type for `cargodesk-store-sqlite`.

use cargodesk_core::store::StoreError;
use rusqlite::ErrorCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] cargodesk_core::Error),

  #[error("database error: {0}")]
  Database(tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  /// A manifest without a CRN cannot be placed anywhere.
  #[error("manifest header has no CRN")]
  MissingCrn,
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl From<tokio_rusqlite::Error> for Error {
  /// Errors raised inside a connection closure travel as `Other`; unwrap
  /// them back into their own variant.
  fn from(e: tokio_rusqlite::Error) -> Self {
    match e {
      tokio_rusqlite::Error::Other(inner) => match inner.downcast::<Error>() {
        Ok(err) => *err,
        Err(inner) => match inner.downcast::<cargodesk_core::Error>() {
          Ok(err) => Error::Core(*err),
          Err(inner) => Error::Database(tokio_rusqlite::Error::Other(inner)),
        },
      },
      other => Error::Database(other),
    }
  }
}

impl From<rusqlite::Error> for Error {
  fn from(e: rusqlite::Error) -> Self { Error::Database(e.into()) }
}

/// Wrap a crate error for return from inside a connection closure.
pub(crate) fn abort(e: impl Into<Error>) -> tokio_rusqlite::Error {
  tokio_rusqlite::Error::Other(Box::new(e.into()))
}

impl StoreError for Error {
  fn is_unavailable(&self) -> bool {
    match self {
      Error::Database(tokio_rusqlite::Error::ConnectionClosed)
      | Error::Database(tokio_rusqlite::Error::Close(_)) => true,
      Error::Database(tokio_rusqlite::Error::Rusqlite(
        rusqlite::Error::SqliteFailure(e, _),
      )) => matches!(
        e.code,
        ErrorCode::CannotOpen
          | ErrorCode::DatabaseBusy
          | ErrorCode::DatabaseLocked
          | ErrorCode::NotADatabase
      ),
      _ => false,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn closure_errors_keep_their_variant() {
    let err: Error = abort(Error::MissingCrn).into();
    assert!(matches!(err, Error::MissingCrn));

    let err: Error = abort(cargodesk_core::Error::MalformedDocument("x".into())).into();
    assert!(matches!(err, Error::Core(_)));
  }

  #[test]
  fn closed_connection_is_unavailable() {
    let err = Error::Database(tokio_rusqlite::Error::ConnectionClosed);
    assert!(err.is_unavailable());
    assert!(!Error::MissingCrn.is_unavailable());
  }
}
