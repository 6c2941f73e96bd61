//! SQLite backend for cargodesk.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Implements both the ingestion side
//! ([`cargodesk_core::store::IngestStore`]) and the reporting side
//! ([`cargodesk_core::store::ReportStore`]).

mod encode;
mod manifest;
mod report;
mod schema;
mod store;

pub mod error;
pub mod filter;

pub use error::{Error, Result};
pub use store::SqliteStore;
