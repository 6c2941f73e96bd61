//! Batch ingestion for cargodesk.
//!
//! Picks up declaration, manifest and header-feed files from their input
//! directories, loads each one through an [`IngestStore`] in its own
//! transaction, and moves it to a processed or error directory.
//!
//! [`IngestStore`]: cargodesk_core::store::IngestStore

pub mod config;
pub mod discover;
pub mod driver;
pub mod error;

pub use config::IngestConfig;
pub use driver::{Ingestor, RunSummary};
pub use error::{Error, Result};
