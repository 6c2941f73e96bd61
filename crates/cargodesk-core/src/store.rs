//! Storage traits and per-file outcome types.
//!
//! [`IngestStore`] is the write side used by the batch driver; every method
//! is one transaction. [`ReportStore`] is the read-only side used by the
//! reporting API. Both are implemented by storage backends (e.g.
//! `cargodesk-store-sqlite`); higher layers depend only on these traits.

use std::future::Future;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::{
  declaration::DeclarationBatch,
  feed::FeedRow,
  manifest::{DocumentType, ParsedManifest},
  reference::{ReferenceKind, ReferenceRecord},
  report::{
    DeclarationQuery, DeclarationReport, HsCodeSuggestion, ImporterSuggestion,
    ManifestDetails, ManifestQuery, ManifestSearchRow, VesselSuggestion,
  },
};

// ─── Outcomes ────────────────────────────────────────────────────────────────

/// Result of loading one declaration file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeclarationOutcome {
  pub inserted:   u64,
  /// Records whose `(crn, boe_no)` was already stored.
  pub duplicates: u64,
}

/// Result of applying one manifest file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestOutcome {
  pub crn:           String,
  pub document_type: DocumentType,
  /// BL versions written by this document.
  pub bls_written:   u64,
  /// BLs left alone (already received, or a document type that writes none).
  pub bls_skipped:   u64,
  pub containers:    u64,
  pub vehicles:      u64,
}

/// Result of streaming one header-feed file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedOutcome {
  pub loaded:  u64,
  /// Rows with fewer values than a complete row.
  pub dropped: u64,
}

/// Result of bulk-loading one reference file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceOutcome {
  pub inserted:   u64,
  pub duplicates: u64,
}

// ─── Ingestion log ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IngestKind {
  Declarations,
  Manifest,
  HeaderFeed,
  Reference,
}

impl IngestKind {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Declarations => "declarations",
      Self::Manifest => "manifest",
      Self::HeaderFeed => "header_feed",
      Self::Reference => "reference",
    }
  }
}

/// Audit record for one attempted file. Written after the file's own
/// transaction has settled; it never influences ingestion decisions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestLogEntry {
  pub kind:         IngestKind,
  pub file_name:    String,
  /// Hex SHA-256 of the file content.
  pub sha256:       String,
  pub succeeded:    bool,
  pub rows_written: u64,
  pub message:      Option<String>,
  pub recorded_at:  NaiveDateTime,
}

// ─── Traits ──────────────────────────────────────────────────────────────────

/// Errors from a store, classified for the reporting API.
pub trait StoreError: std::error::Error + Send + Sync + 'static {
  /// True when the store itself cannot be reached (as opposed to a failure
  /// while processing one request).
  fn is_unavailable(&self) -> bool;
}

/// Write side of the store. Every method commits all of its writes or none.
pub trait IngestStore: Send + Sync {
  type Error: StoreError;

  /// Insert every declaration whose `(crn, boe_no)` is not yet stored.
  /// Existing declarations are never modified.
  fn ingest_declarations(
    &self,
    batch: DeclarationBatch,
  ) -> impl Future<Output = Result<DeclarationOutcome, Self::Error>> + Send + '_;

  /// Apply one manifest: merge its header, version its BLs according to the
  /// document type, and replace the children of every BL version written.
  fn ingest_manifest(
    &self,
    manifest: ParsedManifest,
  ) -> impl Future<Output = Result<ManifestOutcome, Self::Error>> + Send + '_;

  /// Consume a feed row iterator inside one transaction. An `Err` item
  /// aborts the load and rolls back everything loaded from it.
  /// `progress_every` sets how many rows pass between progress log lines.
  fn load_header_feed<I>(
    &self,
    rows: I,
    progress_every: usize,
  ) -> impl Future<Output = Result<FeedOutcome, Self::Error>> + Send + '_
  where
    I: Iterator<Item = crate::Result<FeedRow>> + Send + 'static;

  /// Append reference rows; rows whose code already exists are left as is.
  fn load_reference(
    &self,
    kind: ReferenceKind,
    records: Vec<ReferenceRecord>,
  ) -> impl Future<Output = Result<ReferenceOutcome, Self::Error>> + Send + '_;

  /// Append an entry to the ingestion log.
  fn record_ingest(
    &self,
    entry: IngestLogEntry,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;
}

/// Read-only side of the store, used by the reporting API.
pub trait ReportStore: Send + Sync {
  type Error: StoreError;

  /// Cheap round trip used by the health check.
  fn ping(&self) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn declaration_report<'a>(
    &'a self,
    query: &'a DeclarationQuery,
  ) -> impl Future<Output = Result<DeclarationReport, Self::Error>> + Send + 'a;

  fn manifest_search<'a>(
    &'a self,
    query: &'a ManifestQuery,
  ) -> impl Future<Output = Result<Vec<ManifestSearchRow>, Self::Error>> + Send + 'a;

  fn manifest_details(
    &self,
    bl_number: String,
    bl_version_no: i64,
  ) -> impl Future<Output = Result<ManifestDetails, Self::Error>> + Send + '_;

  /// Distinct HS codes across declaration line items starting with `prefix`.
  fn hscode_suggestions(
    &self,
    prefix: String,
  ) -> impl Future<Output = Result<Vec<HsCodeSuggestion>, Self::Error>> + Send + '_;

  /// Distinct vessel names starting with `prefix`.
  fn vessel_suggestions(
    &self,
    prefix: String,
  ) -> impl Future<Output = Result<Vec<VesselSuggestion>, Self::Error>> + Send + '_;

  /// Distinct importer names containing `keyword`.
  fn importer_suggestions(
    &self,
    keyword: String,
  ) -> impl Future<Output = Result<Vec<ImporterSuggestion>, Self::Error>> + Send + '_;
}
