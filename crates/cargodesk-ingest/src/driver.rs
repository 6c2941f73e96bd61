//! The batch driver: one file at a time, each in its own transaction, each
//! moved aside once its outcome is known.

use std::{
  fmt,
  path::{Path, PathBuf},
};

use cargodesk_core::{
  reference::ReferenceKind,
  store::{IngestKind, IngestLogEntry, IngestStore},
};
use cargodesk_parse::{HeaderFeedReader, parse_declarations, parse_manifest, parse_reference};
use sha2::{Digest, Sha256};
use tracing::Instrument as _;

use crate::{
  Error, Result,
  config::{DirConfig, FeedConfig},
  discover::{discover, file_name, home_documents_first},
};

// ─── Summary ─────────────────────────────────────────────────────────────────

/// Totals for one run over one kind of input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
  pub kind:      IngestKind,
  pub files:     u64,
  pub succeeded: u64,
  pub failed:    u64,
  /// Rows written by the successful files.
  pub rows:      u64,
}

impl RunSummary {
  pub fn new(kind: IngestKind) -> Self {
    Self { kind, files: 0, succeeded: 0, failed: 0, rows: 0 }
  }
}

impl fmt::Display for RunSummary {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(
      f,
      "{}: {} file(s), {} succeeded, {} failed, {} row(s) written",
      self.kind.as_str(),
      self.files,
      self.succeeded,
      self.failed,
      self.rows
    )
  }
}

// ─── Driver ──────────────────────────────────────────────────────────────────

pub struct Ingestor<S> {
  store: S,
}

impl<S: IngestStore> Ingestor<S> {
  pub fn new(store: S) -> Self { Self { store } }

  /// Ingest every declaration file. A file that parses is archived to the
  /// processed directory even when nothing new was inserted.
  pub async fn declarations(&self, dirs: &DirConfig) -> Result<RunSummary> {
    let mut summary = RunSummary::new(IngestKind::Declarations);
    for path in discover(&dirs.input_dir, &dirs.pattern).await? {
      async {
        let result = self.declaration_file(&path).await;
        self.settle(&mut summary, dirs, &path, result).await;
      }
      .instrument(file_span(IngestKind::Declarations, &path))
      .await;
    }
    tracing::info!(%summary, "declaration run finished");
    Ok(summary)
  }

  /// Ingest every manifest file, base documents first.
  pub async fn manifests(&self, dirs: &DirConfig) -> Result<RunSummary> {
    let mut files = discover(&dirs.input_dir, &dirs.pattern).await?;
    home_documents_first(&mut files);

    let mut summary = RunSummary::new(IngestKind::Manifest);
    for path in files {
      async {
        let result = self.manifest_file(&path).await;
        self.settle(&mut summary, dirs, &path, result).await;
      }
      .instrument(file_span(IngestKind::Manifest, &path))
      .await;
    }
    tracing::info!(%summary, "manifest run finished");
    Ok(summary)
  }

  /// Stream every header-feed file into the store.
  pub async fn header_feed(&self, feed: &FeedConfig) -> Result<RunSummary> {
    let dirs = &feed.dirs;
    let mut summary = RunSummary::new(IngestKind::HeaderFeed);
    for path in discover(&dirs.input_dir, &dirs.pattern).await? {
      async {
        let result = self.feed_file(&path, feed.batch_size).await;
        self.settle(&mut summary, dirs, &path, result).await;
      }
      .instrument(file_span(IngestKind::HeaderFeed, &path))
      .await;
    }
    tracing::info!(%summary, "header feed run finished");
    Ok(summary)
  }

  /// Load one reference file. Reference files are left where they are.
  pub async fn reference(&self, kind: ReferenceKind, path: &Path) -> RunSummary {
    let mut summary = RunSummary::new(IngestKind::Reference);
    async {
      let result = self.reference_file(kind, path).await;
      self.conclude(&mut summary, path, result).await;
    }
    .instrument(file_span(IngestKind::Reference, path))
    .await;
    summary
  }

  // ─── Per-file work ─────────────────────────────────────────────────────────

  async fn declaration_file(&self, path: &Path) -> Result<u64> {
    let bytes = tokio::fs::read(path).await.map_err(Error::io(path))?;
    let batch = parse_declarations(&bytes)?;
    let (total, skipped) = (batch.total, batch.skipped);

    let outcome = self.store.ingest_declarations(batch).await.map_err(Error::store)?;
    tracing::info!(
      total,
      skipped,
      inserted = outcome.inserted,
      duplicates = outcome.duplicates,
      "declarations ingested"
    );
    Ok(outcome.inserted)
  }

  async fn manifest_file(&self, path: &Path) -> Result<u64> {
    let bytes = tokio::fs::read(path).await.map_err(Error::io(path))?;
    let manifest = parse_manifest(&bytes)?;
    if manifest.header.crn.is_none() {
      return Err(Error::Rejected("manifest header has no CRN".into()));
    }

    let outcome = self.store.ingest_manifest(manifest).await.map_err(Error::store)?;
    tracing::info!(
      crn = %outcome.crn,
      document_type = %outcome.document_type,
      bls_written = outcome.bls_written,
      bls_skipped = outcome.bls_skipped,
      containers = outcome.containers,
      vehicles = outcome.vehicles,
      "manifest applied"
    );
    Ok(outcome.bls_written)
  }

  async fn feed_file(&self, path: &Path, batch_size: usize) -> Result<u64> {
    let reader = HeaderFeedReader::open(path)?;
    let outcome = self
      .store
      .load_header_feed(reader, batch_size)
      .await
      .map_err(Error::store)?;
    if outcome.loaded + outcome.dropped == 0 {
      return Err(Error::Rejected("feed contains no rows".into()));
    }
    tracing::info!(loaded = outcome.loaded, dropped = outcome.dropped, "header feed loaded");
    Ok(outcome.loaded)
  }

  async fn reference_file(&self, kind: ReferenceKind, path: &Path) -> Result<u64> {
    let bytes = tokio::fs::read(path).await.map_err(Error::io(path))?;
    let batch = parse_reference(kind, &bytes)?;
    let skipped = batch.skipped;

    let outcome = self
      .store
      .load_reference(kind, batch.records)
      .await
      .map_err(Error::store)?;
    tracing::info!(
      %kind,
      inserted = outcome.inserted,
      duplicates = outcome.duplicates,
      skipped,
      "reference data loaded"
    );
    Ok(outcome.inserted)
  }

  // ─── Outcome handling ──────────────────────────────────────────────────────

  /// Count and log the file's outcome, then move it to the processed or
  /// error directory.
  async fn settle(
    &self,
    summary: &mut RunSummary,
    dirs: &DirConfig,
    path: &Path,
    result: Result<u64>,
  ) {
    let succeeded = self.conclude(summary, path, result).await;
    let target = if succeeded { &dirs.processed_dir } else { &dirs.error_dir };
    match relocate(path, target).await {
      Ok(moved) => tracing::debug!(to = %moved.display(), "file moved"),
      Err(e) => tracing::error!(
        critical = true,
        error = %e,
        to = %target.display(),
        "could not move file; it will be picked up again on the next run"
      ),
    }
  }

  /// Count and log the file's outcome. Returns whether it succeeded.
  async fn conclude(&self, summary: &mut RunSummary, path: &Path, result: Result<u64>) -> bool {
    summary.files += 1;
    let (succeeded, rows, message) = match result {
      Ok(rows) => {
        summary.succeeded += 1;
        summary.rows += rows;
        (true, rows, None)
      }
      Err(e) => {
        tracing::error!(error = %e, "file failed");
        summary.failed += 1;
        (false, 0, Some(e.to_string()))
      }
    };
    self.record(summary.kind, path, succeeded, rows, message).await;
    succeeded
  }

  /// Append to the ingestion log. Failures here are logged and otherwise
  /// ignored.
  async fn record(
    &self,
    kind: IngestKind,
    path: &Path,
    succeeded: bool,
    rows_written: u64,
    message: Option<String>,
  ) {
    let sha256 = match file_sha256(path).await {
      Ok(hash) => hash,
      Err(e) => {
        tracing::warn!(error = %e, "could not hash file");
        String::new()
      }
    };
    let entry = IngestLogEntry {
      kind,
      file_name: file_name(path),
      sha256,
      succeeded,
      rows_written,
      message,
      recorded_at: chrono::Utc::now().naive_utc(),
    };
    if let Err(e) = self.store.record_ingest(entry).await {
      tracing::warn!(error = %e, "could not record ingestion log entry");
    }
  }
}

fn file_span(kind: IngestKind, path: &Path) -> tracing::Span {
  tracing::info_span!("ingest_file", kind = kind.as_str(), file = %file_name(path))
}

// ─── Filesystem helpers ──────────────────────────────────────────────────────

/// Move `path` into `dir`, creating it if needed. Falls back to copy and
/// delete when a rename is not possible (e.g. across filesystems).
pub async fn relocate(path: &Path, dir: &Path) -> std::io::Result<PathBuf> {
  tokio::fs::create_dir_all(dir).await?;
  let name = path.file_name().ok_or_else(|| {
    std::io::Error::new(std::io::ErrorKind::InvalidInput, "path has no file name")
  })?;
  let target = dir.join(name);
  if tokio::fs::rename(path, &target).await.is_err() {
    tokio::fs::copy(path, &target).await?;
    tokio::fs::remove_file(path).await?;
  }
  Ok(target)
}

/// Hex SHA-256 of a file's content, read in chunks.
pub async fn file_sha256(path: &Path) -> std::io::Result<String> {
  let path = path.to_owned();
  tokio::task::spawn_blocking(move || -> std::io::Result<String> {
    let mut file = std::fs::File::open(&path)?;
    let mut hasher = Sha256::new();
    std::io::copy(&mut file, &mut hasher)?;
    Ok(hex::encode(hasher.finalize()))
  })
  .await
  .map_err(std::io::Error::other)?
}

#[cfg(test)]
mod tests {
  use cargodesk_core::{report::ManifestQuery, store::ReportStore as _};
  use cargodesk_store_sqlite::SqliteStore;
  use chrono::NaiveDate;
  use serde_json::json;

  use super::*;

  struct Tree {
    _root: tempfile::TempDir,
    dirs:  DirConfig,
  }

  impl Tree {
    fn new(pattern: &str) -> Self {
      let root = tempfile::tempdir().unwrap();
      let dirs = DirConfig {
        input_dir:     root.path().join("inbox"),
        processed_dir: root.path().join("inbox/processed"),
        error_dir:     root.path().join("error"),
        pattern:       pattern.into(),
      };
      std::fs::create_dir_all(&dirs.input_dir).unwrap();
      Self { _root: root, dirs }
    }

    fn put(&self, name: &str, content: impl AsRef<[u8]>) {
      std::fs::write(self.dirs.input_dir.join(name), content).unwrap();
    }

    fn names(dir: &Path) -> Vec<String> {
      let Ok(entries) = std::fs::read_dir(dir) else { return Vec::new() };
      let mut names: Vec<String> = entries
        .map(|e| e.unwrap())
        .filter(|e| e.file_type().unwrap().is_file())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
      names.sort();
      names
    }

    fn inbox(&self) -> Vec<String> { Self::names(&self.dirs.input_dir) }

    fn processed(&self) -> Vec<String> { Self::names(&self.dirs.processed_dir) }

    fn errors(&self) -> Vec<String> { Self::names(&self.dirs.error_dir) }
  }

  async fn ingestor() -> Ingestor<SqliteStore> {
    Ingestor::new(SqliteStore::open_in_memory().await.unwrap())
  }

  fn declarations(records: serde_json::Value) -> Vec<u8> {
    serde_json::to_vec(&json!({"encodingData": {"response": records}})).unwrap()
  }

  fn manifest(crn: &str, doc_type: &str, bl_version: i64, consignee: &str) -> String {
    format!(
      r#"<ManifestDocument>
  <DocumentHeader>
    <DocumentReference>
      <CommonRefNumber>{crn}</CommonRefNumber>
      <DocumentType>{doc_type}</DocumentType>
    </DocumentReference>
  </DocumentHeader>
  <DocumentDetails>
    <ManifestDocDetails>
      <ManifestHeaderDetails>
        <VesselAircraftDetails>
          <RotationNo>R1</RotationNo>
          <VesselName>MSC ALPHA</VesselName>
        </VesselAircraftDetails>
      </ManifestHeaderDetails>
      <ManifestDetails>
        <BillOfLadingDetails>
          <BillOfLading>
            <BLNumber>B1</BLNumber>
            <BLVersionNo>{bl_version}</BLVersionNo>
            <ConsigneeName>{consignee}</ConsigneeName>
            <SubmittedDate>20240305</SubmittedDate>
          </BillOfLading>
        </BillOfLadingDetails>
      </ManifestDetails>
    </ManifestDocDetails>
  </DocumentDetails>
</ManifestDocument>"#
    )
  }

  #[tokio::test]
  async fn declarations_are_archived_or_rejected() {
    let tree = Tree::new("*.json");
    let record = json!({"boeHeader": {"crn": "100", "boeNo": "5", "boeDate": "01/03/2024"}});
    tree.put("a.json", declarations(json!([record.clone(), record])));
    tree.put("b.json", declarations(json!([{"boeHeader": {"boeNo": "9"}}])));
    tree.put("c.json", "{ not json");
    tree.put("readme.txt", "ignored");

    let summary = ingestor().await.declarations(&tree.dirs).await.unwrap();
    assert_eq!(
      (summary.files, summary.succeeded, summary.failed, summary.rows),
      (3, 2, 1, 1)
    );
    assert_eq!(tree.processed(), ["a.json", "b.json"]);
    assert_eq!(tree.errors(), ["c.json"]);
    assert_eq!(tree.inbox(), ["readme.txt"]);
  }

  #[tokio::test]
  async fn manifests_apply_base_before_revision() {
    let tree = Tree::new("*.xml");
    tree.put("C1_AMNDOC.xml", manifest("C1", "AMNDOC", 2, "ACME HOLDINGS"));
    tree.put("C1_HMNDOC.xml", manifest("C1", "HMNDOC", 1, "ACME"));
    tree.put("C2_HMNDOC.xml", manifest("", "HMNDOC", 1, "NOBODY"));
    tree.put("C3_HMNDOC.xml", "<ManifestDocument><DocumentHeader>");

    let ingestor = ingestor().await;
    let summary = ingestor.manifests(&tree.dirs).await.unwrap();
    assert_eq!((summary.succeeded, summary.failed, summary.rows), (2, 2, 2));
    assert_eq!(tree.processed(), ["C1_AMNDOC.xml", "C1_HMNDOC.xml"]);
    assert_eq!(tree.errors(), ["C2_HMNDOC.xml", "C3_HMNDOC.xml"]);

    let ymd = |d| NaiveDate::from_ymd_opt(2024, 3, d).unwrap();
    let rows = ingestor
      .store
      .manifest_search(&ManifestQuery {
        submitted_from: ymd(1),
        submitted_to:   ymd(31),
        crn:            None,
        rotation_no:    None,
        vessel_name:    None,
        agent_name:     None,
        bl_number:      None,
        limit:          10,
      })
      .await
      .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].bill_of_lading.bl_version_no, 2);
    assert_eq!(rows[0].bill_of_lading.consignee_name.as_deref(), Some("ACME HOLDINGS"));
  }

  #[tokio::test]
  async fn feed_without_rows_is_a_failure() {
    let tree = Tree::new("*.xml");
    let cells: String = (0..30).map(|i| format!("<value>{i}</value>")).collect();
    tree.put("good.xml", format!("<dataset><data><row>{cells}</row></data></dataset>"));
    tree.put("empty.xml", "<dataset><data></data></dataset>");

    let feed = FeedConfig { dirs: tree.dirs.clone(), batch_size: 1 };
    let summary = ingestor().await.header_feed(&feed).await.unwrap();
    assert_eq!((summary.succeeded, summary.failed, summary.rows), (1, 1, 1));
    assert_eq!(tree.processed(), ["good.xml"]);
    assert_eq!(tree.errors(), ["empty.xml"]);
  }

  #[tokio::test]
  async fn reference_files_stay_in_place() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ports.json");
    std::fs::write(&path, r#"[{"PortCode": "AEJEA"}, {"PortCode": "CNSHA"}, {}]"#).unwrap();

    let ingestor = ingestor().await;
    let summary = ingestor.reference(ReferenceKind::Ports, &path).await;
    assert_eq!((summary.succeeded, summary.rows), (1, 2));
    assert!(path.exists());

    let again = ingestor.reference(ReferenceKind::Ports, &path).await;
    assert_eq!((again.succeeded, again.rows), (1, 0));

    let missing = ingestor.reference(ReferenceKind::Ports, &dir.path().join("nope.json")).await;
    assert_eq!(missing.failed, 1);
  }

  #[tokio::test]
  async fn sha256_of_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("f");
    std::fs::write(&path, "abc").unwrap();
    assert_eq!(
      file_sha256(&path).await.unwrap(),
      "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
    );
  }
}
