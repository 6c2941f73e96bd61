//! [`SqliteStore`]: the SQLite implementation of [`IngestStore`].

use std::path::Path;

use cargodesk_core::{
  declaration::DeclarationBatch,
  feed::{FeedRow, HeaderFeedRecord},
  manifest::ParsedManifest,
  reference::{ReferenceKind, ReferenceRecord},
  store::{
    DeclarationOutcome, FeedOutcome, IngestLogEntry, IngestStore, ManifestOutcome,
    ReferenceOutcome,
  },
};
use rusqlite::{Statement, params};

use crate::{
  Result,
  encode::{encode_date, encode_ts, now},
  error::abort,
  manifest::apply_manifest,
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A cargodesk store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  pub(crate) conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── IngestStore impl ────────────────────────────────────────────────────────

impl IngestStore for SqliteStore {
  type Error = crate::Error;

  async fn ingest_declarations(&self, batch: DeclarationBatch) -> Result<DeclarationOutcome> {
    let rows = batch
      .records
      .into_iter()
      .map(|r| {
        Ok((
          r.crn,
          r.boe_no,
          encode_date(r.boe_date),
          r.bl_number,
          serde_json::to_string(&r.payload)?,
        ))
      })
      .collect::<Result<Vec<_>>>()?;
    let ingested_at = encode_ts(now());

    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let mut inserted = 0u64;
        {
          let mut stmt = tx.prepare(
            "INSERT INTO declarations (crn, boe_no, boe_date, bl_number, payload, ingested_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT (crn, boe_no) DO NOTHING",
          )?;
          for (crn, boe_no, boe_date, bl_number, payload) in &rows {
            inserted +=
              stmt.execute(params![crn, boe_no, boe_date, bl_number, payload, ingested_at])? as u64;
          }
        }
        tx.commit()?;
        Ok(DeclarationOutcome {
          inserted,
          duplicates: rows.len() as u64 - inserted,
        })
      })
      .await?;
    Ok(outcome)
  }

  async fn ingest_manifest(&self, manifest: ParsedManifest) -> Result<ManifestOutcome> {
    let at = now();
    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let outcome = apply_manifest(&tx, &manifest, at).map_err(abort)?;
        tx.commit()?;
        Ok(outcome)
      })
      .await?;
    Ok(outcome)
  }

  async fn load_header_feed<I>(&self, rows: I, progress_every: usize) -> Result<FeedOutcome>
  where
    I: Iterator<Item = cargodesk_core::Result<FeedRow>> + Send + 'static,
  {
    let ingested_at = encode_ts(now());

    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let mut outcome = FeedOutcome::default();
        {
          let mut stmt = tx.prepare(INSERT_FEED_ROW)?;
          for row in rows {
            match row.map_err(abort)? {
              FeedRow::Short { values } => {
                tracing::debug!(values, "dropping short header-feed row");
                outcome.dropped += 1;
              }
              FeedRow::Record(record) => {
                insert_feed_row(&mut stmt, &record, &ingested_at)?;
                outcome.loaded += 1;
                if progress_every > 0 && outcome.loaded % progress_every as u64 == 0 {
                  tracing::info!(loaded = outcome.loaded, "header feed progress");
                }
              }
            }
          }
        }
        tx.commit()?;
        Ok(outcome)
      })
      .await?;
    Ok(outcome)
  }

  async fn load_reference(
    &self,
    kind: ReferenceKind,
    records: Vec<ReferenceRecord>,
  ) -> Result<ReferenceOutcome> {
    let rows = records
      .into_iter()
      .map(|r| Ok((r.code, serde_json::to_string(&r.payload)?)))
      .collect::<Result<Vec<_>>>()?;
    let (table, key) = reference_table(kind);
    let sql = format!(
      "INSERT INTO {table} ({key}, data) VALUES (?1, ?2) ON CONFLICT ({key}) DO NOTHING"
    );

    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let mut inserted = 0u64;
        {
          let mut stmt = tx.prepare(&sql)?;
          for (code, data) in &rows {
            inserted += stmt.execute(params![code, data])? as u64;
          }
        }
        tx.commit()?;
        Ok(ReferenceOutcome {
          inserted,
          duplicates: rows.len() as u64 - inserted,
        })
      })
      .await?;
    Ok(outcome)
  }

  async fn record_ingest(&self, entry: IngestLogEntry) -> Result<()> {
    let recorded_at = encode_ts(entry.recorded_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO ingest_log (
             kind, file_name, sha256, succeeded, rows_written, message, recorded_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
          params![
            entry.kind.as_str(),
            entry.file_name,
            entry.sha256,
            entry.succeeded,
            entry.rows_written as i64,
            entry.message,
            recorded_at,
          ],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

/// Table and key column for one reference kind.
pub(crate) fn reference_table(kind: ReferenceKind) -> (&'static str, &'static str) {
  match kind {
    ReferenceKind::Ports => ("port_codes", "port_code"),
    ReferenceKind::Commodities => ("commodity_groups", "hscode"),
    ReferenceKind::Vessels => ("vessel_records", "id"),
  }
}

// ─── Header feed ─────────────────────────────────────────────────────────────

const INSERT_FEED_ROW: &str = "
  INSERT INTO boe_header_feed (
    declaration_date, boe_approval_date, regime, boe_no, bl_number,
    importer_tin, importer_name, importer_address, consignee_tin,
    consignee_name, consignee_address, item_hs_code, no_of_pkg,
    package_unit_cd, item_description, item_origin_country, zone, cpc,
    gross_weight, net_weight, port_of_loading, vessel_carrier,
    discharge_terminal, shipping_line_name, cargo_type, package_type,
    gate_out_confirmation_date, final_date_of_discharge, country_of_shipment,
    port_of_discharge, ingested_at
  ) VALUES (
    ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16,
    ?17, ?18, ?19, ?20, ?21, ?22, ?23, ?24, ?25, ?26, ?27, ?28, ?29, ?30, ?31
  )";

fn insert_feed_row(
  stmt: &mut Statement<'_>,
  r: &HeaderFeedRecord,
  ingested_at: &str,
) -> rusqlite::Result<()> {
  let ts = |t: Option<chrono::NaiveDateTime>| t.map(encode_ts);
  stmt.execute(params![
    ts(r.declaration_date),
    ts(r.boe_approval_date),
    r.regime,
    r.boe_no,
    r.bl_number,
    r.importer_tin,
    r.importer_name,
    r.importer_address,
    r.consignee_tin,
    r.consignee_name,
    r.consignee_address,
    r.item_hs_code,
    r.no_of_pkg,
    r.package_unit_cd,
    r.item_description,
    r.item_origin_country,
    r.zone,
    r.cpc,
    r.gross_weight,
    r.net_weight,
    r.port_of_loading,
    r.vessel_carrier,
    r.discharge_terminal,
    r.shipping_line_name,
    r.cargo_type,
    r.package_type,
    ts(r.gate_out_confirmation_date),
    ts(r.final_date_of_discharge),
    r.country_of_shipment,
    r.port_of_discharge,
    ingested_at,
  ])?;
  Ok(())
}
