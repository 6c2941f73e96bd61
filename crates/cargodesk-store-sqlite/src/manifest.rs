//! The manifest upsert engine.
//!
//! Runs inside the caller's transaction. Applying a manifest:
//! 1. merges the header into `manifest_headers` (non-null fields win);
//! 2. writes BL versions according to the document type;
//! 3. replaces the containers and vehicles of every BL version it wrote.

use std::collections::BTreeSet;

use cargodesk_core::{
  manifest::{BillOfLading, DocumentType, ManifestHeader, ParsedManifest},
  store::ManifestOutcome,
};
use chrono::NaiveDateTime;
use rusqlite::{Connection, OptionalExtension as _, params};

use crate::{
  Error, Result,
  encode::{encode_cargo_type, encode_date, encode_notify_parties, encode_ts},
};

pub(crate) fn apply_manifest(
  conn: &Connection,
  manifest: &ParsedManifest,
  now: NaiveDateTime,
) -> Result<ManifestOutcome> {
  let crn = manifest.header.crn.clone().ok_or(Error::MissingCrn)?;
  let document_type = manifest.document_type();

  // A revision without vessel details may precede its base document; the
  // reservation guarantees the CRN row exists before the full merge.
  if document_type.is_revision() && manifest.header.vessel_name.is_none() {
    tracing::info!(%crn, %document_type, "reserving header for partial revision");
    merge_header(conn, &crn, &manifest.header.reservation(), now)?;
  }
  merge_header(conn, &crn, &manifest.header, now)?;

  let mut outcome = ManifestOutcome {
    crn:           crn.clone(),
    document_type: document_type.clone(),
    bls_written:   0,
    bls_skipped:   0,
    containers:    0,
    vehicles:      0,
  };

  let mut written: BTreeSet<(String, i64)> = BTreeSet::new();
  for bl in &manifest.bl_list {
    let wrote = match &document_type {
      DocumentType::Home => insert_first_version(conn, &crn, bl)?,
      DocumentType::Amendment | DocumentType::Addendum => {
        insert_new_version(conn, &crn, bl)?;
        true
      }
      DocumentType::Other(code) => {
        tracing::warn!(%crn, code = %code, bl = %bl.bl_number, "document type writes no BLs");
        false
      }
    };

    if wrote {
      outcome.bls_written += 1;
      written.insert((bl.bl_number.clone(), bl.bl_version_no));
    } else {
      outcome.bls_skipped += 1;
    }
  }

  replace_children(conn, manifest, &written, &mut outcome)?;
  Ok(outcome)
}

// ─── Header merge ────────────────────────────────────────────────────────────

/// Insert the header or, if the CRN exists, overwrite each stored field whose
/// incoming value is non-null. `last_amended_at` always advances.
fn merge_header(
  conn: &Connection,
  crn: &str,
  h: &ManifestHeader,
  now: NaiveDateTime,
) -> Result<()> {
  let document_type = h.document_type.as_ref().map(|t| t.code().to_owned());
  let notify_parties = encode_notify_parties(h.notify_parties.as_ref())?;
  let date = |d: Option<chrono::NaiveDate>| d.map(encode_date);

  conn.execute(
    "INSERT INTO manifest_headers (
       crn, document_type, document_name, document_number, message_type,
       sender_id, receiving_party, notify_parties, rotation_no,
       rotation_no_creation_date, vessel_name, voyage_no, carrier_code,
       carrier_name, vessel_nationality, coload_yn, inbound_outbound,
       transport_mode, port_of_discharge, port_of_loading, next_port_of_call,
       final_destination, shipping_agent_code, agent_name, customs_office_code,
       eta, etd, issued_date, last_amended_at
     ) VALUES (
       ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15,
       ?16, ?17, ?18, ?19, ?20, ?21, ?22, ?23, ?24, ?25, ?26, ?27, ?28, ?29
     )
     ON CONFLICT (crn) DO UPDATE SET
       document_type             = COALESCE(excluded.document_type, document_type),
       document_name             = COALESCE(excluded.document_name, document_name),
       document_number           = COALESCE(excluded.document_number, document_number),
       message_type              = COALESCE(excluded.message_type, message_type),
       sender_id                 = COALESCE(excluded.sender_id, sender_id),
       receiving_party           = COALESCE(excluded.receiving_party, receiving_party),
       notify_parties            = COALESCE(excluded.notify_parties, notify_parties),
       rotation_no               = COALESCE(excluded.rotation_no, rotation_no),
       rotation_no_creation_date = COALESCE(excluded.rotation_no_creation_date, rotation_no_creation_date),
       vessel_name               = COALESCE(excluded.vessel_name, vessel_name),
       voyage_no                 = COALESCE(excluded.voyage_no, voyage_no),
       carrier_code              = COALESCE(excluded.carrier_code, carrier_code),
       carrier_name              = COALESCE(excluded.carrier_name, carrier_name),
       vessel_nationality        = COALESCE(excluded.vessel_nationality, vessel_nationality),
       coload_yn                 = COALESCE(excluded.coload_yn, coload_yn),
       inbound_outbound          = COALESCE(excluded.inbound_outbound, inbound_outbound),
       transport_mode            = COALESCE(excluded.transport_mode, transport_mode),
       port_of_discharge         = COALESCE(excluded.port_of_discharge, port_of_discharge),
       port_of_loading           = COALESCE(excluded.port_of_loading, port_of_loading),
       next_port_of_call         = COALESCE(excluded.next_port_of_call, next_port_of_call),
       final_destination         = COALESCE(excluded.final_destination, final_destination),
       shipping_agent_code       = COALESCE(excluded.shipping_agent_code, shipping_agent_code),
       agent_name                = COALESCE(excluded.agent_name, agent_name),
       customs_office_code       = COALESCE(excluded.customs_office_code, customs_office_code),
       eta                       = COALESCE(excluded.eta, eta),
       etd                       = COALESCE(excluded.etd, etd),
       issued_date               = COALESCE(excluded.issued_date, issued_date),
       last_amended_at           = excluded.last_amended_at",
    params![
      crn,
      document_type,
      h.document_name,
      h.document_number,
      h.message_type,
      h.sender_id,
      h.receiving_party,
      notify_parties,
      h.rotation_no,
      date(h.rotation_no_creation_date),
      h.vessel_name,
      h.voyage_no,
      h.carrier_code,
      h.carrier_name,
      h.vessel_nationality,
      h.coload_yn,
      h.inbound_outbound,
      h.transport_mode,
      h.port_of_discharge,
      h.port_of_loading,
      h.next_port_of_call,
      h.final_destination,
      h.shipping_agent_code,
      h.agent_name,
      h.customs_office_code,
      date(h.eta),
      date(h.etd),
      date(h.issued_date),
      encode_ts(now),
    ],
  )?;
  Ok(())
}

// ─── BL versions ─────────────────────────────────────────────────────────────

const INSERT_BL: &str = "
  INSERT INTO bills_of_lading (
    crn, bl_number, bl_version_no, master_bl_number, consignee_name,
    consignee_address, shipper_name, goods_description, gross_weight, volume,
    no_of_packages, unit, no_of_containers, no_of_vehicles, imdg_codes,
    bl_type, port_of_loading, port_of_discharge, place_of_receipt,
    place_of_delivery, cargo_type, freight_amount, submitted_date, latest_bl
  ) VALUES (
    ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16,
    ?17, ?18, ?19, ?20, ?21, ?22, ?23, 1
  )";

/// Base-document path: insert only when the CRN has never seen this BL
/// number. Returns whether a row was written.
fn insert_first_version(conn: &Connection, crn: &str, bl: &BillOfLading) -> Result<bool> {
  let exists = conn
    .query_row(
      "SELECT 1 FROM bills_of_lading WHERE bl_number = ?1 AND crn = ?2 LIMIT 1",
      params![bl.bl_number, crn],
      |_| Ok(()),
    )
    .optional()?
    .is_some();
  if exists {
    tracing::debug!(%crn, bl = %bl.bl_number, "BL already received; keeping first version");
    return Ok(false);
  }

  let sql = format!("{INSERT_BL} ON CONFLICT (bl_number, bl_version_no) DO NOTHING");
  let changed = execute_bl(conn, &sql, crn, bl)?;
  if changed == 0 {
    tracing::warn!(
      %crn,
      bl = %bl.bl_number,
      version = bl.bl_version_no,
      "BL version already stored under another CRN"
    );
  }
  Ok(changed > 0)
}

/// Revision path: demote the current latest row for (BL number, CRN), then
/// write this version as latest. Re-applying an already stored version
/// refreshes it in place.
fn insert_new_version(conn: &Connection, crn: &str, bl: &BillOfLading) -> Result<()> {
  conn.execute(
    "UPDATE bills_of_lading SET latest_bl = 0
     WHERE bl_number = ?1 AND crn = ?2 AND latest_bl = 1",
    params![bl.bl_number, crn],
  )?;

  let sql = format!(
    "{INSERT_BL}
     ON CONFLICT (bl_number, bl_version_no) DO UPDATE SET
       crn               = excluded.crn,
       master_bl_number  = excluded.master_bl_number,
       consignee_name    = excluded.consignee_name,
       consignee_address = excluded.consignee_address,
       shipper_name      = excluded.shipper_name,
       goods_description = excluded.goods_description,
       gross_weight      = excluded.gross_weight,
       volume            = excluded.volume,
       no_of_packages    = excluded.no_of_packages,
       unit              = excluded.unit,
       no_of_containers  = excluded.no_of_containers,
       no_of_vehicles    = excluded.no_of_vehicles,
       imdg_codes        = excluded.imdg_codes,
       bl_type           = excluded.bl_type,
       port_of_loading   = excluded.port_of_loading,
       port_of_discharge = excluded.port_of_discharge,
       place_of_receipt  = excluded.place_of_receipt,
       place_of_delivery = excluded.place_of_delivery,
       cargo_type        = excluded.cargo_type,
       freight_amount    = excluded.freight_amount,
       submitted_date    = excluded.submitted_date,
       latest_bl         = 1"
  );
  execute_bl(conn, &sql, crn, bl)?;
  Ok(())
}

fn execute_bl(conn: &Connection, sql: &str, crn: &str, bl: &BillOfLading) -> Result<usize> {
  let cargo_type = encode_cargo_type(bl.cargo_type.as_ref())?;
  let changed = conn.execute(
    sql,
    params![
      crn,
      bl.bl_number,
      bl.bl_version_no,
      bl.master_bl_number,
      bl.consignee_name,
      bl.consignee_address,
      bl.shipper_name,
      bl.goods_description,
      bl.gross_weight,
      bl.volume,
      bl.no_of_packages,
      bl.unit,
      bl.no_of_containers,
      bl.no_of_vehicles,
      bl.imdg_codes,
      bl.bl_type,
      bl.port_of_loading,
      bl.port_of_discharge,
      bl.place_of_receipt,
      bl.place_of_delivery,
      cargo_type,
      bl.freight_amount,
      bl.submitted_date.map(encode_date),
    ],
  )?;
  Ok(changed)
}

// ─── Children ────────────────────────────────────────────────────────────────

/// Delete then re-insert the containers and vehicles of each written BL
/// version, so reprocessing a document never duplicates them.
fn replace_children(
  conn: &Connection,
  manifest: &ParsedManifest,
  written: &BTreeSet<(String, i64)>,
  outcome: &mut ManifestOutcome,
) -> Result<()> {
  for (bl_number, version) in written {
    conn.execute(
      "DELETE FROM bl_containers WHERE bl_number = ?1 AND bl_version_no = ?2",
      params![bl_number, version],
    )?;
    conn.execute(
      "DELETE FROM bl_vehicles WHERE bl_number = ?1 AND bl_version_no = ?2",
      params![bl_number, version],
    )?;
  }

  let is_written =
    |bl_number: &str, version: i64| written.contains(&(bl_number.to_owned(), version));

  let mut stmt = conn.prepare_cached(
    "INSERT INTO bl_containers (
       bl_number, bl_version_no, container_no, seal_number, container_type,
       container_size, freight_indicator, load_status, gross_weight,
       number_of_packages, unit, iso_code
     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
  )?;
  for c in &manifest.container_list {
    if !is_written(&c.bl_number, c.bl_version_no) {
      continue;
    }
    stmt.execute(params![
      c.bl_number,
      c.bl_version_no,
      c.container_no,
      c.seal_number,
      c.container_type,
      c.container_size,
      c.freight_indicator,
      c.load_status,
      c.gross_weight,
      c.number_of_packages,
      c.unit,
      c.iso_code,
    ])?;
    outcome.containers += 1;
  }

  let mut stmt = conn.prepare_cached(
    "INSERT INTO bl_vehicles (bl_number, bl_version_no, chassis_no, model, make)
     VALUES (?1, ?2, ?3, ?4, ?5)",
  )?;
  for v in &manifest.vehicle_list {
    if !is_written(&v.bl_number, v.bl_version_no) {
      continue;
    }
    stmt.execute(params![v.bl_number, v.bl_version_no, v.chassis_no, v.model, v.make])?;
    outcome.vehicles += 1;
  }

  Ok(())
}
