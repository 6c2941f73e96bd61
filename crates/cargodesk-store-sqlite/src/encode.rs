//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Dates are stored as `YYYY-MM-DD` and timestamps as
//! `YYYY-MM-DD HH:MM:SS.ffffff` (UTC), so both sort lexically. Structured
//! fields (notify parties, cargo-type flags, payloads) are compact JSON.

use cargodesk_core::{
  manifest::{BillOfLading, CargoTypeFlags, ContainerDetail, VehicleDetail},
  report::ManifestSummary,
};
use chrono::{NaiveDate, NaiveDateTime, Utc};
use rusqlite::Row;

use crate::{Error, Result};

// ─── Dates ───────────────────────────────────────────────────────────────────

pub fn encode_date(d: NaiveDate) -> String { d.format("%Y-%m-%d").to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| Error::DateParse(format!("{s:?}: {e}")))
}

pub fn decode_opt_date(s: Option<String>) -> Result<Option<NaiveDate>> {
  s.as_deref().map(decode_date).transpose()
}

// ─── Timestamps ──────────────────────────────────────────────────────────────

pub fn now() -> NaiveDateTime { Utc::now().naive_utc() }

pub fn encode_ts(dt: NaiveDateTime) -> String {
  dt.format("%Y-%m-%d %H:%M:%S%.6f").to_string()
}

pub fn decode_ts(s: &str) -> Result<NaiveDateTime> {
  NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f")
    .map_err(|e| Error::DateParse(format!("{s:?}: {e}")))
}

// ─── JSON columns ────────────────────────────────────────────────────────────

pub fn encode_notify_parties(parties: Option<&Vec<String>>) -> Result<Option<String>> {
  Ok(parties.map(serde_json::to_string).transpose()?)
}

pub fn encode_cargo_type(flags: Option<&CargoTypeFlags>) -> Result<Option<String>> {
  Ok(flags.map(serde_json::to_string).transpose()?)
}

pub fn decode_cargo_type(s: Option<String>) -> Result<Option<CargoTypeFlags>> {
  Ok(s.as_deref().map(serde_json::from_str).transpose()?)
}

// ─── Raw rows ────────────────────────────────────────────────────────────────

/// Column list matching [`RawBillOfLading::from_row`], prefixed with `b.`.
pub const BL_COLUMNS: &str = "
  b.crn, b.bl_number, b.bl_version_no, b.master_bl_number, b.consignee_name,
  b.consignee_address, b.shipper_name, b.goods_description, b.gross_weight,
  b.volume, b.no_of_packages, b.unit, b.no_of_containers, b.no_of_vehicles,
  b.imdg_codes, b.bl_type, b.port_of_loading, b.port_of_discharge,
  b.place_of_receipt, b.place_of_delivery, b.cargo_type, b.freight_amount,
  b.submitted_date, b.latest_bl";

/// A BL row as read from SQLite, before date and JSON decoding.
pub struct RawBillOfLading {
  pub crn:               String,
  pub bl_number:         String,
  pub bl_version_no:     i64,
  pub master_bl_number:  Option<String>,
  pub consignee_name:    Option<String>,
  pub consignee_address: Option<String>,
  pub shipper_name:      Option<String>,
  pub goods_description: Option<String>,
  pub gross_weight:      f64,
  pub volume:            f64,
  pub no_of_packages:    i64,
  pub unit:              Option<String>,
  pub no_of_containers:  i64,
  pub no_of_vehicles:    i64,
  pub imdg_codes:        Option<String>,
  pub bl_type:           Option<String>,
  pub port_of_loading:   Option<String>,
  pub port_of_discharge: Option<String>,
  pub place_of_receipt:  Option<String>,
  pub place_of_delivery: Option<String>,
  pub cargo_type:        Option<String>,
  pub freight_amount:    f64,
  pub submitted_date:    Option<String>,
  pub latest_bl:         bool,
}

impl RawBillOfLading {
  /// Read [`BL_COLUMNS`] starting at column `at`.
  pub fn from_row(row: &Row<'_>, at: usize) -> rusqlite::Result<Self> {
    Ok(Self {
      crn:               row.get(at)?,
      bl_number:         row.get(at + 1)?,
      bl_version_no:     row.get(at + 2)?,
      master_bl_number:  row.get(at + 3)?,
      consignee_name:    row.get(at + 4)?,
      consignee_address: row.get(at + 5)?,
      shipper_name:      row.get(at + 6)?,
      goods_description: row.get(at + 7)?,
      gross_weight:      row.get(at + 8)?,
      volume:            row.get(at + 9)?,
      no_of_packages:    row.get(at + 10)?,
      unit:              row.get(at + 11)?,
      no_of_containers:  row.get(at + 12)?,
      no_of_vehicles:    row.get(at + 13)?,
      imdg_codes:        row.get(at + 14)?,
      bl_type:           row.get(at + 15)?,
      port_of_loading:   row.get(at + 16)?,
      port_of_discharge: row.get(at + 17)?,
      place_of_receipt:  row.get(at + 18)?,
      place_of_delivery: row.get(at + 19)?,
      cargo_type:        row.get(at + 20)?,
      freight_amount:    row.get(at + 21)?,
      submitted_date:    row.get(at + 22)?,
      latest_bl:         row.get(at + 23)?,
    })
  }

  /// Decode into a domain BL plus its latest flag.
  pub fn into_bill_of_lading(self) -> Result<(BillOfLading, bool)> {
    let bl = BillOfLading {
      crn:               self.crn,
      bl_number:         self.bl_number,
      bl_version_no:     self.bl_version_no,
      master_bl_number:  self.master_bl_number,
      consignee_name:    self.consignee_name,
      consignee_address: self.consignee_address,
      shipper_name:      self.shipper_name,
      goods_description: self.goods_description,
      gross_weight:      self.gross_weight,
      volume:            self.volume,
      no_of_packages:    self.no_of_packages,
      unit:              self.unit,
      no_of_containers:  self.no_of_containers,
      no_of_vehicles:    self.no_of_vehicles,
      imdg_codes:        self.imdg_codes,
      bl_type:           self.bl_type,
      port_of_loading:   self.port_of_loading,
      port_of_discharge: self.port_of_discharge,
      place_of_receipt:  self.place_of_receipt,
      place_of_delivery: self.place_of_delivery,
      cargo_type:        decode_cargo_type(self.cargo_type)?,
      freight_amount:    self.freight_amount,
      submitted_date:    decode_opt_date(self.submitted_date)?,
    };
    Ok((bl, self.latest_bl))
  }
}

/// Header columns returned by a manifest search, prefixed with `h.`.
pub const SUMMARY_COLUMNS: &str = "
  h.crn, h.document_type, h.document_number, h.rotation_no, h.vessel_name,
  h.voyage_no, h.carrier_code, h.agent_name, h.port_of_loading,
  h.port_of_discharge, h.eta, h.etd, h.last_amended_at";

pub const SUMMARY_COLUMN_COUNT: usize = 13;

pub struct RawManifestSummary {
  pub crn:               String,
  pub document_type:     Option<String>,
  pub document_number:   Option<String>,
  pub rotation_no:       Option<String>,
  pub vessel_name:       Option<String>,
  pub voyage_no:         Option<String>,
  pub carrier_code:      Option<String>,
  pub agent_name:        Option<String>,
  pub port_of_loading:   Option<String>,
  pub port_of_discharge: Option<String>,
  pub eta:               Option<String>,
  pub etd:               Option<String>,
  pub last_amended_at:   String,
}

impl RawManifestSummary {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      crn:               row.get(0)?,
      document_type:     row.get(1)?,
      document_number:   row.get(2)?,
      rotation_no:       row.get(3)?,
      vessel_name:       row.get(4)?,
      voyage_no:         row.get(5)?,
      carrier_code:      row.get(6)?,
      agent_name:        row.get(7)?,
      port_of_loading:   row.get(8)?,
      port_of_discharge: row.get(9)?,
      eta:               row.get(10)?,
      etd:               row.get(11)?,
      last_amended_at:   row.get(12)?,
    })
  }

  pub fn into_summary(self) -> Result<ManifestSummary> {
    Ok(ManifestSummary {
      crn:               self.crn,
      document_type:     self.document_type,
      document_number:   self.document_number,
      rotation_no:       self.rotation_no,
      vessel_name:       self.vessel_name,
      voyage_no:         self.voyage_no,
      carrier_code:      self.carrier_code,
      agent_name:        self.agent_name,
      port_of_loading:   self.port_of_loading,
      port_of_discharge: self.port_of_discharge,
      eta:               decode_opt_date(self.eta)?,
      etd:               decode_opt_date(self.etd)?,
      last_amended_at:   decode_ts(&self.last_amended_at)?,
    })
  }
}

/// Column list for container rows, in [`container_from_row`] order.
pub const CONTAINER_COLUMNS: &str = "
  bl_number, bl_version_no, container_no, seal_number, container_type,
  container_size, freight_indicator, load_status, gross_weight,
  number_of_packages, unit, iso_code";

pub fn container_from_row(row: &Row<'_>) -> rusqlite::Result<ContainerDetail> {
  Ok(ContainerDetail {
    bl_number:          row.get(0)?,
    bl_version_no:      row.get(1)?,
    container_no:       row.get(2)?,
    seal_number:        row.get(3)?,
    container_type:     row.get(4)?,
    container_size:     row.get(5)?,
    freight_indicator:  row.get(6)?,
    load_status:        row.get(7)?,
    gross_weight:       row.get(8)?,
    number_of_packages: row.get(9)?,
    unit:               row.get(10)?,
    iso_code:           row.get(11)?,
  })
}

pub fn vehicle_from_row(row: &Row<'_>) -> rusqlite::Result<VehicleDetail> {
  Ok(VehicleDetail {
    bl_number:     row.get(0)?,
    bl_version_no: row.get(1)?,
    chassis_no:    row.get(2)?,
    model:         row.get(3)?,
    make:          row.get(4)?,
  })
}

#[cfg(test)]
mod tests {
  use chrono::Timelike as _;

  use super::*;

  #[test]
  fn timestamps_round_trip_with_and_without_fraction() {
    let dt = NaiveDate::from_ymd_opt(2024, 1, 15)
      .unwrap()
      .and_hms_micro_opt(10, 30, 0, 250)
      .unwrap();
    assert_eq!(decode_ts(&encode_ts(dt)).unwrap(), dt);
    assert_eq!(
      decode_ts("2024-01-15 10:30:00").unwrap(),
      dt.with_nanosecond(0).unwrap()
    );
    assert!(decode_ts("15/01/2024").is_err());
  }

  #[test]
  fn encoded_timestamps_sort_lexically() {
    let a = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap().and_hms_opt(9, 0, 0).unwrap();
    let b = a + chrono::Duration::microseconds(1);
    assert!(encode_ts(a) < encode_ts(b));
  }
}
