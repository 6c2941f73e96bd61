//! Request-scoped reporting queries and their result shapes.
//!
//! A query value carries every filter for one request; nothing is kept
//! between requests. Backends translate the closed set of
//! [`DeclarationFilter`] kinds into their own predicate language.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::manifest::{BillOfLading, ContainerDetail, VehicleDetail};

/// Default row limit for list-style reports.
pub const DEFAULT_LIMIT: u32 = 100;
/// Upper bound accepted for any row limit.
pub const MAX_LIMIT: u32 = 5_000;
/// Maximum number of rows returned by a suggestion query.
pub const SUGGESTION_LIMIT: u32 = 20;
/// HS-code prefixes shorter than this are ignored.
pub const HSCODE_PREFIX_MIN: usize = 4;
/// HS-code prefixes are cut to this many characters.
pub const HSCODE_PREFIX_MAX: usize = 8;
/// Vessel and importer suggestion keywords shorter than this are rejected.
pub const KEYWORD_MIN: usize = 3;

// ─── Declaration report ──────────────────────────────────────────────────────

/// One optional filter on the declaration report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeclarationFilter {
  /// Any line item originates from this country.
  OriginCountry(String),
  /// Any line item's HS code starts with one of these prefixes.
  HsCodePrefixes(Vec<String>),
  /// Exact BOE number.
  BoeNumber(String),
  /// Exact importer TIN in the header section.
  ImporterTin(String),
  /// Exact BL number.
  BlNumber(String),
  /// Vessel name contains any of these keywords.
  VesselNames(Vec<String>),
  /// Importer name contains any of these keywords.
  ImporterNames(Vec<String>),
  /// Any line item's goods description contains any of these keywords.
  GoodsDescriptions(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclarationQuery {
  /// Inclusive approval-date range.
  pub start_date: NaiveDate,
  pub end_date:   NaiveDate,
  pub filters:    Vec<DeclarationFilter>,
  pub limit:      u32,
}

/// The leading group for one aggregate, e.g. the importer with the highest
/// total net weight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopCard {
  pub name:  String,
  pub total: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TopCards {
  pub importer_by_net_weight:   Option<TopCard>,
  pub importer_by_gross_weight: Option<TopCard>,
  /// FOB value converted with each declaration's exchange rate.
  pub importer_by_value:        Option<TopCard>,
  pub hscode_by_net_weight:     Option<TopCard>,
  pub hscode_by_gross_weight:   Option<TopCard>,
  pub hscode_by_value:          Option<TopCard>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportSummary {
  pub total_records:            u64,
  pub grand_total_net_weight:   f64,
  pub grand_total_gross_weight: f64,
  pub top_cards:                TopCards,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeclarationReport {
  pub summary: ReportSummary,
  /// Stored payloads, newest first, with `boe_no`, `boe_date`, `bl_number`
  /// and calculated totals injected.
  pub records: Vec<Value>,
}

// ─── Manifest search ─────────────────────────────────────────────────────────

/// Search over the latest version of every BL. Text filters are
/// case-insensitive partial matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestQuery {
  /// Inclusive BL submission-date range.
  pub submitted_from: NaiveDate,
  pub submitted_to:   NaiveDate,
  pub crn:            Option<String>,
  pub rotation_no:    Option<String>,
  pub vessel_name:    Option<String>,
  pub agent_name:     Option<String>,
  pub bl_number:      Option<String>,
  pub limit:          u32,
}

/// Header columns returned alongside each BL in a manifest search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestSummary {
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
  pub eta:               Option<NaiveDate>,
  pub etd:               Option<NaiveDate>,
  pub last_amended_at:   NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestSearchRow {
  pub manifest:       ManifestSummary,
  pub bill_of_lading: BillOfLading,
}

/// Containers and vehicles recorded for one BL version.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ManifestDetails {
  pub containers: Vec<ContainerDetail>,
  pub vehicles:   Vec<VehicleDetail>,
}

impl ManifestDetails {
  pub fn is_empty(&self) -> bool {
    self.containers.is_empty() && self.vehicles.is_empty()
  }
}

// ─── Suggestions ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HsCodeSuggestion {
  pub hscode:      String,
  /// Commodity description from the reference table, when known.
  pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VesselSuggestion {
  pub name:               String,
  pub vessel_nationality: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImporterSuggestion {
  pub name:         String,
  pub importer_tin: Option<String>,
}

/// Clamp a caller-supplied limit into `1..=MAX_LIMIT`.
pub fn clamp_limit(limit: Option<u32>) -> u32 {
  limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn limits_are_clamped() {
    assert_eq!(clamp_limit(None), DEFAULT_LIMIT);
    assert_eq!(clamp_limit(Some(0)), 1);
    assert_eq!(clamp_limit(Some(1_000_000)), MAX_LIMIT);
    assert_eq!(clamp_limit(Some(25)), 25);
  }
}
