//! Cargo manifests: one header per CRN, versioned bills of lading, and the
//! containers and vehicles carried under each BL version.

use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ─── Document type ───────────────────────────────────────────────────────────

/// The kind of manifest document, which decides how its BLs are versioned.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum DocumentType {
  /// `HMNDOC`: the base manifest. Establishes the first version of each BL.
  Home,
  /// `AMNDOC`: an amendment. Always creates a new BL version.
  Amendment,
  /// `ADLDOC`: an addendum. Versioned exactly like an amendment.
  Addendum,
  /// Any other code. The header is merged but no BLs are written.
  Other(String),
}

impl DocumentType {
  pub fn from_code(code: &str) -> Self {
    match code.trim().to_ascii_uppercase().as_str() {
      "HMNDOC" => Self::Home,
      "AMNDOC" => Self::Amendment,
      "ADLDOC" => Self::Addendum,
      _ => Self::Other(code.trim().to_owned()),
    }
  }

  pub fn code(&self) -> &str {
    match self {
      Self::Home => "HMNDOC",
      Self::Amendment => "AMNDOC",
      Self::Addendum => "ADLDOC",
      Self::Other(code) => code,
    }
  }

  /// Whether documents of this type create a new BL version unconditionally.
  pub fn is_revision(&self) -> bool {
    matches!(self, Self::Amendment | Self::Addendum)
  }

  /// Whether a file name looks like a base document. Used to order a batch
  /// so that base documents are attempted before their amendments.
  pub fn is_home_file_name(name: &str) -> bool {
    name.to_ascii_uppercase().contains("HMNDOC")
  }
}

impl fmt::Display for DocumentType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.code())
  }
}

impl From<String> for DocumentType {
  fn from(code: String) -> Self { Self::from_code(&code) }
}

impl From<DocumentType> for String {
  fn from(doc_type: DocumentType) -> Self { doc_type.code().to_owned() }
}

// ─── Header ──────────────────────────────────────────────────────────────────

/// Manifest header fields. Every field is optional: a `None` never overwrites
/// a stored value when headers are merged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ManifestHeader {
  pub crn:                       Option<String>,
  pub document_type:             Option<DocumentType>,
  pub document_name:             Option<String>,
  pub document_number:           Option<String>,
  pub message_type:              Option<String>,
  pub sender_id:                 Option<String>,
  pub receiving_party:           Option<String>,
  /// Notify parties in document order.
  pub notify_parties:            Option<Vec<String>>,
  pub rotation_no:               Option<String>,
  pub rotation_no_creation_date: Option<NaiveDate>,
  pub vessel_name:               Option<String>,
  pub voyage_no:                 Option<String>,
  pub carrier_code:              Option<String>,
  pub carrier_name:              Option<String>,
  pub vessel_nationality:        Option<String>,
  pub coload_yn:                 Option<String>,
  pub inbound_outbound:          Option<String>,
  pub transport_mode:            Option<String>,
  pub port_of_discharge:         Option<String>,
  pub port_of_loading:           Option<String>,
  pub next_port_of_call:         Option<String>,
  pub final_destination:         Option<String>,
  pub shipping_agent_code:       Option<String>,
  pub agent_name:                Option<String>,
  pub customs_office_code:       Option<String>,
  pub eta:                       Option<NaiveDate>,
  pub etd:                       Option<NaiveDate>,
  pub issued_date:               Option<NaiveDate>,
}

impl ManifestHeader {
  /// The minimal header used to reserve a CRN when a revision arrives before
  /// its base document: CRN, document type, and rotation number only.
  pub fn reservation(&self) -> Self {
    Self {
      crn: self.crn.clone(),
      document_type: self.document_type.clone(),
      rotation_no: self.rotation_no.clone(),
      ..Self::default()
    }
  }
}

/// A manifest header as stored, including the store-assigned amendment time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredManifestHeader {
  #[serde(flatten)]
  pub header:          ManifestHeader,
  pub last_amended_at: NaiveDateTime,
}

// ─── Bills of lading ─────────────────────────────────────────────────────────

/// Cargo-type flags keyed by element tag, each `"Y"`, `"N"`, or null.
pub type CargoTypeFlags = Map<String, Value>;

/// One version of a bill of lading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BillOfLading {
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
  pub cargo_type:        Option<CargoTypeFlags>,
  pub freight_amount:    f64,
  pub submitted_date:    Option<NaiveDate>,
}

impl BillOfLading {
  /// The `(bl_number, bl_version_no)` key shared with child rows.
  pub fn version_key(&self) -> (&str, i64) {
    (&self.bl_number, self.bl_version_no)
  }
}

/// A BL version as stored, with its latest-version flag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredBillOfLading {
  #[serde(flatten)]
  pub bl:        BillOfLading,
  pub latest_bl: bool,
}

// ─── Children ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerDetail {
  pub bl_number:          String,
  pub bl_version_no:      i64,
  pub container_no:       Option<String>,
  pub seal_number:        Option<String>,
  pub container_type:     Option<String>,
  pub container_size:     i64,
  pub freight_indicator:  Option<String>,
  pub load_status:        Option<String>,
  pub gross_weight:       f64,
  pub number_of_packages: i64,
  pub unit:               Option<String>,
  pub iso_code:           Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleDetail {
  pub bl_number:     String,
  pub bl_version_no: i64,
  pub chassis_no:    Option<String>,
  pub model:         Option<String>,
  pub make:          Option<String>,
}

// ─── Parsed document ─────────────────────────────────────────────────────────

/// Everything extracted from one manifest file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedManifest {
  pub header:         ManifestHeader,
  pub bl_list:        Vec<BillOfLading>,
  pub container_list: Vec<ContainerDetail>,
  pub vehicle_list:   Vec<VehicleDetail>,
}

impl ParsedManifest {
  /// Document type from the header, defaulting to an empty `Other` code.
  pub fn document_type(&self) -> DocumentType {
    self
      .header
      .document_type
      .clone()
      .unwrap_or_else(|| DocumentType::Other(String::new()))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn document_type_codes() {
    assert_eq!(DocumentType::from_code("HMNDOC"), DocumentType::Home);
    assert_eq!(DocumentType::from_code(" amndoc "), DocumentType::Amendment);
    assert_eq!(DocumentType::from_code("ADLDOC"), DocumentType::Addendum);
    assert_eq!(
      DocumentType::from_code("XYZ"),
      DocumentType::Other("XYZ".into())
    );
    assert!(DocumentType::Addendum.is_revision());
    assert!(!DocumentType::Home.is_revision());
    assert_eq!(DocumentType::Amendment.to_string(), "AMNDOC");
  }

  #[test]
  fn home_file_names() {
    assert!(DocumentType::is_home_file_name("C1_hmndoc_001.xml"));
    assert!(!DocumentType::is_home_file_name("C1_AMNDOC_002.xml"));
  }

  #[test]
  fn reservation_keeps_identity_only() {
    let header = ManifestHeader {
      crn: Some("C1".into()),
      document_type: Some(DocumentType::Amendment),
      rotation_no: Some("R9".into()),
      agent_name: Some("Agent".into()),
      ..ManifestHeader::default()
    };
    let reserved = header.reservation();
    assert_eq!(reserved.crn.as_deref(), Some("C1"));
    assert_eq!(reserved.rotation_no.as_deref(), Some("R9"));
    assert_eq!(reserved.agent_name, None);
  }
}
