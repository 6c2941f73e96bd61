//! Static reference data: port codes, commodity (HS) codes, vessels.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReferenceKind {
  Ports,
  Commodities,
  Vessels,
}

impl ReferenceKind {
  pub const ALL: [ReferenceKind; 3] = [Self::Ports, Self::Commodities, Self::Vessels];

  /// The JSON field holding each record's natural key.
  pub fn key_field(self) -> &'static str {
    match self {
      Self::Ports => "PortCode",
      Self::Commodities => "HSCode",
      Self::Vessels => "ID",
    }
  }

  pub fn as_str(self) -> &'static str {
    match self {
      Self::Ports => "ports",
      Self::Commodities => "commodities",
      Self::Vessels => "vessels",
    }
  }
}

impl fmt::Display for ReferenceKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for ReferenceKind {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_ascii_lowercase().as_str() {
      "ports" | "port" => Ok(Self::Ports),
      "commodities" | "commodity" | "hscodes" => Ok(Self::Commodities),
      "vessels" | "vessel" => Ok(Self::Vessels),
      other => Err(format!("unknown reference kind: {other:?}")),
    }
  }
}

/// One reference row: its natural key plus the full source object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceRecord {
  pub code:    String,
  pub payload: Value,
}

#[derive(Debug, Clone, Default)]
pub struct ReferenceBatch {
  pub records: Vec<ReferenceRecord>,
  /// Source objects without a usable key.
  pub skipped: usize,
}
