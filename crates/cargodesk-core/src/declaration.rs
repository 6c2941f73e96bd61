//! Customs declarations (Bills of Entry).
//!
//! A declaration is identified by its `(crn, boe_no)` pair. Everything else
//! the upstream system sends is kept verbatim in `payload`, whose nested shape
//! (`boeHeader` object plus `boeItem` array) is read directly by the reporting
//! layer.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Key of the header object inside a declaration payload.
pub const HEADER_KEY: &str = "boeHeader";
/// Key of the line-item array inside a declaration payload.
pub const ITEMS_KEY: &str = "boeItem";

/// One parsed declaration, ready to be written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeclarationRecord {
  pub crn:       String,
  pub boe_no:    String,
  /// Approval date, reformatted from the source `DD/MM/YYYY`.
  pub boe_date:  NaiveDate,
  pub bl_number: Option<String>,
  /// The untouched source record.
  pub payload:   Value,
}

impl DeclarationRecord {
  /// The `boeHeader` section of the payload, if present.
  pub fn header(&self) -> Option<&Value> { self.payload.get(HEADER_KEY) }

  /// The `boeItem` line items; empty when the payload carries none.
  pub fn items(&self) -> &[Value] {
    self
      .payload
      .get(ITEMS_KEY)
      .and_then(Value::as_array)
      .map(Vec::as_slice)
      .unwrap_or_default()
  }
}

/// All usable declarations from one batch file.
#[derive(Debug, Clone, Default)]
pub struct DeclarationBatch {
  pub records: Vec<DeclarationRecord>,
  /// Number of records found in the file, usable or not.
  pub total:   usize,
  /// Records dropped for a missing CRN, BOE number, or approval date.
  pub skipped: usize,
}
