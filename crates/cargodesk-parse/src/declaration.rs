//! Declaration batch JSON → [`DeclarationBatch`].
//!
//! A batch file looks like `{"encodingData": {"response": [record, ...]}}`.
//! Each record must carry `boeHeader.crn`, `boeHeader.boeNo`, and a
//! `DD/MM/YYYY` `boeHeader.boeDate`; records missing any of these are skipped
//! and counted.

use cargodesk_core::{
  coerce,
  declaration::{DeclarationBatch, DeclarationRecord, HEADER_KEY},
};
use serde_json::Value;

use crate::error::Result;

const RESPONSE_POINTER: &str = "/encodingData/response";

/// Parse one declaration batch file.
///
/// Only invalid JSON is an error. A document without a response list yields
/// an empty batch.
pub fn parse_declarations(json: &[u8]) -> Result<DeclarationBatch> {
  let mut root: Value = serde_json::from_slice(json)?;

  let list = match root.pointer_mut(RESPONSE_POINTER).map(Value::take) {
    Some(Value::Array(list)) => list,
    _ => Vec::new(),
  };

  let mut batch = DeclarationBatch { total: list.len(), ..DeclarationBatch::default() };
  for payload in list {
    match record_from_payload(payload) {
      Some(record) => batch.records.push(record),
      None => batch.skipped += 1,
    }
  }
  Ok(batch)
}

fn record_from_payload(payload: Value) -> Option<DeclarationRecord> {
  let header = payload.get(HEADER_KEY)?;

  let boe_date = coerce::dmy_date(coerce::json_text(header.get("boeDate")).as_deref())?;
  let crn = coerce::json_text(header.get("crn"))?;
  let boe_no = coerce::json_text(header.get("boeNo"))?;
  let bl_number = coerce::json_text(header.get("blNumber"));

  Some(DeclarationRecord { crn, boe_no, boe_date, bl_number, payload })
}

#[cfg(test)]
mod tests {
  use chrono::NaiveDate;
  use serde_json::json;

  use super::*;

  fn batch(records: Value) -> Vec<u8> {
    serde_json::to_vec(&json!({"encodingData": {"response": records}})).unwrap()
  }

  #[test]
  fn keeps_valid_records_verbatim() {
    let record = json!({
      "boeHeader": {
        "crn": "CRN1", "boeNo": "100", "boeDate": "05/03/2024",
        "blNumber": "BL-7", "importerName": "ACME",
      },
      "boeItem": [{"hsCode": "03038900", "netWeight": 10.5}],
    });
    let parsed = parse_declarations(&batch(json!([record.clone()]))).unwrap();

    assert_eq!(parsed.total, 1);
    assert_eq!(parsed.skipped, 0);
    let r = &parsed.records[0];
    assert_eq!((r.crn.as_str(), r.boe_no.as_str()), ("CRN1", "100"));
    assert_eq!(r.boe_date, NaiveDate::from_ymd_opt(2024, 3, 5).unwrap());
    assert_eq!(r.bl_number.as_deref(), Some("BL-7"));
    assert_eq!(r.payload, record);
    assert_eq!(r.items().len(), 1);
  }

  #[test]
  fn skips_incomplete_records() {
    let parsed = parse_declarations(&batch(json!([
      {"boeHeader": {"crn": "C", "boeNo": "1", "boeDate": "01/02/2024"}},
      {"boeHeader": {"crn": "C", "boeNo": "2"}},
      {"boeHeader": {"crn": "C", "boeNo": "3", "boeDate": "2024-02-01"}},
      {"boeHeader": {"boeNo": "4", "boeDate": "01/02/2024"}},
      {"boeHeader": {"crn": " ", "boeNo": "5", "boeDate": "01/02/2024"}},
      {"boeItem": []},
      "not an object",
    ])))
    .unwrap();

    assert_eq!(parsed.total, 7);
    assert_eq!(parsed.records.len(), 1);
    assert_eq!(parsed.skipped, 6);
    assert_eq!(parsed.records[0].bl_number, None);
  }

  #[test]
  fn numeric_identifiers_are_accepted() {
    let parsed = parse_declarations(&batch(json!([
      {"boeHeader": {"crn": "C", "boeNo": 100, "boeDate": "01/02/2024"}},
    ])))
    .unwrap();
    assert_eq!(parsed.records[0].boe_no, "100");
  }

  #[test]
  fn missing_response_is_an_empty_batch() {
    let parsed = parse_declarations(br#"{"encodingData": {}}"#).unwrap();
    assert_eq!(parsed.total, 0);
    assert!(parsed.records.is_empty());
  }

  #[test]
  fn invalid_json_fails() {
    assert!(parse_declarations(b"{\"encodingData\": [").is_err());
  }
}
