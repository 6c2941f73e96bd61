//! Reference-data JSON arrays → [`ReferenceBatch`].

use cargodesk_core::{
  coerce,
  reference::{ReferenceBatch, ReferenceKind, ReferenceRecord},
};
use serde_json::Value;

use crate::error::{Error, Result};

/// Parse a reference file: a JSON array of objects, each carrying the key
/// field for `kind`. Objects without a usable key are skipped and counted.
pub fn parse_reference(kind: ReferenceKind, json: &[u8]) -> Result<ReferenceBatch> {
  let Value::Array(list) = serde_json::from_slice(json)? else {
    return Err(Error::Structure(format!("{kind} file is not a JSON array")));
  };

  let mut batch = ReferenceBatch::default();
  for payload in list {
    match reference_code(kind, &payload) {
      Some(code) => batch.records.push(ReferenceRecord { code, payload }),
      None => batch.skipped += 1,
    }
  }
  Ok(batch)
}

fn reference_code(kind: ReferenceKind, payload: &Value) -> Option<String> {
  let key = payload.get(kind.key_field())?;
  match kind {
    // HS codes keep their leading zeros only as strings.
    ReferenceKind::Commodities => key.as_str().and_then(|s| coerce::opt_text(Some(s))),
    ReferenceKind::Ports | ReferenceKind::Vessels => coerce::json_text(Some(key)),
  }
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  fn parse(kind: ReferenceKind, value: Value) -> ReferenceBatch {
    parse_reference(kind, &serde_json::to_vec(&value).unwrap()).unwrap()
  }

  #[test]
  fn ports_keyed_by_port_code() {
    let batch = parse(
      ReferenceKind::Ports,
      json!([
        {"PortCode": "AEJEA", "PortName": "Jebel Ali"},
        {"PortName": "Nowhere"},
        {"PortCode": ""},
      ]),
    );
    assert_eq!(batch.records.len(), 1);
    assert_eq!(batch.records[0].code, "AEJEA");
    assert_eq!(batch.records[0].payload["PortName"], "Jebel Ali");
    assert_eq!(batch.skipped, 2);
  }

  #[test]
  fn commodity_codes_must_be_strings() {
    let batch = parse(
      ReferenceKind::Commodities,
      json!([{"HSCode": "03038900"}, {"HSCode": 3038900}, {"HSCode": null}]),
    );
    assert_eq!(batch.records.len(), 1);
    assert_eq!(batch.records[0].code, "03038900");
    assert_eq!(batch.skipped, 2);
  }

  #[test]
  fn vessel_ids_may_be_numeric() {
    let batch = parse(
      ReferenceKind::Vessels,
      json!([{"ID": 42, "Name": "MSC ALPHA"}, {"ID": null}]),
    );
    assert_eq!(batch.records.len(), 1);
    assert_eq!(batch.records[0].code, "42");
    assert_eq!(batch.skipped, 1);
  }

  #[test]
  fn non_array_is_rejected() {
    assert!(parse_reference(ReferenceKind::Ports, br#"{"PortCode": "X"}"#).is_err());
    assert!(parse_reference(ReferenceKind::Ports, b"[").is_err());
  }
}
