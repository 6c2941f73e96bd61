//! Field coercion helpers shared by every document parser.
//!
//! Source documents are produced by several upstream systems and regularly
//! carry blank, misspelt, or badly formatted values. Every helper here takes
//! the raw text (if any) and returns either a typed value or the caller's
//! default. None of them fail.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use serde_json::Value;

// ─── Text ────────────────────────────────────────────────────────────────────

/// Trimmed text, or `default` when the value is absent or blank.
pub fn text(value: Option<&str>, default: &str) -> String {
  opt_text(value).unwrap_or_else(|| default.to_owned())
}

/// Trimmed text, or `None` when the value is absent or blank.
///
/// Blank strings collapse to `None` so that a merge never overwrites stored
/// data with an empty value.
pub fn opt_text(value: Option<&str>) -> Option<String> {
  value
    .map(str::trim)
    .filter(|s| !s.is_empty())
    .map(str::to_owned)
}

/// Render a JSON scalar as text. Strings are trimmed; numbers and booleans
/// use their canonical form. Objects, arrays, `null` and blank strings give
/// `None`.
pub fn json_text(value: Option<&Value>) -> Option<String> {
  match value? {
    Value::String(s) => opt_text(Some(s)),
    Value::Number(n) => Some(n.to_string()),
    Value::Bool(b) => Some(b.to_string()),
    _ => None,
  }
}

// ─── Numbers ─────────────────────────────────────────────────────────────────

/// Integer value, accepting float-formatted integers such as `"12.0"`.
/// Fractional values truncate toward zero.
pub fn int(value: Option<&str>, default: i64) -> i64 {
  let Some(s) = value.map(str::trim).filter(|s| !s.is_empty()) else {
    return default;
  };
  if let Ok(n) = s.parse::<i64>() {
    return n;
  }
  match s.parse::<f64>() {
    Ok(f) if f.is_finite() && f.abs() < i64::MAX as f64 => f.trunc() as i64,
    _ => default,
  }
}

/// Finite float value, or `None`.
pub fn opt_float(value: Option<&str>) -> Option<f64> {
  value
    .map(str::trim)
    .filter(|s| !s.is_empty())
    .and_then(|s| s.parse::<f64>().ok())
    .filter(|f| f.is_finite())
}

/// Finite float value, or `default`.
pub fn float(value: Option<&str>, default: f64) -> f64 {
  opt_float(value).unwrap_or(default)
}

// ─── Dates ───────────────────────────────────────────────────────────────────

/// Calendar date from `YYYYMMDD` (only the first eight characters are read,
/// so `20240115103000` works), `DD/MM/YYYY`, or `YYYY-MM-DD`.
pub fn date(value: Option<&str>) -> Option<NaiveDate> {
  let s = value.map(str::trim).filter(|s| !s.is_empty())?;

  if s.contains('/') {
    return NaiveDate::parse_from_str(s, "%d/%m/%Y").ok();
  }
  if s.contains('-') {
    return NaiveDate::parse_from_str(s.get(..10)?, "%Y-%m-%d").ok();
  }

  let digits = s.get(..8)?;
  if !digits.bytes().all(|b| b.is_ascii_digit()) {
    return None;
  }
  NaiveDate::parse_from_str(digits, "%Y%m%d").ok()
}

/// Calendar date from `DD/MM/YYYY` only.
pub fn dmy_date(value: Option<&str>) -> Option<NaiveDate> {
  NaiveDate::parse_from_str(value?.trim(), "%d/%m/%Y").ok()
}

/// Timestamp from RFC 3339 (`2024-01-15T10:30:00Z`), `YYYY-MM-DD HH:MM:SS`
/// with an optional fractional part, `YYYY-MM-DDTHH:MM:SS`, a bare
/// `YYYY-MM-DD`, or a bare `YYYYMMDD` (midnight). Offsets are normalised to
/// UTC.
pub fn timestamp(value: Option<&str>) -> Option<NaiveDateTime> {
  let s = value.map(str::trim).filter(|s| !s.is_empty())?;

  if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
    return Some(dt.naive_utc());
  }

  let base = s.split('.').next().unwrap_or(s).trim();

  if base.len() == 8 && base.bytes().all(|b| b.is_ascii_digit()) {
    return NaiveDate::parse_from_str(base, "%Y%m%d")
      .ok()
      .map(|d| d.and_time(NaiveTime::MIN));
  }

  for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
    if let Ok(dt) = NaiveDateTime::parse_from_str(base, fmt) {
      return Some(dt);
    }
  }

  NaiveDate::parse_from_str(base, "%Y-%m-%d")
    .ok()
    .map(|d| d.and_time(NaiveTime::MIN))
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
  }

  #[test]
  fn text_trims_and_defaults() {
    assert_eq!(text(Some("  MAERSK  "), ""), "MAERSK");
    assert_eq!(text(Some("   "), "n/a"), "n/a");
    assert_eq!(text(None, "n/a"), "n/a");
    assert_eq!(opt_text(Some("")), None);
  }

  #[test]
  fn json_text_accepts_scalars_only() {
    assert_eq!(json_text(Some(&json!("100"))), Some("100".into()));
    assert_eq!(json_text(Some(&json!(100))), Some("100".into()));
    assert_eq!(json_text(Some(&json!(" "))), None);
    assert_eq!(json_text(Some(&json!(null))), None);
    assert_eq!(json_text(Some(&json!({"a": 1}))), None);
    assert_eq!(json_text(None), None);
  }

  #[test]
  fn int_accepts_float_formatting() {
    assert_eq!(int(Some("12"), 0), 12);
    assert_eq!(int(Some("12.0"), 0), 12);
    assert_eq!(int(Some("12.9"), 0), 12);
    assert_eq!(int(Some("twelve"), -1), -1);
    assert_eq!(int(Some(""), 7), 7);
    assert_eq!(int(None, 7), 7);
    assert_eq!(int(Some("NaN"), 3), 3);
  }

  #[test]
  fn float_rejects_garbage() {
    assert_eq!(float(Some("1500.25"), 0.0), 1500.25);
    assert_eq!(float(Some("1,500"), 0.0), 0.0);
    assert_eq!(opt_float(Some("inf")), None);
    assert_eq!(opt_float(None), None);
  }

  #[test]
  fn date_formats() {
    assert_eq!(date(Some("20240115")), Some(ymd(2024, 1, 15)));
    assert_eq!(date(Some("20240115103000")), Some(ymd(2024, 1, 15)));
    assert_eq!(date(Some("15/01/2024")), Some(ymd(2024, 1, 15)));
    assert_eq!(date(Some("2024-01-15")), Some(ymd(2024, 1, 15)));
    assert_eq!(date(Some("2024-01-15 10:30:00")), Some(ymd(2024, 1, 15)));
    assert_eq!(date(Some("20241345")), None);
    assert_eq!(date(Some("2024")), None);
    assert_eq!(date(Some("31/02/2024")), None);
    assert_eq!(date(None), None);
  }

  #[test]
  fn dmy_only() {
    assert_eq!(dmy_date(Some(" 05/03/2024 ")), Some(ymd(2024, 3, 5)));
    assert_eq!(dmy_date(Some("2024-03-05")), None);
    assert_eq!(dmy_date(None), None);
  }

  #[test]
  fn timestamp_formats() {
    let expected = ymd(2024, 1, 15).and_hms_opt(10, 30, 0).unwrap();
    assert_eq!(timestamp(Some("2024-01-15 10:30:00")), Some(expected));
    assert_eq!(timestamp(Some("2024-01-15 10:30:00.0")), Some(expected));
    assert_eq!(timestamp(Some("2024-01-15T10:30:00")), Some(expected));
    assert_eq!(timestamp(Some("2024-01-15T10:30:00Z")), Some(expected));
    assert_eq!(
      timestamp(Some("2024-01-15T12:30:00+02:00")),
      Some(expected)
    );
    assert_eq!(
      timestamp(Some("20240115")),
      Some(ymd(2024, 1, 15).and_time(NaiveTime::MIN))
    );
    assert_eq!(timestamp(Some("yesterday")), None);
    assert_eq!(timestamp(Some("  ")), None);
  }
}
