//! Builds the `WHERE` clause for declaration reports.
//!
//! Payload fields are addressed with SQLite's JSON functions; line-item
//! filters use `EXISTS` over `json_each`. Every user value becomes a bound
//! parameter. `LIKE` in SQLite is case-insensitive for ASCII, which gives the
//! partial-match filters their case-insensitivity.

use cargodesk_core::{
  declaration::{HEADER_KEY, ITEMS_KEY},
  report::{DeclarationFilter, DeclarationQuery, HSCODE_PREFIX_MAX, HSCODE_PREFIX_MIN},
};
use rusqlite::types::Value;

use crate::encode::encode_date;

/// A SQL predicate over the `declarations` table aliased `d`, with its
/// positional parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
  pub sql:    String,
  pub params: Vec<Value>,
}

/// Translate a declaration query into a predicate. Filters whose value lists
/// end up empty (e.g. only too-short HS codes) are left out.
pub fn declaration_predicate(query: &DeclarationQuery) -> Predicate {
  let mut clauses = vec!["d.boe_date BETWEEN ? AND ?".to_owned()];
  let mut params = vec![
    Value::Text(encode_date(query.start_date)),
    Value::Text(encode_date(query.end_date)),
  ];

  for filter in &query.filters {
    match filter {
      DeclarationFilter::BoeNumber(boe_no) => {
        clauses.push("d.boe_no = ?".into());
        params.push(Value::Text(boe_no.clone()));
      }
      DeclarationFilter::BlNumber(bl) => {
        clauses.push("d.bl_number = ?".into());
        params.push(Value::Text(bl.clone()));
      }
      DeclarationFilter::ImporterTin(tin) => {
        clauses.push(format!("{} = ?", header_field("importerTin")));
        params.push(Value::Text(tin.clone()));
      }
      DeclarationFilter::OriginCountry(country) => {
        clauses.push(any_item("json_extract(item.value, '$.itemOriginCountry') = ?"));
        params.push(Value::Text(country.clone()));
      }
      DeclarationFilter::HsCodePrefixes(codes) => {
        let prefixes: Vec<String> = codes
          .iter()
          .map(|c| c.trim())
          .filter(|c| c.chars().count() >= HSCODE_PREFIX_MIN)
          .map(|c| c.chars().take(HSCODE_PREFIX_MAX).collect())
          .collect();
        push_any(
          &mut clauses,
          &mut params,
          &prefixes,
          &any_item("json_extract(item.value, '$.hsCode') LIKE ? ESCAPE '\\'"),
          |p| format!("{}%", escape_like(p)),
        );
      }
      DeclarationFilter::VesselNames(keywords) => push_any(
        &mut clauses,
        &mut params,
        &non_blank(keywords),
        &format!("{} LIKE ? ESCAPE '\\'", header_field("vesselName")),
        contains,
      ),
      DeclarationFilter::ImporterNames(keywords) => push_any(
        &mut clauses,
        &mut params,
        &non_blank(keywords),
        &format!("{} LIKE ? ESCAPE '\\'", header_field("importerName")),
        contains,
      ),
      DeclarationFilter::GoodsDescriptions(keywords) => push_any(
        &mut clauses,
        &mut params,
        &non_blank(keywords),
        &any_item("json_extract(item.value, '$.goodsDescription') LIKE ? ESCAPE '\\'"),
        contains,
      ),
    }
  }

  Predicate { sql: clauses.join(" AND "), params }
}

/// `json_extract` of a field in the payload's header object.
pub fn header_field(field: &str) -> String {
  format!("json_extract(d.payload, '$.{HEADER_KEY}.{field}')")
}

/// `EXISTS` over the payload's line items, binding each as `item`.
fn any_item(condition: &str) -> String {
  format!(
    "EXISTS (SELECT 1 FROM json_each(d.payload, '$.{ITEMS_KEY}') AS item WHERE {condition})"
  )
}

/// Push `(clause OR clause ...)` with one parameter per value.
fn push_any(
  clauses: &mut Vec<String>,
  params: &mut Vec<Value>,
  values: &[String],
  clause: &str,
  bind: impl Fn(&str) -> String,
) {
  if values.is_empty() {
    return;
  }
  let alternatives: Vec<&str> = values.iter().map(|_| clause).collect();
  clauses.push(format!("({})", alternatives.join(" OR ")));
  params.extend(values.iter().map(|v| Value::Text(bind(v))));
}

fn non_blank(values: &[String]) -> Vec<String> {
  values
    .iter()
    .map(|v| v.trim())
    .filter(|v| !v.is_empty())
    .map(str::to_owned)
    .collect()
}

/// `%keyword%` with `LIKE` wildcards in the keyword escaped.
pub fn contains(keyword: &str) -> String { format!("%{}%", escape_like(keyword)) }

/// Escape `%`, `_` and the escape character itself for `LIKE ... ESCAPE '\'`.
pub fn escape_like(s: &str) -> String {
  let mut out = String::with_capacity(s.len());
  for c in s.chars() {
    if matches!(c, '%' | '_' | '\\') {
      out.push('\\');
    }
    out.push(c);
  }
  out
}
