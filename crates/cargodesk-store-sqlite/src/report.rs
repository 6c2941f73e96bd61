//! [`ReportStore`] implementation: read-only reporting queries.

use cargodesk_core::{
  declaration::{HEADER_KEY, ITEMS_KEY},
  report::{
    DeclarationQuery, DeclarationReport, HsCodeSuggestion, ImporterSuggestion,
    ManifestDetails, ManifestQuery, ManifestSearchRow, ReportSummary, SUGGESTION_LIMIT,
    TopCard, TopCards, VesselSuggestion,
  },
  store::ReportStore,
};
use rusqlite::{Connection, OptionalExtension as _, params, params_from_iter, types::Value};
use serde_json::Value as Json;

use crate::{
  Result, SqliteStore,
  encode::{
    BL_COLUMNS, CONTAINER_COLUMNS, RawBillOfLading, RawManifestSummary, SUMMARY_COLUMN_COUNT,
    SUMMARY_COLUMNS, container_from_row, encode_date, vehicle_from_row,
  },
  filter::{Predicate, contains, declaration_predicate, escape_like, header_field},
};

// ─── SQL fragments ───────────────────────────────────────────────────────────

/// Numeric field of the line item bound as `item`.
fn item_number(field: &str) -> String {
  format!("CAST(json_extract(item.value, '$.{field}') AS REAL)")
}

/// Per-declaration sum of `expr` over its line items.
fn items_sum(expr: &str) -> String {
  format!("(SELECT SUM({expr}) FROM json_each(d.payload, '$.{ITEMS_KEY}') AS item)")
}

/// FOB amount of the item bound as `item`, in local currency.
fn item_value() -> String {
  format!(
    "{} * CAST({} AS REAL)",
    item_number("fobAmount"),
    header_field("fobExchangeRate")
  )
}

/// Leading importer for the per-item `metric`.
fn top_importer_sql(predicate: &str, metric: &str) -> String {
  let importer = header_field("importerName");
  format!(
    "SELECT CAST({importer} AS TEXT) AS name, COALESCE(SUM({}), 0.0) AS total
     FROM declarations d
     WHERE {predicate} AND {importer} IS NOT NULL
     GROUP BY 1 ORDER BY total DESC LIMIT 1",
    items_sum(metric)
  )
}

/// Leading HS code for the per-item `metric`.
fn top_hscode_sql(predicate: &str, metric: &str) -> String {
  format!(
    "SELECT CAST(json_extract(item.value, '$.hsCode') AS TEXT) AS name,
            COALESCE(SUM({metric}), 0.0) AS total
     FROM declarations d, json_each(d.payload, '$.{ITEMS_KEY}') AS item
     WHERE {predicate} AND json_extract(item.value, '$.hsCode') IS NOT NULL
     GROUP BY 1 ORDER BY total DESC LIMIT 1"
  )
}

fn top_card(conn: &Connection, sql: &str, params: &[Value]) -> rusqlite::Result<Option<TopCard>> {
  conn
    .query_row(sql, params_from_iter(params), |row| {
      Ok(TopCard { name: row.get(0)?, total: row.get(1)? })
    })
    .optional()
}

// ─── Declaration report ──────────────────────────────────────────────────────

struct RawRecord {
  payload:      String,
  boe_no:       String,
  boe_date:     String,
  bl_number:    Option<String>,
  net_weight:   Option<f64>,
  gross_weight: Option<f64>,
  items:        Option<i64>,
}

impl RawRecord {
  /// The stored payload with identifying columns and calculated totals
  /// injected.
  fn into_json(self) -> Result<Json> {
    let mut payload: Json = serde_json::from_str(&self.payload)?;
    let totals = [
      ("calculatedTotalNetWeight", Json::from(self.net_weight.unwrap_or(0.0))),
      ("calculatedTotalGrossWeight", Json::from(self.gross_weight.unwrap_or(0.0))),
      ("calculatedTotalItems", Json::from(self.items.unwrap_or(0))),
    ];

    if let Json::Object(record) = &mut payload {
      record.insert("boe_no".into(), Json::String(self.boe_no));
      record.insert("boe_date".into(), Json::String(self.boe_date));
      record.insert("bl_number".into(), self.bl_number.map_or(Json::Null, Json::String));

      let totals = totals.map(|(key, value)| (key.to_owned(), value));
      match record.get_mut(HEADER_KEY) {
        Some(Json::Object(header)) => header.extend(totals),
        _ => record.extend(totals),
      }
    }
    Ok(payload)
  }
}

fn run_declaration_report(
  conn: &Connection,
  predicate: &Predicate,
  limit: u32,
) -> rusqlite::Result<(ReportSummary, Vec<RawRecord>)> {
  let Predicate { sql: pred, params } = predicate;
  let net = item_number("netWeight");
  let gross = item_number("grossWeight");

  let (total_records, net_total, gross_total): (i64, f64, f64) = conn.query_row(
    &format!(
      "SELECT COUNT(*), COALESCE(SUM({}), 0.0), COALESCE(SUM({}), 0.0)
       FROM declarations d WHERE {pred}",
      items_sum(&net),
      items_sum(&gross),
    ),
    params_from_iter(params),
    |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
  )?;

  let mut summary = ReportSummary {
    total_records:            total_records as u64,
    grand_total_net_weight:   net_total,
    grand_total_gross_weight: gross_total,
    top_cards:                TopCards::default(),
  };
  if total_records == 0 {
    return Ok((summary, Vec::new()));
  }

  let value = item_value();
  summary.top_cards = TopCards {
    importer_by_net_weight:   top_card(conn, &top_importer_sql(pred, &net), params)?,
    importer_by_gross_weight: top_card(conn, &top_importer_sql(pred, &gross), params)?,
    importer_by_value:        top_card(conn, &top_importer_sql(pred, &value), params)?,
    hscode_by_net_weight:     top_card(conn, &top_hscode_sql(pred, &net), params)?,
    hscode_by_gross_weight:   top_card(conn, &top_hscode_sql(pred, &gross), params)?,
    hscode_by_value:          top_card(conn, &top_hscode_sql(pred, &value), params)?,
  };

  let mut stmt = conn.prepare(&format!(
    "SELECT d.payload, d.boe_no, d.boe_date, d.bl_number, {}, {},
            json_array_length(d.payload, '$.{ITEMS_KEY}')
     FROM declarations d
     WHERE {pred}
     ORDER BY d.boe_date DESC, d.id DESC
     LIMIT ?",
    items_sum(&net),
    items_sum(&gross),
  ))?;
  let bound = params.iter().cloned().chain([Value::Integer(i64::from(limit))]);
  let records = stmt
    .query_map(params_from_iter(bound), |row| {
      Ok(RawRecord {
        payload:      row.get(0)?,
        boe_no:       row.get(1)?,
        boe_date:     row.get(2)?,
        bl_number:    row.get(3)?,
        net_weight:   row.get(4)?,
        gross_weight: row.get(5)?,
        items:        row.get(6)?,
      })
    })?
    .collect::<rusqlite::Result<Vec<_>>>()?;

  Ok((summary, records))
}

// ─── Manifest search ─────────────────────────────────────────────────────────

fn manifest_search_sql(query: &ManifestQuery) -> (String, Vec<Value>) {
  let mut sql = format!(
    "SELECT {SUMMARY_COLUMNS}, {BL_COLUMNS}
     FROM manifest_headers h
     JOIN bills_of_lading b ON b.crn = h.crn
     WHERE b.latest_bl = 1 AND b.submitted_date BETWEEN ? AND ?"
  );
  let mut params = vec![
    Value::Text(encode_date(query.submitted_from)),
    Value::Text(encode_date(query.submitted_to)),
  ];

  let partial = [
    ("h.crn", &query.crn),
    ("h.rotation_no", &query.rotation_no),
    ("h.vessel_name", &query.vessel_name),
    ("h.agent_name", &query.agent_name),
    ("b.bl_number", &query.bl_number),
  ];
  for (column, value) in partial {
    if let Some(value) = value.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
      sql.push_str(&format!(" AND {column} LIKE ? ESCAPE '\\'"));
      params.push(Value::Text(contains(value)));
    }
  }

  sql.push_str(" ORDER BY h.last_amended_at DESC, b.bl_number LIMIT ?");
  params.push(Value::Integer(i64::from(query.limit)));
  (sql, params)
}

// ─── ReportStore impl ────────────────────────────────────────────────────────

impl ReportStore for SqliteStore {
  type Error = crate::Error;

  async fn ping(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.query_row("SELECT 1", [], |_| Ok(()))?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn declaration_report<'a>(&'a self, query: &'a DeclarationQuery) -> Result<DeclarationReport> {
    let predicate = declaration_predicate(query);
    let limit = query.limit;

    let (summary, raws) = self
      .conn
      .call(move |conn| Ok(run_declaration_report(conn, &predicate, limit)?))
      .await?;

    let records = raws.into_iter().map(RawRecord::into_json).collect::<Result<Vec<_>>>()?;
    Ok(DeclarationReport { summary, records })
  }

  async fn manifest_search<'a>(&'a self, query: &'a ManifestQuery) -> Result<Vec<ManifestSearchRow>> {
    let (sql, params) = manifest_search_sql(query);

    let raws: Vec<(RawManifestSummary, RawBillOfLading)> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(params_from_iter(params), |row| {
            Ok((
              RawManifestSummary::from_row(row)?,
              RawBillOfLading::from_row(row, SUMMARY_COLUMN_COUNT)?,
            ))
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws
      .into_iter()
      .map(|(summary, bl)| {
        Ok(ManifestSearchRow {
          manifest:       summary.into_summary()?,
          bill_of_lading: bl.into_bill_of_lading()?.0,
        })
      })
      .collect()
  }

  async fn manifest_details(&self, bl_number: String, bl_version_no: i64) -> Result<ManifestDetails> {
    let details = self
      .conn
      .call(move |conn| {
        let containers = conn
          .prepare(&format!(
            "SELECT {CONTAINER_COLUMNS} FROM bl_containers
             WHERE bl_number = ?1 AND bl_version_no = ?2 ORDER BY id"
          ))?
          .query_map(params![bl_number, bl_version_no], container_from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        let vehicles = conn
          .prepare(
            "SELECT bl_number, bl_version_no, chassis_no, model, make FROM bl_vehicles
             WHERE bl_number = ?1 AND bl_version_no = ?2 ORDER BY id",
          )?
          .query_map(params![bl_number, bl_version_no], vehicle_from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(ManifestDetails { containers, vehicles })
      })
      .await?;
    Ok(details)
  }

  async fn hscode_suggestions(&self, prefix: String) -> Result<Vec<HsCodeSuggestion>> {
    let pattern = format!("{}%", escape_like(prefix.trim()));

    let rows = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT DISTINCT codes.hscode, json_extract(c.data, '$.Description')
           FROM (
             SELECT DISTINCT CAST(json_extract(item.value, '$.hsCode') AS TEXT) AS hscode
             FROM declarations d, json_each(d.payload, '$.boeItem') AS item
             WHERE json_extract(item.value, '$.hsCode') IS NOT NULL
           ) AS codes
           LEFT JOIN commodity_groups c ON c.hscode = codes.hscode
           WHERE codes.hscode LIKE ?1 ESCAPE '\\'
           ORDER BY codes.hscode
           LIMIT ?2",
        )?;
        let rows = stmt
          .query_map(params![pattern, SUGGESTION_LIMIT], |row| {
            Ok(HsCodeSuggestion { hscode: row.get(0)?, description: row.get(1)? })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(rows)
  }

  async fn vessel_suggestions(&self, prefix: String) -> Result<Vec<VesselSuggestion>> {
    let pattern = format!("{}%", escape_like(prefix.trim()));
    let vessel = header_field("vesselName");
    let nationality = header_field("vesselNationality");
    let sql = format!(
      "SELECT DISTINCT CAST({vessel} AS TEXT), CAST({nationality} AS TEXT)
       FROM declarations d
       WHERE {vessel} LIKE ?1 ESCAPE '\\'
       ORDER BY 1
       LIMIT ?2"
    );

    let rows = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(params![pattern, SUGGESTION_LIMIT], |row| {
            Ok(VesselSuggestion { name: row.get(0)?, vessel_nationality: row.get(1)? })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(rows)
  }

  async fn importer_suggestions(&self, keyword: String) -> Result<Vec<ImporterSuggestion>> {
    let pattern = contains(keyword.trim());
    let importer = header_field("importerName");
    let tin = header_field("importerTin");
    let sql = format!(
      "SELECT DISTINCT CAST({importer} AS TEXT), CAST({tin} AS TEXT)
       FROM declarations d
       WHERE {importer} LIKE ?1 ESCAPE '\\'
       ORDER BY 1
       LIMIT ?2"
    );

    let rows = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(params![pattern, SUGGESTION_LIMIT], |row| {
            Ok(ImporterSuggestion { name: row.get(0)?, importer_tin: row.get(1)? })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(rows)
  }
}
