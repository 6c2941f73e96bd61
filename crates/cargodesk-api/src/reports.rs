//! Handler for `GET /reports/cargo`.
//!
//! List-valued filters (`hscode`, `vessel_name`, `importer_name_keywords`,
//! `goods_description_keywords`) are comma-separated.

use axum::{
  Json,
  extract::{Query, State, rejection::QueryRejection},
};
use cargodesk_core::{
  report::{DeclarationFilter, DeclarationQuery, DeclarationReport, clamp_limit},
  store::ReportStore,
};
use chrono::NaiveDate;
use serde::Deserialize;

use crate::{AppState, auth::Authenticated, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct CargoReportParams {
  pub start_date:                 NaiveDate,
  pub end_date:                   NaiveDate,
  pub country_of_origin:          Option<String>,
  pub hscode:                     Option<String>,
  /// Exact match.
  pub boe_number:                 Option<String>,
  pub importer_tin:               Option<String>,
  /// Exact match.
  pub bl_number:                  Option<String>,
  pub vessel_name:                Option<String>,
  pub importer_name_keywords:     Option<String>,
  pub goods_description_keywords: Option<String>,
  pub limit:                      Option<u32>,
}

impl CargoReportParams {
  pub fn into_query(self) -> Result<DeclarationQuery, ApiError> {
    if self.start_date > self.end_date {
      return Err(ApiError::BadRequest("start_date is after end_date".into()));
    }

    let mut filters = Vec::new();
    let single = [
      (self.country_of_origin, DeclarationFilter::OriginCountry as fn(String) -> _),
      (self.boe_number, DeclarationFilter::BoeNumber),
      (self.importer_tin, DeclarationFilter::ImporterTin),
      (self.bl_number, DeclarationFilter::BlNumber),
    ];
    for (value, filter) in single {
      if let Some(value) = non_blank(value) {
        filters.push(filter(value));
      }
    }

    let lists = [
      (self.hscode, DeclarationFilter::HsCodePrefixes as fn(Vec<String>) -> _),
      (self.vessel_name, DeclarationFilter::VesselNames),
      (self.importer_name_keywords, DeclarationFilter::ImporterNames),
      (self.goods_description_keywords, DeclarationFilter::GoodsDescriptions),
    ];
    for (value, filter) in lists {
      let values = split_list(value);
      if !values.is_empty() {
        filters.push(filter(values));
      }
    }

    Ok(DeclarationQuery {
      start_date: self.start_date,
      end_date: self.end_date,
      filters,
      limit: clamp_limit(self.limit),
    })
  }
}

fn non_blank(value: Option<String>) -> Option<String> {
  value.map(|v| v.trim().to_owned()).filter(|v| !v.is_empty())
}

fn split_list(value: Option<String>) -> Vec<String> {
  value
    .map(|s| {
      s.split(',')
        .map(|t| t.trim().to_owned())
        .filter(|t| !t.is_empty())
        .collect()
    })
    .unwrap_or_default()
}

/// `GET /reports/cargo?start_date=...&end_date=...[&filters...][&limit=...]`
pub async fn cargo<S>(
  _auth: Authenticated,
  State(state): State<AppState<S>>,
  params: Result<Query<CargoReportParams>, QueryRejection>,
) -> Result<Json<DeclarationReport>, ApiError>
where
  S: ReportStore + Clone + 'static,
{
  let Query(params) = params?;
  let query = params.into_query()?;
  let report = state.store.declaration_report(&query).await.map_err(ApiError::store)?;
  Ok(Json(report))
}

#[cfg(test)]
mod tests {
  use super::*;

  fn params() -> CargoReportParams {
    CargoReportParams {
      start_date:                 NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
      end_date:                   NaiveDate::from_ymd_opt(2024, 3, 31).unwrap(),
      country_of_origin:          None,
      hscode:                     None,
      boe_number:                 None,
      importer_tin:               None,
      bl_number:                  None,
      vessel_name:                None,
      importer_name_keywords:     None,
      goods_description_keywords: None,
      limit:                      None,
    }
  }

  #[test]
  fn params_become_filters() {
    let query = CargoReportParams {
      country_of_origin: Some(" NO ".into()),
      boe_number: Some("".into()),
      hscode: Some("0303, 1006,,".into()),
      importer_name_keywords: Some("acme".into()),
      limit: Some(10),
      ..params()
    }
    .into_query()
    .unwrap();

    assert_eq!(query.filters, vec![
      DeclarationFilter::OriginCountry("NO".into()),
      DeclarationFilter::HsCodePrefixes(vec!["0303".into(), "1006".into()]),
      DeclarationFilter::ImporterNames(vec!["acme".into()]),
    ]);
    assert_eq!(query.limit, 10);
  }

  #[test]
  fn reversed_range_is_rejected() {
    let result = CargoReportParams {
      start_date: NaiveDate::from_ymd_opt(2024, 4, 1).unwrap(),
      ..params()
    }
    .into_query();
    assert!(matches!(result, Err(ApiError::BadRequest(_))));
  }
}
