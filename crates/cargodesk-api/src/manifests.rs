//! Handlers for `GET /manifests/search` and `GET /manifests/details`.

use axum::{
  Json,
  extract::{Query, State, rejection::QueryRejection},
};
use cargodesk_core::{
  report::{ManifestDetails, ManifestQuery, ManifestSearchRow, clamp_limit},
  store::ReportStore,
};
use chrono::NaiveDate;
use serde::Deserialize;

use crate::{AppState, auth::Authenticated, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct ManifestSearchParams {
  pub submitted_start_date: NaiveDate,
  pub submitted_end_date:   NaiveDate,
  pub crn:                  Option<String>,
  pub rotation_no:          Option<String>,
  pub vessel_name:          Option<String>,
  pub agent_name:           Option<String>,
  pub bl_number:            Option<String>,
  pub limit:                Option<u32>,
}

/// `GET /manifests/search?submitted_start_date=...&submitted_end_date=...`
///
/// Only the latest version of each BL is returned; text filters are
/// case-insensitive partial matches.
pub async fn search<S>(
  _auth: Authenticated,
  State(state): State<AppState<S>>,
  params: Result<Query<ManifestSearchParams>, QueryRejection>,
) -> Result<Json<Vec<ManifestSearchRow>>, ApiError>
where
  S: ReportStore + Clone + 'static,
{
  let Query(p) = params?;
  if p.submitted_start_date > p.submitted_end_date {
    return Err(ApiError::BadRequest(
      "submitted_start_date is after submitted_end_date".into(),
    ));
  }

  let query = ManifestQuery {
    submitted_from: p.submitted_start_date,
    submitted_to:   p.submitted_end_date,
    crn:            p.crn,
    rotation_no:    p.rotation_no,
    vessel_name:    p.vessel_name,
    agent_name:     p.agent_name,
    bl_number:      p.bl_number,
    limit:          clamp_limit(p.limit),
  };
  let rows = state.store.manifest_search(&query).await.map_err(ApiError::store)?;
  Ok(Json(rows))
}

#[derive(Debug, Deserialize)]
pub struct ManifestDetailsParams {
  pub bl_number:     String,
  pub bl_version_no: i64,
}

/// `GET /manifests/details?bl_number=...&bl_version_no=...`
pub async fn details<S>(
  _auth: Authenticated,
  State(state): State<AppState<S>>,
  params: Result<Query<ManifestDetailsParams>, QueryRejection>,
) -> Result<Json<ManifestDetails>, ApiError>
where
  S: ReportStore + Clone + 'static,
{
  let Query(p) = params?;
  let details = state
    .store
    .manifest_details(p.bl_number.clone(), p.bl_version_no)
    .await
    .map_err(ApiError::store)?;

  if details.is_empty() {
    return Err(ApiError::NotFound(format!(
      "no container or vehicle details for BL {} version {}",
      p.bl_number, p.bl_version_no
    )));
  }
  Ok(Json(details))
}
