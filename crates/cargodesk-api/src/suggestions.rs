//! Autocomplete handlers.

use axum::{
  Json,
  extract::{Query, State, rejection::QueryRejection},
};
use cargodesk_core::{
  report::{HSCODE_PREFIX_MIN, HsCodeSuggestion, ImporterSuggestion, KEYWORD_MIN, VesselSuggestion},
  store::ReportStore,
};
use serde::Deserialize;

use crate::{AppState, auth::Authenticated, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct PrefixParams {
  pub prefix: String,
}

#[derive(Debug, Deserialize)]
pub struct KeywordParams {
  pub keyword: String,
}

/// The trimmed value, if it has at least `min` characters.
fn at_least(name: &str, value: &str, min: usize) -> Result<String, ApiError> {
  let value = value.trim();
  if value.chars().count() < min {
    return Err(ApiError::BadRequest(format!(
      "{name} must be at least {min} characters"
    )));
  }
  Ok(value.to_owned())
}

/// `GET /hscodes/suggestions?prefix=0303`
pub async fn hscodes<S>(
  _auth: Authenticated,
  State(state): State<AppState<S>>,
  params: Result<Query<PrefixParams>, QueryRejection>,
) -> Result<Json<Vec<HsCodeSuggestion>>, ApiError>
where
  S: ReportStore + Clone + 'static,
{
  let Query(p) = params?;
  let prefix = at_least("prefix", &p.prefix, HSCODE_PREFIX_MIN)?;
  let rows = state.store.hscode_suggestions(prefix).await.map_err(ApiError::store)?;
  Ok(Json(rows))
}

/// `GET /suggestions/vessel?keyword=msc`: vessel names starting with the
/// keyword.
pub async fn vessels<S>(
  _auth: Authenticated,
  State(state): State<AppState<S>>,
  params: Result<Query<KeywordParams>, QueryRejection>,
) -> Result<Json<Vec<VesselSuggestion>>, ApiError>
where
  S: ReportStore + Clone + 'static,
{
  let Query(p) = params?;
  let keyword = at_least("keyword", &p.keyword, KEYWORD_MIN)?;
  let rows = state.store.vessel_suggestions(keyword).await.map_err(ApiError::store)?;
  Ok(Json(rows))
}

/// `GET /suggestions/importer?keyword=acme`: importer names containing the
/// keyword.
pub async fn importers<S>(
  _auth: Authenticated,
  State(state): State<AppState<S>>,
  params: Result<Query<KeywordParams>, QueryRejection>,
) -> Result<Json<Vec<ImporterSuggestion>>, ApiError>
where
  S: ReportStore + Clone + 'static,
{
  let Query(p) = params?;
  let keyword = at_least("keyword", &p.keyword, KEYWORD_MIN)?;
  let rows = state.store.importer_suggestions(keyword).await.map_err(ApiError::store)?;
  Ok(Json(rows))
}
