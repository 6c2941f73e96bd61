//! JSON reporting API for cargodesk.
//!
//! Exposes an axum [`Router`] backed by any [`ReportStore`]. Every reporting
//! route requires a session cookie obtained from `POST /auth/login`.

pub mod auth;
pub mod error;
pub mod manifests;
pub mod reports;
pub mod suggestions;

pub use error::ApiError;

use std::{path::PathBuf, sync::Arc};

use axum::{
  Json, Router,
  extract::State,
  routing::{get, post},
};
use cargodesk_core::store::ReportStore;
use serde::Deserialize;
use serde_json::{Value, json};

use auth::{Credentials, SessionStore};

// ─── Configuration ───────────────────────────────────────────────────────────

/// Runtime server configuration. Shares its file with the ingestion
/// settings; `CARGODESK_*` environment variables override it.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  pub host:             String,
  pub port:             u16,
  pub store_path:       PathBuf,
  pub credentials_path: PathBuf,
  pub session_ttl_secs: u64,
}

impl ServerConfig {
  pub fn load(path: &std::path::Path) -> Result<Self, config::ConfigError> {
    config::Config::builder()
      .set_default("host", "127.0.0.1")?
      .set_default("port", 8000)?
      .set_default("store_path", "cargodesk.db")?
      .set_default("credentials_path", "credentials.toml")?
      .set_default("session_ttl_secs", 8 * 60 * 60)?
      .add_source(config::File::from(path).required(false))
      .add_source(
        config::Environment::with_prefix("CARGODESK")
          .prefix_separator("_")
          .separator("__")
          .try_parsing(true),
      )
      .build()?
      .try_deserialize()
  }
}

// ─── Application state ───────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
#[derive(Clone)]
pub struct AppState<S: ReportStore> {
  pub store:       Arc<S>,
  pub credentials: Arc<Credentials>,
  pub sessions:    Arc<SessionStore>,
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// Build the API [`Router`].
pub fn router<S>(state: AppState<S>) -> Router
where
  S: ReportStore + Clone + 'static,
{
  Router::new()
    .route("/health",               get(health::<S>))
    .route("/auth/login",           post(auth::login::<S>))
    .route("/auth/logout",          post(auth::logout::<S>))
    .route("/reports/cargo",        get(reports::cargo::<S>))
    .route("/manifests/search",     get(manifests::search::<S>))
    .route("/manifests/details",    get(manifests::details::<S>))
    .route("/hscodes/suggestions",  get(suggestions::hscodes::<S>))
    .route("/suggestions/vessel",   get(suggestions::vessels::<S>))
    .route("/suggestions/importer", get(suggestions::importers::<S>))
    .with_state(state)
}

/// `GET /health`: unauthenticated; 503 when the store cannot answer.
async fn health<S>(State(state): State<AppState<S>>) -> Result<Json<Value>, ApiError>
where
  S: ReportStore + Clone + 'static,
{
  state.store.ping().await.map_err(ApiError::store)?;
  Ok(Json(json!({ "status": "ok", "service": "cargodesk" })))
}

// ─── Integration tests ───────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use std::time::Duration;

  use argon2::{Argon2, PasswordHasher, password_hash::SaltString};
  use axum::{
    body::Body,
    http::{Request, StatusCode, header},
    response::Response,
  };
  use cargodesk_core::{
    declaration::{DeclarationBatch, DeclarationRecord},
    manifest::{BillOfLading, ContainerDetail, DocumentType, ManifestHeader, ParsedManifest},
    store::IngestStore as _,
  };
  use cargodesk_store_sqlite::SqliteStore;
  use chrono::NaiveDate;
  use rand_core::OsRng;
  use tower::ServiceExt as _;

  use super::*;

  fn ymd(y: i32, m: u32, d: u32) -> NaiveDate { NaiveDate::from_ymd_opt(y, m, d).unwrap() }

  async fn seeded_store() -> SqliteStore {
    let store = SqliteStore::open_in_memory().await.unwrap();

    let record = |crn: &str, boe_no: &str, day: u32, importer: &str, hs: &str, net: f64| {
      DeclarationRecord {
        crn:       crn.into(),
        boe_no:    boe_no.into(),
        boe_date:  ymd(2024, 3, day),
        bl_number: None,
        payload:   json!({
          "boeHeader": {"crn": crn, "boeNo": boe_no, "importerName": importer,
                        "vesselName": "MSC ALPHA", "fobExchangeRate": 1},
          "boeItem": [{"hsCode": hs, "netWeight": net, "grossWeight": net, "fobAmount": 1}],
        }),
      }
    };
    store
      .ingest_declarations(DeclarationBatch {
        records: vec![
          record("C1", "1", 5, "ACME TRADING", "03038900", 100.0),
          record("C2", "2", 6, "BETA FOODS", "10063000", 50.0),
        ],
        total:   2,
        skipped: 0,
      })
      .await
      .unwrap();

    store
      .ingest_manifest(ParsedManifest {
        header:         ManifestHeader {
          crn: Some("C1".into()),
          document_type: Some(DocumentType::Home),
          vessel_name: Some("MSC ALPHA".into()),
          ..ManifestHeader::default()
        },
        bl_list:        vec![BillOfLading {
          crn:               "C1".into(),
          bl_number:         "B1".into(),
          bl_version_no:     1,
          master_bl_number:  None,
          consignee_name:    Some("ACME".into()),
          consignee_address: None,
          shipper_name:      None,
          goods_description: None,
          gross_weight:      0.0,
          volume:            0.0,
          no_of_packages:    0,
          unit:              None,
          no_of_containers:  1,
          no_of_vehicles:    0,
          imdg_codes:        None,
          bl_type:           None,
          port_of_loading:   None,
          port_of_discharge: None,
          place_of_receipt:  None,
          place_of_delivery: None,
          cargo_type:        None,
          freight_amount:    0.0,
          submitted_date:    Some(ymd(2024, 3, 2)),
        }],
        container_list: vec![ContainerDetail {
          bl_number:          "B1".into(),
          bl_version_no:      1,
          container_no:       Some("MSCU1234567".into()),
          seal_number:        None,
          container_type:     None,
          container_size:     40,
          freight_indicator:  None,
          load_status:        None,
          gross_weight:       0.0,
          number_of_packages: 0,
          unit:               None,
          iso_code:           None,
        }],
        vehicle_list:   Vec::new(),
      })
      .await
      .unwrap();
    store
  }

  async fn make_state(password: &str) -> AppState<SqliteStore> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
      .hash_password(password.as_bytes(), &salt)
      .unwrap()
      .to_string();

    AppState {
      store:       Arc::new(seeded_store().await),
      credentials: Arc::new(Credentials::from_users([("analyst".to_owned(), hash)])),
      sessions:    Arc::new(SessionStore::new(Duration::from_secs(60))),
    }
  }

  async fn send(
    state: &AppState<SqliteStore>,
    method: &str,
    uri: &str,
    cookie: Option<&str>,
    body: Option<Value>,
  ) -> Response {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(cookie) = cookie {
      builder = builder.header(header::COOKIE, cookie);
    }
    let body = match body {
      Some(json) => {
        builder = builder.header(header::CONTENT_TYPE, "application/json");
        Body::from(json.to_string())
      }
      None => Body::empty(),
    };
    router(state.clone()).oneshot(builder.body(body).unwrap()).await.unwrap()
  }

  async fn json_body(resp: Response) -> Value {
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
  }

  /// Log in and return the `name=value` pair to send back as a cookie.
  async fn login(state: &AppState<SqliteStore>) -> String {
    let resp = send(
      state,
      "POST",
      "/auth/login",
      None,
      Some(json!({"username": "analyst", "password": "secret"})),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let set_cookie = resp.headers().get(header::SET_COOKIE).unwrap().to_str().unwrap();
    assert!(set_cookie.contains("HttpOnly"), "Set-Cookie: {set_cookie}");
    set_cookie.split(';').next().unwrap().to_owned()
  }

  // ── Health & auth ──────────────────────────────────────────────────────────

  #[tokio::test]
  async fn health_needs_no_session() {
    let state = make_state("secret").await;
    let resp = send(&state, "GET", "/health", None, None).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(json_body(resp).await["status"], "ok");
  }

  #[tokio::test]
  async fn reports_require_a_session() {
    let state = make_state("secret").await;
    let uri = "/reports/cargo?start_date=2024-03-01&end_date=2024-03-31";

    let resp = send(&state, "GET", uri, None, None).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(resp).await["error"], "authentication required");

    let forged = format!("{}=deadbeef", auth::SESSION_COOKIE);
    let resp = send(&state, "GET", uri, Some(&forged), None).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
  }

  #[tokio::test]
  async fn wrong_password_is_rejected() {
    let state = make_state("secret").await;
    let resp = send(
      &state,
      "POST",
      "/auth/login",
      None,
      Some(json!({"username": "analyst", "password": "guess"})),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert!(resp.headers().get(header::SET_COOKIE).is_none());
  }

  #[tokio::test]
  async fn logout_ends_the_session() {
    let state = make_state("secret").await;
    let cookie = login(&state).await;

    let resp = send(&state, "POST", "/auth/logout", Some(&cookie), None).await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let resp = send(&state, "GET", "/suggestions/vessel?keyword=msc", Some(&cookie), None).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
  }

  // ── Reports ────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn cargo_report_with_filters() {
    let state = make_state("secret").await;
    let cookie = login(&state).await;

    let uri = "/reports/cargo?start_date=2024-03-01&end_date=2024-03-31";
    let body = json_body(send(&state, "GET", uri, Some(&cookie), None).await).await;
    assert_eq!(body["summary"]["total_records"], 2);
    assert_eq!(body["summary"]["top_cards"]["importer_by_net_weight"]["name"], "ACME TRADING");
    assert_eq!(body["records"][0]["boe_no"], "2");

    let uri = "/reports/cargo?start_date=2024-03-01&end_date=2024-03-31&hscode=1006,9999";
    let body = json_body(send(&state, "GET", uri, Some(&cookie), None).await).await;
    assert_eq!(body["summary"]["total_records"], 1);
    assert_eq!(body["records"][0]["boeHeader"]["importerName"], "BETA FOODS");
  }

  #[tokio::test]
  async fn cargo_report_rejects_bad_params() {
    let state = make_state("secret").await;
    let cookie = login(&state).await;

    let resp = send(&state, "GET", "/reports/cargo?end_date=2024-03-31", Some(&cookie), None).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert!(json_body(resp).await["error"].is_string());

    let uri = "/reports/cargo?start_date=2024-04-01&end_date=2024-03-01";
    let resp = send(&state, "GET", uri, Some(&cookie), None).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
  }

  #[tokio::test]
  async fn manifest_search_and_details() {
    let state = make_state("secret").await;
    let cookie = login(&state).await;

    let uri = "/manifests/search?submitted_start_date=2024-03-01&submitted_end_date=2024-03-31&crn=c1";
    let body = json_body(send(&state, "GET", uri, Some(&cookie), None).await).await;
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["bill_of_lading"]["bl_number"], "B1");
    assert_eq!(body[0]["manifest"]["vessel_name"], "MSC ALPHA");

    let uri = "/manifests/details?bl_number=B1&bl_version_no=1";
    let body = json_body(send(&state, "GET", uri, Some(&cookie), None).await).await;
    assert_eq!(body["containers"][0]["container_no"], "MSCU1234567");

    let uri = "/manifests/details?bl_number=B1&bl_version_no=2";
    let resp = send(&state, "GET", uri, Some(&cookie), None).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
  }

  #[tokio::test]
  async fn suggestions_enforce_minimum_length() {
    let state = make_state("secret").await;
    let cookie = login(&state).await;

    let resp = send(&state, "GET", "/hscodes/suggestions?prefix=030", Some(&cookie), None).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = send(&state, "GET", "/hscodes/suggestions?prefix=0303", Some(&cookie), None).await;
    assert_eq!(json_body(resp).await[0]["hscode"], "03038900");

    let resp = send(&state, "GET", "/suggestions/importer?keyword=fo", Some(&cookie), None).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = send(&state, "GET", "/suggestions/importer?keyword=foo", Some(&cookie), None).await;
    assert_eq!(json_body(resp).await[0]["name"], "BETA FOODS");

    let resp = send(&state, "GET", "/suggestions/vessel?keyword=msc", Some(&cookie), None).await;
    assert_eq!(json_body(resp).await[0]["name"], "MSC ALPHA");
  }

  #[test]
  fn server_config_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = ServerConfig::load(&dir.path().join("absent.toml")).unwrap();
    assert_eq!(cfg.port, 8000);
    assert_eq!(cfg.session_ttl_secs, 8 * 60 * 60);
    assert_eq!(cfg.credentials_path, PathBuf::from("credentials.toml"));
  }
}
