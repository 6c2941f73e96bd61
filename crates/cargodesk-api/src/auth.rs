//! Session-cookie authentication against a static credential file.
//!
//! The credential file is TOML:
//!
//! ```toml
//! [[users]]
//! username      = "analyst"
//! password_hash = "$argon2id$v=19$..."
//! ```
//!
//! A successful `POST /auth/login` sets an HTTP-only cookie holding a random
//! session token. Only the SHA-256 of each token is kept server-side.

use std::{
  collections::HashMap,
  path::Path,
  sync::{Mutex, PoisonError},
  time::{Duration, Instant},
};

use argon2::{Argon2, PasswordHash, PasswordVerifier};
use axum::{
  Json,
  extract::{FromRequestParts, State, rejection::JsonRejection},
  http::{StatusCode, request::Parts},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use cargodesk_core::store::ReportStore;
use rand_core::{OsRng, RngCore};
use serde::Deserialize;
use serde_json::{Value, json};
use sha2::{Digest, Sha256};

use crate::{AppState, error::ApiError};

pub const SESSION_COOKIE: &str = "cargodesk_session";

// ─── Credentials ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
struct CredentialFile {
  #[serde(default)]
  users: Vec<UserEntry>,
}

#[derive(Debug, Clone, Deserialize)]
struct UserEntry {
  username:      String,
  /// PHC string produced by argon2, e.g. `$argon2id$v=19$…`
  password_hash: String,
}

/// Usernames and their argon2 password hashes.
#[derive(Debug, Clone, Default)]
pub struct Credentials {
  users: HashMap<String, String>,
}

impl Credentials {
  pub fn load(path: &Path) -> Result<Self, config::ConfigError> {
    let file: CredentialFile = config::Config::builder()
      .add_source(config::File::from(path))
      .build()?
      .try_deserialize()?;
    Ok(Self::from_users(
      file.users.into_iter().map(|u| (u.username, u.password_hash)),
    ))
  }

  pub fn from_users(users: impl IntoIterator<Item = (String, String)>) -> Self {
    Self { users: users.into_iter().collect() }
  }

  pub fn is_empty(&self) -> bool { self.users.is_empty() }

  /// Whether `password` matches the stored hash for `username`.
  pub fn verify(&self, username: &str, password: &str) -> bool {
    let Some(hash) = self.users.get(username) else {
      return false;
    };
    let Ok(parsed) = PasswordHash::new(hash) else {
      tracing::warn!(username, "stored password hash is not a valid PHC string");
      return false;
    };
    Argon2::default()
      .verify_password(password.as_bytes(), &parsed)
      .is_ok()
  }
}

// ─── Sessions ────────────────────────────────────────────────────────────────

struct Session {
  username:   String,
  expires_at: Instant,
}

/// In-memory session table keyed by token digest.
pub struct SessionStore {
  ttl:      Duration,
  sessions: Mutex<HashMap<[u8; 32], Session>>,
}

impl SessionStore {
  pub fn new(ttl: Duration) -> Self {
    Self { ttl, sessions: Mutex::new(HashMap::new()) }
  }

  /// Start a session for `username` and return its token.
  pub fn create(&self, username: &str) -> String {
    let mut raw = [0u8; 32];
    OsRng.fill_bytes(&mut raw);
    let token = hex::encode(raw);

    let now = Instant::now();
    let mut sessions = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);
    sessions.retain(|_, s| s.expires_at > now);
    sessions.insert(digest(&token), Session {
      username:   username.to_owned(),
      expires_at: now + self.ttl,
    });
    token
  }

  /// The user owning `token`, if the session exists and has not expired.
  pub fn lookup(&self, token: &str) -> Option<String> {
    let key = digest(token);
    let mut sessions = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);
    match sessions.get(&key) {
      Some(s) if s.expires_at > Instant::now() => Some(s.username.clone()),
      Some(_) => {
        sessions.remove(&key);
        None
      }
      None => None,
    }
  }

  pub fn revoke(&self, token: &str) {
    let mut sessions = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);
    sessions.remove(&digest(token));
  }
}

fn digest(token: &str) -> [u8; 32] { Sha256::digest(token.as_bytes()).into() }

// ─── Extractor ───────────────────────────────────────────────────────────────

/// Present in a handler's arguments means the request carried a live session.
pub struct Authenticated {
  pub username: String,
}

impl<S> FromRequestParts<AppState<S>> for Authenticated
where
  S: ReportStore + Clone + 'static,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S>,
  ) -> Result<Self, Self::Rejection> {
    let jar = CookieJar::from_headers(&parts.headers);
    let token = jar.get(SESSION_COOKIE).ok_or(ApiError::Unauthorized)?;
    let username = state
      .sessions
      .lookup(token.value())
      .ok_or(ApiError::Unauthorized)?;
    Ok(Authenticated { username })
  }
}

// ─── Handlers ────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
  pub username: String,
  pub password: String,
}

/// `POST /auth/login`
pub async fn login<S>(
  State(state): State<AppState<S>>,
  jar: CookieJar,
  body: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<(CookieJar, Json<Value>), ApiError>
where
  S: ReportStore + Clone + 'static,
{
  let Json(request) = body?;
  if !state.credentials.verify(&request.username, &request.password) {
    tracing::info!(username = %request.username, "login rejected");
    return Err(ApiError::Unauthorized);
  }

  let token = state.sessions.create(&request.username);
  tracing::info!(username = %request.username, "session started");
  let cookie = Cookie::build((SESSION_COOKIE, token))
    .path("/")
    .http_only(true)
    .same_site(SameSite::Strict);
  Ok((jar.add(cookie), Json(json!({ "username": request.username }))))
}

/// `POST /auth/logout`
pub async fn logout<S>(
  State(state): State<AppState<S>>,
  jar: CookieJar,
) -> (CookieJar, StatusCode)
where
  S: ReportStore + Clone + 'static,
{
  if let Some(cookie) = jar.get(SESSION_COOKIE) {
    state.sessions.revoke(cookie.value());
  }
  (jar.remove(Cookie::build(SESSION_COOKIE).path("/")), StatusCode::NO_CONTENT)
}
