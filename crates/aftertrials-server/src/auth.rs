//! Bearer-secret extractor guarding the internal endpoints.
//!
//! The secret itself is never configured; only its argon2 PHC string is.
//! Generate one with `aftertrials-server --hash-secret`.

use aftertrials_core::store::Backend;
use argon2::{Argon2, PasswordHash, PasswordVerifier};
use axum::{
  extract::FromRequestParts,
  http::{HeaderMap, header, request::Parts},
};

use crate::{AppState, error::Error};

/// Zero-size marker: present in the handler means the caller knew the
/// cron secret.
pub struct CronAuthorized;

/// Verify `Authorization: Bearer <secret>` against `secret_hash`.
///
/// With no hash configured, every request is refused.
pub fn verify_bearer(headers: &HeaderMap, secret_hash: Option<&str>) -> Result<(), Error> {
  let secret_hash = secret_hash.ok_or(Error::Unauthorized)?;

  let secret = headers
    .get(header::AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .and_then(|v| v.strip_prefix("Bearer "))
    .ok_or(Error::Unauthorized)?;

  let parsed_hash = PasswordHash::new(secret_hash).map_err(|_| Error::Unauthorized)?;

  Argon2::default()
    .verify_password(secret.as_bytes(), &parsed_hash)
    .map_err(|_| Error::Unauthorized)
}

impl<S> FromRequestParts<AppState<S>> for CronAuthorized
where
  S: Backend + 'static,
{
  type Rejection = Error;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S>,
  ) -> Result<Self, Self::Rejection> {
    verify_bearer(&parts.headers, state.config.cron_secret_hash.as_deref())?;
    Ok(CronAuthorized)
  }
}
