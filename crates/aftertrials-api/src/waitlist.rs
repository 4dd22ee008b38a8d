//! Handlers for waitlist signup and sign-in links.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/api/waitlist` | 201 created, 409 duplicate, 202 when dropped as spam |
//! | `POST` | `/api/magic-link` | 202 once the link is handed to the sender |
//!
//! The two calls are separate so a client can create the entry and then
//! request the link, treating the second as best-effort.

use aftertrials_core::{
  auth::MagicLinkRequest,
  store::{MagicLinkSender, WaitlistStore, bounded},
  waitlist::{NewWaitlistEntry, Role, WaitlistInsert},
};
use axum::{
  Json,
  extract::State,
  http::StatusCode,
  response::IntoResponse,
};
use serde::Deserialize;
use serde_json::json;

use crate::{ApiState, error::ApiError};

// ─── Join ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct JoinBody {
  pub email:             String,
  pub full_name:         String,
  pub role:              Role,
  /// Hidden form field; humans leave it empty.
  #[serde(default)]
  pub website_url_honey: String,
}

/// `POST /api/waitlist`
pub async fn join<S, M>(
  State(state): State<ApiState<S, M>>,
  Json(body): Json<JoinBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: WaitlistStore,
{
  if !body.website_url_honey.is_empty() {
    tracing::debug!("waitlist submission dropped by honeypot");
    return Ok((StatusCode::ACCEPTED, Json(json!({ "status": "ignored" }))));
  }

  let email = body.email.trim();
  let full_name = body.full_name.trim();
  if email.is_empty() || full_name.is_empty() {
    return Err(ApiError::BadRequest("email and full_name are required".into()));
  }

  let entry = NewWaitlistEntry {
    email:     email.to_owned(),
    full_name: full_name.to_owned(),
    role:      body.role,
  };
  let inserted = bounded(
    "create_waitlist_entry",
    state.limit,
    state.store.create_waitlist_entry(&entry),
  )
  .await?;

  match inserted {
    WaitlistInsert::Created => {
      tracing::info!(email = %entry.email, role = %entry.role, "waitlist entry created");
      Ok((StatusCode::CREATED, Json(json!({ "status": "created" }))))
    }
    WaitlistInsert::AlreadyListed => Err(aftertrials_core::Error::DuplicateEntry.into()),
  }
}

// ─── Magic link ───────────────────────────────────────────────────────────────

/// `POST /api/magic-link`
pub async fn magic_link<S, M>(
  State(state): State<ApiState<S, M>>,
  Json(mut request): Json<MagicLinkRequest>,
) -> Result<impl IntoResponse, ApiError>
where
  M: MagicLinkSender,
{
  request.email = request.email.trim().to_owned();
  if request.email.is_empty() {
    return Err(ApiError::BadRequest("email is required".into()));
  }

  bounded("send_magic_link", state.limit, state.links.send_magic_link(&request)).await?;
  Ok((StatusCode::ACCEPTED, Json(json!({ "status": "sent" }))))
}
