//! `sitemap.xml` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/sitemap.xml` | Rendered on every request |
//! | `POST` | `/internal/update-sitemap` | Bearer cron secret; writes `public_dir/sitemap.xml` |

use std::path::PathBuf;

use aftertrials_core::{
  sitemap,
  store::{SiteStore, bounded},
};
use axum::{
  Json,
  extract::State,
  http::{StatusCode, header},
  response::{IntoResponse, Response},
};
use chrono::Utc;
use serde_json::json;

use crate::{AppState, auth::CronAuthorized, error::Error};

async fn build<S: SiteStore>(state: &AppState<S>) -> Result<String, Error> {
  let blogs = bounded("sitemap_blogs", state.limit(), state.store.sitemap_blogs()).await?;
  let entries = sitemap::entries(&state.site, &blogs, Utc::now());
  Ok(sitemap::render(&entries)?)
}

/// Render the sitemap and write it into the public directory.
async fn write<S: SiteStore>(state: &AppState<S>) -> Result<PathBuf, Error> {
  let xml = build(state).await?;
  let dir = &state.config.public_dir;
  tokio::fs::create_dir_all(dir).await?;
  let path = dir.join("sitemap.xml");
  tokio::fs::write(&path, xml).await?;
  Ok(path)
}

/// `GET /sitemap.xml`
pub async fn serve<S>(State(state): State<AppState<S>>) -> Result<Response, Error>
where
  S: SiteStore,
{
  let xml = build(&state).await?;
  Ok(([(header::CONTENT_TYPE, "application/xml")], xml).into_response())
}

/// `POST /internal/update-sitemap`
pub async fn update<S>(_auth: CronAuthorized, State(state): State<AppState<S>>) -> Response
where
  S: SiteStore,
{
  match write(&state).await {
    Ok(path) => {
      tracing::info!(path = %path.display(), "sitemap written");
      Json(json!({ "success": true })).into_response()
    }
    Err(e) => {
      tracing::error!(error = %e, "sitemap update failed");
      (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "success": false, "error": e.to_string() })),
      )
        .into_response()
    }
  }
}
