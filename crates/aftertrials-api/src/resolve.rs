//! Handler for the catch-all `/{slug}` route.
//!
//! Answers with the [`Resolution`] as JSON: a profile page or a canvas page.
//! Nothing matching is a 404; a failing or slow backend is a 502 or 504,
//! never a 404.

use aftertrials_core::{
  resolve::{Resolution, SlugResolver},
  store::SiteStore,
};
use axum::{
  Json,
  extract::{Path, State},
};

use crate::{ApiState, error::ApiError};

/// `GET /{slug}`
pub async fn handler<S, M>(
  State(state): State<ApiState<S, M>>,
  Path(slug): Path<String>,
) -> Result<Json<Resolution>, ApiError>
where
  S: SiteStore,
{
  let resolver = SlugResolver::new(state.store.clone()).with_timeout(state.limit);
  match resolver.resolve(&slug).await? {
    Resolution::NotFound => Err(ApiError::NotFound(format!("nothing found at /{slug}"))),
    found => Ok(Json(found)),
  }
}
