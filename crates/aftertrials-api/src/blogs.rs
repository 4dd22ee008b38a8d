//! Handlers for `/api/blogs` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/api/blogs` | `?page=&per_page=&tag=&q=` |
//! | `GET`  | `/api/blogs/{slug}` | 404 unless published |

use aftertrials_core::{
  blog::{BlogDetail, BlogMeta, BlogPage, Pagination, RELATED_LIMIT, json_ld},
  store::{SiteStore, bounded},
};
use axum::{
  Json,
  extract::{Path, Query, State},
};
use serde::Deserialize;

use crate::{ApiState, error::ApiError};

// ─── List ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
  pub page:     Option<u32>,
  pub per_page: Option<u32>,
  pub tag:      Option<String>,
  /// Search text.
  pub q:        Option<String>,
}

fn non_blank(value: Option<String>) -> Option<String> {
  value
    .map(|v| v.trim().to_owned())
    .filter(|v| !v.is_empty())
}

/// `GET /api/blogs`
pub async fn list<S, M>(
  State(state): State<ApiState<S, M>>,
  Query(params): Query<ListParams>,
) -> Result<Json<BlogPage>, ApiError>
where
  S: SiteStore,
{
  let pagination = Pagination::new(params.page, params.per_page);
  let query = pagination.query(non_blank(params.tag), non_blank(params.q));

  let (items, total) = bounded("list_blogs", state.limit, state.store.list_blogs(&query)).await?;
  Ok(Json(BlogPage::new(items, total, pagination)))
}

// ─── Get one ──────────────────────────────────────────────────────────────────

/// `GET /api/blogs/{slug}`
pub async fn get_one<S, M>(
  State(state): State<ApiState<S, M>>,
  Path(slug): Path<String>,
) -> Result<Json<BlogDetail>, ApiError>
where
  S: SiteStore,
{
  let blog = bounded("find_blog", state.limit, state.store.find_blog(&slug))
    .await?
    .ok_or_else(|| ApiError::NotFound(format!("blog {slug} not found")))?;

  let related = bounded(
    "related_blogs",
    state.limit,
    state.store.related_blogs(&blog.slug, &blog.tags, RELATED_LIMIT),
  )
  .await?;

  Ok(Json(BlogDetail {
    meta: BlogMeta::for_blog(&blog, &state.site),
    json_ld: json_ld(&blog, &state.site),
    related,
    blog,
  }))
}
