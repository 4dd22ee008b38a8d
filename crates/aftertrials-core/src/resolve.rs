//! Resolution of the catch-all `/{slug}` path segment.
//!
//! A segment names, in order of precedence:
//!
//! 1. a profile, by username (ignoring case);
//! 2. a canvas, by id, when the segment is shaped like a UUID;
//! 3. a canvas, by title, with hyphens read as spaces.
//!
//! The first hit wins. A canvas whose author no longer exists is treated as
//! absent. Backend failures and timeouts are returned as errors so callers
//! can answer with a 5xx instead of a 404.

use std::{sync::Arc, time::Duration};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  Result,
  canvas::{Canvas, CanvasView},
  profile::{AuthorView, PostCard, Profile, ProfileView},
  slug::{parse_canvas_id, unslugify},
  store::{DEFAULT_TIMEOUT, SiteStore, bounded},
};

/// What a slug resolved to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "view", rename_all = "snake_case")]
pub enum Resolution {
  Profile(Box<ProfileView>),
  Canvas(Box<CanvasView>),
  NotFound,
}

/// Read-only resolver over an injected [`SiteStore`].
///
/// Cloning is cheap; the store is reference-counted.
pub struct SlugResolver<S> {
  store: Arc<S>,
  limit: Duration,
}

impl<S> Clone for SlugResolver<S> {
  fn clone(&self) -> Self { Self { store: Arc::clone(&self.store), limit: self.limit } }
}

impl<S: SiteStore> SlugResolver<S> {
  pub fn new(store: Arc<S>) -> Self { Self { store, limit: DEFAULT_TIMEOUT } }

  /// Bound every backend call by `limit` instead of the default.
  pub fn with_timeout(mut self, limit: Duration) -> Self {
    self.limit = limit;
    self
  }

  pub async fn resolve(&self, slug: &str) -> Result<Resolution> {
    let profile = bounded(
      "find_profile_by_username",
      self.limit,
      self.store.find_profile_by_username(slug),
    )
    .await?;
    if let Some(profile) = profile {
      tracing::debug!(slug, profile_id = %profile.id, "slug resolved to profile");
      let view = self.profile_view(profile).await?;
      return Ok(Resolution::Profile(Box::new(view)));
    }

    let canvas = match parse_canvas_id(slug) {
      Some(id) => {
        bounded("find_canvas_by_id", self.limit, self.store.find_canvas_by_id(id)).await?
      }
      None => {
        let title = unslugify(slug);
        bounded(
          "find_canvas_by_title",
          self.limit,
          self.store.find_canvas_by_title(&title),
        )
        .await?
      }
    };
    let Some(canvas) = canvas else {
      tracing::debug!(slug, "slug matched nothing");
      return Ok(Resolution::NotFound);
    };

    match self.canvas_view(canvas).await? {
      Some(view) => {
        tracing::debug!(slug, canvas_id = %view.id, "slug resolved to canvas");
        Ok(Resolution::Canvas(Box::new(view)))
      }
      None => Ok(Resolution::NotFound),
    }
  }

  async fn profile_view(&self, profile: Profile) -> Result<ProfileView> {
    let posts = bounded("list_posts", self.limit, self.store.list_posts(profile.id)).await?;
    let pinned_canvas = bounded(
      "find_latest_canvas",
      self.limit,
      self.store.find_latest_canvas(profile.id),
    )
    .await?;

    let posts = posts
      .into_iter()
      .map(|post| PostCard::new(post, &profile))
      .collect();
    let profile = self.author_view(profile).await?;

    Ok(ProfileView { profile, posts, pinned_canvas })
  }

  /// `None` when the canvas author is missing.
  async fn canvas_view(&self, canvas: Canvas) -> Result<Option<CanvasView>> {
    let author = bounded(
      "find_profile_by_id",
      self.limit,
      self.store.find_profile_by_id(canvas.author_id),
    )
    .await?;
    let Some(author) = author else {
      tracing::debug!(canvas_id = %canvas.id, "canvas author missing");
      return Ok(None);
    };

    let post_count = bounded("count_posts", self.limit, self.store.count_posts(author.id)).await?;
    let author = self.author_view(author).await?;
    Ok(Some(CanvasView::new(canvas, author, post_count)))
  }

  async fn author_view(&self, profile: Profile) -> Result<AuthorView> {
    let (followers_count, following_count) = self.counts(profile.id).await?;
    Ok(AuthorView::new(profile, followers_count, following_count))
  }

  /// Follower and following counts, queried concurrently.
  async fn counts(&self, id: Uuid) -> Result<(u64, u64)> {
    tokio::try_join!(
      bounded("count_followers", self.limit, self.store.count_followers(id)),
      bounded("count_following", self.limit, self.store.count_following(id)),
    )
  }
}
