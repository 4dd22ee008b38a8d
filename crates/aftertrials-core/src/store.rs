//! Backend traits consumed by the resolver, the waitlist flow and the blog.
//!
//! Storage backends (e.g. `aftertrials-store-sqlite`) implement these; the
//! HTTP layers and the terminal client depend only on the traits, so a test
//! double can stand in for the real backend anywhere.
//!
//! Lookups return `Result<Option<T>, E>`: `Ok(Some(_))` is a hit, `Ok(None)`
//! is a confirmed absence and `Err(_)` means the backend could not answer.
//! Callers must not collapse the last two.

use std::{future::Future, time::Duration};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
  Error,
  Result,
  auth::{MagicLink, MagicLinkRequest},
  blog::{Blog, BlogQuery, BlogStamp, BlogSummary},
  canvas::{Canvas, CanvasSummary},
  profile::{Post, Profile},
  waitlist::{NewWaitlistEntry, WaitlistEntry, WaitlistInsert},
};

/// Default bound on a single backend call.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Shared error type of a backend.
pub trait Backend: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;
}

// ─── Site content (read-only) ────────────────────────────────────────────────

/// Read access to profiles, posts, canvases, follows and blogs.
pub trait SiteStore: Backend {
  /// Exact username match, ignoring case.
  fn find_profile_by_username<'a>(
    &'a self,
    username: &'a str,
  ) -> impl Future<Output = Result<Option<Profile>, Self::Error>> + Send + 'a;

  fn find_profile_by_id(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Profile>, Self::Error>> + Send + '_;

  /// All posts by `author_id`, newest first.
  fn list_posts(
    &self,
    author_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Post>, Self::Error>> + Send + '_;

  fn count_posts(
    &self,
    author_id: Uuid,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  /// The most recently created canvas by `author_id`.
  fn find_latest_canvas(
    &self,
    author_id: Uuid,
  ) -> impl Future<Output = Result<Option<CanvasSummary>, Self::Error>> + Send + '_;

  /// Number of follow edges pointing at `profile_id`.
  fn count_followers(
    &self,
    profile_id: Uuid,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  /// Number of follow edges originating from `profile_id`.
  fn count_following(
    &self,
    profile_id: Uuid,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  fn find_canvas_by_id(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Canvas>, Self::Error>> + Send + '_;

  /// First canvas whose title matches `title` ignoring case.
  ///
  /// Titles are not unique. Implementations must break ties
  /// deterministically: oldest `created_at` first, then smallest id.
  fn find_canvas_by_title<'a>(
    &'a self,
    title: &'a str,
  ) -> impl Future<Output = Result<Option<Canvas>, Self::Error>> + Send + 'a;

  /// A page of published posts, newest `published_at` first, plus the total
  /// number of posts matching the filters.
  fn list_blogs<'a>(
    &'a self,
    query: &'a BlogQuery,
  ) -> impl Future<Output = Result<(Vec<BlogSummary>, u64), Self::Error>> + Send + 'a;

  /// A published post by slug, with its author card joined.
  fn find_blog<'a>(
    &'a self,
    slug: &'a str,
  ) -> impl Future<Output = Result<Option<Blog>, Self::Error>> + Send + 'a;

  /// Published posts other than `slug` sharing at least one of `tags`,
  /// newest first.
  fn related_blogs<'a>(
    &'a self,
    slug: &'a str,
    tags: &'a [String],
    limit: u32,
  ) -> impl Future<Output = Result<Vec<BlogSummary>, Self::Error>> + Send + 'a;

  /// Every published post, for the sitemap.
  fn sitemap_blogs(
    &self,
  ) -> impl Future<Output = Result<Vec<BlogStamp>, Self::Error>> + Send + '_;
}

// ─── Waitlist ────────────────────────────────────────────────────────────────

pub trait WaitlistStore: Backend {
  /// Insert an entry. An existing email yields
  /// [`WaitlistInsert::AlreadyListed`] and leaves the stored entry untouched.
  fn create_waitlist_entry<'a>(
    &'a self,
    entry: &'a NewWaitlistEntry,
  ) -> impl Future<Output = Result<WaitlistInsert, Self::Error>> + Send + 'a;

  /// Set `verified = true` for `email`. Returns whether an entry matched.
  /// Idempotent.
  fn mark_waitlist_verified<'a>(
    &'a self,
    email: &'a str,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;

  fn find_waitlist_entry<'a>(
    &'a self,
    email: &'a str,
  ) -> impl Future<Output = Result<Option<WaitlistEntry>, Self::Error>> + Send + 'a;
}

// ─── Magic links ─────────────────────────────────────────────────────────────

/// Something that can email a sign-in link.
pub trait MagicLinkSender: Backend {
  fn send_magic_link<'a>(
    &'a self,
    request: &'a MagicLinkRequest,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;
}

/// Persistence for issued magic links. Only token hashes are stored.
pub trait MagicLinkStore: Backend {
  fn insert_magic_link<'a>(
    &'a self,
    link: &'a MagicLink,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// Mark the link with `token_hash` consumed and return it, provided it
  /// exists, has not been consumed, and has not expired at `now`.
  fn consume_magic_link<'a>(
    &'a self,
    token_hash: &'a str,
    now: DateTime<Utc>,
  ) -> impl Future<Output = Result<Option<MagicLink>, Self::Error>> + Send + 'a;
}

// ─── Deadlines ───────────────────────────────────────────────────────────────

/// Run one backend call under `limit`.
///
/// Backend errors are tagged with `op`; running out of time becomes
/// [`Error::Timeout`].
pub async fn bounded<T, E, F>(op: &'static str, limit: Duration, call: F) -> Result<T>
where
  F: Future<Output = Result<T, E>>,
  E: std::error::Error + Send + Sync + 'static,
{
  match tokio::time::timeout(limit, call).await {
    Ok(Ok(value)) => Ok(value),
    Ok(Err(e)) => Err(Error::backend(op, e)),
    Err(_) => Err(Error::Timeout(op)),
  }
}
