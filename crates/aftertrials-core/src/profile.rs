//! Profiles, their content posts, and the profile page view-model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::canvas::CanvasSummary;

/// An identity record. Usernames are unique ignoring case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
  pub id:                  Uuid,
  pub username:            Option<String>,
  pub full_name:           Option<String>,
  pub avatar_url:          Option<String>,
  pub bio:                 Option<String>,
  pub specialization:      Option<String>,
  pub degree:              Option<String>,
  pub institution:         Option<String>,
  pub workplace:           Option<String>,
  pub country:             Option<String>,
  /// e.g. `"verified"` or `"pending_submission"`.
  pub verification_status: Option<String>,
  pub created_at:          DateTime<Utc>,
}

impl Profile {
  pub fn is_verified(&self) -> bool {
    self.verification_status.as_deref() == Some("verified")
  }
}

/// A content post written by a profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
  pub id:             Uuid,
  pub author_id:      Uuid,
  pub title:          String,
  pub summary:        Option<String>,
  #[serde(default)]
  pub tags:           Vec<String>,
  #[serde(default)]
  pub upvote_count:   u64,
  #[serde(default)]
  pub comment_count:  u64,
  #[serde(default)]
  pub share_count:    u64,
  pub specialization: Option<String>,
  pub created_at:     DateTime<Utc>,
}

/// A profile together with its relationship counts, as of the read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorView {
  #[serde(flatten)]
  pub profile:         Profile,
  /// Drives the verified badge.
  pub is_verified:     bool,
  pub followers_count: u64,
  pub following_count: u64,
}

impl AuthorView {
  pub fn new(profile: Profile, followers_count: u64, following_count: u64) -> Self {
    Self { is_verified: profile.is_verified(), profile, followers_count, following_count }
  }
}

/// A post decorated with its author's card, ready for a feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostCard {
  #[serde(flatten)]
  pub post:              Post,
  pub author_name:       String,
  pub author_username:   String,
  pub author_avatar_url: String,
  pub likes:             u64,
  pub comments:          u64,
  pub shares:            u64,
}

impl PostCard {
  pub fn new(post: Post, author: &Profile) -> Self {
    Self {
      author_name:       author.full_name.clone().unwrap_or_else(|| "User".to_owned()),
      author_username:   author.username.clone().unwrap_or_else(|| "user".to_owned()),
      author_avatar_url: author.avatar_url.clone().unwrap_or_default(),
      likes:             post.upvote_count,
      comments:          post.comment_count,
      shares:            post.share_count,
      post,
    }
  }
}

/// Everything the public profile page shows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileView {
  pub profile:       AuthorView,
  /// Newest first.
  pub posts:         Vec<PostCard>,
  /// The profile's most recently created canvas, if any.
  pub pinned_canvas: Option<CanvasSummary>,
}
