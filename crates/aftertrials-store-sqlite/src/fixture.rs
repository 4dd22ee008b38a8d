//! Bulk loading of site content from a JSON document.
//!
//! The server imports one at startup with `--import`; tests use it to seed
//! a store.

use aftertrials_core::{
  blog::Blog,
  canvas::Canvas,
  profile::{Post, Profile},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  Result,
  encode::{RawBlog, RawCanvas, RawPost, RawProfile, encode_uuid},
  store::SqliteStore,
};

/// One follow edge: `follower_id` follows `following_id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Follow {
  pub follower_id:  Uuid,
  pub following_id: Uuid,
}

/// Site content to load into a store. Every section is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Fixture {
  pub profiles: Vec<Profile>,
  pub posts:    Vec<Post>,
  pub canvases: Vec<Canvas>,
  pub follows:  Vec<Follow>,
  pub blogs:    Vec<Blog>,
}

impl Fixture {
  pub fn from_json(json: &str) -> Result<Self> { Ok(serde_json::from_str(json)?) }
}

impl SqliteStore {
  /// Load `fixture` in one transaction.
  ///
  /// A record clashing with a stored id, username or blog slug fails the
  /// whole import. Follow edges already present are skipped.
  pub async fn import(&self, fixture: &Fixture) -> Result<()> {
    let profiles: Vec<RawProfile> = fixture.profiles.iter().map(RawProfile::encode).collect();
    let posts = fixture
      .posts
      .iter()
      .map(RawPost::encode)
      .collect::<Result<Vec<_>>>()?;
    let canvases = fixture
      .canvases
      .iter()
      .map(RawCanvas::encode)
      .collect::<Result<Vec<_>>>()?;
    let follows: Vec<(String, String)> = fixture
      .follows
      .iter()
      .map(|f| (encode_uuid(f.follower_id), encode_uuid(f.following_id)))
      .collect();
    let blogs = fixture
      .blogs
      .iter()
      .map(RawBlog::encode)
      .collect::<Result<Vec<_>>>()?;

    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        for p in &profiles {
          tx.execute(
            "INSERT INTO profiles (
               id, username, full_name, avatar_url, bio, specialization, degree,
               institution, workplace, country, verification_status, created_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            rusqlite::params![
              p.id,
              p.username,
              p.full_name,
              p.avatar_url,
              p.bio,
              p.specialization,
              p.degree,
              p.institution,
              p.workplace,
              p.country,
              p.verification_status,
              p.created_at,
            ],
          )?;
        }

        for p in &posts {
          tx.execute(
            "INSERT INTO posts (
               id, author_id, title, summary, tags, upvote_count, comment_count,
               share_count, specialization, created_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            rusqlite::params![
              p.id,
              p.author_id,
              p.title,
              p.summary,
              p.tags,
              p.upvote_count,
              p.comment_count,
              p.share_count,
              p.specialization,
              p.created_at,
            ],
          )?;
        }

        for c in &canvases {
          tx.execute(
            "INSERT INTO canvases (
               id, author_id, title, content, is_published, is_pinned_to_profile,
               view_count, created_at, updated_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            rusqlite::params![
              c.id,
              c.author_id,
              c.title,
              c.content,
              c.is_published,
              c.is_pinned_to_profile,
              c.view_count,
              c.created_at,
              c.updated_at,
            ],
          )?;
        }

        for (follower, following) in &follows {
          tx.execute(
            "INSERT OR IGNORE INTO follows (follower_id, following_id) VALUES (?1, ?2)",
            rusqlite::params![follower, following],
          )?;
        }

        for b in &blogs {
          tx.execute(
            "INSERT INTO blogs (
               id, slug, title, excerpt, content, html_content, cover_image, author_id,
               published, published_at, created_at, updated_at, tags, seo_title,
               seo_description, view_count, read_time_minutes
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)",
            rusqlite::params![
              b.id,
              b.slug,
              b.title,
              b.excerpt,
              b.content,
              b.html_content,
              b.cover_image,
              b.author_id,
              b.published,
              b.published_at,
              b.created_at,
              b.updated_at,
              b.tags,
              b.seo_title,
              b.seo_description,
              b.view_count,
              b.read_time_minutes,
            ],
          )?;
        }

        tx.commit()?;
        Ok(())
      })
      .await?;

    tracing::info!(
      profiles = fixture.profiles.len(),
      posts = fixture.posts.len(),
      canvases = fixture.canvases.len(),
      follows = fixture.follows.len(),
      blogs = fixture.blogs.len(),
      "fixture imported"
    );
    Ok(())
  }
}
