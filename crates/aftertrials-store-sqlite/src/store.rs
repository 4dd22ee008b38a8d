//! [`SqliteStore`]: the SQLite implementation of the backend traits.

use std::path::Path;

use aftertrials_core::{
  auth::MagicLink,
  blog::{Blog, BlogQuery, BlogStamp, BlogSummary},
  canvas::{Canvas, CanvasSummary},
  profile::{Post, Profile},
  store::{Backend, MagicLinkStore, SiteStore, WaitlistStore},
  waitlist::{NewWaitlistEntry, WaitlistEntry, WaitlistInsert},
};
use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use crate::{
  Result,
  encode::{
    BLOG_COLUMNS, CANVAS_COLUMNS, POST_COLUMNS, PROFILE_COLUMNS, RawBlog, RawBlogStamp, RawCanvas,
    RawMagicLink, RawPost, RawProfile, RawWaitlistEntry, decode_count, decode_uuid, encode_dt,
    encode_tags, encode_uuid, like_pattern,
  },
  error::Error,
  schema::{SCHEMA, UNICASE, unicase},
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// An After Trials backend stored in a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  pub(crate) conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.create_collation(UNICASE, unicase)?;
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Run a `SELECT COUNT(*)` with a single text parameter.
  async fn count(&self, sql: &'static str, param: String) -> Result<u64> {
    let n: i64 = self
      .conn
      .call(move |conn| Ok(conn.query_row(sql, rusqlite::params![param], |r| r.get(0))?))
      .await?;
    Ok(decode_count(n))
  }

  async fn profile_where(&self, clause: &'static str, param: String) -> Result<Option<Profile>> {
    let raw: Option<RawProfile> = self
      .conn
      .call(move |conn| {
        let sql = format!("SELECT {PROFILE_COLUMNS} FROM profiles WHERE {clause}");
        Ok(
          conn
            .query_row(&sql, rusqlite::params![param], RawProfile::read)
            .optional()?,
        )
      })
      .await?;

    raw.map(RawProfile::into_profile).transpose()
  }

  async fn canvas_where(&self, clause: &'static str, param: String) -> Result<Option<Canvas>> {
    let raw: Option<RawCanvas> = self
      .conn
      .call(move |conn| {
        let sql = format!("SELECT {CANVAS_COLUMNS} FROM canvases WHERE {clause}");
        Ok(
          conn
            .query_row(&sql, rusqlite::params![param], RawCanvas::read)
            .optional()?,
        )
      })
      .await?;

    raw.map(RawCanvas::into_canvas).transpose()
  }
}

/// Filters shared by the blog listing and its total count.
///
/// `?1` is the tag, `?2` the `LIKE` pattern; either may be NULL.
const BLOG_FILTER: &str = "b.published = 1
  AND (?1 IS NULL OR EXISTS (SELECT 1 FROM json_each(b.tags) WHERE json_each.value = ?1))
  AND (?2 IS NULL OR b.title LIKE ?2 ESCAPE '\\' OR b.excerpt LIKE ?2 ESCAPE '\\')";

// ─── SiteStore impl ──────────────────────────────────────────────────────────

impl Backend for SqliteStore {
  type Error = Error;
}

impl SiteStore for SqliteStore {
  // ── Profiles ──────────────────────────────────────────────────────────────

  async fn find_profile_by_username(&self, username: &str) -> Result<Option<Profile>> {
    // The column is declared COLLATE UNICASE.
    self.profile_where("username = ?1", username.to_owned()).await
  }

  async fn find_profile_by_id(&self, id: Uuid) -> Result<Option<Profile>> {
    self.profile_where("id = ?1", encode_uuid(id)).await
  }

  async fn list_posts(&self, author_id: Uuid) -> Result<Vec<Post>> {
    let author_str = encode_uuid(author_id);

    let raws: Vec<RawPost> = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT {POST_COLUMNS} FROM posts WHERE author_id = ?1 ORDER BY created_at DESC, id"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params![author_str], RawPost::read)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawPost::into_post).collect()
  }

  async fn count_posts(&self, author_id: Uuid) -> Result<u64> {
    self
      .count("SELECT COUNT(*) FROM posts WHERE author_id = ?1", encode_uuid(author_id))
      .await
  }

  async fn find_latest_canvas(&self, author_id: Uuid) -> Result<Option<CanvasSummary>> {
    let author_str = encode_uuid(author_id);

    let raw: Option<(String, Option<String>)> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT id, title FROM canvases WHERE author_id = ?1
               ORDER BY created_at DESC, id LIMIT 1",
              rusqlite::params![author_str],
              |r| Ok((r.get(0)?, r.get(1)?)),
            )
            .optional()?,
        )
      })
      .await?;

    raw
      .map(|(id, title)| Ok::<_, Error>(CanvasSummary::new(decode_uuid(&id)?, title)))
      .transpose()
  }

  async fn count_followers(&self, profile_id: Uuid) -> Result<u64> {
    self
      .count("SELECT COUNT(*) FROM follows WHERE following_id = ?1", encode_uuid(profile_id))
      .await
  }

  async fn count_following(&self, profile_id: Uuid) -> Result<u64> {
    self
      .count("SELECT COUNT(*) FROM follows WHERE follower_id = ?1", encode_uuid(profile_id))
      .await
  }

  // ── Canvases ──────────────────────────────────────────────────────────────

  async fn find_canvas_by_id(&self, id: Uuid) -> Result<Option<Canvas>> {
    self.canvas_where("id = ?1", encode_uuid(id)).await
  }

  async fn find_canvas_by_title(&self, title: &str) -> Result<Option<Canvas>> {
    self
      .canvas_where(
        "title = ?1 COLLATE UNICASE ORDER BY created_at, id LIMIT 1",
        title.to_owned(),
      )
      .await
  }

  // ── Blogs ─────────────────────────────────────────────────────────────────

  async fn list_blogs(&self, query: &BlogQuery) -> Result<(Vec<BlogSummary>, u64)> {
    let tag = query.tag.clone();
    let pattern = query.search.as_deref().map(like_pattern);
    let limit = i64::from(query.limit);
    let offset = i64::from(query.offset);

    let (raws, total): (Vec<RawBlog>, i64) = self
      .conn
      .call(move |conn| {
        let total: i64 = conn.query_row(
          &format!("SELECT COUNT(*) FROM blogs b WHERE {BLOG_FILTER}"),
          rusqlite::params![tag, pattern],
          |r| r.get(0),
        )?;

        let sql = format!(
          "SELECT {BLOG_COLUMNS}
           FROM blogs b
           LEFT JOIN profiles p ON p.id = b.author_id
           WHERE {BLOG_FILTER}
           ORDER BY b.published_at DESC, b.id
           LIMIT ?3 OFFSET ?4"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params![tag, pattern, limit, offset], RawBlog::read)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok((rows, total))
      })
      .await?;

    let items = raws
      .into_iter()
      .map(RawBlog::into_summary)
      .collect::<Result<_>>()?;
    Ok((items, decode_count(total)))
  }

  async fn find_blog(&self, slug: &str) -> Result<Option<Blog>> {
    let slug = slug.to_owned();

    let raw: Option<RawBlog> = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT {BLOG_COLUMNS}
           FROM blogs b
           LEFT JOIN profiles p ON p.id = b.author_id
           WHERE b.slug = ?1 AND b.published = 1"
        );
        Ok(
          conn
            .query_row(&sql, rusqlite::params![slug], RawBlog::read)
            .optional()?,
        )
      })
      .await?;

    raw.map(RawBlog::into_blog).transpose()
  }

  async fn related_blogs(
    &self,
    slug: &str,
    tags: &[String],
    limit: u32,
  ) -> Result<Vec<BlogSummary>> {
    if tags.is_empty() || limit == 0 {
      return Ok(vec![]);
    }
    let slug = slug.to_owned();
    let tags_json = encode_tags(tags)?;
    let limit = i64::from(limit);

    let raws: Vec<RawBlog> = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT {BLOG_COLUMNS}
           FROM blogs b
           LEFT JOIN profiles p ON p.id = b.author_id
           WHERE b.published = 1
             AND b.slug != ?1
             AND EXISTS (
               SELECT 1 FROM json_each(b.tags) t
               WHERE t.value IN (SELECT value FROM json_each(?2))
             )
           ORDER BY b.published_at DESC, b.id
           LIMIT ?3"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params![slug, tags_json, limit], RawBlog::read)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawBlog::into_summary).collect()
  }

  async fn sitemap_blogs(&self) -> Result<Vec<BlogStamp>> {
    let raws: Vec<RawBlogStamp> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT slug, created_at, published_at, updated_at
           FROM blogs
           WHERE published = 1
           ORDER BY published_at DESC, id",
        )?;
        let rows = stmt
          .query_map([], |row| {
            Ok(RawBlogStamp {
              slug:         row.get(0)?,
              created_at:   row.get(1)?,
              published_at: row.get(2)?,
              updated_at:   row.get(3)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawBlogStamp::into_stamp).collect()
  }
}

// ─── WaitlistStore impl ──────────────────────────────────────────────────────

impl WaitlistStore for SqliteStore {
  async fn create_waitlist_entry(&self, entry: &NewWaitlistEntry) -> Result<WaitlistInsert> {
    let email = entry.email.clone();
    let full_name = entry.full_name.clone();
    let role = entry.role.to_string();
    let at_str = encode_dt(Utc::now());

    let inserted = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "INSERT INTO waitlist (email, full_name, role, verified, created_at)
           VALUES (?1, ?2, ?3, 0, ?4)
           ON CONFLICT (email) DO NOTHING",
          rusqlite::params![email, full_name, role, at_str],
        )?)
      })
      .await?;

    Ok(if inserted == 0 {
      WaitlistInsert::AlreadyListed
    } else {
      WaitlistInsert::Created
    })
  }

  async fn mark_waitlist_verified(&self, email: &str) -> Result<bool> {
    let email = email.to_owned();

    let updated = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE waitlist SET verified = 1 WHERE email = ?1",
          rusqlite::params![email],
        )?)
      })
      .await?;

    Ok(updated > 0)
  }

  async fn find_waitlist_entry(&self, email: &str) -> Result<Option<WaitlistEntry>> {
    let email = email.to_owned();

    let raw: Option<RawWaitlistEntry> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT email, full_name, role, verified, created_at
               FROM waitlist WHERE email = ?1",
              rusqlite::params![email],
              |row| {
                Ok(RawWaitlistEntry {
                  email:      row.get(0)?,
                  full_name:  row.get(1)?,
                  role:       row.get(2)?,
                  verified:   row.get(3)?,
                  created_at: row.get(4)?,
                })
              },
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawWaitlistEntry::into_entry).transpose()
  }
}

// ─── MagicLinkStore impl ─────────────────────────────────────────────────────

impl MagicLinkStore for SqliteStore {
  async fn insert_magic_link(&self, link: &MagicLink) -> Result<()> {
    let raw = RawMagicLink::encode(link);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO magic_links (
             token_hash, email, full_name, role, redirect_to, created_at, expires_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
          rusqlite::params![
            raw.token_hash,
            raw.email,
            raw.full_name,
            raw.role,
            raw.redirect_to,
            raw.created_at,
            raw.expires_at,
          ],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn consume_magic_link(
    &self,
    token_hash: &str,
    now: DateTime<Utc>,
  ) -> Result<Option<MagicLink>> {
    let token_hash = token_hash.to_owned();
    let now_str = encode_dt(now);

    // Check and consume in one statement.
    let raw: Option<RawMagicLink> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "UPDATE magic_links SET consumed_at = ?2
               WHERE token_hash = ?1 AND consumed_at IS NULL AND expires_at > ?2
               RETURNING token_hash, email, full_name, role, redirect_to,
                         created_at, expires_at",
              rusqlite::params![token_hash, now_str],
              |row| {
                Ok(RawMagicLink {
                  token_hash:  row.get(0)?,
                  email:       row.get(1)?,
                  full_name:   row.get(2)?,
                  role:        row.get(3)?,
                  redirect_to: row.get(4)?,
                  created_at:  row.get(5)?,
                  expires_at:  row.get(6)?,
                })
              },
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawMagicLink::into_link).transpose()
  }
}
