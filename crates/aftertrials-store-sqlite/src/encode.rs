//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as fixed-width RFC 3339 UTC strings so that string
//! order is time order. Tags and canvas content are stored as compact JSON.
//! UUIDs are stored as hyphenated lowercase strings.

use std::str::FromStr as _;

use aftertrials_core::{
  auth::MagicLink,
  blog::{Blog, BlogAuthor, BlogStamp, BlogSummary},
  canvas::Canvas,
  profile::{Post, Profile},
  waitlist::{Role, WaitlistEntry},
};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::Row;
use uuid::Uuid;

use crate::{Error, Result};

// ─── Scalars ─────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339_opts(SecondsFormat::Micros, true) }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

fn decode_opt_dt(s: Option<String>) -> Result<Option<DateTime<Utc>>> {
  s.as_deref().map(decode_dt).transpose()
}

pub fn encode_count(n: u64) -> i64 { i64::try_from(n).unwrap_or(i64::MAX) }

pub fn decode_count(n: i64) -> u64 { u64::try_from(n).unwrap_or(0) }

pub fn decode_role(s: &str) -> Result<Role> {
  Role::from_str(s).map_err(|_| Error::UnknownValue { column: "role", value: s.to_owned() })
}

pub fn encode_tags(tags: &[String]) -> Result<String> { Ok(serde_json::to_string(tags)?) }

pub fn decode_tags(s: &str) -> Result<Vec<String>> { Ok(serde_json::from_str(s)?) }

/// A `LIKE` pattern matching `needle` anywhere, with wildcards escaped.
pub fn like_pattern(needle: &str) -> String {
  let mut out = String::with_capacity(needle.len() + 2);
  out.push('%');
  for c in needle.chars() {
    if matches!(c, '%' | '_' | '\\') {
      out.push('\\');
    }
    out.push(c);
  }
  out.push('%');
  out
}

// ─── Profiles ────────────────────────────────────────────────────────────────

pub const PROFILE_COLUMNS: &str = "id, username, full_name, avatar_url, bio, specialization, \
                                   degree, institution, workplace, country, \
                                   verification_status, created_at";

/// Raw strings read directly from a `profiles` row.
pub struct RawProfile {
  pub id:                  String,
  pub username:            Option<String>,
  pub full_name:           Option<String>,
  pub avatar_url:          Option<String>,
  pub bio:                 Option<String>,
  pub specialization:      Option<String>,
  pub degree:              Option<String>,
  pub institution:         Option<String>,
  pub workplace:           Option<String>,
  pub country:             Option<String>,
  pub verification_status: Option<String>,
  pub created_at:          String,
}

impl RawProfile {
  pub fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:                  row.get(0)?,
      username:            row.get(1)?,
      full_name:           row.get(2)?,
      avatar_url:          row.get(3)?,
      bio:                 row.get(4)?,
      specialization:      row.get(5)?,
      degree:              row.get(6)?,
      institution:         row.get(7)?,
      workplace:           row.get(8)?,
      country:             row.get(9)?,
      verification_status: row.get(10)?,
      created_at:          row.get(11)?,
    })
  }

  pub fn encode(p: &Profile) -> Self {
    Self {
      id:                  encode_uuid(p.id),
      username:            p.username.clone(),
      full_name:           p.full_name.clone(),
      avatar_url:          p.avatar_url.clone(),
      bio:                 p.bio.clone(),
      specialization:      p.specialization.clone(),
      degree:              p.degree.clone(),
      institution:         p.institution.clone(),
      workplace:           p.workplace.clone(),
      country:             p.country.clone(),
      verification_status: p.verification_status.clone(),
      created_at:          encode_dt(p.created_at),
    }
  }

  pub fn into_profile(self) -> Result<Profile> {
    Ok(Profile {
      id:                  decode_uuid(&self.id)?,
      username:            self.username,
      full_name:           self.full_name,
      avatar_url:          self.avatar_url,
      bio:                 self.bio,
      specialization:      self.specialization,
      degree:              self.degree,
      institution:         self.institution,
      workplace:           self.workplace,
      country:             self.country,
      verification_status: self.verification_status,
      created_at:          decode_dt(&self.created_at)?,
    })
  }
}

// ─── Posts ───────────────────────────────────────────────────────────────────

pub const POST_COLUMNS: &str = "id, author_id, title, summary, tags, upvote_count, \
                                comment_count, share_count, specialization, created_at";

pub struct RawPost {
  pub id:             String,
  pub author_id:      String,
  pub title:          String,
  pub summary:        Option<String>,
  pub tags:           String,
  pub upvote_count:   i64,
  pub comment_count:  i64,
  pub share_count:    i64,
  pub specialization: Option<String>,
  pub created_at:     String,
}

impl RawPost {
  pub fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:             row.get(0)?,
      author_id:      row.get(1)?,
      title:          row.get(2)?,
      summary:        row.get(3)?,
      tags:           row.get(4)?,
      upvote_count:   row.get(5)?,
      comment_count:  row.get(6)?,
      share_count:    row.get(7)?,
      specialization: row.get(8)?,
      created_at:     row.get(9)?,
    })
  }

  pub fn encode(p: &Post) -> Result<Self> {
    Ok(Self {
      id:             encode_uuid(p.id),
      author_id:      encode_uuid(p.author_id),
      title:          p.title.clone(),
      summary:        p.summary.clone(),
      tags:           encode_tags(&p.tags)?,
      upvote_count:   encode_count(p.upvote_count),
      comment_count:  encode_count(p.comment_count),
      share_count:    encode_count(p.share_count),
      specialization: p.specialization.clone(),
      created_at:     encode_dt(p.created_at),
    })
  }

  pub fn into_post(self) -> Result<Post> {
    Ok(Post {
      id:             decode_uuid(&self.id)?,
      author_id:      decode_uuid(&self.author_id)?,
      title:          self.title,
      summary:        self.summary,
      tags:           decode_tags(&self.tags)?,
      upvote_count:   decode_count(self.upvote_count),
      comment_count:  decode_count(self.comment_count),
      share_count:    decode_count(self.share_count),
      specialization: self.specialization,
      created_at:     decode_dt(&self.created_at)?,
    })
  }
}

// ─── Canvases ────────────────────────────────────────────────────────────────

pub const CANVAS_COLUMNS: &str = "id, author_id, title, content, is_published, \
                                  is_pinned_to_profile, view_count, created_at, updated_at";

pub struct RawCanvas {
  pub id:                   String,
  pub author_id:            String,
  pub title:                Option<String>,
  pub content:              String,
  pub is_published:         bool,
  pub is_pinned_to_profile: bool,
  pub view_count:           i64,
  pub created_at:           String,
  pub updated_at:           String,
}

impl RawCanvas {
  pub fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:                   row.get(0)?,
      author_id:            row.get(1)?,
      title:                row.get(2)?,
      content:              row.get(3)?,
      is_published:         row.get(4)?,
      is_pinned_to_profile: row.get(5)?,
      view_count:           row.get(6)?,
      created_at:           row.get(7)?,
      updated_at:           row.get(8)?,
    })
  }

  pub fn encode(c: &Canvas) -> Result<Self> {
    Ok(Self {
      id:                   encode_uuid(c.id),
      author_id:            encode_uuid(c.author_id),
      title:                c.title.clone(),
      content:              serde_json::to_string(&c.content)?,
      is_published:         c.is_published,
      is_pinned_to_profile: c.is_pinned_to_profile,
      view_count:           encode_count(c.view_count),
      created_at:           encode_dt(c.created_at),
      updated_at:           encode_dt(c.updated_at),
    })
  }

  pub fn into_canvas(self) -> Result<Canvas> {
    Ok(Canvas {
      id:                   decode_uuid(&self.id)?,
      author_id:            decode_uuid(&self.author_id)?,
      title:                self.title,
      content:              serde_json::from_str(&self.content)?,
      is_published:         self.is_published,
      is_pinned_to_profile: self.is_pinned_to_profile,
      view_count:           decode_count(self.view_count),
      created_at:           decode_dt(&self.created_at)?,
      updated_at:           decode_dt(&self.updated_at)?,
    })
  }
}

// ─── Blogs ───────────────────────────────────────────────────────────────────

/// `blogs b` joined with the author's card from `profiles p`.
pub const BLOG_COLUMNS: &str = "b.id, b.slug, b.title, b.excerpt, b.content, b.html_content, \
                                b.cover_image, b.author_id, b.published, b.published_at, \
                                b.created_at, b.updated_at, b.tags, b.seo_title, \
                                b.seo_description, b.view_count, b.read_time_minutes, \
                                p.id, p.full_name, p.avatar_url, p.username";

pub struct RawBlog {
  pub id:                String,
  pub slug:              String,
  pub title:             String,
  pub excerpt:           Option<String>,
  pub content:           Option<String>,
  pub html_content:      Option<String>,
  pub cover_image:       Option<String>,
  pub author_id:         Option<String>,
  pub published:         bool,
  pub published_at:      Option<String>,
  pub created_at:        String,
  pub updated_at:        Option<String>,
  pub tags:              String,
  pub seo_title:         Option<String>,
  pub seo_description:   Option<String>,
  pub view_count:        i64,
  pub read_time_minutes: i64,
  // profiles join
  pub author_found:      Option<String>,
  pub author_full_name:  Option<String>,
  pub author_avatar_url: Option<String>,
  pub author_username:   Option<String>,
}

impl RawBlog {
  pub fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:                row.get(0)?,
      slug:              row.get(1)?,
      title:             row.get(2)?,
      excerpt:           row.get(3)?,
      content:           row.get(4)?,
      html_content:      row.get(5)?,
      cover_image:       row.get(6)?,
      author_id:         row.get(7)?,
      published:         row.get(8)?,
      published_at:      row.get(9)?,
      created_at:        row.get(10)?,
      updated_at:        row.get(11)?,
      tags:              row.get(12)?,
      seo_title:         row.get(13)?,
      seo_description:   row.get(14)?,
      view_count:        row.get(15)?,
      read_time_minutes: row.get(16)?,
      author_found:      row.get(17)?,
      author_full_name:  row.get(18)?,
      author_avatar_url: row.get(19)?,
      author_username:   row.get(20)?,
    })
  }

  /// Encode for insert. The author card is joined at read time, not stored.
  pub fn encode(b: &Blog) -> Result<Self> {
    Ok(Self {
      id:                encode_uuid(b.id),
      slug:              b.slug.clone(),
      title:             b.title.clone(),
      excerpt:           b.excerpt.clone(),
      content:           b.content.clone(),
      html_content:      b.html_content.clone(),
      cover_image:       b.cover_image.clone(),
      author_id:         b.author_id.map(encode_uuid),
      published:         b.published,
      published_at:      b.published_at.map(encode_dt),
      created_at:        encode_dt(b.created_at),
      updated_at:        b.updated_at.map(encode_dt),
      tags:              encode_tags(&b.tags)?,
      seo_title:         b.seo_title.clone(),
      seo_description:   b.seo_description.clone(),
      view_count:        encode_count(b.view_count),
      read_time_minutes: i64::from(b.read_time_minutes),
      author_found:      None,
      author_full_name:  None,
      author_avatar_url: None,
      author_username:   None,
    })
  }

  pub fn into_blog(self) -> Result<Blog> {
    let author = self.author_found.map(|_| BlogAuthor {
      full_name:  self.author_full_name,
      avatar_url: self.author_avatar_url,
      username:   self.author_username,
    });

    Ok(Blog {
      id: decode_uuid(&self.id)?,
      slug: self.slug,
      title: self.title,
      excerpt: self.excerpt,
      content: self.content,
      html_content: self.html_content,
      cover_image: self.cover_image,
      author_id: self.author_id.as_deref().map(decode_uuid).transpose()?,
      published: self.published,
      published_at: decode_opt_dt(self.published_at)?,
      created_at: decode_dt(&self.created_at)?,
      updated_at: decode_opt_dt(self.updated_at)?,
      tags: decode_tags(&self.tags)?,
      seo_title: self.seo_title,
      seo_description: self.seo_description,
      view_count: decode_count(self.view_count),
      read_time_minutes: u32::try_from(self.read_time_minutes).unwrap_or(0),
      author,
    })
  }

  pub fn into_summary(self) -> Result<BlogSummary> {
    let blog = self.into_blog()?;
    Ok(BlogSummary {
      id:                blog.id,
      slug:              blog.slug,
      title:             blog.title,
      excerpt:           blog.excerpt,
      cover_image:       blog.cover_image,
      published_at:      blog.published_at,
      tags:              blog.tags,
      read_time_minutes: blog.read_time_minutes,
      author:            blog.author,
    })
  }
}

/// Raw strings read for one sitemap entry.
pub struct RawBlogStamp {
  pub slug:         String,
  pub created_at:   String,
  pub published_at: Option<String>,
  pub updated_at:   Option<String>,
}

impl RawBlogStamp {
  pub fn into_stamp(self) -> Result<BlogStamp> {
    Ok(BlogStamp {
      slug:         self.slug,
      created_at:   decode_dt(&self.created_at)?,
      published_at: decode_opt_dt(self.published_at)?,
      updated_at:   decode_opt_dt(self.updated_at)?,
    })
  }
}

// ─── Waitlist ────────────────────────────────────────────────────────────────

pub struct RawWaitlistEntry {
  pub email:      String,
  pub full_name:  String,
  pub role:       String,
  pub verified:   bool,
  pub created_at: String,
}

impl RawWaitlistEntry {
  pub fn into_entry(self) -> Result<WaitlistEntry> {
    Ok(WaitlistEntry {
      email:      self.email,
      full_name:  self.full_name,
      role:       decode_role(&self.role)?,
      verified:   self.verified,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

// ─── Magic links ─────────────────────────────────────────────────────────────

pub struct RawMagicLink {
  pub token_hash:  String,
  pub email:       String,
  pub full_name:   Option<String>,
  pub role:        Option<String>,
  pub redirect_to: Option<String>,
  pub created_at:  String,
  pub expires_at:  String,
}

impl RawMagicLink {
  pub fn encode(link: &MagicLink) -> Self {
    Self {
      token_hash:  link.token_hash.clone(),
      email:       link.email.clone(),
      full_name:   link.full_name.clone(),
      role:        link.role.map(|r| r.to_string()),
      redirect_to: link.redirect_to.clone(),
      created_at:  encode_dt(link.created_at),
      expires_at:  encode_dt(link.expires_at),
    }
  }

  pub fn into_link(self) -> Result<MagicLink> {
    Ok(MagicLink {
      token_hash:  self.token_hash,
      email:       self.email,
      full_name:   self.full_name,
      role:        self.role.as_deref().map(decode_role).transpose()?,
      redirect_to: self.redirect_to,
      created_at:  decode_dt(&self.created_at)?,
      expires_at:  decode_dt(&self.expires_at)?,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn timestamps_sort_as_strings() {
    let a = decode_dt("2025-01-01T00:00:00Z").unwrap();
    let b = a + chrono::Duration::milliseconds(500);
    assert!(encode_dt(a) < encode_dt(b));
    assert_eq!(decode_dt(&encode_dt(b)).unwrap(), b);
  }

  #[test]
  fn like_wildcards_are_escaped() {
    assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
  }

  #[test]
  fn unknown_role_is_rejected() {
    assert!(matches!(decode_role("Nurse"), Err(Error::UnknownValue { column: "role", .. })));
  }
}
