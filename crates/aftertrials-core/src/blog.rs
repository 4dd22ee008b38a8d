//! Blog posts: listing queries, pagination, and page metadata.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use uuid::Uuid;

/// Default number of posts on one listing page.
pub const DEFAULT_PER_PAGE: u32 = 9;
/// Upper bound on a caller-supplied page size.
pub const MAX_PER_PAGE: u32 = 50;
/// How many related posts a detail page shows.
pub const RELATED_LIMIT: u32 = 3;

/// Site-wide values needed to build absolute URLs and titles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteInfo {
  /// Origin without a trailing slash, e.g. `https://aftertrials.com`.
  pub base_url:  String,
  pub site_name: String,
}

impl SiteInfo {
  pub fn new(base_url: impl Into<String>, site_name: impl Into<String>) -> Self {
    let base_url = base_url.into().trim_end_matches('/').to_owned();
    Self { base_url, site_name: site_name.into() }
  }

  pub fn url(&self, path: &str) -> String { format!("{}{}", self.base_url, path) }
}

/// The author card joined onto a blog post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlogAuthor {
  pub full_name:  Option<String>,
  pub avatar_url: Option<String>,
  pub username:   Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Blog {
  pub id:                Uuid,
  pub slug:              String,
  pub title:             String,
  pub excerpt:           Option<String>,
  /// Markdown body.
  pub content:           Option<String>,
  /// Pre-rendered body; takes priority over `content` when present.
  pub html_content:      Option<String>,
  pub cover_image:       Option<String>,
  pub author_id:         Option<Uuid>,
  #[serde(default)]
  pub published:         bool,
  pub published_at:      Option<DateTime<Utc>>,
  pub created_at:        DateTime<Utc>,
  pub updated_at:        Option<DateTime<Utc>>,
  #[serde(default)]
  pub tags:              Vec<String>,
  pub seo_title:         Option<String>,
  pub seo_description:   Option<String>,
  #[serde(default)]
  pub view_count:        u64,
  #[serde(default)]
  pub read_time_minutes: u32,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub author:            Option<BlogAuthor>,
}

impl Blog {
  pub fn published_or_created(&self) -> DateTime<Utc> {
    self.published_at.unwrap_or(self.created_at)
  }

  pub fn modified_or_created(&self) -> DateTime<Utc> {
    self.updated_at.unwrap_or(self.created_at)
  }
}

/// The fields a listing card needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlogSummary {
  pub id:                Uuid,
  pub slug:              String,
  pub title:             String,
  pub excerpt:           Option<String>,
  pub cover_image:       Option<String>,
  pub published_at:      Option<DateTime<Utc>>,
  #[serde(default)]
  pub tags:              Vec<String>,
  pub read_time_minutes: u32,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub author:            Option<BlogAuthor>,
}

/// Slug and timestamps of a published post, for the sitemap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlogStamp {
  pub slug:         String,
  pub created_at:   DateTime<Utc>,
  pub published_at: Option<DateTime<Utc>>,
  pub updated_at:   Option<DateTime<Utc>>,
}

impl BlogStamp {
  pub fn last_modified(&self) -> DateTime<Utc> {
    self.updated_at.or(self.published_at).unwrap_or(self.created_at)
  }
}

// ─── Listing ─────────────────────────────────────────────────────────────────

/// Parameters for [`SiteStore::list_blogs`](crate::store::SiteStore::list_blogs).
///
/// Only published posts are ever listed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlogQuery {
  /// Exact tag the post must carry.
  pub tag:    Option<String>,
  /// Case-insensitive substring matched against title and excerpt.
  pub search: Option<String>,
  pub limit:  u32,
  pub offset: u32,
}

/// 1-based page arithmetic for the blog listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
  pub page:     u32,
  pub per_page: u32,
}

impl Pagination {
  /// Clamp caller input: pages start at 1, page size stays within
  /// `1..=MAX_PER_PAGE`.
  pub fn new(page: Option<u32>, per_page: Option<u32>) -> Self {
    Self {
      page:     page.unwrap_or(1).max(1),
      per_page: per_page.unwrap_or(DEFAULT_PER_PAGE).clamp(1, MAX_PER_PAGE),
    }
  }

  pub fn offset(&self) -> u32 { (self.page - 1).saturating_mul(self.per_page) }

  /// Never less than one, so an empty listing still reads "page 1 of 1".
  pub fn total_pages(&self, total: u64) -> u32 {
    let pages = total.div_ceil(u64::from(self.per_page)).max(1);
    u32::try_from(pages).unwrap_or(u32::MAX)
  }

  pub fn query(&self, tag: Option<String>, search: Option<String>) -> BlogQuery {
    BlogQuery {
      tag,
      search,
      limit: self.per_page,
      offset: self.offset(),
    }
  }
}

/// One page of the blog listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlogPage {
  pub items:        Vec<BlogSummary>,
  pub page:         u32,
  pub per_page:     u32,
  pub total:        u64,
  pub total_pages:  u32,
  pub has_previous: bool,
  pub has_next:     bool,
}

impl BlogPage {
  pub fn new(items: Vec<BlogSummary>, total: u64, pagination: Pagination) -> Self {
    let total_pages = pagination.total_pages(total);
    Self {
      items,
      page: pagination.page,
      per_page: pagination.per_page,
      total,
      total_pages,
      has_previous: pagination.page > 1,
      has_next: pagination.page < total_pages,
    }
  }
}

// ─── Detail page metadata ────────────────────────────────────────────────────

/// Title, description and social-card data for a blog detail page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlogMeta {
  pub title:          String,
  pub description:    String,
  pub og_image:       String,
  pub canonical_url:  String,
  pub published_time: DateTime<Utc>,
  pub modified_time:  DateTime<Utc>,
}

impl BlogMeta {
  pub fn for_blog(blog: &Blog, site: &SiteInfo) -> Self {
    let headline = blog.seo_title.as_deref().unwrap_or(&blog.title);
    Self {
      title:          format!("{headline} | {}", site.site_name),
      description:    blog
        .seo_description
        .clone()
        .or_else(|| blog.excerpt.clone())
        .unwrap_or_else(|| blog.title.clone()),
      og_image:       blog
        .cover_image
        .clone()
        .unwrap_or_else(|| site.url("/og-default.jpg")),
      canonical_url:  site.url(&format!("/blog/{}", blog.slug)),
      published_time: blog.published_or_created(),
      modified_time:  blog.modified_or_created(),
    }
  }
}

/// schema.org `BlogPosting` structured data for a post.
pub fn json_ld(blog: &Blog, site: &SiteInfo) -> Value {
  let team = format!("{} Team", site.site_name);
  json!({
    "@context": "https://schema.org",
    "@type": "BlogPosting",
    "headline": blog.seo_title.as_deref().unwrap_or(&blog.title),
    "image": blog.cover_image.iter().collect::<Vec<_>>(),
    "datePublished": blog.published_or_created().to_rfc3339(),
    "dateModified": blog.modified_or_created().to_rfc3339(),
    "author": [{
      "@type": "Organization",
      "name": team,
      "url": site.base_url,
    }],
    "publisher": {
      "@type": "Organization",
      "name": site.site_name,
      "logo": {
        "@type": "ImageObject",
        "url": site.url("/icon.svg"),
      },
    },
    "description": blog.seo_description.as_deref().or(blog.excerpt.as_deref()),
    "mainEntityOfPage": {
      "@type": "WebPage",
      "@id": site.url(&format!("/blog/{}", blog.slug)),
    },
  })
}

/// A blog post with everything its detail page needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlogDetail {
  pub blog:    Blog,
  pub meta:    BlogMeta,
  pub json_ld: Value,
  pub related: Vec<BlogSummary>,
}
