//! In-memory backend used by this crate's tests.

use std::{
  collections::HashMap,
  sync::{
    Mutex,
    atomic::{AtomicUsize, Ordering},
  },
  time::Duration,
};

use chrono::{DateTime, TimeZone as _, Utc};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use crate::{
  auth::MagicLinkRequest,
  blog::{Blog, BlogQuery, BlogStamp, BlogSummary},
  canvas::{Canvas, CanvasSummary},
  profile::{Post, Profile},
  store::{Backend, MagicLinkSender, SiteStore, WaitlistStore},
  waitlist::{NewWaitlistEntry, WaitlistEntry, WaitlistInsert},
};

#[derive(Debug, Error)]
#[error("{0}")]
pub struct MemoryError(String);

#[derive(Default)]
pub struct MemoryStore {
  profiles:   Mutex<Vec<Profile>>,
  posts:      Mutex<Vec<Post>>,
  canvases:   Mutex<Vec<Canvas>>,
  follows:    Mutex<Vec<(Uuid, Uuid)>>,
  blogs:      Mutex<Vec<Blog>>,
  waitlist:   Mutex<HashMap<String, WaitlistEntry>>,
  sent_links: Mutex<Vec<String>>,
  failure:    Mutex<Option<String>>,
  fail_links: Mutex<bool>,
  delay:      Mutex<Option<Duration>>,
  calls:      AtomicUsize,
}

fn at(minutes: i64) -> DateTime<Utc> {
  Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap() + chrono::Duration::minutes(minutes)
}

impl MemoryStore {
  // ── Seeding ───────────────────────────────────────────────────────────

  pub fn add_profile(&self, username: &str, full_name: &str) -> Profile {
    let profile = Profile {
      id:                  Uuid::new_v4(),
      username:            Some(username.into()),
      full_name:           Some(full_name.into()),
      avatar_url:          None,
      bio:                 None,
      specialization:      None,
      degree:              None,
      institution:         None,
      workplace:           None,
      country:             None,
      verification_status: None,
      created_at:          at(0),
    };
    self.profiles.lock().unwrap().push(profile.clone());
    profile
  }

  pub fn follow(&self, follower: Uuid, followed: Uuid) {
    self.follows.lock().unwrap().push((follower, followed));
  }

  pub fn add_post(&self, author_id: Uuid, title: &str, minute: i64) -> Post {
    let post = Post {
      id: Uuid::new_v4(),
      author_id,
      title: title.into(),
      summary: None,
      tags: vec![],
      upvote_count: 0,
      comment_count: 0,
      share_count: 0,
      specialization: None,
      created_at: at(minute),
    };
    self.posts.lock().unwrap().push(post.clone());
    post
  }

  pub fn add_canvas(&self, author_id: Uuid, title: &str, content: Value, minute: i64) -> Canvas {
    let canvas = Canvas {
      id: Uuid::new_v4(),
      author_id,
      title: Some(title.into()),
      content,
      is_published: true,
      is_pinned_to_profile: false,
      view_count: 0,
      created_at: at(minute),
      updated_at: at(minute),
    };
    self.canvases.lock().unwrap().push(canvas.clone());
    canvas
  }

  pub fn add_blog(&self, blog: Blog) { self.blogs.lock().unwrap().push(blog); }

  pub fn add_waitlist(&self, entry: NewWaitlistEntry) {
    self.waitlist.lock().unwrap().insert(entry.email.to_lowercase(), WaitlistEntry {
      email:      entry.email,
      full_name:  entry.full_name,
      role:       entry.role,
      verified:   false,
      created_at: at(0),
    });
  }

  // ── Behaviour knobs ───────────────────────────────────────────────────

  pub fn fail_with(&self, message: &str) { *self.failure.lock().unwrap() = Some(message.into()); }

  pub fn fail_links(&self) { *self.fail_links.lock().unwrap() = true; }

  pub fn delay(&self, by: Duration) { *self.delay.lock().unwrap() = Some(by); }

  // ── Inspection ────────────────────────────────────────────────────────

  /// Number of backend calls made so far.
  pub fn calls(&self) -> usize { self.calls.load(Ordering::SeqCst) }

  pub fn sent_links(&self) -> Vec<String> { self.sent_links.lock().unwrap().clone() }

  pub fn is_verified(&self, email: &str) -> bool {
    self
      .waitlist
      .lock()
      .unwrap()
      .get(&email.to_lowercase())
      .is_some_and(|e| e.verified)
  }

  async fn enter(&self) -> Result<(), MemoryError> {
    self.calls.fetch_add(1, Ordering::SeqCst);
    let delay = *self.delay.lock().unwrap();
    if let Some(by) = delay {
      tokio::time::sleep(by).await;
    }
    let failure = self.failure.lock().unwrap().clone();
    match failure {
      Some(message) => Err(MemoryError(message)),
      None => Ok(()),
    }
  }

  fn summary(blog: &Blog) -> BlogSummary {
    BlogSummary {
      id:                blog.id,
      slug:              blog.slug.clone(),
      title:             blog.title.clone(),
      excerpt:           blog.excerpt.clone(),
      cover_image:       blog.cover_image.clone(),
      published_at:      blog.published_at,
      tags:              blog.tags.clone(),
      read_time_minutes: blog.read_time_minutes,
      author:            blog.author.clone(),
    }
  }

  fn published_newest_first(&self) -> Vec<Blog> {
    let mut blogs: Vec<Blog> = self
      .blogs
      .lock()
      .unwrap()
      .iter()
      .filter(|b| b.published)
      .cloned()
      .collect();
    blogs.sort_by(|a, b| b.published_at.cmp(&a.published_at));
    blogs
  }
}

impl Backend for MemoryStore {
  type Error = MemoryError;
}

impl SiteStore for MemoryStore {
  async fn find_profile_by_username(&self, username: &str) -> Result<Option<Profile>, MemoryError> {
    self.enter().await?;
    let profiles = self.profiles.lock().unwrap();
    Ok(
      profiles
        .iter()
        .find(|p| {
          p.username
            .as_deref()
            .is_some_and(|u| u.to_lowercase() == username.to_lowercase())
        })
        .cloned(),
    )
  }

  async fn find_profile_by_id(&self, id: Uuid) -> Result<Option<Profile>, MemoryError> {
    self.enter().await?;
    let profiles = self.profiles.lock().unwrap();
    Ok(profiles.iter().find(|p| p.id == id).cloned())
  }

  async fn list_posts(&self, author_id: Uuid) -> Result<Vec<Post>, MemoryError> {
    self.enter().await?;
    let mut posts: Vec<Post> = self
      .posts
      .lock()
      .unwrap()
      .iter()
      .filter(|p| p.author_id == author_id)
      .cloned()
      .collect();
    posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(posts)
  }

  async fn count_posts(&self, author_id: Uuid) -> Result<u64, MemoryError> {
    Ok(self.list_posts(author_id).await?.len() as u64)
  }

  async fn find_latest_canvas(&self, author_id: Uuid) -> Result<Option<CanvasSummary>, MemoryError> {
    self.enter().await?;
    let canvases = self.canvases.lock().unwrap();
    Ok(
      canvases
        .iter()
        .filter(|c| c.author_id == author_id)
        .max_by_key(|c| c.created_at)
        .map(|c| CanvasSummary::new(c.id, c.title.clone())),
    )
  }

  async fn count_followers(&self, profile_id: Uuid) -> Result<u64, MemoryError> {
    self.enter().await?;
    let follows = self.follows.lock().unwrap();
    Ok(follows.iter().filter(|(_, to)| *to == profile_id).count() as u64)
  }

  async fn count_following(&self, profile_id: Uuid) -> Result<u64, MemoryError> {
    self.enter().await?;
    let follows = self.follows.lock().unwrap();
    Ok(follows.iter().filter(|(from, _)| *from == profile_id).count() as u64)
  }

  async fn find_canvas_by_id(&self, id: Uuid) -> Result<Option<Canvas>, MemoryError> {
    self.enter().await?;
    let canvases = self.canvases.lock().unwrap();
    Ok(canvases.iter().find(|c| c.id == id).cloned())
  }

  async fn find_canvas_by_title(&self, title: &str) -> Result<Option<Canvas>, MemoryError> {
    self.enter().await?;
    let canvases = self.canvases.lock().unwrap();
    Ok(
      canvases
        .iter()
        .filter(|c| c.title.as_deref().is_some_and(|t| t.to_lowercase() == title.to_lowercase()))
        .min_by_key(|c| (c.created_at, c.id))
        .cloned(),
    )
  }

  async fn list_blogs(&self, query: &BlogQuery) -> Result<(Vec<BlogSummary>, u64), MemoryError> {
    self.enter().await?;
    let needle = query.search.as_deref().map(str::to_lowercase);
    let matching: Vec<Blog> = self
      .published_newest_first()
      .into_iter()
      .filter(|b| query.tag.as_ref().is_none_or(|t| b.tags.contains(t)))
      .filter(|b| {
        needle.as_deref().is_none_or(|n| {
          b.title.to_lowercase().contains(n)
            || b.excerpt.as_deref().is_some_and(|e| e.to_lowercase().contains(n))
        })
      })
      .collect();
    let total = matching.len() as u64;
    let page = matching
      .iter()
      .skip(query.offset as usize)
      .take(query.limit as usize)
      .map(Self::summary)
      .collect();
    Ok((page, total))
  }

  async fn find_blog(&self, slug: &str) -> Result<Option<Blog>, MemoryError> {
    self.enter().await?;
    Ok(self.published_newest_first().into_iter().find(|b| b.slug == slug))
  }

  async fn related_blogs(
    &self,
    slug: &str,
    tags: &[String],
    limit: u32,
  ) -> Result<Vec<BlogSummary>, MemoryError> {
    self.enter().await?;
    Ok(
      self
        .published_newest_first()
        .iter()
        .filter(|b| b.slug != slug && b.tags.iter().any(|t| tags.contains(t)))
        .take(limit as usize)
        .map(Self::summary)
        .collect(),
    )
  }

  async fn sitemap_blogs(&self) -> Result<Vec<BlogStamp>, MemoryError> {
    self.enter().await?;
    Ok(
      self
        .published_newest_first()
        .into_iter()
        .map(|b| BlogStamp {
          slug:         b.slug,
          created_at:   b.created_at,
          published_at: b.published_at,
          updated_at:   b.updated_at,
        })
        .collect(),
    )
  }
}

impl WaitlistStore for MemoryStore {
  async fn create_waitlist_entry(
    &self,
    entry: &NewWaitlistEntry,
  ) -> Result<WaitlistInsert, MemoryError> {
    self.enter().await?;
    let key = entry.email.to_lowercase();
    let mut waitlist = self.waitlist.lock().unwrap();
    if waitlist.contains_key(&key) {
      return Ok(WaitlistInsert::AlreadyListed);
    }
    waitlist.insert(key, WaitlistEntry {
      email:      entry.email.clone(),
      full_name:  entry.full_name.clone(),
      role:       entry.role,
      verified:   false,
      created_at: at(0),
    });
    Ok(WaitlistInsert::Created)
  }

  async fn mark_waitlist_verified(&self, email: &str) -> Result<bool, MemoryError> {
    self.enter().await?;
    let mut waitlist = self.waitlist.lock().unwrap();
    Ok(match waitlist.get_mut(&email.to_lowercase()) {
      Some(entry) => {
        entry.verified = true;
        true
      }
      None => false,
    })
  }

  async fn find_waitlist_entry(&self, email: &str) -> Result<Option<WaitlistEntry>, MemoryError> {
    self.enter().await?;
    Ok(self.waitlist.lock().unwrap().get(&email.to_lowercase()).cloned())
  }
}

impl MagicLinkSender for MemoryStore {
  async fn send_magic_link(&self, request: &MagicLinkRequest) -> Result<(), MemoryError> {
    self.enter().await?;
    if *self.fail_links.lock().unwrap() {
      return Err(MemoryError("mailer unavailable".into()));
    }
    self.sent_links.lock().unwrap().push(request.email.clone());
    Ok(())
  }
}
