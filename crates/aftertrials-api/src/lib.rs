//! JSON API for the After Trials site.
//!
//! Exposes an axum [`Router`] backed by any store implementing the
//! `aftertrials-core` backend traits. Auth, TLS and transport concerns are
//! the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! let app = Router::new().merge(aftertrials_api::site_router(state));
//! ```

pub mod blogs;
pub mod error;
pub mod resolve;
pub mod waitlist;

use std::{sync::Arc, time::Duration};

use aftertrials_core::{
  blog::SiteInfo,
  store::{DEFAULT_TIMEOUT, MagicLinkSender, SiteStore, WaitlistStore},
};
use axum::{
  Router,
  routing::{get, post},
};

pub use error::ApiError;

/// Shared state for every API handler.
pub struct ApiState<S, M> {
  pub store: Arc<S>,
  /// Where sign-in links go out.
  pub links: Arc<M>,
  pub site:  Arc<SiteInfo>,
  /// Bound on each backend call.
  pub limit: Duration,
}

impl<S, M> ApiState<S, M> {
  pub fn new(store: Arc<S>, links: Arc<M>, site: SiteInfo) -> Self {
    Self { store, links, site: Arc::new(site), limit: DEFAULT_TIMEOUT }
  }

  pub fn with_timeout(mut self, limit: Duration) -> Self {
    self.limit = limit;
    self
  }
}

impl<S, M> Clone for ApiState<S, M> {
  fn clone(&self) -> Self {
    Self {
      store: Arc::clone(&self.store),
      links: Arc::clone(&self.links),
      site:  Arc::clone(&self.site),
      limit: self.limit,
    }
  }
}

/// Build the site router: the `/api` endpoints plus the catch-all
/// `/{slug}` resolver.
///
/// The returned `Router<()>` can be merged into any parent router regardless
/// of its own state type. Static routes registered by the parent take
/// precedence over `/{slug}`.
pub fn site_router<S, M>(state: ApiState<S, M>) -> Router<()>
where
  S: SiteStore + WaitlistStore + 'static,
  M: MagicLinkSender + 'static,
{
  Router::new()
    // Blogs
    .route("/api/blogs", get(blogs::list::<S, M>))
    .route("/api/blogs/{slug}", get(blogs::get_one::<S, M>))
    // Waitlist
    .route("/api/waitlist", post(waitlist::join::<S, M>))
    .route("/api/magic-link", post(waitlist::magic_link::<S, M>))
    // Profiles and canvases
    .route("/{slug}", get(resolve::handler::<S, M>))
    .with_state(state)
}

#[cfg(test)]
mod tests {
  use std::{io, sync::Mutex};

  use aftertrials_core::{
    auth::MagicLinkRequest,
    store::{Backend, MagicLinkSender, WaitlistStore},
  };
  use aftertrials_store_sqlite::{Fixture, SqliteStore};
  use axum::{
    body::Body,
    http::{Request, StatusCode, header},
  };
  use serde_json::{Value, json};
  use tower::ServiceExt as _;

  use super::*;

  /// Records requested links instead of sending them.
  #[derive(Default)]
  struct Outbox {
    sent: Mutex<Vec<MagicLinkRequest>>,
  }

  impl Backend for Outbox {
    type Error = io::Error;
  }

  impl MagicLinkSender for Outbox {
    async fn send_magic_link(&self, request: &MagicLinkRequest) -> Result<(), io::Error> {
      self.sent.lock().unwrap().push(request.clone());
      Ok(())
    }
  }

  const JANE: &str = "5b2f6a9e-1f7c-4d3a-9b52-6f0e2a7c1d11";
  const CANVAS: &str = "0c6e1a2b-3d4f-4a5b-8c6d-7e8f9a0b1c2d";

  fn fixture() -> Fixture {
    Fixture::from_json(&format!(
      r#"{{
        "profiles": [{{
          "id": "{JANE}", "username": "JaneDoe", "full_name": "Jane Doe",
          "created_at": "2025-01-01T00:00:00Z"
        }}],
        "posts": [{{
          "id": "9a1d5c3e-0b2f-4e6a-8d7c-1f2e3d4c5b6a", "author_id": "{JANE}",
          "title": "Rounds", "summary": null, "specialization": null,
          "created_at": "2025-01-02T00:00:00Z"
        }}],
        "canvases": [{{
          "id": "{CANVAS}", "author_id": "{JANE}", "title": "Case Notes",
          "content": "[{{\"type\":\"text\",\"data\":{{\"text\":\"Hi\"}}}}]",
          "is_published": true, "is_pinned_to_profile": false, "view_count": 0,
          "created_at": "2025-01-03T00:00:00Z", "updated_at": "2025-01-03T00:00:00Z"
        }}],
        "blogs": [
          {{
            "id": "1e2d3c4b-5a69-4788-9a0b-c1d2e3f4a5b6", "slug": "heart-health",
            "title": "Heart Health", "excerpt": "Look after it", "content": null,
            "html_content": null, "cover_image": null, "author_id": "{JANE}",
            "published": true, "published_at": "2025-02-01T00:00:00Z",
            "created_at": "2025-02-01T00:00:00Z", "updated_at": null,
            "tags": ["cardiology"], "seo_title": null, "seo_description": null
          }},
          {{
            "id": "2f3e4d5c-6b7a-4899-8a1b-d2e3f4a5b6c7", "slug": "ecg-basics",
            "title": "ECG Basics", "excerpt": null, "content": null,
            "html_content": null, "cover_image": null, "author_id": null,
            "published": true, "published_at": "2025-03-01T00:00:00Z",
            "created_at": "2025-03-01T00:00:00Z", "updated_at": null,
            "tags": ["cardiology"], "seo_title": null, "seo_description": null
          }},
          {{
            "id": "3a4b5c6d-7e8f-4a9b-8c0d-e1f2a3b4c5d6", "slug": "draft",
            "title": "Draft", "excerpt": null, "content": null,
            "html_content": null, "cover_image": null, "author_id": null,
            "published": false, "published_at": null,
            "created_at": "2025-04-01T00:00:00Z", "updated_at": null,
            "tags": [], "seo_title": null, "seo_description": null
          }}
        ]
      }}"#
    ))
    .expect("fixture json")
  }

  async fn make_state() -> ApiState<SqliteStore, Outbox> {
    let store = SqliteStore::open_in_memory().await.expect("in-memory store");
    store.import(&fixture()).await.expect("fixture import");
    ApiState::new(
      Arc::new(store),
      Arc::new(Outbox::default()),
      SiteInfo::new("https://aftertrials.com", "After Trials"),
    )
  }

  async fn send(
    state: ApiState<SqliteStore, Outbox>,
    method: &str,
    uri: &str,
    body: Option<Value>,
  ) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
      Some(json) => {
        builder = builder.header(header::CONTENT_TYPE, "application/json");
        Body::from(json.to_string())
      }
      None => Body::empty(),
    };
    let resp = site_router(state)
      .oneshot(builder.body(body).unwrap())
      .await
      .unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
      .await
      .unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
  }

  // ── Slug resolution ─────────────────────────────────────────────────────────

  #[tokio::test]
  async fn slug_resolves_profile_in_any_case() {
    let state = make_state().await;
    let (status, body) = send(state, "GET", "/janedoe", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["kind"], "profile");
    assert_eq!(body["view"]["profile"]["username"], "JaneDoe");
    assert_eq!(body["view"]["posts"][0]["title"], "Rounds");
    assert_eq!(body["view"]["pinned_canvas"]["slug"], "case-notes");
  }

  #[tokio::test]
  async fn slug_resolves_canvas_by_id_and_title() {
    let state = make_state().await;

    let (status, body) = send(state.clone(), "GET", &format!("/{CANVAS}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["kind"], "canvas");
    assert_eq!(body["view"]["content_blocks"][0]["data"]["text"], "Hi");

    let (status, body) = send(state, "GET", "/case-notes", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["view"]["id"], CANVAS);
    assert_eq!(body["view"]["post_count"], 1);
  }

  #[tokio::test]
  async fn unknown_slug_is_404() {
    let state = make_state().await;
    let (status, body) = send(state, "GET", "/123e4567-e89b-12d3-a456-426614174000", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].is_string());
  }

  // ── Blogs ───────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn blog_listing_paginates() {
    let state = make_state().await;
    let (status, body) = send(state, "GET", "/api/blogs?page=1&per_page=1", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 2);
    assert_eq!(body["total_pages"], 2);
    assert_eq!(body["has_next"], true);
    assert_eq!(body["has_previous"], false);
    assert_eq!(body["items"][0]["slug"], "ecg-basics");
  }

  #[tokio::test]
  async fn blog_detail_carries_meta_and_related() {
    let state = make_state().await;
    let (status, body) = send(state, "GET", "/api/blogs/heart-health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["meta"]["title"], "Heart Health | After Trials");
    assert_eq!(body["meta"]["canonical_url"], "https://aftertrials.com/blog/heart-health");
    assert_eq!(body["json_ld"]["@type"], "BlogPosting");
    assert_eq!(body["related"][0]["slug"], "ecg-basics");
    assert_eq!(body["blog"]["author"]["full_name"], "Jane Doe");
  }

  #[tokio::test]
  async fn unpublished_blog_is_404() {
    let state = make_state().await;
    let (status, _) = send(state, "GET", "/api/blogs/draft", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
  }

  // ── Waitlist ────────────────────────────────────────────────────────────────

  fn signup(email: &str) -> Value {
    json!({ "email": email, "full_name": "Jane Doe", "role": "Doctor" })
  }

  #[tokio::test]
  async fn waitlist_rejects_duplicates() {
    let state = make_state().await;

    let (status, body) =
      send(state.clone(), "POST", "/api/waitlist", Some(signup("jane@example.com"))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["status"], "created");

    let (status, body) =
      send(state, "POST", "/api/waitlist", Some(signup("Jane@Example.com"))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "You are already on the waitlist.");
  }

  #[tokio::test]
  async fn honeypot_never_reaches_the_store() {
    let state = make_state().await;
    let mut body = signup("bot@example.com");
    body["website_url_honey"] = json!("http://spam.example");

    let (status, resp) = send(state.clone(), "POST", "/api/waitlist", Some(body)).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(resp["status"], "ignored");
    assert!(
      state
        .store
        .find_waitlist_entry("bot@example.com")
        .await
        .unwrap()
        .is_none()
    );
  }

  #[tokio::test]
  async fn blank_fields_are_rejected() {
    let state = make_state().await;
    let (status, _) = send(state, "POST", "/api/waitlist", Some(signup("   "))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
  }

  #[tokio::test]
  async fn magic_link_is_handed_to_sender() {
    let state = make_state().await;
    let request = json!({ "email": " jane@example.com ", "role": "Student" });

    let (status, _) = send(state.clone(), "POST", "/api/magic-link", Some(request)).await;
    assert_eq!(status, StatusCode::ACCEPTED);

    let sent = state.links.sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].email, "jane@example.com");
  }
}
