//! HTTP server for the After Trials site.
//!
//! Combines the JSON API from `aftertrials-api` with the routes that need
//! server-side secrets or side effects: magic-link verification and the
//! sitemap.

pub mod auth;
pub mod error;
pub mod magic_link;
pub mod sitemap;

pub use error::Error;

use std::{path::PathBuf, sync::Arc, time::Duration};

use aftertrials_api::ApiState;
use aftertrials_core::{
  auth::AuthEvents,
  blog::SiteInfo,
  store::{MagicLinkStore, SiteStore, WaitlistStore},
};
use axum::{
  Router,
  routing::{get, post},
};
use chrono::TimeDelta;
use serde::Deserialize;
use tower_http::trace::TraceLayer;

use magic_link::MagicLinks;

// ─── Configuration ────────────────────────────────────────────────────────────

/// One year.
pub const MAX_LINK_TTL_MINUTES: i64 = 365 * 24 * 60;

/// Runtime server configuration, deserialised from `config.toml` and
/// `AFTERTRIALS_*` environment variables.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
  pub host:                   String,
  pub port:                   u16,
  /// Public origin used in links, canonical URLs and the sitemap.
  pub base_url:               String,
  pub site_name:              String,
  pub store_path:             PathBuf,
  /// Where `/internal/update-sitemap` writes `sitemap.xml`.
  pub public_dir:             PathBuf,
  /// argon2 PHC string of the cron secret. Unset disables the internal
  /// endpoints.
  pub cron_secret_hash:       Option<String>,
  pub backend_timeout_ms:     u64,
  pub magic_link_ttl_minutes: i64,
  /// JSON fixture loaded into the store at startup.
  pub import:                 Option<PathBuf>,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:                   "127.0.0.1".to_string(),
      port:                   8080,
      base_url:               "http://localhost:8080".to_string(),
      site_name:              "After Trials".to_string(),
      store_path:             PathBuf::from("aftertrials.db"),
      public_dir:             PathBuf::from("public"),
      cron_secret_hash:       None,
      backend_timeout_ms:     5000,
      magic_link_ttl_minutes: 60,
      import:                 None,
    }
  }
}

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through the server's own handlers.
pub struct AppState<S> {
  pub store:  Arc<S>,
  pub links:  Arc<MagicLinks<S>>,
  pub events: AuthEvents,
  pub site:   Arc<SiteInfo>,
  pub config: Arc<ServerConfig>,
}

impl<S> Clone for AppState<S> {
  fn clone(&self) -> Self {
    Self {
      store:  Arc::clone(&self.store),
      links:  Arc::clone(&self.links),
      events: self.events.clone(),
      site:   Arc::clone(&self.site),
      config: Arc::clone(&self.config),
    }
  }
}

impl ServerConfig {
  /// Lifetime of an issued magic link, between one minute and
  /// [`MAX_LINK_TTL_MINUTES`].
  pub fn magic_link_ttl(&self) -> anyhow::Result<TimeDelta> {
    let minutes = self.magic_link_ttl_minutes;
    (1..=MAX_LINK_TTL_MINUTES)
      .contains(&minutes)
      .then(|| TimeDelta::try_minutes(minutes))
      .flatten()
      .ok_or_else(|| {
        anyhow::anyhow!(
          "magic_link_ttl_minutes must be between 1 and {MAX_LINK_TTL_MINUTES}, got {minutes}"
        )
      })
  }
}

impl<S: MagicLinkStore> AppState<S> {
  /// Fails when the configuration is out of range.
  pub fn new(store: Arc<S>, config: ServerConfig) -> anyhow::Result<Self> {
    let ttl = config.magic_link_ttl()?;
    let site = SiteInfo::new(config.base_url.clone(), config.site_name.clone());
    let links = MagicLinks::new(Arc::clone(&store), &site, ttl);
    Ok(Self {
      store,
      links: Arc::new(links),
      events: AuthEvents::new(),
      site: Arc::new(site),
      config: Arc::new(config),
    })
  }
}

impl<S> AppState<S> {
  /// Bound on each backend call.
  pub fn limit(&self) -> Duration { Duration::from_millis(self.config.backend_timeout_ms) }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the full site [`Router`].
pub fn router<S>(state: AppState<S>) -> Router
where
  S: SiteStore + WaitlistStore + MagicLinkStore + 'static,
{
  let api = aftertrials_api::site_router(ApiState {
    store: Arc::clone(&state.store),
    links: Arc::clone(&state.links),
    site:  Arc::clone(&state.site),
    limit: state.limit(),
  });

  Router::new()
    .route("/auth/verify",             get(magic_link::verify::<S>))
    .route("/sitemap.xml",             get(sitemap::serve::<S>))
    .route("/internal/update-sitemap", post(sitemap::update::<S>))
    .with_state(state)
    .merge(api)
    .layer(TraceLayer::new_for_http())
}

// ─── Integration tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use super::*;

  use aftertrials_core::{
    auth::{MagicLinkRequest, VerificationListener},
    waitlist::{NewWaitlistEntry, Role},
  };
  use aftertrials_store_sqlite::SqliteStore;
  use argon2::{Argon2, PasswordHasher, password_hash::SaltString};
  use axum::{
    body::Body,
    http::{Request, StatusCode, header},
  };
  use rand_core::OsRng;
  use tower::ServiceExt as _;
  use uuid::Uuid;

  async fn make_state(secret: &str, public_dir: PathBuf) -> AppState<SqliteStore> {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
      .hash_password(secret.as_bytes(), &salt)
      .unwrap()
      .to_string();

    AppState::new(Arc::new(store), ServerConfig {
      base_url: "https://aftertrials.com".to_string(),
      public_dir,
      cron_secret_hash: Some(hash),
      ..ServerConfig::default()
    })
    .unwrap()
  }

  fn scratch_dir() -> PathBuf { std::env::temp_dir().join(format!("aftertrials-{}", Uuid::new_v4())) }

  async fn oneshot_raw(
    state: AppState<SqliteStore>,
    method: &str,
    uri: &str,
    headers: Vec<(header::HeaderName, &str)>,
  ) -> axum::response::Response {
    let mut builder = Request::builder().method(method).uri(uri);
    for (k, v) in headers {
      builder = builder.header(k, v);
    }
    router(state)
      .oneshot(builder.body(Body::empty()).unwrap())
      .await
      .unwrap()
  }

  fn request(email: &str, redirect_to: Option<&str>) -> MagicLinkRequest {
    MagicLinkRequest {
      email:       email.to_string(),
      full_name:   Some("Jane".to_string()),
      role:        Some(Role::Doctor),
      redirect_to: redirect_to.map(str::to_string),
    }
  }

  // ── Configuration ───────────────────────────────────────────────────────────

  #[test]
  fn link_ttl_must_be_positive_and_in_range() {
    let with_ttl = |minutes| ServerConfig { magic_link_ttl_minutes: minutes, ..ServerConfig::default() };

    assert_eq!(with_ttl(60).magic_link_ttl().unwrap(), TimeDelta::minutes(60));
    assert!(with_ttl(0).magic_link_ttl().is_err());
    assert!(with_ttl(-5).magic_link_ttl().is_err());
    assert!(with_ttl(MAX_LINK_TTL_MINUTES + 1).magic_link_ttl().is_err());
    assert!(with_ttl(i64::MAX).magic_link_ttl().is_err());
  }

  #[tokio::test]
  async fn state_rejects_negative_ttl() {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let config = ServerConfig { magic_link_ttl_minutes: -1, ..ServerConfig::default() };
    assert!(AppState::new(Arc::new(store), config).is_err());
  }

  // ── Magic links ─────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn verify_redirects_once() {
    let state = make_state("secret", scratch_dir()).await;
    let token = state
      .links
      .issue(&request("jane@example.com", Some("/welcome")))
      .await
      .unwrap();
    let uri = format!("/auth/verify?token={token}");

    let resp = oneshot_raw(state.clone(), "GET", &uri, vec![]).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(resp.headers()[header::LOCATION], "/welcome");

    let resp = oneshot_raw(state, "GET", &uri, vec![]).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
  }

  #[tokio::test]
  async fn foreign_redirect_falls_back_to_site() {
    let state = make_state("secret", scratch_dir()).await;
    let token = state
      .links
      .issue(&request("jane@example.com", Some("https://evil.example/")))
      .await
      .unwrap();

    let resp = oneshot_raw(state, "GET", &format!("/auth/verify?token={token}"), vec![]).await;
    assert_eq!(resp.headers()[header::LOCATION], "https://aftertrials.com");
  }

  #[tokio::test]
  async fn unknown_token_is_404() {
    let state = make_state("secret", scratch_dir()).await;
    let resp = oneshot_raw(state, "GET", "/auth/verify?token=nope", vec![]).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
  }

  #[tokio::test]
  async fn sign_in_verifies_waitlist_entry() {
    let state = make_state("secret", scratch_dir()).await;
    state
      .store
      .create_waitlist_entry(&NewWaitlistEntry {
        email:     "jane@example.com".to_string(),
        full_name: "Jane".to_string(),
        role:      Role::Doctor,
      })
      .await
      .unwrap();
    let _listener =
      VerificationListener::spawn(state.store.clone(), state.events.subscribe(), state.limit());

    let token = state
      .links
      .issue(&request("jane@example.com", None))
      .await
      .unwrap();
    let resp = oneshot_raw(state.clone(), "GET", &format!("/auth/verify?token={token}"), vec![]).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);

    tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    let entry = state
      .store
      .find_waitlist_entry("jane@example.com")
      .await
      .unwrap()
      .unwrap();
    assert!(entry.verified);
  }

  // ── Sitemap ─────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn sitemap_is_served_live() {
    let state = make_state("secret", scratch_dir()).await;
    let resp = oneshot_raw(state, "GET", "/sitemap.xml", vec![]).await;

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()[header::CONTENT_TYPE], "application/xml");
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
      .await
      .unwrap();
    let xml = std::str::from_utf8(&bytes).unwrap();
    assert!(xml.contains("<loc>https://aftertrials.com/blog</loc>"), "sitemap: {xml}");
  }

  #[tokio::test]
  async fn sitemap_update_requires_secret() {
    let dir = scratch_dir();
    let state = make_state("secret", dir.clone()).await;

    let resp = oneshot_raw(state.clone(), "POST", "/internal/update-sitemap", vec![]).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = oneshot_raw(state, "POST", "/internal/update-sitemap", vec![(
      header::AUTHORIZATION,
      "Bearer wrong",
    )])
    .await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert!(!dir.join("sitemap.xml").exists());
  }

  #[tokio::test]
  async fn sitemap_update_writes_file() {
    let dir = scratch_dir();
    let state = make_state("secret", dir.clone()).await;

    let resp = oneshot_raw(state, "POST", "/internal/update-sitemap", vec![(
      header::AUTHORIZATION,
      "Bearer secret",
    )])
    .await;
    assert_eq!(resp.status(), StatusCode::OK);

    let written = std::fs::read_to_string(dir.join("sitemap.xml")).unwrap();
    assert!(written.contains("<urlset"));
    std::fs::remove_dir_all(&dir).ok();
  }

  // ── API passthrough ─────────────────────────────────────────────────────────

  #[tokio::test]
  async fn api_routes_are_mounted() {
    let state = make_state("secret", scratch_dir()).await;
    let resp = oneshot_raw(state.clone(), "GET", "/api/blogs", vec![]).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = oneshot_raw(state, "GET", "/nobody-here", vec![]).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
  }
}
