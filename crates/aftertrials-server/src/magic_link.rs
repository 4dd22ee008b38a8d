//! Issuing and verifying magic sign-in links.
//!
//! A token is 32 random bytes, URL-safe base64 encoded. Only its SHA-256
//! digest is stored. Delivery is a structured log line carrying the link.

use std::sync::Arc;

use aftertrials_core::{
  auth::{AuthEvent, MagicLink, MagicLinkRequest},
  blog::SiteInfo,
  store::{Backend, MagicLinkSender, MagicLinkStore, bounded},
};
use axum::{
  extract::{Query, State},
  response::Redirect,
};
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{Duration, Utc};
use rand_core::{OsRng, RngCore as _};
use serde::Deserialize;
use sha2::{Digest, Sha256};

use crate::{AppState, error::Error};

const TOKEN_BYTES: usize = 32;

pub fn generate_token() -> String {
  let mut bytes = [0u8; TOKEN_BYTES];
  OsRng.fill_bytes(&mut bytes);
  URL_SAFE_NO_PAD.encode(bytes)
}

/// Lowercase hex SHA-256 of `token`.
pub fn hash_token(token: &str) -> String { hex::encode(Sha256::digest(token.as_bytes())) }

// ─── Sender ───────────────────────────────────────────────────────────────────

/// Issues links into a [`MagicLinkStore`].
pub struct MagicLinks<S> {
  store:    Arc<S>,
  base_url: String,
  ttl:      Duration,
}

impl<S: MagicLinkStore> MagicLinks<S> {
  pub fn new(store: Arc<S>, site: &SiteInfo, ttl: Duration) -> Self {
    Self { store, base_url: site.base_url.clone(), ttl }
  }

  /// Persist a new link for `request` and return its raw token.
  pub async fn issue(&self, request: &MagicLinkRequest) -> Result<String, S::Error> {
    let token = generate_token();
    let now = Utc::now();
    let link = MagicLink {
      token_hash:  hash_token(&token),
      email:       request.email.clone(),
      full_name:   request.full_name.clone(),
      role:        request.role,
      redirect_to: request.redirect_to.clone(),
      created_at:  now,
      expires_at:  now + self.ttl,
    };
    self.store.insert_magic_link(&link).await?;
    Ok(token)
  }

  pub fn verify_url(&self, token: &str) -> String {
    format!("{}/auth/verify?token={token}", self.base_url)
  }
}

impl<S: Backend> Backend for MagicLinks<S> {
  type Error = S::Error;
}

impl<S: MagicLinkStore> MagicLinkSender for MagicLinks<S> {
  async fn send_magic_link(&self, request: &MagicLinkRequest) -> Result<(), S::Error> {
    let token = self.issue(request).await?;
    tracing::info!(
      email = %request.email,
      url = %self.verify_url(&token),
      ttl_minutes = self.ttl.num_minutes(),
      "magic link issued"
    );
    Ok(())
  }
}

// ─── Verify ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct VerifyParams {
  pub token: String,
}

/// Whether `target` stays on this site: a rooted path or a URL under
/// `base_url`.
fn is_local_redirect(target: &str, site: &SiteInfo) -> bool {
  if target.starts_with('/') {
    return !target.starts_with("//");
  }
  target
    .strip_prefix(&site.base_url)
    .is_some_and(|rest| rest.is_empty() || rest.starts_with('/') || rest.starts_with('?'))
}

/// `GET /auth/verify?token=…`
///
/// Consumes the link, announces the sign-in, and redirects (303) to the
/// link's target or the site root.
pub async fn verify<S>(
  State(state): State<AppState<S>>,
  Query(params): Query<VerifyParams>,
) -> Result<Redirect, Error>
where
  S: MagicLinkStore,
{
  let token_hash = hash_token(&params.token);
  let link = bounded(
    "consume_magic_link",
    state.limit(),
    state.store.consume_magic_link(&token_hash, Utc::now()),
  )
  .await?
  .ok_or(Error::NotFound)?;

  let receivers = state.events.publish(AuthEvent::signed_in(link.email.as_str()));
  tracing::info!(email = %link.email, receivers, "magic link verified");

  let target = link
    .redirect_to
    .filter(|t| is_local_redirect(t, &state.site))
    .unwrap_or_else(|| state.site.base_url.clone());
  Ok(Redirect::to(&target))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn tokens_are_url_safe_and_distinct() {
    let a = generate_token();
    let b = generate_token();
    assert_ne!(a, b);
    assert_eq!(a.len(), 43);
    assert!(a.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
  }

  #[test]
  fn hash_is_hex_sha256() {
    assert_eq!(
      hash_token("abc"),
      "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
    );
  }

  #[test]
  fn redirects_stay_on_site() {
    let site = SiteInfo::new("https://aftertrials.com", "After Trials");
    assert!(is_local_redirect("/welcome", &site));
    assert!(is_local_redirect("https://aftertrials.com/blog", &site));
    assert!(is_local_redirect("https://aftertrials.com", &site));
    assert!(!is_local_redirect("//evil.example", &site));
    assert!(!is_local_redirect("https://aftertrials.com.evil.example", &site));
    assert!(!is_local_redirect("https://evil.example/", &site));
  }
}
