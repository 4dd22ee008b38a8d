//! Sign-in events and waitlist verification.
//!
//! Following a magic link publishes an [`AuthEvent`]. A
//! [`VerificationListener`] turns each sign-in into a best-effort
//! `verified = true` update on the matching waitlist entry. The listener
//! keys on the email carried by the event, never on any form state, since a
//! visitor typically returns from their inbox in a fresh session.

use std::{sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::{
  sync::broadcast::{self, error::RecvError},
  task::JoinHandle,
};

use crate::{
  store::{WaitlistStore, bounded},
  waitlist::Role,
};

const EVENT_CAPACITY: usize = 64;

// ─── Magic links ─────────────────────────────────────────────────────────────

/// A request to email a sign-in link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MagicLinkRequest {
  pub email:       String,
  #[serde(default)]
  pub full_name:   Option<String>,
  #[serde(default)]
  pub role:        Option<Role>,
  /// Where to send the visitor once the link is verified.
  #[serde(default)]
  pub redirect_to: Option<String>,
}

/// An issued link, as persisted. The raw token is never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MagicLink {
  /// Lowercase hex SHA-256 of the token.
  pub token_hash:  String,
  pub email:       String,
  pub full_name:   Option<String>,
  pub role:        Option<Role>,
  pub redirect_to: Option<String>,
  pub created_at:  DateTime<Utc>,
  pub expires_at:  DateTime<Utc>,
}

// ─── Events ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthEventKind {
  SignedIn,
  SignedOut,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthEvent {
  pub kind:  AuthEventKind,
  pub email: Option<String>,
}

impl AuthEvent {
  pub fn signed_in(email: impl Into<String>) -> Self {
    Self { kind: AuthEventKind::SignedIn, email: Some(email.into()) }
  }

  /// The email of a sign-in event, if it carries one.
  pub fn signed_in_email(&self) -> Option<&str> {
    match self.kind {
      AuthEventKind::SignedIn => self.email.as_deref().filter(|e| !e.is_empty()),
      AuthEventKind::SignedOut => None,
    }
  }
}

/// Publisher side of the auth event stream. Cheap to clone.
#[derive(Debug, Clone)]
pub struct AuthEvents {
  tx: broadcast::Sender<AuthEvent>,
}

impl Default for AuthEvents {
  fn default() -> Self { Self::new() }
}

impl AuthEvents {
  pub fn new() -> Self { Self { tx: broadcast::channel(EVENT_CAPACITY).0 } }

  /// Publish an event. Returns how many subscribers received it.
  pub fn publish(&self, event: AuthEvent) -> usize { self.tx.send(event).unwrap_or(0) }

  pub fn subscribe(&self) -> broadcast::Receiver<AuthEvent> { self.tx.subscribe() }
}

// ─── Verification ────────────────────────────────────────────────────────────

/// Mark the waitlist entry for `email` verified, logging instead of failing.
///
/// Returns whether an entry was updated.
pub async fn confirm_verification<W>(store: &W, email: &str, limit: Duration) -> bool
where
  W: WaitlistStore,
{
  match bounded("mark_waitlist_verified", limit, store.mark_waitlist_verified(email)).await {
    Ok(matched) => {
      tracing::debug!(email, matched, "waitlist verification synced");
      matched
    }
    Err(e) => {
      tracing::warn!(email, error = %e, "waitlist verification sync failed");
      false
    }
  }
}

/// Background subscription reconciling sign-ins with the waitlist.
///
/// Register one per owner. Dropping the listener aborts its task, which
/// deregisters it from the event stream.
#[derive(Debug)]
pub struct VerificationListener {
  task: JoinHandle<()>,
}

impl VerificationListener {
  pub fn spawn<W>(
    store: Arc<W>,
    mut events: broadcast::Receiver<AuthEvent>,
    limit: Duration,
  ) -> Self
  where
    W: WaitlistStore + 'static,
  {
    let task = tokio::spawn(async move {
      loop {
        match events.recv().await {
          Ok(event) => {
            if let Some(email) = event.signed_in_email() {
              confirm_verification(store.as_ref(), email, limit).await;
            }
          }
          Err(RecvError::Lagged(skipped)) => {
            tracing::warn!(skipped, "verification listener fell behind");
          }
          Err(RecvError::Closed) => break,
        }
      }
    });
    Self { task }
  }

  pub fn is_finished(&self) -> bool { self.task.is_finished() }
}

impl Drop for VerificationListener {
  fn drop(&mut self) { self.task.abort(); }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{
    store::DEFAULT_TIMEOUT,
    testing::MemoryStore,
    waitlist::{NewWaitlistEntry, Role},
  };

  fn seeded() -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::default());
    store.add_waitlist(NewWaitlistEntry {
      email:     "jane@example.com".into(),
      full_name: "Jane".into(),
      role:      Role::Doctor,
    });
    store
  }

  async fn settle() { tokio::time::sleep(Duration::from_millis(50)).await; }

  #[tokio::test]
  async fn sign_in_marks_entry_verified() {
    let store = seeded();
    let events = AuthEvents::new();
    let _listener = VerificationListener::spawn(store.clone(), events.subscribe(), DEFAULT_TIMEOUT);

    assert_eq!(events.publish(AuthEvent::signed_in("jane@example.com")), 1);
    settle().await;
    assert!(store.is_verified("jane@example.com"));
  }

  #[tokio::test]
  async fn events_without_email_are_ignored() {
    let store = seeded();
    let events = AuthEvents::new();
    let _listener = VerificationListener::spawn(store.clone(), events.subscribe(), DEFAULT_TIMEOUT);

    events.publish(AuthEvent { kind: AuthEventKind::SignedIn, email: None });
    events.publish(AuthEvent {
      kind:  AuthEventKind::SignedOut,
      email: Some("jane@example.com".into()),
    });
    settle().await;
    assert!(!store.is_verified("jane@example.com"));
    assert_eq!(store.calls(), 0);
  }

  #[tokio::test]
  async fn backend_failure_is_swallowed() {
    let store = seeded();
    store.fail_with("unavailable");
    assert!(!confirm_verification(store.as_ref(), "jane@example.com", DEFAULT_TIMEOUT).await);
  }

  #[tokio::test]
  async fn dropping_listener_deregisters_it() {
    let store = seeded();
    let events = AuthEvents::new();
    let listener = VerificationListener::spawn(store.clone(), events.subscribe(), DEFAULT_TIMEOUT);
    drop(listener);
    settle().await;

    assert_eq!(events.publish(AuthEvent::signed_in("jane@example.com")), 0);
    assert!(!store.is_verified("jane@example.com"));
  }

  #[tokio::test]
  async fn closed_stream_ends_listener() {
    let store = seeded();
    let events = AuthEvents::new();
    let listener = VerificationListener::spawn(store, events.subscribe(), DEFAULT_TIMEOUT);
    drop(events);
    settle().await;
    assert!(listener.is_finished());
  }
}
