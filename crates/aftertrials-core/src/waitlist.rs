//! The waitlist signup form.
//!
//! A linear, resumable form: `name → role → email → loading`, ending in
//! `success` or `error`. [`WaitlistForm`] holds the state and enforces the
//! transition guards; [`WaitlistForm::submit`] drives the remote calls.
//! Front ends (the terminal client, a browser) only translate input into
//! these transitions.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

use crate::{
  Error,
  Result,
  auth::MagicLinkRequest,
  store::{MagicLinkSender, WaitlistStore, bounded},
};

/// What a visitor does. Closed set.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  EnumIter,
)]
pub enum Role {
  Doctor,
  Student,
  Company,
  Other,
}

/// Input to [`WaitlistStore::create_waitlist_entry`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewWaitlistEntry {
  pub email:     String,
  pub full_name: String,
  pub role:      Role,
}

/// A stored waitlist entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaitlistEntry {
  pub email:      String,
  pub full_name:  String,
  pub role:       Role,
  /// False until the visitor follows their magic link.
  pub verified:   bool,
  pub created_at: DateTime<Utc>,
}

/// Outcome of inserting a waitlist entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaitlistInsert {
  Created,
  AlreadyListed,
}

/// Create the entry, then ask for a confirmation link.
///
/// Only the insert can fail this call. The link is best-effort: a failure
/// to send it is logged and the registration still counts.
pub async fn register<W, M>(
  store: &W,
  links: &M,
  entry: &NewWaitlistEntry,
  redirect_to: Option<String>,
  limit: Duration,
) -> Result<()>
where
  W: WaitlistStore,
  M: MagicLinkSender,
{
  let inserted = bounded(
    "create_waitlist_entry",
    limit,
    store.create_waitlist_entry(entry),
  )
  .await?;
  if inserted == WaitlistInsert::AlreadyListed {
    return Err(Error::DuplicateEntry);
  }

  let request = MagicLinkRequest {
    email:       entry.email.clone(),
    full_name:   Some(entry.full_name.clone()),
    role:        Some(entry.role),
    redirect_to,
  };
  if let Err(e) = bounded("send_magic_link", limit, links.send_magic_link(&request)).await {
    tracing::warn!(email = %entry.email, error = %e, "confirmation link not sent");
  }

  Ok(())
}

// ─── Form ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Step {
  Name,
  Role,
  Email,
  Loading,
  Success,
  Error,
}

/// State of one signup form instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaitlistForm {
  step:          Step,
  name:          String,
  role:          Option<Role>,
  email:         String,
  /// Hidden field real visitors never fill in.
  honeypot:      String,
  error_message: String,
}

impl Default for WaitlistForm {
  fn default() -> Self { Self::new() }
}

impl WaitlistForm {
  pub fn new() -> Self {
    Self {
      step:          Step::Name,
      name:          String::new(),
      role:          None,
      email:         String::new(),
      honeypot:      String::new(),
      error_message: String::new(),
    }
  }

  pub fn step(&self) -> Step { self.step }

  pub fn name(&self) -> &str { &self.name }

  pub fn role(&self) -> Option<Role> { self.role }

  pub fn email(&self) -> &str { &self.email }

  pub fn error_message(&self) -> &str { &self.error_message }

  pub fn set_name(&mut self, name: impl Into<String>) { self.name = name.into(); }

  pub fn set_email(&mut self, email: impl Into<String>) { self.email = email.into(); }

  pub fn set_honeypot(&mut self, value: impl Into<String>) { self.honeypot = value.into(); }

  /// Whether the "next"/"join" action is currently enabled.
  pub fn can_advance(&self) -> bool {
    match self.step {
      Step::Name => !self.name.trim().is_empty(),
      Step::Role => self.role.is_some(),
      Step::Email => !self.email.trim().is_empty(),
      _ => false,
    }
  }

  /// Explicit "next": `name → role` and `role → email`.
  pub fn next(&mut self) -> bool {
    let target = match self.step {
      Step::Name if self.can_advance() => Step::Role,
      Step::Role if self.can_advance() => Step::Email,
      _ => return false,
    };
    self.step = target;
    true
  }

  /// Record a role without leaving the role step.
  ///
  /// Front ends that show the selection before moving on call this, then
  /// [`next`](Self::next) once their delay elapses.
  pub fn choose_role(&mut self, role: Role) -> bool {
    if self.step != Step::Role {
      return false;
    }
    self.role = Some(role);
    true
  }

  /// Choose a role and advance straight to the email step.
  pub fn select_role(&mut self, role: Role) -> bool { self.choose_role(role) && self.next() }

  /// "Back" from role or email, and "try again" from error.
  pub fn back(&mut self) -> bool {
    let target = match self.step {
      Step::Role => Step::Name,
      Step::Email => Step::Role,
      Step::Error => Step::Email,
      _ => return false,
    };
    self.step = target;
    true
  }

  /// Start over after a successful signup, clearing every field.
  pub fn reset(&mut self) -> bool {
    if self.step != Step::Success {
      return false;
    }
    self.name.clear();
    self.role = None;
    self.email.clear();
    self.error_message.clear();
    self.step = Step::Name;
    true
  }

  /// Guard and enter `loading`, returning the entry to submit.
  ///
  /// Returns `None` and changes nothing when the honeypot is filled in, when
  /// not on the email step, or when a field is missing.
  pub fn begin_submit(&mut self) -> Option<NewWaitlistEntry> {
    if !self.honeypot.is_empty() {
      tracing::debug!("waitlist submission dropped by honeypot");
      return None;
    }
    if self.step != Step::Email {
      return None;
    }

    let email = self.email.trim();
    let full_name = self.name.trim();
    let role = self.role?;
    if email.is_empty() || full_name.is_empty() {
      return None;
    }

    let entry = NewWaitlistEntry {
      email: email.to_owned(),
      full_name: full_name.to_owned(),
      role,
    };
    self.step = Step::Loading;
    self.error_message.clear();
    Some(entry)
  }

  /// Leave `loading` with the outcome of the remote calls.
  pub fn finish_submit(&mut self, outcome: Result<()>) {
    if self.step != Step::Loading {
      return;
    }
    match outcome {
      Ok(()) => self.step = Step::Success,
      Err(e) => {
        tracing::warn!(error = %e, "waitlist signup failed");
        self.error_message = e.user_message();
        self.step = Step::Error;
      }
    }
  }

  /// Submit from the email step: guard, [`register`], record the outcome.
  ///
  /// Returns whether anything was submitted.
  pub async fn submit<W, M>(
    &mut self,
    store: &W,
    links: &M,
    redirect_to: Option<String>,
    limit: Duration,
  ) -> bool
  where
    W: WaitlistStore,
    M: MagicLinkSender,
  {
    let Some(entry) = self.begin_submit() else {
      return false;
    };
    let outcome = register(store, links, &entry, redirect_to, limit).await;
    self.finish_submit(outcome);
    true
  }
}
