//! Application state and key dispatch.
//!
//! All form rules live in [`WaitlistForm`]; this module only maps keys onto
//! its transitions and owns the timing the terminal adds on top.

use std::{
  sync::Arc,
  time::{Duration, Instant},
};

use aftertrials_core::{
  store::DEFAULT_TIMEOUT,
  waitlist::{self, NewWaitlistEntry, Role, Step, WaitlistForm},
};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use strum::IntoEnumIterator as _;

use crate::client::ApiClient;

/// How long a chosen role stays highlighted before the form moves on.
pub const ROLE_ADVANCE_DELAY: Duration = Duration::from_millis(300);

// ─── App ──────────────────────────────────────────────────────────────────────

/// Top-level application state.
pub struct App {
  pub form: WaitlistForm,

  /// Cursor within [`App::roles`] on the role step.
  pub role_cursor: usize,

  /// When a pending role auto-advance fires.
  advance_at: Option<Instant>,

  /// Entry accepted by the form, waiting to be sent on the next loop turn.
  pending: Option<NewWaitlistEntry>,

  /// Forwarded with the confirmation link.
  redirect_to: Option<String>,

  pub client: Arc<ApiClient>,
}

impl App {
  pub fn new(client: ApiClient, redirect_to: Option<String>) -> Self {
    Self {
      form: WaitlistForm::new(),
      role_cursor: 0,
      advance_at: None,
      pending: None,
      redirect_to,
      client: Arc::new(client),
    }
  }

  pub fn roles() -> Vec<Role> { Role::iter().collect() }

  /// Whether a chosen role is still on screen before auto-advancing.
  pub fn advancing(&self) -> bool { self.advance_at.is_some() }

  // ── Timing and submission ─────────────────────────────────────────────────

  /// Fire a due role auto-advance.
  pub fn tick(&mut self, now: Instant) {
    if let Some(at) = self.advance_at
      && now >= at
    {
      self.advance_at = None;
      self.form.next();
    }
  }

  /// Send the entry accepted by the last submit, if any.
  pub async fn flush_pending(&mut self) {
    let Some(entry) = self.pending.take() else {
      return;
    };
    let client = self.client.as_ref();
    let outcome = waitlist::register(
      client,
      client,
      &entry,
      self.redirect_to.clone(),
      DEFAULT_TIMEOUT,
    )
    .await;
    self.form.finish_submit(outcome);
  }

  // ── Key handling ──────────────────────────────────────────────────────────

  /// Process a key event. Returns `true` to continue, `false` to quit.
  pub fn handle_key(&mut self, key: KeyEvent) -> bool {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
      return false;
    }
    // Input is ignored while a role is being shown or a request is out.
    if self.advance_at.is_some() || self.pending.is_some() {
      return true;
    }

    match self.form.step() {
      Step::Name => self.handle_name_key(key),
      Step::Role => self.handle_role_key(key),
      Step::Email => self.handle_email_key(key),
      Step::Loading => true,
      Step::Success => self.handle_success_key(key),
      Step::Error => self.handle_error_key(key),
    }
  }

  fn handle_name_key(&mut self, key: KeyEvent) -> bool {
    match key.code {
      KeyCode::Esc => return false,
      KeyCode::Enter => {
        self.form.next();
      }
      KeyCode::Backspace => {
        let mut name = self.form.name().to_owned();
        name.pop();
        self.form.set_name(name);
      }
      KeyCode::Char(c) => {
        let name = format!("{}{c}", self.form.name());
        self.form.set_name(name);
      }
      _ => {}
    }
    true
  }

  fn handle_role_key(&mut self, key: KeyEvent) -> bool {
    let roles = Self::roles();
    match key.code {
      KeyCode::Esc | KeyCode::Left => {
        self.form.back();
      }
      KeyCode::Down | KeyCode::Char('j') => {
        if self.role_cursor + 1 < roles.len() {
          self.role_cursor += 1;
        }
      }
      KeyCode::Up | KeyCode::Char('k') => {
        self.role_cursor = self.role_cursor.saturating_sub(1);
      }
      KeyCode::Enter => self.choose(roles[self.role_cursor]),
      KeyCode::Char(c) => {
        if let Some(i) = c.to_digit(10).and_then(|d| (d as usize).checked_sub(1))
          && i < roles.len()
        {
          self.role_cursor = i;
          self.choose(roles[i]);
        }
      }
      _ => {}
    }
    true
  }

  fn choose(&mut self, role: Role) {
    if self.form.choose_role(role) {
      self.advance_at = Some(Instant::now() + ROLE_ADVANCE_DELAY);
    }
  }

  fn handle_email_key(&mut self, key: KeyEvent) -> bool {
    match key.code {
      KeyCode::Esc => {
        self.form.back();
      }
      KeyCode::Enter => {
        self.pending = self.form.begin_submit();
      }
      KeyCode::Backspace => {
        let mut email = self.form.email().to_owned();
        email.pop();
        self.form.set_email(email);
      }
      KeyCode::Char(c) => {
        let email = format!("{}{c}", self.form.email());
        self.form.set_email(email);
      }
      _ => {}
    }
    true
  }

  fn handle_success_key(&mut self, key: KeyEvent) -> bool {
    match key.code {
      KeyCode::Char('q') | KeyCode::Esc => return false,
      KeyCode::Enter | KeyCode::Char('r') => {
        self.form.reset();
        self.role_cursor = 0;
      }
      _ => {}
    }
    true
  }

  fn handle_error_key(&mut self, key: KeyEvent) -> bool {
    match key.code {
      KeyCode::Char('q') | KeyCode::Esc => return false,
      KeyCode::Enter | KeyCode::Char('r') => {
        self.form.back();
      }
      _ => {}
    }
    true
  }
}
