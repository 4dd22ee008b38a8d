//! Error types for `aftertrials-core`.

use thiserror::Error;

/// Shown to a visitor who submits an email that is already registered.
pub const ALREADY_ON_WAITLIST: &str = "You are already on the waitlist.";

#[derive(Debug, Error)]
pub enum Error {
  #[error("You are already on the waitlist.")]
  DuplicateEntry,

  #[error("{op} failed: {source}")]
  Backend {
    op:     &'static str,
    #[source]
    source: Box<dyn std::error::Error + Send + Sync>,
  },

  #[error("{0} timed out")]
  Timeout(&'static str),

  #[error("xml error: {0}")]
  Xml(String),
}

impl Error {
  /// Wrap a backend error, tagging it with the operation that produced it.
  pub fn backend<E>(op: &'static str, source: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Backend { op, source: Box::new(source) }
  }

  /// The message a waitlist visitor sees for this error.
  ///
  /// A duplicate email always yields [`ALREADY_ON_WAITLIST`]; backend
  /// failures surface the backend's own message.
  pub fn user_message(&self) -> String {
    match self {
      Error::DuplicateEntry => ALREADY_ON_WAITLIST.to_owned(),
      Error::Backend { source, .. } => {
        let msg = source.to_string();
        if msg.trim().is_empty() {
          "Something went wrong.".to_owned()
        } else {
          msg
        }
      }
      Error::Timeout(_) => "The request timed out. Please try again.".to_owned(),
      Error::Xml(_) => "Something went wrong.".to_owned(),
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
