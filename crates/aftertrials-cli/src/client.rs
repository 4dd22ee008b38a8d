//! Async HTTP client for the After Trials waitlist API.
//!
//! Implements the core backend traits so [`WaitlistForm`] can drive a
//! running server exactly as it drives any other store.
//!
//! [`WaitlistForm`]: aftertrials_core::waitlist::WaitlistForm

use std::time::Duration;

use aftertrials_core::{
  auth::MagicLinkRequest,
  store::{Backend, MagicLinkSender, WaitlistStore},
  waitlist::{NewWaitlistEntry, WaitlistEntry, WaitlistInsert},
};
use anyhow::Context as _;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
  #[error("could not reach the server: {0}")]
  Http(#[from] reqwest::Error),

  /// A non-success response. Displays the server's own message.
  #[error("{message}")]
  Server { status: StatusCode, message: String },

  #[error("waitlist entries cannot be read over the API")]
  Unsupported,
}

/// Body of an error response.
#[derive(Deserialize)]
struct ErrorBody {
  error: String,
}

/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct ApiClient {
  client:   Client,
  base_url: String,
}

impl ApiClient {
  pub fn new(base_url: impl Into<String>) -> anyhow::Result<Self> {
    let client = Client::builder()
      .timeout(Duration::from_secs(30))
      .build()
      .context("failed to build HTTP client")?;
    Ok(Self { client, base_url: base_url.into() })
  }

  pub fn base_url(&self) -> &str { &self.base_url }

  fn url(&self, path: &str) -> String {
    format!("{}/api{}", self.base_url.trim_end_matches('/'), path)
  }

  /// Turn a non-success response into [`ClientError::Server`].
  async fn failure(resp: reqwest::Response) -> ClientError {
    let status = resp.status();
    let message = match resp.json::<ErrorBody>().await {
      Ok(body) => body.error,
      Err(_) => status
        .canonical_reason()
        .unwrap_or("Something went wrong.")
        .to_string(),
    };
    ClientError::Server { status, message }
  }
}

impl Backend for ApiClient {
  type Error = ClientError;
}

impl WaitlistStore for ApiClient {
  /// `POST /api/waitlist`
  async fn create_waitlist_entry(
    &self,
    entry: &NewWaitlistEntry,
  ) -> Result<WaitlistInsert, ClientError> {
    let resp = self
      .client
      .post(self.url("/waitlist"))
      .json(entry)
      .send()
      .await?;

    match resp.status() {
      StatusCode::CONFLICT => Ok(WaitlistInsert::AlreadyListed),
      s if s.is_success() => Ok(WaitlistInsert::Created),
      _ => Err(Self::failure(resp).await),
    }
  }

  async fn mark_waitlist_verified(&self, _email: &str) -> Result<bool, ClientError> {
    Err(ClientError::Unsupported)
  }

  async fn find_waitlist_entry(&self, _email: &str) -> Result<Option<WaitlistEntry>, ClientError> {
    Err(ClientError::Unsupported)
  }
}

impl MagicLinkSender for ApiClient {
  /// `POST /api/magic-link`
  async fn send_magic_link(&self, request: &MagicLinkRequest) -> Result<(), ClientError> {
    let resp = self
      .client
      .post(self.url("/magic-link"))
      .json(request)
      .send()
      .await?;

    if resp.status().is_success() {
      Ok(())
    } else {
      Err(Self::failure(resp).await)
    }
  }
}
