//! SQLite backend for the After Trials site.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Implements every backend trait from
//! `aftertrials-core::store`.

mod encode;
mod schema;
mod store;

pub mod error;
pub mod fixture;

pub use error::{Error, Result};
pub use fixture::{Fixture, Follow};
pub use store::SqliteStore;
