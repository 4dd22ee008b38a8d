//! Core types and trait definitions for the After Trials site backend.
//!
//! This crate is free of HTTP and database dependencies. The slug resolver,
//! the waitlist form, blog pagination and the sitemap builder live here so
//! the server, the API router and the terminal client share one
//! implementation of each.

// We use native `async fn` in traits and in trait impls.
#![allow(async_fn_in_trait)]

pub mod auth;
pub mod blog;
pub mod canvas;
pub mod error;
pub mod profile;
pub mod resolve;
pub mod sitemap;
pub mod slug;
pub mod store;
pub mod waitlist;

pub use error::{Error, Result};

#[cfg(test)]
mod testing;
