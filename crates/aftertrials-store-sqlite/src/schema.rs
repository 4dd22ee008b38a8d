//! SQL schema for the After Trials SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.
//!
//! Case-insensitive columns use the `UNICASE` collation, which
//! [`SqliteStore`](crate::SqliteStore) registers on its connection before
//! running this DDL.

use std::cmp::Ordering;

/// Name of the Unicode case-insensitive collation.
pub const UNICASE: &str = "UNICASE";

/// Order two strings by their Unicode lowercase forms.
pub fn unicase(a: &str, b: &str) -> Ordering {
  if a.is_ascii() && b.is_ascii() {
    fn fold(s: &str) -> impl Iterator<Item = u8> + '_ {
      s.bytes().map(|c| c.to_ascii_lowercase())
    }
    return fold(a).cmp(fold(b));
  }
  a.to_lowercase().cmp(&b.to_lowercase())
}

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- Usernames are unique ignoring case.
CREATE TABLE IF NOT EXISTS profiles (
    id                  TEXT PRIMARY KEY,
    username            TEXT UNIQUE COLLATE UNICASE,
    full_name           TEXT,
    avatar_url          TEXT,
    bio                 TEXT,
    specialization      TEXT,
    degree              TEXT,
    institution         TEXT,
    workplace           TEXT,
    country             TEXT,
    verification_status TEXT,
    created_at          TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS posts (
    id             TEXT PRIMARY KEY,
    author_id      TEXT NOT NULL,
    title          TEXT NOT NULL,
    summary        TEXT,
    tags           TEXT NOT NULL DEFAULT '[]',
    upvote_count   INTEGER NOT NULL DEFAULT 0,
    comment_count  INTEGER NOT NULL DEFAULT 0,
    share_count    INTEGER NOT NULL DEFAULT 0,
    specialization TEXT,
    created_at     TEXT NOT NULL
);

-- No foreign key on author_id: a canvas may outlive its author.
CREATE TABLE IF NOT EXISTS canvases (
    id                   TEXT PRIMARY KEY,
    author_id            TEXT NOT NULL,
    title                TEXT,
    content              TEXT NOT NULL DEFAULT '[]',  -- JSON; may itself be a JSON string
    is_published         INTEGER NOT NULL DEFAULT 0,
    is_pinned_to_profile INTEGER NOT NULL DEFAULT 0,
    view_count           INTEGER NOT NULL DEFAULT 0,
    created_at           TEXT NOT NULL,
    updated_at           TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS follows (
    follower_id  TEXT NOT NULL,
    following_id TEXT NOT NULL,
    UNIQUE (follower_id, following_id)
);

CREATE TABLE IF NOT EXISTS blogs (
    id                TEXT PRIMARY KEY,
    slug              TEXT NOT NULL UNIQUE,
    title             TEXT NOT NULL,
    excerpt           TEXT,
    content           TEXT,
    html_content      TEXT,
    cover_image       TEXT,
    author_id         TEXT,
    published         INTEGER NOT NULL DEFAULT 0,
    published_at      TEXT,
    created_at        TEXT NOT NULL,
    updated_at        TEXT,
    tags              TEXT NOT NULL DEFAULT '[]',
    seo_title         TEXT,
    seo_description   TEXT,
    view_count        INTEGER NOT NULL DEFAULT 0,
    read_time_minutes INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS waitlist (
    email      TEXT PRIMARY KEY COLLATE UNICASE,
    full_name  TEXT NOT NULL,
    role       TEXT NOT NULL,   -- 'Doctor' | 'Student' | 'Company' | 'Other'
    verified   INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL
);

-- Only the SHA-256 of a token is kept.
CREATE TABLE IF NOT EXISTS magic_links (
    token_hash  TEXT PRIMARY KEY,
    email       TEXT NOT NULL,
    full_name   TEXT,
    role        TEXT,
    redirect_to TEXT,
    created_at  TEXT NOT NULL,
    expires_at  TEXT NOT NULL,
    consumed_at TEXT
);

CREATE INDEX IF NOT EXISTS posts_author_idx    ON posts(author_id, created_at);
CREATE INDEX IF NOT EXISTS canvases_author_idx ON canvases(author_id, created_at);
CREATE INDEX IF NOT EXISTS canvases_title_idx  ON canvases(title COLLATE UNICASE, created_at, id);
CREATE INDEX IF NOT EXISTS follows_target_idx  ON follows(following_id);
CREATE INDEX IF NOT EXISTS blogs_published_idx ON blogs(published, published_at);

PRAGMA user_version = 1;
";
