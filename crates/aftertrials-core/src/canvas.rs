//! Content canvases and their block documents.
//!
//! A canvas body is stored as one structured document. Depending on which
//! client wrote it, the document is either a JSON array of blocks or a
//! string holding that array serialised. [`parse_content_blocks`] accepts
//! both.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::{profile::AuthorView, slug::canvas_slug};

/// A canvas as stored by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Canvas {
  pub id:                   Uuid,
  pub author_id:            Uuid,
  /// Not unique across canvases.
  pub title:                Option<String>,
  /// Raw body document; see [`parse_content_blocks`].
  #[serde(default)]
  pub content:              Value,
  #[serde(default)]
  pub is_published:         bool,
  #[serde(default)]
  pub is_pinned_to_profile: bool,
  #[serde(default)]
  pub view_count:           u64,
  pub created_at:           DateTime<Utc>,
  pub updated_at:           DateTime<Utc>,
}

/// The id and title of a canvas, plus the slug a profile page links to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanvasSummary {
  pub id:    Uuid,
  pub title: Option<String>,
  pub slug:  String,
}

impl CanvasSummary {
  pub fn new(id: Uuid, title: Option<String>) -> Self {
    let slug = canvas_slug(title.as_deref());
    Self { id, title, slug }
  }
}

// ─── Blocks ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextData {
  pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageData {
  pub url:     String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub caption: Option<String>,
}

/// One renderable block of a canvas body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ContentBlock {
  Text {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id:   Option<String>,
    data: TextData,
  },
  Image {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id:   Option<String>,
    data: ImageData,
  },
}

impl ContentBlock {
  /// Interpret one element of a body array.
  ///
  /// Besides typed blocks this accepts the older flat `{"content": "..."}`
  /// shape as text. Blocks with no text or no image URL are dropped.
  pub fn from_value(value: &Value) -> Option<Self> {
    let id = value.get("id").and_then(|v| match v {
      Value::String(s) => Some(s.clone()),
      Value::Number(n) => Some(n.to_string()),
      _ => None,
    });
    let field = |name: &str| {
      value
        .get("data")
        .and_then(|d| d.get(name))
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
    };

    match value.get("type").and_then(Value::as_str) {
      Some("text") => {
        if let Some(text) = field("text") {
          return Some(Self::Text { id, data: TextData { text } });
        }
      }
      Some("image") => {
        if let Some(url) = field("url") {
          let caption = field("caption");
          return Some(Self::Image { id, data: ImageData { url, caption } });
        }
      }
      _ => {}
    }

    value
      .get("content")
      .and_then(Value::as_str)
      .filter(|s| !s.is_empty())
      .map(|text| Self::Text { id: None, data: TextData { text: text.to_owned() } })
  }
}

/// Turn a stored canvas body into its block sequence.
///
/// A string is deserialised first; an array is used as-is; anything else
/// (including a string that does not hold JSON) yields no blocks.
pub fn parse_content_blocks(content: &Value) -> Vec<ContentBlock> {
  let parsed;
  let items = match content {
    Value::Array(items) => items,
    Value::String(raw) => match serde_json::from_str::<Value>(raw) {
      Ok(Value::Array(items)) => {
        parsed = items;
        &parsed
      }
      Ok(_) => return Vec::new(),
      Err(e) => {
        tracing::warn!(error = %e, "canvas body is not valid JSON");
        return Vec::new();
      }
    },
    _ => return Vec::new(),
  };

  items.iter().filter_map(ContentBlock::from_value).collect()
}

// ─── View ────────────────────────────────────────────────────────────────────

/// Everything the public canvas page shows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanvasView {
  pub id:             Uuid,
  pub title:          Option<String>,
  pub slug:           String,
  pub is_published:   bool,
  pub view_count:     u64,
  pub created_at:     DateTime<Utc>,
  pub updated_at:     DateTime<Utc>,
  pub author:         AuthorView,
  /// Number of posts the author has written.
  pub post_count:     u64,
  pub content_blocks: Vec<ContentBlock>,
}

impl CanvasView {
  pub fn new(canvas: Canvas, author: AuthorView, post_count: u64) -> Self {
    let content_blocks = parse_content_blocks(&canvas.content);
    Self {
      slug: canvas_slug(canvas.title.as_deref()),
      id: canvas.id,
      title: canvas.title,
      is_published: canvas.is_published,
      view_count: canvas.view_count,
      created_at: canvas.created_at,
      updated_at: canvas.updated_at,
      author,
      post_count,
      content_blocks,
    }
  }
}
