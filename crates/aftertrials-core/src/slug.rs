//! Helpers for the single path segment served at `/{slug}`.

use uuid::Uuid;

/// Parse `segment` as a canvas id.
///
/// Accepts the hyphenated 8-4-4-4-12 form only, in either letter case, with
/// a version nibble of 1 through 5 and an RFC 4122 variant nibble
/// (`8`, `9`, `a` or `b`). Anything else is treated as a title fragment.
pub fn parse_canvas_id(segment: &str) -> Option<Uuid> {
  let bytes = segment.as_bytes();
  if bytes.len() != 36 {
    return None;
  }

  for (i, b) in bytes.iter().enumerate() {
    let ok = match i {
      8 | 13 | 18 | 23 => *b == b'-',
      _ => b.is_ascii_hexdigit(),
    };
    if !ok {
      return None;
    }
  }

  if !matches!(bytes[14], b'1'..=b'5') {
    return None;
  }
  if !matches!(bytes[19].to_ascii_lowercase(), b'8' | b'9' | b'a' | b'b') {
    return None;
  }

  Uuid::parse_str(segment).ok()
}

/// Turn a title slug back into the text matched against canvas titles.
///
/// `"dr-jane-doe"` becomes `"dr jane doe"`.
pub fn unslugify(segment: &str) -> String { segment.replace('-', " ") }

/// Build the link slug for a canvas title.
///
/// Lower-cases the title, drops everything except word characters,
/// whitespace and hyphens, then turns whitespace runs into single hyphens.
/// Untitled canvases link to `"canvas"`.
pub fn canvas_slug(title: Option<&str>) -> String {
  let Some(title) = title else {
    return "canvas".to_owned();
  };

  let kept: String = title
    .to_lowercase()
    .chars()
    .filter(|c| c.is_alphanumeric() || *c == '_' || c.is_whitespace() || *c == '-')
    .collect();

  let mut out = String::with_capacity(kept.len());
  for c in kept.chars() {
    let c = if c.is_whitespace() { '-' } else { c };
    if c == '-' && out.ends_with('-') {
      continue;
    }
    out.push(c);
  }

  out.trim().to_owned()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn accepts_versioned_uuid_in_any_case() {
    assert!(parse_canvas_id("123e4567-e89b-12d3-a456-426614174000").is_some());
    assert!(parse_canvas_id("123E4567-E89B-42D3-B456-426614174000").is_some());
  }

  #[test]
  fn rejects_version_zero_and_bad_variant() {
    assert!(parse_canvas_id("123e4567-e89b-02d3-a456-426614174000").is_none());
    assert!(parse_canvas_id("123e4567-e89b-62d3-a456-426614174000").is_none());
    assert!(parse_canvas_id("123e4567-e89b-12d3-c456-426614174000").is_none());
    assert!(parse_canvas_id("123e4567-e89b-12d3-0456-426614174000").is_none());
  }

  #[test]
  fn rejects_unhyphenated_and_titles() {
    assert!(parse_canvas_id("123e4567e89b12d3a456426614174000").is_none());
    assert!(parse_canvas_id("dr-jane-doe").is_none());
    assert!(parse_canvas_id("").is_none());
  }

  #[test]
  fn unslugify_replaces_every_hyphen() {
    assert_eq!(unslugify("dr-jane-doe"), "dr jane doe");
    assert_eq!(unslugify("a--b"), "a  b");
  }

  #[test]
  fn canvas_slug_strips_punctuation_and_collapses() {
    assert_eq!(canvas_slug(Some("Dr. Jane  Doe")), "dr-jane-doe");
    assert_eq!(canvas_slug(Some("Trial - Phase 3!")), "trial-phase-3");
    assert_eq!(canvas_slug(None), "canvas");
  }
}
