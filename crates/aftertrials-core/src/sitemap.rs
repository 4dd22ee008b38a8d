//! `sitemap.xml` generation.
//!
//! Uses `quick-xml`'s writer API. The static pages are fixed; one entry is
//! added per published blog post.

use std::io::Cursor;

use chrono::{DateTime, SecondsFormat, Utc};
use quick_xml::{
  Writer,
  events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event},
};
use serde::Serialize;
use strum::Display;

use crate::{
  Error,
  Result,
  blog::{BlogStamp, SiteInfo},
};

pub const NS_SITEMAP: &str = "http://www.sitemaps.org/schemas/sitemap/0.9";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ChangeFreq {
  Daily,
  Weekly,
  Monthly,
  Yearly,
}

/// Site pages that exist regardless of content.
pub const STATIC_ROUTES: &[(&str, ChangeFreq, f32)] = &[
  ("", ChangeFreq::Daily, 1.0),
  ("/blog", ChangeFreq::Daily, 0.9),
  ("/about", ChangeFreq::Monthly, 0.5),
  ("/contact", ChangeFreq::Monthly, 0.5),
  ("/privacy", ChangeFreq::Yearly, 0.3),
  ("/terms", ChangeFreq::Yearly, 0.3),
  ("/cookie", ChangeFreq::Yearly, 0.3),
  ("/cancellation", ChangeFreq::Yearly, 0.3),
  ("/account-deletion", ChangeFreq::Yearly, 0.3),
  ("/refund", ChangeFreq::Yearly, 0.3),
  ("/subscription-terms", ChangeFreq::Yearly, 0.3),
  ("/medical-disclaimer", ChangeFreq::Yearly, 0.3),
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SitemapEntry {
  pub loc:        String,
  pub lastmod:    DateTime<Utc>,
  pub changefreq: ChangeFreq,
  pub priority:   f32,
}

/// All entries: static pages stamped with `now`, then one per blog post.
pub fn entries(site: &SiteInfo, blogs: &[BlogStamp], now: DateTime<Utc>) -> Vec<SitemapEntry> {
  let statics = STATIC_ROUTES.iter().map(|(path, changefreq, priority)| SitemapEntry {
    loc:        site.url(path),
    lastmod:    now,
    changefreq: *changefreq,
    priority:   *priority,
  });
  let posts = blogs.iter().map(|blog| SitemapEntry {
    loc:        site.url(&format!("/blog/{}", blog.slug)),
    lastmod:    blog.last_modified(),
    changefreq: ChangeFreq::Weekly,
    priority:   0.8,
  });
  statics.chain(posts).collect()
}

/// Serialise entries as a sitemaps.org `urlset` document.
pub fn render(entries: &[SitemapEntry]) -> Result<String> {
  let mut w = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);

  write(&mut w, Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
  let mut urlset = BytesStart::new("urlset");
  urlset.push_attribute(("xmlns", NS_SITEMAP));
  write(&mut w, Event::Start(urlset))?;

  for entry in entries {
    write(&mut w, Event::Start(BytesStart::new("url")))?;
    text_elem(&mut w, "loc", &entry.loc)?;
    text_elem(
      &mut w,
      "lastmod",
      &entry.lastmod.to_rfc3339_opts(SecondsFormat::Millis, true),
    )?;
    text_elem(&mut w, "changefreq", &entry.changefreq.to_string())?;
    text_elem(&mut w, "priority", &format!("{:.1}", entry.priority))?;
    write(&mut w, Event::End(BytesEnd::new("url")))?;
  }

  write(&mut w, Event::End(BytesEnd::new("urlset")))?;

  String::from_utf8(w.into_inner().into_inner()).map_err(|e| Error::Xml(e.to_string()))
}

fn write(w: &mut Writer<Cursor<Vec<u8>>>, event: Event<'_>) -> Result<()> {
  w.write_event(event).map_err(|e| Error::Xml(e.to_string()))
}

fn text_elem(w: &mut Writer<Cursor<Vec<u8>>>, tag: &str, text: &str) -> Result<()> {
  write(w, Event::Start(BytesStart::new(tag)))?;
  write(w, Event::Text(BytesText::new(text)))?;
  write(w, Event::End(BytesEnd::new(tag)))
}
