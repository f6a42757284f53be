use crate::rss::html::html_to_text;
use crate::rss::RssFeedItem;
use crate::{Result, ScoutError};
use chrono::{DateTime, NaiveDate, Utc};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

/// Fields collected while inside one `<item>`/`<entry>`
#[derive(Debug, Default)]
struct ItemBuilder {
    title: Option<String>,
    link: Option<String>,
    id: Option<String>,
    description: Option<String>,
    content: Option<String>,
    published: Option<DateTime<Utc>>,
    updated: Option<DateTime<Utc>>,
    author: Option<String>,
    categories: Vec<String>,
}

impl ItemBuilder {
    fn finish(self) -> RssFeedItem {
        let description = self
            .description
            .as_deref()
            .or(self.content.as_deref())
            .map(html_to_text)
            .unwrap_or_default();

        let link = self
            .link
            .or_else(|| self.id.filter(|id| id.starts_with("http")))
            .unwrap_or_default();

        RssFeedItem {
            title: self.title.map(|t| html_to_text(&t)).unwrap_or_default(),
            link,
            description,
            pub_date: self.published.or(self.updated),
            author: self.author,
            categories: self.categories,
            full_content: None,
        }
    }

    /// Assigns the text of a just-closed child element
    fn assign(&mut self, name: &str, parent: Option<&str>, text: String) {
        if text.is_empty() {
            return;
        }

        match (name, parent) {
            ("name", Some("author")) | ("author", _) | ("dc:creator", _) => {
                if self.author.is_none() {
                    self.author = Some(text);
                }
            }
            // Nested elements such as <source><title> must not clobber the item's fields
            (_, Some(_)) => {}
            ("title", None) => self.title = Some(text),
            ("link", None) => {
                if self.link.is_none() {
                    self.link = Some(text);
                }
            }
            ("guid", None) | ("id", None) => self.id = Some(text),
            ("description", None) | ("summary", None) => self.description = Some(text),
            ("content:encoded", None) | ("content", None) => self.content = Some(text),
            ("pubdate", None) | ("published", None) | ("dc:date", None) => {
                self.published = self.published.or_else(|| parse_feed_date(&text));
            }
            ("updated", None) => self.updated = parse_feed_date(&text),
            ("category", None) | ("dc:subject", None) => self.categories.push(text),
            _ => {}
        }
    }

    /// Handles attributes of `<link>` and `<category>` (Atom style)
    fn assign_attributes(&mut self, name: &str, element: &BytesStart<'_>) {
        match name {
            "link" => {
                let is_alternate = attribute(element, b"rel").map_or(true, |r| r == "alternate");
                if is_alternate && self.link.is_none() {
                    self.link = attribute(element, b"href");
                }
            }
            "category" => {
                if let Some(term) = attribute(element, b"term") {
                    self.categories.push(term);
                }
            }
            _ => {}
        }
    }
}

fn attribute(element: &BytesStart<'_>, key: &[u8]) -> Option<String> {
    element
        .attributes()
        .flatten()
        .find(|attr| attr.key.as_ref() == key)
        .and_then(|attr| attr.unescape_value().ok().map(|v| v.trim().to_string()))
        .filter(|v| !v.is_empty())
}

fn element_name(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw).to_ascii_lowercase()
}

fn is_item(name: &str) -> bool {
    name == "item" || name == "entry"
}

/// Parses an RSS 2.0 or Atom document into feed items
///
/// Documents without items (including non-feed text) yield an empty list.
/// XML that cannot be tokenized is an error.
///
/// # Example
///
/// ```
/// use clinic_scout::rss::parse_feed;
///
/// let xml = r#"<rss version="2.0"><channel>
///   <item><title>Flu clinic</title><link>https://clinic.example/flu</link></item>
/// </channel></rss>"#;
///
/// let items = parse_feed(xml).unwrap();
/// assert_eq!(items[0].title, "Flu clinic");
/// ```
pub fn parse_feed(xml: &str) -> Result<Vec<RssFeedItem>> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut items = Vec::new();
    let mut current: Option<ItemBuilder> = None;
    // Open elements below the current item
    let mut stack: Vec<String> = Vec::new();
    let mut text = String::new();

    loop {
        let event = reader.read_event().map_err(|e| {
            ScoutError::Feed(format!(
                "Malformed XML at byte {}: {}",
                reader.buffer_position(),
                e
            ))
        })?;

        match event {
            Event::Start(e) => {
                let name = element_name(e.name().as_ref());
                if is_item(&name) && current.is_none() {
                    current = Some(ItemBuilder::default());
                    stack.clear();
                } else if let Some(item) = current.as_mut() {
                    item.assign_attributes(&name, &e);
                    stack.push(name);
                }
                text.clear();
            }
            Event::Empty(e) => {
                if let Some(item) = current.as_mut() {
                    let name = element_name(e.name().as_ref());
                    item.assign_attributes(&name, &e);
                }
            }
            Event::Text(t) => {
                if current.is_some() {
                    let decoded = t
                        .unescape()
                        .map(|c| c.into_owned())
                        .unwrap_or_else(|_| String::from_utf8_lossy(&t).into_owned());
                    text.push_str(&decoded);
                }
            }
            Event::CData(c) => {
                if current.is_some() {
                    text.push_str(&String::from_utf8_lossy(&c.into_inner()));
                }
            }
            Event::End(e) => {
                let name = element_name(e.name().as_ref());
                if is_item(&name) && stack.is_empty() {
                    if let Some(item) = current.take() {
                        items.push(item.finish());
                    }
                } else if let Some(item) = current.as_mut() {
                    stack.pop();
                    let parent = stack.last().map(String::as_str);
                    item.assign(&name, parent, text.trim().to_string());
                }
                text.clear();
            }
            Event::Eof => break,
            _ => {}
        }
    }

    tracing::debug!("Parsed {} feed items", items.len());
    Ok(items)
}

/// Parses RFC 2822 (RSS), RFC 3339 (Atom) or a bare `YYYY-MM-DD` date
pub fn parse_feed_date(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();

    DateTime::parse_from_rfc2822(s)
        .or_else(|_| DateTime::parse_from_rfc3339(s))
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(|dt| dt.and_utc())
        })
}
