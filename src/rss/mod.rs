//! RSS and Atom feed monitoring helpers
//!
//! Feeds are parsed with a streaming XML reader, descriptions are reduced to
//! plain text, and filtering is a pure function over the parsed items.

mod filter;
mod html;
mod parser;

pub use filter::{apply_filters, RssFilters};
pub use html::html_to_text;
pub use parser::{parse_feed, parse_feed_date};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One feed entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RssFeedItem {
    pub title: String,
    pub link: String,
    /// Plain-text description or summary
    pub description: String,
    pub pub_date: Option<DateTime<Utc>>,
    pub author: Option<String>,
    #[serde(default)]
    pub categories: Vec<String>,
    /// Markdown of the linked article, when requested
    pub full_content: Option<String>,
}
