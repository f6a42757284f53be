use crate::rss::RssFeedItem;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Caller-supplied item filters, combined with AND
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RssFilters {
    /// Keep items mentioning any of these (case-insensitive)
    #[serde(default)]
    pub keywords: Vec<String>,
    /// Inclusive lower bound on the publish date
    pub date_from: Option<DateTime<Utc>>,
    /// Inclusive upper bound on the publish date
    pub date_to: Option<DateTime<Utc>>,
    /// Keep items whose author contains any of these (case-insensitive)
    #[serde(default)]
    pub authors: Vec<String>,
}

impl RssFilters {
    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty()
            && self.authors.is_empty()
            && self.date_from.is_none()
            && self.date_to.is_none()
    }

    /// Whether a single item passes every configured filter
    pub fn matches(&self, item: &RssFeedItem) -> bool {
        self.matches_keywords(item) && self.matches_dates(item) && self.matches_authors(item)
    }

    fn matches_keywords(&self, item: &RssFeedItem) -> bool {
        let keywords = lowered(&self.keywords);
        if keywords.is_empty() {
            return true;
        }

        let haystack = format!(
            "{}\n{}\n{}",
            item.title,
            item.description,
            item.full_content.as_deref().unwrap_or("")
        )
        .to_lowercase();

        keywords.iter().any(|k| haystack.contains(k.as_str()))
    }

    fn matches_dates(&self, item: &RssFeedItem) -> bool {
        if self.date_from.is_none() && self.date_to.is_none() {
            return true;
        }

        let Some(date) = item.pub_date else {
            return false;
        };

        self.date_from.map_or(true, |from| date >= from)
            && self.date_to.map_or(true, |to| date <= to)
    }

    fn matches_authors(&self, item: &RssFeedItem) -> bool {
        let authors = lowered(&self.authors);
        if authors.is_empty() {
            return true;
        }

        match &item.author {
            Some(author) => {
                let author = author.to_lowercase();
                authors.iter().any(|a| author.contains(a.as_str()))
            }
            None => false,
        }
    }
}

/// Non-blank needles, lowercased
fn lowered(values: &[String]) -> Vec<String> {
    values
        .iter()
        .map(|v| v.trim().to_lowercase())
        .filter(|v| !v.is_empty())
        .collect()
}

/// Keeps the items that pass `filters`, preserving feed order
pub fn apply_filters(items: Vec<RssFeedItem>, filters: &RssFilters) -> Vec<RssFeedItem> {
    if filters.is_empty() {
        return items;
    }

    items.into_iter().filter(|item| filters.matches(item)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn item(title: &str, day: Option<u32>, author: Option<&str>) -> RssFeedItem {
        RssFeedItem {
            title: title.to_string(),
            link: format!("https://clinic.example/{}", title.replace(' ', "-")),
            description: String::new(),
            pub_date: day.map(|d| Utc.with_ymd_and_hms(2026, 4, d, 12, 0, 0).unwrap()),
            author: author.map(str::to_string),
            categories: Vec::new(),
            full_content: None,
        }
    }

    fn feed() -> Vec<RssFeedItem> {
        vec![
            item("Knee pain exercises", Some(1), Some("Dr. Ng")),
            item("Clinic holiday hours", Some(2), None),
            item("Knee surgery recovery", Some(10), Some("Dr. Osei")),
            item("Back pain basics", Some(12), Some("Dr. Ng")),
            item("Running with KNEE braces", Some(20), None),
        ]
    }

    #[test]
    fn test_keyword_then_date_range() {
        let keyword_only = RssFilters {
            keywords: vec!["knee".to_string()],
            ..Default::default()
        };
        assert_eq!(apply_filters(feed(), &keyword_only).len(), 3);

        let filters = RssFilters {
            keywords: vec!["knee".to_string()],
            date_from: Some(Utc.with_ymd_and_hms(2026, 4, 5, 0, 0, 0).unwrap()),
            date_to: None,
            authors: Vec::new(),
        };
        let titles: Vec<_> = apply_filters(feed(), &filters)
            .into_iter()
            .map(|i| i.title)
            .collect();
        assert_eq!(titles, vec!["Knee surgery recovery", "Running with KNEE braces"]);
    }

    #[test]
    fn test_date_bounds_are_inclusive_and_require_a_date() {
        let mut items = feed();
        items.push(item("Undated note", None, None));

        let filters = RssFilters {
            date_from: Some(Utc.with_ymd_and_hms(2026, 4, 2, 12, 0, 0).unwrap()),
            date_to: Some(Utc.with_ymd_and_hms(2026, 4, 12, 12, 0, 0).unwrap()),
            ..Default::default()
        };

        let titles: Vec<_> = apply_filters(items, &filters)
            .into_iter()
            .map(|i| i.title)
            .collect();
        assert_eq!(
            titles,
            vec!["Clinic holiday hours", "Knee surgery recovery", "Back pain basics"]
        );
    }

    #[test]
    fn test_author_filter_excludes_unknown_authors() {
        let filters = RssFilters {
            authors: vec!["ng".to_string()],
            ..Default::default()
        };
        let result = apply_filters(feed(), &filters);
        assert_eq!(result.len(), 2);
        assert!(result.iter().all(|i| i.author.as_deref() == Some("Dr. Ng")));
    }

    #[test]
    fn test_keywords_search_full_content() {
        let mut items = feed();
        items[1].full_content = Some("We will also offer knee assessments.".to_string());

        let filters = RssFilters {
            keywords: vec!["  KNEE ".to_string()],
            ..Default::default()
        };
        assert_eq!(apply_filters(items, &filters).len(), 4);
    }

    #[test]
    fn test_empty_filters_keep_everything() {
        let filters = RssFilters {
            keywords: vec!["   ".to_string()],
            ..Default::default()
        };
        assert_eq!(apply_filters(feed(), &RssFilters::default()).len(), 5);
        assert_eq!(apply_filters(feed(), &filters).len(), 5);
    }
}
