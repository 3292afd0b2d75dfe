//! Defines the [`Article`] record, the sole entity in the store, plus the
//! date handling shared by the loader, the renderer, and the reminder.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::borrow::Cow;

/// The format articles are dated with when the maintenance utility supplies a
/// default date (e.g., `June 01, 2024`).
pub const DATE_FORMAT: &str = "%B %d, %Y";

/// Formats accepted when parsing an article's date, tried in order.
const ACCEPTED_DATE_FORMATS: &[&str] = &[DATE_FORMAT, "%b %d, %Y", "%Y-%m-%d"];

/// The image extension used when an article doesn't name its image.
const DEFAULT_IMAGE_EXTENSION: &str = "jpg";

/// A single blog post.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    /// The URL-safe identifier. Unique across the store.
    pub id: String,

    /// The human-readable headline.
    pub title: String,

    /// The category, e.g., `Networks` or `Aviation`.
    pub category: String,

    /// A human-readable date such as `March 1, 2024`. Only ever parsed on a
    /// best-effort basis; see [`parse_date`].
    #[serde(default)]
    pub date: String,

    /// The header image file name. See [`Article::image_file`] for the
    /// default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,

    /// Paragraphs in display order. A paragraph starting with `#` is a
    /// heading.
    pub content: Vec<String>,

    /// Keys we don't know about. They are carried through loads and saves
    /// untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Article {
    /// The header image file name, defaulting to `{id}.jpg`.
    pub fn image_file(&self) -> Cow<'_, str> {
        match &self.image {
            Some(image) => Cow::Borrowed(image.as_str()),
            None => Cow::Owned(default_image(&self.id)),
        }
    }

    /// The article's date, if it can be parsed.
    pub fn parsed_date(&self) -> Option<NaiveDate> {
        parse_date(&self.date)
    }

    /// The first paragraph, used as the summary on listing pages.
    pub fn lead(&self) -> &str {
        self.content.first().map(String::as_str).unwrap_or_default()
    }
}

/// Returns the default image file name for an article id.
pub fn default_image(id: &str) -> String {
    format!("{}.{}", id, DEFAULT_IMAGE_EXTENSION)
}

/// Parses a human-readable article date. Returns [`None`] rather than an
/// error so callers can treat unparseable dates as the earliest possible.
pub fn parse_date(date: &str) -> Option<NaiveDate> {
    let date = date.trim();
    ACCEPTED_DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(date, format).ok())
}

/// Formats a date the way the maintenance utility writes them.
pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Sorts articles newest first. Articles with unparseable dates sink to the
/// end; otherwise the existing (insertion) order is kept for ties.
pub fn sort_newest_first(articles: &mut [Article]) {
    articles.sort_by(|a, b| b.parsed_date().cmp(&a.parsed_date()));
}

#[cfg(test)]
pub(crate) mod test {
    use super::*;

    pub(crate) fn article(id: &str, category: &str, date: &str) -> Article {
        Article {
            id: id.to_owned(),
            title: format!("Title of {}", id),
            category: category.to_owned(),
            date: date.to_owned(),
            image: None,
            content: vec![format!("First paragraph of {}.", id)],
            extra: Map::new(),
        }
    }

    #[test]
    fn test_parse_date_formats() {
        let wanted = NaiveDate::from_ymd_opt(2024, 3, 1);
        assert_eq!(wanted, parse_date("March 1, 2024"));
        assert_eq!(wanted, parse_date("March 01, 2024"));
        assert_eq!(wanted, parse_date("Mar 1, 2024"));
        assert_eq!(wanted, parse_date("2024-03-01"));
        assert_eq!(None, parse_date("sometime last spring"));
        assert_eq!(None, parse_date(""));
    }

    #[test]
    fn test_sort_newest_first() {
        let mut articles = vec![
            article("march", "Linux", "March 1, 2024"),
            article("garbage", "Linux", "not a date"),
            article("june", "Linux", "June 1, 2024"),
        ];
        sort_newest_first(&mut articles);
        let ids: Vec<&str> = articles.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(vec!["june", "march", "garbage"], ids);
    }

    #[test]
    fn test_image_file_defaults_to_id() {
        let mut a = article("turbofan", "Aviation", "June 1, 2024");
        assert_eq!("turbofan.jpg", a.image_file());
        a.image = Some(String::from("engine.png"));
        assert_eq!("engine.png", a.image_file());
    }

    #[test]
    fn test_unknown_keys_survive_round_trip() {
        let input = r#"{"id":"x","title":"X","category":"Linux","date":"June 1, 2024","content":["p"],"featured":true}"#;
        let a: Article = serde_json::from_str(input).unwrap();
        assert_eq!(Some(&Value::Bool(true)), a.extra.get("featured"));
        let out = serde_json::to_value(&a).unwrap();
        assert_eq!(Some(&Value::Bool(true)), out.get("featured"));
        assert_eq!(None, out.get("image"));
    }
}
