//! Support for creating Atom feeds from a list of articles.

use crate::article::Article;
use crate::config::Author;
use crate::markdown;
use crate::render::{self, Renderer};
use atom_syndication::{Entry, Error as AtomError, Feed, Link, Person, Text};
use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use std::fmt;
use url::Url;

/// Bundled configuration for creating a feed.
pub struct FeedConfig<'a> {
    pub title: &'a str,
    pub author: Option<&'a Author>,
    pub home_page: &'a Url,
}

/// Creates a feed from a [`FeedConfig`] and newest-first articles and
/// serializes it. Articles whose date can't be parsed are left out.
pub fn write_feed(
    config: &FeedConfig,
    renderer: &Renderer,
    articles: &[Article],
) -> Result<Vec<u8>> {
    let feed = feed(config, renderer, articles)?;
    Ok(feed.write_to(Vec::new())?)
}

fn feed(config: &FeedConfig, renderer: &Renderer, articles: &[Article]) -> Result<Feed> {
    let entries = feed_entries(config, renderer, articles)?;

    let mut feed = Feed::default();
    feed.set_title(Text::plain(config.title));
    feed.set_id(config.home_page.to_string());
    feed.set_updated(match entries.first() {
        Some(entry) => *entry.updated(),
        None => Utc::now().into(),
    });
    feed.set_authors(author_to_people(config.author));
    feed.set_links(vec![alternate(config.home_page.as_str())]);
    feed.set_entries(entries);
    Ok(feed)
}

fn feed_entries(
    config: &FeedConfig,
    renderer: &Renderer,
    articles: &[Article],
) -> Result<Vec<Entry>> {
    let mut entries: Vec<Entry> = Vec::with_capacity(articles.len());

    for article in articles {
        let date = match article.parsed_date() {
            Some(date) => midnight_utc(date),
            None => {
                log::warn!(
                    "leaving article `{}` out of the feed: unparseable date {:?}",
                    article.id,
                    article.date
                );
                continue;
            }
        };
        let url = renderer.article_url(article)?;

        let mut entry = Entry::default();
        entry.set_id(url.to_string());
        entry.set_title(Text::plain(article.title.as_str()));
        entry.set_updated(date);
        entry.set_published(Some(date));
        entry.set_authors(author_to_people(config.author));
        entry.set_links(vec![alternate(url.as_str())]);
        entry.set_summary(Some(Text::html(markdown::paragraph_to_html(article.lead()))));
        entries.push(entry);
    }
    Ok(entries)
}

// Articles carry a date but no time or zone, so they're pinned to midnight
// UTC.
fn midnight_utc(date: NaiveDate) -> DateTime<FixedOffset> {
    DateTime::<Utc>::from_naive_utc_and_offset(date.and_time(chrono::NaiveTime::MIN), Utc).into()
}

fn alternate(href: &str) -> Link {
    let mut link = Link::default();
    link.set_href(href);
    link.set_rel("alternate");
    link
}

fn author_to_people(author: Option<&Author>) -> Vec<Person> {
    match author {
        Some(author) => {
            let mut person = Person::default();
            person.set_name(author.name.as_str());
            person.set_email(author.email.clone());
            vec![person]
        }
        None => Vec::new(),
    }
}

/// The result of a fallible feed operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents a problem creating a feed.
#[derive(Debug)]
pub enum Error {
    /// Returned when there is an Atom-related error.
    Atom(AtomError),

    /// Returned when an article URL can't be built.
    Render(render::Error),
}

impl fmt::Display for Error {
    /// Implements [`fmt::Display`] for [`Error`].
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Atom(err) => err.fmt(f),
            Error::Render(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for Error {
    /// Implements [`std::error::Error`] for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Atom(err) => Some(err),
            Error::Render(err) => Some(err),
        }
    }
}

impl From<AtomError> for Error {
    /// Converts [`AtomError`]s into [`Error`]. This allows us to use the `?`
    /// operator in fallible feed operations.
    fn from(err: AtomError) -> Error {
        Error::Atom(err)
    }
}

impl From<render::Error> for Error {
    fn from(err: render::Error) -> Error {
        Error::Render(err)
    }
}
