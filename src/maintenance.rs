//! The article maintenance utility: validates records and appends or merges
//! them into the [`Store`]. Every successful mutation rewrites the whole
//! store immediately.

use crate::article::{default_image, format_date, Article};
use crate::store::{self, Store};
use chrono::NaiveDate;
use serde_json::{Map, Value};
use std::fmt;
use std::io::{self, Write};

/// Fields an article must carry before it is accepted, checked in order.
pub const REQUIRED_FIELDS: &[&str] = &["id", "title", "category", "content"];

/// What happened to an article passed to [`Updater::add`].
#[derive(Debug, PartialEq, Eq)]
pub enum Added {
    /// The article was appended and the store saved.
    Inserted,

    /// An article with the same id already exists; the store is untouched.
    Duplicate,
}

/// Adds and updates records in a [`Store`].
pub struct Updater<'a> {
    store: &'a Store,
}

impl<'a> Updater<'a> {
    pub fn new(store: &'a Store) -> Updater<'a> {
        Updater { store }
    }

    /// Adds an article from a JSON fragment, dating it today if it carries no
    /// date. See [`Updater::add_on`].
    pub fn add(&self, fragment: Value) -> Result<Added> {
        self.add_on(fragment, chrono::Local::now().date_naive())
    }

    /// Adds an article from a JSON fragment. Required fields are checked
    /// first; an id already in the store is skipped rather than duplicated.
    /// Missing `date` and `image` fields default to `today` and `{id}.jpg`.
    pub fn add_on(&self, fragment: Value, today: NaiveDate) -> Result<Added> {
        let mut fields = match fragment {
            Value::Object(fields) => fields,
            _ => return Err(Error::NotAnObject),
        };
        for field in REQUIRED_FIELDS {
            if !fields.contains_key(*field) {
                return Err(Error::MissingField(*field));
            }
        }

        let id = match fields.get("id") {
            Some(Value::String(id)) => id.clone(),
            Some(other) => return Err(Error::InvalidId(other.to_string())),
            None => return Err(Error::MissingField("id")),
        };
        check_id(&id)?;

        let mut articles = self.store.load_strict()?;
        if articles.iter().any(|a| a.id == id) {
            log::warn!("article `{}` already exists; skipping", id);
            return Ok(Added::Duplicate);
        }

        fields
            .entry("date")
            .or_insert_with(|| Value::String(format_date(today)));
        fields
            .entry("image")
            .or_insert_with(|| Value::String(default_image(&id)));

        let article: Article =
            serde_json::from_value(Value::Object(fields)).map_err(Error::InvalidField)?;
        articles.push(article);
        self.store.save(&articles)?;
        log::info!("added article `{}` to {}", id, self.store.path().display());
        Ok(Added::Inserted)
    }

    /// Merges `updates` into the article identified by `id`, key by key,
    /// and saves the store. Returns `false` without touching the store when
    /// no article has that id.
    pub fn update(&self, id: &str, updates: Map<String, Value>) -> Result<bool> {
        let mut articles = self.store.load_strict()?;
        let index = match articles.iter().position(|a| a.id == id) {
            Some(index) => index,
            None => return Ok(false),
        };

        match updates.get("id") {
            Some(Value::String(new_id)) => {
                check_id(new_id)?;
                if new_id != id && articles.iter().any(|a| &a.id == new_id) {
                    return Err(Error::DuplicateId(new_id.clone()));
                }
            }
            Some(other) => return Err(Error::InvalidId(other.to_string())),
            None => {}
        }

        let mut merged = match serde_json::to_value(&articles[index]) {
            Ok(Value::Object(fields)) => fields,
            Ok(_) => return Err(Error::NotAnObject),
            Err(e) => return Err(Error::InvalidField(e)),
        };
        merged.extend(updates);
        articles[index] =
            serde_json::from_value(Value::Object(merged)).map_err(Error::InvalidField)?;
        self.store.save(&articles)?;
        log::info!("updated article `{}` in {}", id, self.store.path().display());
        Ok(true)
    }

    /// Writes a numbered summary (title, category, date) of the store in
    /// insertion order.
    pub fn list<W: Write>(&self, w: &mut W) -> Result<()> {
        let articles = self.store.load()?;
        writeln!(w, "\nCurrent Articles:")?;
        writeln!(w, "{}", "-".repeat(50))?;
        if articles.is_empty() {
            writeln!(w, "No articles found.")?;
            return Ok(());
        }
        for (i, a) in articles.iter().enumerate() {
            writeln!(w, "{}. {} ({}) - {}", i + 1, a.title, a.category, a.date)?;
        }
        Ok(())
    }
}

// Ids end up in URLs, so they must already be slugs.
fn check_id(id: &str) -> Result<()> {
    match slug::slugify(id) == id {
        true => Ok(()),
        false => Err(Error::InvalidId(id.to_owned())),
    }
}

/// A template record for operators to copy, edit, and `add`.
pub fn sample(today: NaiveDate) -> Value {
    serde_json::json!({
        "id": "sample-article",
        "title": "Sample Article Title",
        "category": "Technology",
        "date": format_date(today),
        "image": "sample-article.jpg",
        "content": [
            "This is the first paragraph of your article. It should introduce the main topic and grab the reader's attention.",
            "# A heading",
            "This is the second paragraph. You can continue developing your ideas here.",
            "Add as many paragraphs as needed. Each paragraph should be a separate string in this list."
        ]
    })
}

/// The result of a fallible maintenance operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error adding or updating an article.
#[derive(Debug)]
pub enum Error {
    /// Returned when a required field is absent. Names the field.
    MissingField(&'static str),

    /// Returned when the article fragment isn't a JSON object.
    NotAnObject,

    /// Returned when an id isn't a URL-safe slug.
    InvalidId(String),

    /// Returned when an update would give an article another article's id.
    DuplicateId(String),

    /// Returned when a field has the wrong type.
    InvalidField(serde_json::Error),

    /// Returned for errors loading or saving the store.
    Store(store::Error),

    /// Returned when writing a listing fails.
    Io(io::Error),
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::MissingField(field) => write!(f, "Missing required field: {}", field),
            Error::NotAnObject => write!(f, "Article must be a JSON object"),
            Error::InvalidId(id) => write!(
                f,
                "Invalid article id {:?}: use lowercase letters, digits and hyphens",
                id
            ),
            Error::DuplicateId(id) => write!(f, "Article with ID '{}' already exists", id),
            Error::InvalidField(err) => write!(f, "Invalid article: {}", err),
            Error::Store(err) => err.fmt(f),
            Error::Io(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::InvalidField(err) => Some(err),
            Error::Store(err) => Some(err),
            Error::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<store::Error> for Error {
    /// Converts a [`store::Error`] into an [`Error`]. This allows us to use
    /// the `?` operator on store loads and saves.
    fn from(err: store::Error) -> Error {
        Error::Store(err)
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Error {
        Error::Io(err)
    }
}
