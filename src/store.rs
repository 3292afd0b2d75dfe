//! Defines the [`Store`] and [`Error`] types: reading the JSON article
//! document from disk and writing it back. The store is a single JSON object
//! with one key, `articles`, holding the records in insertion order:
//!
//! ```json
//! {
//!   "articles": [
//!     {
//!       "id": "hello-world",
//!       "title": "Hello, world!",
//!       "category": "Linux",
//!       "date": "June 01, 2024",
//!       "image": "hello-world.jpg",
//!       "content": ["# Hello", "World"]
//!     }
//!   ]
//! }
//! ```
//!
//! Other top-level keys are kept as they are across saves.

use crate::article::{sort_newest_first, Article};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::fs::File;
use std::io::{self, BufReader, Write};
use std::path::{Path, PathBuf};

/// The on-disk document. Records are kept as raw JSON until each one is
/// converted on its own, so one bad record can't hide the others.
#[derive(Deserialize)]
struct Document {
    #[serde(default)]
    articles: Vec<Value>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

/// A handle on the store file. Every load reads the file afresh; nothing is
/// cached between calls.
#[derive(Clone, Debug)]
pub struct Store {
    path: PathBuf,
}

impl Store {
    /// Constructs a store backed by the JSON document at `path`. The file
    /// doesn't need to exist yet.
    pub fn new<P: Into<PathBuf>>(path: P) -> Store {
        Store { path: path.into() }
    }

    /// The path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the articles in on-disk (insertion) order. A missing file is an
    /// empty store, not an error. Records that aren't valid articles are
    /// logged and skipped.
    pub fn load(&self) -> Result<Vec<Article>> {
        let document = match self.read()? {
            Some(document) => document,
            None => return Ok(Vec::new()),
        };
        let mut articles = Vec::with_capacity(document.articles.len());
        for (index, record) in document.articles.into_iter().enumerate() {
            let id = record_id(&record);
            match serde_json::from_value(record) {
                Ok(article) => articles.push(article),
                Err(err) => log::warn!(
                    "skipping record {} (id {}) in store `{}`: {}",
                    index,
                    id,
                    self.path.display(),
                    err
                ),
            }
        }
        Ok(articles)
    }

    /// Like [`Store::load`], but a record that isn't a valid article is an
    /// error. Used before rewriting the store, which would otherwise drop the
    /// skipped records.
    pub fn load_strict(&self) -> Result<Vec<Article>> {
        let document = match self.read()? {
            Some(document) => document,
            None => return Ok(Vec::new()),
        };
        document
            .articles
            .into_iter()
            .enumerate()
            .map(|(index, record)| {
                let id = record_id(&record);
                serde_json::from_value(record).map_err(|err| Error::Record {
                    path: self.path.clone(),
                    index,
                    id,
                    err,
                })
            })
            .collect()
    }

    fn read(&self) -> Result<Option<Document>> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                log::debug!("store `{}` does not exist yet", self.path.display());
                return Ok(None);
            }
            Err(e) => {
                return Err(Error::Open {
                    path: self.path.clone(),
                    err: e,
                })
            }
        };
        let document =
            serde_json::from_reader(BufReader::new(file)).map_err(|e| Error::Parse {
                path: self.path.clone(),
                err: e,
            })?;
        Ok(Some(document))
    }

    /// Loads the articles sorted newest first. This is what every read path
    /// (listing, detail, feed, reminder) consumes.
    pub fn load_sorted(&self) -> Result<Vec<Article>> {
        let mut articles = self.load()?;
        sort_newest_first(&mut articles);
        Ok(articles)
    }

    /// Replaces the whole document with `articles`. The new contents are
    /// written to a temporary file next to the store and renamed over it, so
    /// concurrent readers see either the old document or the new one.
    pub fn save(&self, articles: &[Article]) -> Result<()> {
        #[derive(Serialize)]
        struct DocumentRef<'a> {
            articles: &'a [Article],
            #[serde(flatten)]
            extra: &'a Map<String, Value>,
        }

        let extra = match self.read() {
            Ok(Some(document)) => document.extra,
            Ok(None) => Map::new(),
            Err(err) => {
                log::warn!("replacing unreadable store: {}", err);
                Map::new()
            }
        };

        let dir = match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir).map_err(|e| Error::Write {
            path: dir.to_owned(),
            err: e,
        })?;

        let write_err = |err: io::Error| Error::Write {
            path: self.path.clone(),
            err,
        };
        let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(write_err)?;
        let document = DocumentRef {
            articles,
            extra: &extra,
        };
        serde_json::to_writer_pretty(&mut tmp, &document)
            .map_err(|e| write_err(e.into()))?;
        tmp.write_all(b"\n").map_err(write_err)?;
        tmp.as_file().sync_all().map_err(write_err)?;
        tmp.persist(&self.path).map_err(|e| write_err(e.error))?;
        Ok(())
    }
}

// The record's id for log and error messages, or `?` when it has none.
fn record_id(record: &Value) -> String {
    match record.get("id") {
        Some(Value::String(id)) => id.clone(),
        Some(other) => other.to_string(),
        None => String::from("?"),
    }
}

/// The result of a fallible store operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error reading or writing the store.
#[derive(Debug)]
pub enum Error {
    /// Returned when the store exists but can't be opened.
    Open { path: PathBuf, err: io::Error },

    /// Returned when the store isn't a valid article document.
    Parse {
        path: PathBuf,
        err: serde_json::Error,
    },

    /// Returned by [`Store::load_strict`] when a record isn't a valid
    /// article.
    Record {
        path: PathBuf,
        index: usize,
        id: String,
        err: serde_json::Error,
    },

    /// Returned when the store (or its directory) can't be written.
    Write { path: PathBuf, err: io::Error },
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Open { path, err } => {
                write!(f, "Opening store '{}': {}", path.display(), err)
            }
            Error::Parse { path, err } => {
                write!(f, "Parsing store '{}': {}", path.display(), err)
            }
            Error::Record {
                path,
                index,
                id,
                err,
            } => write!(
                f,
                "Record {} (id {}) in store '{}': {}",
                index,
                id,
                path.display(),
                err
            ),
            Error::Write { path, err } => {
                write!(f, "Writing store '{}': {}", path.display(), err)
            }
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Open { err, .. } => Some(err),
            Error::Parse { err, .. } => Some(err),
            Error::Record { err, .. } => Some(err),
            Error::Write { err, .. } => Some(err),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::article::test::article;
    use std::collections::HashSet;

    #[test]
    fn test_missing_store_is_empty() -> Result<()> {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::new(dir.path().join("nope").join("articles.json"));
        assert!(store.load()?.is_empty());
        assert!(store.load_sorted()?.is_empty());
        Ok(())
    }

    #[test]
    fn test_load_sorted_newest_first() -> Result<()> {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("articles.json");
        std::fs::write(
            &path,
            r#"{"articles": [
                {"id": "march", "title": "March", "category": "Linux",
                 "date": "March 1, 2024", "content": ["m"]},
                {"id": "june", "title": "June", "category": "Linux",
                 "date": "June 1, 2024", "content": ["j"]}
            ]}"#,
        )
        .unwrap();
        let store = Store::new(&path);

        let insertion: Vec<String> = store.load()?.into_iter().map(|a| a.id).collect();
        assert_eq!(vec!["march", "june"], insertion);

        let sorted: Vec<String> = store.load_sorted()?.into_iter().map(|a| a.id).collect();
        assert_eq!(vec!["june", "march"], sorted);
        Ok(())
    }

    #[test]
    fn test_save_then_load_round_trips() -> Result<()> {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::new(dir.path().join("data").join("articles.json"));
        let mut saved = vec![
            article("a", "Linux", "March 1, 2024"),
            article("b", "Networks", "June 1, 2024"),
        ];
        saved[1].image = Some(String::from("custom.png"));
        saved[1]
            .extra
            .insert("draft".to_owned(), serde_json::Value::Bool(false));
        store.save(&saved)?;

        let loaded = store.load()?;
        let wanted: HashSet<String> = saved.iter().map(|a| format!("{:?}", a)).collect();
        let got: HashSet<String> = loaded.iter().map(|a| format!("{:?}", a)).collect();
        assert_eq!(wanted, got);
        assert_eq!(saved, loaded);
        Ok(())
    }

    #[test]
    fn test_malformed_record_is_skipped_not_fatal() -> Result<()> {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("articles.json");
        std::fs::write(
            &path,
            r#"{"articles": [
                {"id": "a", "title": "A", "category": "Linux",
                 "date": "June 1, 2024", "content": ["a"]},
                {"id": "b", "category": "Linux", "content": ["no title"]},
                {"id": "c", "title": "C", "category": "Linux",
                 "date": 20240601, "content": ["c"]}
            ]}"#,
        )
        .unwrap();
        let store = Store::new(&path);

        let ids: Vec<String> = store.load()?.into_iter().map(|a| a.id).collect();
        assert_eq!(vec!["a"], ids);

        match store.load_strict() {
            Err(Error::Record { index, id, .. }) => {
                assert_eq!(1, index);
                assert_eq!("b", id);
            }
            other => panic!("wanted record error, got {:?}", other),
        }
        Ok(())
    }

    #[test]
    fn test_save_keeps_other_top_level_keys() -> Result<()> {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("articles.json");
        std::fs::write(&path, r#"{"version": 2, "articles": []}"#).unwrap();
        let store = Store::new(&path);

        store.save(&[article("a", "Linux", "June 1, 2024")])?;
        let saved: Value = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(Some(&Value::from(2)), saved.get("version"));
        assert_eq!(1, store.load()?.len());
        Ok(())
    }

    #[test]
    fn test_invalid_document_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("articles.json");
        std::fs::write(&path, "{\"articles\": [").unwrap();
        match Store::new(&path).load() {
            Err(Error::Parse { .. }) => {}
            other => panic!("wanted parse error, got {:?}", other),
        }
    }
}
