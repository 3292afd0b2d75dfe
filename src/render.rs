//! The page renderer: slices articles into listing pages, looks articles up
//! for detail pages, and applies the theme templates.
//!
//! Templates are [`gtmpl`] (Go `text/template` syntax) and receive a
//! [`Value::Object`]. Every page gets `site_title`, `home_url`, `feed_url`,
//! and `categories` (a list of `{name, slug, url}`). Listing pages add
//! `articles`, `has_articles`, `heading`, `page`, `total_pages`, `prev`, and
//! `next`; article pages add `article`, `prev`, and `next`. Article values
//! carry `id`, `title`, `category`, `category_url`, `date`, `url`,
//! `image_url`, `lead`, and (on article pages) `body`.

use crate::article::Article;
use crate::category::Category;
use crate::config::Config;
use crate::markdown;
use gtmpl::{Context, Template, Value};
use std::collections::HashMap;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use url::Url;

const INDEX_TEMPLATE: &str = include_str!("../theme/index.html");
const ARTICLE_TEMPLATE: &str = include_str!("../theme/article.html");
const NOT_FOUND_TEMPLATE: &str = include_str!("../theme/not_found.html");

/// One page of a listing.
#[derive(Debug)]
pub struct Listing<'a> {
    /// The articles on this page. Empty when `page` is past the end.
    pub articles: &'a [Article],

    /// The 1-based page number that was requested.
    pub page: usize,

    /// `ceil(total / page_size)`.
    pub total_pages: usize,
}

/// Slices `articles` into the requested 1-based page. A page past the end
/// yields an empty slice rather than an error; page 0 is page 1.
pub fn paginate(articles: &[Article], page: usize, page_size: usize) -> Listing<'_> {
    let page = page.max(1);
    let page_size = page_size.max(1);
    let total_pages = match articles.len() % page_size {
        0 => articles.len() / page_size,
        _ => articles.len() / page_size + 1,
    };
    let start = (page - 1).saturating_mul(page_size).min(articles.len());
    let stop = page.saturating_mul(page_size).min(articles.len());
    Listing {
        articles: &articles[start..stop],
        page,
        total_pages,
    }
}

/// Finds an article by exact id, returning its position too so callers can
/// link its neighbours.
pub fn find<'a>(articles: &'a [Article], id: &str) -> Option<(usize, &'a Article)> {
    articles.iter().enumerate().find(|(_, a)| a.id == id)
}

/// Builds the URL for a listing page: `base` for page 1, `base?page=N`
/// otherwise.
pub fn page_url(base: &Url, page: usize) -> Url {
    let mut url = base.clone();
    url.set_query(None);
    if page > 1 {
        url.query_pairs_mut().append_pair("page", &page.to_string());
    }
    url
}

/// Applies the theme templates. Holds the parsed templates and the settings
/// that appear on every page.
pub struct Renderer {
    index_template: Template,
    article_template: Template,
    not_found_template: Template,
    site_title: String,
    site_root: Url,
}

impl Renderer {
    /// Parses the theme. Each template is read from the configured theme
    /// directory when present there, otherwise the built-in one is used.
    pub fn new(config: &Config) -> Result<Renderer> {
        let theme = config.theme_directory.as_deref();
        Ok(Renderer {
            index_template: parse_template(theme, "index.html", INDEX_TEMPLATE)?,
            article_template: parse_template(theme, "article.html", ARTICLE_TEMPLATE)?,
            not_found_template: parse_template(theme, "not_found.html", NOT_FOUND_TEMPLATE)?,
            site_title: config.title.clone(),
            site_root: config.site_root.clone(),
        })
    }

    /// The URL of an article's detail page.
    pub fn article_url(&self, article: &Article) -> Result<Url> {
        Ok(self.site_root.join(&format!("article/{}", article.id))?)
    }

    /// The URL an article's header image is served from.
    pub fn image_url(&self, article: &Article) -> Result<Url> {
        Ok(self
            .site_root
            .join(&format!("images/{}", article.image_file()))?)
    }

    /// Renders a listing page. `all` is every article in the store (for the
    /// category navigation), `base` is the URL of the listing's first page,
    /// and `heading` is shown above the articles when set (e.g., a category
    /// name).
    pub fn render_listing(
        &self,
        all: &[Article],
        listing: &Listing,
        base: &Url,
        heading: Option<&str>,
    ) -> Result<String> {
        let mut m = self.site_values(all)?;
        let articles = listing
            .articles
            .iter()
            .map(|a| self.article_value(a, false))
            .collect::<Result<Vec<Value>>>()?;
        m.insert("has_articles".to_owned(), Value::Bool(!articles.is_empty()));
        m.insert("articles".to_owned(), Value::Array(articles));
        m.insert(
            "heading".to_owned(),
            match heading {
                Some(heading) => Value::String(markdown::escape(heading)),
                None => Value::Nil,
            },
        );
        m.insert("page".to_owned(), Value::String(listing.page.to_string()));
        m.insert(
            "total_pages".to_owned(),
            Value::String(listing.total_pages.to_string()),
        );
        m.insert(
            "prev".to_owned(),
            match listing.page {
                1 => Value::Nil,
                // Past the end, point back at the last real page.
                page => url_value(page_url(base, (page - 1).min(listing.total_pages.max(1)))),
            },
        );
        m.insert(
            "next".to_owned(),
            match listing.page < listing.total_pages {
                true => url_value(page_url(base, listing.page + 1)),
                false => Value::Nil,
            },
        );
        execute(&self.index_template, Value::Object(m))
    }

    /// Renders the detail page for `all[index]`. `all` must be sorted newest
    /// first; `prev` links the newer neighbour and `next` the older one.
    pub fn render_article(&self, all: &[Article], index: usize) -> Result<String> {
        let mut m = self.site_values(all)?;
        m.insert("article".to_owned(), self.article_value(&all[index], true)?);
        m.insert(
            "prev".to_owned(),
            match index.checked_sub(1).and_then(|i| all.get(i)) {
                Some(a) => url_value(self.article_url(a)?),
                None => Value::Nil,
            },
        );
        m.insert(
            "next".to_owned(),
            match all.get(index + 1) {
                Some(a) => url_value(self.article_url(a)?),
                None => Value::Nil,
            },
        );
        execute(&self.article_template, Value::Object(m))
    }

    /// Renders the not-found page.
    pub fn render_not_found(&self, all: &[Article]) -> Result<String> {
        let m = self.site_values(all)?;
        execute(&self.not_found_template, Value::Object(m))
    }

    fn site_values(&self, all: &[Article]) -> Result<HashMap<String, Value>> {
        let names = all.iter().map(|a| a.category.as_str());
        let categories = Category::collect(names, &self.site_root)?;
        let mut m: HashMap<String, Value> = HashMap::new();
        m.insert(
            "site_title".to_owned(),
            Value::String(markdown::escape(&self.site_title)),
        );
        m.insert("home_url".to_owned(), url_value(self.site_root.clone()));
        m.insert(
            "feed_url".to_owned(),
            url_value(self.site_root.join("feed.atom")?),
        );
        m.insert(
            "categories".to_owned(),
            Value::Array(categories.iter().map(Value::from).collect()),
        );
        Ok(m)
    }

    fn article_value(&self, a: &Article, with_body: bool) -> Result<Value> {
        let category = Category::new(&a.category, &self.site_root)?;
        let mut m: HashMap<String, Value> = HashMap::new();
        m.insert("id".to_owned(), Value::String(a.id.clone()));
        m.insert("title".to_owned(), Value::String(markdown::escape(&a.title)));
        m.insert(
            "category".to_owned(),
            Value::String(markdown::escape(&a.category)),
        );
        m.insert("category_url".to_owned(), url_value(category.url));
        m.insert("date".to_owned(), Value::String(markdown::escape(&a.date)));
        m.insert("url".to_owned(), url_value(self.article_url(a)?));
        m.insert("image_url".to_owned(), url_value(self.image_url(a)?));
        m.insert(
            "lead".to_owned(),
            Value::String(markdown::paragraph_to_html(a.lead())),
        );
        if with_body {
            let mut body = String::new();
            markdown::to_html(&mut body, &a.content);
            m.insert("body".to_owned(), Value::String(body));
        }
        Ok(Value::Object(m))
    }
}

fn url_value(url: Url) -> Value {
    Value::String(url.to_string())
}

// Loads `name` from the theme directory if it's there, falling back to the
// built-in template.
fn parse_template(theme: Option<&Path>, name: &str, builtin: &str) -> Result<Template> {
    let contents = match theme.map(|dir| dir.join(name)) {
        Some(path) if path.is_file() => {
            log::debug!("using theme template '{}'", path.display());
            std::fs::read_to_string(&path).map_err(|e| Error::OpenTemplateFile { path, err: e })?
        }
        _ => builtin.to_owned(),
    };
    let mut template = Template::default();
    template.parse(&contents).map_err(Error::ParseTemplate)?;
    Ok(template)
}

fn execute(template: &Template, value: Value) -> Result<String> {
    let mut out: Vec<u8> = Vec::new();
    template.execute(&mut out, &Context::from(value)?)?;
    Ok(String::from_utf8(out)?)
}

/// The result of a fallible rendering operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error rendering a page.
#[derive(Debug)]
pub enum Error {
    /// Returned for I/O problems while opening theme template files.
    OpenTemplateFile { path: PathBuf, err: io::Error },

    /// Returned for errors parsing template files.
    ParseTemplate(String),

    /// Returned for errors executing a template.
    Template(String),

    /// Returned when a template produces invalid UTF-8.
    Utf8(std::string::FromUtf8Error),

    /// Returned when a page URL can't be built.
    UrlParse(url::ParseError),
}

impl fmt::Display for Error {
    /// Implements [`fmt::Display`] for [`Error`].
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::OpenTemplateFile { path, err } => {
                write!(f, "Opening template file '{}': {}", path.display(), err)
            }
            Error::ParseTemplate(err) => write!(f, "Parsing template: {}", err),
            Error::Template(err) => err.fmt(f),
            Error::Utf8(err) => err.fmt(f),
            Error::UrlParse(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for Error {
    /// Implements [`std::error::Error`] for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::OpenTemplateFile { err, .. } => Some(err),
            Error::ParseTemplate(_) | Error::Template(_) => None,
            Error::Utf8(err) => Some(err),
            Error::UrlParse(err) => Some(err),
        }
    }
}

impl From<String> for Error {
    /// Converts a template error message ([`String`]) into an [`Error`]. This
    /// allows us to use the `?` operator for fallible template operations.
    fn from(err: String) -> Error {
        Error::Template(err)
    }
}

impl From<std::string::FromUtf8Error> for Error {
    fn from(err: std::string::FromUtf8Error) -> Error {
        Error::Utf8(err)
    }
}

impl From<url::ParseError> for Error {
    /// Converts a [`url::ParseError`] into an [`Error`]. It allows us to use
    /// the `?` operator for URL parsing and joining functions.
    fn from(err: url::ParseError) -> Error {
        Error::UrlParse(err)
    }
}

#[cfg(test)]
pub(crate) mod test {
    use super::*;
    use crate::article::test::article;

    pub(crate) fn config(page_size: usize) -> Config {
        let mut config = Config::rooted_at(Path::new("perspective-render-test")).unwrap();
        config.site_root = Url::parse("https://example.org/").unwrap();
        config.title = String::from("Test Blog");
        config.page_size = page_size;
        config
    }

    fn five() -> Vec<Article> {
        (1..=5)
            .map(|i| article(&format!("a{}", i), "Linux", &format!("June {}, 2024", 6 - i)))
            .collect()
    }

    #[test]
    fn test_paginate_last_partial_page() {
        let articles = five();
        let listing = paginate(&articles, 3, 2);
        assert_eq!(1, listing.articles.len());
        assert_eq!("a5", listing.articles[0].id);
        assert_eq!(3, listing.total_pages);
    }

    #[test]
    fn test_paginate_past_the_end_is_empty() {
        let articles = five();
        let listing = paginate(&articles, 99, 2);
        assert!(listing.articles.is_empty());
        assert_eq!(3, listing.total_pages);
        assert_eq!(99, listing.page);
    }

    #[test]
    fn test_paginate_empty_store() {
        let listing = paginate(&[], 1, 5);
        assert!(listing.articles.is_empty());
        assert_eq!(0, listing.total_pages);
    }

    #[test]
    fn test_find_is_exact() {
        let articles = five();
        assert_eq!(Some(2), find(&articles, "a3").map(|(i, _)| i));
        assert!(find(&articles, "a").is_none());
        assert!(find(&articles, "A3").is_none());
    }

    #[test]
    fn test_page_url() -> Result<()> {
        let base = Url::parse("https://example.org/category/linux")?;
        assert_eq!("https://example.org/category/linux", page_url(&base, 1).as_str());
        assert_eq!(
            "https://example.org/category/linux?page=3",
            page_url(&base, 3).as_str()
        );
        Ok(())
    }

    #[test]
    fn test_render_listing() -> Result<()> {
        let config = config(2);
        let renderer = Renderer::new(&config)?;
        let articles = five();
        let listing = paginate(&articles, 2, config.page_size);
        let html = renderer.render_listing(&articles, &listing, &config.site_root, None)?;

        assert!(html.contains("<title>Test Blog</title>"));
        assert!(html.contains(r#"href="https://example.org/article/a3""#));
        assert!(html.contains("<p>First paragraph of a4.</p>"));
        assert!(!html.contains("a5"));
        assert!(html.contains(r#"href="https://example.org/""#));
        assert!(html.contains(r#"href="https://example.org/?page=3""#));
        assert!(html.contains("Page 2 of 3"));
        assert!(html.contains(r#"href="https://example.org/category/linux""#));
        Ok(())
    }

    #[test]
    fn test_render_article_escapes_title() -> Result<()> {
        let config = config(2);
        let renderer = Renderer::new(&config)?;
        let mut articles = five();
        articles[1].title = String::from("Tom & Jerry");
        articles[1].content = vec![String::from("# Heading"), String::from("Body")];
        let html = renderer.render_article(&articles, 1)?;

        assert!(html.contains("Tom &amp; Jerry"));
        assert!(html.contains("<h2>Heading</h2>"));
        assert!(html.contains("<p>Body</p>"));
        assert!(html.contains(r#"src="https://example.org/images/a2.jpg""#));
        assert!(html.contains(r#"href="https://example.org/article/a1""#));
        assert!(html.contains(r#"href="https://example.org/article/a3""#));
        Ok(())
    }

    #[test]
    fn test_theme_directory_overrides_template() -> Result<()> {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("not_found.html"), "missing: {{.site_title}}").unwrap();
        let mut config = config(2);
        config.theme_directory = Some(dir.path().to_owned());
        let renderer = Renderer::new(&config)?;
        assert_eq!("missing: Test Blog", renderer.render_not_found(&[])?);
        Ok(())
    }
}
