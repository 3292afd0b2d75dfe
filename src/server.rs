//! The web front end. [`Site::handle`] maps a request to a [`Reply`] without
//! touching the network; [`serve`] runs it behind a [`tiny_http`] server.
//!
//! Routes:
//!
//! * `GET /` (optional `page` query parameter): the listing of all articles.
//! * `GET /category/{slug}`: the listing of one category.
//! * `GET /article/{id}`: an article, or the not-found page.
//! * `GET /images/{file}`: a header image from the images directory.
//! * `GET /feed.atom`: the Atom feed.
//! * `GET /health`: `{"status": "healthy", "articles_count": N}`.
//!
//! The store is read afresh for every request.

use crate::article::Article;
use crate::category::Category;
use crate::config::{Author, Config};
use crate::feed::{self, FeedConfig};
use crate::render::{self, paginate, Renderer};
use crate::store::{self, Store};
use percent_encoding::percent_decode_str;
use std::fmt;
use std::io;
use std::path::PathBuf;
use tiny_http::{Header, Method, Response, Server, StatusCode};
use url::Url;

const HTML: &str = "text/html; charset=utf-8";
const JSON: &str = "application/json";
const ATOM: &str = "application/atom+xml";
const TEXT: &str = "text/plain; charset=utf-8";

/// A response, independent of the HTTP library.
#[derive(Debug)]
pub struct Reply {
    pub status: u16,
    pub content_type: &'static str,
    pub body: Vec<u8>,
}

impl Reply {
    fn new<B: Into<Vec<u8>>>(status: u16, content_type: &'static str, body: B) -> Reply {
        Reply {
            status,
            content_type,
            body: body.into(),
        }
    }
}

/// Everything needed to answer requests.
pub struct Site {
    store: Store,
    renderer: Renderer,
    site_root: Url,
    page_size: usize,
    images_directory: PathBuf,
    title: String,
    author: Option<Author>,
}

impl Site {
    pub fn new(config: &Config) -> Result<Site> {
        Ok(Site {
            store: Store::new(&config.store_path),
            renderer: Renderer::new(config)?,
            site_root: config.site_root.clone(),
            page_size: config.page_size,
            images_directory: config.images_directory(),
            title: config.title.clone(),
            author: config.author.clone(),
        })
    }

    /// Answers a request for `raw_url` (the path plus query string as sent
    /// by the client). Failures are logged and answered with a 500 so that a
    /// bad store never takes the server down.
    pub fn handle(&self, method: &Method, raw_url: &str) -> Reply {
        if method != &Method::Get && method != &Method::Head {
            return Reply::new(405, TEXT, "method not allowed");
        }
        match self.route(raw_url) {
            Ok(reply) => reply,
            Err(err) => {
                log::error!("handling `{}`: {}", raw_url, err);
                Reply::new(500, TEXT, "internal server error")
            }
        }
    }

    fn route(&self, raw_url: &str) -> Result<Reply> {
        let url = self.site_root.join(raw_url)?;
        let path = url
            .path()
            .strip_prefix(self.site_root.path())
            .unwrap_or_else(|| url.path());
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

        match segments.as_slice() {
            [] => self.listing(&url, None),
            ["category", slug] => self.listing(&url, Some(*slug)),
            ["article", id] => self.article(id),
            ["images", file] => self.image(file),
            ["feed.atom"] => self.feed(),
            ["health"] => self.health(),
            _ => self.not_found(&self.store.load_sorted()?),
        }
    }

    fn listing(&self, url: &Url, category_slug: Option<&str>) -> Result<Reply> {
        let all = self.store.load_sorted()?;
        let (base, articles, heading): (Url, Vec<Article>, Option<String>) = match category_slug {
            None => (self.site_root.clone(), all.clone(), None),
            Some(category_slug) => {
                let matching: Vec<Article> = all
                    .iter()
                    .filter(|a| slug::slugify(&a.category) == category_slug)
                    .cloned()
                    .collect();
                let category = match matching.first() {
                    Some(a) => Category::new(&a.category, &self.site_root)?,
                    None => Category::new(category_slug, &self.site_root)?,
                };
                (category.url, matching, Some(category.name))
            }
        };
        let listing = paginate(&articles, page_param(url), self.page_size);
        let html = self
            .renderer
            .render_listing(&all, &listing, &base, heading.as_deref())?;
        Ok(Reply::new(200, HTML, html))
    }

    fn article(&self, id: &str) -> Result<Reply> {
        let all = self.store.load_sorted()?;
        match render::find(&all, id) {
            Some((index, _)) => {
                let html = self.renderer.render_article(&all, index)?;
                Ok(Reply::new(200, HTML, html))
            }
            None => self.not_found(&all),
        }
    }

    fn image(&self, file: &str) -> Result<Reply> {
        let file = match percent_decode_str(file).decode_utf8() {
            Ok(file) => file,
            Err(_) => return self.not_found(&[]),
        };
        let content_type = match file.rsplit('.').next() {
            Some("jpg") | Some("jpeg") => "image/jpeg",
            Some("png") => "image/png",
            _ => return self.not_found(&[]),
        };
        if file.starts_with('.') || file.contains('/') || file.contains('\\') {
            return self.not_found(&[]);
        }
        match std::fs::read(self.images_directory.join(&*file)) {
            Ok(bytes) => Ok(Reply::new(200, content_type, bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => self.not_found(&[]),
            Err(e) => Err(Error::Io(e)),
        }
    }

    fn feed(&self) -> Result<Reply> {
        let all = self.store.load_sorted()?;
        let bytes = feed::write_feed(
            &FeedConfig {
                title: &self.title,
                author: self.author.as_ref(),
                home_page: &self.site_root,
            },
            &self.renderer,
            &all,
        )?;
        Ok(Reply::new(200, ATOM, bytes))
    }

    fn health(&self) -> Result<Reply> {
        let count = self.store.load()?.len();
        let body = serde_json::json!({"status": "healthy", "articles_count": count});
        Ok(Reply::new(200, JSON, body.to_string()))
    }

    fn not_found(&self, all: &[Article]) -> Result<Reply> {
        Ok(Reply::new(404, HTML, self.renderer.render_not_found(all)?))
    }
}

// A missing, zero, or non-numeric `page` parameter means page 1.
fn page_param(url: &Url) -> usize {
    url.query_pairs()
        .find(|(k, _)| k == "page")
        .and_then(|(_, v)| v.parse::<usize>().ok())
        .filter(|page| *page > 0)
        .unwrap_or(1)
}

/// Listens on the configured address and answers requests one at a time
/// until the process is stopped.
pub fn serve(config: &Config) -> Result<()> {
    if config.uses_insecure_secret_key() {
        log::warn!("BLOG_SECRET_KEY is not set; using the insecure development key");
    }
    let site = Site::new(config)?;
    let server = Server::http(&config.bind).map_err(|e| Error::Bind {
        addr: config.bind.clone(),
        err: e.to_string(),
    })?;
    log::info!(
        "serving {} on {} from {}",
        config.site_root,
        config.bind,
        config.store_path.display()
    );

    for request in server.incoming_requests() {
        let reply = site.handle(request.method(), request.url());
        log::info!("{} {} {}", request.method(), request.url(), reply.status);

        let mut response =
            Response::from_data(reply.body).with_status_code(StatusCode(reply.status));
        let content_type = Header::from_bytes(&b"Content-Type"[..], reply.content_type.as_bytes());
        if let Ok(header) = content_type {
            response.add_header(header);
        }
        if let Err(e) = request.respond(response) {
            log::warn!("writing response: {}", e);
        }
    }
    Ok(())
}

/// The result of a fallible request.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error answering a request or starting the server.
#[derive(Debug)]
pub enum Error {
    /// Returned when the store can't be read.
    Store(store::Error),

    /// Returned for rendering errors.
    Render(render::Error),

    /// Returned for feed errors.
    Feed(feed::Error),

    /// Returned when the request URL can't be parsed.
    UrlParse(url::ParseError),

    /// Returned when the listening socket can't be opened.
    Bind { addr: String, err: String },

    /// Returned for other I/O errors.
    Io(io::Error),
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Store(err) => err.fmt(f),
            Error::Render(err) => err.fmt(f),
            Error::Feed(err) => err.fmt(f),
            Error::UrlParse(err) => err.fmt(f),
            Error::Bind { addr, err } => write!(f, "Listening on '{}': {}", addr, err),
            Error::Io(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Store(err) => Some(err),
            Error::Render(err) => Some(err),
            Error::Feed(err) => Some(err),
            Error::UrlParse(err) => Some(err),
            Error::Bind { .. } => None,
            Error::Io(err) => Some(err),
        }
    }
}

impl From<store::Error> for Error {
    fn from(err: store::Error) -> Error {
        Error::Store(err)
    }
}

impl From<render::Error> for Error {
    fn from(err: render::Error) -> Error {
        Error::Render(err)
    }
}

impl From<feed::Error> for Error {
    fn from(err: feed::Error) -> Error {
        Error::Feed(err)
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Error {
        Error::UrlParse(err)
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Error {
        Error::Io(err)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::article::test::article;

    fn site(articles: &[Article]) -> (tempfile::TempDir, Site) {
        let dir = tempfile::tempdir().unwrap();
        let mut config = crate::render::test::config(2);
        config.store_path = dir.path().join("articles.json");
        config.static_directory = dir.path().join("static");
        if !articles.is_empty() {
            Store::new(&config.store_path).save(articles).unwrap();
        }
        (dir, Site::new(&config).unwrap())
    }

    fn five() -> Vec<Article> {
        vec![
            article("a1", "Networks", "June 5, 2024"),
            article("a2", "Aviation", "June 4, 2024"),
            article("a3", "Networks", "June 3, 2024"),
            article("a4", "Linux", "June 2, 2024"),
            article("a5", "Networks", "June 1, 2024"),
        ]
    }

    fn get(site: &Site, url: &str) -> (u16, String) {
        let reply = site.handle(&Method::Get, url);
        (reply.status, String::from_utf8_lossy(&reply.body).into_owned())
    }

    #[test]
    fn test_health_counts_articles() {
        let (_dir, site) = site(&five());
        let reply = site.handle(&Method::Get, "/health");
        assert_eq!(200, reply.status);
        assert_eq!(JSON, reply.content_type);
        let body: serde_json::Value = serde_json::from_slice(&reply.body).unwrap();
        assert_eq!(serde_json::json!({"status": "healthy", "articles_count": 5}), body);
    }

    #[test]
    fn test_missing_store_serves_empty_listing() {
        let (_dir, site) = site(&[]);
        let (status, body) = get(&site, "/");
        assert_eq!(200, status);
        assert!(body.contains("No articles here yet."));
        let (status, body) = get(&site, "/health");
        assert_eq!(200, status);
        assert!(body.contains("\"articles_count\":0"));
    }

    #[test]
    fn test_listing_pages() {
        let (_dir, site) = site(&five());
        let (status, body) = get(&site, "/?page=3");
        assert_eq!(200, status);
        assert!(body.contains("/article/a5"));
        assert!(!body.contains("/article/a1\""));
        assert!(body.contains("Page 3 of 3"));

        let (status, body) = get(&site, "/?page=99");
        assert_eq!(200, status);
        assert!(body.contains("No articles here yet."));

        let (_, body) = get(&site, "/?page=abc");
        assert!(body.contains("Page 1 of 3"));
    }

    #[test]
    fn test_category_listing() {
        let (_dir, site) = site(&five());
        let (status, body) = get(&site, "/category/networks");
        assert_eq!(200, status);
        assert!(body.contains("<h2>Networks</h2>"));
        assert!(body.contains("/article/a1\""));
        assert!(body.contains("/article/a3\""));
        assert!(!body.contains("/article/a2\""));
        assert!(body.contains("https://example.org/category/networks?page=2"));
    }

    #[test]
    fn test_article_and_not_found() {
        let (_dir, site) = site(&five());
        let (status, body) = get(&site, "/article/a3");
        assert_eq!(200, status);
        assert!(body.contains("Title of a3"));

        let (status, body) = get(&site, "/article/missing");
        assert_eq!(404, status);
        assert!(body.contains("Page not found"));
        assert!(!body.contains("Title of"));

        let (status, _) = get(&site, "/no/such/route");
        assert_eq!(404, status);
    }

    #[test]
    fn test_images() {
        let (dir, site) = site(&five());
        let images = dir.path().join("static").join("images");
        std::fs::create_dir_all(&images).unwrap();
        std::fs::write(images.join("a1.jpg"), b"jpeg bytes").unwrap();

        let reply = site.handle(&Method::Get, "/images/a1.jpg");
        assert_eq!(200, reply.status);
        assert_eq!("image/jpeg", reply.content_type);
        assert_eq!(b"jpeg bytes".to_vec(), reply.body);

        assert_eq!(404, site.handle(&Method::Get, "/images/a2.jpg").status);
        assert_eq!(404, site.handle(&Method::Get, "/images/..%2Farticles.json").status);
        assert_eq!(404, site.handle(&Method::Get, "/images/notes.txt").status);
    }

    #[test]
    fn test_image_names_are_percent_decoded() {
        let (dir, site) = site(&five());
        let images = dir.path().join("static").join("images");
        std::fs::create_dir_all(&images).unwrap();
        std::fs::write(images.join("my pic.png"), b"png bytes").unwrap();
        std::fs::write(images.join("café.jpg"), b"jpeg bytes").unwrap();

        let reply = site.handle(&Method::Get, "/images/my%20pic.png");
        assert_eq!(200, reply.status);
        assert_eq!("image/png", reply.content_type);
        assert_eq!(200, site.handle(&Method::Get, "/images/caf%C3%A9.jpg").status);

        let escapes = ["/images/%2E%2E%2Fa1.jpg", "/images/sub%2Fa1.jpg", "/images/%FF.jpg"];
        for url in &escapes {
            assert_eq!(404, site.handle(&Method::Get, url).status, "{}", url);
        }
    }

    #[test]
    fn test_malformed_record_does_not_take_the_site_down() {
        let (dir, site) = site(&[]);
        std::fs::write(
            dir.path().join("articles.json"),
            r#"{"articles": [
                {"id": "a", "title": "A", "category": "Linux",
                 "date": "June 1, 2024", "content": ["a"]},
                {"id": "b", "category": "Linux", "content": ["no title"]}
            ]}"#,
        )
        .unwrap();

        let (status, body) = get(&site, "/");
        assert_eq!(200, status);
        assert!(body.contains("/article/a\""));
        assert_eq!(200, get(&site, "/article/a").0);
        assert_eq!(404, get(&site, "/article/b").0);
        let (status, body) = get(&site, "/health");
        assert_eq!(200, status);
        assert!(body.contains("\"articles_count\":1"));
    }

    #[test]
    fn test_feed_route() {
        let (_dir, site) = site(&five());
        let reply = site.handle(&Method::Get, "/feed.atom");
        assert_eq!(200, reply.status);
        assert_eq!(ATOM, reply.content_type);
        assert!(String::from_utf8_lossy(&reply.body).contains("/article/a5"));
    }

    #[test]
    fn test_rejects_other_methods() {
        let (_dir, site) = site(&five());
        assert_eq!(405, site.handle(&Method::Post, "/").status);
    }
}
