//! Loads the blog's [`Config`] from a `blog.yaml` project file, found by
//! searching the working directory and its parents. Every field is optional;
//! a project with no file at all runs on defaults.
//!
//! ```yaml
//! title: Daudi's Perspective
//! site_root: https://blog.example.org/
//! store: data/articles.json
//! static_directory: static
//! page_size: 5
//! bind: 0.0.0.0:8000
//! reminder_log: /var/log/blog_reminders.log
//! author:
//!   name: Daudi
//! smtp:
//!   server: smtp.example.org
//!   from_email: blog@example.org
//! ```

use serde::Deserialize;
use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};
use url::Url;

/// The project file name searched for by [`Config::from_directory`].
pub const PROJECT_FILE: &str = "blog.yaml";

const SECRET_KEY_VAR: &str = "BLOG_SECRET_KEY";
const SMTP_USERNAME_VAR: &str = "BLOG_SMTP_USERNAME";
const SMTP_PASSWORD_VAR: &str = "BLOG_SMTP_PASSWORD";

/// Used when `BLOG_SECRET_KEY` is unset. Not fit for production.
pub const INSECURE_SECRET_KEY: &str = "dev-secret-key-change-in-production";

#[derive(Deserialize)]
struct PageSize(usize);
impl Default for PageSize {
    fn default() -> Self {
        PageSize(5)
    }
}

#[derive(Deserialize)]
struct SmtpPort(u16);
impl Default for SmtpPort {
    fn default() -> Self {
        SmtpPort(587)
    }
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct Project {
    title: Option<String>,
    tagline: Option<String>,
    site_root: Option<Url>,
    store: Option<PathBuf>,
    static_directory: Option<PathBuf>,
    page_size: PageSize,
    bind: Option<String>,
    reminder_log: Option<PathBuf>,
    theme: Option<PathBuf>,
    author: Option<Author>,
    smtp: Option<SmtpProject>,
}

#[derive(Deserialize)]
struct SmtpProject {
    server: String,
    #[serde(default)]
    port: SmtpPort,
    from_email: String,
}

/// The feed author.
#[derive(Clone, Debug, Deserialize)]
pub struct Author {
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// Mail relay settings. Credentials come from the environment, never the
/// project file.
#[derive(Clone, Debug)]
pub struct Smtp {
    pub server: String,
    pub port: u16,
    pub from_email: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

/// Resolved settings shared by the server and every utility.
#[derive(Clone, Debug)]
pub struct Config {
    /// The site title, shown in the page header and the feed.
    pub title: String,

    /// The subtitle drawn on simple placeholder images.
    pub tagline: String,

    /// The absolute URL of the home page. Every link the site renders is
    /// joined onto this.
    pub site_root: Url,

    /// The JSON article store.
    pub store_path: PathBuf,

    /// The static asset directory. Header images live in its `images`
    /// subdirectory.
    pub static_directory: PathBuf,

    /// The number of articles per listing page. Always at least 1.
    pub page_size: usize,

    /// The address the web server listens on.
    pub bind: String,

    /// The file `reminder log` appends to.
    pub reminder_log: PathBuf,

    /// An optional directory of template overrides.
    pub theme_directory: Option<PathBuf>,

    pub author: Option<Author>,
    pub smtp: Option<Smtp>,

    /// The session secret. Falls back to [`INSECURE_SECRET_KEY`].
    pub secret_key: String,
}

impl Config {
    /// Searches `dir` and then each of its parents for [`PROJECT_FILE`]. When
    /// none is found, returns the defaults rooted at `dir`.
    pub fn from_directory(dir: &Path) -> Result<Config> {
        let mut candidate = Some(dir);
        while let Some(current) = candidate {
            let path = current.join(PROJECT_FILE);
            if path.is_file() {
                return Config::from_project_file(&path);
            }
            candidate = current.parent();
        }
        log::info!(
            "no `{}` found above '{}'; using defaults",
            PROJECT_FILE,
            dir.display()
        );
        Config::rooted_at(dir)
    }

    /// The default settings with every relative path rooted at `dir`. No
    /// project file is read.
    pub fn rooted_at(dir: &Path) -> Result<Config> {
        Config::from_project(Project::default(), dir)
    }

    /// Loads a specific project file. Relative paths inside it are resolved
    /// against the directory holding it.
    pub fn from_project_file(path: &Path) -> Result<Config> {
        let file = File::open(path).map_err(|e| Error::Open {
            path: path.to_owned(),
            err: e,
        })?;
        let project: Project = serde_yaml::from_reader(file).map_err(|e| Error::Parse {
            path: path.to_owned(),
            err: e,
        })?;
        let root = match path.parent() {
            Some(root) => root,
            None => return Err(Error::NoParent(path.to_owned())),
        };
        log::debug!("loaded project file '{}'", path.display());
        Config::from_project(project, root)
    }

    fn from_project(project: Project, root: &Path) -> Result<Config> {
        if project.page_size.0 == 0 {
            return Err(Error::PageSize);
        }
        let site_root = match project.site_root {
            Some(url) => url,
            None => Url::parse("http://localhost:8000/")?,
        };
        let resolve = |p: Option<PathBuf>, default: &str| -> PathBuf {
            let p = p.unwrap_or_else(|| PathBuf::from(default));
            if p.is_absolute() {
                p
            } else {
                root.join(p)
            }
        };
        let title = project
            .title
            .unwrap_or_else(|| String::from("Daudi's Perspective"));

        Ok(Config {
            tagline: project.tagline.unwrap_or_else(|| title.clone()),
            title,
            // `Url::join` treats the last segment of a root without a
            // trailing slash as a file name and drops it.
            site_root: with_trailing_slash(site_root),
            store_path: resolve(project.store, "data/articles.json"),
            static_directory: resolve(project.static_directory, "static"),
            page_size: project.page_size.0,
            bind: project.bind.unwrap_or_else(|| String::from("0.0.0.0:8000")),
            reminder_log: resolve(project.reminder_log, "/var/log/blog_reminders.log"),
            theme_directory: project.theme.map(|p| resolve(Some(p), "")),
            author: project.author,
            smtp: project.smtp.map(|smtp| Smtp {
                server: smtp.server,
                port: smtp.port.0,
                from_email: smtp.from_email,
                username: std::env::var(SMTP_USERNAME_VAR).ok(),
                password: std::env::var(SMTP_PASSWORD_VAR).ok(),
            }),
            secret_key: match std::env::var(SECRET_KEY_VAR) {
                Ok(key) if !key.is_empty() => key,
                _ => String::from(INSECURE_SECRET_KEY),
            },
        })
    }

    /// The directory header images are written to and served from.
    pub fn images_directory(&self) -> PathBuf {
        self.static_directory.join("images")
    }

    /// Reports whether the secret key is the built-in development fallback.
    pub fn uses_insecure_secret_key(&self) -> bool {
        self.secret_key == INSECURE_SECRET_KEY
    }
}

fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

/// The result of loading configuration.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error loading a project file.
#[derive(Debug)]
pub enum Error {
    /// Returned when the project file can't be opened.
    Open { path: PathBuf, err: std::io::Error },

    /// Returned when the project file isn't valid YAML or has ill-typed
    /// fields.
    Parse {
        path: PathBuf,
        err: serde_yaml::Error,
    },

    /// Returned when the project file path has no parent directory.
    NoParent(PathBuf),

    /// Returned when `page_size` is zero.
    PageSize,

    /// Returned when the default site root can't be parsed.
    Url(url::ParseError),
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Open { path, err } => {
                write!(f, "Opening project file '{}': {}", path.display(), err)
            }
            Error::Parse { path, err } => {
                write!(f, "Loading configuration '{}': {}", path.display(), err)
            }
            Error::NoParent(path) => write!(
                f,
                "Can't get parent directory for provided project file path '{:?}'",
                path
            ),
            Error::PageSize => write!(f, "`page_size` must be at least 1"),
            Error::Url(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Open { err, .. } => Some(err),
            Error::Parse { err, .. } => Some(err),
            Error::NoParent(_) | Error::PageSize => None,
            Error::Url(err) => Some(err),
        }
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Error {
        Error::Url(err)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_defaults_without_project_file() -> Result<()> {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::rooted_at(dir.path())?;
        assert_eq!(dir.path().join("data/articles.json"), config.store_path);
        assert_eq!(dir.path().join("static/images"), config.images_directory());
        assert_eq!(5, config.page_size);
        assert_eq!("http://localhost:8000/", config.site_root.as_str());
        Ok(())
    }

    #[test]
    fn test_project_file_found_in_parent() -> Result<()> {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(PROJECT_FILE),
            "title: Test Blog\nsite_root: https://example.org/blog\nstore: db.json\npage_size: 2\n",
        )
        .unwrap();
        let nested = dir.path().join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();

        let config = Config::from_directory(&nested)?;
        assert_eq!("Test Blog", config.title);
        assert_eq!("Test Blog", config.tagline);
        assert_eq!(dir.path().join("db.json"), config.store_path);
        assert_eq!(2, config.page_size);
        assert_eq!("https://example.org/blog/", config.site_root.as_str());
        assert!(config.smtp.is_none());
        Ok(())
    }

    #[test]
    fn test_rooted_at_ignores_project_files_above() -> Result<()> {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(PROJECT_FILE), "title: Elsewhere\npage_size: 2\n").unwrap();
        let nested = dir.path().join("site");
        std::fs::create_dir_all(&nested).unwrap();

        let config = Config::rooted_at(&nested)?;
        assert_eq!(5, config.page_size);
        assert_eq!("Daudi's Perspective", config.title);
        assert_eq!(nested.join("data/articles.json"), config.store_path);
        Ok(())
    }

    #[test]
    fn test_zero_page_size_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(PROJECT_FILE);
        std::fs::write(&path, "page_size: 0\n").unwrap();
        assert!(matches!(
            Config::from_project_file(&path),
            Err(Error::PageSize)
        ));
    }
}
