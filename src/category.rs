//! Defines the [`Category`] type, which represents an [`crate::article::Article`]
//! category as it appears in navigation and on category listing pages.

use gtmpl::Value;
use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};
use url::Url;

/// Represents an article category. The `name` is the display form taken from
/// the article record; the `slug` is what appears in URLs.
#[derive(Clone, Debug)]
pub struct Category {
    /// The category as written on the article, e.g., `Networks`.
    pub name: String,

    /// The slugified name, so `Networks` and `networks` resolve to the same
    /// category page.
    pub slug: String,

    /// The URL for the category's first listing page. Given a `site_root`,
    /// this looks like `{site_root}/category/{slug}`.
    pub url: Url,
}

impl Category {
    /// Builds a [`Category`] from its display name.
    pub fn new(name: &str, site_root: &Url) -> Result<Category, url::ParseError> {
        let slug = slug::slugify(name);
        Ok(Category {
            url: site_root.join(&format!("category/{}", slug))?,
            name: name.to_owned(),
            slug,
        })
    }

    /// Collects the distinct categories of a set of articles ordered by slug.
    /// The first spelling encountered wins as the display name.
    pub fn collect<'a, I>(names: I, site_root: &Url) -> Result<Vec<Category>, url::ParseError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut by_slug: BTreeMap<String, Category> = BTreeMap::new();
        for name in names {
            let category = Category::new(name, site_root)?;
            by_slug.entry(category.slug.clone()).or_insert(category);
        }
        Ok(by_slug.into_values().collect())
    }

    /// Reports whether an article category belongs to this category.
    pub fn matches(&self, name: &str) -> bool {
        slug::slugify(name) == self.slug
    }
}

impl Hash for Category {
    /// Implements [`Hash`] for [`Category`] by delegating directly to the
    /// `slug` field.
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.slug.hash(state)
    }
}

impl PartialEq for Category {
    /// Implements [`PartialEq`] and [`Eq`] for [`Category`] by delegating
    /// directly to the `slug` field.
    fn eq(&self, other: &Self) -> bool {
        self.slug == other.slug
    }
}
impl Eq for Category {}

impl From<&Category> for Value {
    /// Converts [`Category`]s into [`Value`]s for templating.
    fn from(c: &Category) -> Value {
        use std::collections::HashMap;
        let mut m: HashMap<String, Value> = HashMap::new();
        m.insert("name".to_owned(), Value::String(c.name.clone()));
        m.insert("slug".to_owned(), Value::String(c.slug.clone()));
        m.insert("url".to_owned(), Value::String(c.url.to_string()));
        Value::Object(m)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_collect_dedupes_by_slug() -> Result<(), url::ParseError> {
        let root = Url::parse("https://example.org/")?;
        let categories = Category::collect(vec!["Networks", "Linux", "networks"], &root)?;
        let names: Vec<&str> = categories.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(vec!["Linux", "Networks"], names);
        assert_eq!(
            "https://example.org/category/networks",
            categories[1].url.as_str()
        );
        assert!(categories[1].matches("NETWORKS"));
        assert!(!categories[1].matches("Linux"));
        Ok(())
    }
}
