//! The library code for `perspective`, a small personal blog. Everything
//! revolves around a single JSON store of articles ([`crate::store`]):
//!
//! 1. The web front end ([`crate::server`]) loads the store on every request
//!    and renders paginated listings, category listings, article pages and
//!    an Atom feed through templates ([`crate::render`], [`crate::feed`]).
//! 2. The maintenance utility ([`crate::maintenance`]) validates new or
//!    changed records and rewrites the store.
//! 3. The reminder utility ([`crate::reminder`]) reads the store and reports
//!    whether a new article is due, optionally by email ([`crate::mail`]).
//! 4. The image generator ([`crate::images`]) draws a header image for each
//!    article into the static directory.
//!
//! All four are configured from the same project file ([`crate::config`]).

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]

pub mod article;
pub mod category;
pub mod config;
pub mod feed;
pub mod images;
pub mod mail;
pub mod maintenance;
pub mod markdown;
pub mod reminder;
pub mod render;
pub mod server;
pub mod store;
