//! Minimal DOM capability interface over interchangeable HTML backends
//!
//! The extraction pipeline only needs find/find-all, attribute access,
//! text, tag names and ancestor checks. Hiding those behind two small
//! traits keeps the pipeline independent of any particular HTML library;
//! the two shipped backends parse the same rendered HTML string the
//! browser session hands back.

pub mod kuchiki_backend;
pub mod scraper_backend;

pub use kuchiki_backend::KuchikiDocument;
pub use scraper_backend::ScraperDocument;

/// A parsed HTML document the pipeline can query.
pub trait DomDocument {
    /// All elements matching `css`, in document order. Invalid selectors
    /// yield an empty set rather than an error; selector lists are long
    /// and a single bad pattern must not abort a strategy.
    fn select(&self, css: &str) -> Vec<Box<dyn DomNode + '_>>;

    /// Concatenated text content of the document.
    fn text(&self) -> String;
}

/// One element inside a [`DomDocument`].
pub trait DomNode {
    /// Descendant elements matching `css`, in document order.
    fn select(&self, css: &str) -> Vec<Box<dyn DomNode + '_>>;

    /// First descendant matching `css`.
    fn first(&self, css: &str) -> Option<Box<dyn DomNode + '_>> {
        self.select(css).into_iter().next()
    }

    /// Attribute value, if present.
    fn attr(&self, name: &str) -> Option<String>;

    /// Text content of this subtree, whitespace-joined.
    fn text(&self) -> String;

    /// Lowercase tag name.
    fn tag(&self) -> String;

    /// Nearest ancestor element, if any.
    fn parent(&self) -> Option<Box<dyn DomNode + '_>>;

    /// Walk up to `max_hops` element ancestors looking for any of `tags`.
    /// Stops early at `body`/`html`.
    fn within_ancestor(&self, tags: &[&str], max_hops: usize) -> bool;
}
