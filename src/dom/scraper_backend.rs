//! `scraper`-backed implementation of the DOM capability interface

use scraper::{ElementRef, Html, Selector};

use super::{DomDocument, DomNode};

/// Owns a parsed document; nodes borrow from it.
pub struct ScraperDocument {
    html: Html,
}

impl ScraperDocument {
    pub fn parse(html: &str) -> Self {
        Self {
            html: Html::parse_document(html),
        }
    }
}

fn compile(css: &str) -> Option<Selector> {
    Selector::parse(css).ok()
}

impl DomDocument for ScraperDocument {
    fn select(&self, css: &str) -> Vec<Box<dyn DomNode + '_>> {
        let Some(sel) = compile(css) else {
            return Vec::new();
        };
        self.html
            .select(&sel)
            .map(|el| Box::new(ScraperNode { el }) as Box<dyn DomNode>)
            .collect()
    }

    fn text(&self) -> String {
        join_text(self.html.root_element())
    }
}

#[derive(Clone, Copy)]
struct ScraperNode<'a> {
    el: ElementRef<'a>,
}

fn join_text(el: ElementRef<'_>) -> String {
    el.text().collect::<Vec<_>>().join(" ")
}

impl<'a> DomNode for ScraperNode<'a> {
    fn select(&self, css: &str) -> Vec<Box<dyn DomNode + '_>> {
        let Some(sel) = compile(css) else {
            return Vec::new();
        };
        self.el
            .select(&sel)
            .map(|el| Box::new(ScraperNode { el }) as Box<dyn DomNode>)
            .collect()
    }

    fn attr(&self, name: &str) -> Option<String> {
        self.el.value().attr(name).map(str::to_string)
    }

    fn text(&self) -> String {
        join_text(self.el)
    }

    fn tag(&self) -> String {
        self.el.value().name().to_ascii_lowercase()
    }

    fn parent(&self) -> Option<Box<dyn DomNode + '_>> {
        self.el
            .parent()
            .and_then(ElementRef::wrap)
            .map(|el| Box::new(ScraperNode { el }) as Box<dyn DomNode>)
    }

    fn within_ancestor(&self, tags: &[&str], max_hops: usize) -> bool {
        let mut hops = 0;
        let mut current = self.el.parent();
        while let Some(node) = current {
            if hops >= max_hops {
                break;
            }
            if let Some(el) = ElementRef::wrap(node) {
                let name = el.value().name().to_ascii_lowercase();
                if name == "body" || name == "html" {
                    break;
                }
                if tags.contains(&name.as_str()) {
                    return true;
                }
                hops += 1;
            }
            current = node.parent();
        }
        false
    }
}
