//! `kuchiki`-backed implementation of the DOM capability interface

use kuchiki::traits::TendrilSink;
use kuchiki::{ElementData, NodeDataRef, NodeRef};

use super::{DomDocument, DomNode};

/// Reference-counted DOM tree; nodes are cheap clones of tree handles.
pub struct KuchikiDocument {
    root: NodeRef,
}

impl KuchikiDocument {
    pub fn parse(html: &str) -> Self {
        Self {
            root: kuchiki::parse_html().one(html),
        }
    }
}

fn select_from(node: &NodeRef, css: &str) -> Vec<Box<dyn DomNode + 'static>> {
    match node.select(css) {
        Ok(matches) => matches
            .map(|data| Box::new(KuchikiNode { data }) as Box<dyn DomNode>)
            .collect(),
        Err(()) => Vec::new(),
    }
}

impl DomDocument for KuchikiDocument {
    fn select(&self, css: &str) -> Vec<Box<dyn DomNode + '_>> {
        select_from(&self.root, css)
    }

    fn text(&self) -> String {
        self.root.text_contents()
    }
}

struct KuchikiNode {
    data: NodeDataRef<ElementData>,
}

impl DomNode for KuchikiNode {
    fn select(&self, css: &str) -> Vec<Box<dyn DomNode + '_>> {
        select_from(self.data.as_node(), css)
    }

    fn attr(&self, name: &str) -> Option<String> {
        self.data.attributes.borrow().get(name).map(str::to_string)
    }

    fn text(&self) -> String {
        self.data.as_node().text_contents()
    }

    fn tag(&self) -> String {
        self.data.name.local.to_string().to_ascii_lowercase()
    }

    fn parent(&self) -> Option<Box<dyn DomNode + '_>> {
        let mut current = self.data.as_node().parent();
        while let Some(node) = current {
            if let Some(data) = node.clone().into_element_ref() {
                return Some(Box::new(KuchikiNode { data }) as Box<dyn DomNode>);
            }
            current = node.parent();
        }
        None
    }

    fn within_ancestor(&self, tags: &[&str], max_hops: usize) -> bool {
        let mut hops = 0;
        for node in self.data.as_node().ancestors() {
            if hops >= max_hops {
                break;
            }
            if let Some(el) = node.as_element() {
                let name = el.name.local.to_string().to_ascii_lowercase();
                if name == "body" || name == "html" {
                    break;
                }
                if tags.contains(&name.as_str()) {
                    return true;
                }
                hops += 1;
            }
        }
        false
    }
}
