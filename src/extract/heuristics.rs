//! Last-ditch extraction strategies: global card scan and bare
//! links-with-images
//!
//! These run only when every structured strategy produced nothing. They
//! trade precision for recall, so both lean hard on the validator and the
//! blacklisted-section filter.

use url::Url;

use super::candidate::Candidate;
use super::card::{extract_card_fields, looks_like_product_card};
use super::selectors::{BLACKLISTED_SECTIONS, SECTION_SCAN_HOPS};
use crate::dom::{DomDocument, DomNode};
use crate::normalize;
use crate::validate;

const IMG_SELECTOR: &str = "img[src], img[data-src], img[data-original], img[data-srcset]";

/// Walk every `main|section|div` container and treat any enclosed
/// `li|div|article` that looks like a card as one.
pub fn extract_global(doc: &dyn DomDocument, base_url: &Url, max_items: usize) -> Vec<Candidate> {
    let mut out = Vec::new();
    for container in doc.select("main, section, div") {
        if container.within_ancestor(BLACKLISTED_SECTIONS, SECTION_SCAN_HOPS) {
            continue;
        }
        for card in container.select("li, div, article") {
            if card.within_ancestor(BLACKLISTED_SECTIONS, SECTION_SCAN_HOPS) {
                continue;
            }
            if !looks_like_product_card(card.as_ref()) {
                continue;
            }
            let candidate = extract_card_fields(card.as_ref(), base_url);
            if validate::is_valid_candidate(&candidate) {
                out.push(candidate);
                if out.len() >= max_items {
                    return out;
                }
            }
        }
    }
    out
}

/// Anchors with a product-like href and an image inside the anchor or its
/// immediate parent. Produces URL/title/image-only candidates.
pub fn extract_links_with_images(
    doc: &dyn DomDocument,
    base_url: &Url,
    max_items: usize,
) -> Vec<Candidate> {
    let mut out = Vec::new();
    for anchor in doc.select("a[href]") {
        if anchor.within_ancestor(BLACKLISTED_SECTIONS, SECTION_SCAN_HOPS) {
            continue;
        }
        let Some(href) = anchor.attr("href") else {
            continue;
        };
        let Some(absolute) = normalize::to_absolute(base_url, &href) else {
            continue;
        };
        if !validate::is_potential_product_href(&absolute) {
            continue;
        }

        // The parent handle must outlive any image node found inside it.
        let parent = anchor.parent();
        let image = anchor
            .first(IMG_SELECTOR)
            .or_else(|| parent.as_ref().and_then(|p| p.first(IMG_SELECTOR)));
        let Some(image) = image else {
            continue;
        };

        let title = anchor
            .attr("title")
            .and_then(|t| normalize::clean_text(&t))
            .or_else(|| normalize::clean_text(&anchor.text()));
        let image_url = image
            .attr("src")
            .or_else(|| image.attr("data-src"))
            .or_else(|| image.attr("data-original"))
            .or_else(|| image.attr("data-srcset"))
            .and_then(|src| normalize::to_absolute(base_url, &src));

        let candidate = Candidate {
            title,
            product_url: Some(absolute),
            image_url,
            ..Candidate::default()
        };
        if validate::is_valid_candidate(&candidate) {
            out.push(candidate);
            if out.len() >= max_items {
                break;
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::ScraperDocument;

    fn base() -> Url {
        Url::parse("https://shop.example.com/").expect("base url")
    }

    #[test]
    fn global_scan_finds_unlabeled_cards() {
        let html = r#"<html><body>
            <nav><a href="/p/nav-trap"><img src="/t.jpg"></a></nav>
            <div id="content">
              <div><a href="/p/plain-widget">Plain Widget</a><img src="/w.jpg"></div>
              <div><span>just text, not a card</span></div>
            </div>
        </body></html>"#;
        let doc = ScraperDocument::parse(html);
        let out = extract_global(&doc, &base(), 50);
        assert!(!out.is_empty());
        assert!(
            out.iter()
                .all(|c| c.product_url.as_deref() != Some("https://shop.example.com/p/nav-trap"))
        );
        assert!(
            out.iter()
                .any(|c| c.title.as_deref() == Some("Plain Widget"))
        );
    }

    #[test]
    fn links_with_images_requires_both() {
        let html = r#"<html><body><div>
            <a href="/p/pictured-widget" title="Pictured Widget"><img src="/img/p.jpg"></a>
            <a href="/p/bare-widget">Bare Widget</a>
            <a href="/faq"><img src="/img/faq.jpg"></a>
        </div></body></html>"#;
        let doc = ScraperDocument::parse(html);
        let out = extract_links_with_images(&doc, &base(), 50);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].title.as_deref(), Some("Pictured Widget"));
        assert_eq!(
            out[0].image_url.as_deref(),
            Some("https://shop.example.com/img/p.jpg")
        );
    }

    #[test]
    fn image_in_immediate_parent_counts() {
        let html = r#"<div><img src="/img/side.jpg"><a href="/p/side-widget">Side Widget</a></div>"#;
        let doc = ScraperDocument::parse(html);
        let out = extract_links_with_images(&doc, &base(), 50);
        assert_eq!(out.len(), 1);
        assert_eq!(
            out[0].image_url.as_deref(),
            Some("https://shop.example.com/img/side.jpg")
        );
    }
}
