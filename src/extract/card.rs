//! Per-card field extraction shared by the DOM-driven strategies

use url::Url;

use super::candidate::Candidate;
use super::selectors;
use crate::dom::DomNode;
use crate::normalize;

/// Quick structural test: does this element look like one product card?
///
/// A card needs an anchor plus either an image or price-looking text.
pub fn looks_like_product_card(node: &dyn DomNode) -> bool {
    if node.first("a[href]").is_none() {
        return false;
    }
    if node
        .first("img[src], img[data-src], img[data-original]")
        .is_some()
    {
        return true;
    }
    let text = node.text().to_lowercase();
    ["$", "₹", "rs.", "rs ", "usd", "eur", "price"]
        .iter()
        .any(|token| text.contains(token))
}

/// First selector whose element yields a non-empty text-ish value
/// (`content` attr, `aria-label`, then text content).
fn find_text(node: &dyn DomNode, selector_list: &[&str]) -> Option<String> {
    for sel in selector_list {
        if let Some(el) = node.first(sel) {
            let value = el
                .attr("content")
                .or_else(|| el.attr("aria-label"))
                .unwrap_or_else(|| el.text());
            if let Some(cleaned) = normalize::clean_text(&value) {
                return Some(cleaned);
            }
        }
    }
    None
}

/// First selector whose element carries the named attribute.
fn find_attr(node: &dyn DomNode, selector_list: &[&str], attr: &str) -> Option<String> {
    for sel in selector_list {
        if let Some(el) = node.first(sel)
            && let Some(value) = el.attr(attr)
            && !value.is_empty()
        {
            return Some(value);
        }
    }
    None
}

/// Extract every field from one card subtree.
///
/// Title precedence: anchor `title` attribute, anchor text, image `alt`,
/// then the title selector family. Price falls back to scanning the card's
/// full text for a currency token when no price selector matches.
pub fn extract_card_fields(card: &dyn DomNode, base_url: &Url) -> Candidate {
    let mut title = None;
    if let Some(anchor) = card.first("a[href]") {
        title = anchor
            .attr("title")
            .and_then(|t| normalize::clean_text(&t))
            .or_else(|| normalize::clean_text(&anchor.text()));
    }
    if title.is_none()
        && let Some(img) = card.first("img")
    {
        title = img.attr("alt").and_then(|alt| normalize::clean_text(&alt));
    }
    if title.is_none() {
        title = find_text(card, selectors::TITLE);
    }

    let mut link_href = None;
    for sel in selectors::LINK {
        if let Some(el) = card.first(sel) {
            let href = el.attr("href").or_else(|| el.attr("content"));
            if let Some(href) = href
                && !href.is_empty()
            {
                link_href = Some(href);
                break;
            }
        }
    }

    let mut image_src = None;
    for sel in selectors::IMAGE {
        if let Some(el) = card.first(sel) {
            image_src = el
                .attr("src")
                .or_else(|| el.attr("data-src"))
                .or_else(|| el.attr("data-original"))
                .or_else(|| el.attr("data-srcset"))
                .or_else(|| el.attr("content"));
            if image_src.is_some() {
                break;
            }
        }
    }

    let mut raw_price = None;
    for sel in selectors::PRICE {
        if let Some(el) = card.first(sel) {
            let value = el.attr("content").unwrap_or_else(|| el.text());
            if let Some(cleaned) = normalize::clean_text(&value) {
                raw_price = Some(cleaned);
                break;
            }
        }
    }
    if raw_price.is_none() {
        raw_price = normalize::extract_price_from_text(&card.text());
    }

    let mut currency = None;
    for sel in selectors::CURRENCY {
        if let Some(el) = card.first(sel) {
            let value = el.attr("content").unwrap_or_else(|| el.text());
            if let Some(cleaned) = normalize::clean_text(&value) {
                currency = Some(cleaned);
                break;
            }
        }
    }

    let (price, detected_currency) = normalize::parse_price(raw_price.as_deref());
    if currency.is_none() {
        currency = detected_currency.map(String::from);
    }

    let rating = normalize::parse_rating(find_text(card, selectors::RATING).as_deref());
    let review_count = normalize::parse_int(find_text(card, selectors::REVIEWS).as_deref());
    let in_stock =
        normalize::infer_in_stock(find_text(card, selectors::AVAILABILITY).as_deref());

    let brand = find_text(card, selectors::BRAND)
        .or_else(|| find_attr(card, selectors::BRAND, "data-brand"));

    let sku = find_text(card, selectors::SKU)
        .or_else(|| find_attr(card, selectors::SKU, "data-sku"))
        .or_else(|| find_attr(card, selectors::SKU, "data-product-sku"));

    let mut description = None;
    for sel in selectors::DESCRIPTION {
        if let Some(el) = card.first(sel) {
            let value = el.attr("content").unwrap_or_else(|| el.text());
            if let Some(cleaned) = normalize::clean_text(&value)
                && cleaned.chars().count() > 15
            {
                description = Some(truncate_chars(&cleaned, 400));
                break;
            }
        }
    }

    Candidate {
        title,
        product_url: link_href
            .as_deref()
            .and_then(|href| normalize::to_absolute(base_url, href)),
        image_url: image_src
            .as_deref()
            .and_then(|src| normalize::to_absolute(base_url, src)),
        price,
        currency,
        raw_price,
        rating,
        review_count,
        in_stock,
        brand,
        sku,
        description,
    }
}

/// Truncate at a char boundary; descriptions and error messages share this.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
