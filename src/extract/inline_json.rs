//! Inline JSON extraction strategy
//!
//! Many storefronts ship their listing state as `application/json` (or
//! mislabeled `text/plain`) script blobs. This strategy walks those blobs
//! recursively, mapping any object that carries product-shaped keys.

use serde_json::Value;
use url::Url;

use super::candidate::Candidate;
use super::card::truncate_chars;
use super::jsonld::parse_script_blobs;
use crate::dom::{DomDocument, DomNode};
use crate::normalize;
use crate::validate;

/// Script bodies above this size are skipped outright; giant state blobs
/// are dominated by non-product data and are quadratic to salvage.
pub const MAX_BLOB_CHARS: usize = 500_000;

/// Recursion ceiling for the generic walk. Tunable heuristic, not an
/// invariant.
pub const MAX_WALK_DEPTH: usize = 6;

/// Keys whose subtrees are walked regardless of depth position.
const PRODUCT_KEY_HINTS: &[&str] =
    &["product", "item", "sku", "listing", "result", "entries", "records"];

/// Sibling subtrees at or below this depth are explored even when their
/// key does not look product-related.
pub const SHALLOW_SIBLING_DEPTH: usize = 1;

const SCRIPT_SELECTOR: &str = r#"script[type="application/json"], script[type="text/json"], script[type="text/plain"]"#;

pub fn extract(doc: &dyn DomDocument, base_url: &Url, max_items: usize) -> Vec<Candidate> {
    let mut out = Vec::new();
    for script in doc.select(SCRIPT_SELECTOR) {
        let raw = script.text();
        if raw.is_empty() || raw.chars().count() > MAX_BLOB_CHARS {
            continue;
        }
        for blob in parse_script_blobs(&raw) {
            walk(&blob, base_url, &mut out, max_items, 0);
            if out.len() >= max_items {
                return out;
            }
        }
    }
    out
}

fn walk(data: &Value, base_url: &Url, out: &mut Vec<Candidate>, max_items: usize, depth: usize) {
    if out.len() >= max_items || depth > MAX_WALK_DEPTH {
        return;
    }
    match data {
        Value::Array(items) => {
            for item in items {
                walk(item, base_url, out, max_items, depth + 1);
                if out.len() >= max_items {
                    break;
                }
            }
        }
        Value::Object(map) => {
            if let Some(candidate) = map_object(map, base_url)
                && validate::is_valid_candidate(&candidate)
            {
                out.push(candidate);
                if out.len() >= max_items {
                    return;
                }
            }
            for (key, value) in map {
                if !matches!(value, Value::Array(_) | Value::Object(_)) {
                    continue;
                }
                let key_lower = key.to_lowercase();
                if PRODUCT_KEY_HINTS.iter().any(|hint| key_lower.contains(hint)) {
                    walk(value, base_url, out, max_items, depth + 1);
                } else if depth <= SHALLOW_SIBLING_DEPTH {
                    walk(value, base_url, out, max_items, depth + 1);
                }
            }
        }
        _ => {}
    }
}

/// First present key from an alias list; single-element lists unwrap.
fn first_of<'a>(map: &'a serde_json::Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    for key in keys {
        match map.get(*key) {
            None | Some(Value::Null) => continue,
            Some(Value::String(s)) if s.is_empty() => continue,
            Some(Value::Array(items)) => return items.first(),
            Some(value) => return Some(value),
        }
    }
    None
}

fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Nested-shape tolerance: `{price: {value: 9.99}}`, `{url: {href: ..}}`.
fn unwrap_keyed(value: &Value, keys: &[&str]) -> Option<String> {
    match value {
        Value::Object(map) => keys.iter().find_map(|k| map.get(*k).and_then(as_text)),
        other => as_text(other),
    }
}

fn map_object(map: &serde_json::Map<String, Value>, base_url: &Url) -> Option<Candidate> {
    let title = first_of(map, &["name", "title", "productName", "product_name", "label"])
        .and_then(as_text);
    let url = first_of(map, &["url", "link", "productUrl", "productURL", "href", "canonicalUrl"])
        .and_then(|v| unwrap_keyed(v, &["url", "href"]));
    let image = first_of(
        map,
        &["image", "imageUrl", "imageURL", "thumbnail", "thumbnailUrl", "mediaUrl", "picture"],
    )
    .and_then(|v| unwrap_keyed(v, &["url", "src"]));
    let raw_price = first_of(
        map,
        &["price", "salePrice", "offerPrice", "priceValue", "price_amount", "priceWithTax"],
    )
    .and_then(|v| unwrap_keyed(v, &["value", "amount", "price"]));
    let currency = first_of(map, &["currency", "currencyCode", "priceCurrency"]).and_then(as_text);
    let brand = first_of(map, &["brand", "manufacturer", "maker"]).and_then(as_text);
    let sku = first_of(map, &["sku", "id", "productId", "product_id", "itemId"]).and_then(as_text);
    let description =
        first_of(map, &["description", "shortDescription", "summary"]).and_then(as_text);
    let rating = first_of(map, &["rating", "ratingValue", "averageRating", "reviewRating"])
        .and_then(as_text);
    let review_count = first_of(
        map,
        &["reviewCount", "reviewsCount", "numberOfReviews", "ratingCount"],
    )
    .and_then(as_text);
    let availability =
        first_of(map, &["availability", "stockStatus", "availabilityStatus"]).and_then(as_text);

    let (price, detected_currency) = normalize::parse_price(raw_price.as_deref());
    let currency = normalize::clean_opt(currency.as_deref())
        .or_else(|| detected_currency.map(String::from));

    let candidate = Candidate {
        title: normalize::clean_opt(title.as_deref()),
        product_url: url
            .as_deref()
            .and_then(|u| normalize::to_absolute(base_url, u)),
        image_url: image
            .as_deref()
            .and_then(|i| normalize::to_absolute(base_url, i)),
        price,
        currency,
        raw_price,
        rating: normalize::parse_float(rating.as_deref()),
        review_count: normalize::parse_int(review_count.as_deref()),
        in_stock: normalize::infer_in_stock(availability.as_deref()),
        brand: normalize::clean_opt(brand.as_deref()),
        sku: normalize::clean_opt(sku.as_deref()),
        description: normalize::clean_opt(description.as_deref())
            .map(|d| truncate_chars(&d, 400)),
    };

    if candidate.title.is_none() && candidate.product_url.is_none() {
        return None;
    }
    Some(candidate)
}
