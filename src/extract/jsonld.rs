//! JSON-LD (schema.org) extraction strategy
//!
//! Walks every `<script type="application/ld+json">` block, recursing
//! through `Product`, `ListItem`, `itemListElement` and `mainEntity`
//! shapes. Malformed blocks are salvaged by scanning for embedded JSON
//! fragments before being skipped.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use url::Url;

use super::candidate::Candidate;
use super::card::truncate_chars;
use crate::dom::{DomDocument, DomNode};
use crate::normalize;
use crate::validate;

/// Fragment salvage for script bodies that are not a single JSON document.
static JSON_FRAGMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)(\{.*?\}|\[.*?\])").expect("fragment regex is valid"));

/// Parse a script body into zero or more JSON values.
///
/// Whole-body parse first; on failure, every brace/bracket fragment is
/// tried independently so one broken blob doesn't hide its neighbors.
pub fn parse_script_blobs(content: &str) -> Vec<Value> {
    if let Ok(value) = serde_json::from_str::<Value>(content) {
        return vec![value];
    }
    JSON_FRAGMENT
        .find_iter(content)
        .filter_map(|m| serde_json::from_str::<Value>(m.as_str()).ok())
        .collect()
}

pub fn extract(doc: &dyn DomDocument, base_url: &Url, max_items: usize) -> Vec<Candidate> {
    let mut out = Vec::new();
    for script in doc.select(r#"script[type="application/ld+json"]"#) {
        for blob in parse_script_blobs(&script.text()) {
            collect(&blob, base_url, &mut out, max_items);
            if out.len() >= max_items {
                return out;
            }
        }
    }
    out
}

fn collect(data: &Value, base_url: &Url, out: &mut Vec<Candidate>, max_items: usize) {
    if out.len() >= max_items {
        return;
    }
    match data {
        Value::Array(items) => {
            for item in items {
                collect(item, base_url, out, max_items);
            }
        }
        Value::Object(map) => {
            let type_field = map.get("@type").or_else(|| map.get("type"));
            let is_product = match type_field {
                Some(Value::String(t)) => {
                    let lowered = t.to_lowercase();
                    lowered == "product" || lowered == "listitem" || t.contains("Product")
                }
                Some(Value::Array(types)) => types
                    .iter()
                    .filter_map(Value::as_str)
                    .any(|t| t.to_lowercase() == "product" || t.contains("Product")),
                _ => false,
            };
            if is_product
                && let Some(candidate) = map_product(map, base_url)
                && validate::is_valid_candidate(&candidate)
            {
                out.push(candidate);
            }
            if let Some(list) = map.get("itemListElement") {
                collect(list, base_url, out, max_items);
            }
            if let Some(entity) = map.get("mainEntity") {
                collect(entity, base_url, out, max_items);
            }
        }
        _ => {}
    }
}

/// String view of a JSON value, numbers included.
fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn nested(map: &serde_json::Map<String, Value>, outer: &str, key: &str) -> Option<String> {
    map.get(outer)?.as_object()?.get(key).and_then(as_text)
}

fn map_product(map: &serde_json::Map<String, Value>, base_url: &Url) -> Option<Candidate> {
    let name = map
        .get("name")
        .and_then(as_text)
        .or_else(|| nested(map, "item", "name"));
    let url = map
        .get("url")
        .and_then(as_text)
        .or_else(|| nested(map, "item", "url"));

    let image = match map.get("image") {
        Some(Value::Array(items)) => items.first().and_then(as_text),
        Some(other) => as_text(other),
        None => None,
    };

    // offers may be a single object or a list; first offer wins.
    let offers = match map.get("offers") {
        Some(Value::Array(items)) => items.first().and_then(Value::as_object),
        Some(Value::Object(o)) => Some(o),
        _ => None,
    };
    let raw_price = offers.and_then(|o| o.get("price")).and_then(as_text);
    let mut currency = offers
        .and_then(|o| o.get("priceCurrency"))
        .and_then(as_text);
    let availability = offers.and_then(|o| o.get("availability")).and_then(as_text);

    let agg = map.get("aggregateRating").and_then(Value::as_object);
    let rating = agg.and_then(|a| a.get("ratingValue")).and_then(as_text);
    let review_count = agg.and_then(|a| a.get("reviewCount")).and_then(as_text);

    let brand = match map.get("brand") {
        Some(Value::Object(b)) => b.get("name").or_else(|| b.get("brand")).and_then(as_text),
        Some(Value::Array(items)) => match items.first() {
            Some(Value::Object(b)) => b.get("name").or_else(|| b.get("brand")).and_then(as_text),
            Some(other) => as_text(other),
            None => None,
        },
        Some(other) => as_text(other),
        None => None,
    };

    let sku = map
        .get("sku")
        .and_then(as_text)
        .or_else(|| nested(map, "item", "sku"));
    let description = map
        .get("description")
        .and_then(as_text)
        .or_else(|| nested(map, "item", "description"));

    let (price, detected_currency) = normalize::parse_price(raw_price.as_deref());
    if currency.is_none() {
        currency = detected_currency.map(String::from);
    }

    Some(Candidate {
        title: normalize::clean_opt(name.as_deref()),
        product_url: url
            .as_deref()
            .and_then(|u| normalize::to_absolute(base_url, u)),
        image_url: image
            .as_deref()
            .and_then(|i| normalize::to_absolute(base_url, i)),
        price,
        currency: normalize::clean_opt(currency.as_deref()),
        raw_price,
        rating: normalize::parse_float(rating.as_deref()),
        review_count: normalize::parse_int(review_count.as_deref()),
        in_stock: normalize::infer_in_stock(availability.as_deref()),
        brand: normalize::clean_opt(brand.as_deref()),
        sku: normalize::clean_opt(sku.as_deref()),
        description: normalize::clean_opt(description.as_deref())
            .map(|d| truncate_chars(&d, 400)),
    })
}
