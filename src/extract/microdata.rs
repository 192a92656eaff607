//! Microdata (itemscope/itemprop) extraction strategy

use url::Url;

use super::candidate::Candidate;
use super::card::truncate_chars;
use super::selectors::{BLACKLISTED_SECTIONS, SECTION_SCAN_HOPS};
use crate::dom::{DomDocument, DomNode};
use crate::normalize;
use crate::validate;

pub fn extract(doc: &dyn DomDocument, base_url: &Url, max_items: usize) -> Vec<Candidate> {
    let mut out = Vec::new();
    for node in doc.select(r#"[itemscope][itemtype*="Product" i]"#) {
        if node.within_ancestor(BLACKLISTED_SECTIONS, SECTION_SCAN_HOPS) {
            continue;
        }
        let candidate = extract_node(node.as_ref(), base_url);
        if validate::is_valid_candidate(&candidate) {
            out.push(candidate);
            if out.len() >= max_items {
                break;
            }
        }
    }
    out
}

/// Collect `[itemprop]` values under one product scope.
///
/// Value precedence per property node is `content | href | src | text`;
/// the first value seen for a key wins.
fn extract_node(node: &dyn DomNode, base_url: &Url) -> Candidate {
    let mut title = None;
    let mut product_url = node
        .attr("itemid")
        .and_then(|id| normalize::to_absolute(base_url, &id));
    let mut image_url = None;
    let mut raw_price = None;
    let mut currency = None;
    let mut availability = None;
    let mut description = None;
    let mut brand = None;
    let mut sku = None;
    let mut rating = None;
    let mut review_count = None;

    for prop in node.select("[itemprop]") {
        let Some(key) = prop.attr("itemprop") else {
            continue;
        };
        let key = key.to_lowercase();
        let mut value = prop
            .attr("content")
            .or_else(|| prop.attr("href"))
            .or_else(|| prop.attr("src"))
            .unwrap_or_else(|| prop.text());
        value = normalize::clean_text(&value).unwrap_or_default();

        // brand is often a nested scope whose useful text sits on an inner
        // [itemprop=name] node
        if key == "brand" && value.chars().count() <= 2 {
            if let Some(nested) = prop.first(r#"[itemprop="name"]"#) {
                let nested_value = nested.attr("content").unwrap_or_else(|| nested.text());
                if let Some(cleaned) = normalize::clean_text(&nested_value) {
                    value = cleaned;
                }
            }
        }
        if value.is_empty() {
            continue;
        }

        match key.as_str() {
            "name" if title.is_none() => title = Some(value),
            "url" | "link" if product_url.is_none() => {
                product_url = normalize::to_absolute(base_url, &value);
            }
            "image" if image_url.is_none() => {
                image_url = normalize::to_absolute(base_url, &value);
            }
            "price" if raw_price.is_none() => raw_price = Some(value),
            "pricecurrency" | "currency" if currency.is_none() => currency = Some(value),
            "availability" if availability.is_none() => availability = Some(value),
            "description" if description.is_none() => {
                description = Some(truncate_chars(&value, 400));
            }
            "brand" if brand.is_none() => brand = Some(value),
            "sku" if sku.is_none() => sku = Some(value),
            "ratingvalue" if rating.is_none() => rating = Some(value),
            "reviewcount" | "ratingcount" if review_count.is_none() => {
                review_count = Some(value);
            }
            _ => {}
        }
    }

    let (price, detected_currency) = normalize::parse_price(raw_price.as_deref());
    let currency = currency.or_else(|| detected_currency.map(String::from));

    Candidate {
        title,
        product_url,
        image_url,
        price,
        currency,
        raw_price,
        rating: normalize::parse_float(rating.as_deref()),
        review_count: normalize::parse_int(review_count.as_deref()),
        in_stock: normalize::infer_in_stock(availability.as_deref()),
        brand,
        sku,
        description,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::ScraperDocument;

    fn base() -> Url {
        Url::parse("https://shop.example.com/").expect("base url")
    }

    #[test]
    fn product_scope_with_meta_values() {
        let html = r#"<div itemscope itemtype="https://schema.org/Product">
            <span itemprop="name">Laser Mouse 2</span>
            <a itemprop="url" href="/p/laser-mouse-2">view</a>
            <img itemprop="image" src="/img/lm2.jpg">
            <meta itemprop="price" content="34.95">
            <meta itemprop="priceCurrency" content="USD">
            <link itemprop="availability" href="https://schema.org/OutOfStock">
            <span itemprop="ratingValue">4.7</span>
            <span itemprop="reviewCount">210</span>
            <span itemprop="sku">LM2-BLK</span>
        </div>"#;
        let doc = ScraperDocument::parse(html);
        let out = extract(&doc, &base(), 50);
        assert_eq!(out.len(), 1);
        let p = &out[0];
        assert_eq!(p.title.as_deref(), Some("Laser Mouse 2"));
        assert_eq!(p.product_url.as_deref(), Some("https://shop.example.com/p/laser-mouse-2"));
        assert_eq!(p.price, Some(34.95));
        assert_eq!(p.currency.as_deref(), Some("USD"));
        assert_eq!(p.in_stock, Some(false));
        assert_eq!(p.rating, Some(4.7));
        assert_eq!(p.review_count, Some(210));
        assert_eq!(p.sku.as_deref(), Some("LM2-BLK"));
    }

    #[test]
    fn nested_brand_scope() {
        let html = r#"<div itemscope itemtype="https://schema.org/Product">
            <span itemprop="name">Trail Shoe</span>
            <a itemprop="url" href="/p/trail-shoe">view</a>
            <div itemprop="brand" itemscope itemtype="https://schema.org/Brand">
              <span itemprop="name">Peakline</span>
            </div>
        </div>"#;
        let doc = ScraperDocument::parse(html);
        let out = extract(&doc, &base(), 50);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].brand.as_deref(), Some("Peakline"));
    }

    #[test]
    fn skips_scopes_inside_blacklisted_sections() {
        let html = r#"<footer><div itemscope itemtype="https://schema.org/Product">
            <span itemprop="name">Footer Product</span>
            <a itemprop="url" href="/p/footer-product">view</a>
        </div></footer>"#;
        let doc = ScraperDocument::parse(html);
        assert!(extract(&doc, &base(), 50).is_empty());
    }
}
