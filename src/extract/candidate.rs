//! In-memory extraction candidates and URL-keyed deduplication

use std::collections::HashMap;

use serde::Serialize;

/// One product card as produced by a strategy, before persistence.
///
/// Everything is optional except that the validator requires a
/// `product_url` plus enough identity to be worth keeping.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Candidate {
    pub title: Option<String>,
    pub product_url: Option<String>,
    pub image_url: Option<String>,
    pub price: Option<f64>,
    pub currency: Option<String>,
    pub raw_price: Option<String>,
    pub rating: Option<f64>,
    pub review_count: Option<i64>,
    pub in_stock: Option<bool>,
    pub brand: Option<String>,
    pub sku: Option<String>,
    pub description: Option<String>,
}

impl Candidate {
    /// Fill this candidate's missing fields from a later duplicate.
    fn merge_missing_from(&mut self, other: &Candidate) {
        fn fill<T: Clone>(dst: &mut Option<T>, src: &Option<T>) {
            if dst.is_none() && src.is_some() {
                *dst = src.clone();
            }
        }
        fill(&mut self.title, &other.title);
        fill(&mut self.image_url, &other.image_url);
        fill(&mut self.price, &other.price);
        fill(&mut self.currency, &other.currency);
        fill(&mut self.raw_price, &other.raw_price);
        fill(&mut self.rating, &other.rating);
        fill(&mut self.review_count, &other.review_count);
        fill(&mut self.in_stock, &other.in_stock);
        fill(&mut self.brand, &other.brand);
        fill(&mut self.sku, &other.sku);
        fill(&mut self.description, &other.description);
    }
}

/// Deduplicate by `product_url`, preserving first-seen order.
///
/// The first occurrence wins its position; later occurrences only
/// contribute fields the first one was missing. Candidates without a URL
/// are dropped.
pub fn dedupe_by_url(candidates: Vec<Candidate>) -> Vec<Candidate> {
    let mut order: Vec<String> = Vec::new();
    let mut merged: HashMap<String, Candidate> = HashMap::new();

    for candidate in candidates {
        let Some(url) = candidate.product_url.clone() else {
            continue;
        };
        match merged.get_mut(&url) {
            Some(existing) => existing.merge_missing_from(&candidate),
            None => {
                order.push(url.clone());
                merged.insert(url, candidate);
            }
        }
    }

    order
        .into_iter()
        .filter_map(|url| merged.remove(&url))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_url(url: &str) -> Candidate {
        Candidate {
            product_url: Some(url.to_string()),
            ..Candidate::default()
        }
    }

    #[test]
    fn dedupe_preserves_first_seen_order() {
        let a = with_url("https://x.com/p/a");
        let b = with_url("https://x.com/p/b");
        let a_again = with_url("https://x.com/p/a");
        let out = dedupe_by_url(vec![a, b, a_again]);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].product_url.as_deref(), Some("https://x.com/p/a"));
        assert_eq!(out[1].product_url.as_deref(), Some("https://x.com/p/b"));
    }

    #[test]
    fn dedupe_merges_missing_fields_only() {
        let first = Candidate {
            title: Some("Widget".to_string()),
            price: None,
            ..with_url("https://x.com/p/a")
        };
        let second = Candidate {
            title: Some("Widget Deluxe".to_string()),
            price: Some(9.99),
            currency: Some("USD".to_string()),
            ..with_url("https://x.com/p/a")
        };
        let out = dedupe_by_url(vec![first, second]);
        assert_eq!(out.len(), 1);
        // First occurrence keeps its title, gains the missing price.
        assert_eq!(out[0].title.as_deref(), Some("Widget"));
        assert_eq!(out[0].price, Some(9.99));
        assert_eq!(out[0].currency.as_deref(), Some("USD"));
    }

    #[test]
    fn dedupe_drops_urlless_candidates() {
        let out = dedupe_by_url(vec![Candidate::default(), with_url("https://x.com/p/a")]);
        assert_eq!(out.len(), 1);
    }
}
