//! Candidate and page validation policy
//!
//! Decides whether an extracted card is a real product listing: href
//! blacklists, product-path heuristics, navigation-title rejection and the
//! "no results" page detector. Rejections here are silent — a dropped
//! candidate never fails the URL.

use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

use crate::extract::candidate::Candidate;
use crate::extract::selectors::{
    LINK_BLACKLIST_KEYWORDS, NAV_WORDS, NEGATIVE_PATH_KEYWORDS, NO_RESULTS_PHRASES,
    PRODUCT_PATH_KEYWORDS,
};

static LONG_DIGIT_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b\+?\d{8,}\b").expect("phone regex is valid"));

/// Accept or reject a candidate against the listing-page policy.
///
/// A candidate passes iff its URL is present, not blacklisted, and
/// product-like (a price plus title can stand in for a product-like
/// path), and it carries enough identity: a plausible title — not
/// navigation chrome, at least two chars — or a price alongside whatever
/// title there is.
pub fn is_valid_candidate(candidate: &Candidate) -> bool {
    let Some(url) = candidate.product_url.as_deref() else {
        return false;
    };
    if is_blacklisted_link(url) {
        return false;
    }

    let title = candidate.title.as_deref().and_then(crate::normalize::clean_text);
    let has_price = candidate.price.is_some_and(|p| p != 0.0);
    let priced_with_title = has_price && title.is_some();

    if !is_product_like_path(url) && !priced_with_title {
        return false;
    }

    let title_ok = title
        .as_deref()
        .is_some_and(|t| !looks_like_phone_or_nav(t) && t.chars().count() >= 2);
    title_ok || priced_with_title
}

/// True for schemes and keywords that never lead to a product page.
pub fn is_blacklisted_link(href: &str) -> bool {
    if href.is_empty() {
        return true;
    }
    let h = href.to_lowercase();
    if ["javascript:", "mailto:", "tel:"].iter().any(|p| h.starts_with(p)) {
        return true;
    }
    LINK_BLACKLIST_KEYWORDS.iter().any(|k| h.contains(k))
}

/// Heuristic: does this href plausibly point at a product detail page?
///
/// Positive signals: a known product-path keyword, an `.html`/`.htm`
/// suffix, at least two path segments of real length, or a long hyphenated
/// slug. Landing pages and known utility paths are rejected.
pub fn is_product_like_path(href: &str) -> bool {
    let Ok(parsed) = Url::parse(href) else {
        return false;
    };
    let path = parsed.path().to_lowercase();
    let query = parsed.query().unwrap_or("").to_lowercase();
    let fragment = parsed.fragment().unwrap_or("").to_lowercase();

    if matches!(path.as_str(), "" | "/" | "/home" | "/index" | "/index.html") {
        return false;
    }

    let combined = format!("{path}?{query}#{fragment}");
    if PRODUCT_PATH_KEYWORDS
        .iter()
        .any(|k| combined.contains(&k.to_lowercase()))
    {
        return true;
    }
    if NEGATIVE_PATH_KEYWORDS.iter().any(|k| combined.contains(k)) {
        return false;
    }

    if path.ends_with(".html") || path.ends_with(".htm") {
        return true;
    }
    if path.matches('/').count() >= 2 && path.len() > 3 {
        return true;
    }
    if path.contains('-') && path.replace('-', "").len() > 6 {
        return true;
    }
    false
}

/// Combined href gate for the links-with-images fallback strategy.
pub fn is_potential_product_href(href: &str) -> bool {
    !is_blacklisted_link(href) && is_product_like_path(href)
}

/// Titles that are really navigation chrome or phone numbers.
pub fn looks_like_phone_or_nav(text: &str) -> bool {
    if text.is_empty() {
        return false;
    }
    let t = text.to_lowercase();
    if LONG_DIGIT_RUN.is_match(&t) {
        return true;
    }
    NAV_WORDS.iter().any(|w| t.contains(w))
}

/// Does the rendered page text say the search legitimately matched nothing?
pub fn page_indicates_no_results(body_text: &str) -> bool {
    let lowered = body_text.to_lowercase();
    NO_RESULTS_PHRASES.iter().any(|p| lowered.contains(p))
}
