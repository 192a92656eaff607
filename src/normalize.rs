//! Field normalization for extracted product data
//!
//! Price/currency parsing, numeric coercion, text cleanup, URL
//! absolutization and availability inference. Every strategy in the
//! extraction pipeline funnels raw DOM values through this module so the
//! persisted rows carry one consistent shape.

use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

/// Matches a currency marker followed by a numeric run, anywhere in text.
///
/// Used as the last-resort price scan over a card's full text when none of
/// the price selectors produced a value.
static PRICE_IN_TEXT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)((?:₹|rs\.?|rs\s|inr\s|usd\s|eur\s|cad\s|aud\s|£|€|\$)\s*[\d,.]+)")
        .expect("price regex is valid")
});

static NUMERIC_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\d,.]+").expect("numeric run regex is valid"));

static DIGIT_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").expect("digit regex is valid"));

static FLOAT_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\d.]+").expect("float regex is valid"));

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("ws regex is valid"));

/// Collapse runs of whitespace and trim; empty results become `None`.
pub fn clean_text(raw: &str) -> Option<String> {
    let cleaned = WHITESPACE.replace_all(raw, " ").trim().to_string();
    if cleaned.is_empty() { None } else { Some(cleaned) }
}

/// `clean_text` lifted over an optional input.
pub fn clean_opt(raw: Option<&str>) -> Option<String> {
    raw.and_then(clean_text)
}

/// Parse a raw price string into `(amount, currency)`.
///
/// Currency detection is keyword/symbol based and checked in a fixed
/// order; the numeric amount is the first contiguous `[\d,.]` run with
/// thousands separators stripped. Either half may be absent.
pub fn parse_price(raw: Option<&str>) -> (Option<f64>, Option<&'static str>) {
    let Some(raw) = raw else {
        return (None, None);
    };
    let txt = raw.trim();
    if txt.is_empty() {
        return (None, None);
    }
    let currency = detect_currency(txt);

    let Some(m) = NUMERIC_RUN.find(txt) else {
        return (None, currency);
    };
    let num = m.as_str().replace(',', "");
    (num.parse::<f64>().ok(), currency)
}

/// Detect a currency code from symbols and keywords in a price string.
pub fn detect_currency(txt: &str) -> Option<&'static str> {
    let lowered = txt.to_lowercase();
    if lowered.contains('₹') || lowered.contains("rs") || lowered.contains("inr") {
        Some("INR")
    } else if txt.contains('$') || lowered.contains("usd") {
        Some("USD")
    } else if txt.contains('€') || lowered.contains("eur") {
        Some("EUR")
    } else if txt.contains('£') || lowered.contains("gbp") {
        Some("GBP")
    } else if lowered.contains("cad") {
        Some("CAD")
    } else if lowered.contains("aud") {
        Some("AUD")
    } else {
        None
    }
}

/// Render an amount with a currency marker that `parse_price` reads back.
pub fn format_price(amount: f64, currency: &str) -> String {
    match currency {
        "INR" => format!("₹{amount:.2}"),
        "USD" => format!("${amount:.2}"),
        "EUR" => format!("€{amount:.2}"),
        "GBP" => format!("£{amount:.2}"),
        other => format!("{other} {amount:.2}"),
    }
}

/// Scan free text for the first price-looking token (marker + number).
pub fn extract_price_from_text(text: &str) -> Option<String> {
    PRICE_IN_TEXT
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
}

/// First float-looking run in the input (`"4.5 out of 5"` → `4.5`).
pub fn parse_float(raw: Option<&str>) -> Option<f64> {
    let raw = raw?;
    FLOAT_RUN.find(raw).and_then(|m| m.as_str().parse().ok())
}

/// Ratings use the same lenient float scan as any other numeric field.
pub fn parse_rating(raw: Option<&str>) -> Option<f64> {
    parse_float(raw)
}

/// First digit run in the input (`"1,204 reviews"` → `1`), per the
/// review-count convention of treating separators as terminators.
pub fn parse_int(raw: Option<&str>) -> Option<i64> {
    let raw = raw?;
    DIGIT_RUN.find(raw).and_then(|m| m.as_str().parse().ok())
}

/// Tri-state stock inference from availability text.
///
/// Recognizes both human copy ("in stock") and schema.org URLs
/// ("https://schema.org/InStock"). Unknown phrasing stays `None`.
pub fn infer_in_stock(availability: Option<&str>) -> Option<bool> {
    let t = availability?.to_lowercase();
    if ["in stock", "instock", "available", "availabilityinstock"]
        .iter()
        .any(|k| t.contains(k))
    {
        return Some(true);
    }
    if ["out of stock", "outofstock", "unavailable"]
        .iter()
        .any(|k| t.contains(k))
    {
        return Some(false);
    }
    None
}

/// Resolve `href` against `base`, tolerating already-absolute inputs.
/// Unresolvable relative references fall back to the raw string so a
/// downstream validator can reject them instead of silently dropping data.
pub fn to_absolute(base: &Url, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }
    match base.join(href) {
        Ok(joined) => Some(joined.to_string()),
        Err(_) => Some(href.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_text_collapses_whitespace() {
        assert_eq!(clean_text("  Apple\n iPhone \t 15 "), Some("Apple iPhone 15".to_string()));
        assert_eq!(clean_text("   \n\t "), None);
    }

    #[test]
    fn parse_price_symbol_currencies() {
        assert_eq!(parse_price(Some("₹1,299.00")), (Some(1299.0), Some("INR")));
        assert_eq!(parse_price(Some("$19.99")), (Some(19.99), Some("USD")));
        assert_eq!(parse_price(Some("€7,50")), (Some(750.0), Some("EUR")));
        assert_eq!(parse_price(Some("£12.00")), (Some(12.0), Some("GBP")));
    }

    #[test]
    fn parse_price_keyword_currencies() {
        assert_eq!(parse_price(Some("CAD 42.10")), (Some(42.10), Some("CAD")));
        assert_eq!(parse_price(Some("aud 9")), (Some(9.0), Some("AUD")));
        assert_eq!(parse_price(Some("Rs. 450")), (Some(450.0), Some("INR")));
    }

    #[test]
    fn parse_price_without_currency_or_number() {
        assert_eq!(parse_price(Some("1234.56")), (Some(1234.56), None));
        assert_eq!(parse_price(Some("call for price")), (None, None));
        assert_eq!(parse_price(None), (None, None));
    }

    #[test]
    fn price_from_text_finds_embedded_token() {
        let text = "Wireless Mouse Special offer $24.99 was $34.99 free shipping";
        assert_eq!(extract_price_from_text(text), Some("$24.99".to_string()));
        assert_eq!(extract_price_from_text("no price here"), None);
    }

    #[test]
    fn numeric_coercions() {
        assert_eq!(parse_float(Some("4.5 out of 5 stars")), Some(4.5));
        assert_eq!(parse_int(Some("218 reviews")), Some(218));
        assert_eq!(parse_int(Some("no reviews")), None);
        assert_eq!(parse_rating(Some("Rated 3.8")), Some(3.8));
    }

    #[test]
    fn stock_inference_is_tri_state() {
        assert_eq!(infer_in_stock(Some("In Stock")), Some(true));
        assert_eq!(infer_in_stock(Some("https://schema.org/InStock")), Some(true));
        assert_eq!(infer_in_stock(Some("Out of stock")), Some(false));
        assert_eq!(infer_in_stock(Some("ships in 3 weeks")), None);
        assert_eq!(infer_in_stock(None), None);
    }

    #[test]
    fn absolutization_joins_relative_hrefs() {
        let base = Url::parse("https://shop.example.com/search?q=mouse").expect("base url");
        assert_eq!(
            to_absolute(&base, "/p/wireless-mouse"),
            Some("https://shop.example.com/p/wireless-mouse".to_string())
        );
        assert_eq!(
            to_absolute(&base, "https://cdn.example.com/img.jpg"),
            Some("https://cdn.example.com/img.jpg".to_string())
        );
        assert_eq!(to_absolute(&base, "   "), None);
    }
}
