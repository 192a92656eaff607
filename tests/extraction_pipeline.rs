//! End-to-end pipeline scenarios over fixture pages
//!
//! These exercise the full strategy cascade the way a worker does after
//! rendering: parse HTML, extract, validate, dedupe.

use url::Url;

use shopscrape::extract::{ExtractionPipeline, PageOutcome, RenderedPage};
use shopscrape::store::{SaveContext, sanitize};

fn base() -> Url {
    Url::parse("https://shop.example.com/search?q=mouse").expect("base url")
}

fn run(html: &str, body_text: &str) -> PageOutcome {
    ExtractionPipeline::new()
        .extract(&base(), &RenderedPage::new(html, body_text), 50)
        .expect("pipeline should not fail on fixtures")
}

#[test]
fn jsonld_only_page_yields_one_product() {
    let html = r#"<html><head>
        <script type="application/ld+json">
          {"@context":"https://schema.org","@type":"Product","name":"A",
           "url":"/p/a","offers":{"price":"19.99","priceCurrency":"USD"}}
        </script></head><body><div id="app"></div></body></html>"#;

    let outcome = run(html, "");
    assert_eq!(outcome.len(), 1);
    let product = &outcome.candidates()[0];
    assert_eq!(product.title.as_deref(), Some("A"));
    assert_eq!(product.product_url.as_deref(), Some("https://shop.example.com/p/a"));
    assert_eq!(product.price, Some(19.99));
    assert_eq!(product.currency.as_deref(), Some("USD"));

    // And the row is insertable as-is.
    let row = sanitize(
        product,
        &SaveContext {
            platform_url: base().to_string(),
            product_type_id: Some(1),
            searched_product_id: None,
        },
    )
    .expect("sanitized row");
    assert_eq!(row.current_price, Some(19.99));
    assert_eq!(row.product_name, "A");
}

#[test]
fn dom_cards_win_over_jsonld() {
    let html = r#"<html><body>
        <main><ul class="products">
          <li class="product"><a href="/p/one" title="Widget One">Widget One</a>
              <img src="/i/1.jpg"><span class="price">$10.00</span></li>
          <li class="product"><a href="/p/two" title="Widget Two">Widget Two</a>
              <img src="/i/2.jpg"><span class="price">$20.00</span></li>
          <li class="product"><a href="/p/three" title="Widget Three">Widget Three</a>
              <img src="/i/3.jpg"><span class="price">$30.00</span></li>
        </ul></main>
        <script type="application/ld+json">
          {"@type":"Product","name":"JSON Shadow","url":"/p/shadow"}
        </script>
    </body></html>"#;

    let outcome = run(html, "Widget One Widget Two Widget Three");
    assert_eq!(outcome.len(), 3, "DOM strategy should win with all three cards");
    assert!(
        outcome
            .candidates()
            .iter()
            .all(|c| c.title.as_deref() != Some("JSON Shadow")),
        "JSON-LD must not be consulted when the DOM yields cards"
    );
}

#[test]
fn no_results_page_is_success_with_zero_products() {
    let html = r#"<html><body><div class="empty">No results found for "xyzzy"</div></body></html>"#;
    let outcome = run(html, r#"No results found for "xyzzy""#);
    assert_eq!(outcome, PageOutcome::NoResults);
    assert_eq!(outcome.len(), 0);
}

#[test]
fn empty_page_without_marker_is_plain_empty() {
    let outcome = run("<html><body><div id='root'></div></body></html>", "");
    assert_eq!(outcome, PageOutcome::Products(Vec::new()));
}

#[test]
fn duplicate_product_urls_dedupe_to_one() {
    let html = r#"<html><body><main><ul class="products">
        <li class="product"><a href="/p/same" title="Same Widget">Same Widget</a>
            <img src="/i/a.jpg"><span class="price">$10.00</span></li>
        <li class="product"><a href="/p/same">Same Widget</a>
            <img src="/i/b.jpg"><span class="price">$10.00</span></li>
    </ul></main></body></html>"#;

    let outcome = run(html, "Same Widget");
    assert_eq!(outcome.len(), 1);
    assert_eq!(
        outcome.candidates()[0].product_url.as_deref(),
        Some("https://shop.example.com/p/same")
    );
}

#[test]
fn microdata_fallback_when_dom_and_jsonld_are_empty() {
    // IndividualProduct keeps the node off the DOM card selectors (those
    // look for schema.org/Product specifically) so the cascade genuinely
    // reaches the microdata strategy.
    let html = r#"<html><body>
        <span itemscope itemtype="https://schema.org/IndividualProduct">
            <span itemprop="name">Bench Vise</span>
            <link itemprop="url" href="/p/bench-vise">
            <meta itemprop="price" content="45.50">
        </span>
    </body></html>"#;

    let outcome = run(html, "Bench Vise");
    assert_eq!(outcome.len(), 1);
    let product = &outcome.candidates()[0];
    assert_eq!(product.title.as_deref(), Some("Bench Vise"));
    assert_eq!(product.price, Some(45.50));
}

#[test]
fn inline_json_fallback() {
    let html = r#"<html><body><div id="root"></div>
        <script type="application/json">
          {"page":{"products":[
            {"name":"Standing Desk","url":"/p/standing-desk","price":"499.00","currency":"USD"},
            {"name":"Desk Mat","url":"/p/desk-mat","price":"19.00","currency":"USD"}
          ]}}
        </script>
    </body></html>"#;

    let outcome = run(html, "");
    assert_eq!(outcome.len(), 2);
    assert_eq!(outcome.candidates()[0].title.as_deref(), Some("Standing Desk"));
}

#[test]
fn links_with_images_is_the_last_resort() {
    let html = r#"<html><body>
        <header><a href="/login"><img src="/icons/user.png"></a></header>
        <section>
          <a href="/p/garden-hose" title="Garden Hose 25m"><img src="/i/hose.jpg"></a>
          <a href="/terms">Terms</a>
        </section>
    </body></html>"#;

    let outcome = run(html, "Garden Hose 25m Terms");
    assert_eq!(outcome.len(), 1);
    let product = &outcome.candidates()[0];
    assert_eq!(product.title.as_deref(), Some("Garden Hose 25m"));
    assert_eq!(
        product.image_url.as_deref(),
        Some("https://shop.example.com/i/hose.jpg")
    );
    // No price on a bare anchor.
    assert_eq!(product.price, None);
}

#[test]
fn header_cards_never_leak_into_results() {
    let html = r#"<html><body>
        <header><div class="product"><a href="/p/banner" title="Banner Deal">Banner Deal</a>
            <img src="/i/banner.jpg"><span class="price">$1.00</span></div></header>
        <main><ul class="products">
          <li class="product"><a href="/p/real" title="Real Widget">Real Widget</a>
              <img src="/i/real.jpg"><span class="price">$15.00</span></li>
        </ul></main>
    </body></html>"#;

    let outcome = run(html, "Banner Deal Real Widget");
    let urls: Vec<_> = outcome
        .candidates()
        .iter()
        .filter_map(|c| c.product_url.as_deref())
        .collect();
    assert!(urls.contains(&"https://shop.example.com/p/real"));
    assert!(!urls.contains(&"https://shop.example.com/p/banner"));
}

#[test]
fn rerunning_the_same_page_is_deterministic() {
    let html = r#"<html><body><main><ul class="products">
        <li class="product"><a href="/p/repeat" title="Repeat Widget">Repeat Widget</a>
            <img src="/i/r.jpg"><span class="price">€49.00</span></li>
    </ul></main></body></html>"#;

    let first = run(html, "Repeat Widget");
    let second = run(html, "Repeat Widget");
    assert_eq!(first, second);
}
