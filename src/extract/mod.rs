//! Layered extraction pipeline
//!
//! Public entry point for turning one rendered listing page into validated
//! product candidates. Strategies run in a fixed order and the first one
//! that yields a non-empty, post-validation result wins — results from
//! different strategies are never merged:
//!
//! 1. scoped DOM (result containers → card selectors → permissive guess)
//! 2. JSON-LD
//! 3. microdata
//! 4. inline JSON scripts
//! 5. global heuristic scan
//! 6. links with images
//!
//! After the winning strategy, candidates are deduplicated by product URL
//! and truncated to `max_items`.

pub mod candidate;
pub mod card;
pub mod heuristics;
pub mod inline_json;
pub mod jsonld;
pub mod microdata;
pub mod selectors;

use anyhow::Result;
use log::{debug, warn};
use url::Url;

pub use candidate::{Candidate, dedupe_by_url};

use crate::dom::{DomDocument, DomNode, ScraperDocument};
use crate::validate;
use selectors::{BLACKLISTED_SECTIONS, SECTION_SCAN_HOPS};

/// A page as handed back by the browser session: final DOM serialization
/// plus the visible text used by the "no results" detector.
#[derive(Debug, Clone)]
pub struct RenderedPage {
    pub html: String,
    pub body_text: String,
}

impl RenderedPage {
    pub fn new(html: impl Into<String>, body_text: impl Into<String>) -> Self {
        Self {
            html: html.into(),
            body_text: body_text.into(),
        }
    }
}

/// Why a strategy gave up on part or all of its input.
///
/// `Skip` drops one card/blob and keeps scanning; `Stop` abandons the
/// strategy so the cascade advances; `Fatal` fails the whole URL.
#[derive(Debug)]
pub enum StrategyError {
    Skip,
    Stop,
    Fatal(anyhow::Error),
}

/// Outcome of extracting one page.
#[derive(Debug, Clone, PartialEq)]
pub enum PageOutcome {
    /// Validated, deduplicated candidates (possibly empty).
    Products(Vec<Candidate>),
    /// Every strategy came up empty and the page says so itself.
    NoResults,
}

impl PageOutcome {
    pub fn candidates(&self) -> &[Candidate] {
        match self {
            Self::Products(items) => items,
            Self::NoResults => &[],
        }
    }

    pub fn len(&self) -> usize {
        self.candidates().len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates().is_empty()
    }
}

/// Strategy cascade over a rendered page.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExtractionPipeline;

impl ExtractionPipeline {
    pub fn new() -> Self {
        Self
    }

    /// Run the cascade against the rendered HTML.
    ///
    /// # Errors
    /// Only a strategy's `Fatal` escalation fails the page; empty pages
    /// are a success with zero candidates.
    pub fn extract(
        &self,
        base_url: &Url,
        page: &RenderedPage,
        max_items: usize,
    ) -> Result<PageOutcome> {
        let doc = ScraperDocument::parse(&page.html);
        self.extract_from_document(&doc, base_url, &page.body_text, max_items)
    }

    /// Backend-agnostic variant used by tests and embedders that already
    /// hold a parsed document.
    pub fn extract_from_document(
        &self,
        doc: &dyn DomDocument,
        base_url: &Url,
        body_text: &str,
        max_items: usize,
    ) -> Result<PageOutcome> {
        let strategies: &[(&str, StrategyFn)] = &[
            ("scoped-dom", extract_scoped_dom),
            ("json-ld", strategy_jsonld),
            ("microdata", strategy_microdata),
            ("inline-json", strategy_inline_json),
            ("global-heuristic", strategy_global),
            ("links-with-images", strategy_links_with_images),
        ];

        let mut found = Vec::new();
        for (name, strategy) in strategies {
            match strategy(doc, base_url, max_items) {
                Ok(candidates) if !candidates.is_empty() => {
                    debug!("strategy {name} produced {} candidates", candidates.len());
                    found = candidates;
                    break;
                }
                Ok(_) => {}
                Err(StrategyError::Skip | StrategyError::Stop) => {
                    debug!("strategy {name} stopped without results");
                }
                Err(StrategyError::Fatal(err)) => {
                    warn!("strategy {name} failed fatally: {err:#}");
                    return Err(err);
                }
            }
        }

        if found.is_empty() && validate::page_indicates_no_results(body_text) {
            return Ok(PageOutcome::NoResults);
        }

        let mut deduped = dedupe_by_url(found);
        deduped.truncate(max_items);
        Ok(PageOutcome::Products(deduped))
    }
}

type StrategyFn = fn(&dyn DomDocument, &Url, usize) -> Result<Vec<Candidate>, StrategyError>;

fn strategy_jsonld(
    doc: &dyn DomDocument,
    base_url: &Url,
    max_items: usize,
) -> Result<Vec<Candidate>, StrategyError> {
    Ok(jsonld::extract(doc, base_url, max_items))
}

fn strategy_microdata(
    doc: &dyn DomDocument,
    base_url: &Url,
    max_items: usize,
) -> Result<Vec<Candidate>, StrategyError> {
    Ok(microdata::extract(doc, base_url, max_items))
}

fn strategy_inline_json(
    doc: &dyn DomDocument,
    base_url: &Url,
    max_items: usize,
) -> Result<Vec<Candidate>, StrategyError> {
    Ok(inline_json::extract(doc, base_url, max_items))
}

fn strategy_global(
    doc: &dyn DomDocument,
    base_url: &Url,
    max_items: usize,
) -> Result<Vec<Candidate>, StrategyError> {
    Ok(heuristics::extract_global(doc, base_url, max_items))
}

fn strategy_links_with_images(
    doc: &dyn DomDocument,
    base_url: &Url,
    max_items: usize,
) -> Result<Vec<Candidate>, StrategyError> {
    Ok(heuristics::extract_links_with_images(doc, base_url, max_items))
}

/// Strategy 1: cards inside the first non-empty result-container family,
/// falling back to document-wide card selectors, then to a permissive
/// "anything with a link and an image or price" guess.
fn extract_scoped_dom(
    doc: &dyn DomDocument,
    base_url: &Url,
    max_items: usize,
) -> Result<Vec<Candidate>, StrategyError> {
    let containers = first_nonempty_set(doc, selectors::RESULT_CONTAINERS);
    let mut cards: Vec<Box<dyn DomNode + '_>> = Vec::new();
    if containers.is_empty() {
        cards = first_nonempty_set(doc, selectors::PRODUCT_CARDS);
    } else {
        for container in &containers {
            for sel in selectors::PRODUCT_CARDS {
                cards.extend(container.select(sel));
            }
        }
    }

    if cards.is_empty() {
        cards = doc
            .select("li, div, article")
            .into_iter()
            .filter(|el| card::looks_like_product_card(el.as_ref()))
            .collect();
    }

    let mut out = Vec::new();
    for card_el in cards {
        if card_el.within_ancestor(BLACKLISTED_SECTIONS, SECTION_SCAN_HOPS) {
            continue;
        }
        let candidate = card::extract_card_fields(card_el.as_ref(), base_url);
        if validate::is_valid_candidate(&candidate) {
            out.push(candidate);
            if out.len() >= max_items {
                break;
            }
        }
    }
    Ok(out)
}

/// First selector in the family that matches anything at all.
fn first_nonempty_set<'a>(
    doc: &'a dyn DomDocument,
    family: &[&str],
) -> Vec<Box<dyn DomNode + 'a>> {
    for sel in family {
        let matched = doc.select(sel);
        if !matched.is_empty() {
            return matched;
        }
    }
    Vec::new()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://shop.example.com/search?q=widget").expect("base url")
    }

    fn page(html: &str, body_text: &str) -> RenderedPage {
        RenderedPage::new(html, body_text)
    }

    const DOM_CARDS: &str = r#"<html><body><main>
        <ul class="products">
          <li class="product"><a href="/p/alpha" title="Alpha Widget">Alpha Widget</a>
              <img src="/i/a.jpg"><span class="price">$10.00</span></li>
          <li class="product"><a href="/p/beta" title="Beta Widget">Beta Widget</a>
              <img src="/i/b.jpg"><span class="price">$20.00</span></li>
        </ul></main></body></html>"#;

    #[test]
    fn scoped_dom_wins_over_jsonld() {
        let html = format!(
            r#"{}<script type="application/ld+json">
                {{"@type":"Product","name":"Shadow Product","url":"/p/shadow"}}
            </script>"#,
            DOM_CARDS
        );
        let outcome = ExtractionPipeline::new()
            .extract(&base(), &page(&html, "Alpha Widget Beta Widget"), 50)
            .expect("pipeline should not fail");
        let products = outcome.candidates();
        assert_eq!(products.len(), 2);
        assert!(products.iter().all(|p| p.title.as_deref() != Some("Shadow Product")));
    }

    #[test]
    fn jsonld_used_when_dom_is_empty() {
        let html = r#"<html><body><p>nothing card-like here</p>
            <script type="application/ld+json">
              {"@type":"Product","name":"Ghost Widget","url":"/p/ghost",
               "offers":{"price":"19.99","priceCurrency":"USD"}}
            </script></body></html>"#;
        let outcome = ExtractionPipeline::new()
            .extract(&base(), &page(html, "nothing card-like here"), 50)
            .expect("pipeline should not fail");
        assert_eq!(outcome.len(), 1);
        assert_eq!(outcome.candidates()[0].title.as_deref(), Some("Ghost Widget"));
        assert_eq!(outcome.candidates()[0].price, Some(19.99));
    }

    #[test]
    fn no_results_page_reports_no_results() {
        let html = "<html><body><p>No results found for 'xqzzt'</p></body></html>";
        let outcome = ExtractionPipeline::new()
            .extract(&base(), &page(html, "No results found for 'xqzzt'"), 50)
            .expect("pipeline should not fail");
        assert_eq!(outcome, PageOutcome::NoResults);
    }

    #[test]
    fn empty_without_marker_is_plain_empty() {
        let html = "<html><body><p>loading…</p></body></html>";
        let outcome = ExtractionPipeline::new()
            .extract(&base(), &page(html, "loading…"), 50)
            .expect("pipeline should not fail");
        assert_eq!(outcome, PageOutcome::Products(Vec::new()));
    }

    #[test]
    fn duplicate_urls_collapse() {
        let html = r#"<html><body><main><ul class="products">
            <li class="product"><a href="/p/same" title="Same Widget">Same Widget</a>
                <img src="/i/1.jpg"><span class="price">$10.00</span></li>
            <li class="product"><a href="/p/same">Same Widget</a>
                <img src="/i/2.jpg"><span class="price">$10.00</span></li>
        </ul></main></body></html>"#;
        let outcome = ExtractionPipeline::new()
            .extract(&base(), &page(html, "Same Widget"), 50)
            .expect("pipeline should not fail");
        assert_eq!(outcome.len(), 1);
    }

    #[test]
    fn max_items_truncates() {
        let outcome = ExtractionPipeline::new()
            .extract(&base(), &page(DOM_CARDS, ""), 1)
            .expect("pipeline should not fail");
        assert_eq!(outcome.len(), 1);
    }
}
