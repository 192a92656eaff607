//! Selector families and heuristic keyword tables
//!
//! The extraction strategies are selector-driven: each field has an ordered
//! list and the first selector yielding a non-empty value wins. The lists
//! are deliberately broad — they have to survive arbitrary storefront
//! markup — and ordered from most to least specific.

/// Result-container scopes checked before card discovery. Scoping to the
/// first non-empty family keeps banner/footer links out of the card set.
pub const RESULT_CONTAINERS: &[&str] = &[
    "ul.products",
    "ul.product-list",
    "ul.search-results",
    "div.products",
    "div.product-list",
    "div.search-results",
    r#"div[class*="listing" i]"#,
    r#"div[class*="product-grid" i]"#,
    r#"div[data-component*="product" i]"#,
    r#"div[data-testid*="result" i]"#,
    r#"section[class*="grid" i]"#,
    r#"section[class*="listing" i]"#,
    r#"section[class*="catalog" i]"#,
    r#"div[class*="grid" i]"#,
    r#"section[class*="product" i]"#,
    r#"section[class*="result" i]"#,
    "main",
];

/// Product card candidates, most specific first.
pub const PRODUCT_CARDS: &[&str] = &[
    r#"[data-component="product"]"#,
    r#"[data-qa*="product" i]"#,
    r#"[data-testid*="product" i]"#,
    r#"[data-cy*="product" i]"#,
    r#"[itemscope][itemtype*="schema.org/Product" i]"#,
    "div[data-product-id]",
    "article[data-product-id]",
    "div[data-asin]",
    "li[data-asin]",
    r#"li[data-id*="product" i]"#,
    r#"div[data-testid*="product-card" i]"#,
    r#"li[class*="product" i]"#,
    r#"li[class*="grid" i]"#,
    r#"div[class*="product" i]"#,
    r#"div[class*="item" i]"#,
    r#"div[class*="card" i]"#,
    r#"div[class*="result" i]"#,
    r#"article[class*="product" i]"#,
    r#"article[class*="item" i]"#,
];

pub const TITLE: &[&str] = &[
    r#"[itemprop="name"]"#,
    "a[title]",
    r#"a[class*="title" i]"#,
    r#"a[data-testid*="title" i]"#,
    "h1",
    "h2",
    "h3",
    "h4",
    r#"[class*="title" i]"#,
    r#"[class*="name" i]"#,
    r#"[aria-label*="product" i]"#,
];

pub const LINK: &[&str] = &[
    r#"a[href*="/product" i]"#,
    r#"a[href*="/item" i]"#,
    r#"a[href*="/p/" i]"#,
    r#"a[href*="?pid=" i]"#,
    r#"a[data-testid*="product" i]"#,
    r#"a[data-track*="product" i]"#,
    "a[href]",
    r#"[itemprop="url"]"#,
];

pub const IMAGE: &[&str] = &[
    "img[src]",
    "img[data-src]",
    "img[data-original]",
    "img[data-lazy-src]",
    "img[data-srcset]",
    "source[data-srcset]",
    "[data-background-image]",
    r#"[itemprop="image"]"#,
];

pub const PRICE: &[&str] = &[
    r#"[itemprop="price"]"#,
    r#"[class*="price" i]"#,
    r#"[class*="offer" i]"#,
    "[data-price]",
    "span[data-price]",
    "div[data-price]",
    r#"span[class*="amount" i]"#,
    r#"span[class*="value" i]"#,
    r#"meta[itemprop="price"][content]"#,
];

pub const CURRENCY: &[&str] = &[
    r#"meta[itemprop="priceCurrency"][content]"#,
    r#"[class*="currency" i]"#,
    "span[data-currency]",
];

pub const RATING: &[&str] = &[
    r#"[itemprop="ratingValue"]"#,
    r#"[class*="rating" i]"#,
    r#"[aria-label*="rating" i]"#,
];

pub const REVIEWS: &[&str] = &[
    r#"[itemprop="reviewCount"]"#,
    r#"[class*="review" i]"#,
    r#"[aria-label*="review" i]"#,
];

pub const AVAILABILITY: &[&str] = &[
    r#"[itemprop="availability"]"#,
    r#"[class*="stock" i]"#,
    r#"[class*="avail" i]"#,
];

pub const BRAND: &[&str] = &[r#"[itemprop="brand"]"#, r#"[class*="brand" i]"#, "[data-brand]"];

pub const SKU: &[&str] = &[
    r#"[itemprop="sku"]"#,
    "[data-sku]",
    "[data-product-sku]",
    r#"[class*="sku" i]"#,
];

pub const DESCRIPTION: &[&str] = &[
    r#"[itemprop="description"]"#,
    r#"[class*="description" i]"#,
    r#"[class*="subtitle" i]"#,
    "p",
];

/// "Load more" controls clicked between progressive scrolls.
pub const LOAD_MORE: &[&str] = &[
    r#"button[class*="load" i]"#,
    r#"button[id*="load" i]"#,
    r#"button[data-test*="load" i]"#,
    r#"button[data-testid*="load" i]"#,
    r#"button[aria-label*="load" i]"#,
    r#"button[class*="more" i]"#,
    r#"a[class*="load" i]"#,
    r#"div[class*="load-more" i]"#,
    r#"[data-action*="loadMore" i]"#,
];

/// Overlay dismissal targets; at most two elements are clicked per family.
pub const POPUP_CLOSE: &[&str] = &[
    r#"button[aria-label*="close" i]"#,
    r#"button[class*="close" i]"#,
    r#"button[class*="dismiss" i]"#,
    r#"[role="dialog"] button"#,
    ".close-button",
    ".modal-close",
    ".overlay-close",
    r#"[data-testid*="close" i]"#,
    r#"[data-action*="close" i]"#,
    r#"[aria-label*="dismiss" i]"#,
];

/// Phrases that mark a legitimately empty result page.
pub const NO_RESULTS_PHRASES: &[&str] = &[
    "no results",
    "no results found",
    "no result found",
    "0 results",
    "0 result",
    "no product",
    "nothing found",
    "did not find anything",
    "did not find anythings",
    "we did not find",
    "we did not find anything",
    "we did not find anythings",
    "try another search",
    "try a different search",
];

/// Substrings that disqualify an href outright.
pub const LINK_BLACKLIST_KEYWORDS: &[&str] = &[
    "login",
    "register",
    "signup",
    "account",
    "profile",
    "help",
    "faq",
    "contact",
    "privacy",
    "terms",
    "policy",
    "cart",
    "wishlist",
    "checkout",
    "track",
    "order",
    "facebook",
    "instagram",
    "whatsapp",
    "twitter",
    "youtube",
    "pinterest",
    "linkedin",
    "support",
    "mailto:",
    "tel:",
    "javascript:",
    "gift-card",
    "loyalty",
];

/// Path/query fragments that mark an href as product-like.
pub const PRODUCT_PATH_KEYWORDS: &[&str] = &[
    "/product",
    "/products",
    "/item",
    "/items",
    "/p/",
    "/dp/",
    "/pd/",
    "/pdp",
    "/shop/",
    "/store/",
    "/catalog",
    "/listing",
    "/sku",
    "/detail",
    "/details",
    "/gp/",
    "/gp/product",
    "/listing/",
    "/prod",
    "/itm",
    "/itm/",
    "collection",
    "collections",
    "category",
    "categories",
    "productId",
    "sku=",
    "pid=",
    "variant=",
    "model=",
    "/buy/",
    "/sale/",
];

/// Negative path keywords that veto the "looks deep enough" fallbacks.
pub const NEGATIVE_PATH_KEYWORDS: &[&str] = &[
    "search", "account", "contact", "login", "register", "wishlist", "cart", "help", "support",
    "faq", "privacy", "terms",
];

/// Titles consisting of navigation chrome rather than product names.
pub const NAV_WORDS: &[&str] = &[
    "home",
    "about",
    "contact",
    "help",
    "account",
    "login",
    "register",
    "signup",
    "wishlist",
    "cart",
    "track",
    "order",
    "policy",
    "privacy",
    "terms",
    "faq",
    "support",
    "customer care",
    "service",
    "blog",
    "news",
    "store locator",
];

/// Ancestor tags whose subtrees never contain result cards.
pub const BLACKLISTED_SECTIONS: &[&str] = &["header", "nav", "footer", "aside", "form"];

/// How far up the tree the blacklisted-section check walks.
pub const SECTION_SCAN_HOPS: usize = 6;
