//! Product persistence with clamping and idempotent inserts

use log::{debug, warn};
use sqlx::PgPool;

use super::records::ProductRow;
use crate::extract::Candidate;
use crate::extract::card::truncate_chars;

/// Upper bound for `current_price`; larger observed values clamp down.
pub const MAX_PRICE: f64 = 999_999_999.99;
/// Ratings normalize into [0, 100] whatever scale the site used.
pub const MAX_RATING: f64 = 100.0;
const MAX_DESCRIPTION_CHARS: usize = 400;

/// Identity of the page a batch of candidates came from.
#[derive(Debug, Clone, Default)]
pub struct SaveContext {
    pub platform_url: String,
    pub product_type_id: Option<i64>,
    pub searched_product_id: Option<i64>,
}

/// Per-page persistence tally. `saved` includes silent duplicate hits;
/// `failed` only counts rows the database genuinely rejected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SaveOutcome {
    pub saved: usize,
    pub failed: usize,
}

/// Clamp and validate one candidate into an insertable row.
///
/// Returns `None` when the required identity fields (name, URL) are
/// missing — those candidates are dropped, not failed.
pub fn sanitize(candidate: &Candidate, ctx: &SaveContext) -> Option<ProductRow> {
    let product_name = candidate.title.clone().unwrap_or_default();
    let product_url = candidate.product_url.clone().unwrap_or_default();
    if product_name.is_empty() || product_url.is_empty() {
        return None;
    }

    let current_price = candidate.price.and_then(|p| {
        if !p.is_finite() || p < 0.0 {
            None
        } else {
            Some(p.min(MAX_PRICE))
        }
    });

    let rating = candidate.rating.and_then(|r| {
        if !r.is_finite() {
            None
        } else {
            Some((r.clamp(0.0, MAX_RATING) * 100.0).round() / 100.0)
        }
    });

    let reviews = candidate.review_count.filter(|r| *r >= 0);

    Some(ProductRow {
        platform_url: ctx.platform_url.clone(),
        product_name,
        original_price: candidate.raw_price.clone(),
        current_price,
        product_url,
        product_image_url: candidate.image_url.clone(),
        description: candidate
            .description
            .as_deref()
            .map(|d| truncate_chars(d, MAX_DESCRIPTION_CHARS)),
        rating,
        reviews,
        in_stock: candidate.in_stock,
        brand: candidate.brand.clone(),
        product_type_id: ctx.product_type_id,
        searched_product_id: ctx.searched_product_id,
    })
}

#[derive(Clone)]
pub struct ProductStore {
    pool: PgPool,
}

impl ProductStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Persist a page's candidates. Duplicate `product_url` collisions are
    /// silent successes; any other row error is logged and counted as
    /// failed without failing the URL.
    pub async fn save(&self, candidates: &[Candidate], ctx: &SaveContext) -> SaveOutcome {
        let mut outcome = SaveOutcome::default();
        for candidate in candidates {
            let Some(row) = sanitize(candidate, ctx) else {
                debug!("dropping candidate without name or url");
                continue;
            };
            match self.insert(&row).await {
                Ok(()) => outcome.saved += 1,
                Err(err) if is_duplicate_error(&err) => outcome.saved += 1,
                Err(err) => {
                    warn!("failed to save product {}: {err}", row.product_url);
                    outcome.failed += 1;
                }
            }
        }
        outcome
    }

    async fn insert(&self, row: &ProductRow) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO product_data \
               (platform_url, product_name, original_price, current_price, product_url, \
                product_image_url, description, rating, reviews, in_stock, brand, \
                product_type_id, searched_product_id) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13) \
             ON CONFLICT (product_url) DO NOTHING",
        )
        .bind(&row.platform_url)
        .bind(&row.product_name)
        .bind(&row.original_price)
        .bind(row.current_price)
        .bind(&row.product_url)
        .bind(&row.product_image_url)
        .bind(&row.description)
        .bind(row.rating)
        .bind(row.reviews)
        .bind(row.in_stock)
        .bind(&row.brand)
        .bind(row.product_type_id)
        .bind(row.searched_product_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

/// Unique-constraint violations count as "already saved".
fn is_duplicate_error(err: &sqlx::Error) -> bool {
    if let Some(db_err) = err.as_database_error()
        && db_err.is_unique_violation()
    {
        return true;
    }
    let msg = err.to_string().to_lowercase();
    msg.contains("duplicate") || msg.contains("unique")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> SaveContext {
        SaveContext {
            platform_url: "https://shop.example.com/search?q=a".to_string(),
            product_type_id: Some(7),
            searched_product_id: Some(42),
        }
    }

    fn candidate() -> Candidate {
        Candidate {
            title: Some("Widget".to_string()),
            product_url: Some("https://shop.example.com/p/widget".to_string()),
            price: Some(19.99),
            rating: Some(4.567),
            review_count: Some(12),
            ..Candidate::default()
        }
    }

    #[test]
    fn sanitize_carries_context() {
        let row = sanitize(&candidate(), &ctx()).expect("row");
        assert_eq!(row.product_type_id, Some(7));
        assert_eq!(row.searched_product_id, Some(42));
        assert_eq!(row.platform_url, "https://shop.example.com/search?q=a");
    }

    #[test]
    fn sanitize_requires_name_and_url() {
        let mut c = candidate();
        c.title = None;
        assert!(sanitize(&c, &ctx()).is_none());

        let mut c = candidate();
        c.product_url = None;
        assert!(sanitize(&c, &ctx()).is_none());
    }

    #[test]
    fn price_clamps_into_range() {
        let mut c = candidate();
        c.price = Some(1e12);
        assert_eq!(sanitize(&c, &ctx()).expect("row").current_price, Some(MAX_PRICE));

        c.price = Some(-5.0);
        assert_eq!(sanitize(&c, &ctx()).expect("row").current_price, None);

        c.price = Some(f64::NAN);
        assert_eq!(sanitize(&c, &ctx()).expect("row").current_price, None);
    }

    #[test]
    fn rating_clamps_and_rounds() {
        let mut c = candidate();
        c.rating = Some(4.567);
        assert_eq!(sanitize(&c, &ctx()).expect("row").rating, Some(4.57));

        c.rating = Some(250.0);
        assert_eq!(sanitize(&c, &ctx()).expect("row").rating, Some(100.0));

        c.rating = Some(-3.0);
        assert_eq!(sanitize(&c, &ctx()).expect("row").rating, Some(0.0));
    }

    #[test]
    fn negative_reviews_are_dropped() {
        let mut c = candidate();
        c.review_count = Some(-4);
        assert_eq!(sanitize(&c, &ctx()).expect("row").reviews, None);
        c.review_count = Some(0);
        assert_eq!(sanitize(&c, &ctx()).expect("row").reviews, Some(0));
    }

    #[test]
    fn long_descriptions_truncate() {
        let mut c = candidate();
        c.description = Some("d".repeat(1000));
        let row = sanitize(&c, &ctx()).expect("row");
        assert_eq!(row.description.expect("description").chars().count(), 400);
    }
}
