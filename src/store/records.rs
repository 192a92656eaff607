//! Row types shared by the queue and product stores

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle of one queued URL.
///
/// Workers may only move `pending|retrying → claimed` (via the claim
/// procedure) and `claimed → completed|failed|retrying` (via ack).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessingStatus {
    Pending,
    Claimed,
    Retrying,
    Completed,
    Failed,
}

impl ProcessingStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Claimed => "claimed",
            Self::Retrying => "retrying",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "claimed" => Some(Self::Claimed),
            "retrying" => Some(Self::Retrying),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }

    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl fmt::Display for ProcessingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of the `product_page_urls` queue table.
///
/// `claimed_by`/`claimed_at` are either both set or both null; terminal
/// statuses always clear the claim. Those invariants are maintained by
/// the claim procedure and the ack statements, not by this struct.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UrlRecord {
    pub id: i64,
    pub url: String,
    pub product_type_id: Option<i64>,
    pub searched_product_id: Option<i64>,
    pub processing_status: String,
    pub retry_count: i32,
    pub claimed_by: Option<String>,
    pub claimed_at: Option<DateTime<Utc>>,
    pub processed_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub success: Option<bool>,
    pub products_found: Option<i32>,
    pub products_saved: Option<i32>,
    pub error_message: Option<String>,
}

impl UrlRecord {
    pub fn status(&self) -> Option<ProcessingStatus> {
        ProcessingStatus::parse(&self.processing_status)
    }
}

/// One row of the `product_data` table, already clamped and validated.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductRow {
    pub platform_url: String,
    pub product_name: String,
    pub original_price: Option<String>,
    pub current_price: Option<f64>,
    pub product_url: String,
    pub product_image_url: Option<String>,
    pub description: Option<String>,
    pub rating: Option<f64>,
    pub reviews: Option<i64>,
    pub in_stock: Option<bool>,
    pub brand: Option<String>,
    pub product_type_id: Option<i64>,
    pub searched_product_id: Option<i64>,
}
