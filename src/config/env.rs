//! Environment surface
//!
//! The operator interface is environment variables, documented in the
//! README. `BULK_URLS` accepts several shapes — a JSON array, a JSON
//! object with a `urls` key, a single JSON string, or a plain
//! newline/comma separated list — with entries that are either bare URL
//! strings or `{url, ...}` objects.

use serde_json::Value;
use thiserror::Error;
use tracing::warn;

use super::types::{AppConfig, BulkUrl, DEFAULT_STATUS_FILTERS};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    BulkFile {
        path: String,
        source: std::io::Error,
    },
    #[error("BULK_URLS payload contained no usable urls")]
    EmptyBulkPayload,
}

impl AppConfig {
    /// Resolve the full configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self {
            database_url: env_string("DATABASE_URL"),
            ..Self::default()
        };

        if let Some(filters) = env_string("DB_URL_STATUS_FILTER") {
            let parsed = parse_status_filters(&filters);
            if !parsed.is_empty() {
                config.status_filters = parsed;
            }
        }

        config.url_limit = env_usize("DB_URL_LIMIT").unwrap_or(config.url_limit);
        config.url_offset = env_usize("DB_URL_OFFSET").unwrap_or(config.url_offset);
        config.batch_size = env_usize("DB_URL_BATCH_SIZE")
            .filter(|n| *n > 0)
            .unwrap_or(config.batch_size);
        config.max_workers = env_usize("MAX_PARALLEL_WORKERS").filter(|n| *n > 0);
        config.max_retries = env_u32("MAX_RETRIES").unwrap_or(config.max_retries);
        config.urls_per_session =
            env_u32("URLS_PER_DRIVER_CLEANUP").unwrap_or(config.urls_per_session);
        config.fd_threshold = env_usize("FD_THRESHOLD").unwrap_or(config.fd_threshold);
        config.child_proc_threshold =
            env_usize("CHILD_PROC_THRESHOLD").unwrap_or(config.child_proc_threshold);
        config.dry_run_sample = env_usize("DRY_RUN_SAMPLE").filter(|n| *n > 0);
        config.dry_run_only = env_flag("DRY_RUN_ONLY");
        config.max_items_per_page =
            env_usize("MAX_ITEMS_PER_PAGE").filter(|n| *n > 0).unwrap_or(config.max_items_per_page);
        config.page_wait_seconds =
            env_u64("PAGE_WAIT_SECONDS").unwrap_or(config.page_wait_seconds);

        if let Some(inline) = env_string("BULK_URLS") {
            config.bulk_urls = Some(parse_bulk_payload(&inline)?);
        } else if let Some(path) = env_string("BULK_URLS_FILE") {
            let content = std::fs::read_to_string(&path).map_err(|source| {
                ConfigError::BulkFile {
                    path: path.clone(),
                    source,
                }
            })?;
            config.bulk_urls = Some(parse_bulk_payload(&content)?);
        }

        Ok(config)
    }
}

/// Comma-separated status list, normalized to lowercase. Unknown statuses
/// are kept — the claim procedure is the authority on what they mean —
/// but logged.
pub fn parse_status_filters(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .inspect(|s| {
            if !DEFAULT_STATUS_FILTERS.contains(&s.as_str())
                && !matches!(s.as_str(), "claimed" | "completed" | "failed")
            {
                warn!("unrecognized status filter '{s}'");
            }
        })
        .collect()
}

/// Parse any accepted `BULK_URLS` shape into a list of entries.
pub fn parse_bulk_payload(raw: &str) -> Result<Vec<BulkUrl>, ConfigError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::EmptyBulkPayload);
    }

    let mut urls = Vec::new();
    match serde_json::from_str::<Value>(trimmed) {
        Ok(Value::Array(items)) => {
            for item in &items {
                collect_bulk_entry(item, &mut urls);
            }
        }
        Ok(Value::Object(map)) => {
            if let Some(Value::Array(items)) = map.get("urls") {
                for item in items {
                    collect_bulk_entry(item, &mut urls);
                }
            } else {
                collect_bulk_entry(&Value::Object(map), &mut urls);
            }
        }
        Ok(Value::String(single)) => {
            push_plain_list(&single, &mut urls);
        }
        Ok(_) => {}
        Err(_) => push_plain_list(trimmed, &mut urls),
    }

    if urls.is_empty() {
        return Err(ConfigError::EmptyBulkPayload);
    }
    Ok(urls)
}

fn collect_bulk_entry(value: &Value, out: &mut Vec<BulkUrl>) {
    match value {
        Value::String(url) => {
            let url = url.trim();
            if !url.is_empty() {
                out.push(BulkUrl::bare(url));
            }
        }
        Value::Object(_) => {
            match serde_json::from_value::<BulkUrl>(value.clone()) {
                Ok(entry) if !entry.url.trim().is_empty() => out.push(entry),
                Ok(_) => {}
                Err(e) => warn!("skipping malformed bulk url entry: {e}"),
            }
        }
        other => warn!("skipping non-url bulk entry: {other}"),
    }
}

/// Newline- or comma-separated plain list.
fn push_plain_list(raw: &str, out: &mut Vec<BulkUrl>) {
    for token in raw.split(['\n', ',']) {
        let token = token.trim();
        if !token.is_empty() {
            out.push(BulkUrl::bare(token));
        }
    }
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn env_usize(key: &str) -> Option<usize> {
    parse_env_number(key)
}

fn env_u32(key: &str) -> Option<u32> {
    parse_env_number(key)
}

fn env_u64(key: &str) -> Option<u64> {
    parse_env_number(key)
}

fn parse_env_number<T: std::str::FromStr>(key: &str) -> Option<T> {
    let raw = env_string(key)?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!("ignoring unparseable {key}={raw}");
            None
        }
    }
}

fn env_flag(key: &str) -> bool {
    env_string(key)
        .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_array_of_strings() {
        let urls = parse_bulk_payload(r#"["https://a.example/x", "https://b.example/y"]"#)
            .expect("payload");
        assert_eq!(urls.len(), 2);
        assert_eq!(urls[0].url, "https://a.example/x");
    }

    #[test]
    fn json_array_of_objects() {
        let urls = parse_bulk_payload(
            r#"[{"url":"https://a.example/x","product_type_id":3},
                {"url":"https://b.example/y","searched_product_id":9}]"#,
        )
        .expect("payload");
        assert_eq!(urls.len(), 2);
        assert_eq!(urls[0].product_type_id, Some(3));
        assert_eq!(urls[1].searched_product_id, Some(9));
    }

    #[test]
    fn json_object_with_urls_key() {
        let urls = parse_bulk_payload(r#"{"urls":["https://a.example/x","https://b.example/y"]}"#)
            .expect("payload");
        assert_eq!(urls.len(), 2);
    }

    #[test]
    fn single_json_string() {
        let urls = parse_bulk_payload(r#""https://a.example/x""#).expect("payload");
        assert_eq!(urls.len(), 1);
        assert_eq!(urls[0].url, "https://a.example/x");
    }

    #[test]
    fn plain_newline_and_comma_lists() {
        let urls = parse_bulk_payload("https://a.example/x\nhttps://b.example/y,https://c.example/z")
            .expect("payload");
        assert_eq!(urls.len(), 3);
        assert_eq!(urls[2].url, "https://c.example/z");
    }

    #[test]
    fn single_object_payload() {
        let urls = parse_bulk_payload(r#"{"url":"https://a.example/x"}"#).expect("payload");
        assert_eq!(urls.len(), 1);
    }

    #[test]
    fn mixed_entries_skip_garbage() {
        let urls = parse_bulk_payload(r#"["https://a.example/x", 42, {"url":"https://b.example/y"}]"#)
            .expect("payload");
        assert_eq!(urls.len(), 2);
    }

    #[test]
    fn empty_payload_is_an_error() {
        assert!(parse_bulk_payload("   ").is_err());
        assert!(parse_bulk_payload("[]").is_err());
    }

    #[test]
    fn status_filters_normalize() {
        assert_eq!(
            parse_status_filters(" Pending , RETRYING ,"),
            vec!["pending".to_string(), "retrying".to_string()]
        );
    }
}
