//! Environment-surface resolution
//!
//! All environment mutation lives in this single test so parallel test
//! binaries never race on shared process state.

use shopscrape::AppConfig;

#[test]
fn full_environment_resolves() {
    // SAFETY: this is the only test in the binary touching the
    // environment, and it runs single-threaded within itself.
    unsafe {
        std::env::set_var("DB_URL_STATUS_FILTER", "pending, retrying ,FAILED");
        std::env::set_var("DB_URL_LIMIT", "250");
        std::env::set_var("DB_URL_OFFSET", "40");
        std::env::set_var("DB_URL_BATCH_SIZE", "100");
        std::env::set_var("MAX_PARALLEL_WORKERS", "4");
        std::env::set_var("MAX_RETRIES", "2");
        std::env::set_var("URLS_PER_DRIVER_CLEANUP", "7");
        std::env::set_var("FD_THRESHOLD", "1024");
        std::env::set_var("CHILD_PROC_THRESHOLD", "99");
        std::env::set_var("DRY_RUN_SAMPLE", "5");
        std::env::set_var("DRY_RUN_ONLY", "true");
        std::env::set_var(
            "BULK_URLS",
            r#"[{"url":"https://a.example/p/x","product_type_id":3},"https://b.example/p/y"]"#,
        );
    }

    let config = AppConfig::from_env().expect("environment should resolve");

    assert_eq!(config.status_filters, vec!["pending", "retrying", "failed"]);
    assert_eq!(config.url_limit, 250);
    assert_eq!(config.url_offset, 40);
    assert_eq!(config.batch_size, 100);
    assert_eq!(config.max_workers, Some(4));
    assert_eq!(config.max_retries, 2);
    assert_eq!(config.urls_per_session, 7);
    assert_eq!(config.fd_threshold, 1024);
    assert_eq!(config.child_proc_threshold, 99);
    assert_eq!(config.dry_run_sample, Some(5));
    assert!(config.dry_run_only);
    assert_eq!(config.effective_limit(), Some(5));

    let bulk = config.bulk_urls.as_deref().expect("bulk urls parsed");
    assert_eq!(bulk.len(), 2);
    assert_eq!(bulk[0].url, "https://a.example/p/x");
    assert_eq!(bulk[0].product_type_id, Some(3));
    assert_eq!(bulk[1].url, "https://b.example/p/y");
    assert!(config.is_bulk_mode());

    // Bulk entries flow into work items without a queue row id.
    let items: Vec<shopscrape::WorkItem> = bulk.iter().map(shopscrape::WorkItem::from).collect();
    assert!(items.iter().all(|i| i.id.is_none() && i.retry_count == 0));
}

#[test]
fn bulk_file_payload() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("urls.txt");
    std::fs::write(&path, "https://a.example/p/1\nhttps://a.example/p/2,https://a.example/p/3")
        .expect("write payload");

    let parsed = shopscrape::config::parse_bulk_payload(
        &std::fs::read_to_string(&path).expect("read payload"),
    )
    .expect("payload parses");
    assert_eq!(parsed.len(), 3);
}
