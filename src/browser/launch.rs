//! Chromium discovery and low-footprint launch configuration

use anyhow::{Context, Result};
use chromiumoxide::browser::{Browser, BrowserConfigBuilder, HeadlessMode};
use futures::StreamExt;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;
use tokio::task::{self, JoinHandle};
use tracing::{error, info, trace, warn};

/// Desktop user agent presented by every session.
pub const DESKTOP_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Navigation request timeout; matches the per-page load budget.
pub const NAVIGATION_TIMEOUT: Duration = Duration::from_secs(30);

/// Find a Chrome/Chromium executable: `CHROMIUM_PATH` first, then
/// well-known install paths, then `which`.
pub fn find_browser_executable() -> Result<PathBuf> {
    if let Ok(path) = std::env::var("CHROMIUM_PATH") {
        let path = PathBuf::from(path);
        if path.exists() {
            info!("using browser from CHROMIUM_PATH: {}", path.display());
            return Ok(path);
        }
        warn!("CHROMIUM_PATH points to a non-existent file: {}", path.display());
    }

    let paths: &[&str] = if cfg!(target_os = "macos") {
        &[
            "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
            "/Applications/Chromium.app/Contents/MacOS/Chromium",
            "/opt/homebrew/bin/chromium",
        ]
    } else {
        &[
            "/usr/bin/google-chrome",
            "/usr/bin/google-chrome-stable",
            "/usr/bin/chromium",
            "/usr/bin/chromium-browser",
            "/snap/bin/chromium",
            "/usr/local/bin/chromium",
            "/opt/google/chrome/chrome",
        ]
    };
    for path_str in paths {
        let path = PathBuf::from(path_str);
        if path.exists() {
            info!("found browser at {}", path.display());
            return Ok(path);
        }
    }

    for cmd in ["chromium", "chromium-browser", "google-chrome", "chrome"] {
        if let Ok(output) = Command::new("which").arg(cmd).output()
            && output.status.success()
        {
            let found = String::from_utf8_lossy(&output.stdout).trim().to_string();
            if !found.is_empty() {
                info!("found browser via which: {found}");
                return Ok(PathBuf::from(found));
            }
        }
    }

    Err(anyhow::anyhow!(
        "no Chrome/Chromium executable found; set CHROMIUM_PATH"
    ))
}

/// Launch one headless browser over the given profile directory.
///
/// The configuration keeps per-instance resource fan-out low: single
/// renderer process, no zygote, images disabled, zero disk/media cache,
/// capped JS heap, fixed 1920x1080 viewport. Returns the browser plus the
/// CDP handler task driving its websocket.
pub async fn launch_browser(profile_dir: &Path) -> Result<(Browser, JoinHandle<()>)> {
    let chrome_path = find_browser_executable()?;

    let config = BrowserConfigBuilder::default()
        .request_timeout(NAVIGATION_TIMEOUT)
        .window_size(1920, 1080)
        .user_data_dir(profile_dir)
        .chrome_executable(chrome_path)
        .headless_mode(HeadlessMode::default())
        .arg(format!("--user-agent={DESKTOP_USER_AGENT}"))
        .arg("--no-sandbox")
        .arg("--disable-dev-shm-usage")
        .arg("--disable-gpu")
        .arg("--disable-software-rasterizer")
        .arg("--disable-extensions")
        .arg("--disable-logging")
        .arg("--disable-notifications")
        .arg("--disable-default-apps")
        .arg("--disable-blink-features=AutomationControlled")
        .arg("--blink-settings=imagesEnabled=false")
        // Keep Chromium's process fan-out and memory in check; browser
        // count is the host's scarce resource here.
        .arg("--no-zygote")
        .arg("--renderer-process-limit=1")
        .arg("--js-flags=--max-old-space-size=128")
        .arg("--no-first-run")
        .arg("--no-default-browser-check")
        .arg("--disk-cache-size=0")
        .arg("--media-cache-size=0")
        .arg("--disable-setuid-sandbox")
        .arg("--disable-background-timer-throttling")
        .arg("--disable-backgrounding-occluded-windows")
        .arg("--disable-renderer-backgrounding")
        .arg("--disable-features=TranslateUI")
        .arg("--disable-ipc-flooding-protection")
        .arg("--hide-scrollbars")
        .arg("--mute-audio")
        .build()
        .map_err(|e| anyhow::anyhow!("failed to build browser config: {e}"))?;

    let (browser, mut handler) = Browser::launch(config)
        .await
        .context("failed to launch browser")?;

    let handler_task = task::spawn(async move {
        while let Some(event) = handler.next().await {
            if let Err(e) = event {
                let msg = e.to_string();
                // Chrome emits CDP events chromiumoxide can't deserialize;
                // those are noise, not failures.
                let benign = msg.contains("data did not match any variant of untagged enum Message")
                    || msg.contains("Failed to deserialize WS response");
                if benign {
                    trace!("suppressed benign CDP serialization error: {msg}");
                } else {
                    error!("browser handler error: {e:?}");
                }
            }
        }
        trace!("browser handler task finished");
    });

    Ok((browser, handler_task))
}
