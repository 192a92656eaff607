//! Ephemeral Chrome profile directory management
//!
//! Every browser session gets a UUID-named user-data directory under the
//! system temp dir, deleted on recycle. Stale-lock detection lets startup
//! sweep away directories orphaned by crashed runs without touching
//! profiles a live Chromium still owns.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use uuid::Uuid;

const PROFILE_PREFIX: &str = "shopscrape_profile_";

/// RAII wrapper for a profile directory.
///
/// The directory is removed on drop unless ownership is transferred with
/// `into_path()` (the session handle then owns cleanup).
#[derive(Debug)]
pub struct SessionProfile {
    path: PathBuf,
    cleanup_on_drop: bool,
}

impl SessionProfile {
    fn new(path: PathBuf) -> Self {
        Self {
            path,
            cleanup_on_drop: true,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Consume and return the path, disabling auto-cleanup.
    pub fn into_path(mut self) -> PathBuf {
        self.cleanup_on_drop = false;
        std::mem::take(&mut self.path)
    }
}

impl Drop for SessionProfile {
    fn drop(&mut self) {
        if self.cleanup_on_drop && self.path.exists() {
            debug!("removing session profile {}", self.path.display());
            if let Err(e) = std::fs::remove_dir_all(&self.path) {
                warn!("failed to remove profile {}: {e}", self.path.display());
            }
        }
    }
}

/// Create a fresh UUID-named profile directory.
///
/// `create_dir` (not `create_dir_all`) so a UUID collision fails instead
/// of silently sharing a directory.
pub fn create_unique_profile() -> Result<SessionProfile> {
    let path = std::env::temp_dir().join(format!("{PROFILE_PREFIX}{}", Uuid::new_v4()));
    std::fs::create_dir(&path)
        .with_context(|| format!("failed to create profile directory {}", path.display()))?;
    debug!("created session profile {}", path.display());
    Ok(SessionProfile::new(path))
}

/// Best-effort removal of a profile directory that outlived its session.
pub fn remove_profile_dir(path: &Path) {
    if !path.exists() {
        return;
    }
    if let Err(e) = std::fs::remove_dir_all(path) {
        warn!("failed to remove profile {}: {e}", path.display());
    }
}

/// Chrome's SingletonLock is a symlink targeting `{hostname}-{pid}`; the
/// lock is stale when that pid no longer exists.
#[cfg(unix)]
pub fn is_singleton_lock_stale(profile_dir: &Path) -> bool {
    let lock_path = profile_dir.join("SingletonLock");
    if !lock_path.exists() && !lock_path.is_symlink() {
        return true;
    }
    match std::fs::read_link(&lock_path) {
        Ok(target) => {
            let target = target.to_string_lossy().into_owned();
            if let Some(pid_str) = target.rsplit('-').next()
                && let Ok(pid) = pid_str.parse::<i32>()
            {
                let exists = unsafe { libc::kill(pid, 0) == 0 };
                return !exists;
            }
            // Unparseable target: assume the lock is live.
            false
        }
        // Exists but not a symlink: corrupted, treat a plain file as stale.
        Err(_) => lock_path.is_file(),
    }
}

#[cfg(not(unix))]
pub fn is_singleton_lock_stale(_profile_dir: &Path) -> bool {
    // No reliable liveness check; UUID naming prevents collisions anyway.
    true
}

/// Startup sweep: delete orphaned profile directories from previous runs.
pub fn cleanup_stale_profiles() -> Result<usize> {
    let temp_dir = std::env::temp_dir();
    let mut cleaned = 0;

    let entries = std::fs::read_dir(&temp_dir)
        .with_context(|| format!("failed to read temp dir {}", temp_dir.display()))?;
    for entry in entries.flatten() {
        let path = entry.path();
        if let Some(name) = path.file_name().and_then(|n| n.to_str())
            && name.starts_with(PROFILE_PREFIX)
            && path.is_dir()
            && is_singleton_lock_stale(&path)
        {
            if let Err(e) = std::fs::remove_dir_all(&path) {
                warn!("failed to remove stale profile {}: {e}", path.display());
            } else {
                cleaned += 1;
            }
        }
    }

    if cleaned > 0 {
        info!("removed {cleaned} stale browser profile directories");
    }
    Ok(cleaned)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_cleans_up_on_drop() {
        let profile = create_unique_profile().expect("profile");
        let path = profile.path().to_path_buf();
        assert!(path.exists());
        drop(profile);
        assert!(!path.exists());
    }

    #[test]
    fn into_path_transfers_ownership() {
        let profile = create_unique_profile().expect("profile");
        let path = profile.into_path();
        assert!(path.exists());
        remove_profile_dir(&path);
        assert!(!path.exists());
    }

    #[test]
    fn missing_lock_means_stale() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert!(is_singleton_lock_stale(dir.path()));
    }
}
