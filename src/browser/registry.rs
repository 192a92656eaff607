//! Process-wide registry of live session profile directories
//!
//! A mutex-guarded set used for bulk cleanup: sessions register their
//! profile dir on launch and deregister on recycle, and the pool sweeps
//! whatever is left when it shuts down (covering sessions lost to
//! panicked jobs).

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tracing::debug;

use super::profile::remove_profile_dir;

#[derive(Debug, Default)]
pub struct SessionRegistry {
    active: Mutex<HashSet<PathBuf>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, profile_dir: &Path) {
        self.active.lock().insert(profile_dir.to_path_buf());
    }

    pub fn deregister(&self, profile_dir: &Path) {
        self.active.lock().remove(profile_dir);
    }

    pub fn active_count(&self) -> usize {
        self.active.lock().len()
    }

    /// Remove every profile directory still registered. Called once after
    /// all workers have drained.
    pub fn sweep(&self) {
        let leftover: Vec<PathBuf> = self.active.lock().drain().collect();
        for dir in leftover {
            debug!("sweeping leftover profile {}", dir.display());
            remove_profile_dir(&dir);
        }
    }
}
