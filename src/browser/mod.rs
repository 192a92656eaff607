//! Headless browser lifecycle: discovery, launch, per-worker sessions and
//! profile hygiene

pub mod launch;
pub mod profile;
pub mod registry;
pub mod session;

pub use launch::{DESKTOP_USER_AGENT, find_browser_executable, launch_browser};
pub use profile::{SessionProfile, cleanup_stale_profiles, create_unique_profile};
pub use registry::SessionRegistry;
pub use session::{BrowserSession, SessionConfig};
