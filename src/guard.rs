//! Host resource accounting and worker auto-sizing
//!
//! Reads live process/FD/memory counts from procfs and the effective pid
//! limit from cgroup v2, so the pool can size itself below the point where
//! Chromium spawns start failing with EAGAIN. On non-Linux hosts the
//! readings degrade to `None` and sizing falls back to a CPU-based bound.

use std::path::Path;

use tracing::{debug, warn};

/// Default recycle threshold for open file descriptors.
pub const DEFAULT_FD_THRESHOLD: usize = 2048;
/// Default recycle threshold for direct child processes.
pub const DEFAULT_CHILD_PROC_THRESHOLD: usize = 150;

/// Estimated process fan-out of one headless browser instance.
const PROCS_PER_BROWSER: u64 = 12;
/// Pid headroom left for everything that is not a browser.
const PID_SAFETY_MARGIN: u64 = 64;
/// Absolute ceiling on auto-sized worker count.
const HARD_WORKER_CAP: usize = 32;
/// Rough per-worker memory budget used for RAM-based sizing.
const WORKER_RAM_GB: f64 = 0.5;

/// Point-in-time resource readings for this process.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResourceSnapshot {
    pub open_fds: Option<usize>,
    pub child_processes: Option<usize>,
    pub rss_bytes: Option<u64>,
}

/// Threshold checks shared by the session recycle policy and the
/// pre-spawn load guard.
#[derive(Debug, Clone, Copy)]
pub struct ResourceGuard {
    fd_threshold: usize,
    child_proc_threshold: usize,
}

impl ResourceGuard {
    pub fn new(fd_threshold: usize, child_proc_threshold: usize) -> Self {
        Self {
            fd_threshold,
            child_proc_threshold,
        }
    }

    pub fn snapshot(&self) -> ResourceSnapshot {
        ResourceSnapshot {
            open_fds: count_open_fds(),
            child_processes: count_child_processes(),
            rss_bytes: current_rss_bytes(),
        }
    }

    /// Is the host hot enough that sessions should be recycled before the
    /// next spawn?
    pub fn over_pressure(&self, snapshot: &ResourceSnapshot) -> bool {
        let fd_hot = snapshot.open_fds.is_some_and(|n| n > self.fd_threshold);
        let child_hot = snapshot
            .child_processes
            .is_some_and(|n| n > self.child_proc_threshold);
        if fd_hot || child_hot {
            warn!(
                fds = ?snapshot.open_fds,
                children = ?snapshot.child_processes,
                "resource pressure detected"
            );
        }
        fd_hot || child_hot
    }
}

impl Default for ResourceGuard {
    fn default() -> Self {
        Self::new(DEFAULT_FD_THRESHOLD, DEFAULT_CHILD_PROC_THRESHOLD)
    }
}

/// Number of open file descriptors, via `/proc/self/fd`.
pub fn count_open_fds() -> Option<usize> {
    std::fs::read_dir("/proc/self/fd")
        .ok()
        .map(|entries| entries.count())
}

/// Number of processes whose parent is this process.
pub fn count_child_processes() -> Option<usize> {
    let own_pid = std::process::id();
    let entries = std::fs::read_dir("/proc").ok()?;
    let mut count = 0;
    for entry in entries.flatten() {
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        if !name.chars().all(|c| c.is_ascii_digit()) {
            continue;
        }
        let status_path = Path::new("/proc").join(name).join("status");
        let Ok(status) = std::fs::read_to_string(status_path) else {
            continue;
        };
        if parse_ppid(&status) == Some(own_pid) {
            count += 1;
        }
    }
    Some(count)
}

/// Resident set size of this process, via `/proc/self/status` `VmRSS`.
pub fn current_rss_bytes() -> Option<u64> {
    let status = std::fs::read_to_string("/proc/self/status").ok()?;
    parse_vm_rss_kb(&status).map(|kb| kb * 1024)
}

/// Effective pid ceiling: cgroup v2 `pids.max` when bounded, otherwise
/// the kernel-wide `pid_max`.
pub fn effective_pid_limit() -> Option<u64> {
    if let Ok(raw) = std::fs::read_to_string("/sys/fs/cgroup/pids.max")
        && let Some(limit) = parse_pids_max(&raw)
    {
        return Some(limit);
    }
    std::fs::read_to_string("/proc/sys/kernel/pid_max")
        .ok()
        .and_then(|raw| raw.trim().parse().ok())
}

/// Total system memory in GiB, via `/proc/meminfo`.
pub fn total_ram_gb() -> Option<f64> {
    let meminfo = std::fs::read_to_string("/proc/meminfo").ok()?;
    parse_mem_total_kb(&meminfo).map(|kb| kb as f64 / (1024.0 * 1024.0))
}

pub(crate) fn parse_ppid(status: &str) -> Option<u32> {
    status
        .lines()
        .find(|line| line.starts_with("PPid:"))
        .and_then(|line| line.split_whitespace().nth(1))
        .and_then(|v| v.parse().ok())
}

pub(crate) fn parse_vm_rss_kb(status: &str) -> Option<u64> {
    status
        .lines()
        .find(|line| line.starts_with("VmRSS:"))
        .and_then(|line| line.split_whitespace().nth(1))
        .and_then(|v| v.parse().ok())
}

/// `pids.max` is either a number or the literal `max` (unbounded).
pub(crate) fn parse_pids_max(raw: &str) -> Option<u64> {
    let trimmed = raw.trim();
    if trimmed == "max" {
        return None;
    }
    trimmed.parse().ok()
}

pub(crate) fn parse_mem_total_kb(meminfo: &str) -> Option<u64> {
    meminfo
        .lines()
        .find(|line| line.starts_with("MemTotal:"))
        .and_then(|line| line.split_whitespace().nth(1))
        .and_then(|v| v.parse().ok())
}

/// Auto-size the worker pool from host capacity:
/// `min(ram_gb / 0.5, cpus * 4, (pid_limit - children - margin) / procs_per_browser, hard_cap)`.
///
/// An explicit override wins outright (still floored at 1).
pub fn auto_worker_count(override_workers: Option<usize>) -> usize {
    if let Some(explicit) = override_workers {
        return explicit.max(1);
    }
    let children = count_child_processes().unwrap_or(0) as u64;
    let workers =
        size_from_capacity(total_ram_gb(), num_cpus::get(), effective_pid_limit(), children);
    debug!(workers, "auto-sized worker pool");
    workers
}

/// The formula behind [`auto_worker_count`], separated so it can be
/// exercised against fixed capacities.
pub fn size_from_capacity(
    ram_gb: Option<f64>,
    cpus: usize,
    pid_limit: Option<u64>,
    children: u64,
) -> usize {
    let mut bound = cpus.saturating_mul(4).min(HARD_WORKER_CAP);
    if let Some(ram_gb) = ram_gb {
        bound = bound.min(((ram_gb / WORKER_RAM_GB) as usize).max(1));
    }
    if let Some(pid_limit) = pid_limit {
        let available = pid_limit.saturating_sub(children + PID_SAFETY_MARGIN);
        bound = bound.min(((available / PROCS_PER_BROWSER) as usize).max(1));
    }
    bound.max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_ppid_and_rss() {
        let status = "Name:\tchrome\nPid:\t4242\nPPid:\t100\nVmRSS:\t  204800 kB\n";
        assert_eq!(parse_ppid(status), Some(100));
        assert_eq!(parse_vm_rss_kb(status), Some(204800));
    }

    #[test]
    fn parses_pids_max_variants() {
        assert_eq!(parse_pids_max("max\n"), None);
        assert_eq!(parse_pids_max(" 4096\n"), Some(4096));
        assert_eq!(parse_pids_max("garbage"), None);
    }

    #[test]
    fn parses_mem_total() {
        let meminfo = "MemTotal:       16326656 kB\nMemFree:         1237712 kB\n";
        assert_eq!(parse_mem_total_kb(meminfo), Some(16_326_656));
    }

    #[test]
    fn sizing_takes_the_tightest_bound() {
        // 16 GiB, 8 cpus, plenty of pids: RAM allows 32, cpus allow 32,
        // hard cap floors everything at 32.
        assert_eq!(size_from_capacity(Some(16.0), 8, Some(100_000), 10), 32);
        // 2 GiB of RAM is the limiting factor: 2 / 0.5 = 4.
        assert_eq!(size_from_capacity(Some(2.0), 8, Some(100_000), 10), 4);
        // Tight pid budget: (400 - 10 - 64) / 12 = 27.
        assert_eq!(size_from_capacity(Some(64.0), 16, Some(400), 10), 27);
        // Degenerate capacity still yields one worker.
        assert_eq!(size_from_capacity(Some(0.1), 1, Some(10), 500), 1);
    }

    #[test]
    fn explicit_override_wins() {
        assert_eq!(auto_worker_count(Some(3)), 3);
        assert_eq!(auto_worker_count(Some(0)), 1);
    }

    #[test]
    fn pressure_thresholds() {
        let guard = ResourceGuard::new(100, 10);
        assert!(guard.over_pressure(&ResourceSnapshot {
            open_fds: Some(101),
            child_processes: Some(0),
            rss_bytes: None,
        }));
        assert!(guard.over_pressure(&ResourceSnapshot {
            open_fds: Some(5),
            child_processes: Some(11),
            rss_bytes: None,
        }));
        assert!(!guard.over_pressure(&ResourceSnapshot {
            open_fds: Some(100),
            child_processes: Some(10),
            rss_bytes: None,
        }));
        // Unknown readings never trip the guard.
        assert!(!guard.over_pressure(&ResourceSnapshot::default()));
    }
}
