use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use super::wait::ConditionWaiter;
use crate::utils::config::HarnessConfig;

/// Runtime information shared by every step of a run
#[derive(Debug, Clone)]
pub struct RunContext {
    /// Directory holding the page under test and its fixtures
    pub app_root: PathBuf,

    /// Where screenshots land
    pub output_dir: PathBuf,

    /// Origin relative paths are resolved against, always ending in `/`
    pub origin: String,

    /// URL a bare `navigate` opens
    pub entry_url: String,

    pub waiter: ConditionWaiter,

    /// Timeout for waits that do not name their own
    pub default_timeout: Duration,

    /// Set from the Ctrl+C handler
    pub interrupted: Arc<AtomicBool>,
}

impl RunContext {
    pub fn new(config: &HarnessConfig, app_root: &Path, origin: String, entry_url: String) -> Self {
        Self {
            app_root: app_root.to_path_buf(),
            output_dir: config.output_dir.clone(),
            origin,
            entry_url,
            waiter: ConditionWaiter::new(config.poll_interval),
            default_timeout: config.default_timeout,
            interrupted: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_interrupt(mut self, flag: Arc<AtomicBool>) -> Self {
        self.interrupted = flag;
        self
    }

    pub fn is_interrupted(&self) -> bool {
        self.interrupted.load(Ordering::SeqCst)
    }

    pub fn fixture_path(&self, name: &str) -> PathBuf {
        self.app_root.join(name)
    }

    pub fn output_path(&self, name: &str) -> PathBuf {
        self.output_dir.join(name)
    }

    /// Resolve a navigation target; absolute URLs pass through untouched
    pub fn url_for(&self, path: Option<&str>) -> String {
        match path {
            None => self.entry_url.clone(),
            Some(p) if p.contains("://") => p.to_string(),
            Some(p) => format!("{}{}", self.origin, p.trim_start_matches('/')),
        }
    }

    pub fn timeout_or_default(&self, timeout_ms: Option<u64>) -> Duration {
        timeout_ms
            .map(Duration::from_millis)
            .unwrap_or(self.default_timeout)
    }
}

/// `file://` origin for a directory
pub fn file_origin(dir: &Path) -> String {
    let mut origin = format!("file://{}", dir.display());
    if !origin.ends_with('/') {
        origin.push('/');
    }
    origin
}
