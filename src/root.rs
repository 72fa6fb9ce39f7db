//! Project root discovery
//!
//! Walks upward from a starting directory until a directory containing the
//! marker file is found. Results, including "not found", are memoized per
//! starting directory for a short time so repeated commands in the same
//! editor session don't re-walk the tree.

use crate::cache::{Clock, ExpiringCache, SystemClock};
use crate::host::{FileSystem, StdFileSystem};
use chrono::{DateTime, Duration, Utc};
use std::ffi::OsString;
use std::path::{Path, PathBuf};

pub const DEFAULT_MARKER_FILE: &str = "Guardfile";
pub const DEFAULT_CACHE_TTL_SECS: u64 = 5;

pub struct RootResolver<F = StdFileSystem, C = SystemClock> {
    fs: F,
    clock: C,
    marker: String,
    ttl: Duration,
    // Keyed by the starting directory exactly as given, not by the
    // intermediate directories visited on the way up.
    cache: ExpiringCache<OsString, Option<PathBuf>>,
}

impl RootResolver {
    /// Resolver over the real filesystem with the default marker and expiry.
    pub fn with_defaults() -> Self {
        Self::new(
            StdFileSystem,
            SystemClock,
            DEFAULT_MARKER_FILE,
            DEFAULT_CACHE_TTL_SECS,
        )
    }
}

impl<F: FileSystem, C: Clock> RootResolver<F, C> {
    pub fn new(fs: F, clock: C, marker: impl Into<String>, ttl_secs: u64) -> Self {
        let ttl_secs = i64::try_from(ttl_secs).unwrap_or(i64::MAX);
        Self {
            fs,
            clock,
            marker: marker.into(),
            ttl: Duration::try_seconds(ttl_secs).unwrap_or(Duration::MAX),
            cache: ExpiringCache::new(),
        }
    }

    pub fn fs(&self) -> &F {
        &self.fs
    }

    pub fn marker(&self) -> &str {
        &self.marker
    }

    /// Nearest directory at or above `start_dir` containing the marker file.
    pub fn resolve(&mut self, start_dir: impl AsRef<Path>) -> Option<PathBuf> {
        let start_dir = start_dir.as_ref();
        let key = start_dir.as_os_str().to_os_string();
        let now = self.clock.now();

        if let Some(cached) = self.cache.get(&key, now) {
            tracing::trace!(start = %start_dir.display(), "root cache hit");
            return cached.clone();
        }

        let resolved = self.walk(start_dir);
        tracing::debug!(
            start = %start_dir.display(),
            root = ?resolved,
            "resolved project root"
        );

        self.cache.put(key, resolved.clone(), expiry(now, self.ttl));
        resolved
    }

    fn walk(&self, start_dir: &Path) -> Option<PathBuf> {
        let mut dir = start_dir.to_path_buf();

        while !dir.as_os_str().is_empty() {
            if self.fs.exists(&dir.join(&self.marker)) {
                return Some(dir);
            }

            let parent = match self.fs.canonicalize(&dir.join("..")) {
                Some(parent) => parent,
                None => dir.parent()?.to_path_buf(),
            };
            if parent == dir {
                // "/.." is "/"
                return None;
            }
            tracing::trace!(from = %dir.display(), to = %parent.display(), "walking up");
            dir = parent;
        }

        None
    }
}

fn expiry(now: DateTime<Utc>, ttl: Duration) -> DateTime<Utc> {
    now.checked_add_signed(ttl).unwrap_or(DateTime::<Utc>::MAX_UTC)
}
