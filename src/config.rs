//! Configuration management for guard-jump
//!
//! Stores settings in ~/.config/guard-jump/config.json

use crate::cache::SystemClock;
use crate::host::StdFileSystem;
use crate::navigator::FailureNavigator;
use crate::report::{ReportSource, DEFAULT_PREFIX_WIDTH, DEFAULT_REPORT_PATH};
use crate::root::{RootResolver, DEFAULT_CACHE_TTL_SECS, DEFAULT_MARKER_FILE};
use crate::wait::{PollSettings, DEFAULT_POLL_INTERVAL_MS};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const EDITOR_ENV: &str = "GUARD_JUMP_EDITOR";
const DEFAULT_LOAD_TIMEOUT_SECS: u64 = 30;
const MAX_CACHE_TTL_SECS: u64 = 3600;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// File whose presence marks the project root
    pub marker_file: String,
    /// Failure report, relative to the project root
    pub report_path: PathBuf,
    /// Display prefix width stripped before matching `file:line`
    pub prefix_width: usize,
    pub cache_ttl_secs: u64,
    pub poll_interval_ms: u64,
    /// Give up waiting for a file to load after this long. `None` waits forever.
    pub load_timeout_secs: Option<u64>,
    /// Editor launched as `<editor> +<line> <file>`. Prints the location when unset.
    pub editor: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            marker_file: DEFAULT_MARKER_FILE.to_string(),
            report_path: PathBuf::from(DEFAULT_REPORT_PATH),
            prefix_width: DEFAULT_PREFIX_WIDTH,
            cache_ttl_secs: DEFAULT_CACHE_TTL_SECS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            load_timeout_secs: Some(DEFAULT_LOAD_TIMEOUT_SECS),
            editor: None,
        }
    }
}

impl Config {
    fn sanitize(&mut self) {
        let defaults = Self::default();
        if self.marker_file.trim().is_empty() {
            self.marker_file = defaults.marker_file;
        }
        if self.report_path.as_os_str().is_empty() || self.report_path.is_absolute() {
            self.report_path = defaults.report_path;
        }
        if self.poll_interval_ms == 0 {
            self.poll_interval_ms = defaults.poll_interval_ms;
        }
        self.cache_ttl_secs = self.cache_ttl_secs.min(MAX_CACHE_TTL_SECS);
        if self.load_timeout_secs == Some(0) {
            self.load_timeout_secs = defaults.load_timeout_secs;
        }
        if self
            .editor
            .as_ref()
            .is_some_and(|editor| editor.trim().is_empty())
        {
            self.editor = None;
        }
    }

    /// Get the config directory path
    fn config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("guard-jump"))
    }

    /// Get the config file path
    pub fn config_path() -> Option<PathBuf> {
        Self::config_dir().map(|p| p.join("config.json"))
    }

    pub fn config_location() -> String {
        Self::config_path()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "~/.config/guard-jump/config.json".to_string())
    }

    /// Load config from disk, or return default
    pub fn load() -> Self {
        let mut config = Self::config_path()
            .map(|path| Self::load_from(&path))
            .unwrap_or_default();
        config.apply_env();
        config
    }

    /// Load from `path`. A file that fails to parse is moved aside to
    /// `config.json.corrupt` and defaults are used.
    pub fn load_from(path: &Path) -> Self {
        let Ok(content) = fs::read_to_string(path) else {
            return Self::default();
        };
        match serde_json::from_str::<Config>(&content) {
            Ok(mut config) => {
                config.sanitize();
                config
            }
            Err(err) => {
                preserve_corrupt_config(path, &content);
                tracing::warn!(
                    path = %path.display(),
                    error = %err,
                    "config file was corrupted; a backup was saved and defaults were loaded"
                );
                Self::default()
            }
        }
    }

    fn apply_env(&mut self) {
        if let Ok(editor) = std::env::var(EDITOR_ENV) {
            if !editor.trim().is_empty() {
                self.editor = Some(editor);
            }
        }
    }

    /// Save config to disk
    pub fn save(&self) -> Result<PathBuf, String> {
        let dir =
            Self::config_dir().ok_or_else(|| "Could not determine config directory".to_string())?;
        fs::create_dir_all(&dir)
            .map_err(|e| format!("Failed to create config directory: {}", e))?;
        let path = dir.join("config.json");
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), String> {
        let mut sanitized = self.clone();
        sanitized.sanitize();
        let content = serde_json::to_string_pretty(&sanitized)
            .map_err(|e| format!("Failed to serialize config: {}", e))?;
        write_config_atomic(path, &content).map_err(|e| format!("Failed to write config: {}", e))
    }

    pub fn report_source(&self) -> ReportSource {
        ReportSource {
            relative_path: self.report_path.clone(),
            prefix_width: self.prefix_width,
        }
    }

    pub fn poll_settings(&self) -> PollSettings {
        PollSettings {
            interval: Duration::from_millis(self.poll_interval_ms),
            timeout: self.load_timeout_secs.map(Duration::from_secs),
        }
    }

    pub fn resolver(&self) -> RootResolver {
        RootResolver::new(
            StdFileSystem,
            SystemClock,
            self.marker_file.clone(),
            self.cache_ttl_secs,
        )
    }

    pub fn navigator(&self) -> FailureNavigator {
        FailureNavigator::new(self.resolver(), self.report_source(), self.poll_settings())
    }
}

fn preserve_corrupt_config(path: &Path, content: &str) {
    let corrupt_path = path.with_extension("json.corrupt");
    if fs::rename(path, &corrupt_path).is_err() {
        let _ = fs::write(&corrupt_path, content);
    }
}

fn write_config_atomic(path: &Path, content: &str) -> std::io::Result<()> {
    let tmp_path = path.with_extension("tmp");
    let mut file = fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(&tmp_path)?;
    file.write_all(content.as_bytes())?;

    if let Err(err) = fs::rename(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(err);
    }
    Ok(())
}
