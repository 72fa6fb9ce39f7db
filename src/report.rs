//! Failure report parsing
//!
//! Guard writes one failure per line to `tmp/rspec_guard_result`. Every line
//! starts with a two character display prefix (`./`, ` 1`, ...) followed by
//! `<relative-path>:<line>` and optionally more text. Lines that don't carry
//! a location are kept so the list shown to the user mirrors the file, but
//! they can't be navigated to.

use crate::host::FileSystem;
use regex::Regex;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use thiserror::Error;

pub const DEFAULT_REPORT_PATH: &str = "tmp/rspec_guard_result";
pub const DEFAULT_PREFIX_WIDTH: usize = 2;

// A leftover list marker ("1) ", ") ") or indentation is skipped before the
// path. The path itself is greedy, so the last `:<digits>` wins.
const LOCATION_PATTERN: &str = r"^(?:\d*\)\s*|\s+)?(?P<file>.*):(?P<line>\d+)";

fn location_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(LOCATION_PATTERN).expect("location pattern is valid"))
}

/// A file and 1-based line parsed out of a report line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub file: String,
    pub line: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedLine {
    Matched(Location),
    Unmatched { raw: String },
}

/// Match `text` (prefix already removed) against the location pattern.
pub fn parse_location(text: &str) -> ParsedLine {
    let unmatched = || ParsedLine::Unmatched {
        raw: text.to_string(),
    };

    let Some(caps) = location_regex().captures(text) else {
        return unmatched();
    };
    let file = &caps["file"];
    if file.trim().is_empty() {
        return unmatched();
    }
    match caps["line"].parse::<u32>() {
        Ok(line) if line > 0 => ParsedLine::Matched(Location {
            file: file.to_string(),
            line,
        }),
        _ => unmatched(),
    }
}

/// Drop the first `width` characters (not bytes) of `line`.
pub fn strip_display_prefix(line: &str, width: usize) -> &str {
    match line.char_indices().nth(width) {
        Some((idx, _)) => &line[idx..],
        None => "",
    }
}

/// One line of the report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureRecord {
    /// The line as written, prefix included.
    pub raw: String,
    pub location: Option<Location>,
}

impl FailureRecord {
    pub fn parse(raw: &str, prefix_width: usize) -> Self {
        let location = match parse_location(strip_display_prefix(raw, prefix_width)) {
            ParsedLine::Matched(location) => Some(location),
            ParsedLine::Unmatched { raw: text } => {
                tracing::trace!(line = %text, "report line has no location");
                None
            }
        };
        Self {
            raw: raw.to_string(),
            location,
        }
    }

    pub fn is_navigable(&self) -> bool {
        self.location.is_some()
    }
}

/// Report lines in file order. Positions are what the user picks by.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FailureList {
    records: Vec<FailureRecord>,
}

impl FailureList {
    pub fn parse(content: &str, prefix_width: usize) -> Self {
        Self {
            records: content
                .lines()
                .map(|line| FailureRecord::parse(line, prefix_width))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Record at a host selection index. Negative (cancelled) and
    /// out-of-range picks yield `None`.
    pub fn pick(&self, picked: isize) -> Option<&FailureRecord> {
        if picked < 0 || picked as usize >= self.records.len() {
            return None;
        }
        self.records.get(picked as usize)
    }

    pub fn iter(&self) -> impl Iterator<Item = &FailureRecord> {
        self.records.iter()
    }

    pub fn navigable_count(&self) -> usize {
        self.records.iter().filter(|r| r.is_navigable()).count()
    }

    /// Text for the selection list, one entry per record.
    pub fn display_items(&self) -> Vec<String> {
        self.records.iter().map(|r| r.raw.clone()).collect()
    }
}

#[derive(Debug, Error)]
pub enum ReportError {
    #[error(
        "The file `{name}` could not be found.\nEither you haven't run your specs through guard, or you are lucky and there were no errors!",
        name = display_name(.path)
    )]
    NotFound { path: PathBuf },

    #[error(
        "The file `{name}` is empty.\nYour last guard run reported no failures.",
        name = display_name(.path)
    )]
    Empty { path: PathBuf },

    #[error("Could not read `{}`: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Where the report lives under a project root and how its lines are prefixed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportSource {
    pub relative_path: PathBuf,
    pub prefix_width: usize,
}

impl Default for ReportSource {
    fn default() -> Self {
        Self {
            relative_path: PathBuf::from(DEFAULT_REPORT_PATH),
            prefix_width: DEFAULT_PREFIX_WIDTH,
        }
    }
}

impl ReportSource {
    pub fn path_under(&self, root: &Path) -> PathBuf {
        root.join(&self.relative_path)
    }

    /// Read and parse the report under `root`. Nothing is returned unless the
    /// whole file was read.
    pub fn load<F: FileSystem>(&self, fs: &F, root: &Path) -> Result<FailureList, ReportError> {
        let path = self.path_under(root);
        let content = fs.read_to_string(&path).map_err(|source| {
            if source.kind() == io::ErrorKind::NotFound {
                ReportError::NotFound { path: path.clone() }
            } else {
                ReportError::Io {
                    path: path.clone(),
                    source,
                }
            }
        })?;

        if content.trim().is_empty() {
            return Err(ReportError::Empty { path });
        }

        let list = FailureList::parse(&content, self.prefix_width);
        tracing::debug!(
            path = %path.display(),
            entries = list.len(),
            navigable = list.navigable_count(),
            "loaded failure report"
        );
        Ok(list)
    }
}
