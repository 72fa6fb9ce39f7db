//! Boundary traits for the filesystem and the host UI
//!
//! The resolver and navigator never touch `std::fs` or a terminal directly;
//! they go through these traits so the same logic can drive an editor plugin,
//! the bundled terminal host, or a test fake.

use std::io;
use std::path::{Path, PathBuf};

/// Filesystem calls used by root resolution and report loading.
pub trait FileSystem {
    /// Whether anything exists at `path`.
    fn exists(&self, path: &Path) -> bool;

    /// Resolve symlinks and `..` components. `None` when the path cannot be
    /// resolved (for example, it does not exist).
    fn canonicalize(&self, path: &Path) -> Option<PathBuf>;

    /// Read a text file. Bytes that aren't valid UTF-8 are replaced rather
    /// than failing the read.
    fn read_to_string(&self, path: &Path) -> io::Result<String>;
}

/// The real filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdFileSystem;

impl FileSystem for StdFileSystem {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn canonicalize(&self, path: &Path) -> Option<PathBuf> {
        path.canonicalize().ok()
    }

    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        let bytes = std::fs::read(path)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

/// A file opened by the host. Opening is asynchronous: the cursor can only be
/// moved once `is_loading` reports `false`.
pub trait FileHandle {
    fn is_loading(&self) -> bool;

    /// Move the cursor to a 1-based line.
    fn seek_line(&self, line: u32);
}

/// Selection index the host reports when the user dismisses the list.
pub const CANCELLED: isize = -1;

/// The UI the navigator drives.
pub trait Host {
    type Handle: FileHandle;

    /// Path of the file in the active editor, if any.
    fn current_active_file_path(&self) -> Option<PathBuf>;

    /// Open workspace folders, in host order.
    fn workspace_folders(&self) -> Vec<PathBuf>;

    /// Present `items` for a single choice. Returns the picked index, or a
    /// negative value ([`CANCELLED`]) when the user backs out.
    fn show_selection_list(&self, items: &[String]) -> isize;

    fn show_error(&self, message: &str);

    fn open_file(&self, path: &Path) -> Self::Handle;
}
