//! Terminal implementation of [`Host`]
//!
//! Selection goes through the full-screen picker (or a preset index for
//! scripted use). Opening a file reads it in the background; seeking either
//! hands the location to an external editor or prints it with a short preview.

use crate::host::{FileHandle, Host, CANCELLED};
use crate::ui::run_picker;
use crate::util::split_command;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

const PREVIEW_CONTEXT: usize = 3;

#[derive(Debug, Clone, Default)]
pub struct TerminalHost {
    pub active_file: Option<PathBuf>,
    pub folders: Vec<PathBuf>,
    /// Answer the selection list with this index instead of prompting.
    pub preset_pick: Option<isize>,
    pub editor: Option<String>,
}

impl Host for TerminalHost {
    type Handle = TerminalFile;

    fn current_active_file_path(&self) -> Option<PathBuf> {
        self.active_file.clone()
    }

    fn workspace_folders(&self) -> Vec<PathBuf> {
        self.folders.clone()
    }

    fn show_selection_list(&self, items: &[String]) -> isize {
        if let Some(pick) = self.preset_pick {
            return pick;
        }
        match run_picker("Failures", items.to_vec()) {
            Ok(picked) => picked,
            Err(err) => {
                self.show_error(&format!("Failed to show failure list: {}", err));
                CANCELLED
            }
        }
    }

    fn show_error(&self, message: &str) {
        for line in message.lines() {
            eprintln!("  ! {}", line);
        }
    }

    fn open_file(&self, path: &Path) -> TerminalFile {
        TerminalFile::open(path.to_path_buf(), self.editor.clone())
    }
}

type LoadResult = Result<String, String>;

/// A file being read in the background.
pub struct TerminalFile {
    path: PathBuf,
    editor: Option<String>,
    loading: Arc<AtomicBool>,
    content: Arc<Mutex<Option<LoadResult>>>,
}

impl TerminalFile {
    /// Start reading `path`. Must be called from within a tokio runtime.
    pub fn open(path: PathBuf, editor: Option<String>) -> Self {
        let loading = Arc::new(AtomicBool::new(true));
        let content = Arc::new(Mutex::new(None));

        let task_path = path.clone();
        let task_loading = loading.clone();
        let task_content = content.clone();
        tokio::spawn(async move {
            let result = tokio::fs::read(&task_path)
                .await
                .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
                .map_err(|e| e.to_string());
            if let Ok(mut slot) = task_content.lock() {
                *slot = Some(result);
            }
            task_loading.store(false, Ordering::Release);
        });

        Self {
            path,
            editor,
            loading,
            content,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn loaded(&self) -> Option<LoadResult> {
        self.content.lock().ok().and_then(|slot| slot.clone())
    }

    fn launch_editor(&self, editor: &str, line: u32) {
        let Some((program, args)) = split_command(editor) else {
            return;
        };
        let status = Command::new(&program)
            .args(args)
            .arg(format!("+{}", line))
            .arg(&self.path)
            .status();
        match status {
            Ok(status) if status.success() => {}
            Ok(status) => eprintln!("  ! {} exited with {}", program, status),
            Err(err) => eprintln!("  ! Failed to start {}: {}", program, err),
        }
    }
}

impl FileHandle for TerminalFile {
    fn is_loading(&self) -> bool {
        self.loading.load(Ordering::Acquire)
    }

    fn seek_line(&self, line: u32) {
        if let Some(editor) = &self.editor {
            self.launch_editor(editor, line);
            return;
        }

        println!("{}:{}", self.path.display(), line);
        match self.loaded() {
            Some(Ok(content)) => {
                for row in preview(&content, line, PREVIEW_CONTEXT) {
                    println!("{}", row);
                }
            }
            Some(Err(err)) => eprintln!("  ! Could not read {}: {}", self.path.display(), err),
            None => {}
        }
    }
}

/// Numbered lines around `line` (1-based), the target marked with `>`.
pub fn preview(content: &str, line: u32, context: usize) -> Vec<String> {
    let target = usize::try_from(line).unwrap_or(usize::MAX);
    let first = target.saturating_sub(context).max(1);
    let last = target.saturating_add(context);
    let width = last.to_string().len();

    content
        .lines()
        .enumerate()
        .map(|(idx, text)| (idx + 1, text))
        .filter(|(number, _)| (first..=last).contains(number))
        .map(|(number, text)| {
            let marker = if number == target { '>' } else { ' ' };
            format!("{} {:>width$} | {}", marker, number, text, width = width)
        })
        .collect()
}
