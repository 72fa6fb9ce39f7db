//! "Open failures" command
//!
//! One invocation walks this state machine:
//!
//! ```text
//! Idle -> ResolvingRoot -> ErrorNoRoot
//!                       -> Listing -> ErrorReport
//!                                  -> Cancelled
//!                                  -> Picked -> Skipped
//!                                            -> Opening -> WaitingLoad -> Seeking -> Done
//!                                                                      -> Abandoned
//! ```
//!
//! The failure list is rebuilt on every invocation. The root is resolved
//! again after the pick instead of reusing the one found while listing; the
//! resolver's cache makes that free inside its expiry window.

use crate::cache::{Clock, SystemClock};
use crate::host::{FileHandle, FileSystem, Host, StdFileSystem};
use crate::report::{FailureList, ReportError, ReportSource};
use crate::root::RootResolver;
use crate::wait::{wait_until, PollSettings, WaitOutcome};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationState {
    Idle,
    ResolvingRoot,
    ErrorNoRoot,
    Listing,
    ErrorReport,
    Cancelled,
    Picked,
    /// The picked line has no `file:line` location.
    Skipped,
    Opening,
    WaitingLoad,
    /// The load wait was cancelled or timed out; the cursor was not moved.
    Abandoned,
    Seeking,
    Done,
}

impl NavigationState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            NavigationState::ErrorNoRoot
                | NavigationState::ErrorReport
                | NavigationState::Cancelled
                | NavigationState::Skipped
                | NavigationState::Abandoned
                | NavigationState::Done
        )
    }
}

#[derive(Debug, Error)]
pub enum NavigatorError {
    #[error("This doesn't look like a project root (no `{marker}` found above `{start}`)")]
    RootNotFound { marker: String, start: String },

    #[error(transparent)]
    Report(#[from] ReportError),
}

pub struct FailureNavigator<F = StdFileSystem, C = SystemClock> {
    resolver: RootResolver<F, C>,
    report: ReportSource,
    poll: PollSettings,
    state: NavigationState,
}

impl<F: FileSystem, C: Clock> FailureNavigator<F, C> {
    pub fn new(resolver: RootResolver<F, C>, report: ReportSource, poll: PollSettings) -> Self {
        Self {
            resolver,
            report,
            poll,
            state: NavigationState::Idle,
        }
    }

    pub fn state(&self) -> NavigationState {
        self.state
    }

    fn set_state(&mut self, next: NavigationState) {
        tracing::debug!(from = ?self.state, to = ?next, "navigation state");
        self.state = next;
    }

    /// Directory the command operates from: the active file's directory
    /// (symlinks resolved), else the first workspace folder, else empty.
    /// A bare file name lives in the current directory.
    pub fn working_dir<H: Host>(&self, host: &H) -> PathBuf {
        let active = host
            .current_active_file_path()
            .filter(|path| !path.as_os_str().is_empty());
        if let Some(file) = active {
            let dir = match file.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
                _ => PathBuf::from("."),
            };
            return self.resolver.fs().canonicalize(&dir).unwrap_or(dir);
        }
        host.workspace_folders().into_iter().next().unwrap_or_default()
    }

    /// Resolve the project root for the host's current context.
    pub fn resolve_root<H: Host>(&mut self, host: &H) -> Result<PathBuf, NavigatorError> {
        let start = self.working_dir(host);
        self.resolver
            .resolve(&start)
            .ok_or_else(|| NavigatorError::RootNotFound {
                marker: self.resolver.marker().to_string(),
                start: start.display().to_string(),
            })
    }

    /// Parse the failure report under `root`.
    pub fn list_failures(&self, root: &Path) -> Result<FailureList, ReportError> {
        self.report.load(self.resolver.fs(), root)
    }

    /// Resolve the root and load the list, leaving the navigator in
    /// `Listing` on success or the matching error state otherwise.
    pub fn prepare<H: Host>(&mut self, host: &H) -> Result<FailureList, NavigatorError> {
        self.set_state(NavigationState::ResolvingRoot);
        let root = match self.resolve_root(host) {
            Ok(root) => root,
            Err(err) => {
                self.set_state(NavigationState::ErrorNoRoot);
                return Err(err);
            }
        };

        self.set_state(NavigationState::Listing);
        self.list_failures(&root).map_err(|err| {
            self.set_state(NavigationState::ErrorReport);
            err.into()
        })
    }

    /// Run one full "open failures" cycle against `host`.
    pub async fn open_failures<H: Host>(
        &mut self,
        host: &H,
        cancel: &CancellationToken,
    ) -> NavigationState {
        self.set_state(NavigationState::Idle);

        let list = match self.prepare(host) {
            Ok(list) => list,
            Err(err) => {
                host.show_error(&err.to_string());
                return self.state;
            }
        };

        let picked = host.show_selection_list(&list.display_items());
        let state = self.on_pick(host, &list, picked, cancel).await;
        debug_assert!(state.is_terminal(), "cycle stopped in {state:?}");
        state
    }

    /// Handle the host's answer to the selection list.
    pub async fn on_pick<H: Host>(
        &mut self,
        host: &H,
        list: &FailureList,
        picked: isize,
        cancel: &CancellationToken,
    ) -> NavigationState {
        let Some(record) = list.pick(picked) else {
            self.set_state(NavigationState::Cancelled);
            return self.state;
        };
        self.set_state(NavigationState::Picked);

        let Some(location) = record.location.clone() else {
            self.set_state(NavigationState::Skipped);
            return self.state;
        };

        let root = match self.resolve_root(host) {
            Ok(root) => root,
            Err(err) => {
                host.show_error(&err.to_string());
                self.set_state(NavigationState::ErrorNoRoot);
                return self.state;
            }
        };

        self.set_state(NavigationState::Opening);
        let path = root.join(&location.file);
        let handle = host.open_file(&path);

        self.set_state(NavigationState::WaitingLoad);
        match wait_until(|| !handle.is_loading(), self.poll, cancel).await {
            WaitOutcome::Ready => {
                self.set_state(NavigationState::Seeking);
                handle.seek_line(location.line);
                self.set_state(NavigationState::Done);
            }
            outcome => {
                tracing::warn!(
                    path = %path.display(),
                    ?outcome,
                    "gave up waiting for file to load"
                );
                self.set_state(NavigationState::Abandoned);
            }
        }
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::CANCELLED;
    use crate::root::tests::{FakeClock, FakeFs};
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;
    use std::time::Duration;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Event {
        ShowList(Vec<String>),
        Error(String),
        Open(PathBuf),
        Seek { line: u32, loading_checks: usize },
    }

    struct FakeHandle {
        // is_loading() returns true this many more times
        loading_for: Cell<usize>,
        checks: Cell<usize>,
        events: Rc<RefCell<Vec<Event>>>,
    }

    impl FileHandle for Rc<FakeHandle> {
        fn is_loading(&self) -> bool {
            self.checks.set(self.checks.get() + 1);
            let remaining = self.loading_for.get();
            if remaining == 0 {
                return false;
            }
            self.loading_for.set(remaining - 1);
            true
        }

        fn seek_line(&self, line: u32) {
            assert_eq!(self.loading_for.get(), 0, "seek issued while still loading");
            self.events.borrow_mut().push(Event::Seek {
                line,
                loading_checks: self.checks.get(),
            });
        }
    }

    struct FakeHost {
        active_file: Option<PathBuf>,
        folders: Vec<PathBuf>,
        pick: isize,
        loading_for: usize,
        events: Rc<RefCell<Vec<Event>>>,
    }

    impl FakeHost {
        fn new(folder: &str, pick: isize) -> Self {
            Self {
                active_file: None,
                folders: vec![PathBuf::from(folder)],
                pick,
                loading_for: 0,
                events: Rc::default(),
            }
        }

        fn events(&self) -> Vec<Event> {
            self.events.borrow().clone()
        }

        fn opened(&self) -> Vec<PathBuf> {
            self.events()
                .into_iter()
                .filter_map(|e| match e {
                    Event::Open(path) => Some(path),
                    _ => None,
                })
                .collect()
        }
    }

    impl Host for FakeHost {
        type Handle = Rc<FakeHandle>;

        fn current_active_file_path(&self) -> Option<PathBuf> {
            self.active_file.clone()
        }

        fn workspace_folders(&self) -> Vec<PathBuf> {
            self.folders.clone()
        }

        fn show_selection_list(&self, items: &[String]) -> isize {
            self.events
                .borrow_mut()
                .push(Event::ShowList(items.to_vec()));
            self.pick
        }

        fn show_error(&self, message: &str) {
            self.events
                .borrow_mut()
                .push(Event::Error(message.to_string()));
        }

        fn open_file(&self, path: &Path) -> Self::Handle {
            self.events
                .borrow_mut()
                .push(Event::Open(path.to_path_buf()));
            Rc::new(FakeHandle {
                loading_for: Cell::new(self.loading_for),
                checks: Cell::new(0),
                events: self.events.clone(),
            })
        }
    }

    const REPORT: &str = " 1) a/b.rb:10\n 2) malformed line\n 3) c/d.rb:7\n";

    fn project_fs() -> FakeFs {
        let fs = FakeFs::with_files(&["/work/app/Guardfile"]);
        fs.write("/work/app/tmp/rspec_guard_result", REPORT);
        fs
    }

    fn navigator(fs: &FakeFs) -> FailureNavigator<FakeFs, FakeClock> {
        let resolver = RootResolver::new(fs.clone(), FakeClock::new(), "Guardfile", 5);
        FailureNavigator::new(resolver, ReportSource::default(), PollSettings::default())
    }

    #[tokio::test(start_paused = true)]
    async fn test_valid_pick_opens_then_seeks_after_load() {
        let fs = project_fs();
        let mut nav = navigator(&fs);
        let mut host = FakeHost::new("/work/app/spec", 2);
        host.loading_for = 3;

        let state = nav.open_failures(&host, &CancellationToken::new()).await;

        assert_eq!(state, NavigationState::Done);
        let events = host.events();
        assert_eq!(
            events[0],
            Event::ShowList(vec![
                " 1) a/b.rb:10".to_string(),
                " 2) malformed line".to_string(),
                " 3) c/d.rb:7".to_string(),
            ])
        );
        assert_eq!(events[1], Event::Open(PathBuf::from("/work/app/c/d.rb")));
        assert_eq!(
            events[2],
            Event::Seek {
                line: 7,
                loading_checks: 4
            }
        );
        assert_eq!(events.len(), 3, "seek happens exactly once");
    }

    #[tokio::test(start_paused = true)]
    async fn test_malformed_pick_does_not_open() {
        let fs = project_fs();
        let mut nav = navigator(&fs);
        let host = FakeHost::new("/work/app", 1);

        let state = nav.open_failures(&host, &CancellationToken::new()).await;

        assert_eq!(state, NavigationState::Skipped);
        assert!(host.opened().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_and_out_of_range_picks_are_noops() {
        for pick in [CANCELLED, -7, 3, 100] {
            let fs = project_fs();
            let mut nav = navigator(&fs);
            let host = FakeHost::new("/work/app", pick);

            let state = nav.open_failures(&host, &CancellationToken::new()).await;

            assert_eq!(state, NavigationState::Cancelled, "pick {pick}");
            assert_eq!(host.events().len(), 1, "only the list was shown");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_root_shows_error_and_no_list() {
        let fs = FakeFs::default();
        let mut nav = navigator(&fs);
        let host = FakeHost::new("/elsewhere", 0);

        let state = nav.open_failures(&host, &CancellationToken::new()).await;

        assert_eq!(state, NavigationState::ErrorNoRoot);
        let events = host.events();
        assert_eq!(events.len(), 1);
        assert!(matches!(
            &events[0],
            Event::Error(msg) if msg.contains("doesn't look like a project root")
                && msg.contains("Guardfile")
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_report_shows_unreadable_error() {
        let fs = FakeFs::with_files(&["/work/app/Guardfile"]);
        let mut nav = navigator(&fs);
        let host = FakeHost::new("/work/app", 0);

        let state = nav.open_failures(&host, &CancellationToken::new()).await;

        assert_eq!(state, NavigationState::ErrorReport);
        let events = host.events();
        assert_eq!(events.len(), 1);
        assert!(matches!(&events[0], Event::Error(msg) if msg.contains("rspec_guard_result")));

        let err = nav.prepare(&host).unwrap_err();
        assert!(matches!(
            err,
            NavigatorError::Report(ReportError::NotFound { .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_workspace_resolves_empty_dir_to_no_root() {
        let fs = project_fs();
        let mut nav = navigator(&fs);
        let mut host = FakeHost::new("/work/app", 0);
        host.folders.clear();

        assert_eq!(nav.working_dir(&host), PathBuf::new());
        let state = nav.open_failures(&host, &CancellationToken::new()).await;
        assert_eq!(state, NavigationState::ErrorNoRoot);
    }

    #[test]
    fn test_working_dir_prefers_active_file() {
        let fs = project_fs();
        let nav = navigator(&fs);
        let mut host = FakeHost::new("/other", 0);
        host.active_file = Some(PathBuf::from("/work/app/spec/models/user_spec.rb"));

        assert_eq!(
            nav.working_dir(&host),
            PathBuf::from("/work/app/spec/models")
        );

        host.active_file = Some(PathBuf::new());
        assert_eq!(nav.working_dir(&host), PathBuf::from("/other"));
    }

    #[test]
    fn test_working_dir_for_bare_file_name_is_current_dir() {
        let fs = project_fs();
        let nav = navigator(&fs);
        let mut host = FakeHost::new("/other", 0);
        host.active_file = Some(PathBuf::from("user_spec.rb"));

        // The fake can't resolve relative paths, so "." is kept as is.
        assert_eq!(nav.working_dir(&host), PathBuf::from("."));
    }

    #[test]
    fn test_working_dir_resolves_bare_file_name_on_real_fs() {
        let tmp = tempfile::tempdir().unwrap();
        let resolver = RootResolver::new(StdFileSystem, SystemClock, "Guardfile", 5);
        let nav = FailureNavigator::new(resolver, ReportSource::default(), PollSettings::default());
        let mut host = FakeHost::new(&tmp.path().display().to_string(), 0);
        host.active_file = Some(PathBuf::from("user_spec.rb"));

        let cwd = std::env::current_dir().unwrap().canonicalize().unwrap();
        assert_eq!(nav.working_dir(&host), cwd);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_wait_never_seeks() {
        let fs = project_fs();
        let mut nav = navigator(&fs);
        let mut host = FakeHost::new("/work/app", 0);
        host.loading_for = usize::MAX;

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        let (state, ()) = tokio::join!(nav.open_failures(&host, &cancel), async move {
            tokio::time::sleep(Duration::from_millis(500)).await;
            trigger.cancel();
        });

        assert_eq!(state, NavigationState::Abandoned);
        assert!(!host
            .events()
            .iter()
            .any(|e| matches!(e, Event::Seek { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_times_out_when_configured() {
        let fs = project_fs();
        let resolver = RootResolver::new(fs.clone(), FakeClock::new(), "Guardfile", 5);
        let poll = PollSettings {
            interval: Duration::from_millis(50),
            timeout: Some(Duration::from_secs(1)),
        };
        let mut nav = FailureNavigator::new(resolver, ReportSource::default(), poll);
        let mut host = FakeHost::new("/work/app", 0);
        host.loading_for = usize::MAX;

        let state = nav.open_failures(&host, &CancellationToken::new()).await;
        assert_eq!(state, NavigationState::Abandoned);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pick_reuses_cached_root() {
        let fs = project_fs();
        let mut nav = navigator(&fs);
        let host = FakeHost::new("/work/app/spec", 0);

        let list = nav.prepare(&host).unwrap();
        let checks_after_listing = fs.exists_calls.get();

        let state = nav
            .on_pick(&host, &list, 0, &CancellationToken::new())
            .await;

        assert_eq!(state, NavigationState::Done);
        assert_eq!(fs.exists_calls.get(), checks_after_listing);
        assert_eq!(host.opened(), vec![PathBuf::from("/work/app/a/b.rb")]);
    }

    #[test]
    fn test_terminal_states() {
        assert!(NavigationState::Done.is_terminal());
        assert!(NavigationState::Cancelled.is_terminal());
        assert!(!NavigationState::WaitingLoad.is_terminal());
        assert!(!NavigationState::Idle.is_terminal());
    }
}
