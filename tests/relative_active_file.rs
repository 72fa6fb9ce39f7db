//! Kept in its own test binary: it changes the process working directory.

use guard_jump::config::Config;
use guard_jump::terminal::TerminalHost;
use std::fs;
use std::path::PathBuf;

#[test]
fn test_bare_file_name_resolves_from_current_dir() {
    let temp = tempfile::tempdir().expect("tempdir");
    let root = temp.path().canonicalize().expect("canonical root");
    fs::write(root.join("Guardfile"), "guard :rspec do\nend\n").unwrap();
    fs::write(root.join("user_spec.rb"), "describe User do\nend\n").unwrap();

    let previous = std::env::current_dir().unwrap();
    std::env::set_current_dir(&root).unwrap();

    let mut navigator = Config::default().navigator();
    let host = TerminalHost {
        active_file: Some(PathBuf::from("user_spec.rb")),
        ..TerminalHost::default()
    };
    let working_dir = navigator.working_dir(&host);
    let resolved = navigator.resolve_root(&host);

    std::env::set_current_dir(previous).unwrap();

    assert_eq!(working_dir, root);
    assert_eq!(resolved.unwrap(), root);
}
