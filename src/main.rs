//! guard-jump - open the file and line of a failing spec
//!
//! Reads the report guard leaves in `tmp/rspec_guard_result`, lets you pick a
//! failure, and jumps to it.

use anyhow::Result;
use clap::{Parser, Subcommand};
use guard_jump::config::Config;
use guard_jump::host::Host;
use guard_jump::navigator::{FailureNavigator, NavigationState};
use guard_jump::terminal::TerminalHost;
use std::path::PathBuf;
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "GUARD_JUMP_LOG";

#[derive(Parser, Debug)]
#[command(
    name = "guard-jump",
    about = "Jump from guard's rspec failure report to the failing line",
    version
)]
struct Args {
    #[command(subcommand)]
    command: Option<Cmd>,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Pick a failure and jump to it (default)
    Open(OpenArgs),
    /// Print the project root
    Root(TargetArgs),
    /// Print the failure list with pick indices
    List(TargetArgs),
    /// Show the effective configuration
    Config {
        /// Write it to the config file
        #[arg(long)]
        init: bool,
    },
}

#[derive(clap::Args, Debug, Default)]
struct TargetArgs {
    /// File open in the editor; the root is searched from its directory
    #[arg(long)]
    file: Option<PathBuf>,

    /// Workspace folder, used when no file is given (defaults to current directory)
    #[arg(long = "folder")]
    folders: Vec<PathBuf>,
}

#[derive(clap::Args, Debug, Default)]
struct OpenArgs {
    #[command(flatten)]
    target: TargetArgs,

    /// Pick this index instead of showing the list (negative cancels)
    #[arg(long, allow_hyphen_values = true)]
    pick: Option<isize>,

    /// Editor command, run as `<editor> +<line> <file>`
    #[arg(long)]
    editor: Option<String>,

    /// Wait for the file to load without a time limit
    #[arg(long)]
    no_timeout: bool,
}

impl TargetArgs {
    fn into_host(self) -> Result<TerminalHost> {
        let folders = if self.folders.is_empty() {
            vec![std::env::current_dir()?]
        } else {
            self.folders
        };
        Ok(TerminalHost {
            active_file: self.file,
            folders,
            ..TerminalHost::default()
        })
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<ExitCode> {
    init_logging();
    let args = Args::parse();
    let config = Config::load();

    match args.command.unwrap_or(Cmd::Open(OpenArgs::default())) {
        Cmd::Open(open) => run_open(config, open).await,
        Cmd::Root(target) => run_root(&config, target),
        Cmd::List(target) => run_list(&config, target),
        Cmd::Config { init } => run_config(&config, init),
    }
}

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| "warn".into()))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run_open(mut config: Config, open: OpenArgs) -> Result<ExitCode> {
    if open.editor.is_some() {
        config.editor = open.editor;
    }
    if open.no_timeout {
        config.load_timeout_secs = None;
    }

    let mut host = open.target.into_host()?;
    host.preset_pick = open.pick;
    host.editor = config.editor.clone();

    let mut navigator = config.navigator();
    let cancel = CancellationToken::new();
    let state = navigator.open_failures(&host, &cancel).await;

    Ok(exit_code(state))
}

fn exit_code(state: NavigationState) -> ExitCode {
    match state {
        NavigationState::ErrorNoRoot
        | NavigationState::ErrorReport
        | NavigationState::Abandoned => ExitCode::FAILURE,
        _ => ExitCode::SUCCESS,
    }
}

fn run_root(config: &Config, target: TargetArgs) -> Result<ExitCode> {
    let host = target.into_host()?;
    let mut navigator: FailureNavigator = config.navigator();

    match navigator.resolve_root(&host) {
        Ok(root) => {
            println!("{}", root.display());
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            host.show_error(&err.to_string());
            Ok(ExitCode::FAILURE)
        }
    }
}

fn run_list(config: &Config, target: TargetArgs) -> Result<ExitCode> {
    let host = target.into_host()?;
    let mut navigator: FailureNavigator = config.navigator();

    let list = match navigator.prepare(&host) {
        Ok(list) => list,
        Err(err) => {
            host.show_error(&err.to_string());
            return Ok(ExitCode::FAILURE);
        }
    };

    for (idx, record) in list.iter().enumerate() {
        match &record.location {
            Some(location) => println!("{:>3}  {}:{}", idx, location.file, location.line),
            None => println!("{:>3}  {}  (no location)", idx, record.raw.trim()),
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn run_config(config: &Config, init: bool) -> Result<ExitCode> {
    println!("{}", serde_json::to_string_pretty(config)?);
    if init {
        let path = config.save().map_err(anyhow::Error::msg)?;
        eprintln!("  + Config saved to {}", path.display());
    } else {
        eprintln!("  Config file: {}", Config::config_location());
    }
    Ok(ExitCode::SUCCESS)
}
