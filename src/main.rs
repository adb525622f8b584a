mod app;
mod chart;
mod cli;
mod error;
mod filter;
mod format;
mod ingest;
mod navigator;
mod preview;
mod renderer;
mod stats;
mod tree;

use std::fs::{File, OpenOptions};
use std::io::{self, IsTerminal};
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Mutex;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::Cli;
use crate::ingest::LanguageReport;
use crate::navigator::Navigator;
use crate::tree::Tree;

/// Environment variable holding the log filter directives.
const LOG_ENV: &str = "LINETREE_LOG";

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_logging(cli.log_file.as_deref()) {
        eprintln!("Error: {:#}", e);
        return ExitCode::FAILURE;
    }
    error::install_panic_hook();

    match panic::catch_unwind(AssertUnwindSafe(|| run(&cli))) {
        Ok(Ok(())) => ExitCode::SUCCESS,
        Ok(Err(e)) => {
            tracing::error!(error = %format!("{:#}", e), "exiting with error");
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
        Err(_) => {
            app::reset_terminal();
            let fault = error::take_fault().unwrap_or(error::Fault {
                message: "unknown fault".to_string(),
                trace: "no stack trace data".to_string(),
            });
            eprintln!("{}", error::fault_report(&fault));
            ExitCode::FAILURE
        }
    }
}

/// Logs go to `--log-file` when given; the TUI owns the terminal otherwise.
fn init_logging(log_file: Option<&Path>) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));

    match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("cannot open log file {}", path.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init()
                .map_err(|e| anyhow::anyhow!("cannot install logger: {}", e))?;
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(io::sink)
                .try_init()
                .map_err(|e| anyhow::anyhow!("cannot install logger: {}", e))?;
        }
    }
    Ok(())
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let tree = load_tree(cli)?;
    tracing::info!(
        root = %tree.root().path,
        total = tree.root().total_stats.total(),
        "tree built"
    );

    let editor = cli::resolve_editor(cli.editor.as_deref(), std::env::var("EDITOR").ok());
    let mut app = app::App::new(Navigator::new(tree), editor);
    app.run()
}

/// Obtain the report (file, stdin or a tokei run) and build the tree from it.
fn load_tree(cli: &Cli) -> anyhow::Result<Tree> {
    let (report, root_label, abs_root) = match &cli.input {
        Some(input) if input.as_os_str() == "-" => (read_stdin()?, ".".to_string(), current_dir()?),
        Some(input) => {
            let file = File::open(input)
                .with_context(|| format!("cannot open report {}", input.display()))?;
            let report = ingest::read_report(file)
                .with_context(|| format!("cannot load report {}", input.display()))?;
            (report, ".".to_string(), current_dir()?)
        }
        None if !io::stdin().is_terminal() => (read_stdin()?, ".".to_string(), current_dir()?),
        None => {
            let abs_root = cli
                .path
                .canonicalize()
                .with_context(|| format!("cannot access {}", cli.path.display()))?;
            let report = ingest::run_tokei(&cli.tokei, &abs_root)?;
            (report, cli.path.display().to_string(), abs_root)
        }
    };

    let abs_root = abs_root.to_string_lossy().into_owned();
    let files = ingest::collect_file_stats(&report, Some(&abs_root));
    Ok(Tree::from_file_stats(root_label, files))
}

fn read_stdin() -> anyhow::Result<LanguageReport> {
    tracing::info!("reading report from stdin");
    Ok(ingest::read_report(io::stdin().lock())?)
}

fn current_dir() -> anyhow::Result<PathBuf> {
    std::env::current_dir().context("cannot determine the working directory")
}
