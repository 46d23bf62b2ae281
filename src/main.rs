//! gitai - CLI entry point.

use std::io;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use gitai::config::{Config, config_path};
use gitai::git::open_repository;
use gitai::llm::{build_backend, select_backend};
use gitai::review::{ExternalEditor, GitCommitter, Outcome, ReviewSession, interrupt_message};
use gitai::run_commit;

/// Exit status after Ctrl-C, as shells report SIGINT.
const EXIT_INTERRUPTED: i32 = 130;

/// Draft commit messages from staged changes with an LLM.
#[derive(Parser, Debug)]
#[command(name = "gitai")]
#[command(about = "Draft commit messages from staged changes with a cloud or local LLM")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Path to the config file (overrides GITAI_CONFIG)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging on stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate a commit message for the staged changes and commit it
    Commit(CommitArgs),

    /// Show the resolved configuration
    Config,
}

#[derive(Args, Debug)]
struct CommitArgs {
    /// Use the local Ollama backend
    #[arg(long, conflicts_with = "api")]
    local: bool,

    /// Use the remote API backend
    #[arg(long)]
    api: bool,

    /// Topic the message must carry on a "Topic:" line
    #[arg(short = 'm', long = "message")]
    message: Option<String>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    // The review prompt blocks this task, so Ctrl-C is watched from another.
    let commit_started = Arc::new(AtomicBool::new(false));
    let watched = Arc::clone(&commit_started);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\n{}", interrupt_message(watched.load(Ordering::SeqCst)));
            process::exit(EXIT_INTERRUPTED);
        }
    });

    let code = match run(cli, commit_started).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e}");
            for cause in e.chain().skip(1) {
                eprintln!("  Caused by: {cause}");
            }
            1
        }
    };

    process::exit(code);
}

/// Log to stderr; `RUST_LOG` wins over `--verbose`, which wins over `warn`.
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "gitai=debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();
}

async fn run(cli: Cli, commit_started: Arc<AtomicBool>) -> Result<i32> {
    let config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;

    match cli.command {
        Command::Config => {
            print_config(&config, cli.config.as_deref());
            Ok(0)
        }
        Command::Commit(args) => commit(&config, args, commit_started).await,
    }
}

async fn commit(config: &Config, args: CommitArgs, commit_started: Arc<AtomicBool>) -> Result<i32> {
    let cwd = std::env::current_dir().context("Failed to read the current directory")?;
    let repo = open_repository(&cwd)?;
    let workdir = repo
        .workdir()
        .map(PathBuf::from)
        .context("Repository has no working directory")?;

    let kind = select_backend(args.local, args.api, config);
    let backend = build_backend(kind, config)?;

    let stdin = io::stdin();
    let mut session = ReviewSession::new(stdin.lock(), io::stdout(), ExternalEditor::from_env());
    let committer = GitCommitter::new(workdir).with_started_flag(commit_started);

    let outcome = run_commit(
        &repo,
        config,
        backend.as_ref(),
        args.message.as_deref(),
        &mut session,
        &committer,
    )
    .await?;

    Ok(match outcome {
        Outcome::Committed(_) => 0,
        Outcome::Rejected => {
            eprintln!("\x1b[33m⚠ Commit aborted\x1b[0m");
            1
        }
    })
}

fn print_config(config: &Config, explicit: Option<&std::path::Path>) {
    match config_path(explicit) {
        Some(path) if path.exists() => println!("Config file: {}", path.display()),
        Some(path) => println!("Config file: {} (not found, using defaults)", path.display()),
        None => println!("Config file: none (using defaults)"),
    }

    match config.template_path() {
        Some((path, _)) => println!("Prompt template: {}", path.display()),
        None => println!("Prompt template: built-in"),
    }
    match config.pricing_path() {
        Some((path, _)) => println!("Pricing table: {}", path.display()),
        None => println!("Pricing table: built-in"),
    }

    println!();
    println!("{}", config);
}
