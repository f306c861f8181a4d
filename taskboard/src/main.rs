//! `taskboard`: ordered task lists in the terminal.
//!
//! Reads commands from stdin, one per line. The document store lives in
//! memory and is saved to a state file on exit. Configuration via CLI
//! flags, environment variables, or config file
//! (`~/.config/taskboard/config.toml`).
//!
//! ```bash
//! cargo run --bin taskboard
//!
//! # Throwaway session, nothing saved
//! cargo run --bin taskboard -- --in-memory
//!
//! # Sign in at startup
//! TASKBOARD_EMAIL=ann@example.com cargo run --bin taskboard
//! ```

use std::io::{self, Write as _};
use std::path::Path;
use std::sync::Arc;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_appender::non_blocking::WorkerGuard;

use taskboard::auth::{IdentityProvider, LocalIdentity};
use taskboard::config::{AppConfig, CliArgs};
use taskboard::session::Session;
use taskboard::shell::{Reply, Shell};
use taskboard::store::memory::MemoryStore;
use taskboard::store::persist;

#[tokio::main]
async fn main() -> io::Result<()> {
    let cli = CliArgs::parse();

    let config = match AppConfig::load(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Warning: failed to load config file: {e}");
            AppConfig::default()
        }
    };

    // Logs go to a file; stdout belongs to the shell.
    let _log_guard = init_logging(&cli.log_level, cli.log_file.as_deref());

    tracing::info!("taskboard starting");

    let store = match config.state_file.as_deref() {
        Some(path) => match persist::load(path) {
            Ok(store) => store,
            Err(e) => {
                eprintln!("Error: {e}");
                return Err(io::Error::other(e));
            }
        },
        None => MemoryStore::new(),
    };
    let store = Arc::new(store);
    let identity = Arc::new(LocalIdentity::new(Arc::clone(&store)));

    if let Some(email) = &config.email {
        match identity.resume(email).await {
            Ok(_) => println!("signed in as {email}"),
            Err(e) => println!("could not sign in as {email}: {e}"),
        }
    }

    let session = Session::new(Arc::clone(&store), identity.watch(), config.board)
        .map_err(io::Error::other)?;
    let mut shell = Shell::new(Arc::clone(&identity), session);

    let result = run_shell(&mut shell).await;

    if let Some(path) = config.state_file.as_deref() {
        save_state(&store, path);
    }
    tracing::info!("taskboard exiting");
    result
}

/// Initialize file-based logging.
///
/// Returns a [`WorkerGuard`] that must be held until shutdown to ensure all
/// buffered log entries are flushed.
fn init_logging(level: &str, file_path: Option<&Path>) -> Option<WorkerGuard> {
    let default_path = std::env::temp_dir().join("taskboard.log");
    let log_path = file_path.unwrap_or(&default_path);

    let log_dir = log_path.parent()?;
    let file_name = log_path.file_name()?.to_str()?;

    let file_appender = tracing_appender::rolling::never(log_dir, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_env_filter(env_filter)
        .with_ansi(false)
        .init();

    Some(guard)
}

/// Reads lines until `quit` or end of input.
async fn run_shell(shell: &mut Shell<MemoryStore>) -> io::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    println!("taskboard: type `help` for commands");
    loop {
        print!("> ");
        io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            println!();
            return Ok(());
        };
        if line.trim().is_empty() {
            continue;
        }
        match shell.run_line(&line).await {
            Reply::Text(text) => println!("{text}"),
            Reply::Quit => return Ok(()),
        }
    }
}

fn save_state(store: &MemoryStore, path: &Path) {
    if let Err(e) = persist::save(store, path) {
        tracing::error!(error = %e, "could not save state");
        eprintln!("Error: {e}");
    }
}
