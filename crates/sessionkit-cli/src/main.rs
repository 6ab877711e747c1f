//! sessionkit - an interactive front end for the mock session flow.
//!
//! Sign in, sign up, reset a password and view a protected profile. Sessions
//! are stored in the configured backend and expire on their own.

mod app;
mod forms;
mod render;

use std::io::{self, Write};
use std::path::Path;

use anyhow::{Context, Result};
use sessionkit_core::auth::{MockIdentityProvider, SessionManager, SessionStore};
use sessionkit_core::storage::StorageBackend;
use sessionkit_core::{AuthState, Config};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use app::{App, Command, TerminalPrompter};

/// Log file name prefix inside `log_dir`
const LOG_FILE: &str = "sessionkit.log";

const USAGE: &str = "\
Usage: sessionkit [--storage <keyring|file|encrypted-file|memory>] [--ephemeral]

Environment: SESSIONKIT_STORAGE, SESSIONKIT_EXPIRY_MINUTES, SESSIONKIT_PASSPHRASE, RUST_LOG";

/// Initialize the tracing subscriber for logging.
/// The returned guard must be held to flush the file writer.
fn init_tracing(log_dir: Option<&Path>) -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_writer(writer).with_ansi(false)),
                Some(guard),
            )
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();
    guard
}

/// Apply command line flags on top of the loaded config.
/// Returns `false` when only usage was requested.
fn apply_args(config: &mut Config, args: &[String]) -> Result<bool> {
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--ephemeral" => config.storage = StorageBackend::Memory,
            "--storage" => {
                let value = iter.next().context("--storage needs a value")?;
                config.storage = value.parse().map_err(|e: String| anyhow::anyhow!(e))?;
            }
            "-h" | "--help" => return Ok(false),
            other => anyhow::bail!("Unknown argument: {}\n\n{}", other, USAGE),
        }
    }
    Ok(true)
}

fn prompt() -> io::Result<()> {
    print!("> ");
    io::stdout().flush()
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let mut config = Config::load()?;
    let args: Vec<String> = std::env::args().skip(1).collect();
    if !apply_args(&mut config, &args)? {
        println!("{}", USAGE);
        return Ok(());
    }

    let _log_guard = init_tracing(config.log_dir.as_deref());
    info!(backend = %config.storage, "sessionkit starting");

    let storage = config.open_storage()?;
    let manager = SessionManager::with_lifetime(
        SessionStore::new(storage),
        Box::new(MockIdentityProvider),
        config.token_lifetime(),
    );
    manager.initialize().await;
    println!("{}", render::status_line(&manager.state(), manager.time_remaining()));

    // Print session changes as they happen, including timer-driven logout
    let mut changes = manager.subscribe();
    tokio::spawn(async move {
        let mut prev: AuthState = changes.borrow_and_update().clone();
        while changes.changed().await.is_ok() {
            let next = changes.borrow_and_update().clone();
            if let Some(notice) = render::transition(&prev, &next) {
                println!("\n{}", notice);
                let _ = prompt();
            }
            prev = next;
        }
    });

    let mut app = App::new(manager, TerminalPrompter);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    println!("Type `help` for commands.");
    prompt()?;
    while let Some(line) = lines.next_line().await.context("Failed to read input")? {
        match Command::parse(&line) {
            Ok(Some(command)) => {
                let outcome = app.handle(command).await?;
                for line in &outcome.lines {
                    println!("{}", line);
                }
                if outcome.quit {
                    break;
                }
            }
            Ok(None) => {}
            Err(message) => println!("{}", message),
        }
        prompt()?;
    }

    info!("sessionkit shutting down");
    Ok(())
}
