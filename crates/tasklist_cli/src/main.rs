use clap::Parser;
use clap::error::ErrorKind;
use std::io::{self, Write};
use std::sync::mpsc;
use tasklist_cli::cli::Cli;
use tasklist_cli::menu::{Menu, MenuSettings, write_farewell};
use tasklist_core::config::load_settings;
use tasklist_core::error::AppError;
use tasklist_core::model::Clock;
use tasklist_core::storage::TextFileStorage;
use tasklist_core::task_store::TaskStore;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const LOG_ENV_VAR: &str = "TASKLIST_LOG";
const DEFAULT_LOG_DIRECTIVE: &str = "tasklist_core=debug,tasklist_cli=debug";

fn init_logging() {
    let Ok(directive) = std::env::var(LOG_ENV_VAR) else {
        return;
    };
    let directive = directive.trim();
    let filter = if directive.is_empty() {
        EnvFilter::new(DEFAULT_LOG_DIRECTIVE)
    } else {
        EnvFilter::try_new(directive).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_DIRECTIVE))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn normalize_parse_error(err: clap::Error) -> AppError {
    let rendered = err.to_string();
    let first_line = rendered.lines().next().unwrap_or("invalid arguments").trim();
    let message = first_line
        .strip_prefix("error: ")
        .unwrap_or(first_line)
        .to_string();
    AppError::invalid_input(message)
}

/// Ctrl+C lands here instead of killing the process mid-prompt. Saves replace
/// the task file by rename, so exiting during one leaves the old or the new
/// list on disk, never a truncated one. Returns once the handler is installed.
fn spawn_interrupt_watcher() {
    let (ready_tx, ready_rx) = mpsc::channel();
    let spawned = std::thread::Builder::new()
        .name("interrupt-watcher".to_string())
        .spawn(move || {
            let runtime = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(runtime) => runtime,
                Err(err) => {
                    warn!(error = %err, "interrupt watcher unavailable");
                    return;
                }
            };

            runtime.block_on(async move {
                let mut interrupts = match listen_for_interrupts() {
                    Ok(interrupts) => interrupts,
                    Err(err) => {
                        warn!(error = %err, "failed to install Ctrl+C handler");
                        return;
                    }
                };
                ready_tx.send(()).ok();

                if interrupts.recv().await.is_some() {
                    info!("received Ctrl+C, shutting down");
                    let mut stdout = io::stdout();
                    write_farewell(&mut stdout, true).ok();
                    stdout.flush().ok();
                    std::process::exit(0);
                }
            });
        });

    match spawned {
        // A dropped sender means the watcher gave up and already logged why.
        Ok(_) => {
            let _ = ready_rx.recv();
        }
        Err(err) => warn!(error = %err, "failed to spawn interrupt watcher"),
    }
}

#[cfg(unix)]
fn listen_for_interrupts() -> io::Result<tokio::signal::unix::Signal> {
    use tokio::signal::unix::{SignalKind, signal};
    signal(SignalKind::interrupt())
}

#[cfg(windows)]
fn listen_for_interrupts() -> io::Result<tokio::signal::windows::CtrlC> {
    tokio::signal::windows::ctrl_c()
}

fn main() {
    // The local offset can only be read while the process is single-threaded.
    let clock = Clock::local();
    init_logging();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            err.exit()
        }
        Err(err) => {
            eprintln!("ERROR: {}", normalize_parse_error(err));
            std::process::exit(1);
        }
    };

    let overrides = match cli.overrides() {
        Ok(overrides) => overrides,
        Err(message) => {
            eprintln!("ERROR: {}", AppError::invalid_input(message));
            std::process::exit(1);
        }
    };

    let loaded_settings = match load_settings(&overrides) {
        Ok(loaded_settings) => loaded_settings,
        Err(err) => {
            eprintln!("ERROR: {err}");
            std::process::exit(1);
        }
    };
    if let Some(err) = loaded_settings.warning.as_ref() {
        warn!(error = %err, "ignoring part of the configuration");
        eprintln!("WARNING: ignoring configuration: {err}");
    }
    let settings = loaded_settings.settings;
    info!(path = %settings.store_path.display(), "opening task file");

    let loaded = TaskStore::open(TextFileStorage::new(settings.store_path.clone()), clock);
    spawn_interrupt_watcher();

    let stdin = io::stdin();
    let mut menu = Menu::new(
        loaded,
        stdin.lock(),
        io::stdout(),
        MenuSettings::from_settings(&settings),
    );
    if let Err(err) = menu.run() {
        eprintln!("ERROR: {}", err);
        std::process::exit(1);
    }
}
