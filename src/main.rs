// chatterm - reactive terminal chat assistant
//
// Architecture:
// - Reactive core: state cells notify a debounced coordinator of changes
// - Renderer: redraws dirty components into a static (history) and a
//   dynamic (live) zone, one atomic frame per pass
// - Keyboard pipeline: classifies key events and routes them to the
//   focused component
// - Application: owns the loops and the shutdown sequence
// - Chat session: turns submissions into streamed backend responses

use anyhow::{Context, Result};
use chatterm::chat::{ChatScreen, ProcessWorkspace, ScreenParts};
use chatterm::cli::{self, Cli};
use chatterm::config::Config;
use chatterm::demo::EchoBackend;
use chatterm::logging::{LogBuffer, TuiLogLayer};
use chatterm::startup;
use chatterm::tui::app::{AppState, RunArgs};
use chatterm::tui::keyboard::{CrosstermInput, ScriptedInput};
use chatterm::tui::surface::{install_panic_hook, MemorySurface, TerminalGuard, TerminalSurface};
use clap::Parser;
use ratatui::backend::CrosstermBackend;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Virtual screen size for headless runs
const HEADLESS_SIZE: (u16, u16) = (100, 30);

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    if cli::handle_command(&cli)? {
        return Ok(());
    }

    // Ensure config template exists (helps users discover options)
    if let Err(e) = Config::ensure_config_exists() {
        eprintln!("Warning: could not write default config: {e:#}");
    }

    let (config, source) = match Config::load() {
        Ok(loaded) => loaded,
        Err(e) => {
            print_config_error(&e);
            std::process::exit(1);
        }
    };

    startup::print_startup(&config, &source);

    let log_buffer = LogBuffer::new();
    let file_guard = init_tracing(&config, &log_buffer, cli.headless);
    startup::log_startup(&config);

    let exit_code = if cli.headless {
        run_headless(&config, &cli).await?
    } else {
        run_terminal(&config, &cli, log_buffer).await?
    };

    // Flush file logs before exiting
    drop(file_guard);
    std::process::exit(exit_code);
}

/// Initialize tracing
///
/// Terminal mode captures logs to the in-memory buffer so they never garble
/// the display; headless mode writes to stdout. File logging is added on top
/// when enabled. Precedence: RUST_LOG > config file > "info".
fn init_tracing(config: &Config, log_buffer: &LogBuffer, headless: bool) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.logging.filter_directive()));

    // The guard must live for the rest of the process so logs flush
    let (file_layer, guard) = match file_writer(config) {
        Some((writer, guard)) => (
            Some(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(writer)
                    .with_ansi(false),
            ),
            Some(guard),
        ),
        None => (None, None),
    };

    let tui_layer = (!headless).then(|| TuiLogLayer::new(log_buffer.clone()));
    let stdout_layer = headless.then(tracing_subscriber::fmt::layer);

    tracing_subscriber::registry()
        .with(filter)
        .with(tui_layer)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    guard
}

/// Non-blocking rolling file writer, if file logging is enabled and possible
fn file_writer(config: &Config) -> Option<(NonBlocking, WorkerGuard)> {
    if !config.logging.file_enabled {
        return None;
    }
    match config.logging.rolling_appender() {
        Ok(appender) => Some(tracing_appender::non_blocking(appender)),
        Err(e) => {
            eprintln!("Warning: file logging disabled: {e:#}");
            None
        }
    }
}

/// Full-screen interactive session
async fn run_terminal(config: &Config, cli: &Cli, log_buffer: LogBuffer) -> Result<i32> {
    install_panic_hook();
    let mut guard = TerminalGuard::enter()?;

    let surface = TerminalSurface::new(CrosstermBackend::new(std::io::stdout()))
        .context("Failed to create terminal")?;
    let cancel = CancellationToken::new();
    spawn_signal_handler(cancel.clone());

    let screen = ChatScreen::build(
        config,
        ScreenParts {
            surface: Box::new(surface),
            input: Box::new(CrosstermInput),
            backend: Arc::new(EchoBackend::new(config.demo.token_delay)),
            workspace: Arc::new(ProcessWorkspace),
            logs: Some(log_buffer),
        },
        cancel.clone(),
    );

    let result = screen.app.run(cli.run_args(), cancel).await;
    guard.restore()?;
    result
}

/// Submit `--prompt`, wait for the response and print the transcript
async fn run_headless(config: &Config, cli: &Cli) -> Result<i32> {
    let cancel = CancellationToken::new();
    spawn_signal_handler(cancel.clone());

    let (width, height) = HEADLESS_SIZE;
    let screen = ChatScreen::build(
        config,
        ScreenParts {
            surface: Box::new(MemorySurface::new(width, height)),
            input: Box::new(ScriptedInput::new()),
            backend: Arc::new(EchoBackend::new(config.demo.token_delay)),
            workspace: Arc::new(ProcessWorkspace),
            logs: None,
        },
        cancel.clone(),
    );

    let app = Arc::clone(&screen.app);
    let run = tokio::spawn({
        let cancel = cancel.clone();
        async move { app.run(RunArgs::default(), cancel).await }
    });

    match cli.prompt.as_deref() {
        Some(prompt) => {
            let mut events = screen.app.subscribe();
            while !matches!(screen.app.state(), AppState::Running | AppState::Stopped) {
                if events.recv().await.is_err() {
                    break;
                }
            }
            if screen.app.submit_text(prompt).is_some() {
                screen.session.wait_idle().await;
            }
            println!("{}", screen.transcript());
        }
        None => tracing::info!("No --prompt given, nothing to do"),
    }

    cancel.cancel();
    run.await.context("application task panicked")?
}

/// Cancel on SIGINT delivered outside raw mode (headless, or before the
/// terminal is set up)
fn spawn_signal_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupt received");
            cancel.cancel();
        }
    });
}

/// Clear, actionable message for a config file that fails to load
fn print_config_error(error: &anyhow::Error) {
    eprintln!("\n╔══════════════════════════════════════════════════════════════╗");
    eprintln!("║  CONFIG ERROR - Failed to load configuration                 ║");
    eprintln!("╚══════════════════════════════════════════════════════════════╝\n");
    eprintln!("  Error: {error:#}\n");
    eprintln!("  Tip: Check for:\n");
    eprintln!("    - Unknown section names (valid: layout, render, keyboard, logging, demo)");
    eprintln!("    - Ratios that do not sum to 1.0");
    eprintln!("    - Minimum heights of 0\n");
    eprintln!("  To reset, run `chatterm config --reset`.\n");
}
