//! Eclipse CLI - main entry point.
//!
//! Loads `.env`, parses arguments, sets up logging and dispatches the
//! command. Errors are printed once and end the process with status 1,
//! unless `--suppress-error` is given.

use anyhow::Result;
use clap::Parser;

use eclipse_cli::cli::{Cli, ColorMode, LogLevel, ReportedError, dispatch_command};
use eclipse_cli::styled_output::print_error;

/// Keeps the non-blocking debug log writer alive until the process ends.
struct DebugLogGuard {
    _guard: tracing_appender::non_blocking::WorkerGuard,
}

/// Write ALL trace-level logs to ./debug.txt.
fn setup_debug_file_logging() -> Result<DebugLogGuard> {
    use std::fs::File;
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let debug_file_path = std::env::current_dir()?.join("debug.txt");
    let file = File::create(&debug_file_path).map_err(|e| {
        anyhow::anyhow!("Failed to create debug.txt: {e}. Check write permissions.")
    })?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file);
    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new("trace"))
        .with(file_layer)
        .init();

    eprintln!(
        "Debug mode enabled: logging to {}",
        debug_file_path.display()
    );
    Ok(DebugLogGuard { _guard: guard })
}

/// Stderr logging at the level picked by flags, `ECLIPSE_LOG_LEVEL` or `RUST_LOG`.
fn setup_stderr_logging(cli: &Cli) {
    let log_level = if cli.trace {
        LogLevel::Trace
    } else if cli.verbose {
        LogLevel::Debug
    } else if let Ok(env_level) = std::env::var("ECLIPSE_LOG_LEVEL") {
        LogLevel::from_str_loose(&env_level).unwrap_or(cli.log_level)
    } else {
        cli.log_level
    };

    let filter = match tracing_subscriber::EnvFilter::try_from_default_env() {
        Ok(filter) if !cli.trace && !cli.verbose => filter,
        _ => {
            let level = log_level.as_filter_str();
            tracing_subscriber::EnvFilter::new(format!(
                "error,eclipse={level},eclipse_cli={level},eclipse_login={level},\
                 eclipse_common={level},eclipse_keyring_store={level}"
            ))
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() {
    eclipse_cli::install_panic_hook();

    // Values from .env feed the `env` fallbacks of the flags.
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // SAFETY: Environment variable mutations happen early before threads spawn
    match cli.color {
        ColorMode::Never => unsafe { std::env::set_var("NO_COLOR", "1") },
        ColorMode::Always => unsafe { std::env::remove_var("NO_COLOR") },
        ColorMode::Auto => {}
    }

    let debug_guard = if cli.debug {
        match setup_debug_file_logging() {
            Ok(guard) => Some(guard),
            Err(e) => {
                print_error(&format!("{e:#}"));
                std::process::exit(1);
            }
        }
    } else {
        setup_stderr_logging(&cli);
        None
    };

    let suppress_error = cli.suppress_error;
    let code = match dispatch_command(cli).await {
        Ok(code) => code,
        Err(err) => {
            tracing::debug!(error = ?err, "Command failed");
            if err.downcast_ref::<ReportedError>().is_none() {
                print_error(&format!("{err:#}"));
            }
            if suppress_error { 0 } else { 1 }
        }
    };

    drop(debug_guard);
    std::process::exit(code);
}
